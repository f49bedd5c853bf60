//! Line Follower Sim entry point
//!
//! Headless run: generate a loop track, render it, drop the robot on it
//! and let the bundled line follower drive for a fixed number of ticks.
//!
//! Usage: `line-follower-sim [seed] [rows] [cols] [ticks]`

#[cfg(not(target_arch = "wasm32"))]
use line_follower_sim::{
    SimConfig,
    consts::*,
    control::{ControlHost, LineFollower},
    sim::{RobotGeometry, SimulationContext, TrackSurface},
    track::{DEFAULT_MAX_RETRIES, TrackPartCatalog, generate_loop, render_grid, suggest_start_pose, validate},
};

#[cfg(not(target_arch = "wasm32"))]
struct RunArgs {
    seed: u64,
    rows: usize,
    cols: usize,
    ticks: u64,
}

#[cfg(not(target_arch = "wasm32"))]
impl RunArgs {
    fn from_env() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let pick = |i: usize| args.get(i).and_then(|s| s.parse::<u64>().ok());
        Self {
            seed: pick(0).unwrap_or_else(|| {
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0)
            }),
            rows: pick(1).map_or(4, |v: u64| v as usize),
            cols: pick(2).map_or(5, |v: u64| v as usize),
            ticks: pick(3).unwrap_or(3000),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    let args = RunArgs::from_env();
    log::info!("Line Follower Sim (native) starting with seed {}", args.seed);

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn run(args: &RunArgs) -> line_follower_sim::Result<()> {
    let catalog = TrackPartCatalog::standard();
    let mut rng = line_follower_sim::sim::RngState::new(args.seed).to_rng();
    let track = generate_loop(args.rows, args.cols, &catalog, DEFAULT_MAX_RETRIES, &mut rng)?;
    let report = validate(&track.grid, &catalog);
    log::info!(
        "Track: {} tiles, {} dangling, {} mismatches",
        report.filled_cells,
        report.dangling_connections,
        report.connection_mismatches
    );

    let config = SimConfig::default();
    let image = render_grid(&track.grid, &catalog, TILE_PX, TRACK_LINE_WIDTH_PX)?;
    let start = suggest_start_pose(&track, TILE_PX, config.pixels_per_meter);

    let mut ctx = SimulationContext::new(config, RobotGeometry::default(), start, args.seed)?;
    ctx.set_surface(TrackSurface::from_image(image));
    // the derived line's extension cuts through other parts of the loop
    ctx.set_require_segment_crossing(true);

    let mut host = ControlHost::new(LineFollower::default());
    for _ in 0..args.ticks {
        let tick = host.run_tick(&mut ctx)?;
        let snap = tick.snapshot;
        if snap.crossed {
            if let Some(lap) = snap.lap_time {
                println!("lap {:>3}: {:.2} s", snap.lap.record.lap_count, lap);
            }
        }
    }

    let record = ctx.lap_timer().record();
    let pose = ctx.robot().pose;
    println!("seed:       {}", args.seed);
    println!("grid:       {}x{} ({} tiles)", args.rows, args.cols, track.path.len());
    println!("sim time:   {:.2} s over {} ticks", ctx.sim_time(), ctx.time_ticks());
    println!("laps:       {}", record.lap_count);
    match record.best_lap_time {
        Some(best) => println!("best lap:   {:.2} s", best),
        None => println!("best lap:   -"),
    }
    println!("final pose: ({:.3}, {:.3}, {:.2} rad)", pose.x, pose.y, pose.angle);
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // No browser host; the library is the wasm surface
}
