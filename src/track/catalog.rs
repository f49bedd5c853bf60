//! Track part catalog
//!
//! Each part is a square tile with open connectors on some of its four
//! sides, defined at rotation 0. Rotations turn the tile clockwise as
//! seen on screen (north up).

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Grid direction (north = up = decreasing row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Clockwise order starting at north
    pub const ALL: [Direction; 4] = [Direction::North, Direction::East, Direction::South, Direction::West];

    pub fn opposite(self) -> Self {
        self.rotated_cw(2)
    }

    /// Turn clockwise by a number of quarter turns
    pub fn rotated_cw(self, quarters: u8) -> Self {
        Self::ALL[(self.index() + quarters as usize) % 4]
    }

    /// (row, col) step
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::North => (-1, 0),
            Direction::East => (0, 1),
            Direction::South => (1, 0),
            Direction::West => (0, -1),
        }
    }

    /// Heading in the raster frame (radians, y down)
    pub fn angle(self) -> f32 {
        use std::f32::consts::{FRAC_PI_2, PI};
        match self {
            Direction::North => -FRAC_PI_2,
            Direction::East => 0.0,
            Direction::South => FRAC_PI_2,
            Direction::West => PI,
        }
    }

    /// Direction from one cell to an edge-adjacent one
    pub fn between(from: (usize, usize), to: (usize, usize)) -> Option<Self> {
        let dr = to.0 as isize - from.0 as isize;
        let dc = to.1 as isize - from.1 as isize;
        Self::ALL.into_iter().find(|d| d.offset() == (dr, dc))
    }

    fn index(self) -> usize {
        self as usize
    }

    fn bit(self) -> u8 {
        1 << self.index()
    }
}

/// Set of open connectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorMask(u8);

impl ConnectorMask {
    pub const EMPTY: ConnectorMask = ConnectorMask(0);

    pub fn of(directions: &[Direction]) -> Self {
        directions.iter().fold(Self::EMPTY, |m, &d| m.with(d))
    }

    pub fn with(self, d: Direction) -> Self {
        Self(self.0 | d.bit())
    }

    pub fn contains(self, d: Direction) -> bool {
        self.0 & d.bit() != 0
    }

    pub fn count(self) -> u32 {
        (self.0 & 0x0f).count_ones()
    }

    pub fn rotated(self, rotation: Rotation) -> Self {
        self.directions()
            .fold(Self::EMPTY, |m, d| m.with(d.rotated_cw(rotation.quarters())))
    }

    pub fn directions(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |&d| self.contains(d))
    }
}

/// Tile rotation, clockwise, serialized as degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    pub fn quarters(self) -> u8 {
        self as u8
    }

    pub fn degrees(self) -> u16 {
        self.quarters() as u16 * 90
    }

    pub fn from_degrees(degrees: u16) -> Result<Self, SimError> {
        match degrees {
            0 => Ok(Rotation::R0),
            90 => Ok(Rotation::R90),
            180 => Ok(Rotation::R180),
            270 => Ok(Rotation::R270),
            other => Err(SimError::InvalidRotation(other)),
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = SimError;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        Self::from_degrees(degrees)
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// A tile definition at its canonical rotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPart {
    pub id: String,
    /// Asset file name used by saved designs
    pub file: String,
    pub name: String,
    pub mask: ConnectorMask,
}

impl TrackPart {
    pub fn new(id: &str, file: &str, name: &str, connectors: &[Direction]) -> Self {
        Self {
            id: id.to_string(),
            file: file.to_string(),
            name: name.to_string(),
            mask: ConnectorMask::of(connectors),
        }
    }

    /// Loop tracks use pass-through pieces only
    pub fn is_pass_through(&self) -> bool {
        self.mask.count() == 2
    }

    pub fn mask_at(&self, rotation: Rotation) -> ConnectorMask {
        self.mask.rotated(rotation)
    }
}

/// Static catalog of available parts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackPartCatalog {
    parts: Vec<TrackPart>,
}

impl TrackPartCatalog {
    pub fn new(parts: Vec<TrackPart>) -> Self {
        Self { parts }
    }

    /// The bundled tile set
    pub fn standard() -> Self {
        use Direction::*;
        Self::new(vec![
            TrackPart::new("straight", "straight.png", "Straight", &[North, South]),
            TrackPart::new("corner", "corner.png", "Corner", &[North, East]),
            TrackPart::new("t_junction", "t_junction.png", "T-Junction", &[North, East, South]),
            TrackPart::new("cross", "cross.png", "Crossing", &[North, East, South, West]),
            TrackPart::new("dead_end", "dead_end.png", "Dead End", &[North]),
        ])
    }

    pub fn parts(&self) -> &[TrackPart] {
        &self.parts
    }

    pub fn get(&self, id: &str) -> Option<&TrackPart> {
        self.parts.iter().find(|p| p.id == id)
    }

    pub fn find_by_file(&self, file: &str) -> Option<&TrackPart> {
        self.parts.iter().find(|p| p.file == file)
    }

    /// Parts with exactly two connectors
    pub fn pass_through_parts(&self) -> impl Iterator<Item = &TrackPart> {
        self.parts.iter().filter(|p| p.is_pass_through())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::*;

    #[test]
    fn test_opposites() {
        assert_eq!(North.opposite(), South);
        assert_eq!(East.opposite(), West);
        assert_eq!(West.opposite(), East);
    }

    #[test]
    fn test_rotation_is_clockwise() {
        let corner = ConnectorMask::of(&[North, East]);
        assert_eq!(corner.rotated(Rotation::R90), ConnectorMask::of(&[East, South]));
        assert_eq!(corner.rotated(Rotation::R180), ConnectorMask::of(&[South, West]));
        assert_eq!(corner.rotated(Rotation::R270), ConnectorMask::of(&[West, North]));
    }

    #[test]
    fn test_straight_has_two_orientations() {
        let straight = ConnectorMask::of(&[North, South]);
        assert_eq!(straight.rotated(Rotation::R180), straight);
        assert_eq!(straight.rotated(Rotation::R90), ConnectorMask::of(&[East, West]));
    }

    #[test]
    fn test_rotation_degrees() {
        for r in Rotation::ALL {
            assert_eq!(Rotation::from_degrees(r.degrees()).unwrap(), r);
        }
        assert!(matches!(Rotation::from_degrees(45), Err(SimError::InvalidRotation(45))));
    }

    #[test]
    fn test_rotation_serializes_as_degrees() {
        assert_eq!(serde_json::to_string(&Rotation::R270).unwrap(), "270");
        let r: Rotation = serde_json::from_str("90").unwrap();
        assert_eq!(r, Rotation::R90);
        assert!(serde_json::from_str::<Rotation>("45").is_err());
    }

    #[test]
    fn test_direction_between() {
        assert_eq!(Direction::between((1, 1), (0, 1)), Some(North));
        assert_eq!(Direction::between((1, 1), (1, 2)), Some(East));
        assert_eq!(Direction::between((1, 1), (2, 2)), None);
    }

    #[test]
    fn test_standard_catalog() {
        let catalog = TrackPartCatalog::standard();
        let ids: Vec<_> = catalog.pass_through_parts().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["straight", "corner"]);
        assert_eq!(catalog.find_by_file("cross.png").unwrap().mask.count(), 4);
        assert!(catalog.get("loop_de_loop").is_none());
    }
}
