//! Injectable randomness
//!
//! Perturbation, sensor noise and track generation all draw through
//! `RandomSource` so tests can script exact sequences.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Source of uniform draws in [0, 1)
pub trait RandomSource {
    fn uniform(&mut self) -> f32;

    /// Returns true with given probability
    fn chance(&mut self, probability: f32) -> bool {
        self.uniform() < probability
    }

    /// Uniform draw in [-range, range)
    fn symmetric(&mut self, range: f32) -> f32 {
        (self.uniform() * 2.0 - 1.0) * range
    }

    /// Uniform index in [0, n); n must be non-zero
    fn index(&mut self, n: usize) -> usize {
        ((self.uniform() * n as f32) as usize).min(n - 1)
    }

    /// Fisher-Yates shuffle
    fn shuffle<T>(&mut self, items: &mut [T])
    where
        Self: Sized,
    {
        for i in (1..items.len()).rev() {
            let j = self.index(i + 1);
            items.swap(i, j);
        }
    }
}

impl RandomSource for Pcg32 {
    #[inline]
    fn uniform(&mut self) -> f32 {
        self.random::<f32>()
    }
}

/// Scripted source that cycles through fixed values
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<f32>,
    cursor: usize,
}

impl SequenceRandom {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values, cursor: 0 }
    }

    /// Number of draws taken so far
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for SequenceRandom {
    fn uniform(&mut self) -> f32 {
        if self.values.is_empty() {
            self.cursor += 1;
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}

/// RNG seed wrapper for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::seed_from_u64(self.seed)
    }
}
