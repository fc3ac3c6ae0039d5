//! Synthesizes workloads from per-image phase patterns.

use std::collections::BTreeMap;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::{IntRange, PhasePattern, PhaseType, TestPhase, Workload};

/// Turns phase patterns into a concrete [`Workload`].
///
/// All randomness comes from a single RNG seeded with the configured seed,
/// and patterns are visited in their `BTreeMap` order, so re-running with the
/// same inputs reproduces the exact same workload.
#[derive(Debug)]
pub struct WorkloadGenerator {
    rng: SmallRng,
    max_duration: Duration,
    leaf_address: String,
    timeout: u64,
    patterns: BTreeMap<String, PhasePattern>,
}

impl WorkloadGenerator {
    /// Creates a generator for the given run parameters.
    pub fn new(
        seed: u64,
        max_duration: Duration,
        leaf_address: &str,
        timeout: u64,
        patterns: BTreeMap<String, PhasePattern>,
    ) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            max_duration,
            leaf_address: leaf_address.to_owned(),
            timeout,
            patterns,
        }
    }

    /// Emits the phases of every pattern.
    ///
    /// Each image's phases tile `[0, max_duration)` contiguously with equal
    /// durations; phases of different images overlap freely. All three RPS
    /// parameters are drawn for every phase regardless of its type; the
    /// executors ignore the fields their variant does not use.
    pub fn generate(mut self) -> Workload {
        let patterns = std::mem::take(&mut self.patterns);
        let mut phases = Vec::new();

        for pattern in patterns.values() {
            let phase_count = self.draw(pattern.phase_count);
            let phase_duration = self.max_duration / phase_count as u32;

            for i in 0..phase_count {
                let phase_type = if self.rng.random::<f64>() < pattern.constant_likelihood {
                    PhaseType::Constant
                } else {
                    PhaseType::Variable
                };

                phases.push(TestPhase {
                    name: None,
                    phase_type,
                    image_tag: pattern.image_tag.clone(),
                    function_id: String::new(),
                    start_time: phase_duration * i as u32,
                    duration: phase_duration,
                    start_rps: self.draw(pattern.parameters.start_rps),
                    end_rps: self.draw(pattern.parameters.end_rps),
                    step: self.draw(pattern.parameters.step),
                });
            }
        }

        Workload {
            leaf_address: self.leaf_address,
            max_duration: self.max_duration,
            timeout: self.timeout,
            phases,
        }
    }

    fn draw(&mut self, range: IntRange) -> i64 {
        self.rng.random_range(range.min..=range.max)
    }
}
