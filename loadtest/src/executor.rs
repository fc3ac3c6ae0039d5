//! Turns a phase into a timed stream of concurrent calls.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::task::TaskTracker;

use crate::client::LeafClient;
use crate::collector::Collector;
use crate::config::TestPhase;
use crate::payload::DataProvider;

const TICK: Duration = Duration::from_secs(1);

/// Dependencies shared by both executor variants.
#[derive(Debug)]
struct CallContext {
    client: LeafClient,
    collector: Arc<Collector>,
    provider: Arc<DataProvider>,
}

impl CallContext {
    /// Fires `count` calls as independent tasks; the tick loop never waits
    /// for them.
    fn fire(&self, tracker: &TaskTracker, deadline: Instant, phase: &TestPhase, count: i64) {
        for _ in 0..count {
            let client = self.client.clone();
            let collector = Arc::clone(&self.collector);
            let provider = Arc::clone(&self.provider);
            let function_id = phase.function_id.clone();
            let image_tag = phase.image_tag.clone();

            tracker.spawn(async move {
                let payload = provider.get_data();
                let result = client
                    .schedule_call(deadline, &function_id, &image_tag, payload)
                    .await;
                collector.collect(result);
            });
        }
    }
}

/// The shared tick loop: once per second, ask the schedule for the current
/// rate and fire that many calls, until the phase or parent deadline ends it.
async fn run_ticks(
    ctx: &CallContext,
    deadline: Instant,
    phase: &TestPhase,
    mut rps_for_tick: impl FnMut() -> i64,
) {
    // Deadline and ticks share one base instant, so the last tick of a phase
    // lands exactly on the deadline instead of epsilon after it.
    let start = Instant::now();
    let phase_deadline = deadline.min(start + phase.duration);

    let mut ticker = interval_at(start + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let sleep = tokio::time::sleep_until(phase_deadline);
    tokio::pin!(sleep);

    let tracker = TaskTracker::new();
    loop {
        tokio::select! {
            // When a tick and the deadline are due together the tick wins,
            // so a phase of n seconds fires exactly n bursts.
            biased;
            _ = ticker.tick() => {
                let rps = rps_for_tick();
                if rps <= 0 {
                    continue;
                }
                ctx.fire(&tracker, deadline, phase, rps);
            }
            _ = &mut sleep => break,
        }
    }

    // Launched calls still finish and get collected; the parent deadline
    // bounds how long this can take.
    tracker.close();
    tracker.wait().await;
}

/// Drives a constant-rate phase: `start_rps` calls on every tick.
#[derive(Debug)]
pub struct ConstantExecutor {
    ctx: CallContext,
}

impl ConstantExecutor {
    /// Creates an executor firing through `client` into `collector`.
    pub fn new(client: LeafClient, collector: Arc<Collector>, provider: Arc<DataProvider>) -> Self {
        Self {
            ctx: CallContext {
                client,
                collector,
                provider,
            },
        }
    }

    /// Runs the phase until its duration or `deadline` elapses.
    pub async fn execute(&self, deadline: Instant, phase: &TestPhase) {
        let rps = phase.start_rps;
        run_ticks(&self.ctx, deadline, phase, || {
            tracing::debug!(rps, "constant tick");
            rps
        })
        .await;
    }
}

/// Drives a variable phase: the rate steps from `start_rps` toward `end_rps`.
#[derive(Debug)]
pub struct RampingExecutor {
    ctx: CallContext,
}

impl RampingExecutor {
    /// Creates an executor firing through `client` into `collector`.
    pub fn new(client: LeafClient, collector: Arc<Collector>, provider: Arc<DataProvider>) -> Self {
        Self {
            ctx: CallContext {
                client,
                collector,
                provider,
            },
        }
    }

    /// Runs the phase until its duration or `deadline` elapses.
    pub async fn execute(&self, deadline: Instant, phase: &TestPhase) {
        let mut schedule = RampSchedule::new(phase);
        run_ticks(&self.ctx, deadline, phase, move || {
            let rps = schedule.next_rps();
            tracing::debug!(rps, "ramping tick");
            rps
        })
        .await;
    }
}

/// Tick-by-tick rate progression of a variable phase.
///
/// The first tick runs at the start rate; later ticks step toward the end
/// rate and clamp on the final step instead of overshooting. A non-positive
/// rate means the tick fires nothing, without stopping the clock.
#[derive(Debug)]
struct RampSchedule {
    current: i64,
    end: i64,
    step: i64,
    incrementing: bool,
    first: bool,
}

impl RampSchedule {
    fn new(phase: &TestPhase) -> Self {
        let mut current = phase.start_rps;
        if current == 0 {
            tracing::warn!("start RPS is 0, ramping from 1");
            current = 1;
        }

        Self {
            current,
            end: phase.end_rps,
            step: phase.step,
            incrementing: phase.step > 0,
            first: true,
        }
    }

    fn next_rps(&mut self) -> i64 {
        if self.first {
            self.first = false;
        } else if self.incrementing && self.current < self.end {
            self.current = (self.current + self.step).min(self.end);
        } else if !self.incrementing && self.current > self.end {
            self.current = (self.current + self.step).max(self.end);
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhaseType;

    fn ramp_phase(start_rps: i64, end_rps: i64, step: i64) -> TestPhase {
        TestPhase {
            name: None,
            phase_type: PhaseType::Variable,
            image_tag: "hyperfaas-echo:latest".to_owned(),
            function_id: "function-1".to_owned(),
            start_time: Duration::ZERO,
            duration: Duration::from_secs(10),
            start_rps,
            end_rps,
            step,
        }
    }

    fn schedule_of(phase: &TestPhase, ticks: usize) -> Vec<i64> {
        let mut schedule = RampSchedule::new(phase);
        (0..ticks).map(|_| schedule.next_rps()).collect()
    }

    #[test]
    fn ramps_up_and_clamps_at_the_end_rate() {
        let rates = schedule_of(&ramp_phase(1, 100, 10), 13);
        assert_eq!(
            rates,
            [1, 11, 21, 31, 41, 51, 61, 71, 81, 91, 100, 100, 100]
        );
    }

    #[test]
    fn first_tick_runs_at_the_start_rate() {
        let rates = schedule_of(&ramp_phase(5, 20, 5), 5);
        assert_eq!(rates, [5, 10, 15, 20, 20]);
    }

    #[test]
    fn zero_start_is_coerced_to_one() {
        let rates = schedule_of(&ramp_phase(0, 4, 1), 6);
        assert_eq!(rates, [1, 2, 3, 4, 4, 4]);
    }

    #[test]
    fn ramps_down_and_clamps_at_the_end_rate() {
        let rates = schedule_of(&ramp_phase(10, 2, -3), 5);
        assert_eq!(rates, [10, 7, 4, 2, 2]);
    }

    #[test]
    fn nonpositive_rates_keep_the_clock_running() {
        let rates = schedule_of(&ramp_phase(2, -10, -4), 6);
        assert_eq!(rates, [2, -2, -6, -10, -10, -10]);
    }
}
