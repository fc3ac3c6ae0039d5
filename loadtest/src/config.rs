//! The workload data model and the YAML configuration around it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytesize::ByteSize;
use serde::Deserialize;

/// The Leaf rejects functions with less memory than this.
const MIN_FUNCTION_MEMORY: ByteSize = ByteSize::mib(6);

/// Top-level configuration for one load generation run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Synthesize the workload from `patterns` instead of taking `workload`
    /// literally.
    #[serde(default)]
    pub generate_workload: bool,
    /// Address of the Leaf scheduler, `host:port`.
    pub leaf_address: String,
    /// Seed for workload generation and payload synthesis.
    #[serde(default)]
    pub seed: u64,
    /// Hard limit for the whole run.
    #[serde(with = "humantime_serde")]
    pub max_duration: Duration,
    /// Per-call deadline in seconds.
    pub timeout: u64,
    /// Where the per-call CSV log is written.
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
    /// Resources requested for every created function.
    #[serde(default)]
    pub function: FunctionResources,
    /// Phase patterns per image tag, consulted when generating.
    #[serde(default)]
    pub patterns: BTreeMap<String, PhasePattern>,
    /// Explicit workload, consulted when not generating.
    #[serde(default)]
    pub workload: Option<Workload>,
}

fn default_output_file() -> PathBuf {
    PathBuf::from("results.csv")
}

impl Config {
    /// Reads and validates the configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open config file {}", path.display()))?;
        let config: Config =
            serde_yaml::from_reader(file).context("failed to parse config YAML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.leaf_address.is_empty() {
            bail!("leaf_address is required");
        }
        if self.max_duration.is_zero() {
            bail!("max_duration must be non-zero");
        }
        if self.timeout == 0 {
            bail!("timeout must be non-zero");
        }
        if self.function.memory < MIN_FUNCTION_MEMORY {
            bail!(
                "function memory must be at least {MIN_FUNCTION_MEMORY}, got {}",
                self.function.memory
            );
        }

        if self.generate_workload {
            if self.patterns.is_empty() {
                bail!("generate_workload is set, but no patterns are provided");
            }
            for (tag, pattern) in &self.patterns {
                pattern
                    .validate()
                    .with_context(|| format!("invalid pattern for {tag}"))?;
            }
        } else {
            let workload = self
                .workload
                .as_ref()
                .context("a workload is required unless generate_workload is set")?;
            workload.validate()?;
        }

        Ok(())
    }
}

/// Resources requested for every function created on the Leaf.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FunctionResources {
    /// Memory limit, e.g. `256MB`.
    pub memory: ByteSize,
    /// CPU scheduling limits.
    pub cpu: CpuLimits,
}

impl Default for FunctionResources {
    fn default() -> Self {
        Self {
            memory: ByteSize::mib(256),
            cpu: CpuLimits::default(),
        }
    }
}

/// CFS period and quota handed to the Leaf verbatim.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CpuLimits {
    /// CFS period in microseconds.
    pub period: u64,
    /// CFS quota in microseconds.
    pub quota: u64,
}

impl Default for CpuLimits {
    fn default() -> Self {
        Self {
            period: 100_000,
            quota: 100_000,
        }
    }
}

/// An ordered sequence of phases plus the run parameters they were built for.
///
/// Phases of a single image must not overlap and should be ordered by start
/// time ascending; phases of different images may overlap freely.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Workload {
    /// Address of the Leaf this workload was built for.
    #[serde(default)]
    pub leaf_address: String,
    /// Hard limit for the whole run.
    #[serde(default, with = "humantime_serde")]
    pub max_duration: Duration,
    /// Per-call deadline in seconds.
    #[serde(default)]
    pub timeout: u64,
    /// The phases, ordered by start time ascending per image.
    pub phases: Vec<TestPhase>,
}

impl Workload {
    fn validate(&self) -> Result<()> {
        for phase in &self.phases {
            phase
                .validate()
                .with_context(|| format!("invalid phase for {}", phase.image_tag))?;
        }
        Ok(())
    }
}

/// How the request rate behaves over a phase's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseType {
    /// `start_rps` calls on every tick.
    Constant,
    /// The rate steps from `start_rps` toward `end_rps` by `step` per tick.
    Variable,
}

/// A window of time driving a single function image at an RPS schedule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TestPhase {
    /// Optional label, only used in logs.
    #[serde(default)]
    pub name: Option<String>,
    /// Rate behavior of the phase.
    #[serde(rename = "type")]
    pub phase_type: PhaseType,
    /// The function image this phase drives.
    pub image_tag: String,
    /// Stamped after the image is registered with the Leaf.
    #[serde(skip)]
    pub function_id: String,
    /// Offset from workload start.
    #[serde(with = "humantime_serde")]
    pub start_time: Duration,
    /// Phase length.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// Rate on the first tick.
    pub start_rps: i64,
    /// Rate the variable schedule moves toward. Zero for constant phases.
    #[serde(default)]
    pub end_rps: i64,
    /// Per-tick rate increment or decrement. Zero for constant phases.
    #[serde(default)]
    pub step: i64,
}

impl TestPhase {
    fn validate(&self) -> Result<()> {
        match self.phase_type {
            PhaseType::Constant => {
                if self.start_rps < 1 {
                    bail!("constant phases need a positive start_rps");
                }
                if self.end_rps != 0 || self.step != 0 {
                    bail!("constant phases must not set end_rps or step");
                }
            }
            PhaseType::Variable => {
                if self.end_rps == 0 || self.step == 0 {
                    bail!("variable phases need a non-zero end_rps and step");
                }
                let delta = self.end_rps - self.start_rps;
                if delta == 0 || (delta > 0) != (self.step > 0) {
                    bail!("step must move start_rps toward end_rps");
                }
            }
        }
        Ok(())
    }
}

/// Inclusive `[min, max]` integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IntRange {
    /// Lower bound, inclusive.
    pub min: i64,
    /// Upper bound, inclusive.
    pub max: i64,
}

impl IntRange {
    /// Whether `value` lies within the range.
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    fn validate(&self, what: &str) -> Result<()> {
        if self.min > self.max {
            bail!("{what}: min {} exceeds max {}", self.min, self.max);
        }
        Ok(())
    }
}

/// Ranges the generator draws a phase's RPS parameters from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PhaseParameters {
    /// Range for [`TestPhase::start_rps`].
    pub start_rps: IntRange,
    /// Range for [`TestPhase::end_rps`].
    pub end_rps: IntRange,
    /// Range for [`TestPhase::step`].
    pub step: IntRange,
}

/// Template from which the generator emits the phases of one image.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhasePattern {
    /// The function image all emitted phases target.
    pub image_tag: String,
    /// How many phases to emit.
    pub phase_count: IntRange,
    /// Probability in `[0, 1]` of a generated phase being constant;
    /// otherwise it is variable.
    pub constant_likelihood: f64,
    /// Accepted for compatibility with existing configs; never consulted.
    #[serde(default)]
    pub ramping_likelihood: f64,
    /// Ranges for the emitted phases' RPS parameters.
    pub parameters: PhaseParameters,
}

impl PhasePattern {
    fn validate(&self) -> Result<()> {
        if self.image_tag.is_empty() {
            bail!("image_tag is required");
        }
        self.phase_count.validate("phase_count")?;
        if self.phase_count.min < 1 {
            bail!("phase_count must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.constant_likelihood) {
            bail!(
                "constant_likelihood must lie in [0, 1], got {}",
                self.constant_likelihood
            );
        }
        self.parameters.start_rps.validate("start_rps")?;
        self.parameters.end_rps.validate("end_rps")?;
        self.parameters.step.validate("step")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn config_from(yaml: &str) -> Result<Config> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    const GENERATED: &str = r#"
generate_workload: true
leaf_address: localhost:50050
seed: 42
max_duration: 30s
timeout: 10
patterns:
  "hyperfaas-echo:latest":
    image_tag: hyperfaas-echo:latest
    phase_count: { min: 2, max: 4 }
    constant_likelihood: 0.6
    ramping_likelihood: 0.4
    parameters:
      start_rps: { min: 5, max: 20 }
      end_rps: { min: 30, max: 60 }
      step: { min: 2, max: 8 }
"#;

    const EXPLICIT: &str = r#"
leaf_address: localhost:50050
max_duration: 20s
timeout: 5
workload:
  phases:
    - name: warmup
      type: constant
      image_tag: hyperfaas-echo:latest
      start_time: 0s
      duration: 10s
      start_rps: 5
    - type: variable
      image_tag: hyperfaas-echo:latest
      start_time: 10s
      duration: 10s
      start_rps: 5
      end_rps: 50
      step: 5
"#;

    #[test]
    fn generated_config_parses() {
        let config = config_from(GENERATED).unwrap();
        assert!(config.generate_workload);
        assert_eq!(config.seed, 42);
        assert_eq!(config.max_duration, Duration::from_secs(30));
        assert_eq!(config.timeout, 10);
        assert_eq!(config.output_file, PathBuf::from("results.csv"));
        assert_eq!(config.function.memory, ByteSize::mib(256));
        assert_eq!(config.function.cpu.period, 100_000);

        let pattern = &config.patterns["hyperfaas-echo:latest"];
        assert_eq!(pattern.image_tag, "hyperfaas-echo:latest");
        assert_eq!(pattern.phase_count, IntRange { min: 2, max: 4 });
        assert_eq!(pattern.constant_likelihood, 0.6);
        assert_eq!(pattern.parameters.step, IntRange { min: 2, max: 8 });
    }

    #[test]
    fn explicit_config_parses() {
        let config = config_from(EXPLICIT).unwrap();
        let workload = config.workload.unwrap();
        assert_eq!(workload.phases.len(), 2);

        let warmup = &workload.phases[0];
        assert_eq!(warmup.name.as_deref(), Some("warmup"));
        assert_eq!(warmup.phase_type, PhaseType::Constant);
        assert_eq!(warmup.start_time, Duration::ZERO);
        assert!(warmup.function_id.is_empty());

        let ramp = &workload.phases[1];
        assert_eq!(ramp.phase_type, PhaseType::Variable);
        assert_eq!(ramp.start_time, Duration::from_secs(10));
        assert_eq!((ramp.start_rps, ramp.end_rps, ramp.step), (5, 50, 5));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(GENERATED.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.leaf_address, "localhost:50050");
    }

    #[test]
    fn rejects_missing_address() {
        let error = config_from(&GENERATED.replace("localhost:50050", "\"\""))
            .unwrap_err()
            .to_string();
        assert!(error.contains("leaf_address"), "{error}");
    }

    #[test]
    fn rejects_zero_durations() {
        let error = config_from(&GENERATED.replace("max_duration: 30s", "max_duration: 0s"))
            .unwrap_err()
            .to_string();
        assert!(error.contains("max_duration"), "{error}");

        let error = config_from(&GENERATED.replace("timeout: 10", "timeout: 0"))
            .unwrap_err()
            .to_string();
        assert!(error.contains("timeout"), "{error}");
    }

    #[test]
    fn rejects_generation_without_patterns() {
        let yaml = r#"
generate_workload: true
leaf_address: localhost:50050
max_duration: 30s
timeout: 10
"#;
        let error = config_from(yaml).unwrap_err().to_string();
        assert!(error.contains("patterns"), "{error}");
    }

    #[test]
    fn rejects_missing_workload() {
        let yaml = r#"
leaf_address: localhost:50050
max_duration: 30s
timeout: 10
"#;
        let error = config_from(yaml).unwrap_err().to_string();
        assert!(error.contains("workload"), "{error}");
    }

    #[test]
    fn rejects_unknown_phase_type() {
        assert!(config_from(&EXPLICIT.replace("type: variable", "type: sinusoid")).is_err());
    }

    #[test]
    fn rejects_constant_phase_with_ramp_fields() {
        let yaml = EXPLICIT.replace("type: variable", "type: constant");
        let error = format!("{:#}", config_from(&yaml).unwrap_err());
        assert!(error.contains("constant"), "{error}");
    }

    #[test]
    fn rejects_constant_phase_without_rate() {
        let yaml = EXPLICIT.replace("start_rps: 5\n", "start_rps: 0\n");
        assert!(config_from(&yaml).is_err());
    }

    #[test]
    fn rejects_variable_phase_without_step() {
        let yaml = EXPLICIT.replace("step: 5", "step: 0");
        assert!(config_from(&yaml).is_err());
    }

    #[test]
    fn rejects_step_pointing_away_from_end() {
        let yaml = EXPLICIT.replace("step: 5", "step: -5");
        let error = format!("{:#}", config_from(&yaml).unwrap_err());
        assert!(error.contains("toward"), "{error}");
    }

    #[test]
    fn rejects_inverted_ranges() {
        let yaml = GENERATED.replace(
            "start_rps: { min: 5, max: 20 }",
            "start_rps: { min: 20, max: 5 }",
        );
        let error = format!("{:#}", config_from(&yaml).unwrap_err());
        assert!(error.contains("exceeds"), "{error}");
    }

    #[test]
    fn rejects_empty_phase_count() {
        let yaml = GENERATED.replace(
            "phase_count: { min: 2, max: 4 }",
            "phase_count: { min: 0, max: 4 }",
        );
        let error = format!("{:#}", config_from(&yaml).unwrap_err());
        assert!(error.contains("phase_count"), "{error}");
    }

    #[test]
    fn rejects_likelihood_outside_unit_interval() {
        let yaml = GENERATED.replace("constant_likelihood: 0.6", "constant_likelihood: 1.5");
        let error = format!("{:#}", config_from(&yaml).unwrap_err());
        assert!(error.contains("constant_likelihood"), "{error}");
    }

    #[test]
    fn rejects_tiny_function_memory() {
        let yaml = format!("{GENERATED}function:\n  memory: 1MB\n");
        let error = config_from(&yaml).unwrap_err().to_string();
        assert!(error.contains("memory"), "{error:#}");
    }
}
