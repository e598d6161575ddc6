use std::str::FromStr;
use std::time::Duration;

use crate::error::{SetupFailure, SimError, SimResult};
use crate::kernel::WORKGROUP_SIZE;

/// How generations reach the display buffers.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum TransferMode {
    /// Shared storage whenever the adapter allows it.
    #[default]
    Auto,
    /// Compute and display use one allocation per generation.
    Shared,
    /// Separate display buffers filled by a device-side copy each frame.
    Copy,
}

impl FromStr for TransferMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(TransferMode::Auto),
            "shared" => Ok(TransferMode::Shared),
            "copy" => Ok(TransferMode::Copy),
            other => Err(invalid(format!(
                "unknown transfer mode {other:?} (expected auto, shared or copy)"
            ))),
        }
    }
}

/// Simulation parameters.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub particle_count: u32,
    pub step_size: f32,
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub workgroup_size: u32,
    /// Bound on the per-frame queue wait. `None` waits indefinitely.
    pub wait_timeout: Option<Duration>,
    pub transfer: TransferMode,
    pub clear_color: wgpu::Color,
    pub seed: u64,
    /// Frames between statistics log lines; 0 disables them.
    pub stats_interval: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            particle_count: 1000,
            step_size: 1e-3,
            width: 640,
            height: 480,
            title: "NBody Simulation".to_string(),
            workgroup_size: WORKGROUP_SIZE,
            wait_timeout: Some(Duration::from_secs(2)),
            transfer: TransferMode::Auto,
            clear_color: wgpu::Color::BLACK,
            seed: 0x5eed,
            stats_interval: 300,
        }
    }
}

impl SimConfig {
    pub const ENV_PARTICLES: &'static str = "NBODY_PARTICLES";
    pub const ENV_STEP: &'static str = "NBODY_STEP";
    pub const ENV_TRANSFER: &'static str = "NBODY_TRANSFER";
    pub const ENV_SEED: &'static str = "NBODY_SEED";

    pub fn new(particle_count: u32, step_size: f32) -> Self {
        Self {
            particle_count,
            step_size,
            ..Self::default()
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_transfer(mut self, transfer: TransferMode) -> Self {
        self.transfer = transfer;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_stats_interval(mut self, frames: u64) -> Self {
        self.stats_interval = frames;
        self
    }

    /// Defaults overlaid with `NBODY_*` environment variables.
    pub fn from_env() -> SimResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each `NBODY_*` key.
    pub fn from_lookup<F>(lookup: F) -> SimResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup(Self::ENV_PARTICLES) {
            config.particle_count = parse(Self::ENV_PARTICLES, &v)?;
        }
        if let Some(v) = lookup(Self::ENV_STEP) {
            config.step_size = parse(Self::ENV_STEP, &v)?;
        }
        if let Some(v) = lookup(Self::ENV_TRANSFER) {
            config.transfer = v.parse()?;
        }
        if let Some(v) = lookup(Self::ENV_SEED) {
            config.seed = parse(Self::ENV_SEED, &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        if !self.step_size.is_finite() {
            return Err(invalid(format!("step size must be finite, got {}", self.step_size)));
        }
        if self.width == 0 || self.height == 0 {
            return Err(invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.workgroup_size == 0 {
            return Err(invalid("workgroup size must be non-zero"));
        }
        Ok(())
    }
}

fn parse<T>(key: &str, value: &str) -> SimResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| invalid(format!("{key}={value:?}: {e}")))
}

fn invalid(message: impl Into<String>) -> SimError {
    SimError::setup(SetupFailure::InvalidConfig, message)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_demo() {
        let c = SimConfig::default();
        assert_eq!(c.particle_count, 1000);
        assert_eq!(c.step_size, 1e-3);
        assert_eq!((c.width, c.height), (640, 480));
        assert_eq!(c.title, "NBody Simulation");
        assert_eq!(c.workgroup_size, 256);
        assert_eq!(c.wait_timeout, Some(Duration::from_secs(2)));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let c = SimConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(c.particle_count, 1000);
        assert_eq!(c.transfer, TransferMode::Auto);
    }

    #[test]
    fn environment_overrides_defaults() {
        let c = SimConfig::from_lookup(lookup(&[
            ("NBODY_PARTICLES", "4096"),
            ("NBODY_STEP", " 0.01 "),
            ("NBODY_TRANSFER", "Copy"),
            ("NBODY_SEED", "9"),
        ]))
        .unwrap();
        assert_eq!(c.particle_count, 4096);
        assert_eq!(c.step_size, 0.01);
        assert_eq!(c.transfer, TransferMode::Copy);
        assert_eq!(c.seed, 9);
    }

    #[test]
    fn malformed_values_are_setup_errors() {
        for pairs in [
            [("NBODY_PARTICLES", "lots")],
            [("NBODY_STEP", "inf")],
            [("NBODY_TRANSFER", "mmap")],
            [("NBODY_SEED", "-1")],
        ] {
            let err = SimConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(
                matches!(
                    err,
                    SimError::Setup {
                        kind: SetupFailure::InvalidConfig,
                        ..
                    }
                ),
                "{pairs:?} gave {err}"
            );
        }
    }

    #[test]
    fn builder_sets_fields() {
        let c = SimConfig::new(0, 0.5)
            .with_size(800, 600)
            .with_title("t")
            .with_wait_timeout(None)
            .with_transfer(TransferMode::Shared)
            .with_seed(3)
            .with_stats_interval(0);
        assert_eq!(c.particle_count, 0);
        assert_eq!((c.width, c.height), (800, 600));
        assert_eq!(c.wait_timeout, None);
        assert_eq!(c.transfer, TransferMode::Shared);
        assert_eq!(c.stats_interval, 0);
    }
}
