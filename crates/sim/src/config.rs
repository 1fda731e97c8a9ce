//! Scenario configuration read from the environment.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use grasp_core::Vec3;

/// Walk-through settings.
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Agent configuration (TOML).
    pub agent_config: PathBuf,
    /// Interaction table (RON).
    pub table: PathBuf,
    pub steps: u32,
    /// Real time spent at each step of the walk.
    pub step: Duration,
    pub start: Vec3,
    /// Distance covered per step along +X.
    pub stride: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        let data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
        Self {
            agent_config: data.join("agent.toml"),
            table: data.join("targets.ron"),
            steps: 14,
            step: Duration::from_millis(250),
            start: Vec3::new(-600.0, 0.0, 0.0),
            stride: 50.0,
        }
    }
}

impl SimConfig {
    /// Construct scenario configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GRASP_CONFIG` - Agent configuration file (default: bundled `data/agent.toml`)
    /// - `GRASP_TABLE` - Interaction table file (default: bundled `data/targets.ron`)
    /// - `GRASP_STEPS` - Number of steps in the walk (default: 14)
    /// - `GRASP_STEP_MS` - Milliseconds spent per step (default: 250)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(path) = read_env::<PathBuf>("GRASP_CONFIG") {
            config.agent_config = path;
        }
        if let Some(path) = read_env::<PathBuf>("GRASP_TABLE") {
            config.table = path;
        }
        if let Some(steps) = read_env::<u32>("GRASP_STEPS") {
            config.steps = steps;
        }
        if let Some(ms) = read_env::<u64>("GRASP_STEP_MS") {
            config.step = Duration::from_millis(ms.max(10));
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
