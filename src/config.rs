use std::path::Path;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub value_iteration: ValueIterationConfig,
    pub rl: RlConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueIterationConfig {
    pub discount: f64,
    pub iterations: usize,
}

impl Default for ValueIterationConfig {
    fn default() -> Self {
        ValueIterationConfig {
            discount: 0.9,
            iterations: 100,
        }
    }
}

/// Which Q-function the learner uses.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AgentKind {
    #[default]
    QLearning,
    Approximate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RlConfig {
    pub agent: AgentKind,
    /// Learning rate.
    pub alpha: f64,
    /// Exploration probability.
    pub epsilon: f64,
    pub discount: f64,
    /// Number of training episodes; exploration and learning stop after this many.
    pub num_training: usize,
    /// Seed for the agent's random source. Drawn from the OS when absent.
    pub seed: Option<u64>,
}

impl Default for RlConfig {
    fn default() -> Self {
        RlConfig {
            agent: AgentKind::default(),
            alpha: 0.5,
            epsilon: 0.5,
            discount: 1.0,
            num_training: 100,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub episodes: usize,
    pub max_steps: usize,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            episodes: 100,
            max_steps: 1000,
            seed: None,
        }
    }
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        check_unit_interval("value_iteration.discount", self.value_iteration.discount)?;
        check_unit_interval("rl.alpha", self.rl.alpha)?;
        check_unit_interval("rl.epsilon", self.rl.epsilon)?;
        check_unit_interval("rl.discount", self.rl.discount)?;
        Ok(())
    }
}

fn check_unit_interval(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration {
            message: format!("{name} must be in [0, 1], got {value}"),
        })
    }
}
