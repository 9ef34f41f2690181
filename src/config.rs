use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::{BatterySetup, Scenario, ScenarioFile};
use crate::optimizer::{Formulation, FormulationOptions, NlpConfig};
use crate::simulation::{self, SyntheticDay};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "DISPATCH__";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub optimizer: OptimizerConfig,
    pub battery: BatterySetup,
    pub scenarios: Vec<ScenarioSource>,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub formulation: Formulation,
    pub options: FormulationOptions,
    pub nlp: NlpConfig,
}

/// Where a scenario comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ScenarioSource {
    /// The built-in reference day
    Demo,
    /// Generated day with a sinusoidal load
    Synthetic {
        name: String,
        #[serde(flatten)]
        day: SyntheticDay,
    },
    /// JSON or TOML `ScenarioFile`
    File { path: PathBuf },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Report destination; stdout when unset
    pub path: Option<PathBuf>,
    /// Timestamp of the first step; local midnight today when unset
    pub start_time: Option<DateTime<FixedOffset>>,
    pub pretty: bool,
}

/// A scenario ready to optimize.
#[derive(Debug, Clone)]
pub struct NamedScenario {
    pub name: String,
    pub scenario: Scenario,
    pub battery: BatterySetup,
}

impl ScenarioSource {
    /// Name used in logs and reports before the source is resolved.
    pub fn label(&self) -> String {
        match self {
            ScenarioSource::Demo => "demo".to_string(),
            ScenarioSource::Synthetic { name, .. } => name.clone(),
            ScenarioSource::File { path } => path.display().to_string(),
        }
    }

    /// Builds or reads the scenario. Files may carry their own battery;
    /// every other source uses `default_battery`.
    pub fn resolve(&self, default_battery: &BatterySetup) -> Result<NamedScenario> {
        match self {
            ScenarioSource::Demo => Ok(NamedScenario {
                name: "demo".to_string(),
                scenario: simulation::demo_scenario(),
                battery: default_battery.clone(),
            }),
            ScenarioSource::Synthetic { name, day } => Ok(NamedScenario {
                name: name.clone(),
                scenario: day
                    .build()
                    .with_context(|| format!("generating synthetic scenario {name}"))?,
                battery: default_battery.clone(),
            }),
            ScenarioSource::File { path } => {
                let file = ScenarioFile::load(path)?;
                Ok(NamedScenario {
                    name: file.name,
                    scenario: file.scenario,
                    battery: file.battery.unwrap_or_else(|| default_battery.clone()),
                })
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            optimizer: OptimizerConfig::default(),
            battery: simulation::demo_battery(),
            scenarios: vec![ScenarioSource::Demo],
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Defaults, then the TOML file at `path` if present, then `DISPATCH__*`
    /// environment variables.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let config: Config = figment
            .extract()
            .with_context(|| format!("loading configuration from {}", path.display()))?;
        config.battery.check().context("invalid battery configuration")?;
        config
            .optimizer
            .options
            .check(&config.battery)
            .context("invalid optimizer options")?;
        Ok(config)
    }
}
