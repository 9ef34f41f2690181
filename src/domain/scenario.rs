use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;
use validator::{Validate, ValidationError};

use super::BatterySetup;
use crate::error::DispatchError;

/// Time-discretized inputs for one optimization horizon.
///
/// All series share one length N; step i covers
/// `[i * step_duration_seconds, (i + 1) * step_duration_seconds)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_series", skip_on_field_errors = false))]
pub struct Scenario {
    /// Tariff per step (currency/kWh)
    #[validate(length(min = 1))]
    pub price: Vec<f64>,

    /// Household consumption per step (W)
    pub load_w: Vec<f64>,

    /// Available solar power per step (W)
    pub solar_w: Vec<f64>,

    /// Step length (s)
    #[validate(range(exclusive_min = 0.0))]
    pub step_duration_seconds: f64,

    /// Share of the tariff paid back for exported energy
    #[validate(range(min = 0.0, max = 1.0))]
    pub export_fraction: f64,
}

impl Scenario {
    pub fn new(
        price: Vec<f64>,
        load_w: Vec<f64>,
        solar_w: Vec<f64>,
        step_duration_seconds: f64,
        export_fraction: f64,
    ) -> Self {
        Self {
            price,
            load_w,
            solar_w,
            step_duration_seconds,
            export_fraction,
        }
    }

    pub fn horizon_steps(&self) -> usize {
        self.price.len()
    }

    pub fn step_hours(&self) -> f64 {
        self.step_duration_seconds / 3600.0
    }

    /// Energy (kWh) moved by one watt held for one step.
    pub fn kwh_per_watt_step(&self) -> f64 {
        self.step_hours() / 1000.0
    }

    /// Grid power at step `i` for a given battery power; positive means import.
    pub fn grid_power_w(&self, i: usize, battery_power_w: f64) -> f64 {
        self.load_w[i] - self.solar_w[i] - battery_power_w
    }

    /// Some step has a negative price while exports earn less than the full
    /// tariff. The per-step cost is then concave in grid power, so no linear
    /// import/export split can represent it.
    pub fn has_nonconvex_cost(&self) -> bool {
        self.export_fraction < 1.0 && self.price.iter().any(|&p| p < 0.0)
    }

    /// Rejects malformed scenarios and battery setups before any problem is built.
    pub fn check(&self, battery: &BatterySetup) -> Result<(), DispatchError> {
        self.validate()?;
        battery.check()
    }
}

fn validate_series(scenario: &Scenario) -> Result<(), ValidationError> {
    let n = scenario.price.len();
    if scenario.load_w.len() != n || scenario.solar_w.len() != n {
        let mut err = ValidationError::new("length_mismatch");
        err.message = Some(Cow::from(format!(
            "series lengths differ: price={}, load={}, solar={}",
            n,
            scenario.load_w.len(),
            scenario.solar_w.len()
        )));
        return Err(err);
    }

    let all_finite = scenario
        .price
        .iter()
        .chain(&scenario.load_w)
        .chain(&scenario.solar_w)
        .chain([&scenario.step_duration_seconds, &scenario.export_fraction])
        .all(|v| v.is_finite());
    if !all_finite {
        let mut err = ValidationError::new("non_finite");
        err.message = Some(Cow::from("scenario contains NaN or infinite values"));
        return Err(err);
    }

    Ok(())
}

/// On-disk scenario description consumed by the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub name: String,
    pub scenario: Scenario,
    #[serde(default)]
    pub battery: Option<BatterySetup>,
}

impl ScenarioFile {
    /// Reads a scenario from JSON, or TOML when the extension is `.toml`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario file {}", path.display()))?;
        let parsed = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&raw)
                .with_context(|| format!("parsing TOML scenario {}", path.display()))?,
            _ => serde_json::from_str(&raw)
                .with_context(|| format!("parsing JSON scenario {}", path.display()))?,
        };
        Ok(parsed)
    }
}
