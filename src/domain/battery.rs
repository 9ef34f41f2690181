use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use crate::error::DispatchError;

/// Physical limits of the home battery.
///
/// Power limits are in watts and apply to `battery_power`, where a positive
/// value means the battery is discharging into the house.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_capacity_window", skip_on_field_errors = false))]
pub struct BatterySetup {
    /// Maximum charging power (W)
    #[validate(range(min = 0.0))]
    pub max_charge_w: f64,

    /// Maximum discharging power (W)
    #[validate(range(min = 0.0))]
    pub max_discharge_w: f64,

    /// Usable capacity ceiling (kWh)
    #[validate(range(exclusive_min = 0.0))]
    pub max_capacity_kwh: f64,

    /// Capacity floor (kWh). `None` means no floor is configured and the
    /// charge only has to stay above zero.
    #[serde(default)]
    pub min_capacity_kwh: Option<f64>,

    /// Maximum change of battery power between consecutive steps (W)
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub rate_limit_w: Option<f64>,
}

impl BatterySetup {
    pub fn new(max_charge_w: f64, max_discharge_w: f64, max_capacity_kwh: f64) -> Self {
        Self {
            max_charge_w,
            max_discharge_w,
            max_capacity_kwh,
            min_capacity_kwh: None,
            rate_limit_w: None,
        }
    }

    pub fn with_min_capacity(mut self, min_capacity_kwh: f64) -> Self {
        self.min_capacity_kwh = Some(min_capacity_kwh);
        self
    }

    pub fn with_rate_limit(mut self, rate_limit_w: f64) -> Self {
        self.rate_limit_w = Some(rate_limit_w);
        self
    }

    /// Lower charge bound (exclusive). Zero when no floor is configured.
    pub fn floor_kwh(&self) -> f64 {
        self.min_capacity_kwh.unwrap_or(0.0)
    }

    pub fn check(&self) -> Result<(), DispatchError> {
        self.validate()?;
        Ok(())
    }
}

fn validate_capacity_window(battery: &BatterySetup) -> Result<(), ValidationError> {
    let limits = [
        battery.max_charge_w,
        battery.max_discharge_w,
        battery.max_capacity_kwh,
        battery.floor_kwh(),
        battery.rate_limit_w.unwrap_or(0.0),
    ];
    if limits.iter().any(|v| !v.is_finite()) {
        let mut err = ValidationError::new("non_finite_limit");
        err.message = Some(Cow::from("battery limits must be finite numbers"));
        return Err(err);
    }

    if battery.floor_kwh() >= battery.max_capacity_kwh {
        let mut err = ValidationError::new("capacity_window");
        err.message = Some(Cow::from(format!(
            "capacity floor {} kWh must be below the ceiling {} kWh",
            battery.floor_kwh(),
            battery.max_capacity_kwh
        )));
        return Err(err);
    }

    Ok(())
}
