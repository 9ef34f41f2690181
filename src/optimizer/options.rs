use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use strum::{Display, EnumString};
use validator::{Validate, ValidationError};

use super::smoothing::DEFAULT_STEEPNESS;
use crate::domain::BatterySetup;
use crate::error::DispatchError;

/// How the import/export split enters the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Formulation {
    /// Explicit import/export split variables; the whole problem is an LP.
    #[default]
    Linear,
    /// Logistic-gated import and export terms; solved as an NLP.
    Smooth,
}

/// Policy for the battery power of the final step, which affects cost but
/// not any charge inside the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TerminalControl {
    /// `HoldPrevious` when a rate limit is configured, otherwise `Idle`.
    ///
    /// Without a rate limit this still pins the last control to zero, so the
    /// default is stricter than leaving the final step unconstrained. Pick
    /// [`TerminalControl::Free`] for the unconstrained formulation.
    #[default]
    Auto,
    /// Last control repeats the second-to-last one.
    HoldPrevious,
    /// Last control is zero.
    Idle,
    /// No closure. The solver can export from the battery at the last step
    /// without that energy ever being accounted for.
    Free,
}

impl TerminalControl {
    pub fn resolve(self, has_rate_limit: bool, horizon_steps: usize) -> TerminalControl {
        match self {
            TerminalControl::Auto if has_rate_limit && horizon_steps >= 2 => {
                TerminalControl::HoldPrevious
            }
            TerminalControl::Auto => TerminalControl::Idle,
            TerminalControl::HoldPrevious if horizon_steps < 2 => TerminalControl::Idle,
            other => other,
        }
    }
}

/// Where the smooth formulation starts its iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WarmStart {
    /// Battery idle, charge at the centering target.
    Flat,
    /// Solution of the linear formulation.
    #[default]
    Linear,
}

/// Tuning constants of the formulation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_tuning", skip_on_field_errors = false))]
pub struct FormulationOptions {
    /// Logistic slope of the smooth import/export gates (per W)
    #[validate(range(exclusive_min = 0.0))]
    pub steepness: f64,
    /// Centering target as a fraction of `max_capacity_kwh`
    #[validate(range(min = 0.0, max = 1.0))]
    pub centering_target_fraction: f64,
    /// Objective weight per kWh of distance from the centering target, per step
    #[validate(range(min = 0.0))]
    pub centering_weight: f64,
    /// Gap kept above the capacity floor so the floor itself is infeasible (kWh)
    #[validate(range(exclusive_min = 0.0))]
    pub floor_margin_kwh: f64,
    pub terminal_control: TerminalControl,
    pub warm_start: WarmStart,
}

impl Default for FormulationOptions {
    fn default() -> Self {
        Self {
            steepness: DEFAULT_STEEPNESS,
            centering_target_fraction: 0.7,
            centering_weight: 1e-6,
            floor_margin_kwh: 1e-6,
            terminal_control: TerminalControl::Auto,
            warm_start: WarmStart::Linear,
        }
    }
}

impl FormulationOptions {
    /// Rejects unusable tuning, and a floor margin that leaves no room for
    /// the charge below `max_capacity_kwh`.
    pub fn check(&self, battery: &BatterySetup) -> Result<(), DispatchError> {
        self.validate()?;
        let lowest_charge = battery.floor_kwh() + self.floor_margin_kwh;
        if lowest_charge >= battery.max_capacity_kwh {
            return Err(DispatchError::InvalidScenario(format!(
                "capacity floor {} kWh plus margin {} kWh leaves no room below the ceiling {} kWh",
                battery.floor_kwh(),
                self.floor_margin_kwh,
                battery.max_capacity_kwh
            )));
        }
        Ok(())
    }
}

// range checks let NaN through
fn validate_tuning(options: &FormulationOptions) -> Result<(), ValidationError> {
    let values = [
        options.steepness,
        options.centering_target_fraction,
        options.centering_weight,
        options.floor_margin_kwh,
    ];
    if values.iter().any(|v| !v.is_finite()) {
        let mut err = ValidationError::new("non_finite_option");
        err.message = Some(Cow::from("formulation options must be finite numbers"));
        return Err(err);
    }
    Ok(())
}
