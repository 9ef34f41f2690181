use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Below this magnitude a step is reported as idle.
pub const IDLE_THRESHOLD_W: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    Charge,
    Discharge,
    Idle,
}

impl Action {
    /// Classifies a battery power value (positive = discharging).
    pub fn from_battery_power(battery_power_w: f64) -> Self {
        if battery_power_w > IDLE_THRESHOLD_W {
            Action::Discharge
        } else if battery_power_w < -IDLE_THRESHOLD_W {
            Action::Charge
        } else {
            Action::Idle
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub created_at: DateTime<FixedOffset>,
    pub valid_from: DateTime<FixedOffset>,
    pub valid_until: DateTime<FixedOffset>,
    pub entries: Vec<ScheduleEntry>,
    pub optimizer_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub time_start: DateTime<FixedOffset>,
    pub time_end: DateTime<FixedOffset>,
    pub battery_power_w: f64,
    pub grid_power_w: f64,
    pub charge_kwh: f64,
    pub action: Action,
}

impl Schedule {
    pub fn power_at(&self, t: DateTime<FixedOffset>) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| t >= e.time_start && t < e.time_end)
            .map(|e| e.battery_power_w)
    }

    pub fn step(&self) -> Option<Duration> {
        self.entries.first().map(|e| e.time_end - e.time_start)
    }
}
