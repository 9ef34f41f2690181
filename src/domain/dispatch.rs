use chrono::{DateTime, Duration, FixedOffset, Local};
use itertools::izip;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Action, Scenario, Schedule, ScheduleEntry};

/// Solved battery dispatch: three aligned per-step sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    /// Power from the battery to the house (W), positive = discharging
    pub battery_power_w: Vec<f64>,
    /// Power drawn from the grid (W), negative = export
    pub grid_power_w: Vec<f64>,
    /// State of charge at the start of each step (kWh)
    pub charge_kwh: Vec<f64>,
    /// Objective value reported by the solver, including smoothing and penalty terms
    pub objective: f64,
}

impl Dispatch {
    pub fn len(&self) -> usize {
        self.battery_power_w.len()
    }

    pub fn is_empty(&self) -> bool {
        self.battery_power_w.is_empty()
    }

    /// Exact electricity cost of this dispatch: import cost minus export credit.
    pub fn energy_cost(&self, scenario: &Scenario) -> f64 {
        let kwh = scenario.kwh_per_watt_step();
        self.grid_power_w
            .iter()
            .zip(&scenario.price)
            .map(|(&grid, &price)| {
                if grid >= 0.0 {
                    grid * kwh * price
                } else {
                    grid * kwh * price * scenario.export_fraction
                }
            })
            .sum()
    }

    /// Cost of the same scenario with the battery left idle.
    pub fn baseline_cost(scenario: &Scenario) -> f64 {
        let idle = Dispatch {
            battery_power_w: vec![0.0; scenario.horizon_steps()],
            grid_power_w: (0..scenario.horizon_steps())
                .map(|i| scenario.grid_power_w(i, 0.0))
                .collect(),
            charge_kwh: vec![0.0; scenario.horizon_steps()],
            objective: 0.0,
        };
        idle.energy_cost(scenario)
    }

    /// Lays the dispatch out on a wall-clock timeline starting at `start`.
    pub fn to_schedule(
        &self,
        start: DateTime<FixedOffset>,
        step: Duration,
        optimizer_version: &str,
    ) -> Schedule {
        let entries: Vec<ScheduleEntry> = izip!(
            &self.battery_power_w,
            &self.grid_power_w,
            &self.charge_kwh
        )
        .enumerate()
        .map(|(i, (&battery, &grid, &charge))| {
            let time_start = start + step * i as i32;
            ScheduleEntry {
                time_start,
                time_end: time_start + step,
                battery_power_w: battery,
                grid_power_w: grid,
                charge_kwh: charge,
                action: Action::from_battery_power(battery),
            }
        })
        .collect();

        let valid_until = entries.last().map(|e| e.time_end).unwrap_or(start);
        Schedule {
            id: Uuid::new_v4(),
            created_at: Local::now().fixed_offset(),
            valid_from: start,
            valid_until,
            entries,
            optimizer_version: optimizer_version.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Scenario, Dispatch) {
        let scenario = Scenario::new(
            vec![1.0, 2.0, 1.0],
            vec![1000.0, 0.0, 0.0],
            vec![0.0, 0.0, 2000.0],
            3600.0,
            0.5,
        );
        let battery = vec![0.0, 0.0, 0.0];
        let grid = (0..3).map(|i| scenario.grid_power_w(i, battery[i])).collect();
        let dispatch = Dispatch {
            battery_power_w: battery,
            grid_power_w: grid,
            charge_kwh: vec![1.0, 1.0, 1.0],
            objective: 0.0,
        };
        (scenario, dispatch)
    }

    #[test]
    fn test_energy_cost_credits_exports() {
        let (scenario, dispatch) = sample();
        // 1 kWh imported at 1.0, 2 kWh exported at 0.5 * 1.0
        assert!((dispatch.energy_cost(&scenario) - 0.0).abs() < 1e-12);
        assert!((Dispatch::baseline_cost(&scenario) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_schedule_timeline() {
        let (_, dispatch) = sample();
        let start = DateTime::parse_from_rfc3339("2024-06-01T00:00:00+02:00").unwrap();
        let schedule = dispatch.to_schedule(start, Duration::minutes(15), "test");

        assert_eq!(schedule.entries.len(), 3);
        assert_eq!(schedule.valid_from, start);
        assert_eq!(schedule.valid_until, start + Duration::minutes(45));
        assert_eq!(schedule.step(), Some(Duration::minutes(15)));
        assert_eq!(
            schedule.power_at(start + Duration::minutes(20)),
            Some(0.0)
        );
        assert_eq!(schedule.power_at(start + Duration::hours(1)), None);
        assert!(schedule.entries.iter().all(|e| e.action == Action::Idle));
    }
}
