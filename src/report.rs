//! JSON report written by the driver.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveTime};
use serde::Serialize;

use crate::domain::{Dispatch, Scenario, Schedule};
use crate::error::DispatchError;

pub const OPTIMIZER_VERSION: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub strategy: String,
    pub steps: usize,
    pub objective: f64,
    /// Import cost minus export credit of the optimized dispatch
    pub energy_cost: f64,
    /// Same, with the battery idle
    pub baseline_cost: f64,
    pub savings: f64,
    pub schedule: Schedule,
}

impl ScenarioReport {
    pub fn new(
        name: &str,
        strategy: &str,
        scenario: &Scenario,
        dispatch: &Dispatch,
        start: DateTime<FixedOffset>,
    ) -> Self {
        let energy_cost = dispatch.energy_cost(scenario);
        let baseline_cost = Dispatch::baseline_cost(scenario);
        Self {
            name: name.to_string(),
            strategy: strategy.to_string(),
            steps: dispatch.len(),
            objective: dispatch.objective,
            energy_cost,
            baseline_cost,
            savings: baseline_cost - energy_cost,
            schedule: dispatch.to_schedule(start, step_duration(scenario), OPTIMIZER_VERSION),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub name: String,
    pub kind: &'static str,
    pub message: String,
}

impl FailureReport {
    pub fn new(name: &str, error: &DispatchError) -> Self {
        Self {
            name: name.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// A scenario that could not be read or generated.
    pub fn unresolved(name: &str, error: &anyhow::Error) -> Self {
        Self {
            name: name.to_string(),
            kind: "scenario_source",
            message: format!("{error:#}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<FixedOffset>,
    pub scenarios: Vec<ScenarioReport>,
    pub failures: Vec<FailureReport>,
}

impl Report {
    pub fn new(mut scenarios: Vec<ScenarioReport>, mut failures: Vec<FailureReport>) -> Self {
        // tasks finish in any order
        scenarios.sort_by(|a, b| a.name.cmp(&b.name));
        failures.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            generated_at: Local::now().fixed_offset(),
            scenarios,
            failures,
        }
    }
}

pub fn step_duration(scenario: &Scenario) -> Duration {
    Duration::milliseconds((scenario.step_duration_seconds * 1000.0).round() as i64)
}

/// Local midnight of the current day.
pub fn default_start() -> DateTime<FixedOffset> {
    let now = Local::now();
    now.date_naive()
        .and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest()
        .map(|t| t.fixed_offset())
        .unwrap_or_else(|| now.fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Action;

    #[test]
    fn test_report_costs_and_schedule() {
        let scenario = Scenario::new(vec![1.0, 10.0], vec![0.0, 1000.0], vec![1000.0, 0.0], 3600.0, 0.1);
        let dispatch = Dispatch {
            battery_power_w: vec![-1000.0, 1000.0],
            grid_power_w: vec![0.0, 0.0],
            charge_kwh: vec![1.0, 2.0],
            objective: 0.0,
        };
        let start = DateTime::parse_from_rfc3339("2024-06-01T00:00:00+02:00").unwrap();

        let report = ScenarioReport::new("spike", "linear", &scenario, &dispatch, start);
        assert_eq!(report.steps, 2);
        assert_eq!(report.energy_cost, 0.0);
        // idle: export 1 kWh credited at 0.1, import 1 kWh at 10
        assert!((report.baseline_cost - 9.9).abs() < 1e-12);
        assert!((report.savings - 9.9).abs() < 1e-12);
        assert_eq!(report.schedule.entries[0].action, Action::Charge);
        assert_eq!(report.schedule.entries[1].action, Action::Discharge);
        assert_eq!(report.schedule.valid_until, start + Duration::hours(2));
        assert_eq!(report.schedule.optimizer_version, OPTIMIZER_VERSION);
    }

    #[test]
    fn test_report_orders_by_name() {
        let failures = vec![
            FailureReport::new("b", &DispatchError::Infeasible("x".into())),
            FailureReport::new("a", &DispatchError::InvalidScenario("y".into())),
        ];
        let report = Report::new(Vec::new(), failures);
        assert_eq!(report.failures[0].name, "a");
        assert_eq!(report.failures[0].kind, "invalid_scenario");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failures"][1]["kind"], "infeasible");
    }

    #[test]
    fn test_unresolved_source_keeps_context() {
        let error = anyhow::anyhow!("no such file").context("reading scenario file winter.json");
        let failure = FailureReport::unresolved("winter.json", &error);
        assert_eq!(failure.kind, "scenario_source");
        assert_eq!(failure.message, "reading scenario file winter.json: no such file");
    }

    #[test]
    fn test_step_duration_from_seconds() {
        let scenario = Scenario::new(vec![1.0], vec![0.0], vec![0.0], 900.0, 0.1);
        assert_eq!(step_duration(&scenario), Duration::minutes(15));
    }
}
