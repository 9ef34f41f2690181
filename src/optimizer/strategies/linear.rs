use crate::domain::{BatterySetup, Dispatch, Scenario};
use crate::error::DispatchError;
use crate::optimizer::options::{Formulation, FormulationOptions};
use crate::optimizer::solver::{LpSolver, Solver};
use crate::optimizer::types::DispatchStrategy;

use super::solve_formulation;

/// Exact LP formulation.
///
/// Grid power is split into non-negative import and export parts, so the
/// cost `w·import − f·w·export` is linear and the optimum is global.
/// The split is only exact while the cost is convex, so scenarios with
/// negative prices and partial export credit are refused; the smooth
/// formulation handles those.
#[derive(Debug, Clone, Default)]
pub struct LinearDispatch {
    options: FormulationOptions,
    solver: LpSolver,
}

impl LinearDispatch {
    pub fn new(options: FormulationOptions) -> Self {
        Self {
            options,
            solver: LpSolver::new(),
        }
    }
}

impl DispatchStrategy for LinearDispatch {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn optimize(&self, scenario: &Scenario, battery: &BatterySetup) -> Result<Dispatch, DispatchError> {
        scenario.check(battery)?;
        if scenario.has_nonconvex_cost() {
            // import and export would both run to their caps at w < 0
            return Err(DispatchError::Unsupported {
                solver: self.solver.id(),
                reason: "negative prices with export_fraction below 1 make the grid cost nonconvex"
                    .to_string(),
            });
        }
        solve_formulation(
            scenario,
            battery,
            &self.options,
            Formulation::Linear,
            None,
            &self.solver,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-4;

    #[test]
    fn test_zero_scenario_stays_idle() {
        let scenario = Scenario::new(vec![1.0; 4], vec![0.0; 4], vec![0.0; 4], 900.0, 0.1);
        let battery = BatterySetup::new(10.0, 10.0, 1.0);

        let dispatch = LinearDispatch::default().optimize(&scenario, &battery).unwrap();
        assert_eq!(dispatch.len(), 4);
        assert!(dispatch.battery_power_w.iter().all(|p| p.abs() < TOL), "{dispatch:?}");
        assert!(dispatch.grid_power_w.iter().all(|g| g.abs() < TOL), "{dispatch:?}");
    }

    #[test]
    fn test_price_spike_is_served_from_solar_surplus() {
        let mut price = vec![1.0; 8];
        price[5] = 10.0;
        let mut solar = vec![0.0; 8];
        solar[1] = 1000.0;
        let mut load = vec![0.0; 8];
        load[5] = 1000.0;
        let scenario = Scenario::new(price, load, solar, 3600.0, 0.1);
        let battery = BatterySetup::new(1000.0, 1000.0, 5.0);

        let dispatch = LinearDispatch::default().optimize(&scenario, &battery).unwrap();
        let p = &dispatch.battery_power_w;
        assert!((p[1] + 1000.0).abs() < 1e-3, "{p:?}");
        assert!((p[5] - 1000.0).abs() < 1e-3, "{p:?}");
        for i in [0, 2, 3, 4, 6, 7] {
            assert!(p[i].abs() < 1e-3, "step {i}: {p:?}");
        }
        assert!(dispatch.grid_power_w.iter().all(|g| g.abs() < 1e-3));
        assert!(dispatch.energy_cost(&scenario) < Dispatch::baseline_cost(&scenario));
    }

    #[test]
    fn test_negative_price_with_partial_credit_is_refused() {
        let scenario = Scenario::new(vec![-1.0, -0.5, 0.0], vec![0.0; 3], vec![0.0; 3], 3600.0, 0.1);
        let battery = BatterySetup::new(1000.0, 1000.0, 5.0);

        let err = LinearDispatch::default().optimize(&scenario, &battery).unwrap_err();
        assert!(
            matches!(err, DispatchError::Unsupported { solver: "clarabel-lp", .. }),
            "{err}"
        );
    }

    #[test]
    fn test_negative_price_with_full_credit_stays_exact() {
        // with f = 1 the cost is w·g on both sides of zero
        let scenario = Scenario::new(vec![-1.0, -0.5, 0.0], vec![0.0; 3], vec![0.0; 3], 3600.0, 1.0);
        let battery = BatterySetup::new(1000.0, 1000.0, 5.0);

        let dispatch = LinearDispatch::default().optimize(&scenario, &battery).unwrap();
        let p = &dispatch.battery_power_w;
        assert!((p[0] + 1000.0).abs() < 1e-3, "{p:?}");
        assert!((p[1] - 1000.0).abs() < 1e-3, "{p:?}");
        assert!((dispatch.energy_cost(&scenario) + 0.5).abs() < 1e-4);
        assert!((dispatch.objective - dispatch.energy_cost(&scenario)).abs() < 1e-3);
    }

    #[test]
    fn test_invalid_scenario_is_rejected() {
        let scenario = Scenario::new(vec![1.0; 3], vec![0.0; 2], vec![0.0; 3], 900.0, 0.1);
        let err = LinearDispatch::default()
            .optimize(&scenario, &BatterySetup::new(1.0, 1.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidScenario(_)));
    }
}
