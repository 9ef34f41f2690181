use tracing::debug;

use crate::domain::{BatterySetup, Dispatch, Scenario};
use crate::error::DispatchError;
use crate::optimizer::options::{Formulation, FormulationOptions, WarmStart};
use crate::optimizer::solver::{NlpConfig, NlpSolver};
use crate::optimizer::types::DispatchStrategy;

use super::{solve_formulation, LinearDispatch};

/// Logistic-gated formulation solved by the augmented Lagrangian backend.
///
/// Import and export costs are blended with `σ(±k·g)`, which keeps the
/// objective differentiable at zero grid power. The result is a local
/// optimum; with [`WarmStart::Linear`] the iterations start from the exact
/// LP solution, which the smooth optimum lies close to.
#[derive(Debug, Clone, Default)]
pub struct SmoothDispatch {
    options: FormulationOptions,
    solver: NlpSolver,
}

impl SmoothDispatch {
    pub fn new(options: FormulationOptions, nlp: NlpConfig) -> Self {
        Self {
            options,
            solver: NlpSolver::new(nlp),
        }
    }

    fn seed(&self, scenario: &Scenario, battery: &BatterySetup) -> Result<Option<Dispatch>, DispatchError> {
        match self.options.warm_start {
            WarmStart::Flat => Ok(None),
            WarmStart::Linear if scenario.has_nonconvex_cost() => {
                debug!("no linear warm start for a nonconvex cost, starting flat");
                Ok(None)
            }
            WarmStart::Linear => {
                let seed = LinearDispatch::new(self.options.clone()).optimize(scenario, battery)?;
                debug!(objective = seed.objective, "warm start from linear formulation");
                Ok(Some(seed))
            }
        }
    }
}

impl DispatchStrategy for SmoothDispatch {
    fn name(&self) -> &'static str {
        "smooth"
    }

    fn optimize(&self, scenario: &Scenario, battery: &BatterySetup) -> Result<Dispatch, DispatchError> {
        scenario.check(battery)?;
        let seed = self.seed(scenario, battery)?;
        solve_formulation(
            scenario,
            battery,
            &self.options,
            Formulation::Smooth,
            seed.as_ref(),
            &self.solver,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spike_scenario() -> Scenario {
        let mut price = vec![1.0; 8];
        price[5] = 10.0;
        let mut solar = vec![0.0; 8];
        solar[1] = 1000.0;
        let mut load = vec![0.0; 8];
        load[5] = 1000.0;
        Scenario::new(price, load, solar, 3600.0, 0.1)
    }

    #[test]
    fn test_smooth_follows_price_spike() {
        let scenario = spike_scenario();
        let battery = BatterySetup::new(1000.0, 1000.0, 5.0);

        let dispatch = SmoothDispatch::default().optimize(&scenario, &battery).unwrap();
        let p = &dispatch.battery_power_w;
        assert!(p[1] < -900.0, "{p:?}");
        assert!(p[5] > 900.0, "{p:?}");
        assert!(p.iter().all(|&x| (-1000.0 - 1e-6..=1000.0 + 1e-6).contains(&x)));
        assert!((dispatch.charge_kwh[0] - dispatch.charge_kwh[7]).abs() < 1e-4);
    }

    #[test]
    fn test_negative_prices_cycle_the_battery() {
        // buy at -1, sell back at -0.5 with a 10% export credit: cost -0.95
        let scenario = Scenario::new(vec![-1.0, -0.5, 0.0], vec![0.0; 3], vec![0.0; 3], 3600.0, 0.1);
        let battery = BatterySetup::new(1000.0, 1000.0, 5.0);

        let dispatch = SmoothDispatch::default().optimize(&scenario, &battery).unwrap();
        let p = &dispatch.battery_power_w;
        assert!(p[0] < -900.0, "{p:?}");
        assert!(p[1] > 900.0, "{p:?}");
        assert!(dispatch.energy_cost(&scenario) < -0.85);
        assert!(dispatch.energy_cost(&scenario) < Dispatch::baseline_cost(&scenario));
    }

    #[test]
    fn test_flat_start_on_zero_scenario() {
        let scenario = Scenario::new(vec![1.0; 4], vec![0.0; 4], vec![0.0; 4], 900.0, 0.1);
        let battery = BatterySetup::new(10.0, 10.0, 1.0);
        let options = FormulationOptions {
            warm_start: WarmStart::Flat,
            ..FormulationOptions::default()
        };

        let dispatch = SmoothDispatch::new(options, NlpConfig::default())
            .optimize(&scenario, &battery)
            .unwrap();
        assert!(dispatch.battery_power_w.iter().all(|p| p.abs() < 1e-2), "{dispatch:?}");
        assert!(dispatch.grid_power_w.iter().all(|g| g.abs() < 1e-2), "{dispatch:?}");
    }
}
