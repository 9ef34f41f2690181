//! Scalar cost: grid import cost, export credit and the centering tie-break.

use tracing::debug;

use super::dynamics::DispatchModel;
use super::model::{Gate, LinearExpr, ObjectiveTerm};
use super::options::FormulationOptions;
use crate::domain::Scenario;

/// Appends the cost terms for every step of `model`.
///
/// With `w = price · kwh_per_watt_step` the per-step cost is
/// `w · max(g, 0) + export_fraction · w · min(g, 0)` for grid power `g`,
/// either exactly through the split variables or through logistic gates.
pub fn assemble_objective(model: &mut DispatchModel, scenario: &Scenario, options: &FormulationOptions) {
    let kwh_per_watt = scenario.kwh_per_watt_step();
    let export_fraction = scenario.export_fraction;

    for (i, step) in model.steps.iter().enumerate() {
        let weight = scenario.price[i] * kwh_per_watt;

        match step.grid_split {
            Some(split) => {
                model.problem.add_objective(ObjectiveTerm::Linear(
                    LinearExpr::constant(0.0)
                        .plus(split.import, weight)
                        .plus(split.export, -export_fraction * weight),
                ));
            }
            None => {
                model.problem.add_objective(ObjectiveTerm::Gated {
                    expr: step.grid_power.clone(),
                    weight,
                    gate: Gate::Positive,
                    steepness: options.steepness,
                });
                // σ(-k·g)·g is negative for exports, so a positive weight credits them
                model.problem.add_objective(ObjectiveTerm::Gated {
                    expr: step.grid_power.clone(),
                    weight: export_fraction * weight,
                    gate: Gate::Negative,
                    steepness: options.steepness,
                });
            }
        }

        model.problem.add_objective(ObjectiveTerm::Linear(
            LinearExpr::constant(0.0).plus(step.centering, options.centering_weight),
        ));
    }

    debug!(terms = model.problem.objective.len(), "objective assembled");
}
