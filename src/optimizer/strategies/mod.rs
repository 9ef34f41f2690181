//! Dispatch strategies
//!
//! - Linear: import/export split, solved exactly as an LP
//! - Smooth: logistic-gated import/export cost, solved as an NLP and
//!   warm-started from the linear solution

pub mod linear;
pub mod smooth;

pub use linear::*;
pub use smooth::*;

use std::time::Instant;
use tracing::info;

use super::dynamics::build_dynamics;
use super::extract::extract_dispatch;
use super::objective::assemble_objective;
use super::options::{Formulation, FormulationOptions};
use super::solver::Solver;
use crate::domain::{BatterySetup, Dispatch, Scenario};
use crate::error::DispatchError;

/// Validate, build, solve and extract one formulation.
pub(crate) fn solve_formulation(
    scenario: &Scenario,
    battery: &BatterySetup,
    options: &FormulationOptions,
    formulation: Formulation,
    seed: Option<&Dispatch>,
    solver: &dyn Solver,
) -> Result<Dispatch, DispatchError> {
    scenario.check(battery)?;
    options.check(battery)?;
    let start = Instant::now();

    let mut model = build_dynamics(scenario, battery, options, formulation, seed);
    assemble_objective(&mut model, scenario, options);
    let assignment = solver.solve(&model.problem)?;
    let dispatch = extract_dispatch(&model, scenario, &assignment);

    info!(
        %formulation,
        solver = assignment.solver,
        steps = dispatch.len(),
        objective = dispatch.objective,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "dispatch optimized"
    );
    Ok(dispatch)
}
