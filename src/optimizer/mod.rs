pub mod dynamics;
pub mod extract;
pub mod model;
pub mod objective;
pub mod options;
pub mod smoothing;
pub mod solver;
pub mod strategies;
pub mod types;

pub use dynamics::*;
pub use extract::*;
pub use model::*;
pub use objective::*;
pub use options::*;
pub use solver::{LpSolver, NlpConfig, NlpSolver, Solver};
pub use strategies::*;
pub use types::*;

use crate::domain::{BatterySetup, Dispatch, Scenario};
use crate::error::DispatchError;

/// Optimizes one scenario with default tuning.
pub fn optimize_dispatch(
    scenario: &Scenario,
    battery: &BatterySetup,
    formulation: Formulation,
) -> Result<Dispatch, DispatchError> {
    DispatchOptimizer::from_formulation(formulation, FormulationOptions::default(), NlpConfig::default())
        .optimize(scenario, battery)
}
