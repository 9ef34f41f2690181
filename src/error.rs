use thiserror::Error;

/// Errors surfaced by the dispatch optimizer.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Problem is infeasible: {0}")]
    Infeasible(String),

    #[error("Solver did not converge: {0}")]
    SolverNonConvergence(String),

    #[error("Solver {solver} cannot handle this problem: {reason}")]
    Unsupported { solver: &'static str, reason: String },
}

impl DispatchError {
    /// Infeasibility and non-convergence are terminal for the scenario;
    /// callers treat them the same way.
    pub fn is_solver_failure(&self) -> bool {
        matches!(
            self,
            DispatchError::Infeasible(_) | DispatchError::SolverNonConvergence(_)
        )
    }

    /// Short machine-readable tag, used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::InvalidScenario(_) => "invalid_scenario",
            DispatchError::Infeasible(_) => "infeasible",
            DispatchError::SolverNonConvergence(_) => "solver_non_convergence",
            DispatchError::Unsupported { .. } => "unsupported",
        }
    }
}

impl From<validator::ValidationErrors> for DispatchError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DispatchError::InvalidScenario(errors.to_string())
    }
}
