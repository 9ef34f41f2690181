//! Solver backends.
//!
//! A backend takes a [`Problem`] and returns an [`Assignment`] holding a
//! value for every variable, or reports why it could not.
//!
//! - `lp`: linear problems through `good_lp` and the Clarabel interior-point solver
//! - `nlp`: any problem, augmented Lagrangian around L-BFGS

pub mod lp;
pub mod nlp;

pub use lp::*;
pub use nlp::*;

use super::model::{Assignment, Problem};
use crate::error::DispatchError;

pub trait Solver: Send + Sync {
    /// Identifier used in logs and reports
    fn id(&self) -> &'static str;

    /// Whether this backend can solve `problem` at all
    fn supports(&self, problem: &Problem) -> bool;

    fn solve(&self, problem: &Problem) -> Result<Assignment, DispatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solvers_are_object_safe_and_send_sync() {
        fn _assert_send_sync<T: Send + Sync>() {}
        _assert_send_sync::<Box<dyn Solver>>();

        let solvers: Vec<Box<dyn Solver>> =
            vec![Box::new(LpSolver::default()), Box::new(NlpSolver::default())];
        let ids: Vec<_> = solvers.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["clarabel-lp", "augmented-lagrangian-lbfgs"]);
    }
}
