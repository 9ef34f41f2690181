//! Linear backend: translates the model into `good_lp` and solves it with Clarabel.

use good_lp::solvers::clarabel::clarabel;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
    Variable,
};
use std::time::Instant;
use tracing::{debug, warn};

use super::Solver;
use crate::error::DispatchError;
use crate::optimizer::model::{Assignment, LinearExpr, Problem, Relation};

/// Problems past this many steps' worth of variables take noticeably longer on small hardware.
const LARGE_PROBLEM_VARIABLES: usize = 5_000;

#[derive(Debug, Clone, Default)]
pub struct LpSolver;

impl LpSolver {
    pub fn new() -> Self {
        Self
    }
}

fn to_expression(expr: &LinearExpr, vars: &[Variable]) -> Expression {
    expr.terms
        .iter()
        .map(|&(v, c)| c * vars[v.index()])
        .fold(Expression::from(expr.constant), |acc, term| acc + term)
}

impl Solver for LpSolver {
    fn id(&self) -> &'static str {
        "clarabel-lp"
    }

    fn supports(&self, problem: &Problem) -> bool {
        problem.is_linear()
    }

    fn solve(&self, problem: &Problem) -> Result<Assignment, DispatchError> {
        if !self.supports(problem) {
            return Err(DispatchError::Unsupported {
                solver: self.id(),
                reason: "objective contains nonlinear terms".to_string(),
            });
        }
        if problem.num_variables() > LARGE_PROBLEM_VARIABLES {
            warn!(
                variables = problem.num_variables(),
                "large LP; consider a coarser step duration"
            );
        }
        let start = Instant::now();

        let mut lp_vars = ProblemVariables::new();
        let vars: Vec<Variable> = problem
            .variables
            .iter()
            .map(|def| {
                let mut definition = variable();
                if def.lower.is_finite() {
                    definition = definition.min(def.lower);
                }
                if def.upper.is_finite() {
                    definition = definition.max(def.upper);
                }
                lp_vars.add(definition)
            })
            .collect();

        let objective = problem
            .objective
            .iter()
            .filter_map(|term| match term {
                crate::optimizer::model::ObjectiveTerm::Linear(expr) => {
                    Some(to_expression(expr, &vars))
                }
                _ => None,
            })
            .fold(Expression::from(0.0), |acc, term| acc + term);

        let mut lp = lp_vars.minimise(objective).using(clarabel);
        for row in &problem.constraints {
            let lhs = to_expression(&row.expr, &vars);
            lp = match row.relation {
                Relation::Eq => lp.with(constraint!(lhs == 0.0)),
                Relation::Le => lp.with(constraint!(lhs <= 0.0)),
                Relation::Ge => lp.with(constraint!(lhs >= 0.0)),
            };
        }

        let solution = lp.solve().map_err(|e| match e {
            ResolutionError::Infeasible => {
                DispatchError::Infeasible("LP solver reported a primal infeasible problem".to_string())
            }
            ResolutionError::Unbounded => {
                DispatchError::SolverNonConvergence("LP objective is unbounded".to_string())
            }
            other => DispatchError::SolverNonConvergence(format!("LP solver failed: {other}")),
        })?;

        let values: Vec<f64> = vars.iter().map(|&v| solution.value(v)).collect();
        let objective = problem.objective_value(&values);
        debug!(
            objective,
            violation = problem.max_violation(&values),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "LP solved"
        );

        Ok(Assignment {
            values,
            objective,
            solver: self.id(),
        })
    }
}
