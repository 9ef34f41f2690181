//! Augmented Lagrangian backend.
//!
//! Each outer iteration minimises
//!
//! ```text
//! L(y; λ, μ) = f(y) + Σ_eq (λ·h + μ/2·h²) + Σ_ineq (max(0, λ + μ·g)² − λ²) / 2μ
//! ```
//!
//! with L-BFGS, then updates the multipliers (`λ += μ·h`, `λ = max(0, λ + μ·g)`)
//! and grows `μ` whenever the violation stalls. Variable bounds are handled as
//! ordinary inequality rows.
//!
//! The backend works on scaled variables `y = x / s` where `s` is the largest
//! finite bound magnitude of each variable, so watts and kilowatt-hours end up
//! on comparable scales. Rows are normalised to unit coefficient norm in `y`.

use argmin::core::{CostFunction, Executor, Gradient, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use super::Solver;
use crate::error::DispatchError;
use crate::optimizer::model::{Assignment, Problem, Relation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NlpConfig {
    pub max_outer_iterations: usize,
    /// L-BFGS iteration cap per outer iteration
    pub inner_iterations: u64,
    /// Accepted max constraint violation, in the units of each row
    pub feasibility_tolerance: f64,
    pub initial_penalty: f64,
    pub penalty_growth: f64,
    pub max_penalty: f64,
    /// L-BFGS history length
    pub memory: usize,
    /// Wall-clock budget, checked between outer iterations
    pub time_limit_ms: Option<u64>,
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            max_outer_iterations: 50,
            inner_iterations: 500,
            feasibility_tolerance: 1e-6,
            initial_penalty: 10.0,
            penalty_growth: 10.0,
            max_penalty: 1e12,
            memory: 7,
            time_limit_ms: None,
        }
    }
}

impl NlpConfig {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }
}

/// Row in scaled space: `Σ c·y + constant (== | <=) 0`.
#[derive(Debug, Clone)]
struct ScaledRow {
    terms: Vec<(usize, f64)>,
    constant: f64,
}

impl ScaledRow {
    fn eval(&self, y: &[f64]) -> f64 {
        self.terms
            .iter()
            .fold(self.constant, |acc, &(j, c)| acc + c * y[j])
    }

    /// Drops empty rows and rescales the rest to unit coefficient norm.
    fn normalized(self) -> Option<Self> {
        let norm = self.terms.iter().map(|(_, c)| c * c).sum::<f64>().sqrt();
        if norm == 0.0 {
            return None;
        }
        Some(Self {
            terms: self.terms.into_iter().map(|(j, c)| (j, c / norm)).collect(),
            constant: self.constant / norm,
        })
    }
}

/// Problem rewritten in scaled variables.
struct ScaledProblem<'a> {
    problem: &'a Problem,
    scale: Vec<f64>,
    objective_scale: f64,
    equalities: Vec<ScaledRow>,
    inequalities: Vec<ScaledRow>,
}

fn variable_scale(lower: f64, upper: f64) -> f64 {
    let magnitude = [lower, upper]
        .into_iter()
        .filter(|b| b.is_finite())
        .map(f64::abs)
        .fold(0.0, f64::max);
    if magnitude > 0.0 {
        magnitude
    } else {
        1.0
    }
}

impl<'a> ScaledProblem<'a> {
    fn new(problem: &'a Problem) -> Self {
        let scale: Vec<f64> = problem
            .variables
            .iter()
            .map(|v| variable_scale(v.lower, v.upper))
            .collect();

        let mut equalities = Vec::new();
        let mut inequalities = Vec::new();
        for row in &problem.constraints {
            let sign = if row.relation == Relation::Ge { -1.0 } else { 1.0 };
            let scaled = ScaledRow {
                terms: row
                    .expr
                    .terms
                    .iter()
                    .map(|&(v, c)| (v.index(), sign * c * scale[v.index()]))
                    .collect(),
                constant: sign * row.expr.constant,
            };
            let Some(scaled) = scaled.normalized() else {
                continue;
            };
            match row.relation {
                Relation::Eq => equalities.push(scaled),
                Relation::Le | Relation::Ge => inequalities.push(scaled),
            }
        }
        for (j, v) in problem.variables.iter().enumerate() {
            if v.lower.is_finite() {
                inequalities.push(ScaledRow {
                    terms: vec![(j, -1.0)],
                    constant: v.lower / scale[j],
                });
            }
            if v.upper.is_finite() {
                inequalities.push(ScaledRow {
                    terms: vec![(j, 1.0)],
                    constant: -v.upper / scale[j],
                });
            }
        }

        let mut scaled = Self {
            problem,
            scale,
            objective_scale: 1.0,
            equalities,
            inequalities,
        };
        // bring the objective gradient at the start to unit size
        let y0 = scaled.to_scaled(&problem.initial_point());
        let largest = scaled
            .objective_gradient(&y0)
            .iter()
            .fold(0.0_f64, |acc, g| acc.max(g.abs()));
        if largest.is_finite() && largest > 1e-12 {
            scaled.objective_scale = 1.0 / largest;
        }
        scaled
    }

    fn to_scaled(&self, x: &[f64]) -> Vec<f64> {
        x.iter().zip(&self.scale).map(|(xi, s)| xi / s).collect()
    }

    fn to_original(&self, y: &[f64]) -> Vec<f64> {
        y.iter().zip(&self.scale).map(|(yi, s)| yi * s).collect()
    }

    fn objective(&self, y: &[f64]) -> f64 {
        self.objective_scale * self.problem.objective_value(&self.to_original(y))
    }

    fn objective_gradient(&self, y: &[f64]) -> Vec<f64> {
        let grad = self.problem.objective_gradient(&self.to_original(y));
        grad.iter()
            .zip(&self.scale)
            .map(|(g, s)| self.objective_scale * g * s)
            .collect()
    }

    fn max_violation(&self, y: &[f64]) -> f64 {
        let eq = self
            .equalities
            .iter()
            .map(|r| r.eval(y).abs())
            .fold(0.0, f64::max);
        self.inequalities
            .iter()
            .map(|r| r.eval(y).max(0.0))
            .fold(eq, f64::max)
    }
}

/// Augmented Lagrangian for fixed multipliers and penalty.
struct AugmentedLagrangian<'a, 'p> {
    scaled: &'a ScaledProblem<'p>,
    lambda_eq: &'a [f64],
    lambda_ineq: &'a [f64],
    penalty: f64,
}

impl CostFunction for AugmentedLagrangian<'_, '_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, y: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let mu = self.penalty;
        let mut value = self.scaled.objective(y);
        for (row, &lambda) in self.scaled.equalities.iter().zip(self.lambda_eq) {
            let h = row.eval(y);
            value += lambda * h + 0.5 * mu * h * h;
        }
        for (row, &lambda) in self.scaled.inequalities.iter().zip(self.lambda_ineq) {
            let shifted = (lambda + mu * row.eval(y)).max(0.0);
            value += (shifted * shifted - lambda * lambda) / (2.0 * mu);
        }
        Ok(value)
    }
}

impl Gradient for AugmentedLagrangian<'_, '_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, y: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        let mu = self.penalty;
        let mut grad = self.scaled.objective_gradient(y);
        for (row, &lambda) in self.scaled.equalities.iter().zip(self.lambda_eq) {
            let weight = lambda + mu * row.eval(y);
            for &(j, c) in &row.terms {
                grad[j] += weight * c;
            }
        }
        for (row, &lambda) in self.scaled.inequalities.iter().zip(self.lambda_ineq) {
            let weight = (lambda + mu * row.eval(y)).max(0.0);
            if weight > 0.0 {
                for &(j, c) in &row.terms {
                    grad[j] += weight * c;
                }
            }
        }
        Ok(grad)
    }
}

fn project_onto_bounds(problem: &Problem, x: &mut [f64]) {
    for (xi, def) in x.iter_mut().zip(&problem.variables) {
        *xi = xi.max(def.lower).min(def.upper);
    }
}

#[derive(Debug, Clone, Default)]
pub struct NlpSolver {
    config: NlpConfig,
}

impl NlpSolver {
    pub fn new(config: NlpConfig) -> Self {
        Self { config }
    }
}

impl Solver for NlpSolver {
    fn id(&self) -> &'static str {
        "augmented-lagrangian-lbfgs"
    }

    fn supports(&self, _problem: &Problem) -> bool {
        true
    }

    fn solve(&self, problem: &Problem) -> Result<Assignment, DispatchError> {
        let start = Instant::now();
        let config = &self.config;
        let scaled = ScaledProblem::new(problem);

        let mut y = scaled.to_scaled(&problem.initial_point());
        let mut lambda_eq = vec![0.0; scaled.equalities.len()];
        let mut lambda_ineq = vec![0.0; scaled.inequalities.len()];
        let mut penalty = config.initial_penalty;
        let mut last_violation = f64::INFINITY;
        let mut total_iterations = 0u64;
        let mut converged = false;

        for outer in 0..config.max_outer_iterations {
            if let Some(limit) = config.time_limit() {
                if start.elapsed() >= limit {
                    warn!(outer, "NLP time limit reached");
                    break;
                }
            }

            let lagrangian = AugmentedLagrangian {
                scaled: &scaled,
                lambda_eq: &lambda_eq,
                lambda_ineq: &lambda_ineq,
                penalty,
            };
            let solver = LBFGS::new(MoreThuenteLineSearch::new(), config.memory);
            let result = Executor::new(lagrangian, solver)
                .configure(|state| state.param(y.clone()).max_iters(config.inner_iterations))
                .run();

            match result {
                Ok(res) => {
                    total_iterations += res.state().get_iter();
                    if let Some(best) = res.state().get_best_param() {
                        y = best.clone();
                    }
                }
                Err(e) => {
                    // line search failures are common at high penalties; keep
                    // the current point and let the multipliers move
                    trace!(outer, error = %e, "inner solve stopped early");
                }
            }

            for (row, lambda) in scaled.equalities.iter().zip(lambda_eq.iter_mut()) {
                *lambda += penalty * row.eval(&y);
            }
            for (row, lambda) in scaled.inequalities.iter().zip(lambda_ineq.iter_mut()) {
                *lambda = (*lambda + penalty * row.eval(&y)).max(0.0);
            }

            let violation = scaled.max_violation(&y);
            let mut x = scaled.to_original(&y);
            project_onto_bounds(problem, &mut x);
            let original_violation = problem.max_violation(&x);
            trace!(outer, penalty, violation, original_violation, "outer iteration");

            if original_violation <= config.feasibility_tolerance {
                converged = true;
                break;
            }
            if violation > 0.25 * last_violation {
                penalty = (penalty * config.penalty_growth).min(config.max_penalty);
            }
            last_violation = violation;
        }

        let mut x = scaled.to_original(&y);
        project_onto_bounds(problem, &mut x);
        let violation = problem.max_violation(&x);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if !converged || !violation.is_finite() {
            warn!(violation, total_iterations, elapsed_ms, "NLP did not reach feasibility");
            return Err(DispatchError::SolverNonConvergence(format!(
                "max constraint violation {violation:.3e} above tolerance {:.1e} after {total_iterations} inner iterations",
                config.feasibility_tolerance
            )));
        }

        let objective = problem.objective_value(&x);
        debug!(objective, violation, total_iterations, elapsed_ms, "NLP solved");
        Ok(Assignment {
            values: x,
            objective,
            solver: self.id(),
        })
    }
}
