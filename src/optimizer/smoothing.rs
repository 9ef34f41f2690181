//! Differentiable stand-ins for the non-smooth pieces of the cost function.
//!
//! Gradient-based solvers need derivatives everywhere, so the import/export
//! split is gated with a logistic function and absolute values are written
//! as epigraphs over an auxiliary variable.

use super::model::{ConstraintKind, LinearExpr, Problem, Relation, VarId, VariableDef};

/// Slope of the logistic gate, per watt.
pub const DEFAULT_STEEPNESS: f64 = 20.0;

/// Logistic approximation of the indicator `x > 0`: `1 / (1 + exp(-k·x))`.
pub fn smooth_sign(x: f64, steepness: f64) -> f64 {
    let z = steepness * x;
    // Split on the sign of z so exp never overflows.
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

pub fn smooth_sign_derivative(x: f64, steepness: f64) -> f64 {
    let s = smooth_sign(x, steepness);
    steepness * s * (1.0 - s)
}

/// Smooth positive part: `σ(k·x) · x`.
pub fn gated(x: f64, steepness: f64) -> f64 {
    smooth_sign(x, steepness) * x
}

pub fn gated_derivative(x: f64, steepness: f64) -> f64 {
    smooth_sign(x, steepness) + x * smooth_sign_derivative(x, steepness)
}

/// Adds `a ∈ [0, upper]` with `a >= expr` and `a >= -expr`.
///
/// Minimizing a positive multiple of `a` drives it to `|expr|`.
pub fn abs_epigraph(problem: &mut Problem, expr: &LinearExpr, upper: f64, initial: f64) -> VarId {
    let a = problem.add_variable(
        VariableDef::bounded(0.0, upper).with_initial(initial.abs().min(upper)),
    );
    // a - expr >= 0
    problem.add_constraint(
        expr.negated().plus(a, 1.0),
        Relation::Ge,
        ConstraintKind::Centering,
    );
    // a + expr >= 0
    problem.add_constraint(expr.clone().plus(a, 1.0), Relation::Ge, ConstraintKind::Centering);
    a
}
