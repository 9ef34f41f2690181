//! Solver-neutral optimization problem.
//!
//! Every constraint in the dispatch problem is linear; only the objective may
//! carry nonlinear (logistic-gated) terms. Backends translate this model into
//! their own representation.

use serde::Serialize;
use strum::Display;

use super::smoothing;

/// Handle to a continuous decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct VariableDef {
    pub lower: f64,
    pub upper: f64,
    /// Starting point for iterative backends
    pub initial: f64,
}

impl VariableDef {
    pub fn bounded(lower: f64, upper: f64) -> Self {
        let initial = if lower.is_finite() {
            lower.max(0.0).min(upper)
        } else if upper.is_finite() {
            upper.min(0.0)
        } else {
            0.0
        };
        Self {
            lower,
            upper,
            initial,
        }
    }

    pub fn with_initial(mut self, initial: f64) -> Self {
        self.initial = initial;
        self
    }
}

/// `Σ coeff·x + constant`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn var(v: VarId) -> Self {
        Self::constant(0.0).plus(v, 1.0)
    }

    pub fn plus(mut self, v: VarId, coeff: f64) -> Self {
        self.terms.push((v, coeff));
        self
    }

    pub fn offset(mut self, delta: f64) -> Self {
        self.constant += delta;
        self
    }

    pub fn negated(&self) -> Self {
        Self {
            terms: self.terms.iter().map(|&(v, c)| (v, -c)).collect(),
            constant: -self.constant,
        }
    }

    pub fn eval(&self, x: &[f64]) -> f64 {
        self.terms
            .iter()
            .fold(self.constant, |acc, &(v, c)| acc + c * x[v.0])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `expr == 0`
    Eq,
    /// `expr <= 0`
    Le,
    /// `expr >= 0`
    Ge,
}

/// What a constraint encodes, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
pub enum ConstraintKind {
    Dynamics,
    Periodicity,
    Ramp,
    Terminal,
    Centering,
    GridSplit,
    Other,
}

#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub expr: LinearExpr,
    pub relation: Relation,
    pub kind: ConstraintKind,
}

impl LinearConstraint {
    /// Amount by which `x` violates this constraint (zero when satisfied).
    pub fn violation(&self, x: &[f64]) -> f64 {
        let value = self.expr.eval(x);
        match self.relation {
            Relation::Eq => value.abs(),
            Relation::Le => value.max(0.0),
            Relation::Ge => (-value).max(0.0),
        }
    }
}

/// Direction of a logistic gate: `Positive` passes `expr` when it is above
/// zero, `Negative` passes it when below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Positive,
    Negative,
}

impl Gate {
    fn sign(self) -> f64 {
        match self {
            Gate::Positive => 1.0,
            Gate::Negative => -1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ObjectiveTerm {
    Linear(LinearExpr),
    /// `weight · σ(±k·e) · e`
    Gated {
        expr: LinearExpr,
        weight: f64,
        gate: Gate,
        steepness: f64,
    },
}

impl ObjectiveTerm {
    pub fn value(&self, x: &[f64]) -> f64 {
        match self {
            ObjectiveTerm::Linear(expr) => expr.eval(x),
            ObjectiveTerm::Gated {
                expr,
                weight,
                gate,
                steepness,
            } => {
                let s = gate.sign();
                weight * s * smoothing::gated(s * expr.eval(x), *steepness)
            }
        }
    }

    /// Adds this term's gradient into `grad`.
    pub fn accumulate_gradient(&self, x: &[f64], grad: &mut [f64]) {
        match self {
            ObjectiveTerm::Linear(expr) => {
                for &(v, c) in &expr.terms {
                    grad[v.0] += c;
                }
            }
            ObjectiveTerm::Gated {
                expr,
                weight,
                gate,
                steepness,
            } => {
                // d/de [s·gated(s·e)] = gated'(s·e)
                let slope = smoothing::gated_derivative(gate.sign() * expr.eval(x), *steepness);
                for &(v, c) in &expr.terms {
                    grad[v.0] += weight * slope * c;
                }
            }
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, ObjectiveTerm::Linear(_))
    }
}

/// Variables, linear constraints and a separable objective.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    pub variables: Vec<VariableDef>,
    pub constraints: Vec<LinearConstraint>,
    pub objective: Vec<ObjectiveTerm>,
}

impl Problem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, def: VariableDef) -> VarId {
        self.variables.push(def);
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(&mut self, expr: LinearExpr, relation: Relation, kind: ConstraintKind) {
        self.constraints.push(LinearConstraint {
            expr,
            relation,
            kind,
        });
    }

    pub fn add_objective(&mut self, term: ObjectiveTerm) {
        self.objective.push(term);
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn is_linear(&self) -> bool {
        self.objective.iter().all(ObjectiveTerm::is_linear)
    }

    pub fn initial_point(&self) -> Vec<f64> {
        self.variables.iter().map(|v| v.initial).collect()
    }

    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.objective.iter().map(|t| t.value(x)).sum()
    }

    pub fn objective_gradient(&self, x: &[f64]) -> Vec<f64> {
        let mut grad = vec![0.0; x.len()];
        for term in &self.objective {
            term.accumulate_gradient(x, &mut grad);
        }
        grad
    }

    /// Largest violation over constraints and variable bounds.
    pub fn max_violation(&self, x: &[f64]) -> f64 {
        let rows = self
            .constraints
            .iter()
            .map(|c| c.violation(x))
            .fold(0.0, f64::max);
        let bounds = self
            .variables
            .iter()
            .zip(x)
            .map(|(def, &xi)| (def.lower - xi).max(xi - def.upper).max(0.0))
            .fold(0.0, f64::max);
        rows.max(bounds)
    }

    pub fn count_constraints(&self, kind: ConstraintKind) -> usize {
        self.constraints.iter().filter(|c| c.kind == kind).count()
    }
}

/// Solved values for every variable of a [`Problem`].
#[derive(Debug, Clone)]
pub struct Assignment {
    pub values: Vec<f64>,
    pub objective: f64,
    pub solver: &'static str,
}

impl Assignment {
    pub fn value(&self, v: VarId) -> f64 {
        self.values[v.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free() -> VariableDef {
        VariableDef::bounded(f64::NEG_INFINITY, f64::INFINITY)
    }

    fn finite_difference(problem: &Problem, x: &[f64]) -> Vec<f64> {
        let h = 1e-6;
        (0..x.len())
            .map(|i| {
                let mut plus = x.to_vec();
                let mut minus = x.to_vec();
                plus[i] += h;
                minus[i] -= h;
                (problem.objective_value(&plus) - problem.objective_value(&minus)) / (2.0 * h)
            })
            .collect()
    }

    #[test]
    fn test_linear_expr_eval() {
        let expr = LinearExpr::constant(2.0)
            .plus(VarId(0), 3.0)
            .plus(VarId(1), -1.0);
        assert_eq!(expr.eval(&[1.0, 4.0]), 1.0);
        assert_eq!(expr.negated().eval(&[1.0, 4.0]), -1.0);
    }

    #[test]
    fn test_violation_per_relation() {
        let expr = LinearExpr::var(VarId(0)).offset(-1.0);
        let eq = LinearConstraint {
            expr: expr.clone(),
            relation: Relation::Eq,
            kind: ConstraintKind::Other,
        };
        let le = LinearConstraint {
            relation: Relation::Le,
            ..eq.clone()
        };
        let ge = LinearConstraint {
            relation: Relation::Ge,
            ..eq.clone()
        };
        assert_eq!(eq.violation(&[3.0]), 2.0);
        assert_eq!(le.violation(&[3.0]), 2.0);
        assert_eq!(le.violation(&[0.0]), 0.0);
        assert_eq!(ge.violation(&[0.0]), 1.0);
        assert_eq!(ge.violation(&[3.0]), 0.0);
    }

    #[test]
    fn test_gated_gradient_matches_finite_difference() {
        let mut problem = Problem::new();
        let a = problem.add_variable(free());
        let b = problem.add_variable(free());
        let grid = LinearExpr::constant(0.3).plus(a, -1.0).plus(b, 0.5);
        problem.add_objective(ObjectiveTerm::Gated {
            expr: grid.clone(),
            weight: 2.0,
            gate: Gate::Positive,
            steepness: 20.0,
        });
        problem.add_objective(ObjectiveTerm::Gated {
            expr: grid,
            weight: 0.4,
            gate: Gate::Negative,
            steepness: 20.0,
        });
        problem.add_objective(ObjectiveTerm::Linear(LinearExpr::var(a).plus(b, 0.1)));

        for x in [[0.0, 0.0], [0.31, 0.02], [-0.2, 0.4], [1.0, -1.0]] {
            let analytic = problem.objective_gradient(&x);
            let numeric = finite_difference(&problem, &x);
            for (g, n) in analytic.iter().zip(&numeric) {
                assert!((g - n).abs() < 1e-5, "analytic {g} vs numeric {n} at {x:?}");
            }
        }
        assert!(!problem.is_linear());
    }

    #[test]
    fn test_max_violation_includes_bounds() {
        let mut problem = Problem::new();
        let x = problem.add_variable(VariableDef::bounded(0.0, 1.0));
        problem.add_constraint(LinearExpr::var(x).offset(-0.5), Relation::Le, ConstraintKind::Other);
        assert_eq!(problem.max_violation(&[0.25]), 0.0);
        assert!((problem.max_violation(&[0.75]) - 0.25).abs() < 1e-12);
        assert!((problem.max_violation(&[1.5]) - 1.0).abs() < 1e-12);
        assert_eq!(problem.count_constraints(ConstraintKind::Other), 1);
    }

    #[test]
    fn test_initial_point_respects_bounds() {
        assert_eq!(VariableDef::bounded(2.0, 5.0).initial, 2.0);
        assert_eq!(VariableDef::bounded(-5.0, -1.0).initial, -1.0);
        assert_eq!(VariableDef::bounded(-5.0, 5.0).initial, 0.0);
        assert_eq!(free().initial, 0.0);
    }
}
