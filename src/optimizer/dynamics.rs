//! Per-step variables and the constraints that tie them together.
//!
//! For step `i` the builder allocates the state of charge at the start of the
//! step and the battery power held during it, then links consecutive steps
//! through `charge[i] = charge[i-1] - battery_power[i-1] * kwh_per_watt_step`.

use tracing::{debug, instrument};

use super::model::{ConstraintKind, LinearExpr, Problem, Relation, VarId, VariableDef};
use super::options::{Formulation, FormulationOptions, TerminalControl};
use super::smoothing::abs_epigraph;
use crate::domain::{BatterySetup, Dispatch, Scenario};

/// Positive and negative parts of the grid power (linear formulation only).
#[derive(Debug, Clone, Copy)]
pub struct GridSplit {
    pub import: VarId,
    pub export: VarId,
}

/// Handles for everything allocated at one time step.
#[derive(Debug, Clone)]
pub struct StepVars {
    pub charge: VarId,
    pub battery_power: VarId,
    /// Epigraph of `|charge - centering_target|`
    pub centering: VarId,
    /// `load - solar - battery_power`
    pub grid_power: LinearExpr,
    pub grid_split: Option<GridSplit>,
}

/// Problem under construction plus the per-step handles into it.
#[derive(Debug, Clone)]
pub struct DispatchModel {
    pub problem: Problem,
    pub steps: Vec<StepVars>,
    pub formulation: Formulation,
    pub centering_target_kwh: f64,
    pub terminal_control: TerminalControl,
}

/// Allocates variables and adds dynamics, bound, ramp, periodicity and grid
/// coupling constraints. The objective is left empty.
///
/// `seed` provides initial values for iterative solvers.
#[instrument(skip_all, fields(steps = scenario.horizon_steps(), formulation = %formulation))]
pub fn build_dynamics(
    scenario: &Scenario,
    battery: &BatterySetup,
    options: &FormulationOptions,
    formulation: Formulation,
    seed: Option<&Dispatch>,
) -> DispatchModel {
    let n = scenario.horizon_steps();
    let kwh_per_watt = scenario.kwh_per_watt_step();
    let terminal = options
        .terminal_control
        .resolve(battery.rate_limit_w.is_some(), n);

    let charge_lower = battery.floor_kwh() + options.floor_margin_kwh;
    let charge_upper = battery.max_capacity_kwh;
    let target = options.centering_target_fraction * battery.max_capacity_kwh;
    let centering_upper = (charge_upper - target).max(target - charge_lower).max(0.0);

    let mut problem = Problem::new();
    let mut steps: Vec<StepVars> = Vec::with_capacity(n);

    for i in 0..n {
        let initial_charge = seed
            .map(|s| s.charge_kwh[i])
            .unwrap_or(target)
            .max(charge_lower)
            .min(charge_upper);
        let initial_power = seed
            .map(|s| s.battery_power_w[i])
            .unwrap_or(0.0)
            .max(-battery.max_charge_w)
            .min(battery.max_discharge_w);

        // 1. state of charge, floor exclusive via the margin
        let charge = problem.add_variable(
            VariableDef::bounded(charge_lower, charge_upper).with_initial(initial_charge),
        );

        // 2. soft pull toward the centering target
        let deviation = LinearExpr::var(charge).offset(-target);
        let centering = abs_epigraph(
            &mut problem,
            &deviation,
            centering_upper,
            initial_charge - target,
        );

        // 3. dynamics
        if let Some(prev) = steps.last() {
            problem.add_constraint(
                LinearExpr::var(charge)
                    .plus(prev.charge, -1.0)
                    .plus(prev.battery_power, kwh_per_watt),
                Relation::Eq,
                ConstraintKind::Dynamics,
            );
        }

        // 4. periodicity
        if i == n - 1 {
            problem.add_constraint(
                LinearExpr::var(charge).plus(steps.first().map_or(charge, |s| s.charge), -1.0),
                Relation::Eq,
                ConstraintKind::Periodicity,
            );
        }

        // 5. control limits
        let battery_power = problem.add_variable(
            VariableDef::bounded(-battery.max_charge_w, battery.max_discharge_w)
                .with_initial(initial_power),
        );

        // 6. ramp limit and terminal closure
        let prev_power = steps.last().map(|s| s.battery_power);
        let last = i == n - 1;
        match (last, terminal, prev_power) {
            (true, TerminalControl::HoldPrevious, Some(prev)) => {
                problem.add_constraint(
                    LinearExpr::var(battery_power).plus(prev, -1.0),
                    Relation::Eq,
                    ConstraintKind::Terminal,
                );
            }
            _ => {
                if let (Some(rate), Some(prev)) = (battery.rate_limit_w, prev_power) {
                    let delta = LinearExpr::var(battery_power).plus(prev, -1.0);
                    problem.add_constraint(delta.clone().offset(-rate), Relation::Le, ConstraintKind::Ramp);
                    problem.add_constraint(delta.offset(rate), Relation::Ge, ConstraintKind::Ramp);
                }
                if last && terminal == TerminalControl::Idle {
                    problem.add_constraint(
                        LinearExpr::var(battery_power),
                        Relation::Eq,
                        ConstraintKind::Terminal,
                    );
                }
            }
        }

        // 7. grid coupling
        let net_load = scenario.load_w[i] - scenario.solar_w[i];
        let grid_power = LinearExpr::constant(net_load).plus(battery_power, -1.0);
        let grid_split = match formulation {
            Formulation::Linear => {
                let initial_grid = net_load - initial_power;
                // grid power lies in [net_load - max_discharge, net_load + max_charge]
                let import = problem.add_variable(
                    VariableDef::bounded(0.0, (net_load + battery.max_charge_w).max(0.0))
                        .with_initial(initial_grid.max(0.0)),
                );
                let export = problem.add_variable(
                    VariableDef::bounded(0.0, (battery.max_discharge_w - net_load).max(0.0))
                        .with_initial((-initial_grid).max(0.0)),
                );
                // import - export == grid_power
                problem.add_constraint(
                    grid_power.negated().plus(import, 1.0).plus(export, -1.0),
                    Relation::Eq,
                    ConstraintKind::GridSplit,
                );
                Some(GridSplit { import, export })
            }
            Formulation::Smooth => None,
        };

        steps.push(StepVars {
            charge,
            battery_power,
            centering,
            grid_power,
            grid_split,
        });
    }

    debug!(
        variables = problem.num_variables(),
        constraints = problem.constraints.len(),
        %terminal,
        "dynamics built"
    );

    DispatchModel {
        problem,
        steps,
        formulation,
        centering_target_kwh: target,
        terminal_control: terminal,
    }
}
