use super::dynamics::DispatchModel;
use super::model::Assignment;
use crate::domain::{Dispatch, Scenario};

/// Reads solved values back into per-step sequences in input order.
///
/// Grid power is recomputed from the extracted battery power so that
/// `grid = load - solar - battery` holds exactly.
pub fn extract_dispatch(model: &DispatchModel, scenario: &Scenario, assignment: &Assignment) -> Dispatch {
    let n = model.steps.len();
    let mut battery_power_w = Vec::with_capacity(n);
    let mut grid_power_w = Vec::with_capacity(n);
    let mut charge_kwh = Vec::with_capacity(n);

    for (i, step) in model.steps.iter().enumerate() {
        let battery = assignment.value(step.battery_power);
        battery_power_w.push(battery);
        grid_power_w.push(scenario.grid_power_w(i, battery));
        charge_kwh.push(assignment.value(step.charge));
    }

    Dispatch {
        battery_power_w,
        grid_power_w,
        charge_kwh,
        objective: assignment.objective,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BatterySetup;
    use crate::optimizer::dynamics::build_dynamics;
    use crate::optimizer::options::{Formulation, FormulationOptions};

    #[test]
    fn test_extracts_aligned_sequences() {
        let scenario = Scenario::new(
            vec![1.0; 3],
            vec![300.0, 200.0, 100.0],
            vec![50.0, 0.0, 400.0],
            3600.0,
            0.1,
        );
        let model = build_dynamics(
            &scenario,
            &BatterySetup::new(500.0, 500.0, 2.0),
            &FormulationOptions::default(),
            Formulation::Smooth,
            None,
        );
        let mut values = model.problem.initial_point();
        for (i, step) in model.steps.iter().enumerate() {
            values[step.battery_power.index()] = 10.0 * i as f64;
            values[step.charge.index()] = 1.0 + i as f64 / 10.0;
        }
        let assignment = Assignment {
            values,
            objective: 42.0,
            solver: "test",
        };

        let dispatch = extract_dispatch(&model, &scenario, &assignment);
        assert_eq!(dispatch.len(), 3);
        assert_eq!(dispatch.battery_power_w, vec![0.0, 10.0, 20.0]);
        assert_eq!(dispatch.charge_kwh, vec![1.0, 1.1, 1.2]);
        assert_eq!(dispatch.grid_power_w, vec![250.0, 190.0, -320.0]);
        assert_eq!(dispatch.objective, 42.0);
    }
}
