#![allow(dead_code)]

use household_dispatch::domain::{BatterySetup, Dispatch, Scenario};

pub fn flat_scenario(n: usize, price: f64, load: f64, solar: f64) -> Scenario {
    Scenario::new(vec![price; n], vec![load; n], vec![solar; n], 900.0, 0.1)
}

/// Eight hourly steps: surplus solar at step 1, a tenfold price spike with
/// matching load at step 5.
pub fn spike_scenario() -> Scenario {
    let mut price = vec![1.0; 8];
    price[5] = 10.0;
    let mut solar = vec![0.0; 8];
    solar[1] = 1000.0;
    let mut load = vec![0.0; 8];
    load[5] = 1000.0;
    Scenario::new(price, load, solar, 3600.0, 0.1)
}

/// Checks every physical invariant of a solved dispatch.
pub fn assert_feasible(scenario: &Scenario, battery: &BatterySetup, dispatch: &Dispatch, tol: f64) {
    let n = scenario.horizon_steps();
    assert_eq!(dispatch.battery_power_w.len(), n);
    assert_eq!(dispatch.grid_power_w.len(), n);
    assert_eq!(dispatch.charge_kwh.len(), n);

    let power_tol = tol * (1.0 + battery.max_charge_w.max(battery.max_discharge_w));
    for (i, &p) in dispatch.battery_power_w.iter().enumerate() {
        assert!(p >= -battery.max_charge_w - power_tol, "step {i}: charging {p} W");
        assert!(p <= battery.max_discharge_w + power_tol, "step {i}: discharging {p} W");
        assert_eq!(
            dispatch.grid_power_w[i],
            scenario.load_w[i] - scenario.solar_w[i] - p,
            "grid identity at step {i}"
        );
    }

    for (i, &q) in dispatch.charge_kwh.iter().enumerate() {
        assert!(q > battery.floor_kwh() - tol, "step {i}: charge {q} at floor");
        assert!(q <= battery.max_capacity_kwh + tol, "step {i}: charge {q} above ceiling");
    }

    let k = scenario.kwh_per_watt_step();
    for i in 1..n {
        let expected = dispatch.charge_kwh[i - 1] - dispatch.battery_power_w[i - 1] * k;
        assert!((dispatch.charge_kwh[i] - expected).abs() < tol, "dynamics at step {i}");
    }
    assert!(
        (dispatch.charge_kwh[0] - dispatch.charge_kwh[n - 1]).abs() < tol,
        "periodicity: {} vs {}",
        dispatch.charge_kwh[0],
        dispatch.charge_kwh[n - 1]
    );

    if let Some(rate) = battery.rate_limit_w {
        for (i, pair) in dispatch.battery_power_w.windows(2).enumerate() {
            let delta = (pair[1] - pair[0]).abs();
            assert!(delta <= rate + power_tol, "ramp {delta} W at step {}", i + 1);
        }
    }
}
