//! # Scenario Profiles
//!
//! Builders for the price, load and solar series fed to the optimizer: the
//! reference demo day, piecewise-constant step profiles, a sinusoidal daily
//! load and seeded Gaussian noise.

use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::Range;

use crate::domain::{BatterySetup, Scenario};
use crate::error::DispatchError;

pub const DEMO_STEPS: usize = 96;
pub const DEMO_STEP_SECONDS: f64 = 900.0;

/// Constant `base` with `value` written over each index range.
///
/// Ranges are clipped to `len`.
pub fn step_profile(len: usize, base: f64, segments: &[(Range<usize>, f64)]) -> Vec<f64> {
    let mut profile = vec![base; len];
    for (range, value) in segments {
        let end = range.end.min(len);
        let start = range.start.min(end);
        profile[start..end].fill(*value);
    }
    profile
}

/// `offset + amplitude · sin(−2π·t/24)` sampled on `len` points spanning 0..24 h.
///
/// With `offset == amplitude` the load peaks in the early evening and never
/// goes negative.
pub fn sinusoidal_load(len: usize, amplitude: f64, offset: f64) -> Vec<f64> {
    let last = len.saturating_sub(1).max(1) as f64;
    (0..len)
        .map(|i| {
            let hour = 24.0 * i as f64 / last;
            offset + amplitude * (-hour * 2.0 * PI / 24.0).sin()
        })
        .collect()
}

/// Adds zero-mean Gaussian noise and clamps the result at zero.
///
/// The same `seed` always yields the same series.
pub fn with_noise(series: &[f64], std_dev: f64, seed: u64) -> Result<Vec<f64>, DispatchError> {
    let normal = Normal::new(0.0, std_dev)
        .map_err(|e| DispatchError::InvalidScenario(format!("noise std dev {std_dev}: {e}")))?;
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    Ok(series
        .iter()
        .map(|&x| (x + normal.sample(&mut rng)).max(0.0))
        .collect())
}

/// Reference day: 15-minute steps, a price spike in the evening, midday solar
/// and two load blocks.
pub fn demo_scenario() -> Scenario {
    let n = DEMO_STEPS;
    Scenario::new(
        step_profile(n, 0.1, &[(65..80, 10.0)]),
        step_profile(n, 0.0, &[(10..20, 1.0), (65..80, 2.0)]),
        step_profile(n, 0.0, &[(30..60, 5.0)]),
        DEMO_STEP_SECONDS,
        0.1,
    )
}

pub fn demo_battery() -> BatterySetup {
    BatterySetup::new(10.0, 10.0, 1.0)
}

/// Parameters for a generated day with a sinusoidal load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticDay {
    pub steps: usize,
    pub step_duration_seconds: f64,
    pub base_price: f64,
    pub peak_price: f64,
    pub peak_steps: Range<usize>,
    pub solar_w: f64,
    pub solar_steps: Range<usize>,
    pub load_amplitude_w: f64,
    pub load_offset_w: f64,
    /// Standard deviation of the noise added to the load (W)
    pub noise_std_w: f64,
    pub seed: u64,
    pub export_fraction: f64,
}

impl Default for SyntheticDay {
    fn default() -> Self {
        Self {
            steps: DEMO_STEPS,
            step_duration_seconds: DEMO_STEP_SECONDS,
            base_price: 0.1,
            peak_price: 1.0,
            peak_steps: 68..84,
            solar_w: 5.0,
            solar_steps: 32..64,
            load_amplitude_w: 1.0,
            load_offset_w: 1.0,
            noise_std_w: 0.0,
            seed: 42,
            export_fraction: 0.1,
        }
    }
}

impl SyntheticDay {
    pub fn build(&self) -> Result<Scenario, DispatchError> {
        let load = sinusoidal_load(self.steps, self.load_amplitude_w, self.load_offset_w);
        let load = if self.noise_std_w > 0.0 {
            with_noise(&load, self.noise_std_w, self.seed)?
        } else {
            load
        };
        Ok(Scenario::new(
            step_profile(self.steps, self.base_price, &[(self.peak_steps.clone(), self.peak_price)]),
            load,
            step_profile(self.steps, 0.0, &[(self.solar_steps.clone(), self.solar_w)]),
            self.step_duration_seconds,
            self.export_fraction,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_profile_clips_ranges() {
        let profile = step_profile(5, 1.0, &[(1..3, 4.0), (4..10, 2.0), (7..9, 9.0)]);
        assert_eq!(profile, vec![1.0, 4.0, 4.0, 1.0, 2.0]);
    }

    #[test]
    fn test_demo_day_layout() {
        let scenario = demo_scenario();
        assert_eq!(scenario.horizon_steps(), 96);
        assert_eq!(scenario.price[64], 0.1);
        assert_eq!(scenario.price[65], 10.0);
        assert_eq!(scenario.price[79], 10.0);
        assert_eq!(scenario.price[80], 0.1);
        assert_eq!(scenario.solar_w[30], 5.0);
        assert_eq!(scenario.solar_w[60], 0.0);
        assert_eq!(scenario.load_w[15], 1.0);
        assert_eq!(scenario.load_w[70], 2.0);
        assert!(scenario.check(&demo_battery()).is_ok());
    }

    #[test]
    fn test_sinusoidal_load_shape() {
        let load = sinusoidal_load(25, 1.0, 1.0);
        assert!((load[0] - 1.0).abs() < 1e-12);
        // sin(-π/2) at 6h, sin(-3π/2) at 18h
        assert!(load[6].abs() < 1e-12);
        assert!((load[18] - 2.0).abs() < 1e-12);
        assert!(load.iter().all(|&x| x >= -1e-12));
        assert_eq!(sinusoidal_load(1, 1.0, 1.0), vec![1.0]);
    }

    #[test]
    fn test_noise_is_reproducible() {
        let base = vec![1.0; 50];
        let a = with_noise(&base, 0.2, 7).unwrap();
        let b = with_noise(&base, 0.2, 7).unwrap();
        let c = with_noise(&base, 0.2, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|&x| x >= 0.0));
    }

    #[test]
    fn test_negative_noise_rejected() {
        assert!(matches!(
            with_noise(&[1.0], -1.0, 0),
            Err(DispatchError::InvalidScenario(_))
        ));
    }

    #[test]
    fn test_synthetic_day_is_valid() {
        let day = SyntheticDay {
            noise_std_w: 0.1,
            ..SyntheticDay::default()
        };
        let scenario = day.build().unwrap();
        assert_eq!(scenario.horizon_steps(), 96);
        assert!(scenario.check(&demo_battery()).is_ok());
        assert_eq!(scenario.price[70], 1.0);
    }
}
