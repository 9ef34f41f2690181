//! Synthetic input series for demos, benchmarks and tests.

pub mod profiles;

pub use profiles::{
    demo_battery, demo_scenario, sinusoidal_load, step_profile, with_noise, SyntheticDay,
    DEMO_STEPS, DEMO_STEP_SECONDS,
};
