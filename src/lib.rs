//! Household battery dispatch.
//!
//! Given per-step electricity prices, household load and solar production,
//! chooses the battery power for every step of the horizon so that the
//! energy bill is minimised under the battery's physical limits.
//!
//! ```no_run
//! use household_dispatch::optimizer::{optimize_dispatch, Formulation};
//! use household_dispatch::simulation::{demo_battery, demo_scenario};
//!
//! let dispatch = optimize_dispatch(&demo_scenario(), &demo_battery(), Formulation::Linear)?;
//! println!("objective {}", dispatch.objective);
//! # Ok::<(), household_dispatch::DispatchError>(())
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod optimizer;
pub mod report;
pub mod simulation;
pub mod telemetry;

pub use error::DispatchError;
