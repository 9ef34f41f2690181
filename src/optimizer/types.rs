use crate::domain::{BatterySetup, Dispatch, Scenario};
use crate::error::DispatchError;

use super::options::{Formulation, FormulationOptions};
use super::solver::NlpConfig;
use super::strategies::{LinearDispatch, SmoothDispatch};

/// One way of turning a scenario into a dispatch.
#[cfg_attr(test, mockall::automock)]
pub trait DispatchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn optimize(&self, scenario: &Scenario, battery: &BatterySetup) -> Result<Dispatch, DispatchError>;
}

pub struct DispatchOptimizer {
    pub strategy: Box<dyn DispatchStrategy>,
}

impl DispatchOptimizer {
    pub fn new(strategy: Box<dyn DispatchStrategy>) -> Self {
        Self { strategy }
    }

    pub fn from_formulation(formulation: Formulation, options: FormulationOptions, nlp: NlpConfig) -> Self {
        let strategy: Box<dyn DispatchStrategy> = match formulation {
            Formulation::Linear => Box::new(LinearDispatch::new(options)),
            Formulation::Smooth => Box::new(SmoothDispatch::new(options, nlp)),
        };
        Self { strategy }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Rejects malformed input before the strategy sees it.
    pub fn optimize(&self, scenario: &Scenario, battery: &BatterySetup) -> Result<Dispatch, DispatchError> {
        scenario.check(battery)?;
        self.strategy.optimize(scenario, battery)
    }
}
