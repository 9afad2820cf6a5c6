//! Tries a prioritised list of partition functions, delegating to the
//! first that supports the requested isotope.

use crate::error::{NetworkError, Result};

use super::PartitionFunction;

pub struct CompositePartitionFunction {
    prioritized: Vec<Box<dyn PartitionFunction + Send + Sync>>,
}

impl CompositePartitionFunction {
    pub fn new(prioritized: Vec<Box<dyn PartitionFunction + Send + Sync>>) -> Self {
        Self { prioritized }
    }

    fn first_supporting(&self, z: u16, a: u16) -> Option<&(dyn PartitionFunction + Send + Sync)> {
        self.prioritized
            .iter()
            .map(|b| b.as_ref())
            .find(|pf| pf.supports(z, a))
    }

    pub fn try_evaluate(&self, z: u16, a: u16, t9: f64) -> Result<f64> {
        self.first_supporting(z, a)
            .map(|pf| pf.evaluate(z, a, t9))
            .ok_or_else(|| NetworkError::UnknownPartitionType(format!("Z={z}, A={a}")))
    }

    pub fn try_evaluate_derivative(&self, z: u16, a: u16, t9: f64) -> Result<f64> {
        self.first_supporting(z, a)
            .map(|pf| pf.evaluate_derivative(z, a, t9))
            .ok_or_else(|| NetworkError::UnknownPartitionType(format!("Z={z}, A={a}")))
    }
}

impl PartitionFunction for CompositePartitionFunction {
    fn supports(&self, z: u16, a: u16) -> bool {
        self.first_supporting(z, a).is_some()
    }

    fn evaluate(&self, z: u16, a: u16, t9: f64) -> f64 {
        self.try_evaluate(z, a, t9).unwrap_or(1.0)
    }

    fn evaluate_derivative(&self, z: u16, a: u16, t9: f64) -> f64 {
        self.try_evaluate_derivative(z, a, t9).unwrap_or(0.0)
    }
}
