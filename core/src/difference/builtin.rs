use super::{Equation, Variables};
use crate::error::{ComputeError, SimResult};
use crate::time::Time;
use crate::value::Attributes;

/// `x(t) = a · x(t − 1) + b`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Linear {
    pub a: f64,
    pub b: f64,
}

impl Linear {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    /// Reads `a` (default 1) and `b` (default 0).
    pub fn from_conditions(conditions: &Attributes) -> SimResult<Self> {
        Ok(Self::new(
            conditions.double("a")?.unwrap_or(1.0),
            conditions.double("b")?.unwrap_or(0.0),
        ))
    }
}

impl Equation for Linear {
    fn compute(&mut self, vars: &Variables, _time: Time) -> Result<f64, ComputeError> {
        Ok(self.a * vars.value(0)? + self.b)
    }
}

/// Sum of the latest value of every dependency. Dependencies that have not
/// reported yet are skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sum;

impl Equation for Sum {
    fn compute(&mut self, vars: &Variables, _time: Time) -> Result<f64, ComputeError> {
        Ok(vars.dependencies().filter_map(|(_, value)| value).sum())
    }

    fn initial_value(&mut self, vars: &Variables) -> Result<f64, ComputeError> {
        self.compute(vars, Time::ZERO)
    }
}
