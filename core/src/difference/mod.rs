mod builtin;
mod generic;
mod history;
mod model;
mod phase;
mod variables;

pub use builtin::{Linear, Sum};
pub use generic::Generic;
pub use history::History;
pub use model::DifferenceEquation;
pub use phase::Phase;
pub use variables::{synchronous, Dependency, Variables};

use crate::error::ComputeError;
use crate::time::Time;

pub const UPDATE_PORT: &str = "update";
pub const PERTURB_PORT: &str = "perturb";
pub const ADD_PORT: &str = "add";
pub const REMOVE_PORT: &str = "remove";
pub const REQUEST_PORT: &str = "request";
pub const RESPONSE_PORT: &str = "response";

/// The user part of a difference equation.
pub trait Equation: 'static {
    /// Next value of the variable. Errors leave the value invalid until the
    /// next successful computation.
    fn compute(&mut self, vars: &Variables, time: Time) -> Result<f64, ComputeError>;

    /// Used when the model has no `value` condition.
    fn initial_value(&mut self, _vars: &Variables) -> Result<f64, ComputeError> {
        Ok(0.0)
    }
}

/// An [`Equation`] from a closure.
pub struct FnEquation<F> {
    compute: F,
}

impl<F> FnEquation<F>
where
    F: FnMut(&Variables, Time) -> Result<f64, ComputeError> + 'static,
{
    pub fn new(compute: F) -> Self {
        Self { compute }
    }
}

impl<F> Equation for FnEquation<F>
where
    F: FnMut(&Variables, Time) -> Result<f64, ComputeError> + 'static,
{
    fn compute(&mut self, vars: &Variables, time: Time) -> Result<f64, ComputeError> {
        (self.compute)(vars, time)
    }
}
