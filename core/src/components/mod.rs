use crate::difference::{DifferenceEquation, Generic, Linear, Sum};
use crate::error::{SimError, SimResult};
use crate::registry::DynamicsRegistry;
use crate::traits::{Dynamics, ModelInit};
use crate::value::Attributes;
use serde::de::DeserializeOwned;

pub mod counter;
pub mod generator;
pub mod nested;

/// A dynamics the registry can build from conditions alone.
pub trait Builtin: Dynamics + Sized {
    fn build(init: &ModelInit, conditions: &Attributes) -> SimResult<Self>;
}

/// Deserializes a config struct from conditions, missing keys taking their
/// default.
pub fn config_from<T: DeserializeOwned>(init: &ModelInit, conditions: &Attributes) -> SimResult<T> {
    serde_json::to_value(conditions)
        .and_then(serde_json::from_value)
        .map_err(|err| {
            log::warn!("{}: {}", init.name, err);
            SimError::InvalidCondition {
                key: init.name.clone(),
                expected: std::any::type_name::<T>(),
                found: "mismatched conditions",
            }
        })
}

macro_rules! register_dynamics {
    ($($kind:expr => $type:ty),* $(,)?) => {
        pub fn register_builtins(registry: &mut DynamicsRegistry) {
            $(
                registry.register($kind, |init: &ModelInit, conditions: &Attributes| {
                    let model = <$type as Builtin>::build(init, conditions)?;
                    Ok(Box::new(model) as Box<dyn Dynamics>)
                });
            )*
        }

        pub fn builtin_names() -> Vec<&'static str> {
            vec![$($kind),*]
        }
    };
}

register_dynamics!(
    "counter" => counter::Counter,
    "generator" => generator::Generator,
    "difference/linear" => DifferenceEquation<Linear>,
    "difference/sum" => Generic<Sum>,
);

impl Builtin for DifferenceEquation<Linear> {
    fn build(init: &ModelInit, conditions: &Attributes) -> SimResult<Self> {
        DifferenceEquation::new(init, conditions, Linear::from_conditions(conditions)?)
    }
}

impl Builtin for Generic<Sum> {
    fn build(init: &ModelInit, conditions: &Attributes) -> SimResult<Self> {
        Generic::new(init, conditions, Sum)
    }
}
