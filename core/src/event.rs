use crate::time::Time;
use crate::value::{Attributes, Value};
use serde::{Deserialize, Serialize};

/// An event emitted on an output port and delivered, through the routing
/// table, on the input port of each destination. `port` is rewritten to the
/// destination port during routing.
///
/// A request is not queued for a transition: the destination answers it
/// through [`Dynamics::request`](crate::traits::Dynamics::request) in the
/// same bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalEvent {
    pub port: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub request: bool,
}

impl ExternalEvent {
    pub fn new(port: &str) -> Self {
        Self {
            port: port.to_string(),
            attributes: Attributes::new(),
            request: false,
        }
    }

    pub fn request(port: &str) -> Self {
        Self {
            request: true,
            ..Self::new(port)
        }
    }

    pub fn is_request(&self) -> bool {
        self.request
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    pub fn on_port(&self, port: &str) -> bool {
        self.port == port
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn double(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(Value::as_double)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(Value::as_integer)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Which transition runs first when a model is imminent and receives events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EventKind {
    Internal,
    #[default]
    External,
}

/// What the coordinator dispatched to a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Internal,
    External,
    Confluent(EventKind),
}

/// One trace record, kept when `SimulationConfig::record_trace` is set.
/// `sigma` is the time advance the model reported right after the transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    pub time: Time,
    pub model: String,
    pub transition: Transition,
    pub sigma: Time,
}

/// Read-only query addressed to a model by an observer.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRequest {
    pub port: String,
    pub time: Time,
}

impl ObservationRequest {
    pub fn new(port: &str, time: Time) -> Self {
        Self {
            port: port.to_string(),
            time,
        }
    }
}
