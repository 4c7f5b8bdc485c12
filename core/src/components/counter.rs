use super::Builtin;
use crate::error::SimResult;
use crate::event::{ExternalEvent, ObservationRequest};
use crate::time::Time;
use crate::traits::{Dynamics, ModelInit};
use crate::value::{Attributes, Value};

/// Counts the events it receives, on any port.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    pub name: String,
    pub count: u64,
    pub last: Option<Time>,
}

impl Builtin for Counter {
    fn build(init: &ModelInit, _conditions: &Attributes) -> SimResult<Self> {
        Ok(Self {
            name: init.name.clone(),
            ..Default::default()
        })
    }
}

impl Dynamics for Counter {
    fn init(&mut self, _time: Time) -> Time {
        self.count = 0;
        self.last = None;
        Time::INFINITY
    }

    fn time_advance(&self) -> Time {
        Time::INFINITY
    }

    fn internal_transition(&mut self, _time: Time) {}

    fn external_transition(&mut self, events: &[ExternalEvent], time: Time) {
        self.count += events.len() as u64;
        self.last = Some(time);
    }

    fn observation(&self, request: &ObservationRequest) -> Value {
        match request.port.as_str() {
            "count" => Value::Integer(self.count as i64),
            "last" => self.last.map(|t| Value::Double(t.value())).unwrap_or_default(),
            other => {
                log::warn!("{}: no observable port '{}'", self.name, other);
                Value::Null
            }
        }
    }
}
