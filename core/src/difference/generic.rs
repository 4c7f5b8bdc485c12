use super::model::DifferenceEquation;
use super::{Equation, ADD_PORT, REMOVE_PORT};
use crate::error::SimResult;
use crate::event::{EventKind, ExternalEvent, ObservationRequest};
use crate::time::Time;
use crate::traits::{Dynamics, ModelInit};
use crate::value::{Attributes, Value};

/// A difference equation whose dependency set can change while it runs.
///
/// An event on `add` or `remove` names a dependency in its `name` attribute.
/// With `all_sync`, every added dependency counts as synchronous before it
/// has announced its multiple.
pub struct Generic<E> {
    engine: DifferenceEquation<E>,
    all_sync: bool,
}

impl<E: Equation> Generic<E> {
    pub fn new(init: &ModelInit, conditions: &Attributes, equation: E) -> SimResult<Self> {
        Ok(Self {
            engine: DifferenceEquation::new(init, conditions, equation)?,
            all_sync: conditions.boolean("all_sync")?.unwrap_or(false),
        })
    }

    pub fn all_sync(mut self) -> Self {
        self.all_sync = true;
        self
    }

    pub fn engine(&self) -> &DifferenceEquation<E> {
        &self.engine
    }

    pub fn add_dependency(&mut self, name: &str) {
        self.engine.add_dependency(name, self.all_sync);
    }

    pub fn remove_dependency(&mut self, name: &str) {
        self.engine.remove_dependency(name);
    }
}

impl<E: Equation> Dynamics for Generic<E> {
    fn init(&mut self, time: Time) -> Time {
        self.engine.init(time)
    }

    fn time_advance(&self) -> Time {
        self.engine.time_advance()
    }

    fn internal_transition(&mut self, time: Time) {
        self.engine.internal_transition(time)
    }

    fn external_transition(&mut self, events: &[ExternalEvent], time: Time) {
        for event in events {
            let Some(name) = event.string("name") else {
                continue;
            };
            if event.on_port(ADD_PORT) {
                log::debug!("{}: add dependency {}", self.engine.variables().name(), name);
                self.add_dependency(name);
            } else if event.on_port(REMOVE_PORT) {
                log::debug!("{}: remove dependency {}", self.engine.variables().name(), name);
                self.remove_dependency(name);
            }
        }
        self.engine.external_transition(events, time)
    }

    fn confluent_transition(&self, time: Time, events: &[ExternalEvent]) -> EventKind {
        self.engine.confluent_transition(time, events)
    }

    fn output(&self, time: Time, output: &mut Vec<ExternalEvent>) {
        self.engine.output(time, output)
    }

    fn request(&self, event: &ExternalEvent, time: Time, output: &mut Vec<ExternalEvent>) {
        self.engine.request(event, time, output)
    }

    fn observation(&self, request: &ObservationRequest) -> Value {
        self.engine.observation(request)
    }
}
