use std::any::Any;

use crate::event::{EventKind, ExternalEvent, ObservationRequest};
use crate::time::{Time, Tolerance};
use crate::value::Value;

/// Everything a factory learns about the atomic model it instantiates.
#[derive(Debug, Clone, Default)]
pub struct ModelInit {
    /// Full dotted path of the model in the graph.
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub tolerance: Tolerance,
}

impl ModelInit {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn input(mut self, port: &str) -> Self {
        self.inputs.push(port.to_string());
        self
    }

    pub fn output(mut self, port: &str) -> Self {
        self.outputs.push(port.to_string());
        self
    }

    pub fn tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn has_input(&self, port: &str) -> bool {
        self.inputs.iter().any(|p| p == port)
    }

    pub fn has_output(&self, port: &str) -> bool {
        self.outputs.iter().any(|p| p == port)
    }

    /// Last path segment.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// Lets inspection code get back to the concrete model type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The contract of every atomic model.
///
/// Transitions only touch the model's own state; other models are reached
/// exclusively through the events written by [`Dynamics::output`].
pub trait Dynamics: AsAny {
    /// Returns the delay until the first internal event.
    fn init(&mut self, time: Time) -> Time;

    fn time_advance(&self) -> Time;

    fn internal_transition(&mut self, time: Time);

    fn external_transition(&mut self, events: &[ExternalEvent], time: Time);

    /// Order of the two transitions when the model is imminent and also
    /// receives events: `External` runs δext then δint, `Internal` the reverse.
    fn confluent_transition(&self, _time: Time, _events: &[ExternalEvent]) -> EventKind {
        EventKind::External
    }

    /// Called on imminent models before their internal transition.
    fn output(&self, _time: Time, _output: &mut Vec<ExternalEvent>) {}

    /// Answers a request event from the current state. Answers written to
    /// `output` are routed in the same bag, like outputs.
    fn request(&self, event: &ExternalEvent, _time: Time, _output: &mut Vec<ExternalEvent>) {
        log::debug!("unanswered request on '{}'", event.port);
    }

    fn observation(&self, _request: &ObservationRequest) -> Value {
        Value::Null
    }

    /// Called once when the coordinator tears the graph down.
    fn finish(&mut self) {}
}

impl dyn Dynamics + '_ {
    pub fn downcast_ref<T: Dynamics + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}
