use crate::config::SimulationConfig;
use crate::engine::RootCoordinator;
use crate::error::{SimError, SimResult};
use crate::event::{ExternalEvent, ObservationRequest};
use crate::graph::ModelGraph;
use crate::observer::Observations;
use crate::registry::{DynamicsRegistry, Factory};
use crate::time::Time;
use crate::traits::{Dynamics, ModelInit};
use crate::value::{Attributes, Value};
use std::rc::Rc;

/// Child time of parent instant `parent` given the parent-minus-child offset.
pub fn to_child_time(parent: Time, offset: f64) -> Time {
    if parent.is_infinite() {
        return parent;
    }
    Time::new(parent.value() - offset)
}

pub fn to_parent_time(child: Time, offset: f64) -> Time {
    if child.is_infinite() {
        return child;
    }
    Time::new(child.value() + offset)
}

pub struct NestedSimulation {
    name: String,
    child: RootCoordinator,
    offset: f64,
    /// Child time after which no further bag is run.
    stop_after: Option<Time>,
    sigma: Time,
    stopped: bool,
    results: Option<Observations>,
}

impl NestedSimulation {
    pub fn new(
        init: &ModelInit,
        graph: &ModelGraph,
        registry: &DynamicsRegistry,
        config: &SimulationConfig,
    ) -> SimResult<Self> {
        let child = RootCoordinator::new(graph, registry, config).map_err(|err| {
            log::error!("{}: child simulation failed to load: {}", init.name, err);
            SimError::Nested {
                model: init.name.clone(),
                reason: err.to_string(),
            }
        })?;
        Ok(Self {
            name: init.name.clone(),
            child,
            offset: 0.0,
            stop_after: None,
            sigma: Time::INFINITY,
            stopped: false,
            results: None,
        })
    }

    pub fn stop_after(mut self, child_time: f64) -> Self {
        self.stop_after = Some(Time::new(child_time));
        self
    }

    /// A registry factory that builds a fresh child run of `graph` for every
    /// model it instantiates. A `stop_after` condition bounds the child run.
    pub fn factory(graph: ModelGraph, registry: Rc<DynamicsRegistry>, config: SimulationConfig) -> Factory {
        Box::new(move |init: &ModelInit, conditions: &Attributes| {
            let mut nested = NestedSimulation::new(init, &graph, &registry, &config)?;
            if let Some(limit) = conditions.double("stop_after")? {
                nested = nested.stop_after(limit);
            }
            Ok(Box::new(nested) as Box<dyn Dynamics>)
        })
    }

    pub fn child(&self) -> &RootCoordinator {
        &self.child
    }

    /// What the child observed, once the wrapper has been finished.
    pub fn results(&self) -> Option<&Observations> {
        self.results.as_ref()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn reschedule(&mut self, now: Time) {
        let next = self.child.next_time();
        if self.stopped || next.is_infinite() || next > self.child.end_time() {
            self.sigma = Time::INFINITY;
            return;
        }
        let at = to_parent_time(next, self.offset);
        self.sigma = if at < now { Time::ZERO } else { at - now };
    }
}

impl Dynamics for NestedSimulation {
    fn init(&mut self, time: Time) -> Time {
        self.offset = time.value() - self.child.current_time().value();
        self.child.init();
        self.reschedule(time);
        self.sigma
    }

    fn time_advance(&self) -> Time {
        self.sigma
    }

    fn internal_transition(&mut self, time: Time) {
        if !self.child.step() {
            self.stopped = true;
        }
        if self.stop_after.is_some_and(|limit| self.child.current_time() >= limit) {
            log::debug!("{}: child stopped at {}", self.name, self.child.current_time());
            self.stopped = true;
        }
        self.reschedule(time);
    }

    fn external_transition(&mut self, _events: &[ExternalEvent], time: Time) {
        self.reschedule(time);
    }

    fn observation(&self, request: &ObservationRequest) -> Value {
        match request.port.as_str() {
            "time" => Value::Double(self.child.current_time().value()),
            "bags" => Value::Integer(self.child.bags() as i64),
            port => {
                let Some((model, port)) = port.strip_prefix("child:").and_then(|p| p.rsplit_once(':')) else {
                    log::warn!("{}: no observable port '{}'", self.name, port);
                    return Value::Null;
                };
                let Some(dynamics) = self.child.dynamics(model) else {
                    log::warn!("{}: child has no model '{}'", self.name, model);
                    return Value::Null;
                };
                let time = to_child_time(request.time, self.offset);
                dynamics.observation(&ObservationRequest::new(port, time))
            }
        }
    }

    fn finish(&mut self) {
        if !self.child.is_finished() {
            self.results = Some(self.child.finish());
        }
    }
}
