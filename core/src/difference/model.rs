use super::phase::Phase;
use super::variables::{synchronous, Variables};
use super::{Equation, PERTURB_PORT, REQUEST_PORT, RESPONSE_PORT, UPDATE_PORT};
use crate::error::{SimError, SimResult};
use crate::event::{EventKind, ExternalEvent, ObservationRequest};
use crate::time::{Time, Tolerance};
use crate::traits::{Dynamics, ModelInit};
use crate::value::{Attributes, Value};

/// A variable recomputed once per timestep from its own past values and the
/// values its dependencies broadcast on `update`.
///
/// Conditions:
/// - `name`: variable name, defaults to the model's own name
/// - `size`: history depth kept for every variable, unbounded when absent
/// - `value`: initial value, otherwise [`Equation::initial_value`] is used
/// - `delta`, `multiple`: timestep is `multiple × delta`; without `delta`
///   the model learns its timestep from its dependencies
pub struct DifferenceEquation<E> {
    equation: E,
    vars: Variables,
    phase: Phase,
    sigma: Time,
    last_time: Time,
    delta: f64,
    multiple: u32,
    time_step: f64,
    initial_value: Option<f64>,
    invalid: bool,
    active: bool,
    dependant: bool,
    syncs: usize,
    received: usize,
    periods: u64,
    wait: Vec<String>,
    announced_delta: Option<f64>,
    tolerance: Tolerance,
}

impl<E: Equation> DifferenceEquation<E> {
    pub fn new(init: &ModelInit, conditions: &Attributes, equation: E) -> SimResult<Self> {
        let variable = conditions
            .string("name")?
            .unwrap_or_else(|| init.short_name().to_string());
        let bound = match conditions.integer("size")? {
            Some(size) if size < 1 => {
                return Err(SimError::InvalidCondition {
                    key: "size".into(),
                    expected: "a positive integer",
                    found: "a non-positive integer",
                })
            }
            Some(size) => Some(size as usize),
            None => None,
        };
        let (delta, multiple) = match conditions.double("delta")? {
            Some(delta) => {
                let multiple = match conditions.double("multiple")? {
                    Some(m) => as_multiple(m).ok_or_else(|| SimError::InvalidCondition {
                        key: "multiple".into(),
                        expected: "a non-negative integer",
                        found: "a fractional or negative number",
                    })?,
                    None => 1,
                };
                (delta, multiple)
            }
            None => (0.0, 0),
        };
        let time_step = multiple as f64 * delta;
        let dependant = init.has_input(UPDATE_PORT);
        if !(time_step > 0.0) && !dependant {
            return Err(SimError::MissingTimeStep(init.name.clone()));
        }

        Ok(Self {
            equation,
            vars: Variables::new(&init.name, &variable, bound),
            phase: Phase::Init,
            sigma: Time::INFINITY,
            last_time: Time::ZERO,
            delta,
            multiple,
            time_step,
            initial_value: conditions.double("value")?,
            invalid: true,
            active: init.has_output(UPDATE_PORT),
            dependant,
            syncs: 0,
            received: 0,
            periods: 0,
            wait: Vec::new(),
            announced_delta: None,
            tolerance: init.tolerance,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn sigma(&self) -> Time {
        self.sigma
    }

    pub fn multiple(&self) -> u32 {
        self.multiple
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Number of synchronous dependencies.
    pub fn syncs(&self) -> usize {
        self.syncs
    }

    /// Synchronous reports received in the current period.
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn variables(&self) -> &Variables {
        &self.vars
    }

    pub fn equation(&self) -> &E {
        &self.equation
    }

    fn step(&self) -> Time {
        Time::new(self.time_step)
    }

    fn enter(&mut self, phase: Phase, sigma: Time) {
        log::trace!("{}: {} -> {} (σ = {})", self.vars.name(), self.phase, phase, sigma);
        self.phase = phase;
        self.sigma = sigma;
    }

    fn settle(&mut self, sigma: Time) {
        let phase = if self.dependant { Phase::Pre } else { Phase::Run };
        self.enter(phase, sigma);
    }

    /// Reports awaited at the boundary closing the current period: every
    /// synchronous dependency whose own grid lands on it.
    pub fn expected_reports(&self) -> usize {
        let boundary = (self.periods + 1) * u64::from(self.multiple);
        self.vars
            .dependencies_iter()
            .filter(|d| d.synchronous)
            .filter(|d| d.multiple == 0 || d.multiple <= self.multiple || boundary % u64::from(d.multiple) == 0)
            .count()
    }

    fn compute(&mut self, time: Time) {
        self.last_time = time;
        match self.equation.compute(&self.vars, time) {
            Ok(value) => {
                self.vars.push(value);
                self.invalid = false;
            }
            Err(err) => {
                log::debug!("{} at {}: {}", self.vars.name(), time, err);
                self.invalid = true;
            }
        }
        self.periods += 1;
        if self.active {
            self.enter(Phase::Post, Time::ZERO);
        } else {
            let step = self.step();
            self.settle(step);
        }
    }

    fn initialize_value(&mut self) {
        if self.initial_value.is_some() || !self.invalid {
            return;
        }
        match self.equation.initial_value(&self.vars) {
            Ok(value) => {
                self.vars.push(value);
                self.invalid = false;
            }
            Err(err) => log::warn!("{}: no initial value: {}", self.vars.name(), err),
        }
    }

    fn clear_reports(&mut self) {
        self.received = 0;
        for dep in self.vars.dependencies_mut() {
            dep.received = false;
        }
    }

    fn mark_synchronous(&mut self, name: &str) {
        if let Some(dep) = self.vars.dependency_mut(name) {
            if !dep.synchronous {
                dep.synchronous = true;
                self.syncs += 1;
            }
        }
    }

    fn on_update(&mut self, event: &ExternalEvent, time: Time, end: bool) {
        let Some(name) = event.string("name") else {
            log::warn!("{}: update without a name", self.vars.name());
            return;
        };
        let registered = self.vars.dependency(name).is_some_and(|d| d.registered);
        if !registered {
            if let Some(multiple) = event.double("multiple") {
                match as_multiple(multiple) {
                    Some(0) | None => {
                        // the sender has not negotiated its own timestep yet
                        if !self.wait.iter().any(|w| w == name) {
                            self.wait.push(name.to_string());
                        }
                        return;
                    }
                    Some(multiple) => {
                        self.wait.retain(|w| w != name);
                        if self.announced_delta.is_none() {
                            self.announced_delta = event.double("delta");
                        }
                        let own = self.multiple;
                        let dep = self.vars.ensure_dependency(name);
                        dep.registered = true;
                        dep.multiple = multiple;
                        if synchronous(multiple, own) {
                            self.mark_synchronous(name);
                        }
                    }
                }
            }
        }

        let closing = self.phase == Phase::Pre && end;
        let Some(dep) = self.vars.dependency_mut(name) else {
            log::debug!("{}: ignoring update from undeclared {}", self.vars.name(), name);
            return;
        };
        if let Some(value) = event.double("value") {
            dep.values.push((time, value));
        }
        if closing && dep.synchronous && !dep.received {
            dep.received = true;
            self.received += 1;
        }
    }

    fn leave_init(&mut self, time: Time) {
        if !self.wait.is_empty() {
            return;
        }
        if self.time_step > 0.0 {
            self.initialize_value();
            self.last_time = time;
            let step = self.step();
            self.enter(Phase::Pre, step);
            return;
        }

        let Some(multiple) = self
            .vars
            .dependencies_iter()
            .filter(|d| d.registered)
            .map(|d| d.multiple)
            .min()
        else {
            return;
        };
        self.multiple = multiple;
        let synced: Vec<String> = self
            .vars
            .dependencies_iter()
            .filter(|d| d.registered && synchronous(d.multiple, multiple))
            .map(|d| d.name.clone())
            .collect();
        for name in synced {
            self.mark_synchronous(&name);
        }
        if self.delta <= 0.0 {
            self.delta = self.announced_delta.unwrap_or(0.0);
        }
        self.time_step = self.multiple as f64 * self.delta;
        if !(self.time_step > 0.0) {
            log::warn!("{}: dependencies announced no usable timestep", self.vars.name());
            return;
        }
        log::debug!(
            "{}: negotiated multiple {} × delta {}",
            self.vars.name(),
            self.multiple,
            self.delta
        );
        self.initialize_value();
        self.last_time = time;
        self.enter(Phase::PreInit2, Time::ZERO);
    }

    /// Declares a dependency ahead of any update from it.
    pub(crate) fn add_dependency(&mut self, name: &str, synchronous: bool) {
        self.vars.ensure_dependency(name);
        if synchronous {
            self.mark_synchronous(name);
        }
    }

    pub(crate) fn remove_dependency(&mut self, name: &str) {
        self.wait.retain(|w| w != name);
        if let Some(dep) = self.vars.remove_dependency(name) {
            if dep.synchronous {
                self.syncs -= 1;
            }
            if dep.received {
                self.received -= 1;
            }
        }
    }
}

impl<E: Equation> Dynamics for DifferenceEquation<E> {
    fn init(&mut self, time: Time) -> Time {
        self.last_time = time;
        self.periods = 0;
        self.clear_reports();
        if let Some(value) = self.initial_value {
            self.vars.push(value);
            self.invalid = false;
        }
        if self.active {
            self.enter(Phase::PreInit, Time::ZERO);
        } else if self.dependant {
            self.enter(Phase::Init, Time::INFINITY);
        } else {
            self.initialize_value();
            let step = self.step();
            self.enter(Phase::Run, step);
        }
        self.sigma
    }

    fn time_advance(&self) -> Time {
        self.sigma
    }

    fn internal_transition(&mut self, time: Time) {
        match self.phase {
            Phase::PreInit => {
                if self.dependant {
                    self.enter(Phase::Init, Time::INFINITY);
                } else {
                    self.initialize_value();
                    let step = self.step();
                    self.enter(Phase::Run, step);
                }
            }
            Phase::PreInit2 | Phase::Post => {
                let step = self.step();
                self.settle(step);
            }
            Phase::Post2 { resume } => self.settle(resume),
            Phase::Init => {}
            Phase::Pre => {
                if self.expected_reports() == 0 {
                    self.compute(time);
                }
            }
            Phase::Run => self.compute(time),
        }
    }

    fn external_transition(&mut self, events: &[ExternalEvent], time: Time) {
        let elapsed = time - self.last_time;
        let end = self.tolerance.approx_eq(elapsed, self.sigma);
        let begin = self.tolerance.approx_eq(elapsed, Time::ZERO);
        let mut reset = false;

        for event in events {
            if event.on_port(UPDATE_PORT) {
                self.on_update(event, time, end);
            } else if event.on_port(PERTURB_PORT) {
                match event.double("value") {
                    Some(value) => {
                        self.vars.push(value);
                        self.invalid = false;
                        reset = true;
                    }
                    None => log::warn!("{}: perturbation without a value", self.vars.name()),
                }
            } else if !is_structural(&event.port) {
                log::warn!("{}: event on unknown port '{}'", self.vars.name(), event.port);
            }
        }

        match self.phase {
            Phase::Init => self.leave_init(time),
            Phase::Pre if end && (reset || self.received >= self.expected_reports()) => {
                self.clear_reports();
                self.enter(Phase::Run, Time::ZERO);
            }
            Phase::Pre | Phase::Run if !end && !begin => {
                let mut resume = self.sigma - elapsed;
                if resume < Time::ZERO {
                    log::warn!("{}: update arrived {} past the boundary", self.vars.name(), elapsed);
                    resume = Time::ZERO;
                }
                self.last_time = time;
                self.enter(Phase::Post2 { resume }, Time::ZERO);
            }
            _ => {}
        }
    }

    /// Finish the pending phase first so updates arriving on the same bag
    /// are read against the state it leads to.
    fn confluent_transition(&self, _time: Time, _events: &[ExternalEvent]) -> EventKind {
        EventKind::Internal
    }

    fn output(&self, _time: Time, output: &mut Vec<ExternalEvent>) {
        if !self.active || !self.phase.broadcasts() {
            return;
        }
        let mut event = ExternalEvent::new(UPDATE_PORT).with("name", self.vars.name());
        if let Ok(value) = self.vars.value(0) {
            event = event.with("value", value);
        }
        if self.phase.announces() {
            event = event.with("multiple", self.multiple).with("delta", self.delta);
        }
        output.push(event);
    }

    /// Answers `{name, value}` on `response`, `value` left out while invalid.
    fn request(&self, event: &ExternalEvent, _time: Time, output: &mut Vec<ExternalEvent>) {
        if !event.on_port(REQUEST_PORT) {
            log::warn!("{}: request on unknown port '{}'", self.vars.name(), event.port);
            return;
        }
        if event.string("name") != Some(self.vars.name()) {
            log::warn!(
                "{}: request for another variable {:?}",
                self.vars.name(),
                event.string("name")
            );
            return;
        }
        let mut answer = ExternalEvent::new(RESPONSE_PORT).with("name", self.vars.name());
        if let (false, Ok(value)) = (self.invalid, self.vars.value(0)) {
            answer = answer.with("value", value);
        }
        output.push(answer);
    }

    fn observation(&self, request: &ObservationRequest) -> Value {
        if request.port != self.vars.name() {
            log::warn!("{}: no observable port '{}'", self.vars.name(), request.port);
            return Value::Null;
        }
        if self.invalid {
            return Value::Null;
        }
        self.vars.value(0).map(Value::Double).unwrap_or(Value::Null)
    }
}

fn is_structural(port: &str) -> bool {
    port == super::ADD_PORT || port == super::REMOVE_PORT
}

fn as_multiple(value: f64) -> Option<u32> {
    (value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64).then(|| value as u32)
}
