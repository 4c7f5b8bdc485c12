use crate::calendar::Calendar;
use crate::config::SimulationConfig;
use crate::error::SimResult;
use crate::event::{Dispatch, EventKind, ExternalEvent, Transition};
use crate::graph::{ModelGraph, PortRef};
use crate::observer::{Observations, Observer};
use crate::registry::DynamicsRegistry;
use crate::time::Time;
use crate::traits::{Dynamics, ModelInit};
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Loaded,
    Running,
    Finished,
}

pub struct RootCoordinator {
    names: Vec<String>,
    models: Vec<Box<dyn Dynamics>>,
    last: Vec<Time>,
    routes: BTreeMap<PortRef, Vec<PortRef>>,
    calendar: Calendar,
    observer: Observer,
    time: Time,
    begin: Time,
    end: Time,
    bags: u64,
    trace: Option<Vec<Dispatch>>,
    stage: Stage,
}

impl RootCoordinator {
    /// Flattens `graph` and instantiates every atomic model through `registry`.
    pub fn new(graph: &ModelGraph, registry: &DynamicsRegistry, config: &SimulationConfig) -> SimResult<Self> {
        let flat = graph.flatten()?;
        let mut names = Vec::with_capacity(flat.models.len());
        let mut models = Vec::with_capacity(flat.models.len());
        for model in &flat.models {
            let init = ModelInit {
                name: model.path.clone(),
                inputs: model.inputs.clone(),
                outputs: model.outputs.clone(),
                tolerance: config.tolerance,
            };
            models.push(registry.create(&model.dynamics, &init, &model.conditions)?);
            names.push(model.path.clone());
        }
        let begin = config.begin_time();
        let observer = Observer::new(&graph.views, begin, |path| flat.index_of(path))?
            .limit(config.end_time(), config.max_view_samples)?;
        log::debug!(
            "coordinator loaded {} model(s), {} route(s)",
            models.len(),
            flat.routes.len()
        );

        Ok(Self {
            last: vec![begin; models.len()],
            calendar: Calendar::new(models.len()),
            names,
            models,
            routes: flat.routes,
            observer,
            time: begin,
            begin,
            end: config.end_time(),
            bags: 0,
            trace: config.record_trace.then(Vec::new),
            stage: Stage::Loaded,
        })
    }

    /// Calls `init` on every model and schedules its first internal event.
    pub fn init(&mut self) {
        if self.stage != Stage::Loaded {
            return;
        }
        self.time = self.begin;
        for index in 0..self.models.len() {
            let sigma = sanitize(&self.names[index], self.models[index].init(self.begin));
            self.last[index] = self.begin;
            self.calendar.schedule(index, self.begin + sigma);
        }
        self.stage = Stage::Running;
    }

    /// Processes one bag. Returns `false` once nothing is left to do before
    /// the horizon.
    pub fn step(&mut self) -> bool {
        match self.stage {
            Stage::Loaded => self.init(),
            Stage::Running => {}
            Stage::Finished => return false,
        }
        let next = self.calendar.next_time();
        if next.is_infinite() || next > self.end {
            return false;
        }
        self.observer.sample_timed(next, false, &self.models);

        let Some((time, imminent)) = self.calendar.pop_imminent() else {
            return false;
        };
        debug_assert!(time >= self.time, "time moved backward");
        self.time = time;
        self.bags += 1;
        log::debug!("bag {} at {}: {} imminent", self.bags, time, imminent.len());

        let mut bags = self.collection(time, &imminent);
        let mut touched: Vec<usize> = imminent.iter().copied().chain(bags.keys().copied()).collect();
        touched.sort_unstable();
        touched.dedup();

        for index in touched {
            let events = bags.remove(&index).unwrap_or_default();
            let is_imminent = imminent.binary_search(&index).is_ok();
            let transition = self.transition(index, time, is_imminent, &events);
            let sigma = sanitize(&self.names[index], self.models[index].time_advance());
            self.last[index] = time;
            self.calendar.schedule(index, time + sigma);
            if let Some(trace) = self.trace.as_mut() {
                trace.push(Dispatch {
                    time,
                    model: self.names[index].clone(),
                    transition,
                    sigma,
                });
            }
            self.observer.sample_event(index, time, &self.models);
        }
        true
    }

    fn collection(&self, time: Time, imminent: &[usize]) -> BTreeMap<usize, Vec<ExternalEvent>> {
        let mut bags: BTreeMap<usize, Vec<ExternalEvent>> = BTreeMap::new();
        let mut pending: VecDeque<(usize, ExternalEvent, usize)> = VecDeque::new();
        let mut output = Vec::new();
        for &index in imminent {
            self.models[index].output(time, &mut output);
            pending.extend(output.drain(..).map(|event| (index, event, 0)));
        }

        while let Some((source, event, hops)) = pending.pop_front() {
            let Some(destinations) = self.routes.get(&(source, event.port.clone())) else {
                log::trace!("{}: '{}' is not connected", self.names[source], event.port);
                continue;
            };
            for (dest, port) in destinations {
                let mut routed = event.clone();
                routed.port = port.clone();
                if !routed.is_request() {
                    bags.entry(*dest).or_default().push(routed);
                    continue;
                }
                if hops >= self.models.len() {
                    log::warn!("{}: request chain too long, dropping '{}'", self.names[*dest], port);
                    continue;
                }
                self.models[*dest].request(&routed, time, &mut output);
                pending.extend(output.drain(..).map(|answer| (*dest, answer, hops + 1)));
            }
        }
        bags
    }

    fn transition(&mut self, index: usize, time: Time, is_imminent: bool, events: &[ExternalEvent]) -> Transition {
        let model = &mut self.models[index];
        match (is_imminent, events.is_empty()) {
            (true, true) => {
                model.internal_transition(time);
                Transition::Internal
            }
            (false, _) => {
                model.external_transition(events, time);
                Transition::External
            }
            (true, false) => {
                // output() already went out for this bag, so both transitions
                // run; the policy only picks which goes first
                let kind = model.confluent_transition(time, events);
                match kind {
                    EventKind::Internal => {
                        model.internal_transition(time);
                        model.external_transition(events, time);
                    }
                    EventKind::External => {
                        model.external_transition(events, time);
                        model.internal_transition(time);
                    }
                }
                Transition::Confluent(kind)
            }
        }
    }

    /// Runs until the calendar is empty or the horizon is passed.
    pub fn run(&mut self) {
        while self.step() {}
    }

    /// Samples the remaining timed and finish views, finalizes every model
    /// and hands back what was observed.
    pub fn finish(&mut self) -> Observations {
        if self.stage == Stage::Finished {
            return self.observer.take_observations();
        }
        if self.end.is_finite() && self.time < self.end {
            self.time = self.end;
        }
        self.observer.sample_timed(self.time, true, &self.models);
        self.observer.sample_finish(self.time, &self.models);
        self.finalize();
        self.observer.take_observations()
    }

    fn finalize(&mut self) {
        for model in &mut self.models {
            model.finish();
        }
        self.stage = Stage::Finished;
        log::debug!("coordinator finished at {} after {} bag(s)", self.time, self.bags);
    }

    pub fn current_time(&self) -> Time {
        self.time
    }

    pub fn next_time(&mut self) -> Time {
        self.calendar.next_time()
    }

    pub fn end_time(&self) -> Time {
        self.end
    }

    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Finished
    }

    pub fn bags(&self) -> u64 {
        self.bags
    }

    pub fn model_names(&self) -> &[String] {
        &self.names
    }

    pub fn dynamics(&self, path: &str) -> Option<&dyn Dynamics> {
        let index = self.names.iter().position(|n| n == path)?;
        Some(self.models[index].as_ref())
    }

    /// Time of the last transition of `path`.
    pub fn last_transition(&self, path: &str) -> Option<Time> {
        let index = self.names.iter().position(|n| n == path)?;
        Some(self.last[index])
    }

    pub fn trace(&self) -> &[Dispatch] {
        self.trace.as_deref().unwrap_or(&[])
    }

    pub fn observations(&self) -> &Observations {
        self.observer.observations()
    }
}

impl Drop for RootCoordinator {
    fn drop(&mut self) {
        if self.stage != Stage::Finished {
            self.finalize();
        }
    }
}

fn sanitize(model: &str, sigma: Time) -> Time {
    if sigma.value().is_nan() || sigma < Time::ZERO {
        log::warn!("{}: invalid time advance {}, using 0", model, sigma);
        return Time::ZERO;
    }
    sigma
}
