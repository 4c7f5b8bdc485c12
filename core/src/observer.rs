use crate::error::{SimError, SimResult};
use crate::event::ObservationRequest;
use crate::time::Time;
use crate::traits::Dynamics;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ViewKind {
    Timed { timestep: f64 },
    Event,
    Finish,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observable {
    /// Full dotted path of an atomic model.
    pub model: String,
    pub port: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    #[serde(flatten)]
    pub kind: ViewKind,
    #[serde(default)]
    pub observables: Vec<Observable>,
}

impl View {
    pub fn timed(name: &str, timestep: f64) -> Self {
        Self::with_kind(name, ViewKind::Timed { timestep })
    }

    pub fn event(name: &str) -> Self {
        Self::with_kind(name, ViewKind::Event)
    }

    pub fn finish(name: &str) -> Self {
        Self::with_kind(name, ViewKind::Finish)
    }

    fn with_kind(name: &str, kind: ViewKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            observables: Vec::new(),
        }
    }

    pub fn observe(mut self, model: &str, port: &str) -> Self {
        self.observables.push(Observable {
            model: model.to_string(),
            port: port.to_string(),
        });
        self
    }
}

/// One observed point of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub value: Value,
}

pub type Series = Vec<Sample>;

/// view name → `"model:port"` → time series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Observations {
    pub views: BTreeMap<String, BTreeMap<String, Series>>,
}

impl Observations {
    pub fn series(&self, view: &str, model: &str, port: &str) -> Option<&Series> {
        self.views.get(view)?.get(&series_key(model, port))
    }

    /// Numeric values of a series, nulls skipped.
    pub fn doubles(&self, view: &str, model: &str, port: &str) -> Vec<(f64, f64)> {
        self.series(view, model, port)
            .map(|s| {
                s.iter()
                    .filter_map(|p| p.value.as_double().map(|v| (p.time, v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn to_json(&self) -> SimResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SimError::InvalidGraph(e.to_string()))
    }
}

fn series_key(model: &str, port: &str) -> String {
    format!("{}:{}", model, port)
}

struct Probe {
    model: usize,
    path: String,
    port: String,
}

struct ActiveView {
    name: String,
    kind: ViewKind,
    probes: Vec<Probe>,
    begin: Time,
    samples: u64,
    exhausted: bool,
}

impl ActiveView {
    fn next_sample(&self, timestep: f64) -> Time {
        self.begin + Time::new(self.samples as f64 * timestep)
    }
}

/// Samples views against the coordinator's models.
pub struct Observer {
    views: Vec<ActiveView>,
    output: Observations,
    limit: u64,
}

impl Observer {
    /// `resolve` maps a model path to its index in the coordinator.
    pub fn new(views: &[View], begin: Time, resolve: impl Fn(&str) -> Option<usize>) -> SimResult<Self> {
        let mut active = Vec::with_capacity(views.len());
        let mut output = Observations::default();
        for view in views {
            if let ViewKind::Timed { timestep } = view.kind {
                if !(timestep > 0.0) {
                    return Err(SimError::InvalidGraph(format!(
                        "view '{}' has a non-positive timestep",
                        view.name
                    )));
                }
            }
            let mut probes = Vec::with_capacity(view.observables.len());
            let columns = output.views.entry(view.name.clone()).or_default();
            for obs in &view.observables {
                let model =
                    resolve(&obs.model).ok_or_else(|| SimError::UnknownObservable(obs.model.clone()))?;
                columns.insert(series_key(&obs.model, &obs.port), Vec::new());
                probes.push(Probe {
                    model,
                    path: obs.model.clone(),
                    port: obs.port.clone(),
                });
            }
            active.push(ActiveView {
                name: view.name.clone(),
                kind: view.kind.clone(),
                probes,
                begin,
                samples: 0,
                exhausted: false,
            });
        }
        Ok(Self {
            views: active,
            output,
            limit: u64::MAX,
        })
    }

    /// Caps every timed view at `limit` samples. With a finite `end` a view
    /// that would go past the cap is rejected up front; otherwise sampling
    /// stops at the cap.
    pub fn limit(mut self, end: Time, limit: u64) -> SimResult<Self> {
        if end.is_finite() {
            for view in &self.views {
                let ViewKind::Timed { timestep } = view.kind else {
                    continue;
                };
                let span = (end - view.begin).value().max(0.0);
                let samples = (span / timestep).floor() + 1.0;
                if samples > limit as f64 {
                    return Err(SimError::TooManySamples {
                        view: view.name.clone(),
                        samples: samples.min(u64::MAX as f64) as u64,
                        limit,
                    });
                }
            }
        }
        self.limit = limit;
        Ok(self)
    }

    /// Emits every timed sample strictly before `until`, and at `until`
    /// itself when `inclusive`.
    pub fn sample_timed(&mut self, until: Time, inclusive: bool, models: &[Box<dyn Dynamics>]) {
        for view in &mut self.views {
            let ViewKind::Timed { timestep } = view.kind else {
                continue;
            };
            while !view.exhausted {
                let at = view.next_sample(timestep);
                if !(at < until || (inclusive && at == until)) {
                    break;
                }
                if view.samples >= self.limit {
                    log::warn!("view '{}': stopped after {} samples", view.name, view.samples);
                    view.exhausted = true;
                    break;
                }
                record(&mut self.output, &view.name, &view.probes, None, at, models);
                view.samples += 1;
            }
        }
    }

    /// Samples event views observing `model` after one of its transitions.
    pub fn sample_event(&mut self, model: usize, time: Time, models: &[Box<dyn Dynamics>]) {
        for view in &self.views {
            if view.kind == ViewKind::Event {
                record(&mut self.output, &view.name, &view.probes, Some(model), time, models);
            }
        }
    }

    pub fn sample_finish(&mut self, time: Time, models: &[Box<dyn Dynamics>]) {
        for view in &self.views {
            if view.kind == ViewKind::Finish {
                record(&mut self.output, &view.name, &view.probes, None, time, models);
            }
        }
    }

    pub fn take_observations(&mut self) -> Observations {
        std::mem::take(&mut self.output)
    }

    pub fn observations(&self) -> &Observations {
        &self.output
    }
}

fn record(
    output: &mut Observations,
    view: &str,
    probes: &[Probe],
    only: Option<usize>,
    time: Time,
    models: &[Box<dyn Dynamics>],
) {
    let Some(columns) = output.views.get_mut(view) else {
        return;
    };
    for probe in probes {
        if only.is_some_and(|m| m != probe.model) {
            continue;
        }
        let request = ObservationRequest::new(&probe.port, time);
        let value = models[probe.model].observation(&request);
        if let Some(series) = columns.get_mut(&series_key(&probe.path, &probe.port)) {
            series.push(Sample {
                time: time.value(),
                value,
            });
        }
    }
}
