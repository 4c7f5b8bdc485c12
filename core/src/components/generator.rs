use super::{config_from, Builtin};
use crate::error::SimResult;
use crate::event::{ExternalEvent, ObservationRequest};
use crate::time::Time;
use crate::traits::{Dynamics, ModelInit};
use crate::value::{Attributes, Value};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub period: f64,
    /// Relative spread of each delay around `period`, in `[0, 1)`.
    pub jitter: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            period: 1.0,
            jitter: 0.0,
            seed: 0,
        }
    }
}

/// Emits `{value: n}` on `out` for the n-th time every period.
pub struct Generator {
    pub name: String,
    pub config: GeneratorConfig,
    pub rng: StdRng,
    pub count: u64,
    sigma: Time,
}

impl Generator {
    pub fn new(name: &str, config: GeneratorConfig) -> Self {
        Self {
            name: name.to_string(),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            count: 0,
            sigma: Time::INFINITY,
        }
    }

    fn next_delay(&mut self) -> Time {
        let GeneratorConfig { period, jitter, .. } = self.config;
        if !(period > 0.0) {
            return Time::INFINITY;
        }
        if jitter > 0.0 {
            let spread = jitter.min(0.99);
            Time::new(period * self.rng.gen_range(1.0 - spread..1.0 + spread))
        } else {
            Time::new(period)
        }
    }
}

impl Builtin for Generator {
    fn build(init: &ModelInit, conditions: &Attributes) -> SimResult<Self> {
        Ok(Self::new(&init.name, config_from(init, conditions)?))
    }
}

impl Dynamics for Generator {
    fn init(&mut self, _time: Time) -> Time {
        self.rng = StdRng::seed_from_u64(self.config.seed);
        self.count = 0;
        self.sigma = self.next_delay();
        self.sigma
    }

    fn time_advance(&self) -> Time {
        self.sigma
    }

    fn internal_transition(&mut self, _time: Time) {
        self.count += 1;
        self.sigma = self.next_delay();
    }

    fn external_transition(&mut self, _events: &[ExternalEvent], _time: Time) {
        log::warn!("{}: generator has no input", self.name);
    }

    fn output(&self, _time: Time, output: &mut Vec<ExternalEvent>) {
        output.push(ExternalEvent::new("out").with("value", (self.count + 1) as i64));
    }

    fn observation(&self, request: &ObservationRequest) -> Value {
        match request.port.as_str() {
            "count" => Value::Integer(self.count as i64),
            other => {
                log::warn!("{}: no observable port '{}'", self.name, other);
                Value::Null
            }
        }
    }
}
