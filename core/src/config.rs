use crate::time::{Time, Tolerance};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub begin: f64,
    /// Horizon relative to `begin`. Events scheduled after
    /// `begin + duration` are never dispatched.
    pub duration: f64,
    /// Boundary comparison used by models that need one.
    pub tolerance: Tolerance,
    /// Keep a [`crate::event::Dispatch`] record per transition.
    pub record_trace: bool,
    /// Most samples a timed view may take over the run.
    pub max_view_samples: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            begin: 0.0,
            duration: f64::INFINITY,
            tolerance: Tolerance::default(),
            record_trace: false,
            max_view_samples: 1_000_000,
        }
    }
}

impl SimulationConfig {
    pub fn with_duration(duration: f64) -> Self {
        Self {
            duration,
            ..Default::default()
        }
    }

    pub fn traced(mut self) -> Self {
        self.record_trace = true;
        self
    }

    pub fn begin_time(&self) -> Time {
        Time::new(self.begin)
    }

    pub fn end_time(&self) -> Time {
        Time::new(self.begin + self.duration)
    }
}
