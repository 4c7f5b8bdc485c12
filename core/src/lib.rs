pub mod calendar;
pub mod components;
pub mod config;
pub mod difference;
pub mod driver;
pub mod engine;
pub mod error;
pub mod event;
pub mod graph;
pub mod observer;
pub mod registry;
pub mod time;
pub mod traits;
pub mod value;

pub use components::{register_builtins, Builtin};
pub use config::SimulationConfig;
pub use difference::{DifferenceEquation, Equation, FnEquation, Generic, Phase, Variables};
pub use driver::{run, run_json};
pub use engine::RootCoordinator;
pub use error::{ComputeError, RunError, SimError, SimResult};
pub use event::{Dispatch, EventKind, ExternalEvent, ObservationRequest, Transition};
pub use graph::{AtomicModel, CoupledModel, ModelGraph, ModelNode};
pub use observer::{Observations, View, ViewKind};
pub use registry::DynamicsRegistry;
pub use time::{Time, Tolerance};
pub use traits::{Dynamics, ModelInit};
pub use value::{Attributes, Value};
