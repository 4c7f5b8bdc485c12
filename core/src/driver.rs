use crate::config::SimulationConfig;
use crate::engine::RootCoordinator;
use crate::error::{RunError, SimError};
use crate::graph::ModelGraph;
use crate::observer::Observations;
use crate::registry::DynamicsRegistry;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

pub fn run(
    graph: &ModelGraph,
    registry: &DynamicsRegistry,
    config: &SimulationConfig,
) -> Result<Observations, RunError> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<Observations, SimError> {
        let mut root = RootCoordinator::new(graph, registry, config)?;
        root.init();
        root.run();
        log::info!(
            "simulation done: {} bag(s), final time {}",
            root.bags(),
            root.current_time()
        );
        Ok(root.finish())
    }));

    match outcome {
        Ok(Ok(observations)) => Ok(observations),
        Ok(Err(err)) => {
            log::error!("simulation failed: {}", err);
            Err(err.into())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("simulation panicked: {}", message);
            Err(RunError::new(RunError::PANIC, message))
        }
    }
}

/// Parses `graph_json` and runs it. The observations come back as JSON.
pub fn run_json(
    graph_json: &str,
    registry: &DynamicsRegistry,
    config: &SimulationConfig,
) -> Result<String, RunError> {
    let graph = ModelGraph::from_json(graph_json)?;
    let observations = run(&graph, registry, config)?;
    Ok(observations.to_json()?)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
