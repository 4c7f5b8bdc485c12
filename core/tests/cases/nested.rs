use devsim_core::components::nested::NestedSimulation;
use devsim_core::*;
use std::rc::Rc;

fn inner() -> ModelGraph {
    ModelGraph::new(
        CoupledModel::new("inner")
            .child(AtomicModel::new("g", "generator").output("out"))
            .child(AtomicModel::new("n", "counter").input("in"))
            .connect("g", "out", "n", "in"),
    )
}

fn registry(child_duration: f64) -> DynamicsRegistry {
    let mut registry = DynamicsRegistry::with_builtins();
    registry.register(
        "nested",
        NestedSimulation::factory(
            inner(),
            Rc::new(DynamicsRegistry::with_builtins()),
            SimulationConfig::with_duration(child_duration),
        ),
    );
    registry
}

fn outer(sub: AtomicModel) -> ModelGraph {
    ModelGraph::new(CoupledModel::new("top").child(sub))
        .view(View::finish("end").observe("top.sub", "child:inner.n:count"))
        .view(View::event("steps").observe("top.sub", "time"))
}

#[test]
fn test_child_runs_to_its_own_horizon() {
    let graph = outer(AtomicModel::new("sub", "nested"));
    let observations = run(&graph, &registry(5.0), &SimulationConfig::with_duration(10.0)).unwrap();
    let count = observations.series("end", "top.sub", "child:inner.n:count").unwrap();
    assert_eq!(count[0].value, Value::Integer(5));
}

#[test]
fn test_stop_after_bounds_the_child() {
    let graph = outer(AtomicModel::new("sub", "nested").condition("stop_after", 3.0));
    let observations = run(&graph, &registry(5.0), &SimulationConfig::with_duration(10.0)).unwrap();
    let count = observations.series("end", "top.sub", "child:inner.n:count").unwrap();
    assert_eq!(count[0].value, Value::Integer(3));
}

#[test]
fn test_child_time_is_translated() {
    let graph = outer(AtomicModel::new("sub", "nested"));
    let config = SimulationConfig {
        begin: 100.0,
        duration: 10.0,
        ..Default::default()
    };
    let observations = run(&graph, &registry(3.0), &config).unwrap();
    assert_eq!(
        observations.doubles("steps", "top.sub", "time"),
        vec![(101.0, 1.0), (102.0, 2.0), (103.0, 3.0)]
    );
}

#[test]
fn test_broken_child_graph_is_reported() {
    let mut registry = DynamicsRegistry::with_builtins();
    let broken = ModelGraph::new(AtomicModel::new("x", "missing"));
    registry.register(
        "nested",
        NestedSimulation::factory(broken, Rc::new(DynamicsRegistry::with_builtins()), SimulationConfig::default()),
    );
    let graph = outer(AtomicModel::new("sub", "nested"));
    let err = run(&graph, &registry, &SimulationConfig::with_duration(1.0)).unwrap_err();
    assert_eq!(err.code, 10);
    assert!(err.message.contains("missing"));
}
