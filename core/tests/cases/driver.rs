use devsim_core::*;

const GRAPH: &str = r#"{
    "root": {
        "type": "coupled",
        "name": "top",
        "children": [
            {"type": "atomic", "name": "g", "dynamics": "generator",
             "conditions": {"period": 2}, "outputs": ["out"]},
            {"type": "atomic", "name": "n", "dynamics": "counter", "inputs": ["in"]}
        ],
        "connections": [
            {"from": {"model": "g", "port": "out"}, "to": {"model": "n", "port": "in"}}
        ]
    },
    "views": [
        {"name": "end", "kind": "finish",
         "observables": [{"model": "top.n", "port": "count"}]}
    ]
}"#;

struct Faulty;

impl Dynamics for Faulty {
    fn init(&mut self, _time: Time) -> Time {
        Time::new(1.0)
    }
    fn time_advance(&self) -> Time {
        Time::new(1.0)
    }
    fn internal_transition(&mut self, _time: Time) {
        panic!("faulty model");
    }
    fn external_transition(&mut self, _events: &[ExternalEvent], _time: Time) {}
}

#[test]
fn test_run_json_reports_observations() {
    let registry = DynamicsRegistry::with_builtins();
    let json = run_json(GRAPH, &registry, &SimulationConfig::with_duration(10.0)).unwrap();
    let observations: Observations = serde_json::from_str(&json).unwrap();
    let series = observations.series("end", "top.n", "count").unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].time, 10.0);
    assert_eq!(series[0].value, Value::Integer(5));
}

#[test]
fn test_configuration_errors_carry_a_code() {
    let registry = DynamicsRegistry::new();
    let err = run_json(GRAPH, &registry, &SimulationConfig::with_duration(10.0)).unwrap_err();
    assert_eq!(err.code, SimError::UnknownDynamics(String::new()).code());
    assert!(err.message.contains("counter") || err.message.contains("generator"));

    let err = run_json("{ not json", &registry, &SimulationConfig::default()).unwrap_err();
    assert_eq!(err.code, SimError::InvalidGraph(String::new()).code());
}

#[test]
fn test_closed_registry() {
    let mut registry = DynamicsRegistry::with_builtins();
    registry.shutdown();
    let err = run_json(GRAPH, &registry, &SimulationConfig::with_duration(1.0)).unwrap_err();
    assert_eq!(err.code, SimError::RegistryClosed.code());
}

#[test]
fn test_panics_do_not_cross_the_driver() {
    let mut registry = DynamicsRegistry::new();
    registry.register("faulty", |_init: &ModelInit, _conditions: &Attributes| {
        Ok(Box::new(Faulty) as Box<dyn Dynamics>)
    });
    let graph = ModelGraph::new(CoupledModel::new("top").child(AtomicModel::new("f", "faulty")));
    let err = run(&graph, &registry, &SimulationConfig::with_duration(5.0)).unwrap_err();
    assert_eq!(err.code, RunError::PANIC);
    assert!(err.message.contains("faulty model"));
}
