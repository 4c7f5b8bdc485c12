use crate::common::TestHarness;
use devsim_core::difference::UPDATE_PORT;
use devsim_core::*;

fn harness() -> TestHarness {
    let mut h = TestHarness::new();
    h.register_equation("broken", |vars: &Variables, _time: Time| vars.dependency_value("nobody", 0));
    h.add_linear("a", 1.0, 1, 0.0, 1.0, 1.0);
    h.add(
        AtomicModel::new("z", "broken")
            .input(UPDATE_PORT)
            .condition("value", 4.0),
    );
    h.connect("a", "z");
    h
}

#[test]
fn test_timed_view_samples_on_its_grid() {
    let mut h = harness();
    h.observe(View::timed("grid", 0.5).observe("top.a", "a"));
    let observations = run(&h.graph(), &h.registry, &SimulationConfig::with_duration(3.0)).unwrap();
    assert_eq!(
        observations.doubles("grid", "top.a", "a"),
        vec![(0.0, 0.0), (0.5, 0.0), (1.0, 1.0), (1.5, 1.0), (2.0, 2.0), (2.5, 2.0), (3.0, 3.0)]
    );
}

#[test]
fn test_event_view_follows_transitions() {
    let mut h = harness();
    h.observe(View::event("moves").observe("top.a", "a"));
    let observations = run(&h.graph(), &h.registry, &SimulationConfig::with_duration(2.0)).unwrap();
    let series = observations.series("moves", "top.a", "a").unwrap();
    assert!(series.windows(2).all(|w| w[0].time <= w[1].time));
    assert_eq!(series.last().unwrap().value, Value::Double(2.0));
}

#[test]
fn test_invalid_values_are_observed_as_null() {
    let mut h = harness();
    h.observe(
        View::finish("end")
            .observe("top.z", "z")
            .observe("top.z", "not-a-port"),
    );
    let observations = run(&h.graph(), &h.registry, &SimulationConfig::with_duration(2.0)).unwrap();
    assert_eq!(observations.series("end", "top.z", "z").unwrap()[0].value, Value::Null);
    assert_eq!(
        observations.series("end", "top.z", "not-a-port").unwrap()[0].value,
        Value::Null
    );
}

#[test]
fn test_unknown_observable_fails_the_run() {
    let mut h = harness();
    h.observe(View::finish("end").observe("top.ghost", "x"));
    let err = run(&h.graph(), &h.registry, &SimulationConfig::with_duration(1.0)).unwrap_err();
    assert_eq!(err.code, SimError::UnknownObservable(String::new()).code());
}

#[test]
fn test_oversampled_timed_view_fails_the_run() {
    let mut h = harness();
    h.observe(View::timed("dense", 0.5).observe("top.a", "a"));
    let config = SimulationConfig {
        max_view_samples: 6,
        ..SimulationConfig::with_duration(3.0)
    };
    let err = run(&h.graph(), &h.registry, &config).unwrap_err();
    assert_eq!(
        err.code,
        SimError::TooManySamples {
            view: String::new(),
            samples: 0,
            limit: 0,
        }
        .code()
    );
    assert!(err.message.contains("dense"));
}
