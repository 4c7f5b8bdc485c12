use crate::common::{EquationFn, TestHarness};
use devsim_core::difference::{Linear, UPDATE_PORT};
use devsim_core::*;

fn copy_of_a(vars: &Variables, _time: Time) -> Result<f64, ComputeError> {
    vars.dependency_value("a", 0)
}

#[test]
fn test_dependant_learns_timestep_and_reads_current_value() {
    let mut h = TestHarness::new();
    h.register_equation("copy", copy_of_a);
    // a(t) = a(t-1) + 1, a(0) = 0
    h.add_linear("a", 1.0, 1, 0.0, 1.0, 1.0);
    h.add(AtomicModel::new("b", "copy").input(UPDATE_PORT));
    h.connect("a", "b");
    h.start();

    h.run_until(0.0);
    assert_eq!(h.engine::<FnEquation<EquationFn>>("b").time_step(), 1.0);
    assert_eq!(h.engine::<Linear>("a").time_step(), 1.0);

    h.run_until(1.0);
    assert_eq!(h.value("a"), Some(1.0));
    assert_eq!(h.value("b"), Some(1.0), "b must see a's value at t=1, not t=0");

    h.run_until(5.0);
    assert_eq!(h.value("b"), Some(5.0));
}

#[test]
fn test_source_without_timestep_is_rejected() {
    let mut h = TestHarness::new();
    h.add(AtomicModel::new("a", "difference/linear").output(UPDATE_PORT));
    let err = RootCoordinator::new(&h.graph(), &h.registry, &h.config).err().unwrap();
    assert_eq!(err, SimError::MissingTimeStep("top.a".into()));
}
