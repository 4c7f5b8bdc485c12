use crate::common::{EquationFn, TestHarness};
use devsim_core::difference::{Sum, UPDATE_PORT};
use devsim_core::*;

fn sum_model(name: &str) -> AtomicModel {
    AtomicModel::new(name, "difference/sum").input(UPDATE_PORT)
}

#[test]
fn test_computes_once_per_period_after_all_reports() {
    let mut h = TestHarness::new();
    // a(t) = t, b(t) = 2t
    h.add_linear("a", 1.0, 1, 0.0, 1.0, 1.0);
    h.add_linear("b", 1.0, 1, 0.0, 1.0, 2.0);
    h.add(sum_model("c"));
    h.connect("a", "c");
    h.connect("b", "c");
    h.start();

    for k in 1..=5 {
        h.run_until(k as f64);
        assert_eq!(h.value("c"), Some(3.0 * k as f64), "c at t={}", k);
        let c = h.engine::<Sum>("c");
        assert_eq!(c.received(), 0);
        // initial value plus one computation per elapsed period
        assert_eq!(c.variables().history().len(), k + 1);
    }
    assert_eq!(h.engine::<Sum>("c").syncs(), 2);
}

#[test]
fn test_negotiated_timestep_is_smallest_multiple() {
    let mut h = TestHarness::new();
    h.add_linear("m2", 0.5, 2, 0.0, 1.0, 1.0);
    h.add_linear("m3", 0.5, 3, 0.0, 1.0, 1.0);
    h.add_linear("m6", 0.5, 6, 0.0, 1.0, 1.0);
    h.add(sum_model("d"));
    for source in ["m2", "m3", "m6"] {
        h.connect(source, "d");
    }
    h.start();
    h.run_until(0.0);

    let d = h.engine::<Sum>("d");
    assert_eq!(d.multiple(), 2);
    assert_eq!(d.delta(), 0.5);
    assert_eq!(d.time_step(), 1.0);
    // 3 does not divide 2 nor the reverse
    assert_eq!(d.syncs(), 2);
    assert!(!d.variables().dependency("m3").unwrap().is_synchronous());

    // the slower synchronous dependency must not stall the faster grid
    h.run_until(3.0);
    let d = h.engine::<Sum>("d");
    assert_eq!(d.variables().history().len(), 4);
    assert_eq!(h.value("d"), Some(3.0 + 2.0 + 1.0));
}

fn elapsed_time(_vars: &Variables, time: Time) -> Result<f64, ComputeError> {
    Ok(time.value())
}

#[test]
fn test_out_of_phase_updates_keep_the_grid() {
    let mut h = TestHarness::new();
    h.register_equation("clock", elapsed_time);
    h.add_linear("fast", 1.0, 1, 0.0, 1.0, 1.0);
    h.add(
        AtomicModel::new("slow", "clock")
            .input(UPDATE_PORT)
            .condition("delta", 1.0)
            .condition("multiple", 4),
    );
    h.connect("fast", "slow");
    h.start();

    h.run_until(9.0);
    let slow = h.engine::<FnEquation<EquationFn>>("slow");
    let computed: Vec<f64> = slow.variables().history().iter().copied().collect();
    assert_eq!(computed, vec![8.0, 4.0, 0.0]);
    // fast reports every unit, each one in between buffered
    assert_eq!(slow.variables().dependency_value("fast", 0), Ok(9.0));
}
