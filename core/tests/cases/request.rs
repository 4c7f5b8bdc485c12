use crate::common::TestHarness;
use devsim_core::difference::{REQUEST_PORT, RESPONSE_PORT};
use devsim_core::*;

/// Asks for variable `x` every period and keeps the answers.
struct Asker {
    answers: Vec<(f64, Option<f64>)>,
}

impl Dynamics for Asker {
    fn init(&mut self, _time: Time) -> Time {
        Time::new(1.0)
    }

    fn time_advance(&self) -> Time {
        Time::new(1.0)
    }

    fn internal_transition(&mut self, _time: Time) {}

    fn external_transition(&mut self, events: &[ExternalEvent], time: Time) {
        for event in events.iter().filter(|e| e.on_port("answer")) {
            self.answers.push((time.value(), event.double("value")));
        }
    }

    fn output(&self, _time: Time, output: &mut Vec<ExternalEvent>) {
        output.push(ExternalEvent::request("ask").with("name", "x"));
    }
}

fn harness() -> TestHarness {
    let mut h = TestHarness::new();
    h.registry.register("asker", |_init: &ModelInit, _conditions: &Attributes| {
        Ok(Box::new(Asker { answers: Vec::new() }) as Box<dyn Dynamics>)
    });
    h.add(
        AtomicModel::new("x", "difference/linear")
            .input(REQUEST_PORT)
            .output(RESPONSE_PORT)
            .condition("delta", 1.0)
            .condition("value", 0.0)
            .condition("b", 1.0),
    );
    h.add(AtomicModel::new("q", "asker").input("answer").output("ask"));
    let top = std::mem::replace(&mut h.top, CoupledModel::new("top"));
    h.top = top
        .connect("q", "ask", "x", REQUEST_PORT)
        .connect("x", RESPONSE_PORT, "q", "answer");
    h
}

#[test]
fn test_request_is_answered_in_the_same_bag() {
    let mut h = harness();
    h.start();
    h.run_until(3.0);

    let q = h
        .root()
        .dynamics("top.q")
        .and_then(|d| d.downcast_ref::<Asker>())
        .expect("asker");
    // answers carry x as it stood before its own transition at that time
    assert_eq!(
        q.answers,
        vec![(1.0, Some(0.0)), (2.0, Some(1.0)), (3.0, Some(2.0))]
    );
    assert_eq!(h.value("x"), Some(3.0));
}

#[test]
fn test_requests_do_not_trigger_transitions() {
    let mut h = harness();
    h.start();
    h.run_until(3.0);
    // x only runs its own internal events, never an external one
    assert!(h
        .dispatches("x")
        .iter()
        .all(|d| d.transition == Transition::Internal));
    assert!(h
        .dispatches("q")
        .iter()
        .all(|d| d.transition == Transition::Confluent(EventKind::External)));
}
