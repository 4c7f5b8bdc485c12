#![allow(dead_code)]

use devsim_core::difference::UPDATE_PORT;
use devsim_core::*;

pub type EquationFn = fn(&Variables, Time) -> Result<f64, ComputeError>;

pub struct TestHarness {
    pub registry: DynamicsRegistry,
    pub top: CoupledModel,
    pub views: Vec<View>,
    pub config: SimulationConfig,
    pub root: Option<RootCoordinator>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            registry: DynamicsRegistry::with_builtins(),
            top: CoupledModel::new("top"),
            views: Vec::new(),
            config: SimulationConfig::default().traced(),
            root: None,
        }
    }

    /// Registers a difference equation computed by `f` under `dynamics`.
    pub fn register_equation(&mut self, dynamics: &str, f: EquationFn) {
        self.registry
            .register(dynamics, move |init: &ModelInit, conditions: &Attributes| {
                let model = DifferenceEquation::new(init, conditions, FnEquation::new(f))?;
                Ok(Box::new(model) as Box<dyn Dynamics>)
            });
    }

    pub fn add(&mut self, model: AtomicModel) {
        let top = std::mem::replace(&mut self.top, CoupledModel::new("top"));
        self.top = top.child(model);
    }

    /// A source variable `x(t) = a·x(t−1) + b` starting at `value`.
    pub fn add_linear(&mut self, name: &str, delta: f64, multiple: u32, value: f64, a: f64, b: f64) {
        self.add(
            AtomicModel::new(name, "difference/linear")
                .output(UPDATE_PORT)
                .condition("delta", delta)
                .condition("multiple", multiple)
                .condition("value", value)
                .condition("a", a)
                .condition("b", b),
        );
    }

    /// Connects the `update` ports of two models.
    pub fn connect(&mut self, from: &str, to: &str) {
        let top = std::mem::replace(&mut self.top, CoupledModel::new("top"));
        self.top = top.connect(from, UPDATE_PORT, to, UPDATE_PORT);
    }

    pub fn observe(&mut self, view: View) {
        self.views.push(view);
    }

    pub fn graph(&self) -> ModelGraph {
        let mut graph = ModelGraph::new(self.top.clone());
        graph.views = self.views.clone();
        graph
    }

    pub fn start(&mut self) {
        let mut root = RootCoordinator::new(&self.graph(), &self.registry, &self.config)
            .expect("graph should load");
        root.init();
        self.root = Some(root);
    }

    /// Processes every bag up to and including time `until`.
    pub fn run_until(&mut self, until: f64) {
        let root = self.root.as_mut().expect("harness not started");
        while root.next_time() <= Time::new(until) {
            if !root.step() {
                break;
            }
        }
    }

    pub fn root(&self) -> &RootCoordinator {
        self.root.as_ref().expect("harness not started")
    }

    /// The engine of model `name`, plain or wrapped in [`Generic`].
    pub fn engine<E: Equation>(&self, name: &str) -> &DifferenceEquation<E> {
        let dynamics = self
            .root()
            .dynamics(&format!("top.{}", name))
            .expect("unknown model");
        dynamics
            .downcast_ref::<DifferenceEquation<E>>()
            .or_else(|| dynamics.downcast_ref::<Generic<E>>().map(Generic::engine))
            .expect("model should be a difference equation")
    }

    /// Current value of the variable computed by model `name`.
    pub fn value(&self, name: &str) -> Option<f64> {
        let root = self.root();
        let request = ObservationRequest::new(name, root.current_time());
        root.dynamics(&format!("top.{}", name))?
            .observation(&request)
            .as_double()
    }

    /// Transitions dispatched to model `name`.
    pub fn dispatches(&self, name: &str) -> Vec<Dispatch> {
        let path = format!("top.{}", name);
        self.root()
            .trace()
            .iter()
            .filter(|d| d.model == path)
            .cloned()
            .collect()
    }
}
