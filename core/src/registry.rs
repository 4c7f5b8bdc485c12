use crate::error::{SimError, SimResult};
use crate::traits::{Dynamics, ModelInit};
use crate::value::Attributes;
use std::collections::BTreeMap;
use std::fmt;

pub type Factory = Box<dyn Fn(&ModelInit, &Attributes) -> SimResult<Box<dyn Dynamics>>>;

pub struct DynamicsRegistry {
    factories: BTreeMap<String, Factory>,
    closed: bool,
}

impl DynamicsRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
            closed: false,
        }
    }

    /// A registry holding the builtin dynamics.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.init();
        registry
    }

    /// Installs the builtin dynamics and reopens a registry that was shut down.
    pub fn init(&mut self) {
        self.closed = false;
        crate::components::register_builtins(self);
    }

    /// Drops every factory. Later lookups fail with `RegistryClosed`.
    pub fn shutdown(&mut self) {
        log::debug!("registry shutdown ({} factories)", self.factories.len());
        self.factories.clear();
        self.closed = true;
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&ModelInit, &Attributes) -> SimResult<Box<dyn Dynamics>> + 'static,
    {
        if self.factories.insert(name.to_string(), Box::new(factory)).is_some() {
            log::warn!("dynamics '{}' registered twice, keeping the latest", name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(&self, name: &str, init: &ModelInit, conditions: &Attributes) -> SimResult<Box<dyn Dynamics>> {
        if self.closed {
            return Err(SimError::RegistryClosed);
        }
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| SimError::UnknownDynamics(name.to_string()))?;
        factory(init, conditions)
    }
}

impl Default for DynamicsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DynamicsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicsRegistry")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .field("closed", &self.closed)
            .finish()
    }
}
