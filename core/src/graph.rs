use crate::error::{SimError, SimResult};
use crate::observer::View;
use crate::value::{Attributes, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelNode {
    Atomic(AtomicModel),
    Coupled(CoupledModel),
}

impl ModelNode {
    pub fn name(&self) -> &str {
        match self {
            ModelNode::Atomic(m) => &m.name,
            ModelNode::Coupled(m) => &m.name,
        }
    }

    fn inputs(&self) -> &[String] {
        match self {
            ModelNode::Atomic(m) => &m.inputs,
            ModelNode::Coupled(m) => &m.inputs,
        }
    }

    fn outputs(&self) -> &[String] {
        match self {
            ModelNode::Atomic(m) => &m.outputs,
            ModelNode::Coupled(m) => &m.outputs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicModel {
    pub name: String,
    pub dynamics: String,
    #[serde(default)]
    pub conditions: Attributes,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl AtomicModel {
    pub fn new(name: &str, dynamics: &str) -> Self {
        Self {
            name: name.to_string(),
            dynamics: dynamics.to_string(),
            conditions: Attributes::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn input(mut self, port: &str) -> Self {
        self.inputs.push(port.to_string());
        self
    }

    pub fn output(mut self, port: &str) -> Self {
        self.outputs.push(port.to_string());
        self
    }

    pub fn condition(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.conditions.insert(key, value);
        self
    }
}

impl From<AtomicModel> for ModelNode {
    fn from(model: AtomicModel) -> Self {
        ModelNode::Atomic(model)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoupledModel {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub children: Vec<ModelNode>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl CoupledModel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            children: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn input(mut self, port: &str) -> Self {
        self.inputs.push(port.to_string());
        self
    }

    pub fn output(mut self, port: &str) -> Self {
        self.outputs.push(port.to_string());
        self
    }

    pub fn child(mut self, node: impl Into<ModelNode>) -> Self {
        self.children.push(node.into());
        self
    }

    /// Child output port to child input port.
    pub fn connect(mut self, from: &str, from_port: &str, to: &str, to_port: &str) -> Self {
        self.connections.push(Connection {
            from: Endpoint::child(from, from_port),
            to: Endpoint::child(to, to_port),
        });
        self
    }

    /// Own input port to child input port.
    pub fn connect_input(mut self, port: &str, to: &str, to_port: &str) -> Self {
        self.connections.push(Connection {
            from: Endpoint::boundary(port),
            to: Endpoint::child(to, to_port),
        });
        self
    }

    /// Child output port to own output port.
    pub fn connect_output(mut self, from: &str, from_port: &str, port: &str) -> Self {
        self.connections.push(Connection {
            from: Endpoint::child(from, from_port),
            to: Endpoint::boundary(port),
        });
        self
    }
}

impl From<CoupledModel> for ModelNode {
    fn from(model: CoupledModel) -> Self {
        ModelNode::Coupled(model)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: Endpoint,
    pub to: Endpoint,
}

/// `model: None` designates a port of the enclosing coupled model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub model: Option<String>,
    pub port: String,
}

impl Endpoint {
    pub fn child(model: &str, port: &str) -> Self {
        Self {
            model: Some(model.to_string()),
            port: port.to_string(),
        }
    }

    pub fn boundary(port: &str) -> Self {
        Self {
            model: None,
            port: port.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelGraph {
    pub root: ModelNode,
    #[serde(default)]
    pub views: Vec<View>,
}

impl ModelGraph {
    pub fn new(root: impl Into<ModelNode>) -> Self {
        Self {
            root: root.into(),
            views: Vec::new(),
        }
    }

    pub fn view(mut self, view: View) -> Self {
        self.views.push(view);
        self
    }

    pub fn from_json(json: &str) -> SimResult<Self> {
        serde_json::from_str(json).map_err(|e| SimError::InvalidGraph(e.to_string()))
    }

    pub fn to_json(&self) -> SimResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SimError::InvalidGraph(e.to_string()))
    }

    pub fn flatten(&self) -> SimResult<FlatGraph> {
        let mut builder = Flattener::default();
        builder.walk(&self.root, "")?;
        builder.finish()
    }
}

/// An atomic model with its full dotted path.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatModel {
    pub path: String,
    pub dynamics: String,
    pub conditions: Attributes,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

pub type PortRef = (usize, String);

#[derive(Debug, Clone, Default)]
pub struct FlatGraph {
    pub models: Vec<FlatModel>,
    /// `(source model, output port)` → destinations in connection order.
    pub routes: BTreeMap<PortRef, Vec<PortRef>>,
}

impl FlatGraph {
    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.models.iter().position(|m| m.path == path)
    }

    pub fn destinations(&self, model: usize, port: &str) -> &[PortRef] {
        self.routes
            .get(&(model, port.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Direction {
    In,
    Out,
}

type PortKey = (String, String, Direction);

#[derive(Default)]
struct Flattener {
    models: Vec<FlatModel>,
    atomics: HashMap<String, usize>,
    edges: HashMap<PortKey, Vec<PortKey>>,
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn require_port(node_path: &str, ports: &[String], port: &str, direction: &'static str) -> SimResult<()> {
    if ports.iter().any(|p| p == port) {
        Ok(())
    } else {
        Err(SimError::UnknownPort {
            model: node_path.to_string(),
            port: port.to_string(),
            direction,
        })
    }
}

impl Flattener {
    fn walk(&mut self, node: &ModelNode, prefix: &str) -> SimResult<()> {
        let path = join(prefix, node.name());
        match node {
            ModelNode::Atomic(m) => {
                self.atomics.insert(path.clone(), self.models.len());
                self.models.push(FlatModel {
                    path,
                    dynamics: m.dynamics.clone(),
                    conditions: m.conditions.clone(),
                    inputs: m.inputs.clone(),
                    outputs: m.outputs.clone(),
                });
            }
            ModelNode::Coupled(m) => {
                let mut seen = HashSet::new();
                for child in &m.children {
                    if !seen.insert(child.name()) {
                        return Err(SimError::DuplicateModel {
                            parent: path.clone(),
                            name: child.name().to_string(),
                        });
                    }
                }
                for child in &m.children {
                    self.walk(child, &path)?;
                }
                for conn in &m.connections {
                    let from = self.endpoint_key(m, &path, &conn.from, Direction::Out)?;
                    let to = self.endpoint_key(m, &path, &conn.to, Direction::In)?;
                    self.edges.entry(from).or_default().push(to);
                }
            }
        }
        Ok(())
    }

    /// `side` is the direction seen from a child: a connection leaves a
    /// child's output and enters a child's input. Boundary ports flip.
    fn endpoint_key(
        &self,
        coupled: &CoupledModel,
        path: &str,
        endpoint: &Endpoint,
        side: Direction,
    ) -> SimResult<PortKey> {
        match &endpoint.model {
            None => {
                let (ports, direction, label) = match side {
                    Direction::Out => (&coupled.inputs, Direction::In, "input"),
                    Direction::In => (&coupled.outputs, Direction::Out, "output"),
                };
                require_port(path, ports, &endpoint.port, label)?;
                Ok((path.to_string(), endpoint.port.clone(), direction))
            }
            Some(name) => {
                let child = coupled
                    .children
                    .iter()
                    .find(|c| c.name() == name)
                    .ok_or_else(|| SimError::UnknownModel {
                        parent: path.to_string(),
                        model: name.clone(),
                    })?;
                let child_path = join(path, name);
                match side {
                    Direction::Out => require_port(&child_path, child.outputs(), &endpoint.port, "output")?,
                    Direction::In => require_port(&child_path, child.inputs(), &endpoint.port, "input")?,
                }
                Ok((child_path, endpoint.port.clone(), side))
            }
        }
    }

    fn finish(self) -> SimResult<FlatGraph> {
        let mut routes = BTreeMap::new();
        for (index, model) in self.models.iter().enumerate() {
            for port in &model.outputs {
                let start = (model.path.clone(), port.clone(), Direction::Out);
                let destinations = self.reach(start);
                if !destinations.is_empty() {
                    routes.insert((index, port.clone()), destinations);
                }
            }
        }
        Ok(FlatGraph {
            models: self.models,
            routes,
        })
    }

    fn reach(&self, start: PortKey) -> Vec<PortRef> {
        let mut found: Vec<PortRef> = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(key) = stack.pop() {
            if !visited.insert(key.clone()) {
                continue;
            }
            if key.2 == Direction::In {
                if let Some(&index) = self.atomics.get(&key.0) {
                    let dest = (index, key.1.clone());
                    if !found.contains(&dest) {
                        found.push(dest);
                    }
                    continue;
                }
            }
            if let Some(next) = self.edges.get(&key) {
                // reversed so the stack pops in connection order
                stack.extend(next.iter().rev().cloned());
            }
        }
        found
    }
}
