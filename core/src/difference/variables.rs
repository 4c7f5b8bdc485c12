use super::history::History;
use crate::error::ComputeError;
use crate::time::Time;

/// What a model knows about one variable it reads.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub(crate) name: String,
    /// Update period of the dependency in units of its delta, 0 while unknown.
    pub(crate) multiple: u32,
    /// Its multiple has been learned from an update.
    pub(crate) registered: bool,
    /// Counts towards the reports awaited at a period boundary.
    pub(crate) synchronous: bool,
    /// Reported during the current period.
    pub(crate) received: bool,
    pub(crate) values: History<(Time, f64)>,
}

impl Dependency {
    fn new(name: &str, bound: Option<usize>) -> Self {
        Self {
            name: name.to_string(),
            multiple: 0,
            registered: false,
            synchronous: false,
            received: false,
            values: History::new(bound),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn multiple(&self) -> u32 {
        self.multiple
    }

    pub fn is_synchronous(&self) -> bool {
        self.synchronous
    }

    pub fn values(&self) -> &History<(Time, f64)> {
        &self.values
    }
}

/// Two periods are synchronous when one divides the other.
pub fn synchronous(a: u32, b: u32) -> bool {
    a != 0 && b != 0 && (a % b == 0 || b % a == 0)
}

/// The values an equation can read: its own past values and the recent
/// values of its dependencies, in declaration order.
#[derive(Debug, Clone)]
pub struct Variables {
    model: String,
    name: String,
    own: History<f64>,
    dependencies: Vec<Dependency>,
    bound: Option<usize>,
}

impl Variables {
    pub(crate) fn new(model: &str, name: &str, bound: Option<usize>) -> Self {
        Self {
            model: model.to_string(),
            name: name.to_string(),
            own: History::new(bound),
            dependencies: Vec::new(),
            bound,
        }
    }

    /// Name of the variable the model computes.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Own value `-shift` steps back; `value(0)` is the latest.
    pub fn value(&self, shift: i32) -> Result<f64, ComputeError> {
        let depth = self.depth(shift)?;
        self.own
            .get(depth)
            .copied()
            .ok_or_else(|| self.too_large(&self.name, shift, self.own.len()))
    }

    pub fn dependency_value(&self, name: &str, shift: i32) -> Result<f64, ComputeError> {
        self.dependency_sample(name, shift).map(|(_, value)| value)
    }

    /// Like [`Variables::dependency_value`], with the time the value arrived.
    pub fn dependency_sample(&self, name: &str, shift: i32) -> Result<(Time, f64), ComputeError> {
        let depth = self.depth(shift)?;
        let dep = self.dependency(name).ok_or_else(|| ComputeError::UnknownVariable {
            model: self.model.clone(),
            variable: name.to_string(),
        })?;
        dep.values
            .get(depth)
            .copied()
            .ok_or_else(|| self.too_large(name, shift, dep.values.len()))
    }

    /// Latest value of each dependency, `None` if nothing arrived yet.
    pub fn dependencies(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.dependencies
            .iter()
            .map(|d| (d.name.as_str(), d.values.latest().map(|&(_, v)| v)))
    }

    pub fn dependencies_iter(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.iter()
    }

    pub fn dependency(&self, name: &str) -> Option<&Dependency> {
        self.dependencies.iter().find(|d| d.name == name)
    }

    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependency(name).is_some()
    }

    pub fn history(&self) -> &History<f64> {
        &self.own
    }

    pub(crate) fn dependency_mut(&mut self, name: &str) -> Option<&mut Dependency> {
        self.dependencies.iter_mut().find(|d| d.name == name)
    }

    pub(crate) fn dependencies_mut(&mut self) -> impl Iterator<Item = &mut Dependency> {
        self.dependencies.iter_mut()
    }

    pub(crate) fn ensure_dependency(&mut self, name: &str) -> &mut Dependency {
        let index = match self.dependencies.iter().position(|d| d.name == name) {
            Some(index) => index,
            None => {
                self.dependencies.push(Dependency::new(name, self.bound));
                self.dependencies.len() - 1
            }
        };
        &mut self.dependencies[index]
    }

    pub(crate) fn remove_dependency(&mut self, name: &str) -> Option<Dependency> {
        let index = self.dependencies.iter().position(|d| d.name == name)?;
        Some(self.dependencies.remove(index))
    }

    pub(crate) fn push(&mut self, value: f64) {
        self.own.push(value);
    }

    #[cfg(test)]
    pub(crate) fn push_dependency(&mut self, name: &str, time: Time, value: f64) {
        self.ensure_dependency(name).values.push((time, value));
    }

    fn depth(&self, shift: i32) -> Result<usize, ComputeError> {
        if shift > 0 {
            return Err(ComputeError::PositiveShift {
                model: self.model.clone(),
                shift,
            });
        }
        Ok(shift.unsigned_abs() as usize)
    }

    fn too_large(&self, variable: &str, shift: i32, depth: usize) -> ComputeError {
        ComputeError::ShiftTooLarge {
            model: self.model.clone(),
            variable: variable.to_string(),
            shift,
            depth,
        }
    }
}
