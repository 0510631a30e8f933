// ABOUTME: Flow-wide variable store shared by every task of one execution
// ABOUTME: Insertion-ordered, owned by a single engine, exposed through snapshot and set only

use indexmap::IndexMap;
use serde_json::Value;

use crate::condition::VariableLookup;

/// Loop counter written by `while`, seeded to zero on every reset.
pub const COUNTER_VAR: &str = "count";
/// Current position written by `foreach`.
pub const INDEX_VAR: &str = "index";
/// Last message caught by `try`.
pub const ERROR_VAR: &str = "error";
/// Local-only binding for the current `while` iteration.
pub const ITERATION_VAR: &str = "iteration";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
    vars: IndexMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every variable and reseed the loop counter.
    pub fn reset(&mut self) {
        self.vars.clear();
        self.vars.insert(COUNTER_VAR.to_string(), Value::from(0));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn extend<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.vars.extend(values);
    }

    /// Detached copy; changing it never touches the live store.
    pub fn snapshot(&self) -> IndexMap<String, Value> {
        self.vars.clone()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl VariableLookup for VariableStore {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }
}
