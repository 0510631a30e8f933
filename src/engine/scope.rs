// ABOUTME: Block-local bindings and the layered view merging them over the variable store
// ABOUTME: Local bindings are copied into nested blocks and always win over store values

use indexmap::IndexMap;
use serde_json::Value;

use super::variables::VariableStore;
use crate::condition::VariableLookup;

/// Bindings introduced by enclosing control-flow nodes.
///
/// A nested block receives its own copy, so it can never change what its
/// parent sees; only the variable store is shared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    bindings: IndexMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of this scope for a nested block
    pub fn child(&self) -> Self {
        self.clone()
    }

    pub fn bind(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.bindings.get(key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Read-only lookup: local scope first, then the variable store.
#[derive(Debug, Clone, Copy)]
pub struct LayeredScope<'a> {
    local: &'a Scope,
    global: &'a VariableStore,
}

impl<'a> LayeredScope<'a> {
    pub fn new(local: &'a Scope, global: &'a VariableStore) -> Self {
        Self { local, global }
    }
}

impl VariableLookup for LayeredScope<'_> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.local.get(name).or_else(|| self.global.lookup(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_local_binding_wins() {
        let mut store = VariableStore::new();
        store.set("x", 1);
        store.set("y", 2);
        let local = Scope::new().bind("x", 10);

        let view = LayeredScope::new(&local, &store);
        assert_eq!(view.lookup("x"), Some(&json!(10)));
        assert_eq!(view.lookup("y"), Some(&json!(2)));
        assert_eq!(view.lookup("z"), None);
    }

    #[test]
    fn test_child_scope_does_not_leak_into_parent() {
        let parent = Scope::new().bind("item", "a");
        let child = parent.child().bind("item", "b").bind("index", 1);

        assert_eq!(parent.get("item"), Some(&json!("a")));
        assert_eq!(parent.len(), 1);
        assert_eq!(child.get("item"), Some(&json!("b")));
        assert_eq!(child.len(), 2);
    }
}
