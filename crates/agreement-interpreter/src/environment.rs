//! Variable scopes.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::Value;

/// A scope of variable bindings with an optional enclosing scope.
///
/// Function calls, `for` iterations and ensure checks each get a fresh child
/// scope. Plain blocks (`if`, `while`, `do`) run in the scope they appear in.
#[derive(Debug, Default, Clone)]
pub struct Environment {
    values: FxHashMap<SmolStr, Value>,
    parent: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    /// Create a new empty global environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new child environment with the given parent.
    pub fn with_parent(parent: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: FxHashMap::default(),
            parent: Some(parent),
        }
    }

    /// Bind `name` in this scope, shadowing any outer binding.
    pub fn define(&mut self, name: SmolStr, value: Value) {
        self.values.insert(name, value);
    }

    /// Look a variable up through the scope chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.values.get(name) {
            Some(value) => Some(value.clone()),
            None => self.parent.as_ref().and_then(|p| p.borrow().get(name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
            || self
                .parent
                .as_ref()
                .is_some_and(|p| p.borrow().contains(name))
    }

    /// Assign to the nearest existing binding.
    /// Returns false if no scope defines `name`.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            true
        } else if let Some(parent) = &self.parent {
            parent.borrow_mut().assign(name, value)
        } else {
            false
        }
    }

    pub fn parent(&self) -> Option<Rc<RefCell<Environment>>> {
        self.parent.clone()
    }

    /// Names bound directly in this scope, sorted.
    pub fn local_names(&self) -> Vec<SmolStr> {
        let mut names: Vec<_> = self.values.keys().cloned().collect();
        names.sort();
        names
    }
}
