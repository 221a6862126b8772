use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::engine::value::Value;

pub type ScopeRef = Rc<RefCell<Scope>>;

/// Outcome of assigning through the scope chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignOutcome {
    Assigned,
    Undeclared,
    Immutable,
}

#[derive(Debug, Default)]
pub struct Scope {
    parent: Option<ScopeRef>,
    bindings: IndexMap<String, Binding>,
}

impl Scope {
    pub fn global() -> ScopeRef {
        Rc::new(RefCell::new(Self {
            parent: None,
            bindings: IndexMap::new(),
        }))
    }

    pub fn nested(parent: ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Self {
            parent: Some(parent),
            bindings: IndexMap::new(),
        }))
    }

    pub fn define(&mut self, name: String, value: Value, mutable: bool) {
        self.bindings.insert(name, Binding { value, mutable });
    }

    pub fn lookup(scope: &ScopeRef, name: &str) -> Option<Value> {
        if let Some(binding) = scope.borrow().bindings.get(name) {
            return Some(binding.value.clone());
        }
        let parent = scope.borrow().parent.clone();
        parent.and_then(|parent| Scope::lookup(&parent, name))
    }

    pub(crate) fn assign(scope: &ScopeRef, name: &str, value: Value) -> AssignOutcome {
        if scope.borrow().bindings.contains_key(name) {
            let mut scope_mut = scope.borrow_mut();
            let binding = scope_mut.bindings.get_mut(name).unwrap();
            if !binding.mutable {
                return AssignOutcome::Immutable;
            }
            binding.value = value;
            return AssignOutcome::Assigned;
        }
        let parent = scope.borrow().parent.clone();
        match parent {
            Some(parent) => Scope::assign(&parent, name, value),
            None => AssignOutcome::Undeclared,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub mutable: bool,
}
