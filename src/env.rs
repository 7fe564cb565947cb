//! Lexically nested name-to-value scopes.

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::rc::Rc;

use crate::eval::Value;

/// One scope of variable bindings, chained to its enclosing scope.
///
/// Environments are shared: the running block holds one reference, and any
/// function value whose closure points here holds another, which is what
/// keeps captured scopes alive after the block exits.
#[derive(Debug)]
pub struct Env {
    enclosing: Option<Rc<Env>>,
    bindings: RefCell<HashMap<String, Value>>,
}

impl Env {
    /// Creates a root scope, used once per interpreter for the globals.
    pub fn new() -> Rc<Env> {
        Rc::new(Env {
            enclosing: None,
            bindings: RefCell::new(HashMap::new()),
        })
    }

    pub fn with_enclosing(enclosing: Rc<Env>) -> Rc<Env> {
        Rc::new(Env {
            enclosing: Some(enclosing),
            bindings: RefCell::new(HashMap::new()),
        })
    }

    /// Binds a new name in this scope.  Returns false when the name is
    /// already bound here; redeclaration in the same scope is rejected.
    pub fn define(&self, name: &str, value: Value) -> bool {
        match self.bindings.borrow_mut().entry(name.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Looks a name up through the scope chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.bindings.borrow().get(name) {
            Some(value) => Some(value.clone()),
            None => self.enclosing.as_ref().and_then(|parent| parent.get(name)),
        }
    }

    /// Rebinds an existing name, walking the scope chain.  Returns false
    /// when the name is bound nowhere.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        match self.bindings.borrow_mut().entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(value);
                true
            }
            Entry::Vacant(_) => match self.enclosing.as_ref() {
                Some(parent) => parent.assign(name, value),
                None => false,
            },
        }
    }

    /// Drops a binding from this scope, if present.  Used by the REPL to
    /// strip prelude functions.
    pub fn remove(&self, name: &str) {
        self.bindings.borrow_mut().remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_then_get() {
        let env = Env::new();
        assert!(env.define("a", Value::Number(1.0)));
        assert_eq!(env.get("a"), Some(Value::Number(1.0)));
    }

    #[test]
    fn redefinition_in_same_scope_is_rejected() {
        let env = Env::new();
        assert!(env.define("a", Value::Number(1.0)));
        assert!(!env.define("a", Value::Number(2.0)));
        assert_eq!(env.get("a"), Some(Value::Number(1.0)));
    }

    #[test]
    fn get_walks_the_chain() {
        let root = Env::new();
        root.define("a", Value::Bool(true));
        let inner = Env::with_enclosing(root);
        assert_eq!(inner.get("a"), Some(Value::Bool(true)));
        assert_eq!(inner.get("b"), None);
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let root = Env::new();
        root.define("a", Value::Number(1.0));
        let inner = Env::with_enclosing(root.clone());
        inner.define("a", Value::Number(2.0));
        assert_eq!(inner.get("a"), Some(Value::Number(2.0)));
        assert_eq!(root.get("a"), Some(Value::Number(1.0)));
    }

    #[test]
    fn assign_updates_the_defining_scope() {
        let root = Env::new();
        root.define("a", Value::Number(1.0));
        let inner = Env::with_enclosing(root.clone());
        assert!(inner.assign("a", Value::Number(5.0)));
        assert_eq!(root.get("a"), Some(Value::Number(5.0)));
    }

    #[test]
    fn assign_to_unknown_name_fails() {
        let env = Env::new();
        assert!(!env.assign("ghost", Value::Nil));
    }

    #[test]
    fn remove_drops_only_this_scope() {
        let root = Env::new();
        root.define("put", Value::Nil);
        root.remove("put");
        assert_eq!(root.get("put"), None);
        // Removing an unknown name is a no-op.
        root.remove("put");
    }
}
