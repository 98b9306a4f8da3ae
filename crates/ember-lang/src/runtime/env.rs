//! Chained lexical scopes.
//!
//! Every block and every call gets its own `Environment` whose parent is the
//! enclosing scope (for calls: the callee's closure, not the caller). Scopes
//! are shared through `Env` because closures keep their declaring scope
//! alive after it has been exited.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::runtime::value::{Function, Value};

pub type Env = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    parent: Option<Env>,
}

impl Environment {
    /// A root scope with no parent.
    pub fn global() -> Env {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn child(parent: &Env) -> Env {
        Rc::new(RefCell::new(Self { values: HashMap::new(), parent: Some(Rc::clone(parent)) }))
    }

    /// Bind in this scope, shadowing any outer binding. Rebinding overwrites.
    pub fn define(&mut self, name: &str, val: Value) {
        self.values.insert(name.to_string(), val);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.values.get(name) {
            return Some(v.clone());
        }
        self.parent.as_ref()?.borrow().get(name)
    }

    /// Overwrite the nearest existing binding. Returns `false` when no scope
    /// in the chain defines `name`.
    pub fn assign(&mut self, name: &str, val: Value) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = val;
            return true;
        }
        match &self.parent {
            Some(parent) => parent.borrow_mut().assign(name, val),
            None => false,
        }
    }

    /// Bindings of this scope only, sorted by name.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        let mut out: Vec<_> = self.values.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// True when the only references to `env` left are the functions
    /// declared in it, each bound nowhere else. Such a frame can never be
    /// entered again.
    pub fn is_unreachable(env: &Env) -> bool {
        let frame = env.borrow();
        let mut cycles = 0;
        for value in frame.values.values() {
            let Value::Function(function) = value else { continue };
            let Function::Script { closure, .. } = function.as_ref() else { continue };
            if !Rc::ptr_eq(closure, env) {
                continue;
            }
            if Rc::strong_count(function) > 1 {
                return false;
            }
            cycles += 1;
        }
        Rc::strong_count(env) == 1 + cycles
    }

    /// Drop every binding. Used on teardown to break closure cycles.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outward() {
        let global = Environment::global();
        global.borrow_mut().define("x", Value::Int(1));
        let inner = Environment::child(&Environment::child(&global));
        assert_eq!(inner.borrow().get("x"), Some(Value::Int(1)));
        assert_eq!(inner.borrow().get("y"), None);
    }

    #[test]
    fn define_shadows_without_touching_parent() {
        let global = Environment::global();
        global.borrow_mut().define("x", Value::Int(1));
        let inner = Environment::child(&global);
        inner.borrow_mut().define("x", Value::Int(2));
        assert_eq!(inner.borrow().get("x"), Some(Value::Int(2)));
        assert_eq!(global.borrow().get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn assign_updates_nearest_definition() {
        let global = Environment::global();
        global.borrow_mut().define("x", Value::Int(1));
        let inner = Environment::child(&global);
        assert!(inner.borrow_mut().assign("x", Value::Int(5)));
        assert_eq!(global.borrow().get("x"), Some(Value::Int(5)));
        assert!(inner.borrow().bindings().is_empty());
    }

    #[test]
    fn assign_to_unbound_name_fails_at_root() {
        let global = Environment::global();
        let inner = Environment::child(&global);
        assert!(!inner.borrow_mut().assign("nope", Value::Null));
        assert_eq!(global.borrow().get("nope"), None);
    }

    #[test]
    fn frame_reachable_only_through_own_functions() {
        use crate::syntax::ast::{FnDecl, Span};

        let global = Environment::global();
        let frame = Environment::child(&global);
        assert!(Environment::is_unreachable(&frame));

        let decl = Rc::new(FnDecl { name: "f".into(), params: Vec::new(), body: Vec::new(), span: Span::new(1, 1) });
        let f = Rc::new(Function::Script { decl, closure: Rc::clone(&frame) });
        frame.borrow_mut().define("f", Value::Function(Rc::clone(&f)));
        assert!(!Environment::is_unreachable(&frame), "f is still held here");

        drop(f);
        assert!(Environment::is_unreachable(&frame));

        let child = Environment::child(&frame);
        assert!(!Environment::is_unreachable(&frame));
        drop(child);
        frame.borrow_mut().clear();
    }

    #[test]
    fn bindings_are_sorted() {
        let env = Environment::global();
        env.borrow_mut().define("b", Value::Int(2));
        env.borrow_mut().define("a", Value::Int(1));
        let names: Vec<_> = env.borrow().bindings().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
