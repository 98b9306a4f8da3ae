//! Host object bridge.
//!
//! A host value `T` is shared with scripts through an `ObjectHandle<T>`: the
//! host keeps an `Rc<RefCell<T>>` and registers named getters, setters and
//! methods. Scripts only ever see the `NativeObject` capability trait, so the
//! interpreter never needs to know `T`.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::runtime::value::Value;

// ─── Capability trait ─────────────────────────────────────────────────────────

pub trait NativeObject {
    fn type_name(&self) -> &str;
    fn get_property(&self, name: &str) -> Result<Value, RuntimeError>;
    fn set_property(&self, name: &str, value: Value) -> Result<(), RuntimeError>;
    fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, RuntimeError>;
    fn as_any(&self) -> &dyn Any;
}

// ─── Descriptor aliases ───────────────────────────────────────────────────────

/// Read a property off the host value.
pub type Getter<T> = Box<dyn Fn(&T) -> Value>;

/// Validate and store a property; an `Err` is surfaced to the script as is.
pub type Setter<T> = Box<dyn Fn(&mut T, Value) -> Result<(), RuntimeError>>;

/// Method body with pre-evaluated args. Arity and argument types are the
/// method's own business.
pub type Method<T> = Box<dyn Fn(&mut T, &[Value]) -> Result<Value, RuntimeError>>;

// ─── Handle ───────────────────────────────────────────────────────────────────

pub struct ObjectHandle<T: 'static> {
    object: Rc<RefCell<T>>,
    type_name: String,
    getters: HashMap<String, Getter<T>>,
    setters: HashMap<String, Setter<T>>,
    methods: HashMap<String, Method<T>>,
}

impl<T: 'static> ObjectHandle<T> {
    pub fn new(type_name: impl Into<String>, object: T) -> Self {
        Self::from_shared(type_name, Rc::new(RefCell::new(object)))
    }

    /// Wrap an object the host already shares elsewhere.
    pub fn from_shared(type_name: impl Into<String>, object: Rc<RefCell<T>>) -> Self {
        Self {
            object,
            type_name: type_name.into(),
            getters: HashMap::new(),
            setters: HashMap::new(),
            methods: HashMap::new(),
        }
    }

    pub fn object(&self) -> Rc<RefCell<T>> {
        Rc::clone(&self.object)
    }

    pub fn register_getter(&mut self, name: &str, getter: impl Fn(&T) -> Value + 'static) -> &mut Self {
        self.getters.insert(name.to_string(), Box::new(getter));
        self
    }

    pub fn register_setter(
        &mut self,
        name: &str,
        setter: impl Fn(&mut T, Value) -> Result<(), RuntimeError> + 'static,
    ) -> &mut Self {
        self.setters.insert(name.to_string(), Box::new(setter));
        self
    }

    pub fn register_method(
        &mut self,
        name: &str,
        method: impl Fn(&mut T, &[Value]) -> Result<Value, RuntimeError> + 'static,
    ) -> &mut Self {
        self.methods.insert(name.to_string(), Box::new(method));
        self
    }

    /// Recover the typed host object behind a script value. `None` when the
    /// value is not a handle or wraps a different `T`.
    pub fn object_of(value: &Value) -> Option<Rc<RefCell<T>>> {
        match value {
            Value::Native(obj) => obj.as_any().downcast_ref::<Self>().map(Self::object),
            _ => None,
        }
    }

    fn busy(&self) -> RuntimeError {
        RuntimeError::new(RuntimeErrorKind::Type, 0, format!("`{}` is already in use", self.type_name))
    }

    fn not_found(&self, what: &str, name: &str) -> RuntimeError {
        RuntimeError::new(RuntimeErrorKind::Type, 0, format!("{what} `{name}` not found on `{}`", self.type_name))
    }
}

impl<T: 'static> NativeObject for ObjectHandle<T> {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn get_property(&self, name: &str) -> Result<Value, RuntimeError> {
        let getter = self.getters.get(name).ok_or_else(|| self.not_found("property", name))?;
        let obj = self.object.try_borrow().map_err(|_| self.busy())?;
        Ok(getter(&obj))
    }

    fn set_property(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let setter = self.setters.get(name).ok_or_else(|| self.not_found("property", name))?;
        let mut obj = self.object.try_borrow_mut().map_err(|_| self.busy())?;
        setter(&mut obj, value)
    }

    fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let method = self.methods.get(name).ok_or_else(|| self.not_found("method", name))?;
        let mut obj = self.object.try_borrow_mut().map_err(|_| self.busy())?;
        method(&mut obj, args)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: 'static> fmt::Debug for ObjectHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("type_name", &self.type_name)
            .field("getters", &sorted_keys(&self.getters))
            .field("setters", &sorted_keys(&self.setters))
            .field("methods", &sorted_keys(&self.methods))
            .finish()
    }
}

fn sorted_keys<V>(table: &HashMap<String, V>) -> Vec<&str> {
    let mut keys: Vec<&str> = table.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        count: i64,
    }

    fn counter() -> ObjectHandle<Counter> {
        let mut h = ObjectHandle::new("Counter", Counter { count: 0 });
        h.register_getter("count", |c| Value::Int(c.count))
            .register_setter("count", |c, v| {
                c.count = i64::try_from(v).map_err(|_| RuntimeError::host("count must be an integer"))?;
                Ok(())
            })
            .register_method("bump", |c, _| {
                c.count += 1;
                Ok(Value::Int(c.count))
            });
        h
    }

    #[test]
    fn getter_and_setter_reach_host_object() {
        let h = counter();
        let shared = h.object();
        h.set_property("count", Value::Int(5)).unwrap();
        assert_eq!(shared.borrow().count, 5);
        assert_eq!(h.get_property("count").unwrap(), Value::Int(5));
    }

    #[test]
    fn setter_rejection_propagates() {
        let err = counter().set_property("count", Value::from("x")).unwrap_err();
        assert_eq!(err.message, "count must be an integer");
    }

    #[test]
    fn missing_members() {
        let h = counter();
        assert_eq!(h.get_property("nope").unwrap_err().message, "property `nope` not found on `Counter`");
        assert_eq!(h.set_property("nope", Value::Null).unwrap_err().message, "property `nope` not found on `Counter`");
        assert_eq!(h.call_method("nope", &[]).unwrap_err().message, "method `nope` not found on `Counter`");
    }

    #[test]
    fn methods_mutate() {
        let h = counter();
        assert_eq!(h.call_method("bump", &[]).unwrap(), Value::Int(1));
        assert_eq!(h.call_method("bump", &[]).unwrap(), Value::Int(2));
    }

    #[test]
    fn reentrant_borrow_is_an_error() {
        let h = counter();
        let shared = h.object();
        let _held = shared.borrow_mut();
        let err = h.get_property("count").unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::Type);
    }

    #[test]
    fn object_of_checks_concrete_type() {
        let value = Value::native(counter());
        let obj = ObjectHandle::<Counter>::object_of(&value).unwrap();
        obj.borrow_mut().count = 9;
        assert_eq!(value.to_string(), "<Counter object>");
        assert!(ObjectHandle::<String>::object_of(&value).is_none());
        assert!(ObjectHandle::<Counter>::object_of(&Value::Int(1)).is_none());
    }
}
