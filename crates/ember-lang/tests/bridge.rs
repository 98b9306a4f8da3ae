//! Host objects exposed to scripts through `ObjectHandle`.

use std::cell::RefCell;
use std::rc::Rc;

use ember_lang::{Interpreter, ObjectHandle, RuntimeError, RuntimeErrorKind, ScriptError, Value};
use pretty_assertions::assert_eq;

#[derive(Debug, Clone, PartialEq)]
struct Person {
    name: String,
    age: i64,
    hobbies: Vec<String>,
}

fn person_handle(person: Person) -> ObjectHandle<Person> {
    let mut h = ObjectHandle::new("Person", person);
    h.register_getter("name", |p| Value::from(p.name.as_str()))
        .register_getter("age", |p| Value::Int(p.age))
        .register_getter("hobbyCount", |p| Value::Int(p.hobbies.len() as i64))
        .register_setter("name", |p, v| {
            p.name = String::try_from(v).map_err(|_| RuntimeError::host("name must be a string"))?;
            Ok(())
        })
        .register_setter("age", |p, v| {
            p.age = i64::try_from(v).map_err(|_| RuntimeError::host("age must be an integer"))?;
            Ok(())
        })
        .register_method("introduce", |p, _| {
            Ok(Value::from(format!("Hi, I'm {} and I'm {} years old", p.name, p.age)))
        })
        .register_method("addHobby", |p, args| match args {
            [Value::Str(h)] => {
                p.hobbies.push(h.clone());
                Ok(Value::Null)
            }
            _ => Err(RuntimeError::host("addHobby expects one string argument")),
        })
        .register_method("celebrateBirthday", |p, _| {
            p.age += 1;
            Ok(Value::Int(p.age))
        });
    h
}

fn alice() -> Person {
    Person { name: "Alice".into(), age: 25, hobbies: Vec::new() }
}

fn setup() -> (Interpreter, Rc<RefCell<Person>>) {
    let handle = person_handle(alice());
    let shared = handle.object();
    let mut interp = Interpreter::new();
    interp.register_object("alice", handle);
    (interp, shared)
}

fn runtime_err(result: Result<Value, ScriptError>) -> RuntimeError {
    match result {
        Err(ScriptError::Runtime(e)) => e,
        other => panic!("expected runtime error, got {other:?}"),
    }
}

#[test]
fn property_reads() {
    let (mut interp, _) = setup();
    assert_eq!(interp.evaluate("alice.name").unwrap(), Value::from("Alice"));
    assert_eq!(interp.evaluate("alice.age + 1").unwrap(), Value::Int(26));
}

#[test]
fn property_writes_reach_host() {
    let (mut interp, shared) = setup();
    assert_eq!(interp.evaluate("alice.age = 26").unwrap(), Value::Int(26));
    interp.execute("alice.name = 'Alicia'").unwrap();
    assert_eq!(shared.borrow().age, 26);
    assert_eq!(shared.borrow().name, "Alicia");
}

#[test]
fn host_changes_are_visible_to_scripts() {
    let (mut interp, shared) = setup();
    shared.borrow_mut().age = 40;
    assert_eq!(interp.evaluate("alice.age").unwrap(), Value::Int(40));
}

#[test]
fn setter_rejection_propagates_unchanged() {
    let (mut interp, shared) = setup();
    let err = runtime_err(interp.execute("\nalice.age = 'old'"));
    assert_eq!(err.kind, RuntimeErrorKind::Type);
    assert_eq!(err.message, "age must be an integer");
    assert_eq!(err.line, 2);
    assert_eq!(shared.borrow().age, 25);
}

#[test]
fn method_calls() {
    let (mut interp, shared) = setup();
    assert_eq!(
        interp.evaluate("alice.introduce()").unwrap(),
        Value::from("Hi, I'm Alice and I'm 25 years old"),
    );
    interp.execute("alice.addHobby('reading'); alice.addHobby('chess');").unwrap();
    assert_eq!(interp.evaluate("alice.celebrateBirthday()").unwrap(), Value::Int(26));
    assert_eq!(interp.evaluate("alice.hobbyCount").unwrap(), Value::Int(2));
    assert_eq!(shared.borrow().hobbies, vec!["reading", "chess"]);
}

#[test]
fn method_checks_its_own_arguments() {
    let (mut interp, _) = setup();
    let err = runtime_err(interp.evaluate("alice.addHobby(1, 2)"));
    assert_eq!(err.message, "addHobby expects one string argument");
}

#[test]
fn unknown_members() {
    let (mut interp, _) = setup();
    assert_eq!(runtime_err(interp.evaluate("alice.email")).message, "property `email` not found on `Person`");
    assert_eq!(runtime_err(interp.evaluate("alice.email = 'a'")).message, "property `email` not found on `Person`");
    assert_eq!(runtime_err(interp.evaluate("alice.hobbyCount = 3")).message, "property `hobbyCount` not found on `Person`");
    assert_eq!(runtime_err(interp.evaluate("alice.dance()")).message, "method `dance` not found on `Person`");
}

#[test]
fn handles_flow_through_script_functions() {
    let (mut interp, shared) = setup();
    let src = "
        function rename(who, to) { who.name = to; return who.introduce(); }
        rename(alice, 'Al');
    ";
    assert_eq!(interp.execute(src).unwrap(), Value::from("Hi, I'm Al and I'm 25 years old"));
    assert_eq!(shared.borrow().name, "Al");
}

#[test]
fn object_of_recovers_typed_object() {
    let (mut interp, _) = setup();
    interp.execute("bob = alice").unwrap();
    let value = interp.lookup("bob").unwrap();
    let person = ObjectHandle::<Person>::object_of(&value).unwrap();
    assert_eq!(person.borrow().name, "Alice");
    assert_eq!(value.type_name(), "object");
    assert_eq!(value.to_string(), "<Person object>");
}

#[test]
fn handles_compare_by_identity() {
    let (mut interp, _) = setup();
    interp.register_object("twin", person_handle(alice()));
    interp.execute("same = alice").unwrap();
    assert_eq!(interp.lookup("same"), interp.lookup("alice"));
    assert_ne!(interp.lookup("twin"), interp.lookup("alice"));
}

#[test]
fn reentrant_host_call_is_an_error_not_a_panic() {
    let shared = Rc::new(RefCell::new(alice()));
    let mut handle = ObjectHandle::from_shared("Person", Rc::clone(&shared));
    handle.register_getter("age", |p| Value::Int(p.age));

    let mut interp = Interpreter::new();
    interp.register_object("p", handle);

    let _guard = shared.borrow_mut();
    let err = runtime_err(interp.evaluate("p.age"));
    assert_eq!(err.kind, RuntimeErrorKind::Type);
    assert_eq!(err.message, "`Person` is already in use");
}
