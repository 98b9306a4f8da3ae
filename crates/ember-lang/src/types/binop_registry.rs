//! Operator dispatch table: maps (BinOp, lhs type, rhs type) to an implementation.
//!
//! Supporting a new operand combination means calling `register()` here;
//! the interpreter only asks the table.

use std::collections::HashMap;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::runtime::value::Value;
use crate::syntax::ast::BinOp;

// ─── Function pointer ─────────────────────────────────────────────────────────

pub type BinopFn = fn(Value, Value, usize) -> Result<Value, RuntimeError>;

// ─── Registry ─────────────────────────────────────────────────────────────────

pub struct BinopRegistry {
    ops: HashMap<(BinOp, &'static str, &'static str), BinopFn>,
}

impl BinopRegistry {
    pub fn new() -> Self {
        Self { ops: HashMap::new() }
    }

    pub fn register(&mut self, op: BinOp, lhs: &'static str, rhs: &'static str, f: BinopFn) {
        self.ops.insert((op, lhs, rhs), f);
    }

    /// Evaluate `l op r`. Operand combinations with no entry fail with a
    /// `TypeError` naming what the operator accepts.
    pub fn eval(&self, op: BinOp, l: Value, r: Value, line: usize) -> Result<Value, RuntimeError> {
        match self.ops.get(&(op, l.type_name(), r.type_name())) {
            Some(f) => f(l, r, line),
            None => Err(mismatch(op, &l, &r, line)),
        }
    }
}

fn mismatch(op: BinOp, l: &Value, r: &Value, line: usize) -> RuntimeError {
    let expected = match op {
        BinOp::Add => "operands must be numbers or strings",
        BinOp::Sub | BinOp::Mul | BinOp::Div => "operands must be numbers",
    };
    tracing::trace!(op = op.symbol(), lhs = l.type_name(), rhs = r.type_name(), "no operator entry");
    RuntimeError::new(RuntimeErrorKind::Type, line, expected)
}

impl Default for BinopRegistry {
    fn default() -> Self {
        let mut r = Self::new();
        register_int(&mut r);
        register_double(&mut r);
        register_string(&mut r);
        r
    }
}

fn overflow(op: BinOp, line: usize) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::Overflow, line, format!("integer overflow in `{}`", op.symbol()))
}

fn division_by_zero(line: usize) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::DivisionByZero, line, "division by zero")
}

// ─── int ──────────────────────────────────────────────────────────────────────

fn register_int(r: &mut BinopRegistry) {
    use BinOp::*;
    r.register(Add, "int", "int", |l, r, line| {
        let (Value::Int(a), Value::Int(b)) = (l, r) else { unreachable!() };
        a.checked_add(b).map(Value::Int).ok_or_else(|| overflow(Add, line))
    });
    r.register(Sub, "int", "int", |l, r, line| {
        let (Value::Int(a), Value::Int(b)) = (l, r) else { unreachable!() };
        a.checked_sub(b).map(Value::Int).ok_or_else(|| overflow(Sub, line))
    });
    r.register(Mul, "int", "int", |l, r, line| {
        let (Value::Int(a), Value::Int(b)) = (l, r) else { unreachable!() };
        a.checked_mul(b).map(Value::Int).ok_or_else(|| overflow(Mul, line))
    });
    // Exact quotients stay integral; anything else becomes a double.
    r.register(Div, "int", "int", |l, r, line| {
        let (Value::Int(a), Value::Int(b)) = (l, r) else { unreachable!() };
        if b == 0 {
            return Err(division_by_zero(line));
        }
        match a.checked_rem(b) {
            None => Err(overflow(Div, line)),
            Some(0) => a.checked_div(b).map(Value::Int).ok_or_else(|| overflow(Div, line)),
            Some(_) => Ok(Value::Double(a as f64 / b as f64)),
        }
    });
}

// ─── double (and mixed int/double) ────────────────────────────────────────────

const PROMOTED: [(&str, &str); 3] = [("double", "double"), ("int", "double"), ("double", "int")];

fn widen(l: Value, r: Value) -> (f64, f64) {
    let (Some(a), Some(b)) = (l.as_double(), r.as_double()) else { unreachable!() };
    (a, b)
}

fn register_double(r: &mut BinopRegistry) {
    use BinOp::*;
    for (lhs, rhs) in PROMOTED {
        r.register(Add, lhs, rhs, |l, r, _| { let (a, b) = widen(l, r); Ok(Value::Double(a + b)) });
        r.register(Sub, lhs, rhs, |l, r, _| { let (a, b) = widen(l, r); Ok(Value::Double(a - b)) });
        r.register(Mul, lhs, rhs, |l, r, _| { let (a, b) = widen(l, r); Ok(Value::Double(a * b)) });
        r.register(Div, lhs, rhs, |l, r, line| {
            let (a, b) = widen(l, r);
            if b == 0.0 { Err(division_by_zero(line)) } else { Ok(Value::Double(a / b)) }
        });
    }
}

// ─── string ───────────────────────────────────────────────────────────────────

fn register_string(r: &mut BinopRegistry) {
    r.register(BinOp::Add, "string", "string", |l, r, _| {
        let (Value::Str(mut a), Value::Str(b)) = (l, r) else { unreachable!() };
        a.push_str(&b);
        Ok(Value::Str(a))
    });
}
