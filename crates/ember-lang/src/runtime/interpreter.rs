//! Tree-walking interpreter.
//!
//! Statements yield a `Flow`, expressions a `Value`. Scopes are chained
//! `Environment`s; the interpreter only tracks which one is current and
//! restores the previous one whenever a block or call exits, on every path.

use std::rc::Rc;

use crate::config::Config;
use crate::error::{Error, RuntimeError, RuntimeErrorKind, ScriptError};
use crate::runtime::env::{Env, Environment};
use crate::runtime::value::{Function, Value};
use crate::stack::ensure_sufficient_stack;
use crate::syntax::ast::{Expr, Stmt};
use crate::syntax::lexer::Lexer;
use crate::syntax::parser::Parser;
use crate::syntax::token::Token;
use crate::types::binop_registry::BinopRegistry;
use crate::types::object::ObjectHandle;

/// Completion of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal(Value),
    /// A `return` is unwinding towards the nearest call (or the top level).
    Return(Value),
}

// ─── Interpreter ──────────────────────────────────────────────────────────────

pub struct Interpreter {
    config: Config,
    globals: Env,
    env: Env,
    binops: BinopRegistry,
    depth: usize,
    diagnostics: Vec<Error>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let globals = Environment::global();
        Self {
            config,
            env: Rc::clone(&globals),
            globals,
            binops: BinopRegistry::default(),
            depth: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lexer warnings kept from the last `evaluate`/`execute` in lenient mode.
    pub fn diagnostics(&self) -> &[Error] {
        &self.diagnostics
    }

    // ─── Entry points ─────────────────────────────────────────────────────────

    /// Run a single statement. Empty input evaluates to `null`.
    pub fn evaluate(&mut self, source: &str) -> Result<Value, ScriptError> {
        let tokens = self.lex(source)?;
        match Parser::new(tokens).parse_one().map_err(ScriptError::Parse)? {
            Some(stmt) => Ok(self.run_statements(std::slice::from_ref(&stmt))?),
            None => Ok(Value::Null),
        }
    }

    /// Run every statement in `source`, returning the last value produced.
    pub fn execute(&mut self, source: &str) -> Result<Value, ScriptError> {
        let tokens = self.lex(source)?;
        let stmts = Parser::new(tokens).parse_all().map_err(ScriptError::Parse)?;
        Ok(self.run_statements(&stmts)?)
    }

    pub fn evaluate_to_string(&mut self, source: &str) -> Result<String, ScriptError> {
        self.evaluate(source).map(|v| v.to_string())
    }

    /// Run already-parsed statements at the top level. A top-level `return`
    /// stops execution and its value becomes the result.
    pub fn run_statements(&mut self, stmts: &[Stmt]) -> Result<Value, RuntimeError> {
        let mut last = Value::Null;
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal(v) => last = v,
                Flow::Return(v) => return Ok(v),
            }
        }
        Ok(last)
    }

    fn lex(&mut self, source: &str) -> Result<Vec<Token>, ScriptError> {
        self.diagnostics.clear();
        let mode = self.config.lex_mode;
        let (tokens, diagnostics) = Lexer::new(source).with_mode(mode).scan();
        if mode.is_fatal(&diagnostics) {
            return Err(ScriptError::Lex(diagnostics));
        }
        self.diagnostics = diagnostics;
        Ok(tokens)
    }

    // ─── Host bindings ────────────────────────────────────────────────────────

    /// Bind `name` in the global scope, replacing any previous binding.
    pub fn define(&mut self, name: &str, value: impl Into<Value>) {
        self.globals.borrow_mut().define(name, value.into());
    }

    /// Script-style assignment: updates the nearest binding, else defines a global.
    pub fn assign(&mut self, name: &str, value: impl Into<Value>) {
        self.assign_var(name, value.into());
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.env.borrow().get(name)
    }

    /// Typed lookup through the value's `TryFrom` conversion.
    pub fn get<T>(&self, name: &str) -> Result<T, RuntimeError>
    where
        T: TryFrom<Value, Error = RuntimeError>,
    {
        let value = self.lookup(name).ok_or_else(|| undefined(name, 0))?;
        T::try_from(value)
    }

    /// Expose a host closure as a global function. With `arity: None` the
    /// closure checks its own arguments.
    pub fn register_fn(
        &mut self,
        name: &str,
        arity: Option<usize>,
        func: impl Fn(&[Value]) -> Result<Value, RuntimeError> + 'static,
    ) {
        let function = Function::Native { name: name.to_string(), arity, func: Box::new(func) };
        self.define(name, Value::Function(Rc::new(function)));
    }

    pub fn register_object<T: 'static>(&mut self, name: &str, handle: ObjectHandle<T>) {
        self.define(name, Value::native(handle));
    }

    /// Global bindings sorted by name.
    pub fn globals(&self) -> Vec<(String, Value)> {
        self.globals.borrow().bindings()
    }

    // ─── Statement executor ───────────────────────────────────────────────────

    pub fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expression(expr) => Ok(Flow::Normal(self.eval_expr(expr)?)),

            Stmt::Block(stmts, _) => ensure_sufficient_stack(|| {
                let scope = Environment::child(&self.env);
                self.execute_block(stmts, scope)
            }),

            Stmt::Function(decl) => {
                let function = Function::Script { decl: Rc::clone(decl), closure: Rc::clone(&self.env) };
                self.env.borrow_mut().define(&decl.name, Value::Function(Rc::new(function)));
                Ok(Flow::Normal(Value::Null))
            }

            Stmt::Return(value, _) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    /// Run `stmts` with `scope` as the current environment, then restore the
    /// previous one regardless of how the block exits. A frame nothing else
    /// can reach is emptied so functions declared in it do not keep it alive.
    fn execute_block(&mut self, stmts: &[Stmt], scope: Env) -> Result<Flow, RuntimeError> {
        let previous = std::mem::replace(&mut self.env, scope);
        let result = self.exec_stmts(stmts);
        let scope = std::mem::replace(&mut self.env, previous);
        if Environment::is_unreachable(&scope) {
            scope.borrow_mut().clear();
        }
        result
    }

    fn exec_stmts(&mut self, stmts: &[Stmt]) -> Result<Flow, RuntimeError> {
        let mut last = Value::Null;
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal(v) => last = v,
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
        Ok(Flow::Normal(last))
    }

    // ─── Expression evaluator ─────────────────────────────────────────────────

    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        ensure_sufficient_stack(|| self.eval_inner(expr))
    }

    fn eval_inner(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(value, _) => Ok(value.clone()),

            Expr::Variable(name, span) => {
                self.env.borrow().get(name).ok_or_else(|| undefined(name, span.line))
            }

            Expr::Binary { left, op, right, span } => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                self.binops.eval(*op, l, r, span.line)
            }

            Expr::Assign { name, value, .. } => {
                let value = self.eval_expr(value)?;
                self.assign_var(name, value.clone());
                Ok(value)
            }

            Expr::Call { callee, args, span } => self.eval_call(callee, args, span.line),

            Expr::Get { object, name, span } => match self.eval_expr(object)? {
                Value::Native(obj) => obj.get_property(name).map_err(|e| e.at_line(span.line)),
                other => Err(no_members(&other, span.line)),
            },

            Expr::Set { object, name, value, span } => {
                let obj = match self.eval_expr(object)? {
                    Value::Native(obj) => obj,
                    other => return Err(no_members(&other, span.line)),
                };
                let value = self.eval_expr(value)?;
                obj.set_property(name, value.clone()).map_err(|e| e.at_line(span.line))?;
                Ok(value)
            }
        }
    }

    fn assign_var(&mut self, name: &str, value: Value) {
        let assigned = self.env.borrow_mut().assign(name, value.clone());
        if !assigned {
            tracing::debug!(name, "assignment to unbound name, defining global");
            self.globals.borrow_mut().define(name, value);
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        args.iter().map(|a| self.eval_expr(a)).collect()
    }

    // ─── Call dispatch ────────────────────────────────────────────────────────

    fn eval_call(&mut self, callee: &Expr, args: &[Expr], line: usize) -> Result<Value, RuntimeError> {
        // `obj.m(args)` on a host object is a method call, not a property read.
        if let Expr::Get { object, name, .. } = callee {
            return match self.eval_expr(object)? {
                Value::Native(obj) => {
                    let args = self.eval_args(args)?;
                    tracing::trace!(method = name.as_str(), receiver = obj.type_name(), "method call");
                    obj.call_method(name, &args).map_err(|e| e.at_line(line))
                }
                other => Err(no_members(&other, line)),
            };
        }

        let function = match self.eval_expr(callee)? {
            Value::Function(f) => f,
            _ => return Err(RuntimeError::new(RuntimeErrorKind::Type, line, "can only call functions")),
        };
        let args = self.eval_args(args)?;
        self.call_function(&function, args, line)
    }

    pub fn call_function(&mut self, function: &Rc<Function>, args: Vec<Value>, line: usize) -> Result<Value, RuntimeError> {
        if let Some(arity) = function.arity() {
            if arity != args.len() {
                return Err(RuntimeError::new(RuntimeErrorKind::Arity, line,
                    format!("expected {arity} arguments but got {}", args.len())));
            }
        }
        if self.depth >= self.config.max_call_depth {
            return Err(RuntimeError::new(RuntimeErrorKind::StackOverflow, line,
                format!("maximum call depth of {} exceeded", self.config.max_call_depth)));
        }

        tracing::trace!(name = function.name(), depth = self.depth, "call");
        self.depth += 1;
        let result = ensure_sufficient_stack(|| self.invoke(function, args, line));
        self.depth -= 1;
        result
    }

    fn invoke(&mut self, function: &Function, args: Vec<Value>, line: usize) -> Result<Value, RuntimeError> {
        match function {
            Function::Script { decl, closure } => {
                let scope = Environment::child(closure);
                {
                    let mut frame = scope.borrow_mut();
                    for (param, arg) in decl.params.iter().zip(args) {
                        frame.define(param, arg);
                    }
                }
                match self.execute_block(&decl.body, scope)? {
                    Flow::Return(v) => Ok(v),
                    Flow::Normal(_) => Ok(Value::Null),
                }
            }
            Function::Native { func, .. } => func(&args).map_err(|e| e.at_line(line)),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-level functions close over the globals that hold them; clearing the
/// globals is what lets those cycles be freed. Local frames are released
/// in `execute_block`.
impl Drop for Interpreter {
    fn drop(&mut self) {
        self.globals.borrow_mut().clear();
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn undefined(name: &str, line: usize) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::Name, line, format!("undefined variable `{name}`"))
}

fn no_members(value: &Value, line: usize) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::Type, line, format!("`{}` has no members", value.type_name()))
}
