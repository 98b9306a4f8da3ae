use std::fmt;
use std::mem;
use std::rc::Rc;

use crate::runtime::value::Value;
use crate::stack::ensure_sufficient_stack;

/// Source location attached to every node for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

// ─── Statements ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum Stmt {
    /// A bare expression, optionally followed by `;`.
    Expression(Expr),
    /// `{ stmt* }`
    Block(Vec<Stmt>, Span),
    /// `function name(a, b) { ... }`. Shared with the function values it creates.
    Function(Rc<FnDecl>),
    /// `return expr` or bare `return`
    Return(Option<Expr>, Span),
}

#[derive(Debug)]
pub struct FnDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

// ─── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum Expr {
    Literal(Value, Span),
    Variable(String, Span),

    /// `a + b`
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        span: Span,
    },

    /// `name = value`
    Assign {
        name: String,
        value: Box<Expr>,
        span: Span,
    },

    /// `callee(args)`; a `Get` callee on a native object is a method call.
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },

    /// `object.name`
    Get {
        object: Box<Expr>,
        name: String,
        span: Span,
    },

    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: String,
        value: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(_, s) => *s,
            Expr::Variable(_, s) => *s,
            Expr::Binary { span, .. } => *span,
            Expr::Assign { span, .. } => *span,
            Expr::Call { span, .. } => *span,
            Expr::Get { span, .. } => *span,
            Expr::Set { span, .. } => *span,
        }
    }

    /// Leaf left behind when a child is moved out of its parent.
    pub(crate) fn hole() -> Expr {
        Expr::Literal(Value::Null, Span::new(0, 0))
    }
}

// ─── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

// ─── Teardown ────────────────────────────────────────────────────────────────
//
// Dropping a tree must not recurse once per level. Children are detached
// onto a worklist and released one at a time.

impl Expr {
    fn detach_children(&mut self, out: &mut Vec<Expr>) {
        match self {
            Expr::Literal(..) | Expr::Variable(..) => {}
            Expr::Binary { left, right, .. } => {
                out.push(mem::replace(&mut **left, Expr::hole()));
                out.push(mem::replace(&mut **right, Expr::hole()));
            }
            Expr::Assign { value, .. } => out.push(mem::replace(&mut **value, Expr::hole())),
            Expr::Call { callee, args, .. } => {
                out.push(mem::replace(&mut **callee, Expr::hole()));
                out.append(args);
            }
            Expr::Get { object, .. } => out.push(mem::replace(&mut **object, Expr::hole())),
            Expr::Set { object, value, .. } => {
                out.push(mem::replace(&mut **object, Expr::hole()));
                out.push(mem::replace(&mut **value, Expr::hole()));
            }
        }
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut expr) = pending.pop() {
            expr.detach_children(&mut pending);
        }
    }
}

impl Stmt {
    fn detach_children(&mut self, out: &mut Vec<Stmt>) {
        match self {
            Stmt::Block(stmts, _) => out.append(stmts),
            // a body still shared with a live function value stays put
            Stmt::Function(decl) => {
                if let Some(decl) = Rc::get_mut(decl) {
                    out.append(&mut decl.body);
                }
            }
            Stmt::Expression(_) | Stmt::Return(..) => {}
        }
    }
}

impl Drop for Stmt {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut stmt) = pending.pop() {
            stmt.detach_children(&mut pending);
        }
    }
}

// ─── Printing ────────────────────────────────────────────────────────────────

fn comma_separated<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 { f.write_str(", ")?; }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn block(f: &mut fmt::Formatter<'_>, stmts: &[Stmt]) -> fmt::Result {
    f.write_str("{")?;
    for s in stmts {
        write!(f, " {s}")?;
    }
    f.write_str(" }")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ensure_sufficient_stack(|| match self {
            Expr::Literal(v, _) => write!(f, "{v}"),
            Expr::Variable(name, _) => f.write_str(name),
            Expr::Binary { left, op, right, .. } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Assign { name, value, .. } => write!(f, "{name} = {value}"),
            Expr::Call { callee, args, .. } => {
                write!(f, "{callee}(")?;
                comma_separated(f, args)?;
                f.write_str(")")
            }
            Expr::Get { object, name, .. } => write!(f, "{object}.{name}"),
            Expr::Set { object, name, value, .. } => write!(f, "{object}.{name} = {value}"),
        })
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ensure_sufficient_stack(|| match self {
            Stmt::Expression(e) => write!(f, "{e};"),
            Stmt::Block(stmts, _) => block(f, stmts),
            Stmt::Function(decl) => {
                write!(f, "function {}(", decl.name)?;
                comma_separated(f, &decl.params)?;
                f.write_str(") ")?;
                block(f, &decl.body)
            }
            Stmt::Return(Some(e), _) => write!(f, "return {e};"),
            Stmt::Return(None, _) => f.write_str("return;"),
        })
    }
}
