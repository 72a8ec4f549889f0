//! Tree-walking evaluator.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::io::prelude::*;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::ast::{Expr, Ident, Literal, Stmt};
use crate::diag;
use crate::token::{Token, TokenKind};

/// A runtime value.
///
/// The `Object` kind is reserved and never produced in this version.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Callable(Callable),
    Object,
}

#[derive(Debug, Clone)]
pub enum Callable {
    User(Rc<Function>),
    Native(Native),
}

pub struct Function {
    name: String,
    params: Vec<Ident>,
    body: Stmt,
}

/// Host functions take the evaluated arguments and report failures as bare
/// messages; the evaluator attaches the call site.
pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

#[derive(Clone, Copy)]
pub struct Native {
    name: &'static str,
    call: NativeFn,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.params.len())
            .finish()
    }
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Native").field("name", &self.name).finish()
    }
}

impl Value {
    /// `nil` and `false` are falsy; every other value is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Callable(_) => "callable",
            Value::Object => "object",
        }
    }
}

impl PartialEq for Value {
    /// Language equality: same-kind comparison only.  Values of different
    /// kinds are never equal; the reserved object kind is unequal to
    /// everything, itself included.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Number(l), Value::Number(r)) => l == r,
            (Value::Str(l), Value::Str(r)) => l == r,
            (Value::Callable(l), Value::Callable(r)) => l.same_identity(r),
            _ => false,
        }
    }
}

impl Callable {
    /// Equal only when both values came from the same declaration or the
    /// same builtin registration.
    fn same_identity(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::User(l), Callable::User(r)) => Rc::ptr_eq(l, r),
            (Callable::Native(l), Callable::Native(r)) => l.call as usize == r.call as usize,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Callable(_) => write!(f, "[callable]"),
            Value::Object => write!(f, "[object]"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("{message}")]
    Eval { message: String, token: Token },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RuntimeError {
    /// Render for the driver: `<file>:<line> runtime error: <message>`.
    pub fn render(&self, file: &str, source: &str) -> String {
        match self {
            RuntimeError::Eval { message, token } => {
                let (line, _) = diag::position(source, token.start);
                format!("{}:{} runtime error: {}", file, line, message)
            }
            RuntimeError::Io(e) => format!("{} runtime error: {}", file, e),
        }
    }
}

fn eval_error(token: Token, message: impl Into<String>) -> RuntimeError {
    RuntimeError::Eval {
        message: message.into(),
        token,
    }
}

/// How a statement finished: normal completion, or non-local control that
/// threads up the evaluation stack until a loop or call consumes it.
/// Misplaced `break`/`continue`/`return` cannot reach the top level; the
/// parser rejects them.
#[derive(Debug)]
pub enum ControlFlow {
    Normal(Value),
    Break,
    Continue,
    Return(Value),
}

/// One lexical scope: a frame of bindings chained to its parent.
#[derive(Debug)]
pub struct Env {
    parent: Option<Rc<Env>>,
    bindings: RefCell<HashMap<String, Value>>,
}

impl Env {
    /// The global environment, with the builtins bound.
    pub(crate) fn global() -> Rc<Env> {
        let env = Env::with_parent(None);
        env.add_builtin("clock", native_clock);
        env
    }

    fn with_parent(parent: Option<Rc<Env>>) -> Rc<Env> {
        Rc::new(Env {
            parent,
            bindings: RefCell::new(HashMap::new()),
        })
    }

    /// Bind in this frame, overwriting any previous binding of the name.
    fn define(&self, name: &str, value: Value) {
        self.bindings.borrow_mut().insert(name.to_string(), value);
    }

    /// Write into the nearest frame that binds the name.
    fn assign(&self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.bindings.borrow_mut().get_mut(name) {
            *slot = value;
            return true;
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }

    /// Look the name up from the innermost frame outward.
    fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }

    fn is_bound(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
            || self.parent.as_ref().is_some_and(|p| p.is_bound(name))
    }

    /// Register a host function in this frame.
    pub(crate) fn add_builtin(&self, name: &'static str, call: NativeFn) {
        self.define(name, Value::Callable(Callable::Native(Native { name, call })));
    }
}

/// Walks an AST, writing `print` output to the given sink.
#[derive(Debug)]
pub struct Evaluator<'t, W: Write> {
    output: &'t mut W,
    globals: Rc<Env>,
}

impl<'t, W: Write> Evaluator<'t, W> {
    pub fn new(output: &'t mut W, globals: Rc<Env>) -> Evaluator<'t, W> {
        Evaluator { output, globals }
    }

    pub fn eval_program(&mut self, program: &[Stmt]) -> Result<(), RuntimeError> {
        debug!(statements = program.len(), "evaluating program");
        let globals = self.globals.clone();
        for stmt in program {
            let flow = self.eval_stmt(stmt, &globals)?;
            debug_assert!(matches!(flow, ControlFlow::Normal(_)));
        }
        Ok(())
    }

    fn eval_stmt(&mut self, stmt: &Stmt, env: &Rc<Env>) -> Result<ControlFlow, RuntimeError> {
        match stmt {
            Stmt::Expr(e) => {
                self.eval_expr(e, env)?;
                Ok(ControlFlow::Normal(Value::Nil))
            }
            Stmt::Print(e) => {
                let value = self.eval_expr(e, env)?;
                writeln!(self.output, "{}", value)?;
                Ok(ControlFlow::Normal(Value::Nil))
            }
            Stmt::VarDecl(name, init) => {
                let value = match init {
                    Some(e) => self.eval_expr(e, env)?,
                    None => Value::Nil,
                };
                env.define(&name.name, value);
                Ok(ControlFlow::Normal(Value::Nil))
            }
            Stmt::FunDecl(name, params, body) => {
                let function = Function {
                    name: name.name.clone(),
                    params: params.clone(),
                    body: (**body).clone(),
                };
                env.define(
                    &name.name,
                    Value::Callable(Callable::User(Rc::new(function))),
                );
                Ok(ControlFlow::Normal(Value::Nil))
            }
            Stmt::Block(stmts) => {
                let frame = Env::with_parent(Some(env.clone()));
                for stmt in stmts {
                    match self.eval_stmt(stmt, &frame)? {
                        ControlFlow::Normal(_) => (),
                        flow => return Ok(flow),
                    }
                }
                Ok(ControlFlow::Normal(Value::Nil))
            }
            Stmt::If(cond, then_branch, else_branch) => {
                if self.eval_expr(cond, env)?.is_truthy() {
                    self.eval_stmt(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.eval_stmt(else_branch, env)
                } else {
                    Ok(ControlFlow::Normal(Value::Nil))
                }
            }
            Stmt::For {
                init,
                cond,
                incr,
                body,
            } => {
                if let Some(init) = init {
                    match self.eval_stmt(init, env)? {
                        ControlFlow::Normal(_) => (),
                        flow => return Ok(flow),
                    }
                }
                loop {
                    let go = match cond {
                        Some(c) => self.eval_expr(c, env)?.is_truthy(),
                        None => true,
                    };
                    if !go {
                        break;
                    }
                    match self.eval_stmt(body, env)? {
                        ControlFlow::Break => break,
                        flow @ ControlFlow::Return(_) => return Ok(flow),
                        ControlFlow::Normal(_) | ControlFlow::Continue => (),
                    }
                    // The increment runs after normal completion and after
                    // `continue`.
                    if let Some(incr) = incr {
                        self.eval_expr(incr, env)?;
                    }
                }
                Ok(ControlFlow::Normal(Value::Nil))
            }
            Stmt::Break => Ok(ControlFlow::Break),
            Stmt::Continue => Ok(ControlFlow::Continue),
            Stmt::Return(value) => {
                let value = match value {
                    Some(e) => self.eval_expr(e, env)?,
                    None => Value::Nil,
                };
                Ok(ControlFlow::Return(value))
            }
        }
    }

    fn eval_expr(&mut self, expr: &Expr, env: &Rc<Env>) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                Literal::Nil => Value::Nil,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::Str(s) => Value::Str(Rc::from(s.as_str())),
            }),
            Expr::Grouping(inner) => self.eval_expr(inner, env),
            Expr::Unary(op, operand) => {
                let value = self.eval_expr(operand, env)?;
                match op.kind {
                    TokenKind::Bang => Ok(Value::Bool(!value.is_truthy())),
                    _ => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        v => Err(eval_error(
                            *op,
                            format!(
                                "Operand of unary \"-\" must be a number, but got {}.",
                                v.type_name()
                            ),
                        )),
                    },
                }
            }
            Expr::Binary(lhs, op, rhs) => {
                let left = self.eval_expr(lhs, env)?;
                let right = self.eval_expr(rhs, env)?;
                eval_binary(left, *op, right)
            }
            Expr::LogicOr(lhs, rhs) => {
                if self.eval_expr(lhs, env)?.is_truthy() {
                    Ok(Value::Bool(true))
                } else {
                    Ok(Value::Bool(self.eval_expr(rhs, env)?.is_truthy()))
                }
            }
            Expr::LogicAnd(lhs, rhs) => {
                if !self.eval_expr(lhs, env)?.is_truthy() {
                    Ok(Value::Bool(false))
                } else {
                    Ok(Value::Bool(self.eval_expr(rhs, env)?.is_truthy()))
                }
            }
            Expr::Identifier(name) => env.get(&name.name).ok_or_else(|| {
                eval_error(
                    name.token,
                    format!("Undefined variable \"{}\".", name.name),
                )
            }),
            Expr::Assignment(name, rhs) => {
                // The right side only runs when the target is bound.
                if !env.is_bound(&name.name) {
                    return Err(eval_error(
                        name.token,
                        format!("Undefined variable \"{}\".", name.name),
                    ));
                }
                let value = self.eval_expr(rhs, env)?;
                let assigned = env.assign(&name.name, value.clone());
                debug_assert!(assigned);
                Ok(value)
            }
            Expr::Call(paren, callee, args) => {
                let callee = self.eval_expr(callee, env)?;
                let callable = match callee {
                    Value::Callable(c) => c,
                    v => {
                        return Err(eval_error(
                            *paren,
                            format!("Value of type {} is not callable.", v.type_name()),
                        ))
                    }
                };
                match callable {
                    Callable::User(function) => self.call_function(&function, *paren, args, env),
                    Callable::Native(native) => {
                        let mut values = Vec::with_capacity(args.len());
                        for arg in args {
                            values.push(self.eval_expr(arg, env)?);
                        }
                        (native.call)(&values).map_err(|message| eval_error(*paren, message))
                    }
                }
            }
        }
    }

    fn call_function(
        &mut self,
        function: &Function,
        paren: Token,
        args: &[Expr],
        env: &Rc<Env>,
    ) -> Result<Value, RuntimeError> {
        if args.len() != function.params.len() {
            return Err(eval_error(
                paren,
                format!(
                    "Expected {} argument(s) to call function \"{}\". {} argument(s) given.",
                    function.params.len(),
                    function.name,
                    args.len()
                ),
            ));
        }
        debug!(function = function.name.as_str(), "calling function");
        // The frame chains onto the caller's environment: functions do not
        // capture their declaration site.
        let frame = Env::with_parent(Some(env.clone()));
        for (param, arg) in function.params.iter().zip(args) {
            let value = self.eval_expr(arg, env)?;
            frame.define(&param.name, value);
        }
        let flow = self.eval_stmt(&function.body, &frame)?;
        Ok(match flow {
            ControlFlow::Return(value) => value,
            // Falling off the end of a function returns nil.
            _ => Value::Nil,
        })
    }
}

fn eval_binary(left: Value, op: Token, right: Value) -> Result<Value, RuntimeError> {
    match op.kind {
        TokenKind::Plus => match (left, right) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
            (Value::Str(l), Value::Str(r)) => {
                let mut s = String::with_capacity(l.len() + r.len());
                s.push_str(&l);
                s.push_str(&r);
                Ok(Value::Str(Rc::from(s)))
            }
            (l @ (Value::Number(_) | Value::Str(_)), r) => Err(eval_error(
                op,
                format!(
                    "Right operand of \"+\" must be a {}, but got {}.",
                    l.type_name(),
                    r.type_name()
                ),
            )),
            (l, _) => Err(eval_error(
                op,
                format!(
                    "Left operand of \"+\" must be a number or a string, but got {}.",
                    l.type_name()
                ),
            )),
        },
        TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
        TokenKind::BangEqual => Ok(Value::Bool(left != right)),
        _ => {
            let (l, r) = match (&left, &right) {
                (Value::Number(l), Value::Number(r)) => (*l, *r),
                (Value::Number(_), r) => {
                    return Err(eval_error(
                        op,
                        format!(
                            "Right operand of \"{}\" must be a number, but got {}.",
                            op.kind,
                            r.type_name()
                        ),
                    ))
                }
                (l, _) => {
                    return Err(eval_error(
                        op,
                        format!(
                            "Left operand of \"{}\" must be a number, but got {}.",
                            op.kind,
                            l.type_name()
                        ),
                    ))
                }
            };
            Ok(match op.kind {
                TokenKind::Minus => Value::Number(l - r),
                TokenKind::Star => Value::Number(l * r),
                TokenKind::Slash => Value::Number(l / r),
                TokenKind::Greater => Value::Bool(l > r),
                TokenKind::GreaterEqual => Value::Bool(l >= r),
                TokenKind::Less => Value::Bool(l < r),
                _ => Value::Bool(l <= r),
            })
        }
    }
}

/// Seconds since the Unix epoch, as a number.  Arguments are ignored: arity
/// of host functions is not checked.
/// TODO: enforce arity for host functions once one with parameters exists.
fn native_clock(_args: &[Value]) -> Result<Value, String> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| Value::Number(d.as_secs_f64()))
        .map_err(|e| e.to_string())
}
