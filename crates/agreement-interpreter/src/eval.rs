//! Statement execution and expression evaluation.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use agreement_ast::{
    BinaryOp, Block, Check, Expr, ExprKind, FunctionDecl, Item, Postcondition, Program, Stmt,
    StmtKind, UnaryOp,
};
use agreement_contracts::{expand_invariants, raise, ContractError, Weaver, WeaverConfig};
use agreement_lexer::Span;
use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::trace;

use crate::builtins;
use crate::environment::Environment;
use crate::value::{UserFunction, Value};
use crate::{ControlFlow, LoadError, Result, RuntimeError};

/// Outcome of executing a statement: a value, or a non-local exit.
type Exec<T> = std::result::Result<T, ControlFlow>;

// ============================================================================
// Interpreter
// ============================================================================

/// The agreement interpreter - evaluates AST nodes.
pub struct Interpreter {
    /// Global environment
    pub globals: Rc<RefCell<Environment>>,

    /// Current environment (changes with scope)
    environment: Rc<RefCell<Environment>>,

    /// Weaving configuration for contract blocks. `None` reads the
    /// process-wide toggle each time a block is defined.
    weaver: Option<WeaverConfig>,

    loop_depth: usize,
    function_depth: usize,
}

impl Interpreter {
    /// Create a new interpreter with built-in functions.
    pub fn new() -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));
        builtins::register(&mut globals.borrow_mut());

        Interpreter {
            globals: globals.clone(),
            environment: globals,
            weaver: None,
            loop_depth: 0,
            function_depth: 0,
        }
    }

    /// Weave every contract block with `config` instead of the process-wide
    /// toggle.
    pub fn with_weaver_config(mut self, config: WeaverConfig) -> Self {
        self.weaver = Some(config);
        self
    }

    /// Parse `source` and define everything it declares.
    pub fn load(&mut self, source: &str) -> std::result::Result<(), LoadError> {
        let (program, errors) = agreement_parser::parse(source);
        if !errors.is_empty() {
            return Err(LoadError::Parse(errors));
        }
        self.define_program(&program)?;
        Ok(())
    }

    /// Define the items of a parsed program in source order.
    ///
    /// A contract block is woven at this point and the instrumented
    /// function is registered under the declared name. A malformed block
    /// stops the definition; items before it stay defined.
    pub fn define_program(&mut self, program: &Program) -> std::result::Result<(), ContractError> {
        for item in &program.items {
            self.define_item(item)?;
        }
        Ok(())
    }

    /// Execute a program: define its items, then call `main` if there is one.
    pub fn run(&mut self, program: &Program) -> std::result::Result<Value, LoadError> {
        self.define_program(program)?;

        let main_fn = self.globals.borrow().get("main");
        match main_fn {
            Some(main_fn) => Ok(self.call_value(main_fn, Vec::new(), program.span)?),
            None => Ok(Value::Nil),
        }
    }

    /// Call a global function by name.
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        let func = self
            .globals
            .borrow()
            .get(name)
            .ok_or_else(|| RuntimeError::UndefinedFunction { name: name.into() })?;
        self.call_value(func, args, Span::default())
    }

    /// Evaluate a standalone expression in the global scope.
    pub fn evaluate(&mut self, source: &str) -> std::result::Result<Value, LoadError> {
        let expr =
            agreement_parser::parse_expression(source).map_err(|e| LoadError::Parse(vec![e]))?;
        Ok(self.eval_outside_function(&expr)?)
    }

    /// Look up a global binding
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name)
    }

    fn define_item(&mut self, item: &Item) -> std::result::Result<(), ContractError> {
        let func = match item {
            Item::Function(func) => expand_invariants(func)?,
            Item::Contract(block) => {
                let weaver = match self.weaver {
                    Some(config) => Weaver::new(config),
                    None => Weaver::from_global(),
                };
                agreement_contracts::instrument(block, &weaver)?
            }
        };
        let value = self.make_function(&func);
        self.globals.borrow_mut().define(func.name.node.clone(), value);
        Ok(())
    }

    fn make_function(&self, func: &FunctionDecl) -> Value {
        Value::Function(Rc::new(UserFunction {
            name: func.name.node.clone(),
            params: func.params.iter().map(|p| p.node.clone()).collect(),
            body: func.body.clone(),
            closure: self.environment.clone(),
        }))
    }

    fn eval_outside_function(&mut self, expr: &Expr) -> Result<Value> {
        match self.eval_expr(expr) {
            Ok(value) => Ok(value),
            Err(flow) => Err(self.stray_flow(flow, expr.span)),
        }
    }

    /// Turn a control-flow signal that escaped its construct into an error.
    fn stray_flow(&self, flow: ControlFlow, span: Span) -> RuntimeError {
        match flow {
            ControlFlow::Error(error) => error,
            ControlFlow::Break => RuntimeError::BreakOutsideLoop { span },
            ControlFlow::Continue => RuntimeError::ContinueOutsideLoop { span },
            ControlFlow::Return(_) => RuntimeError::ReturnOutsideFunction { span },
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call a value as a function.
    fn call_value(&mut self, func: Value, args: Vec<Value>, span: Span) -> Result<Value> {
        match func {
            Value::Function(f) => {
                if f.params.len() != args.len() {
                    return Err(RuntimeError::ArityMismatch {
                        expected: f.params.len(),
                        got: args.len(),
                        span,
                    });
                }

                let mut env = Environment::with_parent(f.closure.clone());
                for (param, arg) in f.params.iter().zip(args) {
                    env.define(param.clone(), arg);
                }

                let previous = mem::replace(&mut self.environment, Rc::new(RefCell::new(env)));
                let loop_depth = mem::replace(&mut self.loop_depth, 0);
                self.function_depth += 1;

                let outcome = self.eval_stmts(&f.body.stmts);

                self.environment = previous;
                self.loop_depth = loop_depth;
                self.function_depth -= 1;

                match outcome {
                    Ok(value) | Err(ControlFlow::Return(value)) => Ok(value),
                    Err(flow) => Err(self.stray_flow(flow, span)),
                }
            }
            Value::BuiltinFunction(f) => {
                if let Some(arity) = f.arity {
                    if args.len() != arity {
                        return Err(RuntimeError::ArityMismatch {
                            expected: arity,
                            got: args.len(),
                            span,
                        });
                    }
                }
                // Builtins report type errors without a location
                (f.func)(args).map_err(|error| match error {
                    RuntimeError::TypeError { message, .. } => {
                        RuntimeError::TypeError { message, span }
                    }
                    other => other,
                })
            }
            _ => Err(RuntimeError::NotCallable {
                value_type: func.type_name().into(),
                span,
            }),
        }
    }

    // ========================================================================
    // Contract checks
    // ========================================================================

    /// Evaluate one injected check. Conditions must produce a Bool.
    fn run_check(&mut self, check: &Check) -> Exec<()> {
        let outcome = self.eval_expr(&check.clause.condition)?;
        trace!(
            function = %check.function,
            kind = %check.kind,
            expression = %check.clause.source,
            outcome = %outcome,
            "contract check evaluated"
        );
        match outcome {
            Value::Bool(true) => Ok(()),
            Value::Bool(false) => Ok(raise(check)?),
            other => Err(RuntimeError::NonBooleanCheck {
                expression: check.clause.source.clone(),
                found: other.type_name(),
                span: check.clause.span,
            }
            .into()),
        }
    }

    /// Evaluate an exit value, bind it to the alias in a scope of its own,
    /// run the ensure checks there and hand the value back.
    fn eval_ensured(&mut self, post: &Postcondition) -> Exec<Value> {
        let value = self.eval_expr(&post.value)?;

        let mut scope = Environment::with_parent(self.environment.clone());
        scope.define(post.alias.clone(), value.clone());
        let previous = mem::replace(&mut self.environment, Rc::new(RefCell::new(scope)));

        let outcome = post
            .checks
            .iter()
            .try_for_each(|check| self.run_check(check));

        self.environment = previous;
        outcome.map(|()| value)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// Run statements in order; the value is that of the last one.
    fn eval_stmts(&mut self, stmts: &[Stmt]) -> Exec<Value> {
        let mut last_value = Value::Nil;
        for stmt in stmts {
            last_value = self.exec_stmt(stmt)?;
        }
        Ok(last_value)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Exec<Value> {
        match &stmt.kind {
            StmtKind::Expr(expr) => self.eval_expr(expr),

            StmtKind::Let { name, value } => {
                let value = self.eval_expr(value)?;
                self.environment
                    .borrow_mut()
                    .define(name.node.clone(), value);
                Ok(Value::Nil)
            }

            StmtKind::Assign { target, value } => {
                let value = self.eval_expr(value)?;
                self.assign(target, value)?;
                Ok(Value::Nil)
            }

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(condition)?.is_truthy() {
                    self.eval_stmts(&then_branch.stmts)
                } else if let Some(else_branch) = else_branch {
                    self.eval_stmts(&else_branch.stmts)
                } else {
                    Ok(Value::Nil)
                }
            }

            StmtKind::While { condition, body } => {
                self.loop_depth += 1;
                let outcome = self.exec_while(condition, body);
                self.loop_depth -= 1;
                outcome.map(|()| Value::Nil)
            }

            StmtKind::For {
                var,
                iterable,
                body,
            } => {
                let items = self.eval_expr(iterable)?;
                let items = iterate(items, iterable.span)?;
                self.loop_depth += 1;
                let outcome = self.exec_for(&var.node, items, body);
                self.loop_depth -= 1;
                outcome.map(|()| Value::Nil)
            }

            StmtKind::Return(expr) => {
                if self.function_depth == 0 {
                    return Err(RuntimeError::ReturnOutsideFunction { span: stmt.span }.into());
                }
                let value = match expr {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Nil,
                };
                Err(ControlFlow::Return(value))
            }

            StmtKind::Break => {
                if self.loop_depth == 0 {
                    return Err(RuntimeError::BreakOutsideLoop { span: stmt.span }.into());
                }
                Err(ControlFlow::Break)
            }

            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    return Err(RuntimeError::ContinueOutsideLoop { span: stmt.span }.into());
                }
                Err(ControlFlow::Continue)
            }

            StmtKind::Function(func) => {
                let value = self.make_function(func);
                self.environment
                    .borrow_mut()
                    .define(func.name.node.clone(), value);
                Ok(Value::Nil)
            }

            StmtKind::Check(check) => {
                self.run_check(check)?;
                Ok(Value::Nil)
            }

            // Annotations are expanded when their function is defined
            StmtKind::Invariant { clause, .. } => Err(RuntimeError::General {
                message: format!("unexpanded invariant annotation `{}`", clause.source),
                span: stmt.span,
            }
            .into()),
        }
    }

    fn exec_while(&mut self, condition: &Expr, body: &Block) -> Exec<()> {
        while self.eval_expr(condition)?.is_truthy() {
            if !self.exec_loop_body(body)? {
                break;
            }
        }
        Ok(())
    }

    fn exec_for(
        &mut self,
        var: &SmolStr,
        items: Box<dyn Iterator<Item = Value>>,
        body: &Block,
    ) -> Exec<()> {
        for item in items {
            let mut scope = Environment::with_parent(self.environment.clone());
            scope.define(var.clone(), item);
            let previous = mem::replace(&mut self.environment, Rc::new(RefCell::new(scope)));

            let outcome = self.exec_loop_body(body);
            self.environment = previous;

            if !outcome? {
                break;
            }
        }
        Ok(())
    }

    /// Run one iteration. `Ok(false)` means the loop was broken out of.
    fn exec_loop_body(&mut self, body: &Block) -> Exec<bool> {
        match self.eval_stmts(&body.stmts) {
            Ok(_) | Err(ControlFlow::Continue) => Ok(true),
            Err(ControlFlow::Break) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Store `value` into a variable or an element of a collection held in
    /// one. Collections are copied on write, so other holders of the old
    /// collection do not see the change.
    fn assign(&mut self, target: &Expr, value: Value) -> Exec<()> {
        match &target.kind {
            ExprKind::Ident(name) => {
                if self.environment.borrow_mut().assign(name, value) {
                    Ok(())
                } else {
                    Err(RuntimeError::UndefinedVariable {
                        name: name.clone(),
                        span: target.span,
                    }
                    .into())
                }
            }
            ExprKind::Index { object, index } => {
                let container = self.eval_expr(object)?;
                let key = self.eval_expr(index)?;
                let updated = store_index(container, key, value, target.span)?;
                self.assign(object, updated)
            }
            ExprKind::Paren(inner) => self.assign(inner, value),
            _ => Err(RuntimeError::TypeError {
                message: "invalid assignment target".into(),
                span: target.span,
            }
            .into()),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn eval_expr(&mut self, expr: &Expr) -> Exec<Value> {
        match &expr.kind {
            ExprKind::Integer(s) => {
                let n = s.parse::<i64>().map_err(|_| RuntimeError::General {
                    message: format!("invalid integer: {}", s),
                    span: expr.span,
                })?;
                Ok(Value::Int(n))
            }
            ExprKind::Float(s) => {
                let n = s.parse::<f64>().map_err(|_| RuntimeError::General {
                    message: format!("invalid float: {}", s),
                    span: expr.span,
                })?;
                Ok(Value::Float(n))
            }
            ExprKind::String(s) => Ok(Value::String(s.clone())),
            ExprKind::Atom(s) => Ok(Value::Atom(s.clone())),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Nil => Ok(Value::Nil),

            ExprKind::Ident(name) => self.environment.borrow().get(name).ok_or_else(|| {
                RuntimeError::UndefinedVariable {
                    name: name.clone(),
                    span: expr.span,
                }
                .into()
            }),

            ExprKind::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval_expr(element)?);
                }
                Ok(Value::array(values))
            }

            ExprKind::Map(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key_str = map_key(self.eval_expr(key)?, key.span)?;
                    let val = self.eval_expr(value)?;
                    map.insert(key_str, val);
                }
                Ok(Value::Map(Rc::new(map)))
            }

            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right, expr.span),

            ExprKind::Unary { op, operand } => {
                let value = self.eval_expr(operand)?;
                Ok(eval_unary(*op, value, expr.span)?)
            }

            ExprKind::Index { object, index } => {
                let obj_val = self.eval_expr(object)?;
                let idx_val = self.eval_expr(index)?;
                Ok(eval_index(obj_val, idx_val, expr.span)?)
            }

            ExprKind::Call { func, args } => {
                let func_val = self.eval_expr(func)?;
                let mut arg_vals = Vec::with_capacity(args.len());
                for arg in args {
                    arg_vals.push(self.eval_expr(arg)?);
                }
                Ok(self.call_value(func_val, arg_vals, expr.span)?)
            }

            ExprKind::Paren(inner) => self.eval_expr(inner),

            ExprKind::Block(block) => self.eval_stmts(&block.stmts),

            ExprKind::Ensured(post) => self.eval_ensured(post),
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, span: Span) -> Exec<Value> {
        let lhs = self.eval_expr(left)?;

        // Short-circuit for logical operators
        match op {
            BinaryOp::And => {
                if !lhs.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                let rhs = self.eval_expr(right)?;
                return Ok(Value::Bool(rhs.is_truthy()));
            }
            BinaryOp::Or => {
                if lhs.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                let rhs = self.eval_expr(right)?;
                return Ok(Value::Bool(rhs.is_truthy()));
            }
            _ => {}
        }

        let rhs = self.eval_expr(right)?;
        Ok(binary_values(op, lhs, rhs, span)?)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Operators
// ============================================================================

fn binary_values(op: BinaryOp, lhs: Value, rhs: Value, span: Span) -> Result<Value> {
    match op {
        BinaryOp::Add => eval_add(lhs, rhs, span),
        BinaryOp::Sub => eval_arithmetic(lhs, rhs, span, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => eval_arithmetic(lhs, rhs, span, i64::checked_mul, |a, b| a * b),
        BinaryOp::Div | BinaryOp::Mod => {
            let is_zero = match &rhs {
                Value::Int(0) => true,
                Value::Float(f) => *f == 0.0,
                _ => false,
            };
            if is_zero {
                return Err(RuntimeError::DivisionByZero { span });
            }
            if op == BinaryOp::Div {
                eval_arithmetic(lhs, rhs, span, i64::checked_div, |a, b| a / b)
            } else {
                eval_arithmetic(lhs, rhs, span, i64::checked_rem, |a, b| a % b)
            }
        }

        BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinaryOp::NotEq => Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Lt => eval_comparison(lhs, rhs, span, |o| o.is_lt()),
        BinaryOp::LtEq => eval_comparison(lhs, rhs, span, |o| o.is_le()),
        BinaryOp::Gt => eval_comparison(lhs, rhs, span, |o| o.is_gt()),
        BinaryOp::GtEq => eval_comparison(lhs, rhs, span, |o| o.is_ge()),

        BinaryOp::Range | BinaryOp::RangeExclusive => {
            let bound = |value: &Value, which: &str| {
                value.as_int().ok_or_else(|| RuntimeError::TypeError {
                    message: format!("range {} must be an Int, got {}", which, value.type_name()),
                    span,
                })
            };
            Ok(Value::Range {
                start: bound(&lhs, "start")?,
                end: bound(&rhs, "end")?,
                inclusive: op == BinaryOp::Range,
            })
        }

        BinaryOp::And | BinaryOp::Or => Ok(Value::Bool(lhs.is_truthy() && rhs.is_truthy())),
    }
}

fn eval_add(lhs: Value, rhs: Value, span: Span) -> Result<Value> {
    match (lhs, rhs) {
        (Value::String(a), b) => Ok(Value::string(format!("{}{}", a, display_plain(&b)))),
        (a, Value::String(b)) => Ok(Value::string(format!("{}{}", display_plain(&a), b))),
        (lhs, rhs) => eval_arithmetic(lhs, rhs, span, i64::checked_add, |a, b| a + b),
    }
}

/// Strings concatenate without their quotes
fn display_plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string(),
        other => other.to_string(),
    }
}

fn eval_arithmetic(
    lhs: Value,
    rhs: Value,
    span: Span,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => {
            int_op(*a, *b)
                .map(Value::Int)
                .ok_or_else(|| RuntimeError::General {
                    message: "integer overflow".into(),
                    span,
                })
        }
        _ => match (lhs.as_float(), rhs.as_float()) {
            (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
            _ => Err(RuntimeError::TypeError {
                message: format!(
                    "cannot perform arithmetic on {} and {}",
                    lhs.type_name(),
                    rhs.type_name()
                ),
                span,
            }),
        },
    }
}

fn eval_comparison(
    lhs: Value,
    rhs: Value,
    span: Span,
    test: fn(std::cmp::Ordering) -> bool,
) -> Result<Value> {
    let ordering = match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (lhs.as_float(), rhs.as_float()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => {
                return Err(RuntimeError::TypeError {
                    message: format!("cannot compare {} and {}", lhs.type_name(), rhs.type_name()),
                    span,
                })
            }
        },
    };
    // NaN compares false both ways
    Ok(Value::Bool(ordering.is_some_and(test)))
}

fn eval_unary(op: UnaryOp, value: Value, span: Span) -> Result<Value> {
    match op {
        UnaryOp::Neg => match value {
            Value::Int(n) => n.checked_neg().map(Value::Int).ok_or(RuntimeError::General {
                message: "integer overflow".into(),
                span,
            }),
            Value::Float(n) => Ok(Value::Float(-n)),
            other => Err(RuntimeError::TypeError {
                message: format!("cannot negate {}", other.type_name()),
                span,
            }),
        },
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
    }
}

// ============================================================================
// Collections
// ============================================================================

/// Resolve a possibly negative index against `length`.
fn resolve_index(index: &Value, length: usize, span: Span) -> Result<usize> {
    let idx = index.as_int().ok_or_else(|| RuntimeError::TypeError {
        message: format!("index must be an Int, got {}", index.type_name()),
        span,
    })?;
    let actual = if idx < 0 { length as i64 + idx } else { idx };
    if actual < 0 || actual as usize >= length {
        return Err(RuntimeError::IndexOutOfBounds {
            index: idx,
            length,
            span,
        });
    }
    Ok(actual as usize)
}

fn map_key(index: Value, span: Span) -> Result<SmolStr> {
    match index {
        Value::String(s) => Ok(s),
        other => Err(RuntimeError::TypeError {
            message: format!("map key must be a String, got {}", other.type_name()),
            span,
        }),
    }
}

fn eval_index(obj: Value, index: Value, span: Span) -> Result<Value> {
    match obj {
        Value::Array(arr) => {
            let i = resolve_index(&index, arr.len(), span)?;
            Ok(arr[i].clone())
        }
        Value::Map(map) => {
            let key = map_key(index, span)?;
            map.get(&key)
                .cloned()
                .ok_or_else(|| RuntimeError::InvalidKey {
                    key: key.to_string(),
                    span,
                })
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = resolve_index(&index, chars.len(), span)?;
            Ok(Value::string(chars[i].to_string()))
        }
        other => Err(RuntimeError::TypeError {
            message: format!("{} is not indexable", other.type_name()),
            span,
        }),
    }
}

fn store_index(container: Value, index: Value, value: Value, span: Span) -> Result<Value> {
    match container {
        Value::Array(mut arr) => {
            let i = resolve_index(&index, arr.len(), span)?;
            Rc::make_mut(&mut arr)[i] = value;
            Ok(Value::Array(arr))
        }
        Value::Map(mut map) => {
            let key = map_key(index, span)?;
            Rc::make_mut(&mut map).insert(key, value);
            Ok(Value::Map(map))
        }
        other => Err(RuntimeError::TypeError {
            message: format!("{} does not support indexed assignment", other.type_name()),
            span,
        }),
    }
}

/// The values a `for` loop walks over.
fn iterate(value: Value, span: Span) -> Result<Box<dyn Iterator<Item = Value>>> {
    match value {
        Value::Range {
            start,
            end,
            inclusive: true,
        } => Ok(Box::new((start..=end).map(Value::Int))),
        Value::Range { start, end, .. } => Ok(Box::new((start..end).map(Value::Int))),
        Value::Array(arr) => Ok(Box::new((0..arr.len()).map(move |i| arr[i].clone()))),
        Value::Map(map) => {
            let keys: Vec<Value> = map.keys().cloned().map(Value::String).collect();
            Ok(Box::new(keys.into_iter()))
        }
        Value::String(s) => {
            let chars: Vec<Value> = s.chars().map(|c| Value::string(c.to_string())).collect();
            Ok(Box::new(chars.into_iter()))
        }
        other => Err(RuntimeError::TypeError {
            message: format!("{} is not iterable", other.type_name()),
            span,
        }),
    }
}
