//! Built-in functions.
//!
//! None of these change their arguments. `put`, `delete` and `push` return
//! an updated copy of the collection they are given.

use std::io::{self, Write};
use std::rc::Rc;

use agreement_lexer::Span;
use smol_str::SmolStr;

use crate::environment::Environment;
use crate::value::{BuiltinFn, Value};
use crate::{Result, RuntimeError};

type Native = fn(Vec<Value>) -> Result<Value>;

/// Name, arity (`None` for variadic) and implementation of every builtin.
const TABLE: &[(&str, Option<usize>, Native)] = &[
    ("print", None, builtin_print),
    ("println", None, builtin_println),
    ("type_of", Some(1), builtin_type_of),
    ("to_string", Some(1), builtin_to_string),
    // Aggregates used in contract conditions
    ("length", Some(1), builtin_length),
    ("sum", Some(1), builtin_sum),
    ("product", Some(1), builtin_product),
    ("put", Some(3), builtin_put),
    ("delete", Some(2), builtin_delete),
    ("has_key", Some(2), builtin_has_key),
    ("keys", Some(1), builtin_keys),
    ("push", Some(2), builtin_push),
    ("first", Some(1), builtin_first),
    ("last", Some(1), builtin_last),
    ("reverse", Some(1), builtin_reverse),
    ("concat", Some(2), builtin_concat),
    ("abs", Some(1), builtin_abs),
    ("min", Some(2), builtin_min),
    ("max", Some(2), builtin_max),
];

pub fn register(env: &mut Environment) {
    for &(name, arity, func) in TABLE {
        let name = SmolStr::new(name);
        env.define(
            name.clone(),
            Value::BuiltinFunction(BuiltinFn { name, arity, func }),
        );
    }
}

fn type_error(message: impl Into<String>) -> RuntimeError {
    RuntimeError::TypeError {
        message: message.into(),
        span: Span::default(),
    }
}

fn write_args(args: &[Value]) {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            print!(" ");
        }
        match arg {
            Value::String(s) => print!("{}", s),
            v => print!("{}", v),
        }
    }
}

fn builtin_print(args: Vec<Value>) -> Result<Value> {
    write_args(&args);
    io::stdout().flush().ok();
    Ok(Value::Nil)
}

fn builtin_println(args: Vec<Value>) -> Result<Value> {
    write_args(&args);
    println!();
    Ok(Value::Nil)
}

fn builtin_type_of(args: Vec<Value>) -> Result<Value> {
    Ok(Value::string(args[0].type_name()))
}

fn builtin_to_string(args: Vec<Value>) -> Result<Value> {
    match &args[0] {
        Value::String(s) => Ok(Value::String(s.clone())),
        v => Ok(Value::string(v.to_string())),
    }
}

/// Number of integers a range covers, or `None` when that count does not
/// fit an `i64`.
fn range_len(start: i64, end: i64, inclusive: bool) -> Option<i64> {
    let len = i128::from(end) - i128::from(start) + i128::from(inclusive);
    i64::try_from(len.max(0)).ok()
}

fn builtin_length(args: Vec<Value>) -> Result<Value> {
    let len = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(arr) => arr.len(),
        Value::Map(map) => map.len(),
        Value::Range {
            start,
            end,
            inclusive,
        } => {
            let len = range_len(*start, *end, *inclusive)
                .ok_or_else(|| type_error("length overflowed"))?;
            return Ok(Value::Int(len));
        }
        v => return Err(type_error(format!("{} has no length", v.type_name()))),
    };
    Ok(Value::Int(len as i64))
}

/// Elements of an array or range, for the numeric folds. Ranges are never
/// materialised.
fn numbers<'a>(value: &'a Value, name: &str) -> Result<Box<dyn Iterator<Item = Value> + 'a>> {
    match value {
        Value::Array(arr) => Ok(Box::new(arr.iter().cloned())),
        Value::Range {
            start,
            end,
            inclusive: true,
        } => Ok(Box::new((*start..=*end).map(Value::Int))),
        Value::Range { start, end, .. } => Ok(Box::new((*start..*end).map(Value::Int))),
        v => Err(type_error(format!(
            "{} expects an Array or Range, got {}",
            name,
            v.type_name()
        ))),
    }
}

fn fold_numbers(
    name: &str,
    values: impl Iterator<Item = Value>,
    init: i64,
    stop_at_zero: bool,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    let mut acc = Value::Int(init);
    for value in values {
        acc = match (acc, value) {
            (Value::Int(a), Value::Int(b)) => Value::Int(
                int_op(a, b).ok_or_else(|| type_error(format!("{} overflowed", name)))?,
            ),
            (a, b) => match (a.as_float(), b.as_float()) {
                (Some(a), Some(b)) => Value::Float(float_op(a, b)),
                _ => {
                    return Err(type_error(format!(
                        "{} expects numbers, got {}",
                        name,
                        b.type_name()
                    )))
                }
            },
        };
        if stop_at_zero && matches!(acc, Value::Int(0)) {
            break;
        }
    }
    Ok(acc)
}

/// Arithmetic series `start + ... + last` in closed form.
fn range_sum(start: i64, end: i64, inclusive: bool) -> Result<Value> {
    let overflowed = || type_error("sum overflowed");
    let len = range_len(start, end, inclusive).ok_or_else(overflowed)?;
    if len == 0 {
        return Ok(Value::Int(0));
    }
    let last = if inclusive {
        i128::from(end)
    } else {
        i128::from(end) - 1
    };
    let total = i128::from(len)
        .checked_mul(i128::from(start) + last)
        .ok_or_else(overflowed)?
        / 2;
    i64::try_from(total).map(Value::Int).map_err(|_| overflowed())
}

fn builtin_sum(args: Vec<Value>) -> Result<Value> {
    if let Value::Range {
        start,
        end,
        inclusive,
    } = args[0]
    {
        return range_sum(start, end, inclusive);
    }
    let values = numbers(&args[0], "sum")?;
    fold_numbers("sum", values, 0, false, i64::checked_add, |a, b| a + b)
}

fn builtin_product(args: Vec<Value>) -> Result<Value> {
    let values = numbers(&args[0], "product")?;
    fold_numbers("product", values, 1, true, i64::checked_mul, |a, b| a * b)
}

fn map_key(value: &Value) -> Result<SmolStr> {
    match value {
        Value::String(s) => Ok(s.clone()),
        v => Err(type_error(format!(
            "map key must be a String, got {}",
            v.type_name()
        ))),
    }
}

fn builtin_put(mut args: Vec<Value>) -> Result<Value> {
    let value = args.pop().unwrap_or_default();
    let key = map_key(&args[1])?;
    match &args[0] {
        Value::Map(map) => {
            let mut map = Rc::clone(map);
            Rc::make_mut(&mut map).insert(key, value);
            Ok(Value::Map(map))
        }
        v => Err(type_error(format!("put expects a Map, got {}", v.type_name()))),
    }
}

fn builtin_delete(args: Vec<Value>) -> Result<Value> {
    let key = map_key(&args[1])?;
    match &args[0] {
        Value::Map(map) => {
            let mut map = Rc::clone(map);
            Rc::make_mut(&mut map).shift_remove(&key);
            Ok(Value::Map(map))
        }
        v => Err(type_error(format!(
            "delete expects a Map, got {}",
            v.type_name()
        ))),
    }
}

fn builtin_has_key(args: Vec<Value>) -> Result<Value> {
    let key = map_key(&args[1])?;
    match &args[0] {
        Value::Map(map) => Ok(Value::Bool(map.contains_key(&key))),
        v => Err(type_error(format!(
            "has_key expects a Map, got {}",
            v.type_name()
        ))),
    }
}

fn builtin_keys(args: Vec<Value>) -> Result<Value> {
    match &args[0] {
        Value::Map(map) => Ok(Value::array(
            map.keys().map(|k| Value::String(k.clone())).collect(),
        )),
        v => Err(type_error(format!("keys expects a Map, got {}", v.type_name()))),
    }
}

fn builtin_push(mut args: Vec<Value>) -> Result<Value> {
    let value = args.pop().unwrap_or_default();
    match &args[0] {
        Value::Array(arr) => {
            let mut arr = Rc::clone(arr);
            Rc::make_mut(&mut arr).push(value);
            Ok(Value::Array(arr))
        }
        v => Err(type_error(format!(
            "push expects an Array, got {}",
            v.type_name()
        ))),
    }
}

fn builtin_first(args: Vec<Value>) -> Result<Value> {
    match &args[0] {
        Value::Array(arr) => Ok(arr.first().cloned().unwrap_or(Value::Nil)),
        v => Err(type_error(format!(
            "first expects an Array, got {}",
            v.type_name()
        ))),
    }
}

fn builtin_last(args: Vec<Value>) -> Result<Value> {
    match &args[0] {
        Value::Array(arr) => Ok(arr.last().cloned().unwrap_or(Value::Nil)),
        v => Err(type_error(format!(
            "last expects an Array, got {}",
            v.type_name()
        ))),
    }
}

fn builtin_reverse(args: Vec<Value>) -> Result<Value> {
    match &args[0] {
        Value::Array(arr) => Ok(Value::array(arr.iter().rev().cloned().collect())),
        Value::String(s) => Ok(Value::string(s.chars().rev().collect::<String>())),
        v => Err(type_error(format!("cannot reverse {}", v.type_name()))),
    }
}

fn builtin_concat(args: Vec<Value>) -> Result<Value> {
    match (&args[0], &args[1]) {
        (Value::Array(a), Value::Array(b)) => {
            Ok(Value::array(a.iter().chain(b.iter()).cloned().collect()))
        }
        (Value::String(a), Value::String(b)) => Ok(Value::string(format!("{}{}", a, b))),
        (a, b) => Err(type_error(format!(
            "cannot concat {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn builtin_abs(args: Vec<Value>) -> Result<Value> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(n.abs())),
        Value::Float(n) => Ok(Value::Float(n.abs())),
        v => Err(type_error(format!(
            "abs expects a number, got {}",
            v.type_name()
        ))),
    }
}

fn builtin_min(args: Vec<Value>) -> Result<Value> {
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(*a.min(b))),
        (a, b) => match (a.as_float(), b.as_float()) {
            (Some(x), Some(y)) => Ok(Value::Float(x.min(y))),
            _ => Err(type_error(format!(
                "min expects numbers, got {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

fn builtin_max(args: Vec<Value>) -> Result<Value> {
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(*a.max(b))),
        (a, b) => match (a.as_float(), b.as_float()) {
            (Some(x), Some(y)) => Ok(Value::Float(x.max(y))),
            _ => Err(type_error(format!(
                "max expects numbers, got {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}
