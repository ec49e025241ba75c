//! The number command: infix arithmetic and comparison.
//!
//! Number values (and numeric literal words) dispatch here when they appear
//! in command position: `1 + 2 * 3` folds strictly left-to-right, `$x < 3`
//! compares. Arithmetic mixes integers and reals, converting only when
//! lossless, and normalizes whole-number real results back to integers.

use std::rc::Rc;

use crate::{
    command::{arity_error, Command, CommandRef},
    result::{EvalError, Outcome},
    scope::Scope,
    value::{integer_to_real, real_to_integer, Value},
};

/// The shared number-command instance.
pub(crate) fn number_command() -> CommandRef {
    thread_local! {
        static NUMBER: CommandRef = Rc::new(NumberCommand);
    }
    NUMBER.with(Clone::clone)
}

pub(super) fn register(scope: &Scope) {
    for op in ["+", "-", "*", "/"] {
        super::register(scope, op, Rc::new(PrefixArithCommand { op }));
    }
}

/// Prefix arithmetic: `+ a b …` folds its operands left to right; `- a`
/// negates.
struct PrefixArithCommand {
    op: &'static str,
}

impl Command for PrefixArithCommand {
    fn execute(&self, args: &[Value], _scope: &Scope) -> Outcome {
        let min = if self.op == "/" { 2 } else { 1 };
        if args.len() < 1 + min {
            return arity_error(args, "number ?number ...?").into();
        }
        let mut accumulator = match to_number(&args[1]) {
            Ok(number) => number,
            Err(e) => return e.into(),
        };
        if args.len() == 2 && self.op == "-" {
            return match apply(Number::Int(0), "-", accumulator) {
                Ok(number) => Outcome::Ok(number.to_value()),
                Err(e) => e.into(),
            };
        }
        for operand in &args[2..] {
            let operand = match to_number(operand) {
                Ok(number) => number,
                Err(e) => return e.into(),
            };
            accumulator = match apply(accumulator, self.op, operand) {
                Ok(number) => number,
                Err(e) => return e.into(),
            };
        }
        Outcome::Ok(accumulator.to_value())
    }
}

/// True when the value is a number or a string in numeric syntax, so the
/// command resolver can route it here.
pub(crate) fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Int(_) | Value::Real(_) => true,
        Value::Str(s) => parse_number(s).is_some(),
        _ => false,
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Real(f64),
}

fn parse_number(s: &str) -> Option<Number> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::Int(i));
    }
    s.parse::<f64>().ok().map(Number::Real)
}

fn to_number(value: &Value) -> Result<Number, EvalError> {
    match value {
        Value::Int(i) => Ok(Number::Int(*i)),
        Value::Real(r) => Ok(Number::Real(*r)),
        Value::Str(s) => {
            parse_number(s).ok_or_else(|| EvalError::message(format!("invalid number \"{s}\"")))
        }
        other => Err(EvalError::message(format!("invalid number \"{other}\""))),
    }
}

impl Number {
    fn to_value(self) -> Value {
        match self {
            Self::Int(i) => Value::Int(i),
            // Whole-number reals collapse back to integers when exact.
            Self::Real(r) => match real_to_integer(r) {
                Some(i) => Value::Int(i),
                None => Value::Real(r),
            },
        }
    }

    fn as_real(self) -> Result<f64, EvalError> {
        match self {
            Self::Int(i) => {
                integer_to_real(i).ok_or_else(|| EvalError::message(format!("invalid real \"{i}\"")))
            }
            Self::Real(r) => Ok(r),
        }
    }
}

struct NumberCommand;

impl Command for NumberCommand {
    fn execute(&self, args: &[Value], _scope: &Scope) -> Outcome {
        let first = match to_number(&args[0]) {
            Ok(number) => number,
            Err(e) => return e.into(),
        };
        if args.len() == 1 {
            return Outcome::Ok(first.to_value());
        }
        let operator = match args[1].string_repr() {
            Some(op) => op,
            None => return Outcome::error("invalid operator"),
        };
        if is_comparison(&operator) {
            if args.len() != 3 {
                return arity_error(args, "operator operand").into();
            }
            return match compare(&args[0], &operator, &args[2]) {
                Ok(b) => Outcome::Ok(Value::Bool(b)),
                Err(e) => e.into(),
            };
        }
        // Arithmetic folds `operand (operator operand)*` left to right.
        let mut accumulator = first;
        let mut i = 1;
        while i < args.len() {
            let operator = match args[i].string_repr() {
                Some(op) => op,
                None => return Outcome::error("invalid operator"),
            };
            let Some(operand) = args.get(i + 1) else {
                return arity_error(args, "operand ?operator operand ...?").into();
            };
            let operand = match to_number(operand) {
                Ok(number) => number,
                Err(e) => return e.into(),
            };
            accumulator = match apply(accumulator, &operator, operand) {
                Ok(number) => number,
                Err(e) => return e.into(),
            };
            i += 2;
        }
        Outcome::Ok(accumulator.to_value())
    }
}

fn is_comparison(op: &str) -> bool {
    matches!(op, "==" | "!=" | ">" | ">=" | "<" | "<=")
}

fn apply(lhs: Number, op: &str, rhs: Number) -> Result<Number, EvalError> {
    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => match op {
            "+" => checked(a.checked_add(b), a, op, b),
            "-" => checked(a.checked_sub(b), a, op, b),
            "*" => checked(a.checked_mul(b), a, op, b),
            "/" => {
                if b == 0 {
                    Err(EvalError::message("division by zero"))
                } else {
                    Ok(Number::Real(Number::Int(a).as_real()? / Number::Int(b).as_real()?))
                }
            }
            _ => Err(EvalError::message(format!("invalid operator \"{op}\""))),
        },
        (lhs, rhs) => {
            let a = lhs.as_real()?;
            let b = rhs.as_real()?;
            match op {
                "+" => Ok(Number::Real(a + b)),
                "-" => Ok(Number::Real(a - b)),
                "*" => Ok(Number::Real(a * b)),
                "/" => {
                    if b == 0.0 {
                        Err(EvalError::message("division by zero"))
                    } else {
                        Ok(Number::Real(a / b))
                    }
                }
                _ => Err(EvalError::message(format!("invalid operator \"{op}\""))),
            }
        }
    }
}

fn checked(result: Option<i64>, a: i64, op: &str, b: i64) -> Result<Number, EvalError> {
    result
        .map(Number::Int)
        .ok_or_else(|| EvalError::message(format!("integer overflow in \"{a} {op} {b}\"")))
}

fn compare(lhs: &Value, op: &str, rhs: &Value) -> Result<bool, EvalError> {
    // Identity short-circuit for the reflexive operators.
    if lhs == rhs && matches!(op, "==" | ">=" | "<=") {
        return Ok(true);
    }
    let a = to_number(lhs)?;
    let b = to_number(rhs)?;
    let ordering = match (a, b) {
        (Number::Int(a), Number::Int(b)) => a.partial_cmp(&b),
        (a, b) => a.as_real()?.partial_cmp(&b.as_real()?),
    };
    let Some(ordering) = ordering else {
        return Ok(op == "!=");
    };
    Ok(match op {
        "==" => ordering.is_eq(),
        "!=" => !ordering.is_eq(),
        ">" => ordering.is_gt(),
        ">=" => ordering.is_ge(),
        "<" => ordering.is_lt(),
        "<=" => ordering.is_le(),
        _ => return Err(EvalError::message(format!("invalid operator \"{op}\""))),
    })
}
