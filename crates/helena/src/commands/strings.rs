//! The `string` ensemble.
//!
//! `string VALUE ?subcommand ?arg ...??` — positional subcommands over the
//! character sequence. Indices are character-based; every subcommand
//! validates its arity and bounds and reports the conventional errors.

use std::rc::Rc;

use crate::{
    command::{arity_error, Command},
    result::{EvalError, Outcome},
    scope::Scope,
    value::Value,
};

use super::{body_program, foreach_loop, subcommand_name, unknown_subcommand};

pub(super) fn register(scope: &Scope) {
    super::register(scope, "string", Rc::new(StringCommand));
}

struct StringCommand;

impl Command for StringCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if args.len() < 2 {
            return arity_error(args, "value ?subcommand? ?arg ...?").into();
        }
        let value = match args[1].as_string() {
            Ok(value) => value,
            Err(e) => return e.into(),
        };
        if args.len() == 2 {
            return Outcome::Ok(Value::str(value));
        }
        let sub = match subcommand_name(&args[2]) {
            Ok(sub) => sub,
            Err(e) => return e.into(),
        };
        let chars: Vec<char> = value.chars().collect();
        let rest = &args[3..];
        match sub.as_str() {
            "subcommands" => Outcome::Ok(Value::list(
                [
                    "subcommands", "length", "at", "range", "append", "insert", "remove",
                    "replace", "foreach", "==", "!=",
                ]
                .iter()
                .map(|s| Value::str(*s))
                .collect(),
            )),
            "length" => match check(args, rest, 0, 0, "length") {
                Ok(()) => Outcome::Ok(Value::Int(chars.len() as i64)),
                Err(e) => e.into(),
            },
            "at" => {
                if let Err(e) = check(args, rest, 1, 2, "at index ?default?") {
                    return e.into();
                }
                match index_in(&rest[0], chars.len()) {
                    Ok(i) => Outcome::Ok(Value::str(chars[i].to_string())),
                    Err(_) if rest.len() == 2 => Outcome::Ok(rest[1].clone()),
                    Err(e) => e.into(),
                }
            }
            "range" => {
                if let Err(e) = check(args, rest, 2, 2, "range first last") {
                    return e.into();
                }
                match range_in(&rest[0], &rest[1], chars.len()) {
                    Ok((first, last)) => {
                        Outcome::Ok(Value::str(chars[first..last].iter().collect::<String>()))
                    }
                    Err(e) => e.into(),
                }
            }
            "append" => {
                let mut result = value;
                for part in rest {
                    match part.as_string() {
                        Ok(s) => result.push_str(&s),
                        Err(e) => return e.into(),
                    }
                }
                Outcome::Ok(Value::str(result))
            }
            "insert" => {
                if let Err(e) = check(args, rest, 2, 2, "insert index value") {
                    return e.into();
                }
                let i = match index_in(&rest[0], chars.len() + 1) {
                    Ok(i) => i,
                    Err(e) => return e.into(),
                };
                let insert = match rest[1].as_string() {
                    Ok(s) => s,
                    Err(e) => return e.into(),
                };
                let mut result: String = chars[..i].iter().collect();
                result.push_str(&insert);
                result.extend(&chars[i..]);
                Outcome::Ok(Value::str(result))
            }
            "remove" => {
                if let Err(e) = check(args, rest, 2, 2, "remove first last") {
                    return e.into();
                }
                match range_in(&rest[0], &rest[1], chars.len()) {
                    Ok((first, last)) => {
                        let mut result: String = chars[..first].iter().collect();
                        result.extend(&chars[last..]);
                        Outcome::Ok(Value::str(result))
                    }
                    Err(e) => e.into(),
                }
            }
            "replace" => {
                if let Err(e) = check(args, rest, 3, 3, "replace first last value") {
                    return e.into();
                }
                let replacement = match rest[2].as_string() {
                    Ok(s) => s,
                    Err(e) => return e.into(),
                };
                match range_in(&rest[0], &rest[1], chars.len()) {
                    Ok((first, last)) => {
                        let mut result: String = chars[..first].iter().collect();
                        result.push_str(&replacement);
                        result.extend(&chars[last..]);
                        Outcome::Ok(Value::str(result))
                    }
                    Err(e) => e.into(),
                }
            }
            "foreach" => {
                if let Err(e) = check(args, rest, 2, 2, "foreach element body") {
                    return e.into();
                }
                let body = match body_program(scope, &rest[1]) {
                    Ok(body) => body,
                    Err(e) => return e.into(),
                };
                let items = chars.iter().map(|c| Value::str(c.to_string())).collect();
                foreach_loop(items, rest[0].clone(), body, scope.clone())
            }
            "==" | "!=" => {
                if let Err(e) = check(args, rest, 1, 1, "operator string") {
                    return e.into();
                }
                let other = match rest[0].as_string() {
                    Ok(s) => s,
                    Err(e) => return e.into(),
                };
                let equal = value == other;
                Outcome::Ok(Value::Bool(if sub == "==" { equal } else { !equal }))
            }
            _ => unknown_subcommand(&sub).into(),
        }
    }
}

fn check(args: &[Value], rest: &[Value], min: usize, max: usize, usage: &str) -> Result<(), EvalError> {
    if rest.len() < min || rest.len() > max {
        Err(arity_error(&args[..1], &format!("value {usage}")))
    } else {
        Ok(())
    }
}

/// Converts an index value and bounds-checks it against `len`.
fn index_in(value: &Value, len: usize) -> Result<usize, EvalError> {
    let i = value.as_integer()?;
    usize::try_from(i)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| EvalError::message(format!("index out of range \"{i}\"")))
}

/// Converts an inclusive `first last` pair into an exclusive range, erroring
/// on out-of-range bounds. An inverted pair selects the empty range.
fn range_in(first: &Value, last: &Value, len: usize) -> Result<(usize, usize), EvalError> {
    let first = index_in(first, len)?;
    let last = index_in(last, len)?;
    if first > last {
        Ok((first, first))
    } else {
        Ok((first, last + 1))
    }
}
