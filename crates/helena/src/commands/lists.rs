//! The `list` ensemble.
//!
//! `list VALUE ?subcommand ?arg ...??` coerces the value to a list (lists,
//! tuples, and constant blocks convert) and applies positional subcommands.
//! All operations return new lists; values are immutable.

use std::rc::Rc;

use crate::{
    command::{arity_error, Command},
    result::{EvalError, Outcome},
    scope::Scope,
    value::Value,
};

use super::{body_program, foreach_loop, subcommand_name, unknown_subcommand};

pub(super) fn register(scope: &Scope) {
    super::register(scope, "list", Rc::new(ListCommand));
}

/// Coerces a value to list elements.
pub(crate) fn list_from_value(value: &Value) -> Result<Vec<Value>, EvalError> {
    match value {
        Value::List(items) | Value::Tuple(items) => Ok(items.to_vec()),
        Value::Script(script) => Ok(script.to_values()?.to_vec()),
        _ => Err(EvalError::message("invalid list")),
    }
}

struct ListCommand;

impl Command for ListCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if args.len() < 2 {
            return arity_error(args, "value ?subcommand? ?arg ...?").into();
        }
        let items = match list_from_value(&args[1]) {
            Ok(items) => items,
            Err(e) => return e.into(),
        };
        if args.len() == 2 {
            return Outcome::Ok(Value::list(items));
        }
        let sub = match subcommand_name(&args[2]) {
            Ok(sub) => sub,
            Err(e) => return e.into(),
        };
        let rest = &args[3..];
        match sub.as_str() {
            "subcommands" => Outcome::Ok(Value::list(
                [
                    "subcommands", "length", "at", "range", "append", "insert", "remove",
                    "replace", "foreach",
                ]
                .iter()
                .map(|s| Value::str(*s))
                .collect(),
            )),
            "length" => match check(args, rest, 0, 0, "length") {
                Ok(()) => Outcome::Ok(Value::Int(items.len() as i64)),
                Err(e) => e.into(),
            },
            "at" => {
                if let Err(e) = check(args, rest, 1, 2, "at index ?default?") {
                    return e.into();
                }
                match index_in(&rest[0], items.len()) {
                    Ok(i) => Outcome::Ok(items[i].clone()),
                    Err(_) if rest.len() == 2 => Outcome::Ok(rest[1].clone()),
                    Err(e) => e.into(),
                }
            }
            "range" => {
                if let Err(e) = check(args, rest, 2, 2, "range first last") {
                    return e.into();
                }
                match range_in(&rest[0], &rest[1], items.len()) {
                    Ok((first, last)) => Outcome::Ok(Value::list(items[first..last].to_vec())),
                    Err(e) => e.into(),
                }
            }
            "append" => {
                let mut result = items;
                for part in rest {
                    match list_from_value(part) {
                        Ok(elements) => result.extend(elements),
                        Err(e) => return e.into(),
                    }
                }
                Outcome::Ok(Value::list(result))
            }
            "insert" => {
                if let Err(e) = check(args, rest, 2, 2, "insert index value") {
                    return e.into();
                }
                let i = match index_in(&rest[0], items.len() + 1) {
                    Ok(i) => i,
                    Err(e) => return e.into(),
                };
                let insert = match list_from_value(&rest[1]) {
                    Ok(elements) => elements,
                    Err(e) => return e.into(),
                };
                let mut result = items[..i].to_vec();
                result.extend(insert);
                result.extend_from_slice(&items[i..]);
                Outcome::Ok(Value::list(result))
            }
            "remove" => {
                if let Err(e) = check(args, rest, 2, 2, "remove first last") {
                    return e.into();
                }
                match range_in(&rest[0], &rest[1], items.len()) {
                    Ok((first, last)) => {
                        let mut result = items[..first].to_vec();
                        result.extend_from_slice(&items[last..]);
                        Outcome::Ok(Value::list(result))
                    }
                    Err(e) => e.into(),
                }
            }
            "replace" => {
                if let Err(e) = check(args, rest, 3, 3, "replace first last value") {
                    return e.into();
                }
                let replacement = match list_from_value(&rest[2]) {
                    Ok(elements) => elements,
                    Err(e) => return e.into(),
                };
                match range_in(&rest[0], &rest[1], items.len()) {
                    Ok((first, last)) => {
                        let mut result = items[..first].to_vec();
                        result.extend(replacement);
                        result.extend_from_slice(&items[last..]);
                        Outcome::Ok(Value::list(result))
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
                foreach_loop(items, rest[0].clone(), body, scope.clone())
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

fn index_in(value: &Value, len: usize) -> Result<usize, EvalError> {
    let i = value.as_integer()?;
    usize::try_from(i)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| EvalError::message(format!("index out of range \"{i}\"")))
}

fn range_in(first: &Value, last: &Value, len: usize) -> Result<(usize, usize), EvalError> {
    let first = index_in(first, len)?;
    let last = index_in(last, len)?;
    if first > last {
        Ok((first, first))
    } else {
        Ok((first, last + 1))
    }
}
