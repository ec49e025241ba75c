//! The `dict` ensemble.
//!
//! `dict VALUE ?subcommand ?arg ...??` coerces the value to a dictionary
//! (dictionaries, or flat key-value lists/tuples/blocks) and applies
//! positional subcommands. Keys must have a string representation; equality
//! between dictionaries ignores insertion order.

use std::rc::Rc;

use crate::{
    command::{arity_error, Command},
    result::{EvalError, Outcome},
    scope::Scope,
    value::{Dictionary, Value},
};

use super::{body_program, foreach_loop, subcommand_name, unknown_subcommand};

pub(super) fn register(scope: &Scope) {
    super::register(scope, "dict", Rc::new(DictCommand));
}

/// Coerces a value to dictionary entries.
fn dict_from_value(value: &Value) -> Result<Dictionary, EvalError> {
    match value {
        Value::Dict(entries) => Ok((**entries).clone()),
        Value::List(items) | Value::Tuple(items) => entries_from_pairs(items),
        Value::Script(script) => entries_from_pairs(&script.to_values()?),
        _ => Err(EvalError::message("invalid dictionary")),
    }
}

fn entries_from_pairs(items: &[Value]) -> Result<Dictionary, EvalError> {
    if items.len() % 2 != 0 {
        return Err(EvalError::message("invalid key-value list"));
    }
    let mut entries = Dictionary::default();
    for pair in items.chunks_exact(2) {
        let key = pair[0].as_string()?;
        entries.insert(key, pair[1].clone());
    }
    Ok(entries)
}

struct DictCommand;

impl Command for DictCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if args.len() < 2 {
            return arity_error(args, "value ?subcommand? ?arg ...?").into();
        }
        let entries = match dict_from_value(&args[1]) {
            Ok(entries) => entries,
            Err(e) => return e.into(),
        };
        if args.len() == 2 {
            return Outcome::Ok(Value::dict(entries));
        }
        let sub = match subcommand_name(&args[2]) {
            Ok(sub) => sub,
            Err(e) => return e.into(),
        };
        let rest = &args[3..];
        match sub.as_str() {
            "subcommands" => Outcome::Ok(Value::list(
                [
                    "subcommands", "length", "get", "set", "remove", "keys", "values",
                    "entries", "foreach",
                ]
                .iter()
                .map(|s| Value::str(*s))
                .collect(),
            )),
            "length" => match check(args, rest, 0, 0, "length") {
                Ok(()) => Outcome::Ok(Value::Int(entries.len() as i64)),
                Err(e) => e.into(),
            },
            "get" => {
                if let Err(e) = check(args, rest, 1, 2, "get key ?default?") {
                    return e.into();
                }
                let key = match rest[0].as_string() {
                    Ok(key) => key,
                    Err(e) => return e.into(),
                };
                match entries.get(&key) {
                    Some(value) => Outcome::Ok(value.clone()),
                    None if rest.len() == 2 => Outcome::Ok(rest[1].clone()),
                    None => EvalError::message(format!("unknown key \"{key}\"")).into(),
                }
            }
            "set" => {
                if let Err(e) = check(args, rest, 2, 2, "set key value") {
                    return e.into();
                }
                let key = match rest[0].as_string() {
                    Ok(key) => key,
                    Err(e) => return e.into(),
                };
                let mut entries = entries;
                entries.insert(key, rest[1].clone());
                Outcome::Ok(Value::dict(entries))
            }
            "remove" => {
                let mut entries = entries;
                for key in rest {
                    let key = match key.as_string() {
                        Ok(key) => key,
                        Err(e) => return e.into(),
                    };
                    entries.shift_remove(&key);
                }
                Outcome::Ok(Value::dict(entries))
            }
            "keys" => match check(args, rest, 0, 0, "keys") {
                Ok(()) => Outcome::Ok(Value::list(entries.keys().map(|k| Value::str(k.clone())).collect())),
                Err(e) => e.into(),
            },
            "values" => match check(args, rest, 0, 0, "values") {
                Ok(()) => Outcome::Ok(Value::list(entries.values().cloned().collect())),
                Err(e) => e.into(),
            },
            "entries" => match check(args, rest, 0, 0, "entries") {
                Ok(()) => Outcome::Ok(Value::list(entry_tuples(&entries))),
                Err(e) => e.into(),
            },
            "foreach" => {
                if let Err(e) = check(args, rest, 2, 2, "foreach entry body") {
                    return e.into();
                }
                let body = match body_program(scope, &rest[1]) {
                    Ok(body) => body,
                    Err(e) => return e.into(),
                };
                foreach_loop(entry_tuples(&entries), rest[0].clone(), body, scope.clone())
            }
            _ => unknown_subcommand(&sub).into(),
        }
    }
}

/// Entries as `(key value)` tuples, in insertion order.
fn entry_tuples(entries: &Dictionary) -> Vec<Value> {
    entries
        .iter()
        .map(|(key, value)| Value::tuple(vec![Value::str(key.clone()), value.clone()]))
        .collect()
}

fn check(args: &[Value], rest: &[Value], min: usize, max: usize, usage: &str) -> Result<(), EvalError> {
    if rest.len() < min || rest.len() > max {
        Err(arity_error(&args[..1], &format!("value {usage}")))
    } else {
        Ok(())
    }
}
