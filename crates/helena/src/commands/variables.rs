//! The scriptable variable surface: `let`, `set`, `get`, `exists`, `unset`.
//!
//! These are thin wrappers over the scope operations; all mutation of
//! bindings goes through them.

use std::rc::Rc;

use crate::{
    command::{check_arity, Command},
    result::Outcome,
    scope::Scope,
    value::Value,
};

pub(super) fn register(scope: &Scope) {
    super::register(scope, "let", Rc::new(LetCommand));
    super::register(scope, "set", Rc::new(SetCommand));
    super::register(scope, "get", Rc::new(GetCommand));
    super::register(scope, "exists", Rc::new(ExistsCommand));
    super::register(scope, "unset", Rc::new(UnsetCommand));
}

/// `let name value` — defines a constant; fails on redefinition.
struct LetCommand;

impl Command for LetCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 2, Some(2), "constname value") {
            return e.into();
        }
        let name = match args[1].as_string() {
            Ok(name) => name,
            Err(e) => return e.into(),
        };
        match scope.set_constant(&name, args[2].clone()) {
            Ok(()) => Outcome::Ok(args[2].clone()),
            Err(e) => e.into(),
        }
    }
}

/// `set name value` — sets a variable.
struct SetCommand;

impl Command for SetCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 2, Some(2), "varname value") {
            return e.into();
        }
        let name = match args[1].as_string() {
            Ok(name) => name,
            Err(e) => return e.into(),
        };
        match scope.set_variable(&name, args[2].clone()) {
            Ok(()) => Outcome::Ok(args[2].clone()),
            Err(e) => e.into(),
        }
    }
}

/// `get name ?default?` — reads a variable or resolves a qualified value;
/// already-substituted values pass through unchanged.
struct GetCommand;

impl Command for GetCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 1, Some(2), "varname ?default?") {
            return e.into();
        }
        let result = match &args[1] {
            Value::Str(_) | Value::Tuple(_) | Value::Qualified(_) => scope.resolve_value(&args[1]),
            other => Ok(other.clone()),
        };
        match result {
            Ok(value) => Outcome::Ok(value),
            Err(_) if args.len() == 3 => Outcome::Ok(args[2].clone()),
            Err(e) => e.into(),
        }
    }
}

/// `exists name` — true when the variable (or qualified value) resolves.
struct ExistsCommand;

impl Command for ExistsCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 1, Some(1), "varname") {
            return e.into();
        }
        let exists = match &args[1] {
            Value::Str(name) => scope.variable_exists(name),
            Value::Tuple(_) | Value::Qualified(_) => scope.resolve_value(&args[1]).is_ok(),
            _ => true,
        };
        Outcome::Ok(Value::Bool(exists))
    }
}

/// `unset name` — removes a variable.
struct UnsetCommand;

impl Command for UnsetCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 1, Some(1), "varname") {
            return e.into();
        }
        let name = match args[1].as_string() {
            Ok(name) => name,
            Err(e) => return e.into(),
        };
        match scope.unset_variable(&name) {
            Ok(()) => Outcome::Ok(Value::Nil),
            Err(e) => e.into(),
        }
    }
}
