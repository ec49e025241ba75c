//! The core command set.
//!
//! Everything the engine exposes to scripts is a [`Command`]: control flow,
//! loops, scope operations, type ensembles, and the defining commands that
//! build user callables. `register_core` installs all of them into a root
//! scope.

use std::rc::Rc;

use crate::{
    bytecode::Program,
    command::CommandRef,
    result::EvalError,
    scope::Scope,
    value::Value,
};

pub(crate) use numbers::{is_numeric, number_command};
pub(crate) use tuples::tuple_command;

mod aliases;
mod basics;
mod callables;
mod catch_cmd;
mod coroutines;
mod dicts;
mod ensembles;
mod flow;
mod lists;
mod numbers;
mod scopes_cmd;
mod strings;
mod tuples;
mod variables;

/// Registers the core command set into a scope.
pub fn register_core(scope: &Scope) {
    basics::register(scope);
    variables::register(scope);
    numbers::register(scope);
    flow::register(scope);
    catch_cmd::register(scope);
    callables::register(scope);
    scopes_cmd::register(scope);
    ensembles::register(scope);
    coroutines::register(scope);
    aliases::register(scope);
    strings::register(scope);
    lists::register(scope);
    dicts::register(scope);
}

/// Compiles a command body: scripts compile (and memoize) through the scope,
/// tuples become a synthesized single-sentence program.
pub(crate) fn body_program(scope: &Scope, body: &Value) -> Result<Rc<Program>, EvalError> {
    match body {
        Value::Script(script) => scope.compile_script_value(script),
        Value::Tuple(elements) => Ok(Program::for_sentence(elements.to_vec())),
        _ => Err(EvalError::message("body must be a script")),
    }
}

/// Registers a command under a literal name.
pub(crate) fn register(scope: &Scope, name: &str, command: CommandRef) {
    scope.register_named_command(name, command);
}

/// Shared `foreach` machinery for the type ensembles.
///
/// Iterates the items, destructuring the loop variable against each element
/// in a fresh child scope per iteration. The loop result is the last OK body
/// result; BREAK stops with nil, CONTINUE skips. Iterations chain through
/// continuation callbacks, so bodies can yield and resume mid-loop.
pub(crate) fn foreach_loop(items: Vec<Value>, var: Value, body: Rc<Program>, scope: Scope) -> crate::result::Outcome {
    let state = Rc::new(ForeachState {
        items,
        var,
        body,
        scope,
    });
    foreach_step(state, 0, Value::Nil)
}

struct ForeachState {
    items: Vec<Value>,
    var: Value,
    body: Rc<Program>,
    scope: Scope,
}

fn foreach_step(state: Rc<ForeachState>, index: usize, last: Value) -> crate::result::Outcome {
    use crate::result::Outcome;
    let Some(item) = state.items.get(index) else {
        return Outcome::Ok(last);
    };
    let child = state.scope.child_with_locals();
    if let Err(e) = child.destructure_local(&state.var, item) {
        return e.into();
    }
    let body = Rc::clone(&state.body);
    Outcome::defer_with(body, child, move |result| match result {
        Outcome::Ok(value) => foreach_step(state, index + 1, value),
        Outcome::Break => Outcome::Ok(Value::Nil),
        Outcome::Continue => foreach_step(state, index + 1, last),
        other => other,
    })
}

/// Extracts a subcommand name, producing the conventional errors.
pub(crate) fn subcommand_name(value: &Value) -> Result<String, EvalError> {
    value
        .string_repr()
        .ok_or_else(|| EvalError::message("invalid subcommand name"))
}

/// The conventional `unknown subcommand` error.
pub(crate) fn unknown_subcommand(name: &str) -> EvalError {
    EvalError::message(format!("unknown subcommand \"{name}\""))
}
