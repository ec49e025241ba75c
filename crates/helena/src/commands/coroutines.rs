//! `coroutine`: a suspended process behind a metacommand.
//!
//! The body runs in its own process over an isolated child of the defining
//! scope; `wait` starts or resumes it until the next `yield`, `yield v`
//! additionally substitutes `v` for the suspended expression, and
//! `active`/`done` observe the lifecycle. The coroutine's yields never
//! escape to the host: `wait` consumes them.

use std::{cell::RefCell, rc::Rc};

use crate::{
    command::{check_arity, Command},
    process::Process,
    result::{EvalError, Outcome},
    scope::Scope,
    value::{ScriptValue, Value},
};

pub(super) fn register(scope: &Scope) {
    super::register(scope, "coroutine", Rc::new(DefineCoroutine));
}

/// `coroutine ?name? body`.
struct DefineCoroutine;

impl Command for DefineCoroutine {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 1, Some(2), "?name? body") {
            return e.into();
        }
        let (name, body) = if args.len() == 3 {
            let name = match args[1].as_string() {
                Ok(name) => name,
                Err(e) => return e.into(),
            };
            (Some(name), &args[2])
        } else {
            (None, &args[1])
        };
        let body = match body.as_script() {
            Ok(script) => Rc::clone(script),
            Err(e) => return e.into(),
        };
        let command = Rc::new(CoroutineCommand {
            body,
            scope: scope.sandbox_child(),
            state: RefCell::new(CoroutineState::Pristine),
        });
        if let Some(name) = &name {
            scope.register_named_command(name, command.clone());
        }
        Outcome::Ok(Value::Command(command))
    }
}

/// Coroutine lifecycle. `Busy` guards against reentrant advancement from
/// inside the coroutine's own body.
enum CoroutineState {
    Pristine,
    Suspended(Box<Process>),
    Busy,
    Done,
}

struct CoroutineCommand {
    body: Rc<ScriptValue>,
    scope: Scope,
    state: RefCell<CoroutineState>,
}

impl Command for CoroutineCommand {
    fn execute(&self, args: &[Value], _caller: &Scope) -> Outcome {
        if args.len() == 1 {
            return Outcome::Ok(args[0].clone());
        }
        let sub = match super::subcommand_name(&args[1]) {
            Ok(sub) => sub,
            Err(e) => return e.into(),
        };
        match sub.as_str() {
            "subcommands" => Outcome::Ok(Value::list(vec![
                Value::str("subcommands"),
                Value::str("wait"),
                Value::str("active"),
                Value::str("done"),
                Value::str("yield"),
            ])),
            "wait" => {
                if let Err(e) = check_arity(args, 1, Some(1), "wait") {
                    return e.into();
                }
                self.advance(None)
            }
            "yield" => {
                if let Err(e) = check_arity(args, 1, Some(2), "yield ?value?") {
                    return e.into();
                }
                if matches!(&*self.state.borrow(), CoroutineState::Pristine) {
                    return EvalError::message("coroutine is not active").into();
                }
                self.advance(Some(args.get(2).cloned().unwrap_or(Value::Nil)))
            }
            "active" => {
                let active = matches!(&*self.state.borrow(), CoroutineState::Suspended(_));
                Outcome::Ok(Value::Bool(active))
            }
            "done" => {
                let done = matches!(&*self.state.borrow(), CoroutineState::Done);
                Outcome::Ok(Value::Bool(done))
            }
            _ => super::unknown_subcommand(&sub).into(),
        }
    }
}

impl CoroutineCommand {
    /// Starts or resumes the coroutine's process and consumes its next
    /// suspension.
    fn advance(&self, value: Option<Value>) -> Outcome {
        let state = std::mem::replace(&mut *self.state.borrow_mut(), CoroutineState::Busy);
        let mut process = match state {
            CoroutineState::Pristine => {
                let program = match self.scope.compile_script_value(&self.body) {
                    Ok(program) => program,
                    Err(e) => {
                        *self.state.borrow_mut() = CoroutineState::Done;
                        return e.into();
                    }
                };
                Box::new(Process::new(program, self.scope.child()))
            }
            CoroutineState::Suspended(process) => process,
            CoroutineState::Busy => {
                return EvalError::message("coroutine is already running").into();
            }
            CoroutineState::Done => {
                *self.state.borrow_mut() = CoroutineState::Done;
                return EvalError::message("coroutine is done").into();
            }
        };
        if let Some(value) = value {
            process.yield_back(value);
        }
        let result = process.run();
        match result {
            Outcome::Yield(value) => {
                *self.state.borrow_mut() = CoroutineState::Suspended(process);
                Outcome::Ok(value)
            }
            Outcome::Return(value) | Outcome::Ok(value) => {
                *self.state.borrow_mut() = CoroutineState::Done;
                Outcome::Ok(value)
            }
            other => {
                *self.state.borrow_mut() = CoroutineState::Done;
                other
            }
        }
    }
}
