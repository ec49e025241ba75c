//! Result-protocol primitives: `idem`, `return`, `tailcall`, `yield`,
//! `error`, `break`, `continue`, `pass`, `eval`, and `help`.

use std::rc::Rc;

use crate::{
    command::{check_arity, Command},
    result::{CustomCode, EvalError, Outcome, PASS_TAG},
    scope::Scope,
    value::Value,
};

use super::body_program;

pub(super) fn register(scope: &Scope) {
    super::register(scope, "idem", Rc::new(IdemCommand));
    super::register(scope, "return", Rc::new(ReturnCommand));
    super::register(scope, "tailcall", Rc::new(TailcallCommand));
    super::register(scope, "yield", Rc::new(YieldCommand));
    super::register(scope, "error", Rc::new(ErrorCommand));
    super::register(scope, "break", Rc::new(BreakCommand));
    super::register(scope, "continue", Rc::new(ContinueCommand));
    super::register(scope, "pass", Rc::new(PassCommand));
    super::register(scope, "eval", Rc::new(EvalCommand));
    super::register(scope, "help", Rc::new(HelpCommand));
}

/// `idem value` — returns its argument unchanged.
struct IdemCommand;

impl Command for IdemCommand {
    fn execute(&self, args: &[Value], _scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 1, Some(1), "value") {
            return e.into();
        }
        Outcome::Ok(args[1].clone())
    }
}

/// `return ?result?` — unwinds to the enclosing callable.
struct ReturnCommand;

impl Command for ReturnCommand {
    fn execute(&self, args: &[Value], _scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 0, Some(1), "?result?") {
            return e.into();
        }
        Outcome::Return(args.get(1).cloned().unwrap_or(Value::Nil))
    }
}

/// `tailcall body` — evaluates the body and returns its result from the
/// enclosing callable.
struct TailcallCommand;

impl Command for TailcallCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 1, Some(1), "body") {
            return e.into();
        }
        let program = match body_program(scope, &args[1]) {
            Ok(program) => program,
            Err(e) => return e.into(),
        };
        Outcome::defer_with(program, scope.clone(), |result| match result {
            Outcome::Ok(value) => Outcome::Return(value),
            other => other,
        })
    }
}

/// `yield ?result?` — suspends the process.
struct YieldCommand;

impl Command for YieldCommand {
    fn execute(&self, args: &[Value], _scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 0, Some(1), "?result?") {
            return e.into();
        }
        Outcome::Yield(args.get(1).cloned().unwrap_or(Value::Nil))
    }
}

/// `error message` — raises an error.
struct ErrorCommand;

impl Command for ErrorCommand {
    fn execute(&self, args: &[Value], _scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 1, Some(1), "message") {
            return e.into();
        }
        match args[1].string_repr() {
            Some(_) => Outcome::Error(EvalError::value(args[1].clone())),
            None => Outcome::error("value has no string representation"),
        }
    }
}

/// `break` — terminates the enclosing loop.
struct BreakCommand;

impl Command for BreakCommand {
    fn execute(&self, args: &[Value], _scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 0, Some(0), "") {
            return e.into();
        }
        Outcome::Break
    }
}

/// `continue` — skips to the enclosing loop's next iteration.
struct ContinueCommand;

impl Command for ContinueCommand {
    fn execute(&self, args: &[Value], _scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 0, Some(0), "") {
            return e.into();
        }
        Outcome::Continue
    }
}

/// `pass` — inside a `catch` handler, re-raises the intercepted result.
struct PassCommand;

impl Command for PassCommand {
    fn execute(&self, args: &[Value], _scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 0, Some(0), "") {
            return e.into();
        }
        Outcome::Custom(CustomCode::new(PASS_TAG), Value::Nil)
    }
}

/// `eval body` — evaluates a script or tuple in the current scope.
struct EvalCommand;

impl Command for EvalCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 1, Some(1), "body") {
            return e.into();
        }
        match body_program(scope, &args[1]) {
            Ok(program) => Outcome::defer(program, scope.clone()),
            Err(e) => e.into(),
        }
    }
}

/// `help command ?arg ...?` — delegates to the target command's help.
struct HelpCommand;

impl Command for HelpCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 1, None, "command ?arg ...?") {
            return e.into();
        }
        match scope.resolve_command(&args[1]) {
            Ok(command) => command.help(&args[1..], scope),
            Err(e) => e.into(),
        }
    }
}
