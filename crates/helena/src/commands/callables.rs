//! User-defined callables: `macro`, `closure`, `proc`.
//!
//! All three capture an argspec and a body script and differ only in where
//! the body runs: a macro body sees the caller's scope (dynamic scoping), a
//! closure body sees the defining scope (lexical scoping), and a proc body
//! runs behind a barrier scope and sees neither the caller's nor the
//! definer's variables.
//!
//! Each definition returns a metacommand exposing `subcommands` and
//! `argspec`; calling the metacommand with no argument hands back the
//! underlying callable as a command value.

use std::rc::Rc;

use crate::{
    argspec::Argspec,
    command::{arity_error, check_arity, Command, CommandRef},
    result::Outcome,
    scope::Scope,
    value::{ScriptValue, Value},
};

use super::{subcommand_name, unknown_subcommand};

pub(super) fn register(scope: &Scope) {
    super::register(scope, "macro", Rc::new(DefineCallable { kind: CallableKind::Macro }));
    super::register(scope, "closure", Rc::new(DefineCallable { kind: CallableKind::Closure }));
    super::register(scope, "proc", Rc::new(DefineCallable { kind: CallableKind::Proc }));
}

#[derive(Debug, Clone, Copy)]
enum CallableKind {
    Macro,
    Closure,
    Proc,
}

impl CallableKind {
    fn name(self) -> &'static str {
        match self {
            Self::Macro => "macro",
            Self::Closure => "closure",
            Self::Proc => "proc",
        }
    }
}

/// The defining command: `macro ?name? argspec body` (same shape for
/// `closure` and `proc`).
struct DefineCallable {
    kind: CallableKind,
}

impl Command for DefineCallable {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 2, Some(3), "?name? argspec body") {
            return e.into();
        }
        let (name, spec, body) = if args.len() == 4 {
            (Some(&args[1]), &args[2], &args[3])
        } else {
            (None, &args[1], &args[2])
        };
        let argspec = match Argspec::from_value(spec) {
            Ok(argspec) => Rc::new(argspec),
            Err(e) => return e.into(),
        };
        let body = match body.as_script() {
            Ok(script) => Rc::clone(script),
            Err(e) => return e.into(),
        };
        let command = Rc::new(CallableCommand {
            kind: self.kind,
            argspec: Rc::clone(&argspec),
            body,
            defining: scope.clone(),
        });
        if let Some(name) = name {
            let name = match name.as_string() {
                Ok(name) => name,
                Err(e) => return e.into(),
            };
            scope.register_named_command(&name, command.clone());
        }
        Outcome::Ok(Value::Command(Rc::new(Metacommand {
            command,
            argspec: Some(argspec),
            kind: self.kind.name(),
        })))
    }
}

/// A defined callable.
struct CallableCommand {
    kind: CallableKind,
    argspec: Rc<Argspec>,
    body: Rc<ScriptValue>,
    defining: Scope,
}

impl Command for CallableCommand {
    fn execute(&self, args: &[Value], caller: &Scope) -> Outcome {
        if !self.argspec.check_arity(args, 1) {
            return arity_error(args, &self.argspec.usage()).into();
        }
        let call_scope = match self.kind {
            CallableKind::Macro => caller.child_with_locals(),
            CallableKind::Closure => self.defining.child_with_locals(),
            CallableKind::Proc => self.defining.sandbox_child().child_with_locals(),
        };
        let mut bind = |name: &str, value: Value| call_scope.set_local(name, value);
        if let Err(outcome) = self.argspec.apply_arguments(caller, args, 1, &mut bind) {
            return outcome;
        }
        let program = match caller.compile_script_value(&self.body) {
            Ok(program) => program,
            Err(e) => return e.into(),
        };
        Outcome::defer_with(program, call_scope, callable_boundary)
    }

    fn help(&self, args: &[Value], _scope: &Scope) -> Outcome {
        let name = args
            .first()
            .and_then(Value::string_repr)
            .unwrap_or_else(|| self.kind.name().to_owned());
        Outcome::Ok(Value::str(format!("{name} {}", self.argspec.usage())))
    }
}

/// Maps a body's settled result at the callable boundary: RETURN unwinds
/// exactly this body, loose loop-control codes become errors.
fn callable_boundary(result: Outcome) -> Outcome {
    match result {
        Outcome::Return(value) => Outcome::Ok(value),
        Outcome::Break => Outcome::error("unexpected break"),
        Outcome::Continue => Outcome::error("unexpected continue"),
        other => other,
    }
}

/// The introspection wrapper returned by every defining command.
pub(super) struct Metacommand {
    pub command: CommandRef,
    pub argspec: Option<Rc<Argspec>>,
    pub kind: &'static str,
}

impl Command for Metacommand {
    fn execute(&self, args: &[Value], _scope: &Scope) -> Outcome {
        if args.len() == 1 {
            return Outcome::Ok(Value::Command(self.command.clone()));
        }
        let sub = match subcommand_name(&args[1]) {
            Ok(sub) => sub,
            Err(e) => return e.into(),
        };
        match sub.as_str() {
            "subcommands" => Outcome::Ok(Value::list(vec![
                Value::str("subcommands"),
                Value::str("argspec"),
            ])),
            "argspec" => match &self.argspec {
                Some(argspec) => Outcome::Ok(Value::str(argspec.usage())),
                None => unknown_subcommand("argspec").into(),
            },
            _ => unknown_subcommand(&sub).into(),
        }
    }

    fn help(&self, _args: &[Value], _scope: &Scope) -> Outcome {
        Outcome::Ok(Value::str(format!("{} metacommand", self.kind)))
    }
}
