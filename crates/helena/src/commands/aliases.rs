//! `alias`: name-to-invocation indirection.
//!
//! `alias name target` registers a command that expands each call to
//! `(target args…)` and dispatches it; a tuple target carries partial
//! arguments along.

use std::rc::Rc;

use crate::{
    bytecode::Program,
    command::{check_arity, Command},
    result::Outcome,
    scope::Scope,
    value::Value,
};

use super::{subcommand_name, unknown_subcommand};

pub(super) fn register(scope: &Scope) {
    super::register(scope, "alias", Rc::new(DefineAlias));
}

/// `alias name target`.
struct DefineAlias;

impl Command for DefineAlias {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 2, Some(2), "name target") {
            return e.into();
        }
        let name = match args[1].as_string() {
            Ok(name) => name,
            Err(e) => return e.into(),
        };
        let command = Rc::new(AliasCommand {
            target: args[2].clone(),
        });
        scope.register_named_command(&name, command.clone());
        Outcome::Ok(Value::Command(Rc::new(AliasMetacommand { command })))
    }
}

struct AliasCommand {
    target: Value,
}

impl Command for AliasCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        let mut sentence = match &self.target {
            Value::Tuple(elements) => elements.to_vec(),
            other => vec![other.clone()],
        };
        sentence.extend(args[1..].iter().cloned());
        Outcome::defer(Program::for_sentence(sentence), scope.clone())
    }
}

/// The alias metacommand: `command` exposes the target.
struct AliasMetacommand {
    command: Rc<AliasCommand>,
}

impl Command for AliasMetacommand {
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
                Value::str("command"),
            ])),
            "command" => Outcome::Ok(self.command.target.clone()),
            _ => unknown_subcommand(&sub).into(),
        }
    }
}
