//! `ensemble`: commands whose subcommands live in a dedicated scope.
//!
//! An ensemble captures an argspec for its leading arguments and a scope
//! built by its body; dispatching `ens lead… sub tail…` resolves `sub` in
//! that scope and invokes it as `(sub lead… tail…)`. Because subcommands are
//! ordinary registered commands, an ensemble can be extended at runtime
//! through its scope.

use std::rc::Rc;

use crate::{
    argspec::Argspec,
    bytecode::Program,
    command::{arity_error, check_arity, Command},
    result::{EvalError, Outcome},
    scope::Scope,
    value::Value,
};

use super::{body_program, subcommand_name, unknown_subcommand};

pub(super) fn register(scope: &Scope) {
    super::register(scope, "ensemble", Rc::new(DefineEnsemble));
}

/// `ensemble ?name? argspec body`.
struct DefineEnsemble;

impl Command for DefineEnsemble {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 2, Some(3), "?name? argspec body") {
            return e.into();
        }
        let (name, spec, body) = if args.len() == 4 {
            let name = match args[1].as_string() {
                Ok(name) => name,
                Err(e) => return e.into(),
            };
            (Some(name), &args[2], &args[3])
        } else {
            (None, &args[1], &args[2])
        };
        let argspec = match Argspec::from_value(spec) {
            Ok(argspec) => Rc::new(argspec),
            Err(e) => return e.into(),
        };
        if argspec.has_remainder() {
            return EvalError::message("ensemble arguments cannot include a remainder").into();
        }
        let program = match body_program(scope, body) {
            Ok(program) => program,
            Err(e) => return e.into(),
        };
        let child = scope.child();
        let defining = scope.clone();
        let retained = child.clone();
        Outcome::defer_with(program, child, move |result| match result {
            Outcome::Ok(_) => {
                let ensemble = Rc::new(EnsembleCommand {
                    scope: retained,
                    argspec,
                });
                if let Some(name) = &name {
                    defining.register_named_command(name, ensemble.clone());
                }
                Outcome::Ok(Value::Command(Rc::new(super::callables::Metacommand {
                    command: ensemble,
                    argspec: None,
                    kind: "ensemble",
                })))
            }
            other => other,
        })
    }
}

/// A dispatching ensemble.
struct EnsembleCommand {
    scope: Scope,
    argspec: Rc<Argspec>,
}

impl Command for EnsembleCommand {
    fn execute(&self, args: &[Value], caller: &Scope) -> Outcome {
        let leading = self.argspec.nb_required();
        if args.len() < 1 + leading {
            let usage = format!("{} ?subcommand? ?arg ...?", self.argspec.usage());
            return arity_error(args, usage.trim()).into();
        }
        if args.len() == 1 + leading {
            return Outcome::Ok(args[0].clone());
        }
        let sub = match subcommand_name(&args[1 + leading]) {
            Ok(sub) => sub,
            Err(e) => return e.into(),
        };
        if sub == "subcommands" {
            return Outcome::Ok(Value::list(vec![Value::str("subcommands")]));
        }
        let Some(command) = self.scope.resolve_named_command(&sub) else {
            return unknown_subcommand(&sub).into();
        };
        // `(sub lead… tail…)`: the dispatched command sees the leading
        // arguments first, then everything after the subcommand word.
        let mut sentence = vec![Value::Command(command)];
        sentence.extend(args[1..1 + leading].iter().cloned());
        sentence.extend(args[2 + leading..].iter().cloned());
        Outcome::defer(Program::for_sentence(sentence), caller.clone())
    }
}
