//! `scope` and `namespace`: scopes as first-class objects.
//!
//! Both evaluate their body once, at definition time, in a fresh child
//! scope, then retain that scope behind a metacommand. A namespace is a
//! scope that additionally lets callers `import` its commands.

use std::rc::Rc;

use crate::{
    command::{check_arity, Command},
    result::Outcome,
    scope::Scope,
    value::Value,
};

use super::{body_program, subcommand_name, unknown_subcommand};

pub(super) fn register(scope: &Scope) {
    super::register(scope, "scope", Rc::new(DefineScope { namespace: false }));
    super::register(scope, "namespace", Rc::new(DefineScope { namespace: true }));
}

/// `scope ?name? body` / `namespace ?name? body`.
struct DefineScope {
    namespace: bool,
}

impl Command for DefineScope {
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
        let program = match body_program(scope, body) {
            Ok(program) => program,
            Err(e) => return e.into(),
        };
        let child = scope.child();
        let defining = scope.clone();
        let retained = child.clone();
        let namespace = self.namespace;
        Outcome::defer_with(program, child, move |result| match result {
            Outcome::Ok(_) => {
                let meta = Rc::new(ScopeMetacommand {
                    scope: retained,
                    namespace,
                });
                if let Some(name) = &name {
                    defining.register_named_command(name, meta.clone());
                }
                Outcome::Ok(Value::Command(meta))
            }
            other => other,
        })
    }
}

/// The retained-scope metacommand: `eval`, `call`, and (for namespaces)
/// `import`.
struct ScopeMetacommand {
    scope: Scope,
    namespace: bool,
}

impl Command for ScopeMetacommand {
    fn execute(&self, args: &[Value], caller: &Scope) -> Outcome {
        if args.len() == 1 {
            return Outcome::Ok(args[0].clone());
        }
        let sub = match subcommand_name(&args[1]) {
            Ok(sub) => sub,
            Err(e) => return e.into(),
        };
        match sub.as_str() {
            "subcommands" => {
                let mut subcommands = vec![
                    Value::str("subcommands"),
                    Value::str("eval"),
                    Value::str("call"),
                ];
                if self.namespace {
                    subcommands.push(Value::str("import"));
                }
                Outcome::Ok(Value::list(subcommands))
            }
            "eval" => {
                if let Err(e) = check_arity(args, 2, Some(2), "eval body") {
                    return e.into();
                }
                match body_program(&self.scope, &args[2]) {
                    Ok(program) => Outcome::defer(program, self.scope.clone()),
                    Err(e) => e.into(),
                }
            }
            "call" => {
                if let Err(e) = check_arity(args, 2, None, "call cmdname ?arg ...?") {
                    return e.into();
                }
                let name = match args[2].string_repr() {
                    Some(name) => name,
                    None => return Outcome::error("invalid command name"),
                };
                let Some(command) = self.scope.resolve_named_command(&name) else {
                    return Outcome::error(format!("cannot resolve command \"{name}\""));
                };
                let mut sentence = vec![Value::Command(command)];
                sentence.extend(args[3..].iter().cloned());
                let program = crate::bytecode::Program::for_sentence(sentence);
                Outcome::defer(program, self.scope.clone())
            }
            "import" if self.namespace => {
                if let Err(e) = check_arity(args, 2, Some(2), "import name") {
                    return e.into();
                }
                let name = match args[2].string_repr() {
                    Some(name) => name,
                    None => return Outcome::error("invalid command name"),
                };
                let Some(command) = self.scope.resolve_local_command(&name) else {
                    return Outcome::error(format!("cannot resolve command \"{name}\""));
                };
                caller.register_named_command(&name, command);
                Outcome::Ok(Value::Nil)
            }
            _ => unknown_subcommand(&sub).into(),
        }
    }
}
