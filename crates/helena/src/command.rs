//! The command behavior interface.
//!
//! Commands stay a small trait rather than a sum type: the engine defines a
//! handful of implementations (control flow, loops, callables, ensembles)
//! and hosts can register their own. Everything else in the engine — values,
//! selectors, morphemes, result codes — is an enum with payloads.

use std::rc::Rc;

use crate::{
    result::{EvalError, Outcome},
    scope::Scope,
    value::Value,
};

/// Shared handle to a command behavior.
pub type CommandRef = Rc<dyn Command>;

/// A command: the only behavior interface of the engine.
///
/// `args` is the evaluated sentence, with `args[0]` holding the value the
/// command was invoked through (its name word or command value), mirroring
/// the argv convention.
pub trait Command {
    /// Executes the command against the evaluated sentence.
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome;

    /// Resumes the command after a YIELD it produced.
    ///
    /// `result` carries the value the host substituted for the suspended
    /// expression. The default implementation passes it through unchanged,
    /// which is the correct behavior for plain `yield`.
    fn resume(&self, result: Outcome, scope: &Scope) -> Outcome {
        let _ = scope;
        result
    }

    /// Returns help for the command, conventionally its usage signature.
    fn help(&self, args: &[Value], scope: &Scope) -> Outcome {
        let _ = scope;
        let name = args
            .first()
            .and_then(Value::string_repr)
            .unwrap_or_else(|| "<command>".to_owned());
        Outcome::error(format!("no help for command \"{name}\""))
    }
}

/// Checks that a sentence carries between `min` and `max` arguments after the
/// command word, producing the conventional arity error otherwise.
///
/// `usage` is the signature shown in the error, without the command name.
pub fn check_arity(args: &[Value], min: usize, max: Option<usize>, usage: &str) -> Result<(), EvalError> {
    let given = args.len().saturating_sub(1);
    if given < min || max.is_some_and(|max| given > max) {
        Err(arity_error(args, usage))
    } else {
        Ok(())
    }
}

/// Builds a `wrong # args` error for the given sentence and signature.
pub fn arity_error(args: &[Value], usage: &str) -> EvalError {
    let name = args
        .first()
        .and_then(Value::string_repr)
        .unwrap_or_else(|| "<command>".to_owned());
    if usage.is_empty() {
        EvalError::message(format!("wrong # args: should be \"{name}\""))
    } else {
        EvalError::message(format!("wrong # args: should be \"{name} {usage}\""))
    }
}
