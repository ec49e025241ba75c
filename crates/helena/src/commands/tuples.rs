//! The tuple command: auto-expansion of tuples in command position.
//!
//! The executor splices leading tuples into the sentence before resolution;
//! this command implements the same rule for hosts that resolve a tuple head
//! through `Scope::resolve_command` directly.

use std::rc::Rc;

use crate::{
    command::{Command, CommandRef},
    result::Outcome,
    scope::Scope,
    value::Value,
};

/// The shared tuple-command instance.
pub(crate) fn tuple_command() -> CommandRef {
    thread_local! {
        static TUPLE: CommandRef = Rc::new(TupleCommand);
    }
    TUPLE.with(Clone::clone)
}

struct TupleCommand;

impl Command for TupleCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        let mut values = args.to_vec();
        while let Some(Value::Tuple(head)) = values.first().cloned() {
            values.splice(0..1, head.iter().cloned());
        }
        if values.is_empty() {
            return Outcome::Ok(Value::Nil);
        }
        let command = match scope.resolve_command(&values[0]) {
            Ok(command) => command,
            Err(e) => return e.into(),
        };
        command.execute(&values, scope)
    }
}
