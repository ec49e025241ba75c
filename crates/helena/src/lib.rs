#![doc = include_str!("../../../README.md")]

mod argspec;
pub mod ast;
mod bytecode;
mod command;
mod commands;
mod parse;
mod process;
mod result;
mod scope;
mod selector;
pub mod tracer;
mod value;

pub use crate::{
    argspec::{Argspec, Argument, ArgumentKind},
    bytecode::{CompileError, Compiler, Opcode, Program},
    command::{arity_error, check_arity, Command, CommandRef},
    commands::register_core,
    parse::{parse, ParseError},
    process::Process,
    result::{Continuation, CustomCode, ErrorStackLevel, EvalError, Outcome, ResultCode},
    scope::Scope,
    selector::Selector,
    value::{Dictionary, QualifiedValue, ScriptValue, Value, ValueKind, SAFE_INTEGER_MAX},
};

/// Host-facing setup failures: source text that does not parse or compile.
///
/// Runtime failures are not errors in this sense; they are ERROR results of
/// the evaluation protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HelenaError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}
