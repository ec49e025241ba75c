//! Execution tracing hooks.
//!
//! A [`Tracer`] observes the executor as it decodes instructions and
//! dispatches sentences. The engine carries no global logger; hosts that
//! want visibility install a tracer on the process, the way the CLI does
//! behind `--trace`.

use crate::{bytecode::Opcode, value::Value};

/// Observer of process execution.
pub trait Tracer {
    /// Called before each instruction executes.
    fn on_opcode(&mut self, op: &Opcode, ip: usize) {
        let _ = (op, ip);
    }

    /// Called when a sentence is dispatched, with its head value.
    fn on_sentence(&mut self, head: &Value) {
        let _ = head;
    }
}

/// A tracer that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// A tracer that prints every instruction and sentence to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrTracer;

impl Tracer for StderrTracer {
    fn on_opcode(&mut self, op: &Opcode, ip: usize) {
        eprintln!("[{ip:>4}] {op:?}");
    }

    fn on_sentence(&mut self, head: &Value) {
        eprintln!("       >> {head}");
    }
}
