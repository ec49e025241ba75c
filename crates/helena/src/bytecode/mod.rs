//! Bytecode representation and compiler.
//!
//! Scripts compile to a flat instruction stream over a constant pool. The
//! stream has no jumps: control flow lives in commands and the executor's
//! continuation stack, so a program is a straight-line sequence of frame
//! operations, resolutions, selections, and sentence evaluations.

pub use compiler::{CompileError, Compiler};
pub use op::Opcode;
pub use program::{Program, ProgramBuilder};

mod compiler;
mod op;
mod program;
