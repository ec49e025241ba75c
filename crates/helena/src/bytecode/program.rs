//! Compiled programs and the builder that emits them.

use std::rc::Rc;

use crate::{ast::SourcePosition, value::Value};

use super::Opcode;

/// A compiled program: instruction stream, constant pool, and the source
/// positions used for error stacks.
#[derive(Debug, Default)]
pub struct Program {
    ops: Vec<Opcode>,
    constants: Vec<Value>,
    /// Source position per instruction, aligned with `ops`.
    positions: Vec<Option<SourcePosition>>,
    /// Source text the program was compiled from, if any.
    pub source: Option<Rc<str>>,
}

impl Program {
    pub fn ops(&self) -> &[Opcode] {
        &self.ops
    }

    pub fn constant(&self, index: u16) -> &Value {
        &self.constants[index as usize]
    }

    pub fn position(&self, ip: usize) -> Option<SourcePosition> {
        self.positions.get(ip).copied().flatten()
    }

    /// Synthesizes a program evaluating the given values as one sentence.
    ///
    /// Used for fabricated invocations: tail calls, aliases, ensemble
    /// dispatch, and tuple bodies.
    pub fn for_sentence(values: Vec<Value>) -> Rc<Self> {
        let mut builder = ProgramBuilder::new(None);
        builder.emit(Opcode::OpenFrame);
        for value in values {
            let index = builder.add_constant(value);
            builder.emit(Opcode::PushConstant(index));
        }
        builder.emit(Opcode::EvaluateSentence);
        Rc::new(builder.build())
    }
}

/// Emits opcodes and collects constants during compilation.
#[derive(Debug)]
pub struct ProgramBuilder {
    ops: Vec<Opcode>,
    constants: Vec<Value>,
    positions: Vec<Option<SourcePosition>>,
    current_position: Option<SourcePosition>,
    source: Option<Rc<str>>,
}

impl ProgramBuilder {
    pub fn new(source: Option<Rc<str>>) -> Self {
        Self {
            ops: Vec::new(),
            constants: Vec::new(),
            positions: Vec::new(),
            current_position: None,
            source,
        }
    }

    /// Sets the source position recorded for subsequently emitted
    /// instructions.
    pub fn set_position(&mut self, position: Option<SourcePosition>) {
        self.current_position = position;
    }

    pub fn emit(&mut self, op: Opcode) {
        self.ops.push(op);
        self.positions.push(self.current_position);
    }

    /// Adds a constant to the pool, reusing an existing equal entry.
    pub fn add_constant(&mut self, value: Value) -> u16 {
        if let Some(index) = self.constants.iter().position(|v| *v == value) {
            return u16::try_from(index).expect("constant pool exceeds u16 range");
        }
        let index = u16::try_from(self.constants.len()).expect("constant pool exceeds u16 range");
        self.constants.push(value);
        index
    }

    pub fn build(self) -> Program {
        Program {
            ops: self.ops,
            constants: self.constants,
            positions: self.positions,
            source: self.source,
        }
    }
}
