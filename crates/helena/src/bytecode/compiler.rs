//! AST to bytecode compiler.
//!
//! Each sentence compiles to an open-frame / word-emission /
//! evaluate-sentence sequence; each word compiles according to its
//! [`SyntaxChecker`](crate::ast::SyntaxChecker) classification. The compiler
//! performs no evaluation and resolves no names; all binding is dynamic, at
//! execution time.

use std::rc::Rc;

use crate::{
    ast::{Morpheme, Script, Sentence, SourcePosition, SyntaxChecker, Word, WordKind},
    value::{ScriptValue, Value},
};

use super::{Opcode, Program, ProgramBuilder};

/// Compilation failures.
///
/// These are host-facing setup errors, distinct from runtime ERROR results.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("invalid word at {position}")]
    InvalidWord { position: SourcePosition },
    #[error("unexpected morpheme at {position}")]
    UnexpectedMorpheme { position: SourcePosition },
}

/// The script and word compiler.
pub struct Compiler;

impl Compiler {
    /// Compiles a script into a program.
    pub fn compile_script(script: &Script, source: Option<Rc<str>>) -> Result<Rc<Program>, CompileError> {
        let mut builder = ProgramBuilder::new(source);
        for sentence in &script.sentences {
            Self::compile_sentence(&mut builder, sentence)?;
        }
        Ok(Rc::new(builder.build()))
    }

    fn compile_sentence(builder: &mut ProgramBuilder, sentence: &Sentence) -> Result<(), CompileError> {
        // Sentences made only of comments evaluate nothing at all.
        let active = sentence
            .words
            .iter()
            .any(|word| SyntaxChecker::check_word(word) != WordKind::Ignored);
        if !active {
            return Ok(());
        }
        builder.set_position(sentence.position);
        builder.emit(Opcode::OpenFrame);
        for word in &sentence.words {
            Self::compile_word(builder, word)?;
        }
        builder.emit(Opcode::EvaluateSentence);
        builder.set_position(None);
        Ok(())
    }

    /// Compiles one word. Every word contributes exactly one value to the
    /// current frame, except expansions which may contribute any number.
    fn compile_word(builder: &mut ProgramBuilder, word: &Word) -> Result<(), CompileError> {
        let kind = SyntaxChecker::check_word(word);
        let Word::Morphemes(morphemes) = word else {
            let Word::Value(value) = word else { unreachable!() };
            let index = builder.add_constant(value.clone());
            builder.emit(Opcode::PushConstant(index));
            return Ok(());
        };
        match kind {
            WordKind::Root => Self::compile_root(builder, &morphemes[0]),
            WordKind::Compound => Self::compile_compound(builder, morphemes),
            WordKind::Substitution => Self::compile_substitution(builder, morphemes),
            WordKind::Qualified => Self::compile_qualified(builder, morphemes),
            WordKind::Ignored => Ok(()),
            WordKind::Invalid => Err(CompileError::InvalidWord {
                position: morphemes.first().map(Morpheme::position).unwrap_or_default(),
            }),
        }
    }

    fn compile_root(builder: &mut ProgramBuilder, morpheme: &Morpheme) -> Result<(), CompileError> {
        match morpheme {
            Morpheme::Literal { value, .. } => {
                let index = builder.add_constant(Value::str(value.clone()));
                builder.emit(Opcode::PushConstant(index));
                Ok(())
            }
            Morpheme::Tuple { script, .. } => Self::compile_tuple(builder, script),
            Morpheme::Block { script, source, .. } => {
                let value = Value::Script(Rc::new(ScriptValue::new(
                    Rc::clone(script),
                    Some(Rc::clone(source)),
                )));
                let index = builder.add_constant(value);
                builder.emit(Opcode::PushConstant(index));
                Ok(())
            }
            Morpheme::Expression { script, .. } => Self::compile_expression(builder, script),
            Morpheme::String { morphemes, .. } => Self::compile_string(builder, morphemes),
            Morpheme::HereString { value, .. } | Morpheme::TaggedString { value, .. } => {
                let index = builder.add_constant(Value::str(value.clone()));
                builder.emit(Opcode::PushConstant(index));
                Ok(())
            }
            other => Err(CompileError::UnexpectedMorpheme {
                position: other.position(),
            }),
        }
    }

    /// Tuple words gather every word of every inner sentence into one frame.
    fn compile_tuple(builder: &mut ProgramBuilder, script: &Script) -> Result<(), CompileError> {
        builder.emit(Opcode::OpenFrame);
        for sentence in &script.sentences {
            for word in &sentence.words {
                Self::compile_word(builder, word)?;
            }
        }
        builder.emit(Opcode::CloseFrameTuple);
        Ok(())
    }

    /// Expression words evaluate their sentences in place; the last
    /// sentence's result is pushed onto the current frame.
    fn compile_expression(builder: &mut ProgramBuilder, script: &Script) -> Result<(), CompileError> {
        if script.sentences.is_empty() {
            builder.emit(Opcode::PushNil);
            return Ok(());
        }
        for sentence in &script.sentences {
            Self::compile_sentence(builder, sentence)?;
        }
        builder.emit(Opcode::PushResult);
        Ok(())
    }

    fn compile_string(builder: &mut ProgramBuilder, morphemes: &[Morpheme]) -> Result<(), CompileError> {
        builder.emit(Opcode::OpenFrame);
        Self::compile_string_parts(builder, morphemes)?;
        builder.emit(Opcode::CloseFrameString);
        Ok(())
    }

    fn compile_string_parts(builder: &mut ProgramBuilder, morphemes: &[Morpheme]) -> Result<(), CompileError> {
        let mut i = 0;
        while i < morphemes.len() {
            match &morphemes[i] {
                Morpheme::Literal { value, .. } => {
                    let index = builder.add_constant(Value::str(value.clone()));
                    builder.emit(Opcode::PushConstant(index));
                    i += 1;
                }
                Morpheme::Expression { script, .. } => {
                    Self::compile_expression(builder, script)?;
                    i += 1;
                }
                Morpheme::String { morphemes, .. } => {
                    Self::compile_string(builder, morphemes)?;
                    i += 1;
                }
                Morpheme::SubstituteNext { .. } => {
                    i += Self::compile_substitution_group(builder, &morphemes[i..])?;
                }
                other => {
                    return Err(CompileError::UnexpectedMorpheme {
                        position: other.position(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Compound words join adjacent parts into one string.
    fn compile_compound(builder: &mut ProgramBuilder, morphemes: &[Morpheme]) -> Result<(), CompileError> {
        builder.emit(Opcode::OpenFrame);
        Self::compile_string_parts(builder, morphemes)?;
        builder.emit(Opcode::CloseFrameString);
        Ok(())
    }

    fn compile_substitution(builder: &mut ProgramBuilder, morphemes: &[Morpheme]) -> Result<(), CompileError> {
        let consumed = Self::compile_substitution_group(builder, morphemes)?;
        debug_assert_eq!(consumed, morphemes.len(), "substitution word fully consumed");
        Ok(())
    }

    /// Compiles one `$`-group: the prefix, its selectable source, and any
    /// directly attached selectors. Returns the number of morphemes consumed.
    fn compile_substitution_group(
        builder: &mut ProgramBuilder,
        morphemes: &[Morpheme],
    ) -> Result<usize, CompileError> {
        let Some((Morpheme::SubstituteNext { expansion, levels, position }, rest)) = morphemes.split_first()
        else {
            return Err(CompileError::UnexpectedMorpheme {
                position: morphemes.first().map(Morpheme::position).unwrap_or_default(),
            });
        };
        let Some((source, _)) = rest.split_first() else {
            return Err(CompileError::InvalidWord { position: *position });
        };
        let mut consumed = 2;
        match source {
            Morpheme::Literal { value, .. } => {
                let index = builder.add_constant(Value::str(value.clone()));
                builder.emit(Opcode::PushConstant(index));
                builder.emit(Opcode::ResolveValue);
            }
            Morpheme::Tuple { script, .. } => {
                Self::compile_tuple(builder, script)?;
                builder.emit(Opcode::ResolveValue);
            }
            Morpheme::Block { source, .. } => {
                // `${name}` resolves the block text as a variable name.
                let index = builder.add_constant(Value::str(Rc::clone(source)));
                builder.emit(Opcode::PushConstant(index));
                builder.emit(Opcode::ResolveValue);
            }
            Morpheme::Expression { script, .. } => {
                // `$[…]` substitutes the expression result; no resolution.
                Self::compile_expression(builder, script)?;
            }
            other => {
                return Err(CompileError::UnexpectedMorpheme {
                    position: other.position(),
                });
            }
        }
        consumed += Self::compile_selectors(builder, &morphemes[consumed..])?;
        if *levels > 1 {
            let extra = u8::try_from(levels - 1).unwrap_or(u8::MAX);
            builder.emit(Opcode::SubstituteResult(extra));
        }
        if *expansion {
            builder.emit(Opcode::ExpandValue);
        }
        Ok(consumed)
    }

    fn compile_qualified(builder: &mut ProgramBuilder, morphemes: &[Morpheme]) -> Result<(), CompileError> {
        let (source, selectors) = morphemes.split_first().expect("qualified word has a source");
        match source {
            Morpheme::Literal { value, .. } => {
                let index = builder.add_constant(Value::str(value.clone()));
                builder.emit(Opcode::PushConstant(index));
            }
            Morpheme::Tuple { script, .. } => Self::compile_tuple(builder, script)?,
            other => {
                return Err(CompileError::UnexpectedMorpheme {
                    position: other.position(),
                });
            }
        }
        builder.emit(Opcode::MakeQualified);
        Self::compile_selectors(builder, selectors)?;
        Ok(())
    }

    /// Compiles a run of selector morphemes applying to the value on top of
    /// the current frame. Returns the number of morphemes consumed.
    fn compile_selectors(builder: &mut ProgramBuilder, morphemes: &[Morpheme]) -> Result<usize, CompileError> {
        let mut consumed = 0;
        for morpheme in morphemes {
            match morpheme {
                // `value(key …)` — keyed selection.
                Morpheme::Tuple { script, .. } => {
                    builder.emit(Opcode::OpenFrame);
                    for sentence in &script.sentences {
                        for word in &sentence.words {
                            Self::compile_word(builder, word)?;
                        }
                    }
                    builder.emit(Opcode::SelectKeys);
                }
                // `value[expr]` — indexed selection by the expression result.
                Morpheme::Expression { script, .. } => {
                    Self::compile_expression(builder, script)?;
                    builder.emit(Opcode::SelectIndex);
                }
                // `value{rule …}` — generic selection; each sentence of the
                // block is one rule tuple.
                Morpheme::Block { script, .. } => {
                    builder.emit(Opcode::OpenFrame);
                    for sentence in &script.sentences {
                        builder.emit(Opcode::OpenFrame);
                        for word in &sentence.words {
                            Self::compile_word(builder, word)?;
                        }
                        builder.emit(Opcode::CloseFrameTuple);
                    }
                    builder.emit(Opcode::SelectRules);
                }
                _ => break,
            }
            consumed += 1;
        }
        Ok(consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn compile(source: &str) -> Rc<Program> {
        let script = parse::parse(source).expect("parse");
        Compiler::compile_script(&script, None).expect("compile")
    }

    #[test]
    fn sentences_compile_to_frame_evaluate_sequences() {
        let program = compile("cmd a b");
        assert_eq!(program.ops().first(), Some(&Opcode::OpenFrame));
        assert_eq!(program.ops().last(), Some(&Opcode::EvaluateSentence));
    }

    #[test]
    fn substitution_emits_a_resolve() {
        let program = compile("idem $x");
        assert!(program.ops().contains(&Opcode::ResolveValue), "{:?}", program.ops());
    }

    #[test]
    fn expansion_emits_expand_value() {
        let program = compile("idem $*t");
        assert!(program.ops().contains(&Opcode::ExpandValue), "{:?}", program.ops());
    }

    #[test]
    fn qualified_words_wrap_their_source() {
        let program = compile("get v(k)");
        assert!(program.ops().contains(&Opcode::MakeQualified), "{:?}", program.ops());
        assert!(program.ops().contains(&Opcode::SelectKeys), "{:?}", program.ops());
    }

    #[test]
    fn constants_are_deduplicated() {
        let program = compile("idem a\nidem a");
        let pushes: Vec<_> = program
            .ops()
            .iter()
            .filter_map(|op| match op {
                Opcode::PushConstant(index) => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(pushes, vec![0, 1, 0, 1], "both sentences reuse the same pool entries");
    }

    #[test]
    fn comment_only_sentences_emit_nothing() {
        let program = compile("# just a note");
        assert!(program.ops().is_empty(), "{:?}", program.ops());
    }

    #[test]
    fn sentence_positions_are_recorded() {
        let program = compile("cmd");
        assert!(program.position(0).is_some(), "OpenFrame carries the sentence position");
    }

    #[test]
    fn invalid_words_are_rejected() {
        let script = parse::parse("{b}x").expect("parse");
        let error = Compiler::compile_script(&script, None).unwrap_err();
        assert!(matches!(error, CompileError::InvalidWord { .. }), "{error:?}");
    }
}
