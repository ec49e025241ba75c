//! Parser-output AST consumed by the compiler.
//!
//! A script is a list of sentences, a sentence a list of words, a word a list
//! of morphemes. The tree mirrors the surface syntax closely; all semantic
//! interpretation happens in the compiler, guided by the word classification
//! of [`SyntaxChecker`].

use std::{fmt, rc::Rc};

use crate::value::Value;

/// A position in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePosition {
    /// Character offset from the start of the source.
    pub index: usize,
    /// Zero-based line number.
    pub line: usize,
    /// Zero-based column number.
    pub column: usize,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line + 1, self.column + 1)
    }
}

/// A parsed script: a sequence of sentences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    pub sentences: Vec<Sentence>,
}

/// One command invocation at the source level.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    pub words: Vec<Word>,
    pub position: Option<SourcePosition>,
}

/// A word: either a parsed morpheme sequence or a pre-substituted value
/// injected by the engine (tail calls, ensemble dispatch).
#[derive(Debug, Clone, PartialEq)]
pub enum Word {
    Morphemes(Vec<Morpheme>),
    Value(Value),
}

/// The syntactic atoms words are made of.
#[derive(Debug, Clone, PartialEq)]
pub enum Morpheme {
    /// A bare literal: `word`.
    Literal { value: String, position: SourcePosition },
    /// A parenthesized tuple: `(a b c)`.
    Tuple { script: Script, position: SourcePosition },
    /// A braced block: `{…}`. Carries both the parsed subscript and the raw
    /// source text so block-backed scripts keep their original spelling.
    Block {
        script: Rc<Script>,
        source: Rc<str>,
        position: SourcePosition,
    },
    /// A bracketed expression: `[command …]`.
    Expression { script: Rc<Script>, position: SourcePosition },
    /// A quoted string: `"…"`, containing nested morphemes.
    String { morphemes: Vec<Morpheme>, position: SourcePosition },
    /// A raw multi-line string: `"""…"""`.
    HereString { value: String, position: SourcePosition },
    /// A tagged raw string: `""TAG … TAG""`-style delimited text.
    TaggedString { value: String, tag: String, position: SourcePosition },
    /// A `#` comment running to end of line.
    LineComment { value: String, position: SourcePosition },
    /// A `#{ … }#` comment, possibly nested.
    BlockComment { value: String, position: SourcePosition },
    /// A `$` substitution prefix. `levels` counts consecutive `$` signs;
    /// `expansion` is set for the `$*` splat form.
    SubstituteNext {
        expansion: bool,
        levels: usize,
        position: SourcePosition,
    },
}

impl Morpheme {
    pub fn position(&self) -> SourcePosition {
        match self {
            Self::Literal { position, .. }
            | Self::Tuple { position, .. }
            | Self::Block { position, .. }
            | Self::Expression { position, .. }
            | Self::String { position, .. }
            | Self::HereString { position, .. }
            | Self::TaggedString { position, .. }
            | Self::LineComment { position, .. }
            | Self::BlockComment { position, .. }
            | Self::SubstituteNext { position, .. } => *position,
        }
    }
}

/// Word classification produced by [`SyntaxChecker::check_word`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum WordKind {
    /// A single self-contained morpheme.
    Root,
    /// Adjacent parts joined into one string.
    Compound,
    /// A `$`-prefixed substitution, possibly with selectors.
    Substitution,
    /// A literal or tuple source followed by selectors.
    Qualified,
    /// A comment; contributes nothing to the sentence.
    Ignored,
    /// A sequence no rule accepts.
    Invalid,
}

/// Deterministic word classifier.
///
/// The decision is purely structural, over the morpheme sequence; it is part
/// of the parser/engine contract and the compiler follows it instruction for
/// instruction.
pub struct SyntaxChecker;

impl SyntaxChecker {
    /// Classifies a word.
    pub fn check_word(word: &Word) -> WordKind {
        let Word::Morphemes(morphemes) = word else {
            return WordKind::Root;
        };
        match morphemes.as_slice() {
            [] => WordKind::Invalid,
            [Morpheme::LineComment { .. }] | [Morpheme::BlockComment { .. }] => WordKind::Ignored,
            [only] => {
                if matches!(only, Morpheme::SubstituteNext { .. }) {
                    WordKind::Invalid
                } else {
                    WordKind::Root
                }
            }
            [Morpheme::SubstituteNext { .. }, ..] => Self::check_substitution(morphemes),
            [Morpheme::Literal { .. } | Morpheme::Tuple { .. }, rest @ ..]
                if Self::is_selector_suffix(rest) =>
            {
                WordKind::Qualified
            }
            _ => Self::check_compound(morphemes),
        }
    }

    /// True when every morpheme is a selector-shaped suffix (tuples for keys,
    /// expressions for indexes, blocks for rules).
    fn is_selector_suffix(morphemes: &[Morpheme]) -> bool {
        !morphemes.is_empty()
            && morphemes.iter().all(|m| {
                matches!(
                    m,
                    Morpheme::Tuple { .. } | Morpheme::Expression { .. } | Morpheme::Block { .. }
                )
            })
    }

    /// Validates a substitution word: `$`-prefix, then a selectable source,
    /// then an optional selector suffix.
    fn check_substitution(morphemes: &[Morpheme]) -> WordKind {
        let Some((Morpheme::SubstituteNext { .. }, rest)) = morphemes.split_first() else {
            return WordKind::Invalid;
        };
        let Some((source, selectors)) = rest.split_first() else {
            return WordKind::Invalid;
        };
        match source {
            Morpheme::Literal { .. }
            | Morpheme::Tuple { .. }
            | Morpheme::Block { .. }
            | Morpheme::Expression { .. } => {
                if selectors.is_empty() || Self::is_selector_suffix(selectors) {
                    WordKind::Substitution
                } else {
                    WordKind::Invalid
                }
            }
            _ => WordKind::Invalid,
        }
    }

    /// Validates a compound word: adjacent literals, strings, expressions,
    /// and substitution groups. Blocks and comments cannot appear inside a
    /// compound word.
    fn check_compound(morphemes: &[Morpheme]) -> WordKind {
        let mut i = 0;
        while i < morphemes.len() {
            match &morphemes[i] {
                Morpheme::Literal { .. } | Morpheme::String { .. } | Morpheme::Expression { .. } => {
                    i += 1;
                }
                Morpheme::SubstituteNext { expansion, .. } => {
                    // Expansion is only meaningful for a whole word.
                    if *expansion {
                        return WordKind::Invalid;
                    }
                    i += 1;
                    match morphemes.get(i) {
                        Some(
                            Morpheme::Literal { .. }
                            | Morpheme::Tuple { .. }
                            | Morpheme::Block { .. }
                            | Morpheme::Expression { .. },
                        ) => i += 1,
                        _ => return WordKind::Invalid,
                    }
                    // Selector suffix directly attached to the substitution.
                    while let Some(
                        Morpheme::Tuple { .. } | Morpheme::Expression { .. } | Morpheme::Block { .. },
                    ) = morphemes.get(i)
                    {
                        i += 1;
                    }
                }
                _ => return WordKind::Invalid,
            }
        }
        WordKind::Compound
    }
}

impl Script {
    /// Builds a script holding a single synthesized sentence of values.
    ///
    /// Used by commands that fabricate an invocation (aliases, tail calls,
    /// ensemble dispatch).
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            sentences: vec![Sentence {
                words: values.into_iter().map(Word::Value).collect(),
                position: None,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(value: &str) -> Morpheme {
        Morpheme::Literal {
            value: value.to_owned(),
            position: SourcePosition::default(),
        }
    }

    fn substitute(levels: usize) -> Morpheme {
        Morpheme::SubstituteNext {
            expansion: false,
            levels,
            position: SourcePosition::default(),
        }
    }

    fn tuple() -> Morpheme {
        Morpheme::Tuple {
            script: Script::default(),
            position: SourcePosition::default(),
        }
    }

    #[test]
    fn literal_word_is_root() {
        let word = Word::Morphemes(vec![literal("cmd")]);
        assert_eq!(SyntaxChecker::check_word(&word), WordKind::Root);
    }

    #[test]
    fn substitution_with_selector() {
        let word = Word::Morphemes(vec![substitute(1), literal("name"), tuple()]);
        assert_eq!(SyntaxChecker::check_word(&word), WordKind::Substitution);
    }

    #[test]
    fn literal_with_selector_is_qualified() {
        let word = Word::Morphemes(vec![literal("name"), tuple()]);
        assert_eq!(SyntaxChecker::check_word(&word), WordKind::Qualified);
    }

    #[test]
    fn adjacent_literal_and_substitution_is_compound() {
        let word = Word::Morphemes(vec![literal("pre"), substitute(1), literal("name")]);
        assert_eq!(SyntaxChecker::check_word(&word), WordKind::Compound);
    }

    #[test]
    fn lone_substitution_prefix_is_invalid() {
        let word = Word::Morphemes(vec![substitute(1)]);
        assert_eq!(SyntaxChecker::check_word(&word), WordKind::Invalid);
    }

    #[test]
    fn comment_is_ignored() {
        let word = Word::Morphemes(vec![Morpheme::LineComment {
            value: " note".to_owned(),
            position: SourcePosition::default(),
        }]);
        assert_eq!(SyntaxChecker::check_word(&word), WordKind::Ignored);
    }
}
