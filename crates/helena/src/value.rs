//! Runtime value model.
//!
//! Values form a tagged union: small immediates (nil, booleans, numbers) are
//! stored inline while compound values (strings, lists, dictionaries, tuples,
//! scripts, commands) are shared behind counted handles. Cloning a `Value` is
//! always cheap and never copies payload data.

use std::{fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{
    ast::Script,
    bytecode::Program,
    command::CommandRef,
    result::EvalError,
    selector::Selector,
};

/// Largest integer magnitude that converts to an f64 and back without loss.
pub const SAFE_INTEGER_MAX: i64 = 9_007_199_254_740_992;

/// Dictionary payload: string keys to values.
///
/// Insertion order is preserved for iteration but is irrelevant for equality;
/// two dictionaries with the same entries compare equal regardless of the
/// order keys were added in.
pub type Dictionary = IndexMap<String, Value, ahash::RandomState>;

/// Primary value type of the evaluation engine.
///
/// All variants are immutable. Compound variants share their payload through
/// `Rc`, so values can be freely duplicated between scopes, frames, and
/// suspended processes.
#[derive(Clone)]
pub enum Value {
    /// The absence of a value.
    Nil,
    /// A boolean.
    Bool(bool),
    /// A signed 64-bit integer.
    Int(i64),
    /// A 64-bit float.
    Real(f64),
    /// An immutable character string.
    Str(Rc<str>),
    /// An ordered sequence of values.
    List(Rc<Vec<Value>>),
    /// A mapping from string keys to values.
    Dict(Rc<Dictionary>),
    /// An ordered, syntactic sequence of values.
    ///
    /// Tuples differ from lists in how the engine treats them: selectors
    /// propagate into each element, and a tuple in command position
    /// auto-expands into the sentence.
    Tuple(Rc<Vec<Value>>),
    /// A deferred script with its source text and compilation cache.
    Script(Rc<ScriptValue>),
    /// A first-class command.
    Command(CommandRef),
    /// A source value paired with a chain of pending selectors.
    Qualified(Rc<QualifiedValue>),
}

/// Value kind tags, used for dispatch and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    Nil,
    Boolean,
    Integer,
    Real,
    String,
    List,
    Dictionary,
    Tuple,
    Script,
    Command,
    Qualified,
}

/// A script value: parsed AST, optional original source, and a run-time cache.
///
/// The cache memoizes the compiled program and the flattened value list so a
/// script bound to a command body is compiled at most once. The cached program
/// is always equivalent to recompiling the AST.
#[derive(Debug)]
pub struct ScriptValue {
    /// The parsed AST.
    pub script: Rc<Script>,
    /// Original source text, when the script came from the parser.
    pub source: Option<Rc<str>>,
    cache: std::cell::RefCell<ScriptCache>,
}

#[derive(Debug, Default)]
struct ScriptCache {
    program: Option<Rc<Program>>,
    values: Option<Rc<Vec<Value>>>,
}

impl ScriptValue {
    pub fn new(script: Rc<Script>, source: Option<Rc<str>>) -> Self {
        Self {
            script,
            source,
            cache: std::cell::RefCell::new(ScriptCache::default()),
        }
    }

    /// Returns the cached compiled program, if any.
    pub fn cached_program(&self) -> Option<Rc<Program>> {
        self.cache.borrow().program.clone()
    }

    /// Stores the compiled program in the cache.
    pub fn cache_program(&self, program: Rc<Program>) {
        self.cache.borrow_mut().program = Some(program);
    }

    pub(crate) fn cached_values(&self) -> Option<Rc<Vec<Value>>> {
        self.cache.borrow().values.clone()
    }

    pub(crate) fn cache_values(&self, values: Rc<Vec<Value>>) {
        self.cache.borrow_mut().values = Some(values);
    }

    /// Flattens the script into its constant word values, memoized.
    ///
    /// Literals become strings, blocks become scripts, tuples recurse; words
    /// that need evaluation (substitutions, expressions) have no constant
    /// value and fail the conversion.
    pub fn to_values(&self) -> Result<Rc<Vec<Value>>, EvalError> {
        if let Some(values) = self.cached_values() {
            return Ok(values);
        }
        let mut values = Vec::new();
        for sentence in &self.script.sentences {
            for word in &sentence.words {
                values.push(word_to_value(word)?);
            }
        }
        let values = Rc::new(values);
        self.cache_values(Rc::clone(&values));
        Ok(values)
    }
}

/// Converts a constant word to its value, failing on words that require
/// evaluation.
pub(crate) fn word_to_value(word: &crate::ast::Word) -> Result<Value, EvalError> {
    use crate::ast::{Morpheme, Word};
    match word {
        Word::Value(value) => Ok(value.clone()),
        Word::Morphemes(morphemes) => match morphemes.as_slice() {
            [Morpheme::Literal { value, .. }] => Ok(Value::str(value.clone())),
            [Morpheme::Block { script, source, .. }] => {
                Ok(Value::script(Rc::clone(script), Some(Rc::clone(source))))
            }
            [Morpheme::Tuple { script, .. }] => {
                let mut values = Vec::new();
                for sentence in &script.sentences {
                    for word in &sentence.words {
                        values.push(word_to_value(word)?);
                    }
                }
                Ok(Value::tuple(values))
            }
            [Morpheme::HereString { value, .. }] | [Morpheme::TaggedString { value, .. }] => {
                Ok(Value::str(value.clone()))
            }
            [Morpheme::String { morphemes, .. }] => {
                let mut joined = String::new();
                for part in morphemes {
                    match part {
                        Morpheme::Literal { value, .. } => joined.push_str(value),
                        _ => return Err(EvalError::message("invalid list")),
                    }
                }
                Ok(Value::str(joined))
            }
            _ => Err(EvalError::message("invalid list")),
        },
    }
}

/// A value paired with the selectors that remain to be applied to it.
///
/// Qualified values are produced by qualified words (`name[index]`,
/// `name(key)`); the source is resolved and the chain applied left-to-right
/// when the value is finally used.
#[derive(Debug, Clone)]
pub struct QualifiedValue {
    pub source: Value,
    pub selectors: Vec<Selector>,
}

impl QualifiedValue {
    /// Appends a selector to the chain.
    ///
    /// Successive keyed selectors fold into a single keyed selector with the
    /// concatenated key list.
    pub fn with_selector(&self, selector: Selector) -> Self {
        let mut selectors = self.selectors.clone();
        match (selectors.last_mut(), &selector) {
            (Some(Selector::Keyed(prev)), Selector::Keyed(next)) => {
                prev.extend(next.iter().cloned());
            }
            _ => selectors.push(selector),
        }
        Self {
            source: self.source.clone(),
            selectors,
        }
    }
}

impl Value {
    /// Builds a string value.
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Self::Str(s.into())
    }

    /// Builds a list value.
    pub fn list(values: Vec<Self>) -> Self {
        Self::List(Rc::new(values))
    }

    /// Builds a tuple value.
    pub fn tuple(values: Vec<Self>) -> Self {
        Self::Tuple(Rc::new(values))
    }

    /// Builds a dictionary value.
    pub fn dict(entries: Dictionary) -> Self {
        Self::Dict(Rc::new(entries))
    }

    /// Builds a script value from a parsed AST.
    pub fn script(script: Rc<Script>, source: Option<Rc<str>>) -> Self {
        Self::Script(Rc::new(ScriptValue::new(script, source)))
    }

    /// Returns the kind tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Nil => ValueKind::Nil,
            Self::Bool(_) => ValueKind::Boolean,
            Self::Int(_) => ValueKind::Integer,
            Self::Real(_) => ValueKind::Real,
            Self::Str(_) => ValueKind::String,
            Self::List(_) => ValueKind::List,
            Self::Dict(_) => ValueKind::Dictionary,
            Self::Tuple(_) => ValueKind::Tuple,
            Self::Script(_) => ValueKind::Script,
            Self::Command(_) => ValueKind::Command,
            Self::Qualified(_) => ValueKind::Qualified,
        }
    }

    /// Returns the string representation of this value, if it has one.
    ///
    /// Nil and compound values have no string representation; using them where
    /// a string is required is a type error.
    pub fn string_repr(&self) -> Option<String> {
        match self {
            Self::Bool(b) => Some(if *b { "true".to_owned() } else { "false".to_owned() }),
            Self::Int(i) => Some(i.to_string()),
            Self::Real(r) => Some(format_real(*r)),
            Self::Str(s) => Some(s.to_string()),
            _ => None,
        }
    }

    /// Like [`string_repr`](Self::string_repr) but produces the conventional
    /// error when the value has none.
    pub fn as_string(&self) -> Result<String, EvalError> {
        self.string_repr()
            .ok_or_else(|| EvalError::message("value has no string representation"))
    }

    /// Coerces this value to a boolean.
    ///
    /// Accepts booleans and the literal strings `true` / `false`.
    pub fn as_bool(&self) -> Result<bool, EvalError> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Str(s) if &**s == "true" => Ok(true),
            Self::Str(s) if &**s == "false" => Ok(false),
            _ => Err(EvalError::message(format!("invalid boolean \"{self}\""))),
        }
    }

    /// Coerces this value to an integer.
    ///
    /// Accepts integers, reals with no fractional part inside the safe range,
    /// and strings in integer syntax.
    pub fn as_integer(&self) -> Result<i64, EvalError> {
        match self {
            Self::Int(i) => Ok(*i),
            Self::Real(r) => real_to_integer(*r)
                .ok_or_else(|| EvalError::message(format!("invalid integer \"{self}\""))),
            Self::Str(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| EvalError::message(format!("invalid integer \"{s}\""))),
            _ => Err(EvalError::message(format!("invalid integer \"{self}\""))),
        }
    }

    /// Coerces this value to a real.
    ///
    /// Integer sources must be within the safe range for lossless conversion.
    pub fn as_real(&self) -> Result<f64, EvalError> {
        match self {
            Self::Real(r) => Ok(*r),
            Self::Int(i) => integer_to_real(*i)
                .ok_or_else(|| EvalError::message(format!("invalid real \"{self}\""))),
            Self::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| EvalError::message(format!("invalid real \"{s}\""))),
            _ => Err(EvalError::message(format!("invalid real \"{self}\""))),
        }
    }

    /// Returns the script payload or the conventional `body must be a script`
    /// error.
    pub fn as_script(&self) -> Result<&Rc<ScriptValue>, EvalError> {
        match self {
            Self::Script(s) => Ok(s),
            _ => Err(EvalError::message("body must be a script")),
        }
    }

    /// True when this value is a number (integer or real).
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Real(_))
    }
}

/// Converts an integer to a real, failing outside the safe range.
pub fn integer_to_real(i: i64) -> Option<f64> {
    if i.abs() <= SAFE_INTEGER_MAX {
        Some(i as f64)
    } else {
        None
    }
}

/// Converts a real to an integer when the conversion is exact.
pub fn real_to_integer(r: f64) -> Option<i64> {
    if r.fract() == 0.0 && r.abs() <= SAFE_INTEGER_MAX as f64 {
        Some(r as i64)
    } else {
        None
    }
}

/// Formats a real the way the engine prints it.
fn format_real(r: f64) -> String {
    if r.is_finite() {
        let mut buffer = ryu::Buffer::new();
        buffer.format(r).to_owned()
    } else {
        r.to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            // IndexMap equality is order-insensitive, as required of
            // dictionaries.
            (Self::Dict(a), Self::Dict(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::Script(a), Self::Script(b)) => Rc::ptr_eq(&a.script, &b.script),
            (Self::Command(a), Self::Command(b)) => Rc::ptr_eq(a, b),
            (Self::Qualified(a), Self::Qualified(b)) => {
                a.source == b.source && a.selectors == b.selectors
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "Nil"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Real(r) => f.debug_tuple("Real").field(r).finish(),
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::List(values) => f.debug_tuple("List").field(values).finish(),
            Self::Dict(entries) => f.debug_tuple("Dict").field(entries).finish(),
            Self::Tuple(values) => f.debug_tuple("Tuple").field(values).finish(),
            Self::Script(script) => f.debug_tuple("Script").field(&script.source).finish(),
            Self::Command(_) => write!(f, "Command(..)"),
            Self::Qualified(q) => f.debug_tuple("Qualified").field(q).finish(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "[]"),
            Self::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Self::Int(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{}", format_real(*r)),
            Self::Str(s) => write!(f, "{s}"),
            Self::List(values) => {
                write!(f, "[list (")?;
                display_values(f, values)?;
                write!(f, ")]")
            }
            Self::Dict(entries) => {
                write!(f, "[dict (")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{key} {value}")?;
                }
                write!(f, ")]")
            }
            Self::Tuple(values) => {
                write!(f, "(")?;
                display_values(f, values)?;
                write!(f, ")")
            }
            Self::Script(script) => match &script.source {
                Some(source) => write!(f, "{{{source}}}"),
                None => write!(f, "{{}}"),
            },
            Self::Command(_) => write!(f, "<command>"),
            Self::Qualified(q) => {
                write!(f, "{}", q.source)?;
                for selector in &q.selectors {
                    write!(f, "{selector}")?;
                }
                Ok(())
            }
        }
    }
}

fn display_values(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{value}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_representations() {
        assert_eq!(Value::Bool(true).string_repr().as_deref(), Some("true"));
        assert_eq!(Value::Int(-3).string_repr().as_deref(), Some("-3"));
        assert_eq!(Value::str("x").string_repr().as_deref(), Some("x"));
        assert_eq!(Value::Nil.string_repr(), None);
        assert_eq!(Value::list(vec![]).string_repr(), None);
    }

    #[test]
    fn integer_real_conversion_is_lossless_only_in_the_safe_range() {
        assert_eq!(integer_to_real(SAFE_INTEGER_MAX), Some(SAFE_INTEGER_MAX as f64));
        assert_eq!(integer_to_real(SAFE_INTEGER_MAX + 1), None);
        assert_eq!(real_to_integer(3.0), Some(3));
        assert_eq!(real_to_integer(3.5), None);
        assert_eq!(real_to_integer(1e300), None);
    }

    #[test]
    fn boolean_coercion() {
        assert_eq!(Value::str("true").as_bool().unwrap(), true);
        assert_eq!(Value::str("false").as_bool().unwrap(), false);
        assert!(Value::str("yes").as_bool().is_err());
        assert!(Value::Int(1).as_bool().is_err());
    }

    #[test]
    fn dictionary_equality_is_order_insensitive() {
        let mut first = Dictionary::default();
        first.insert("a".to_owned(), Value::Int(1));
        first.insert("b".to_owned(), Value::Int(2));
        let mut second = Dictionary::default();
        second.insert("b".to_owned(), Value::Int(2));
        second.insert("a".to_owned(), Value::Int(1));
        assert_eq!(Value::dict(first), Value::dict(second));
    }

    #[test]
    fn tuple_display() {
        let tuple = Value::tuple(vec![Value::str("a"), Value::Int(1)]);
        assert_eq!(tuple.to_string(), "(a 1)");
    }

    #[test]
    fn keyed_selector_folding_on_qualified_values() {
        let base = QualifiedValue {
            source: Value::str("v"),
            selectors: vec![crate::selector::Selector::Keyed(vec![Value::str("a")])],
        };
        let folded = base.with_selector(crate::selector::Selector::Keyed(vec![Value::str("b")]));
        assert_eq!(folded.selectors.len(), 1, "keyed selectors fold: {:?}", folded.selectors);
    }
}
