//! Selectors over composite values.
//!
//! A selector extracts a sub-value from a value: indexed selectors address
//! strings and lists by position, keyed selectors address dictionaries, and
//! generic selectors carry opaque rules for value-defining extensions. Tuples
//! are transparent to every selector kind: applying a selector to a tuple
//! applies it to each element and rebuilds a tuple of the same arity.

use std::fmt;

use crate::{
    result::EvalError,
    value::{QualifiedValue, Value},
};

/// A single selection step.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Selects by integer position: `value[index]`.
    Indexed(Value),
    /// Selects by one or more string keys: `value(key1 key2 …)`.
    Keyed(Vec<Value>),
    /// Carries value-defined selection rules: `value{rule …}`.
    ///
    /// The core treats generic selectors structurally: they compose, fold
    /// into qualified chains, and propagate through tuples, but only values
    /// that define a rule interpreter can resolve them.
    Generic(Vec<Value>),
}

impl Selector {
    /// Applies this selector to a value.
    ///
    /// Tuples propagate elementwise; qualified values append the selector to
    /// their chain; everything else resolves according to the selector kind.
    pub fn apply(&self, value: &Value) -> Result<Value, EvalError> {
        match value {
            Value::Tuple(elements) => {
                let mut selected = Vec::with_capacity(elements.len());
                for element in elements.iter() {
                    selected.push(self.apply(element)?);
                }
                Ok(Value::tuple(selected))
            }
            Value::Qualified(q) => Ok(Value::Qualified(q.with_selector(self.clone()).into())),
            _ => match self {
                Self::Indexed(index) => apply_indexed(value, index),
                Self::Keyed(keys) => apply_keyed(value, keys),
                Self::Generic(_) => Err(EvalError::message(format!(
                    "cannot apply selector to {} value",
                    value.kind()
                ))),
            },
        }
    }
}

fn apply_indexed(value: &Value, index: &Value) -> Result<Value, EvalError> {
    let i = index.as_integer()?;
    match value {
        Value::Str(s) => {
            let c = usize::try_from(i).ok().and_then(|i| s.chars().nth(i));
            match c {
                Some(c) => Ok(Value::str(c.to_string())),
                None => Err(EvalError::message(format!("index out of range \"{i}\""))),
            }
        }
        Value::List(values) => usize::try_from(i)
            .ok()
            .and_then(|i| values.get(i).cloned())
            .ok_or_else(|| EvalError::message(format!("index out of range \"{i}\""))),
        _ => Err(EvalError::message(format!(
            "cannot apply selector to {} value",
            value.kind()
        ))),
    }
}

fn apply_keyed(value: &Value, keys: &[Value]) -> Result<Value, EvalError> {
    let mut current = value.clone();
    for key in keys {
        let name = key.as_string()?;
        match &current {
            Value::Dict(entries) => match entries.get(&name) {
                Some(v) => current = v.clone(),
                None => return Err(EvalError::message(format!("unknown key \"{name}\""))),
            },
            // A nested tuple re-enters full application so propagation is
            // preserved at every depth.
            Value::Tuple(_) | Value::Qualified(_) => {
                current = Selector::Keyed(vec![key.clone()]).apply(&current)?;
            }
            other => {
                return Err(EvalError::message(format!(
                    "cannot apply selector to {} value",
                    other.kind()
                )));
            }
        }
    }
    Ok(current)
}

/// Display forms mirror the source syntax: `[index]`, `(key …)`, `{rule …}`.
impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indexed(index) => write!(f, "[{index}]"),
            Self::Keyed(keys) => {
                write!(f, "(")?;
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{key}")?;
                }
                write!(f, ")")
            }
            Self::Generic(rules) => {
                write!(f, "{{")?;
                for (i, rule) in rules.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{rule}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Resolves a qualified value against concrete data: the chain applies
/// left-to-right to the given resolved source.
pub fn resolve_chain(source: Value, q: &QualifiedValue) -> Result<Value, EvalError> {
    let mut current = source;
    for selector in &q.selectors {
        current = selector.apply(&current)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_selection_on_lists_and_strings() {
        let list = Value::list(vec![Value::str("a"), Value::str("b")]);
        let selected = Selector::Indexed(Value::Int(1)).apply(&list).unwrap();
        assert_eq!(selected, Value::str("b"));

        let string = Value::str("hello");
        let selected = Selector::Indexed(Value::str("1")).apply(&string).unwrap();
        assert_eq!(selected, Value::str("e"));
    }

    #[test]
    fn out_of_range_index_errors() {
        let list = Value::list(vec![Value::str("a")]);
        let error = Selector::Indexed(Value::Int(3)).apply(&list).unwrap_err();
        assert_eq!(error.message, Value::str("index out of range \"3\""));
    }

    /// Applying a selector to a tuple applies it to every element and keeps
    /// the arity.
    #[test]
    fn tuple_propagation_is_elementwise() {
        let tuple = Value::tuple(vec![Value::str("ab"), Value::str("cd")]);
        let selected = Selector::Indexed(Value::Int(0)).apply(&tuple).unwrap();
        assert_eq!(selected, Value::tuple(vec![Value::str("a"), Value::str("c")]));
    }

    #[test]
    fn selector_on_a_qualified_value_appends() {
        let qualified = Value::Qualified(
            QualifiedValue {
                source: Value::str("v"),
                selectors: vec![Selector::Keyed(vec![Value::str("a")])],
            }
            .into(),
        );
        let extended = Selector::Keyed(vec![Value::str("b")]).apply(&qualified).unwrap();
        let Value::Qualified(q) = extended else { panic!("expected qualified") };
        // Successive keyed selectors fold into one concatenated key list.
        assert_eq!(q.selectors.len(), 1);
        assert_eq!(
            q.selectors[0],
            Selector::Keyed(vec![Value::str("a"), Value::str("b")]),
        );
    }

    #[test]
    fn generic_selectors_do_not_apply_to_scalars() {
        let error = Selector::Generic(vec![Value::str("rule")])
            .apply(&Value::Int(1))
            .unwrap_err();
        assert_eq!(error.message, Value::str("cannot apply selector to integer value"));
    }

    #[test]
    fn display_mirrors_source_syntax() {
        assert_eq!(Selector::Indexed(Value::Int(2)).to_string(), "[2]");
        assert_eq!(
            Selector::Keyed(vec![Value::str("a"), Value::str("b")]).to_string(),
            "(a b)",
        );
    }
}
