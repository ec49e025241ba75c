//! Declarative argument specifications.
//!
//! An argspec is an ordered list of slots built from a list, tuple, block, or
//! single name: `a` is required, `?b` optional, `*rest` (or bare `*`) the
//! remainder, `(name default)` optional with a default, and `(guard name)` /
//! `(guard name default)` attach a guard command invoked as `(guard value)`
//! on the bound value. Binding distributes provided arguments left to right,
//! groups the remainder into a tuple, and evaluates defaults and guards as
//! ordinary sub-computations.

use std::rc::Rc;

use crate::{
    bytecode::Program,
    process::run_nested,
    result::{EvalError, Outcome},
    scope::Scope,
    value::Value,
};

/// The binding behavior of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    Required,
    Optional,
    Remainder,
}

/// One declared argument.
#[derive(Debug, Clone)]
pub struct Argument {
    /// Slot name; empty for an anonymous `*` remainder.
    pub name: Rc<str>,
    pub kind: ArgumentKind,
    pub default: Option<Value>,
    pub guard: Option<Value>,
}

/// A parsed argument specification.
#[derive(Debug, Clone)]
pub struct Argspec {
    args: Vec<Argument>,
    nb_required: usize,
    nb_optional: usize,
    has_remainder: bool,
}

impl Argspec {
    /// Builds an argspec from a specifier value.
    pub fn from_value(value: &Value) -> Result<Self, EvalError> {
        let items: Vec<Value> = match value {
            Value::List(items) | Value::Tuple(items) => items.to_vec(),
            Value::Script(script) => script.to_values()?.to_vec(),
            Value::Str(_) => vec![value.clone()],
            _ => return Err(EvalError::message("invalid argument list")),
        };
        let mut args = Vec::with_capacity(items.len());
        for item in &items {
            args.push(Self::parse_argument(item)?);
        }
        let mut spec = Self {
            args,
            nb_required: 0,
            nb_optional: 0,
            has_remainder: false,
        };
        spec.validate()?;
        Ok(spec)
    }

    fn parse_argument(item: &Value) -> Result<Argument, EvalError> {
        match item {
            Value::Tuple(parts) | Value::List(parts) => match parts.as_slice() {
                [name, default] if is_name_value(name) => {
                    let (name, kind) = parse_name(name)?;
                    if kind == ArgumentKind::Remainder {
                        return Err(EvalError::message("cannot use default with remainder"));
                    }
                    Ok(Argument {
                        name,
                        kind: ArgumentKind::Optional,
                        default: Some(default.clone()),
                        guard: None,
                    })
                }
                [guard, name] => {
                    let (name, kind) = parse_name(name)?;
                    Ok(Argument {
                        name,
                        kind,
                        default: None,
                        guard: Some(guard.clone()),
                    })
                }
                [guard, name, default] => {
                    let (name, _) = parse_name(name)?;
                    Ok(Argument {
                        name,
                        kind: ArgumentKind::Optional,
                        default: Some(default.clone()),
                        guard: Some(guard.clone()),
                    })
                }
                _ => Err(EvalError::message(format!("invalid argument specifier \"{item}\""))),
            },
            _ => {
                let (name, kind) = parse_name(item)?;
                Ok(Argument {
                    name,
                    kind,
                    default: None,
                    guard: None,
                })
            }
        }
    }

    fn validate(&mut self) -> Result<(), EvalError> {
        for (i, arg) in self.args.iter().enumerate() {
            if !arg.name.is_empty() {
                let duplicate = self.args[..i].iter().any(|other| other.name == arg.name);
                if duplicate {
                    return Err(EvalError::message(format!("duplicate argument \"{}\"", arg.name)));
                }
            }
            match arg.kind {
                ArgumentKind::Required => self.nb_required += 1,
                ArgumentKind::Optional => self.nb_optional += 1,
                ArgumentKind::Remainder => {
                    if self.has_remainder {
                        return Err(EvalError::message("only one remainder argument is allowed"));
                    }
                    self.has_remainder = true;
                }
            }
        }
        Ok(())
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.args
    }

    pub fn nb_required(&self) -> usize {
        self.nb_required
    }

    pub fn nb_optional(&self) -> usize {
        self.nb_optional
    }

    pub fn has_remainder(&self) -> bool {
        self.has_remainder
    }

    /// The conventional usage string: `a ?b? ?rest ...?`.
    pub fn usage(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            let name = if arg.name.is_empty() { "arg" } else { &arg.name };
            match arg.kind {
                ArgumentKind::Required => parts.push(name.to_owned()),
                ArgumentKind::Optional => parts.push(format!("?{name}?")),
                ArgumentKind::Remainder => parts.push(format!("?{name} ...?")),
            }
        }
        parts.join(" ")
    }

    /// Checks the number of provided arguments against the declared slots.
    pub fn check_arity(&self, args: &[Value], skip: usize) -> bool {
        let given = args.len().saturating_sub(skip);
        given >= self.nb_required && (self.has_remainder || given <= self.nb_required + self.nb_optional)
    }

    /// Binds provided arguments to the declared slots in order.
    ///
    /// Optionals consume a value while more are provided than later slots
    /// require, the remainder groups whatever the trailing slots don't need,
    /// defaults are evaluated in `scope` (scripts run as sub-computations),
    /// and guards run as `(guard value)` with their OK result becoming the
    /// bound value. Any non-OK result from a default or guard — YIELD
    /// included — surfaces unchanged.
    pub fn apply_arguments(
        &self,
        scope: &Scope,
        args: &[Value],
        skip: usize,
        bind: &mut dyn FnMut(&str, Value) -> Result<(), EvalError>,
    ) -> Result<(), Outcome> {
        let values = &args[skip..];
        let total = values.len();
        let mut index = 0usize;
        for (slot, arg) in self.args.iter().enumerate() {
            // Slots after this one that are guaranteed to consume a value.
            let later_required = self.args[slot + 1..]
                .iter()
                .filter(|a| a.kind == ArgumentKind::Required)
                .count();
            match arg.kind {
                ArgumentKind::Required => {
                    let value = values[index].clone();
                    index += 1;
                    self.bind_one(scope, arg, value, bind)?;
                }
                ArgumentKind::Optional => {
                    let available = total - index;
                    if available > later_required {
                        let value = values[index].clone();
                        index += 1;
                        self.bind_one(scope, arg, value, bind)?;
                    } else if let Some(default) = &arg.default {
                        let value = eval_default(scope, default)?;
                        self.bind_one(scope, arg, value, bind)?;
                    }
                }
                ArgumentKind::Remainder => {
                    let later = self.args[slot + 1..].len();
                    let count = (total - index).saturating_sub(later);
                    let group: Vec<Value> = values[index..index + count].to_vec();
                    index += count;
                    if !arg.name.is_empty() {
                        self.bind_one(scope, arg, Value::tuple(group), bind)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn bind_one(
        &self,
        scope: &Scope,
        arg: &Argument,
        value: Value,
        bind: &mut dyn FnMut(&str, Value) -> Result<(), EvalError>,
    ) -> Result<(), Outcome> {
        let value = match &arg.guard {
            Some(guard) => {
                let program = Program::for_sentence(vec![guard.clone(), value]);
                match run_nested(program, scope) {
                    Outcome::Ok(v) => v,
                    other => return Err(other),
                }
            }
            None => value,
        };
        bind(&arg.name, value).map_err(Outcome::Error)
    }
}

/// Evaluates an optional's default: scripts run in the caller scope, plain
/// values bind as-is.
fn eval_default(scope: &Scope, default: &Value) -> Result<Value, Outcome> {
    match default {
        Value::Script(script) => {
            let program = scope.compile_script_value(script).map_err(Outcome::Error)?;
            match run_nested(program, scope) {
                Outcome::Ok(v) => Ok(v),
                other => Err(other),
            }
        }
        other => Ok(other.clone()),
    }
}

/// True when the value is a plain name token (a string), used to
/// disambiguate `(name default)` from `(guard name)` pairs.
fn is_name_value(value: &Value) -> bool {
    matches!(value, Value::Str(_))
}

/// Splits a name token into its binding name and kind, rejecting the invalid
/// forms.
fn parse_name(value: &Value) -> Result<(Rc<str>, ArgumentKind), EvalError> {
    let token = value
        .string_repr()
        .ok_or_else(|| EvalError::message(format!("invalid argument name \"{value}\"")))?;
    if token == "*" {
        return Ok((Rc::from(""), ArgumentKind::Remainder));
    }
    let (name, kind) = if let Some(rest) = token.strip_prefix('?') {
        (rest, ArgumentKind::Optional)
    } else if let Some(rest) = token.strip_prefix('*') {
        (rest, ArgumentKind::Remainder)
    } else {
        (token.as_str(), ArgumentKind::Required)
    };
    if name.is_empty() || name == "?" {
        return Err(EvalError::message(format!("invalid argument name \"{token}\"")));
    }
    Ok((Rc::from(name), kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(source: &str) -> Argspec {
        let script = crate::parse::parse(source).expect("parse");
        let value = Value::script(Rc::new(script), Some(Rc::from(source)));
        Argspec::from_value(&value).expect("argspec")
    }

    #[test]
    fn required_optional_remainder() {
        let spec = spec("a ?b *rest");
        assert_eq!(spec.nb_required(), 1);
        assert_eq!(spec.nb_optional(), 1);
        assert!(spec.has_remainder());
        assert_eq!(spec.usage(), "a ?b? ?rest ...?");
    }

    #[test]
    fn pair_with_default_is_optional() {
        let spec = spec("a (b val)");
        assert_eq!(spec.nb_required(), 1);
        assert_eq!(spec.nb_optional(), 1);
        assert_eq!(spec.arguments()[1].default, Some(Value::str("val")));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let script = crate::parse::parse("a a").expect("parse");
        let value = Value::script(Rc::new(script), None);
        assert!(Argspec::from_value(&value).is_err());
    }

    #[test]
    fn two_remainders_are_rejected() {
        let script = crate::parse::parse("*a *b").expect("parse");
        let value = Value::script(Rc::new(script), None);
        assert!(Argspec::from_value(&value).is_err());
    }

    #[test]
    fn arity_totality() {
        let spec = spec("a ?b");
        let args: Vec<Value> = (0..4).map(Value::Int).collect();
        assert!(!spec.check_arity(&args[..1], 1), "zero args, one required");
        assert!(spec.check_arity(&args[..2], 1), "exactly required");
        assert!(spec.check_arity(&args[..3], 1), "required plus optional");
        assert!(!spec.check_arity(&args[..4], 1), "too many");
    }
}
