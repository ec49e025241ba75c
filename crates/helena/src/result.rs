//! The unified result-code protocol.
//!
//! Every operation in the engine — opcode execution, command invocation,
//! loop iteration, argument binding — produces an [`Outcome`]. Exceptional
//! codes propagate unchanged through enclosing computations until something
//! consumes them: a loop consumes BREAK/CONTINUE, a callable boundary
//! consumes RETURN, `catch` consumes whatever its handlers name, and YIELD
//! suspends the whole process until the host resumes it.

use std::{fmt, rc::Rc};

use smallvec::SmallVec;

use crate::{ast::SourcePosition, bytecode::Program, scope::Scope, value::Value};

/// The result codes of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ResultCode {
    Ok,
    Return,
    Yield,
    Error,
    Break,
    Continue,
    Custom,
}

/// Tag of the CUSTOM result produced by `pass`, recognized by `catch`
/// handler dispatch.
pub(crate) const PASS_TAG: &str = "pass";

/// A host-extensible result tag for the CUSTOM code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomCode(pub Rc<str>);

impl CustomCode {
    pub fn new(tag: impl Into<Rc<str>>) -> Self {
        Self(tag.into())
    }
}

/// One level of an error stack: the sentence that was executing when the
/// error crossed it.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorStackLevel {
    /// Source text of the program the sentence belongs to, if known.
    pub source: Option<Rc<str>>,
    /// Position of the sentence in that source.
    pub position: Option<SourcePosition>,
}

/// The payload of an ERROR result: a message value plus the stack of
/// enclosing sentences accumulated while the error surfaced.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    pub message: Value,
    pub stack: SmallVec<[ErrorStackLevel; 2]>,
}

impl EvalError {
    /// Builds an error from a message string.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Value::str(message.into()),
            stack: SmallVec::new(),
        }
    }

    /// Builds an error carrying an arbitrary message value.
    pub fn value(message: Value) -> Self {
        Self {
            message,
            stack: SmallVec::new(),
        }
    }

    /// Records the enclosing sentence an error surfaced through.
    pub fn push_level(&mut self, source: Option<Rc<str>>, position: Option<SourcePosition>) {
        self.stack.push(ErrorStackLevel { source, position });
    }

    /// Renders a multi-line report: the message, then one source excerpt per
    /// stack level that has a known position.
    pub fn report(&self) -> String {
        use std::fmt::Write;

        let mut out = format!("error: {}", self.message);
        for level in &self.stack {
            let Some(position) = level.position else { continue };
            let _ = write!(out, "\n  at {position}");
            if let Some(source) = &level.source
                && let Some(line) = source.lines().nth(position.line)
            {
                let _ = write!(out, "\n    {line}\n    {}^", " ".repeat(position.column));
            }
        }
        out
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for level in &self.stack {
            if let Some(position) = level.position {
                write!(f, "\n  at line {}, column {}", position.line + 1, position.column + 1)?;
            }
        }
        Ok(())
    }
}

/// The result of one operation.
///
/// `Defer` is the continuation marker of the protocol: a command returns it
/// to make the executor tail-transfer into a sub-program in the current
/// process and hand the sub-program's settled result to the attached
/// callback. Host commands use it through helpers like [`Outcome::defer`];
/// it never reaches the host from `Process::run`.
pub enum Outcome {
    /// Normal completion.
    Ok(Value),
    /// Unwind to the enclosing user-defined callable.
    Return(Value),
    /// Cooperative suspension; the process retains the resumption state.
    Yield(Value),
    /// Abnormal completion with an error value and stack.
    Error(EvalError),
    /// Terminate the enclosing loop.
    Break,
    /// Skip to the enclosing loop's next iteration.
    Continue,
    /// Host-extensible code.
    Custom(CustomCode, Value),
    /// Internal tail-transfer into a sub-program.
    Defer(Continuation),
}

/// A deferred transfer: the program to run, the scope to run it in, and an
/// optional callback computing the final result from the sub-program's
/// settled outcome. A callback may itself return another `Defer`, which is
/// how loops chain iterations without growing the native stack.
pub struct Continuation {
    pub(crate) program: Rc<Program>,
    pub(crate) scope: Scope,
    pub(crate) callback: Option<ContinuationCallback>,
}

pub(crate) type ContinuationCallback = Box<dyn FnOnce(Outcome) -> Outcome>;

impl Continuation {
    /// Builds a transfer with no result mapping.
    pub fn new(program: Rc<Program>, scope: Scope) -> Self {
        Self {
            program,
            scope,
            callback: None,
        }
    }

    /// Builds a transfer whose settled result is passed to `callback`.
    pub fn with_callback(
        program: Rc<Program>,
        scope: Scope,
        callback: impl FnOnce(Outcome) -> Outcome + 'static,
    ) -> Self {
        Self {
            program,
            scope,
            callback: Some(Box::new(callback)),
        }
    }
}

impl Outcome {
    /// Shorthand for an ERROR outcome with a message string.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(EvalError::message(message))
    }

    /// Shorthand for a deferred transfer without a callback.
    pub fn defer(program: Rc<Program>, scope: Scope) -> Self {
        Self::Defer(Continuation::new(program, scope))
    }

    /// Shorthand for a deferred transfer with a result callback.
    pub fn defer_with(
        program: Rc<Program>,
        scope: Scope,
        callback: impl FnOnce(Outcome) -> Outcome + 'static,
    ) -> Self {
        Self::Defer(Continuation::with_callback(program, scope, callback))
    }

    /// The result code of this outcome. `Defer` has no code of its own; it
    /// reports OK because it settles to whatever its sub-program produces.
    pub fn code(&self) -> ResultCode {
        match self {
            Self::Ok(_) | Self::Defer(_) => ResultCode::Ok,
            Self::Return(_) => ResultCode::Return,
            Self::Yield(_) => ResultCode::Yield,
            Self::Error(_) => ResultCode::Error,
            Self::Break => ResultCode::Break,
            Self::Continue => ResultCode::Continue,
            Self::Custom(_, _) => ResultCode::Custom,
        }
    }

    /// The value carried by this outcome, or nil for the value-less codes.
    pub fn value(&self) -> Value {
        match self {
            Self::Ok(v) | Self::Return(v) | Self::Yield(v) | Self::Custom(_, v) => v.clone(),
            Self::Error(e) => e.message.clone(),
            Self::Break | Self::Continue | Self::Defer(_) => Value::Nil,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Clones a settled (non-deferred) outcome.
    ///
    /// Only called on results that already crossed the executor, which
    /// materialises every `Defer` before handing results on.
    pub(crate) fn clone_settled(&self) -> Self {
        match self {
            Self::Ok(v) => Self::Ok(v.clone()),
            Self::Return(v) => Self::Return(v.clone()),
            Self::Yield(v) => Self::Yield(v.clone()),
            Self::Error(e) => Self::Error(e.clone()),
            Self::Break => Self::Break,
            Self::Continue => Self::Continue,
            Self::Custom(code, v) => Self::Custom(code.clone(), v.clone()),
            Self::Defer(_) => unreachable!("deferred outcome is not settled"),
        }
    }
}

impl From<EvalError> for Outcome {
    fn from(error: EvalError) -> Self {
        Self::Error(error)
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok(v) => f.debug_tuple("Ok").field(v).finish(),
            Self::Return(v) => f.debug_tuple("Return").field(v).finish(),
            Self::Yield(v) => f.debug_tuple("Yield").field(v).finish(),
            Self::Error(e) => f.debug_tuple("Error").field(e).finish(),
            Self::Break => write!(f, "Break"),
            Self::Continue => write!(f, "Continue"),
            Self::Custom(code, v) => f.debug_tuple("Custom").field(code).field(v).finish(),
            Self::Defer(_) => write!(f, "Defer(..)"),
        }
    }
}
