//! `catch`: result interception and handler dispatch.
//!
//! Without handlers, `catch body` simply encodes the body's settled outcome
//! as a `(code ?value?)` tuple. With handlers it becomes a small state
//! machine: the body runs in a nested process so every result code —
//! including YIELD — can be intercepted; the selected handler runs in its
//! own nested process with the intercepted value bound as a local; `pass`
//! re-raises the original result; `finally` runs once after the handler's
//! final completion.
//!
//! Each invocation allocates its own machine behind a command value, which
//! the executor evaluates as a synthesized sentence; YIELDs from the body or
//! a handler suspend the outer process with the machine registered for
//! resumption.

use std::{cell::RefCell, rc::Rc};

use crate::{
    bytecode::Program,
    command::{arity_error, Command},
    process::Process,
    result::{EvalError, Outcome, PASS_TAG},
    scope::Scope,
    value::Value,
};

use super::body_program;

pub(super) fn register(scope: &Scope) {
    super::register(scope, "catch", Rc::new(CatchCommand));
}

const CATCH_USAGE: &str =
    "body ?return value handler? ?yield value handler? ?error message handler? ?break handler? ?continue handler? ?finally handler?";

struct CatchCommand;

#[derive(Default)]
struct Handlers {
    ret: Option<(String, Rc<Program>)>,
    yld: Option<(String, Rc<Program>)>,
    err: Option<(String, Rc<Program>)>,
    brk: Option<Rc<Program>>,
    cont: Option<Rc<Program>>,
    fin: Option<Rc<Program>>,
}

impl Handlers {
    fn is_empty(&self) -> bool {
        self.ret.is_none()
            && self.yld.is_none()
            && self.err.is_none()
            && self.brk.is_none()
            && self.cont.is_none()
            && self.fin.is_none()
    }
}

impl Command for CatchCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if args.len() < 2 {
            return arity_error(args, CATCH_USAGE).into();
        }
        let body = match body_program(scope, &args[1]) {
            Ok(program) => program,
            Err(e) => return e.into(),
        };
        let handlers = match parse_handlers(args, scope) {
            Ok(handlers) => handlers,
            Err(e) => return e.into(),
        };
        if handlers.is_empty() {
            // Bare catch: encode the settled outcome as a tuple.
            return Outcome::defer_with(body, scope.clone(), |result| Outcome::Ok(encode(result)));
        }
        let mut body_process = Process::new(body, scope.clone());
        body_process.retain_control_codes();
        let invocation: Rc<dyn Command> = Rc::new(CatchInvocation {
            inner: RefCell::new(CatchMachine {
                scope: scope.clone(),
                handlers,
                body: body_process,
                phase: Phase::Body,
            }),
        });
        let program = Program::for_sentence(vec![Value::Command(invocation)]);
        Outcome::defer(program, scope.clone())
    }
}

fn parse_handlers(args: &[Value], scope: &Scope) -> Result<Handlers, EvalError> {
    let mut handlers = Handlers::default();
    let mut i = 2;
    while i < args.len() {
        let keyword = args[i]
            .string_repr()
            .ok_or_else(|| EvalError::message("invalid keyword"))?;
        match keyword.as_str() {
            "return" | "yield" | "error" => {
                let (Some(name), Some(body)) = (args.get(i + 1), args.get(i + 2)) else {
                    return Err(arity_error(args, CATCH_USAGE));
                };
                let name = name
                    .string_repr()
                    .ok_or_else(|| EvalError::message("value has no string representation"))?;
                let program = body_program(scope, body)?;
                match keyword.as_str() {
                    "return" => handlers.ret = Some((name, program)),
                    "yield" => handlers.yld = Some((name, program)),
                    _ => handlers.err = Some((name, program)),
                }
                i += 3;
            }
            "break" | "continue" | "finally" => {
                let Some(body) = args.get(i + 1) else {
                    return Err(arity_error(args, CATCH_USAGE));
                };
                let program = body_program(scope, body)?;
                match keyword.as_str() {
                    "break" => handlers.brk = Some(program),
                    "continue" => handlers.cont = Some(program),
                    _ => handlers.fin = Some(program),
                }
                i += 2;
            }
            _ => return Err(EvalError::message(format!("invalid keyword \"{keyword}\""))),
        }
    }
    Ok(handlers)
}

/// Encodes a settled outcome as the bare-catch result tuple.
fn encode(result: Outcome) -> Value {
    match result {
        Outcome::Ok(v) => Value::tuple(vec![Value::str("ok"), v]),
        Outcome::Return(v) => Value::tuple(vec![Value::str("return"), v]),
        Outcome::Yield(v) => Value::tuple(vec![Value::str("yield"), v]),
        Outcome::Error(e) => Value::tuple(vec![Value::str("error"), e.message]),
        Outcome::Break => Value::tuple(vec![Value::str("break")]),
        Outcome::Continue => Value::tuple(vec![Value::str("continue")]),
        Outcome::Custom(code, v) => Value::tuple(vec![Value::str(code.0.to_string()), v]),
        Outcome::Defer(_) => unreachable!("settled results only"),
    }
}

/// Per-invocation catch machine, registered as the resumable command while
/// the body or a handler is suspended.
struct CatchInvocation {
    inner: RefCell<CatchMachine>,
}

struct CatchMachine {
    scope: Scope,
    handlers: Handlers,
    body: Process,
    phase: Phase,
}

enum Phase {
    /// The body is running; a resume value feeds the body process.
    Body,
    /// A handler is running. `original` is the intercepted result;
    /// `from_yield` marks the yield handler, whose OK result is substituted
    /// back into the body.
    Handler {
        original: Outcome,
        process: Process,
        from_yield: bool,
    },
    /// The finally clause is running; `result` surfaces after it completes.
    Finally { result: Outcome, process: Process },
    Done,
}

impl Command for CatchInvocation {
    fn execute(&self, _args: &[Value], _scope: &Scope) -> Outcome {
        self.advance(None)
    }

    fn resume(&self, result: Outcome, _scope: &Scope) -> Outcome {
        self.advance(Some(result.value()))
    }
}

impl CatchInvocation {
    fn advance(&self, resume: Option<Value>) -> Outcome {
        let mut inner = self.inner.borrow_mut();
        let mut resume = resume;
        loop {
            let phase = std::mem::replace(&mut inner.phase, Phase::Done);
            match phase {
                Phase::Body => {
                    if let Some(v) = resume.take() {
                        inner.body.yield_back(v);
                    }
                    let result = inner.body.run();
                    if let Outcome::Yield(value) = result {
                        if let Some((name, program)) = inner.handlers.yld.clone() {
                            let process = match start_handler(&inner.scope, &name, Some(value.clone()), &program) {
                                Ok(process) => process,
                                Err(e) => return e.into(),
                            };
                            inner.phase = Phase::Handler {
                                original: Outcome::Yield(value),
                                process,
                                from_yield: true,
                            };
                            continue;
                        }
                        inner.phase = Phase::Body;
                        return Outcome::Yield(value);
                    }
                    match inner.dispatch(result) {
                        Dispatched::Continue => {}
                        Dispatched::Return(outcome) => return outcome,
                    }
                }
                Phase::Handler {
                    original,
                    mut process,
                    from_yield,
                } => {
                    if let Some(v) = resume.take() {
                        process.yield_back(v);
                    }
                    let handler_result = process.run();
                    match handler_result {
                        Outcome::Yield(value) => {
                            inner.phase = Phase::Handler {
                                original,
                                process,
                                from_yield,
                            };
                            return Outcome::Yield(value);
                        }
                        Outcome::Custom(code, _) if &*code.0 == PASS_TAG => {
                            if from_yield {
                                // Re-yield the intercepted value; the next
                                // resume goes back into the body.
                                let value = original.value();
                                inner.phase = Phase::Body;
                                return Outcome::Yield(value);
                            }
                            return original;
                        }
                        Outcome::Ok(value) => {
                            if from_yield {
                                // The handler's result substitutes for the
                                // suspended expression inside the body.
                                inner.body.yield_back(value);
                                inner.phase = Phase::Body;
                                continue;
                            }
                            match inner.enter_finally(Outcome::Ok(value)) {
                                Dispatched::Continue => {}
                                Dispatched::Return(outcome) => return outcome,
                            }
                        }
                        // A non-OK handler result surfaces directly; finally
                        // is skipped in that case.
                        other => return other,
                    }
                }
                Phase::Finally { result, mut process } => {
                    if let Some(v) = resume.take() {
                        process.yield_back(v);
                    }
                    match process.run() {
                        Outcome::Yield(value) => {
                            inner.phase = Phase::Finally { result, process };
                            return Outcome::Yield(value);
                        }
                        Outcome::Ok(_) => return result,
                        other => return other,
                    }
                }
                Phase::Done => return Outcome::error("catch invocation already completed"),
            }
        }
    }
}

enum Dispatched {
    Continue,
    Return(Outcome),
}

impl CatchMachine {
    /// Routes a settled body result to its handler, the finally clause, or
    /// straight out.
    fn dispatch(&mut self, result: Outcome) -> Dispatched {
        let handler = match &result {
            Outcome::Return(v) => self
                .handlers
                .ret
                .clone()
                .map(|(name, program)| (Some((name, v.clone())), program)),
            Outcome::Error(e) => self
                .handlers
                .err
                .clone()
                .map(|(name, program)| (Some((name, e.message.clone())), program)),
            Outcome::Break => self.handlers.brk.clone().map(|program| (None, program)),
            Outcome::Continue => self.handlers.cont.clone().map(|program| (None, program)),
            _ => None,
        };
        match handler {
            Some((binding, program)) => {
                let (name, value) = match binding {
                    Some((name, value)) => (Some(name), Some(value)),
                    None => (None, None),
                };
                let process = match start_handler(&self.scope, name.as_deref().unwrap_or(""), value, &program) {
                    Ok(process) => process,
                    Err(e) => return Dispatched::Return(e.into()),
                };
                self.phase = Phase::Handler {
                    original: result,
                    process,
                    from_yield: false,
                };
                Dispatched::Continue
            }
            None => self.enter_finally(result),
        }
    }

    fn enter_finally(&mut self, result: Outcome) -> Dispatched {
        match self.handlers.fin.clone() {
            Some(program) => {
                let mut process = Process::new(program, self.scope.clone());
                process.retain_control_codes();
                self.phase = Phase::Finally { result, process };
                Dispatched::Continue
            }
            None => Dispatched::Return(result),
        }
    }
}

/// Builds a handler process: a child scope with the intercepted value bound
/// as a local under the declared name.
fn start_handler(
    scope: &Scope,
    name: &str,
    value: Option<Value>,
    program: &Rc<Program>,
) -> Result<Process, EvalError> {
    let handler_scope = scope.child_with_locals();
    if let Some(value) = value
        && !name.is_empty()
    {
        handler_scope.set_local(name, value)?;
    }
    let mut process = Process::new(Rc::clone(program), handler_scope);
    process.retain_control_codes();
    Ok(process)
}
