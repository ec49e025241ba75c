//! The process executor.
//!
//! A process owns every piece of mutable state needed to evaluate a program:
//! the instruction pointer, the frame stack accumulating words under
//! construction, the result register, and a stack of pending continuations
//! for sub-programs entered through deferred transfers. Because all of that
//! state lives in the process rather than the native call stack, a YIELD at
//! any depth simply returns from [`Process::run`]; the host resumes with
//! [`Process::yield_back`] and the next `run()` continues exactly at the
//! suspension point.

use std::{fmt, rc::Rc};

use crate::{
    ast::SourcePosition,
    bytecode::{Opcode, Program},
    command::CommandRef,
    result::{ContinuationCallback, Continuation, EvalError, Outcome, PASS_TAG},
    scope::Scope,
    selector::Selector,
    tracer::Tracer,
    value::Value,
};

/// One frame of the value-accumulation stack: the word parts gathered so far
/// and the source position of the sentence being built.
#[derive(Debug)]
struct Frame {
    values: Vec<Value>,
    position: Option<SourcePosition>,
}

/// A suspended enclosing program: saved execution state plus the callback to
/// run when the sub-program that replaced it settles.
struct PendingFrame {
    program: Rc<Program>,
    scope: Scope,
    ip: usize,
    frames: Vec<Frame>,
    register: Value,
    callback: Option<ContinuationCallback>,
}

/// What to resume when the process was suspended by a YIELD.
enum Suspension {
    /// A command yielded from `execute`; its `resume` hook runs next.
    Command { command: CommandRef, scope: Scope },
    /// A continuation callback yielded; the substituted value becomes the
    /// pending sentence's result directly.
    Plain,
}

enum StepEvent {
    Running,
    Done(Outcome),
}

/// Resumable execution state for one program.
pub struct Process {
    program: Rc<Program>,
    scope: Scope,
    ip: usize,
    frames: Vec<Frame>,
    register: Value,
    pending: Vec<PendingFrame>,
    suspension: Option<Suspension>,
    resume_value: Option<Value>,
    finished: Option<Outcome>,
    /// When set, BREAK/CONTINUE/RETURN surface raw from the root instead of
    /// being converted; used by `catch` and other nested evaluations.
    raw_control: bool,
    tracer: Option<Box<dyn Tracer>>,
}

impl Process {
    /// Creates a process over a compiled program and a scope.
    pub fn new(program: Rc<Program>, scope: Scope) -> Self {
        Self {
            program,
            scope,
            ip: 0,
            frames: Vec::new(),
            register: Value::Nil,
            pending: Vec::new(),
            suspension: None,
            resume_value: None,
            finished: None,
            raw_control: false,
            tracer: None,
        }
    }

    /// Installs a tracer observing instruction decoding and sentence
    /// dispatch.
    pub fn set_tracer(&mut self, tracer: Box<dyn Tracer>) {
        self.tracer = Some(tracer);
    }

    /// Lets loose control codes (BREAK/CONTINUE, `pass`) surface raw from
    /// the root instead of converting to errors.
    pub(crate) fn retain_control_codes(&mut self) {
        self.raw_control = true;
    }

    /// True once the process settled on a final result.
    pub fn is_done(&self) -> bool {
        self.finished.is_some()
    }

    /// True while the process is suspended at a YIELD.
    pub fn is_suspended(&self) -> bool {
        self.suspension.is_some()
    }

    /// Substitutes `value` for the suspended expression's result; the next
    /// `run()` resumes with it.
    pub fn yield_back(&mut self, value: Value) {
        self.resume_value = Some(value);
    }

    /// Runs until the process settles or suspends.
    ///
    /// The returned outcome is never `Defer`; a `Yield` means the process is
    /// suspended and can be resumed, anything else is final.
    pub fn run(&mut self) -> Outcome {
        loop {
            match self.step_once() {
                StepEvent::Running => {}
                StepEvent::Done(outcome) => return outcome,
            }
        }
    }

    /// Executes a single instruction (or resumption step).
    ///
    /// Returns `None` while the process keeps running, `Some` when it
    /// produced a result — final, or a `Yield` suspension.
    pub fn step(&mut self) -> Option<Outcome> {
        match self.step_once() {
            StepEvent::Running => None,
            StepEvent::Done(outcome) => Some(outcome),
        }
    }

    fn step_once(&mut self) -> StepEvent {
        if let Some(finished) = &self.finished {
            return StepEvent::Done(finished.clone_settled());
        }
        if let Some(suspension) = self.suspension.take() {
            let value = self.resume_value.take().unwrap_or(Value::Nil);
            let outcome = match &suspension {
                Suspension::Command { command, scope } => command.resume(Outcome::Ok(value), scope),
                Suspension::Plain => Outcome::Ok(value),
            };
            let origin = match suspension {
                Suspension::Command { command, scope } => Some((command, scope)),
                Suspension::Plain => None,
            };
            return self.handle_outcome(outcome, origin, None);
        }
        if self.ip >= self.program.ops().len() {
            let result = Outcome::Ok(self.register.clone());
            return self.finish_program(result);
        }
        let op_ip = self.ip;
        let op = self.program.ops()[op_ip];
        self.ip += 1;
        if let Some(tracer) = &mut self.tracer {
            tracer.on_opcode(&op, op_ip);
        }
        match self.execute_op(op, op_ip) {
            Ok(Some(event)) => event,
            Ok(None) => StepEvent::Running,
            Err(error) => {
                let position = self.frames.last().and_then(|f| f.position);
                self.handle_outcome(Outcome::Error(error), None, position)
            }
        }
    }

    fn execute_op(&mut self, op: Opcode, op_ip: usize) -> Result<Option<StepEvent>, EvalError> {
        match op {
            Opcode::PushConstant(index) => {
                let value = self.program.constant(index).clone();
                self.current_frame().values.push(value);
            }
            Opcode::PushNil => self.current_frame().values.push(Value::Nil),
            Opcode::OpenFrame => {
                let position = self.program.position(op_ip);
                self.frames.push(Frame {
                    values: Vec::new(),
                    position,
                });
            }
            Opcode::CloseFrameTuple => {
                let frame = self.pop_frame();
                self.current_frame().values.push(Value::tuple(frame.values));
            }
            Opcode::CloseFrameString => {
                let frame = self.pop_frame();
                let mut joined = String::new();
                for value in &frame.values {
                    joined.push_str(&value.as_string()?);
                }
                self.current_frame().values.push(Value::str(joined));
            }
            Opcode::ResolveValue => {
                let value = self.pop_value();
                let resolved = self.scope.resolve_value(&value)?;
                self.current_frame().values.push(resolved);
            }
            Opcode::MakeQualified => {
                let source = self.pop_value();
                self.current_frame().values.push(Value::Qualified(
                    crate::value::QualifiedValue {
                        source,
                        selectors: Vec::new(),
                    }
                    .into(),
                ));
            }
            Opcode::SelectIndex => {
                let index = self.pop_value();
                let target = self.pop_value();
                let selected = Selector::Indexed(index).apply(&target)?;
                self.current_frame().values.push(selected);
            }
            Opcode::SelectKeys => {
                let keys = self.pop_frame().values;
                let target = self.pop_value();
                let selected = Selector::Keyed(keys).apply(&target)?;
                self.current_frame().values.push(selected);
            }
            Opcode::SelectRules => {
                let rules = self.pop_frame().values;
                let target = self.pop_value();
                let selected = Selector::Generic(rules).apply(&target)?;
                self.current_frame().values.push(selected);
            }
            Opcode::EvaluateSentence => return self.evaluate_sentence(),
            Opcode::PushResult => {
                let value = self.register.clone();
                self.current_frame().values.push(value);
            }
            Opcode::SubstituteResult(levels) => {
                let mut value = self.pop_value();
                for _ in 0..levels {
                    value = self.scope.resolve_value(&value)?;
                }
                self.current_frame().values.push(value);
            }
            Opcode::ExpandValue => {
                let value = self.pop_value();
                match value {
                    Value::Tuple(elements) | Value::List(elements) => {
                        self.current_frame().values.extend(elements.iter().cloned());
                    }
                    _ => return Err(EvalError::message("cannot expand value")),
                }
            }
        }
        Ok(None)
    }

    fn evaluate_sentence(&mut self) -> Result<Option<StepEvent>, EvalError> {
        let frame = self.pop_frame();
        let position = frame.position;
        let mut values = frame.values;
        // Auto-expansion: a tuple in command position splices its elements
        // into the sentence, recursively for nested leading tuples.
        while let Some(Value::Tuple(head)) = values.first().cloned() {
            values.splice(0..1, head.iter().cloned());
        }
        if values.is_empty() {
            return Ok(None);
        }
        let command = self.scope.resolve_command(&values[0])?;
        if let Some(tracer) = &mut self.tracer {
            tracer.on_sentence(&values[0]);
        }
        let outcome = command.execute(&values, &self.scope);
        let scope = self.scope.clone();
        Ok(Some(self.handle_outcome(outcome, Some((command, scope)), position)))
    }

    /// Routes a sentence-level outcome: OK stores the register, `Defer`
    /// transfers into the sub-program, YIELD suspends, and every other code
    /// terminates the current program and propagates.
    fn handle_outcome(
        &mut self,
        outcome: Outcome,
        origin: Option<(CommandRef, Scope)>,
        position: Option<SourcePosition>,
    ) -> StepEvent {
        match outcome {
            Outcome::Ok(value) => {
                self.register = value;
                StepEvent::Running
            }
            Outcome::Defer(continuation) => {
                self.push_pending(continuation);
                StepEvent::Running
            }
            Outcome::Yield(value) => {
                self.suspension = Some(match origin {
                    Some((command, scope)) => Suspension::Command { command, scope },
                    None => Suspension::Plain,
                });
                StepEvent::Done(Outcome::Yield(value))
            }
            Outcome::Error(mut error) => {
                error.push_level(self.program.source.clone(), position);
                self.finish_program(Outcome::Error(error))
            }
            other => self.finish_program(other),
        }
    }

    /// Suspends the current program behind a pending frame and enters the
    /// continuation's sub-program.
    fn push_pending(&mut self, continuation: Continuation) {
        let program = std::mem::replace(&mut self.program, continuation.program);
        let scope = std::mem::replace(&mut self.scope, continuation.scope);
        let frames = std::mem::take(&mut self.frames);
        let register = std::mem::replace(&mut self.register, Value::Nil);
        self.pending.push(PendingFrame {
            program,
            scope,
            ip: self.ip,
            frames,
            register,
            callback: continuation.callback,
        });
        self.ip = 0;
    }

    fn restore_pending(&mut self, entry: PendingFrame) {
        self.program = entry.program;
        self.scope = entry.scope;
        self.ip = entry.ip;
        self.frames = entry.frames;
        self.register = entry.register;
    }

    /// Completes the current program with `result` and unwinds pending
    /// frames until one consumes the result or the root is reached.
    fn finish_program(&mut self, result: Outcome) -> StepEvent {
        let mut result = result;
        loop {
            let Some(mut entry) = self.pending.pop() else {
                let final_result = if self.raw_control {
                    result
                } else {
                    convert_loose_codes(result)
                };
                self.finished = Some(final_result.clone_settled());
                return StepEvent::Done(final_result);
            };
            let mapped = match entry.callback.take() {
                Some(callback) => callback(result),
                None => result,
            };
            match mapped {
                Outcome::Defer(continuation) => {
                    // The callback chained another sub-program; the saved
                    // caller state stays pending underneath it.
                    self.pending.push(PendingFrame {
                        program: entry.program,
                        scope: entry.scope,
                        ip: entry.ip,
                        frames: entry.frames,
                        register: entry.register,
                        callback: continuation.callback,
                    });
                    self.program = continuation.program;
                    self.scope = continuation.scope;
                    self.ip = 0;
                    self.frames = Vec::new();
                    self.register = Value::Nil;
                    return StepEvent::Running;
                }
                Outcome::Ok(value) => {
                    self.restore_pending(entry);
                    self.register = value;
                    return StepEvent::Running;
                }
                Outcome::Yield(value) => {
                    self.restore_pending(entry);
                    self.suspension = Some(Suspension::Plain);
                    return StepEvent::Done(Outcome::Yield(value));
                }
                Outcome::Error(mut error) => {
                    let position = entry.frames.last().and_then(|f| f.position);
                    error.push_level(entry.program.source.clone(), position);
                    result = Outcome::Error(error);
                }
                other => result = other,
            }
        }
    }

    fn current_frame(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("opcode requires an open frame")
    }

    fn pop_frame(&mut self) -> Frame {
        self.frames.pop().expect("opcode requires an open frame")
    }

    fn pop_value(&mut self) -> Value {
        self.current_frame()
            .values
            .pop()
            .expect("opcode requires a value on the current frame")
    }
}

/// Runs a program to a settled result in a nested process.
///
/// Used for sub-computations that cannot stay inside the current process:
/// argspec defaults and guards. A YIELD from the nested run surfaces
/// unchanged; the suspended state is the nested process's own.
pub(crate) fn run_nested(program: Rc<Program>, scope: &Scope) -> Outcome {
    let mut process = Process::new(program, scope.clone());
    process.run()
}

/// Converts control codes that escaped every consumer into the conventional
/// errors.
fn convert_loose_codes(result: Outcome) -> Outcome {
    match result {
        Outcome::Break => Outcome::error("unexpected break"),
        Outcome::Continue => Outcome::error("unexpected continue"),
        Outcome::Custom(code, _) if &*code.0 == PASS_TAG => Outcome::error("unexpected pass"),
        other => other,
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("ip", &self.ip)
            .field("frames", &self.frames.len())
            .field("pending", &self.pending.len())
            .field("suspended", &self.suspension.is_some())
            .field("done", &self.finished.is_some())
            .finish()
    }
}
