//! Conditionals and loops: `if`, `while`, `when`.
//!
//! All of these run their tests and bodies as deferred sub-programs and
//! chain iterations through continuation callbacks, so a YIELD anywhere
//! inside a test or body suspends the whole process and resumes mid-
//! iteration. No loop state lives on the native stack.

use std::rc::Rc;

use crate::{
    bytecode::Program,
    command::{arity_error, check_arity, Command},
    result::{EvalError, Outcome},
    scope::Scope,
    value::Value,
};

use super::body_program;

pub(super) fn register(scope: &Scope) {
    super::register(scope, "if", Rc::new(IfCommand));
    super::register(scope, "while", Rc::new(WhileCommand));
    super::register(scope, "when", Rc::new(WhenCommand));
}

/// A loop or conditional test: a literal value coerced to boolean, or a
/// script evaluated each time it is consulted.
enum Test {
    Value(Value),
    Program(Rc<Program>),
}

impl Test {
    fn from_value(scope: &Scope, value: &Value) -> Result<Self, EvalError> {
        match value {
            Value::Script(script) => Ok(Self::Program(scope.compile_script_value(script)?)),
            other => Ok(Self::Value(other.clone())),
        }
    }

    /// Evaluates the test and hands the boolean to `then`.
    ///
    /// A non-OK result from a script test — RETURN included — surfaces
    /// unchanged.
    fn evaluate(&self, scope: &Scope, then: impl FnOnce(bool) -> Outcome + 'static) -> Outcome {
        match self {
            Self::Value(value) => match value.as_bool() {
                Ok(b) => then(b),
                Err(e) => e.into(),
            },
            Self::Program(program) => {
                Outcome::defer_with(Rc::clone(program), scope.clone(), move |result| match result {
                    Outcome::Ok(value) => match value.as_bool() {
                        Ok(b) => then(b),
                        Err(e) => e.into(),
                    },
                    other => other,
                })
            }
        }
    }
}

/// `while test body` — loops while the test holds.
///
/// The loop result is the last OK body result; BREAK terminates the loop
/// with that value, CONTINUE skips to the next test.
struct WhileCommand;

struct WhileState {
    test: Test,
    body: Rc<Program>,
    scope: Scope,
}

impl Command for WhileCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 2, Some(2), "test body") {
            return e.into();
        }
        let test = match Test::from_value(scope, &args[1]) {
            Ok(test) => test,
            Err(e) => return e.into(),
        };
        let body = match body_program(scope, &args[2]) {
            Ok(body) => body,
            Err(e) => return e.into(),
        };
        let state = Rc::new(WhileState {
            test,
            body,
            scope: scope.clone(),
        });
        while_iteration(state, Value::Nil)
    }
}

fn while_iteration(state: Rc<WhileState>, last: Value) -> Outcome {
    let scope = state.scope.clone();
    let next = Rc::clone(&state);
    state.test.evaluate(&scope, move |holds| {
        if holds {
            while_body(next, last)
        } else {
            Outcome::Ok(last)
        }
    })
}

fn while_body(state: Rc<WhileState>, last: Value) -> Outcome {
    let body = Rc::clone(&state.body);
    let scope = state.scope.clone();
    Outcome::defer_with(body, scope, move |result| match result {
        Outcome::Ok(value) => while_iteration(state, value),
        Outcome::Break => Outcome::Ok(last),
        Outcome::Continue => while_iteration(state, last),
        other => other,
    })
}

/// `if test body ?elseif test body ...? ?else body?` — linear scan of
/// clauses; the first test that holds selects its body.
struct IfCommand;

const IF_USAGE: &str = "test body ?elseif test body ...? ?else body?";

impl Command for IfCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if args.len() < 3 {
            return arity_error(args, IF_USAGE).into();
        }
        // Parse the clause chain up front so malformed keywords fail before
        // anything runs.
        let mut clauses: Vec<(Option<Test>, Value)> = Vec::new();
        let mut i = 1;
        loop {
            let test = match Test::from_value(scope, &args[i]) {
                Ok(test) => test,
                Err(e) => return e.into(),
            };
            let Some(body) = args.get(i + 1) else {
                return arity_error(args, IF_USAGE).into();
            };
            clauses.push((Some(test), body.clone()));
            i += 2;
            match args.get(i).and_then(Value::string_repr) {
                None if i == args.len() => break,
                Some(keyword) if keyword == "elseif" => i += 1,
                Some(keyword) if keyword == "else" => {
                    let Some(body) = args.get(i + 1) else {
                        return arity_error(args, IF_USAGE).into();
                    };
                    if i + 2 != args.len() {
                        return arity_error(args, IF_USAGE).into();
                    }
                    clauses.push((None, body.clone()));
                    break;
                }
                _ => return arity_error(args, IF_USAGE).into(),
            }
        }
        if_clause(Rc::new(clauses), 0, scope.clone())
    }
}

fn if_clause(clauses: Rc<Vec<(Option<Test>, Value)>>, index: usize, scope: Scope) -> Outcome {
    let Some((test, body)) = clauses.get(index) else {
        return Outcome::Ok(Value::Nil);
    };
    let body = body.clone();
    match test {
        None => if_body(&scope, &body),
        Some(test) => {
            let next = Rc::clone(&clauses);
            let next_scope = scope.clone();
            test.evaluate(&scope, move |holds| {
                if holds {
                    if_body(&next_scope, &body)
                } else {
                    if_clause(next, index + 1, next_scope)
                }
            })
        }
    }
}

fn if_body(scope: &Scope, body: &Value) -> Outcome {
    match body_program(scope, body) {
        Ok(program) => Outcome::defer(program, scope.clone()),
        Err(e) => e.into(),
    }
}

/// `when ?command? {test body ... ?default?}` — like `if`, but the clause
/// list is one value and each test may be routed through a command:
/// a tuple test `(a b)` evaluates as `(command a b)`, any other test as
/// `(command test)`.
struct WhenCommand;

impl Command for WhenCommand {
    fn execute(&self, args: &[Value], scope: &Scope) -> Outcome {
        if let Err(e) = check_arity(args, 1, Some(2), "?command? {test body ... ?default?}") {
            return e.into();
        }
        let (command, cases_value) = if args.len() == 3 {
            (Some(args[1].clone()), &args[2])
        } else {
            (None, &args[1])
        };
        let cases: Vec<Value> = match cases_value {
            Value::Script(script) => match script.to_values() {
                Ok(values) => values.to_vec(),
                Err(e) => return e.into(),
            },
            Value::List(items) | Value::Tuple(items) => items.to_vec(),
            _ => return Outcome::error("invalid case list"),
        };
        when_case(Rc::new(WhenState { command, cases }), 0, scope.clone())
    }
}

struct WhenState {
    command: Option<Value>,
    cases: Vec<Value>,
}

fn when_case(state: Rc<WhenState>, index: usize, scope: Scope) -> Outcome {
    let Some(test) = state.cases.get(index).cloned() else {
        return Outcome::Ok(Value::Nil);
    };
    // An odd trailing entry is the default body.
    if index + 1 >= state.cases.len() {
        return when_body(&scope, &test);
    }
    let body = state.cases[index + 1].clone();
    let command = state.command.clone();
    match command {
        None => {
            let test = match Test::from_value(&scope, &test) {
                Ok(test) => test,
                Err(e) => return e.into(),
            };
            let next_scope = scope.clone();
            test.evaluate(&scope, move |holds| {
                if holds {
                    when_body(&next_scope, &body)
                } else {
                    when_case(state, index + 2, next_scope)
                }
            })
        }
        Some(command) => {
            let mut sentence = vec![command];
            match test {
                Value::Tuple(elements) => sentence.extend(elements.iter().cloned()),
                other => sentence.push(other),
            }
            let program = Program::for_sentence(sentence);
            let next_scope = scope.clone();
            Outcome::defer_with(program, scope, move |result| match result {
                Outcome::Ok(value) => match value.as_bool() {
                    Ok(true) => when_body(&next_scope, &body),
                    Ok(false) => when_case(state, index + 2, next_scope),
                    Err(e) => e.into(),
                },
                other => other,
            })
        }
    }
}

fn when_body(scope: &Scope, body: &Value) -> Outcome {
    match body {
        Value::Script(_) | Value::Tuple(_) => match body_program(scope, body) {
            Ok(program) => Outcome::defer(program, scope.clone()),
            Err(e) => e.into(),
        },
        other => Outcome::Ok(other.clone()),
    }
}
