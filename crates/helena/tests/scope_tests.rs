//! Scope semantics: constants, variables, locals, destructuring, and the
//! visibility rules that distinguish macros, closures, and procs.

use helena::{Outcome, Scope, Value};

fn eval(source: &str) -> Outcome {
    Scope::new_root()
        .eval(source)
        .expect("source should parse and compile")
}

fn eval_ok(source: &str) -> Value {
    match eval(source) {
        Outcome::Ok(value) => value,
        other => panic!("expected OK for {source:?}, got {other:?}"),
    }
}

fn eval_error(source: &str) -> String {
    match eval(source) {
        Outcome::Error(error) => error.message.to_string(),
        other => panic!("expected ERROR for {source:?}, got {other:?}"),
    }
}

// =============================================================================
// Constants and variables
// =============================================================================

#[test]
fn let_defines_a_constant() {
    assert_eq!(eval_ok("let c 9\nget c"), Value::str("9"));
}

/// Once defined, a constant rejects both redefinition and assignment.
#[test]
fn constants_are_immutable() {
    assert_eq!(eval_error("let c 1\nlet c 2"), "cannot redefine constant \"c\"");
    assert_eq!(eval_error("let c 1\nset c 2"), "cannot redefine constant \"c\"");
}

#[test]
fn constant_cannot_shadow_a_variable_in_place() {
    assert_eq!(
        eval_error("set v 1\nlet v 2"),
        "cannot define constant \"v\": variable already exists",
    );
}

#[test]
fn unset_removes_a_variable() {
    assert_eq!(eval_ok("set x 1\nunset x\nexists x"), Value::Bool(false));
    assert_eq!(eval_error("unset missing"), "no such variable \"missing\"");
    assert_eq!(eval_error("let c 1\nunset c"), "cannot unset constant \"c\"");
}

#[test]
fn exists_reports_visibility() {
    assert_eq!(eval_ok("set x 1\nexists x"), Value::Bool(true));
    assert_eq!(eval_ok("exists missing"), Value::Bool(false));
}

#[test]
fn get_with_default() {
    assert_eq!(eval_ok("get missing fallback"), Value::str("fallback"));
}

// =============================================================================
// Scoping across callables
// =============================================================================

/// A macro body sees the caller's variables (dynamic scoping).
#[test]
fn macro_reads_caller_variables() {
    assert_eq!(eval_ok("set x hello\nmacro m {} {get x}\nm"), Value::str("hello"));
}

/// A proc body cannot read a variable defined only in the caller's scope.
#[test]
fn proc_is_isolated_from_caller_variables() {
    assert_eq!(
        eval_error("set x hello\nproc p {} {get x}\np"),
        "no such variable \"x\"",
    );
}

/// A macro body mutates the caller's variables; a proc body's assignments
/// stay behind its barrier.
#[test]
fn macro_mutates_caller_proc_does_not() {
    assert_eq!(eval_ok("set x 1\nmacro m {} {set x 2}\nm\nget x"), Value::str("2"));
    assert_eq!(eval_ok("set x 1\nproc p {} {set x 2}\np\nget x"), Value::str("1"));
}

/// A closure captures its defining scope and keeps it alive after the
/// definer returns. (`[$f]` first unwraps the metacommand into the closure's
/// command value, which then heads the sentence.)
#[test]
fn closure_captures_defining_scope() {
    assert_eq!(
        eval_ok("proc make {} {set y 7\nclosure {} {get y}}\nset f [make]\n[$f]"),
        Value::str("7"),
    );
}

/// Closure assignments target the captured scope, so state persists across
/// calls.
#[test]
fn closure_state_persists_across_calls() {
    assert_eq!(
        eval_ok("proc make {} {set n 0\nclosure {} {set n [+ $n 1]}}\nset inc [make]\n[$inc]\n[$inc]\n[$inc]"),
        Value::Int(3),
    );
}

// =============================================================================
// Locals and destructuring
// =============================================================================

/// Argument bindings are locals: they shadow outer variables without
/// mutating them.
#[test]
fn argument_locals_shadow() {
    assert_eq!(
        eval_ok("set a outer\nmacro m {a} {get a}\nm inner\nget a"),
        Value::str("outer"),
    );
    assert_eq!(eval_ok("set a outer\nmacro m {a} {get a}\nm inner"), Value::str("inner"));
}

/// Tuple patterns destructure elementwise.
#[test]
fn foreach_destructures_tuples() {
    assert_eq!(
        eval_ok("list ((1 2) (3 4)) foreach (a b) {idem $a-$b}"),
        Value::str("3-4"),
    );
}

#[test]
fn destructuring_shape_mismatch_is_an_error() {
    assert_eq!(
        eval_error("list ((1 2)) foreach (a b c) {idem x}"),
        "bad value shape",
    );
}

/// An empty tuple pattern ignores the value.
#[test]
fn empty_pattern_ignores_values() {
    assert_eq!(eval_ok("list (a b) foreach () {idem ran}"), Value::str("ran"));
}

// =============================================================================
// Scope objects and teardown
// =============================================================================

#[test]
fn scope_command_retains_its_scope() {
    assert_eq!(eval_ok("scope s {set v 42}\ns eval {get v}"), Value::str("42"));
}

#[test]
fn scope_eval_can_mutate_the_retained_scope() {
    assert_eq!(
        eval_ok("scope s {set v 1}\ns eval {set v 9}\ns eval {get v}"),
        Value::str("9"),
    );
}

/// Dropping the command table breaks command/scope reference cycles; the
/// scope stops resolving commands afterwards.
#[test]
fn teardown_clears_the_command_table() {
    let scope = Scope::new_root();
    scope.eval("macro m {} {idem 1}").unwrap();
    scope.clear_commands_for_teardown();
    let result = scope.eval("m").unwrap();
    assert!(
        matches!(result, Outcome::Error(ref e) if e.message == Value::str("cannot resolve command \"m\"")),
        "got {result:?}"
    );
}
