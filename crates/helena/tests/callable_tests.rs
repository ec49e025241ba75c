//! User-defined callables: argspec binding, metacommands, ensembles,
//! namespaces, aliases, and tail calls.

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
// Argument binding
// =============================================================================

/// One required and one defaulted optional: `m 1` binds the default,
/// `m 1 2 3` overflows.
#[test]
fn optional_with_default() {
    assert_eq!(
        eval_ok("macro m {a (?b val)} {idem $a:$b}\nm 1"),
        Value::str("1:val"),
    );
    assert_eq!(
        eval_ok("macro m {a (?b val)} {idem $a:$b}\nm 1 2"),
        Value::str("1:2"),
    );
    assert_eq!(
        eval_error("macro m {a (?b val)} {idem $a}\nm 1 2 3"),
        "wrong # args: should be \"m a ?b?\"",
    );
}

#[test]
fn missing_required_argument_is_an_arity_error() {
    assert_eq!(
        eval_error("macro m {a b} {idem $a}\nm 1"),
        "wrong # args: should be \"m a b\"",
    );
}

/// The remainder groups surplus arguments into a tuple.
#[test]
fn remainder_groups_into_a_tuple() {
    assert_eq!(
        eval_ok("macro m {a *rest} {idem $rest}\nm 1 2 3"),
        Value::tuple(vec![Value::str("2"), Value::str("3")]),
    );
    assert_eq!(
        eval_ok("macro m {a *rest} {idem $rest}\nm 1"),
        Value::tuple(vec![]),
    );
}

/// A script default is evaluated in the caller's scope at bind time.
#[test]
fn script_default_evaluates_in_caller_scope() {
    assert_eq!(
        eval_ok("set base 10\nmacro m {a (?b {+ $base 1})} {idem $b}\nm x"),
        Value::Int(11),
    );
}

/// A guard runs as `(guard value)` and its OK result becomes the bound
/// value. The argspec is passed as a tuple so the guard command value
/// substitutes at definition time.
#[test]
fn guard_transforms_the_bound_value() {
    assert_eq!(
        eval_ok("set double [[macro {v} {$v * 2}]]\nmacro m (($double x)) {idem $x}\nm 5"),
        Value::Int(10),
    );
}

// =============================================================================
// Callable semantics
// =============================================================================

/// RETURN unwinds exactly the body it appears in.
#[test]
fn return_unwinds_the_body() {
    assert_eq!(
        eval_ok("macro m {} {return early\nidem late}\nm"),
        Value::str("early"),
    );
}

/// Loose loop-control codes escaping a callable body become errors.
#[test]
fn loose_break_in_a_body_is_an_error() {
    assert_eq!(eval_error("macro m {} {break}\nm"), "unexpected break");
    assert_eq!(eval_error("proc p {} {continue}\np"), "unexpected continue");
}

/// A loop inside the body consumes its own control codes.
#[test]
fn loops_inside_bodies_consume_control_codes() {
    assert_eq!(
        eval_ok("macro m {} {list (a b c) foreach e {break}\nidem done}\nm"),
        Value::str("done"),
    );
}

/// `tailcall` evaluates its body and returns the result from the enclosing
/// callable.
#[test]
fn tailcall_returns_through_the_callable() {
    assert_eq!(
        eval_ok("macro m {} {tailcall {idem 42}\nidem unreachable}\nm"),
        Value::str("42"),
    );
}

#[test]
fn tailcall_accepts_a_tuple() {
    assert_eq!(
        eval_ok("macro m {} {tailcall (idem tupled)}\nm"),
        Value::str("tupled"),
    );
}

// =============================================================================
// Metacommands
// =============================================================================

#[test]
fn metacommand_exposes_argspec() {
    assert_eq!(
        eval_ok("set mc [macro {a (?b v)} {idem $a}]\n$mc argspec"),
        Value::str("a ?b?"),
    );
}

#[test]
fn metacommand_lists_subcommands() {
    assert_eq!(
        eval_ok("set mc [macro {} {idem x}]\n$mc subcommands"),
        Value::list(vec![Value::str("subcommands"), Value::str("argspec")]),
    );
}

/// Calling the metacommand with no argument unwraps the callable.
#[test]
fn metacommand_unwraps_to_the_command() {
    assert_eq!(
        eval_ok("set mc [macro {a} {idem $a}]\nset m [$mc]\n$m hi"),
        Value::str("hi"),
    );
}

#[test]
fn metacommand_rejects_unknown_subcommands() {
    assert_eq!(
        eval_error("set mc [macro {} {idem x}]\n$mc bogus"),
        "unknown subcommand \"bogus\"",
    );
}

#[test]
fn help_reports_the_signature() {
    assert_eq!(
        eval_ok("macro m {a (?b v)} {idem $a}\nhelp m"),
        Value::str("m a ?b?"),
    );
}

// =============================================================================
// Ensembles, namespaces, aliases
// =============================================================================

/// Ensemble dispatch: leading arguments bind first, tail arguments append.
#[test]
fn ensemble_dispatch() {
    assert_eq!(
        eval_ok("ensemble nums {x} {macro double {x} {$x * 2}}\nnums 5 double"),
        Value::Int(10),
    );
}

#[test]
fn ensemble_tail_arguments_append() {
    assert_eq!(
        eval_ok("ensemble nums {x} {macro plus {x y} {$x + $y}}\nnums 5 plus 3"),
        Value::Int(8),
    );
}

#[test]
fn ensemble_unknown_subcommand() {
    assert_eq!(
        eval_error("ensemble nums {x} {}\nnums 5 bogus"),
        "unknown subcommand \"bogus\"",
    );
}

#[test]
fn namespace_call_and_import() {
    assert_eq!(
        eval_ok("namespace ns {macro hi {} {idem hello}}\nns call hi"),
        Value::str("hello"),
    );
    assert_eq!(
        eval_ok("namespace ns {macro hi {} {idem hello}}\nns import hi\nhi"),
        Value::str("hello"),
    );
}

#[test]
fn namespace_eval_runs_in_the_namespace_scope() {
    assert_eq!(
        eval_ok("namespace ns {set v 5}\nns eval {get v}"),
        Value::str("5"),
    );
}

/// An alias expands to its target sentence with the call's arguments
/// appended.
#[test]
fn alias_expands_to_its_target() {
    assert_eq!(eval_ok("alias inc (+ 1)\ninc 2"), Value::Int(3));
}

#[test]
fn alias_metacommand_exposes_the_target() {
    assert_eq!(
        eval_ok("set a [alias inc (+ 1)]\n$a command"),
        Value::tuple(vec![Value::str("+"), Value::str("1")]),
    );
}
