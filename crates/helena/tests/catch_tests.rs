//! `catch`: outcome encoding, handler routing, `pass`, `finally`, and the
//! yield handler.

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
// Bare catch: tuple encoding
// =============================================================================

#[test]
fn bare_catch_encodes_ok() {
    assert_eq!(
        eval_ok("catch {idem fine}"),
        Value::tuple(vec![Value::str("ok"), Value::str("fine")]),
    );
}

#[test]
fn bare_catch_encodes_error() {
    assert_eq!(
        eval_ok("catch {error boom}"),
        Value::tuple(vec![Value::str("error"), Value::str("boom")]),
    );
}

#[test]
fn bare_catch_encodes_return() {
    assert_eq!(
        eval_ok("catch {return val}"),
        Value::tuple(vec![Value::str("return"), Value::str("val")]),
    );
}

/// `catch` consumes loose BREAK/CONTINUE instead of erroring.
#[test]
fn bare_catch_encodes_loop_codes() {
    assert_eq!(eval_ok("catch {break}"), Value::tuple(vec![Value::str("break")]));
    assert_eq!(eval_ok("catch {continue}"), Value::tuple(vec![Value::str("continue")]));
}

// =============================================================================
// Handler routing
// =============================================================================

/// The canonical return-handler scenario.
#[test]
fn return_handler_binds_the_value() {
    assert_eq!(
        eval_ok("catch {return val} return r {idem _$r_}"),
        Value::str("_val_"),
    );
}

#[test]
fn error_handler_binds_the_message() {
    assert_eq!(
        eval_ok("catch {error boom} error e {idem caught:$e}"),
        Value::str("caught:boom"),
    );
}

#[test]
fn break_handler_runs_without_binding() {
    assert_eq!(
        eval_ok("catch {break} break {idem stopped}"),
        Value::str("stopped"),
    );
}

/// With handlers present, an OK body result passes through untouched.
#[test]
fn ok_body_passes_through_handlers() {
    assert_eq!(eval_ok("catch {idem fine} error e {idem caught}"), Value::str("fine"));
}

/// A result with no matching handler surfaces unchanged.
#[test]
fn unmatched_results_surface() {
    assert_eq!(eval_error("catch {error boom} break {idem b}"), "boom");
}

/// `pass` re-raises the intercepted result.
#[test]
fn pass_reraises_the_original() {
    assert_eq!(eval_error("catch {error boom} error e {pass}"), "boom");
}

#[test]
fn pass_outside_a_handler_is_an_error() {
    assert_eq!(eval_error("pass"), "unexpected pass");
}

// =============================================================================
// finally
// =============================================================================

/// `finally` runs after the handler completes and the handler's result
/// stands.
#[test]
fn finally_runs_after_the_handler() {
    let scope = Scope::new_root();
    let result = scope
        .eval("catch {error boom} error e {idem handled} finally {set fin yes}")
        .unwrap();
    assert!(matches!(result, Outcome::Ok(ref v) if *v == Value::str("handled")), "got {result:?}");
    let fin = scope.eval("get fin").unwrap();
    assert!(matches!(fin, Outcome::Ok(ref v) if *v == Value::str("yes")), "got {fin:?}");
}

/// `finally` also runs when no handler matched.
#[test]
fn finally_runs_without_a_matching_handler() {
    let scope = Scope::new_root();
    let result = scope.eval("catch {idem fine} error e {idem caught} finally {set fin yes}").unwrap();
    assert!(matches!(result, Outcome::Ok(ref v) if *v == Value::str("fine")));
    let fin = scope.eval("exists fin").unwrap();
    assert!(matches!(fin, Outcome::Ok(Value::Bool(true))));
}

/// A handler that raises skips `finally` and its result surfaces.
#[test]
fn erroring_handler_skips_finally() {
    let scope = Scope::new_root();
    let result = scope
        .eval("catch {error a} error e {error b} finally {set fin yes}")
        .unwrap();
    assert!(matches!(result, Outcome::Error(ref e) if e.message == Value::str("b")), "got {result:?}");
    let fin = scope.eval("exists fin").unwrap();
    assert!(matches!(fin, Outcome::Ok(Value::Bool(false))), "finally must not have run");
}

/// A non-OK `finally` result overrides the pending one.
#[test]
fn finally_result_overrides() {
    assert_eq!(
        eval_error("catch {idem fine} error e {idem x} finally {error cleanup-failed}"),
        "cleanup-failed",
    );
}

// =============================================================================
// The yield handler
// =============================================================================

/// The yield handler intercepts the body's suspension; its OK result is
/// substituted back into the body as the yield expression's value.
#[test]
fn yield_handler_substitutes_into_the_body() {
    assert_eq!(
        eval_ok("catch {yield 1} yield v {idem [$v + 1]}"),
        Value::Int(2),
    );
}

/// Without a yield handler, the body's YIELD suspends the whole process.
#[test]
fn yield_without_handler_suspends() {
    let scope = Scope::new_root();
    let script = helena::parse("catch {yield ping} error e {idem x}").unwrap();
    let program = scope.compile(&script, None).unwrap();
    let mut process = scope.prepare_process(program);
    let paused = process.run();
    assert!(matches!(paused, Outcome::Yield(ref v) if *v == Value::str("ping")), "got {paused:?}");
    process.yield_back(Value::str("pong"));
    let done = process.run();
    assert!(matches!(done, Outcome::Ok(ref v) if *v == Value::str("pong")), "got {done:?}");
}
