//! End-to-end evaluation tests: words, substitutions, selectors, control
//! flow, and the type ensembles, all driven through source text against a
//! fresh root scope.

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
// Words and substitutions
// =============================================================================

/// A literal word evaluates to a string value.
#[test]
fn literal_is_a_string() {
    assert_eq!(eval_ok("idem hello"), Value::str("hello"));
}

#[test]
fn variable_substitution() {
    assert_eq!(eval_ok("set x 42\nidem $x"), Value::str("42"));
}

/// `$$name` resolves twice: the first resolution names the variable to read.
#[test]
fn double_substitution() {
    assert_eq!(eval_ok("set pointer x\nset x 42\nidem $$pointer"), Value::str("42"));
}

/// `$(a b)` resolves each name in the tuple, preserving the tuple shape.
#[test]
fn tuple_substitution_resolves_elementwise() {
    assert_eq!(
        eval_ok("set a 1\nset b 2\nidem $(a b)"),
        Value::tuple(vec![Value::str("1"), Value::str("2")]),
    );
}

#[test]
fn expression_substitution() {
    assert_eq!(eval_ok("set x [idem 7]\nget x"), Value::str("7"));
}

#[test]
fn string_interpolation() {
    assert_eq!(
        eval_ok("set name world\nidem \"hello, $name\""),
        Value::str("hello, world"),
    );
}

#[test]
fn string_with_expression_substitution() {
    assert_eq!(eval_ok("idem \"1+1=$[1 + 1]\""), Value::str("1+1=2"));
}

#[test]
fn compound_word_joins_parts() {
    assert_eq!(eval_ok("set x 42\nidem foo$x"), Value::str("foo42"));
}

#[test]
fn block_is_a_script_value() {
    assert_eq!(eval_ok("set b {idem 1}\neval $b"), Value::str("1"));
}

/// `$*t` splices the tuple's elements into the sentence.
#[test]
fn expansion_splices_tuple_elements() {
    assert_eq!(eval_ok("set t (1 2)\n+ $*t"), Value::Int(3));
}

#[test]
fn unknown_variable_is_an_error() {
    assert_eq!(eval_error("idem $missing"), "no such variable \"missing\"");
}

#[test]
fn unknown_command_is_an_error() {
    assert_eq!(eval_error("definitely-not-a-command"), "cannot resolve command \"definitely-not-a-command\"");
}

// =============================================================================
// Selectors
// =============================================================================

#[test]
fn list_index_selection() {
    assert_eq!(
        eval_ok("set v [list ((1 2) (3 4))]\nget $v[0]"),
        Value::tuple(vec![Value::str("1"), Value::str("2")]),
    );
}

#[test]
fn index_out_of_range() {
    assert_eq!(
        eval_error("set v [list (a b)]\nget $v[5]"),
        "index out of range \"5\"",
    );
}

#[test]
fn dictionary_key_selection() {
    assert_eq!(eval_ok("set d [dict (k 1)]\nidem $d(k)"), Value::str("1"));
}

#[test]
fn unknown_key_is_an_error() {
    assert_eq!(
        eval_error("set d [dict (k 1)]\nget $d(missing)"),
        "unknown key \"missing\"",
    );
}

/// A qualified word stays unresolved until `get` resolves it.
#[test]
fn qualified_word_resolution() {
    assert_eq!(eval_ok("set d [dict (k 7)]\nget d(k)"), Value::str("7"));
}

/// Selectors propagate into tuples elementwise, preserving arity.
#[test]
fn selector_propagates_through_tuples() {
    assert_eq!(
        eval_ok("set t (ab cd)\nidem $t[0]"),
        Value::tuple(vec![Value::str("a"), Value::str("c")]),
    );
}

#[test]
fn string_index_selection() {
    assert_eq!(eval_ok("set s hello\nidem $s[1]"), Value::str("e"));
}

// =============================================================================
// Numbers
// =============================================================================

/// Infix arithmetic folds strictly left to right; there is no precedence.
#[test]
fn arithmetic_is_left_to_right() {
    assert_eq!(eval_ok("1 + 2 * 3"), Value::Int(9));
}

#[test]
fn division_returns_integer_when_lossless() {
    assert_eq!(eval_ok("6 / 2"), Value::Int(3));
    assert_eq!(eval_ok("7 / 2"), Value::Real(3.5));
}

#[test]
fn division_by_zero_is_an_error() {
    assert_eq!(eval_error("1 / 0"), "division by zero");
}

#[test]
fn comparisons_return_booleans() {
    assert_eq!(eval_ok("1 < 2"), Value::Bool(true));
    assert_eq!(eval_ok("2.5 <= 2"), Value::Bool(false));
    assert_eq!(eval_ok("3 == 3.0"), Value::Bool(true));
}

#[test]
fn prefix_arithmetic() {
    assert_eq!(eval_ok("+ 1 2 3"), Value::Int(6));
    assert_eq!(eval_ok("- 5"), Value::Int(-5));
}

// =============================================================================
// Conditionals and loops
// =============================================================================

#[test]
fn if_selects_the_first_holding_clause() {
    assert_eq!(
        eval_ok("if {1 > 2} {idem a} elseif {2 > 1} {idem b} else {idem c}"),
        Value::str("b"),
    );
}

#[test]
fn if_without_matching_clause_is_nil() {
    assert_eq!(eval_ok("if false {idem a}"), Value::Nil);
}

/// The canonical counting loop: the loop result is the last body result and
/// the variable holds the final count.
#[test]
fn while_counts_to_three() {
    let scope = Scope::new_root();
    let result = scope.eval("set i 0\nwhile {$i < 3} {set i [+ $i 1]}").unwrap();
    assert!(matches!(result, Outcome::Ok(Value::Int(3))), "got {result:?}");
    let i = scope.eval("get i").unwrap();
    assert!(matches!(i, Outcome::Ok(Value::Int(3))), "got {i:?}");
}

/// BREAK settles the loop on the last completed iteration's result.
#[test]
fn while_break_keeps_last_result() {
    assert_eq!(
        eval_ok("set i 0\nwhile true {set i [+ $i 1]\nif {$i > 2} {break}\nidem $i}"),
        Value::Int(2),
    );
}

#[test]
fn when_routes_by_test() {
    assert_eq!(
        eval_ok("set x 2\nwhen {{$x == 1} {idem one} {$x == 2} {idem two} {idem other}}"),
        Value::str("two"),
    );
}

/// With a command, `when` evaluates each tuple test as `(command test…)`.
#[test]
fn when_with_command_prefix() {
    assert_eq!(
        eval_ok("set x 2\nwhen $x {(== 1) {idem one} (== 2) {idem two} {idem other}}"),
        Value::str("two"),
    );
}

#[test]
fn when_falls_through_to_default() {
    assert_eq!(
        eval_ok("set x 9\nwhen {{$x == 1} {idem one} {idem other}}"),
        Value::str("other"),
    );
}

// =============================================================================
// foreach
// =============================================================================

/// The loop result is the last body result.
#[test]
fn foreach_returns_last_body_result() {
    assert_eq!(eval_ok("list (a b c) foreach e {idem $e}"), Value::str("c"));
}

/// BREAK stops the iteration and the loop settles on nil.
#[test]
fn foreach_break_is_nil() {
    assert_eq!(
        eval_ok("list (a b c) foreach e {if {string $e == b} {break}\nidem $e}"),
        Value::Nil,
    );
}

#[test]
fn foreach_continue_skips() {
    assert_eq!(
        eval_ok("set acc _\nlist (a b c) foreach e {if {string $e == b} {continue}\nset acc $acc$e}\nget acc"),
        Value::str("_ac"),
    );
}

#[test]
fn dict_foreach_destructures_entries() {
    assert_eq!(
        eval_ok("dict (k 1) foreach (key val) {idem $key=$val}"),
        Value::str("k=1"),
    );
}

// =============================================================================
// Ensembles over strings, lists, dictionaries
// =============================================================================

#[test]
fn string_subcommands() {
    assert_eq!(eval_ok("string hello length"), Value::Int(5));
    assert_eq!(eval_ok("string hello at 1"), Value::str("e"));
    assert_eq!(eval_ok("string hello range 1 3"), Value::str("ell"));
    assert_eq!(eval_ok("string hello append \" world\""), Value::str("hello world"));
    assert_eq!(eval_ok("string hello remove 0 0"), Value::str("ello"));
    assert_eq!(eval_ok("string hello replace 0 0 j"), Value::str("jello"));
    assert_eq!(eval_ok("string abc == abc"), Value::Bool(true));
}

#[test]
fn string_index_errors() {
    assert_eq!(eval_error("string hi at 9"), "index out of range \"9\"");
    assert_eq!(eval_ok("string hi at 9 fallback"), Value::str("fallback"));
}

#[test]
fn list_subcommands() {
    assert_eq!(eval_ok("list (a b c) length"), Value::Int(3));
    assert_eq!(eval_ok("list (a b c) at 1"), Value::str("b"));
    assert_eq!(
        eval_ok("list (a b) append (c)"),
        Value::list(vec![Value::str("a"), Value::str("b"), Value::str("c")]),
    );
    assert_eq!(
        eval_ok("list (a c) insert 1 (b)"),
        Value::list(vec![Value::str("a"), Value::str("b"), Value::str("c")]),
    );
    assert_eq!(
        eval_ok("list (a b c) remove 0 1"),
        Value::list(vec![Value::str("c")]),
    );
}

#[test]
fn dict_subcommands() {
    assert_eq!(eval_ok("dict (a 1 b 2) length"), Value::Int(2));
    assert_eq!(eval_ok("dict (a 1 b 2) get b"), Value::str("2"));
    assert_eq!(eval_ok("dict (a 1) get missing fallback"), Value::str("fallback"));
    assert_eq!(eval_error("dict (a 1) get missing"), "unknown key \"missing\"");
}

/// Dictionaries with the same entries compare equal regardless of insertion
/// order.
#[test]
fn dictionary_equality_ignores_order() {
    let first = eval_ok("dict (a 1 b 2)");
    let second = eval_ok("dict (b 2 a 1)");
    assert_eq!(first, second, "entry order must not affect equality");
}

#[test]
fn unknown_subcommand_is_an_error() {
    assert_eq!(eval_error("list (a) frobnicate"), "unknown subcommand \"frobnicate\"");
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn error_command_raises() {
    assert_eq!(eval_error("error boom"), "boom");
}

/// Errors accumulate an error-stack level per enclosing sentence.
#[test]
fn errors_carry_a_stack() {
    let outcome = eval("error boom");
    let Outcome::Error(error) = outcome else {
        panic!("expected ERROR, got {outcome:?}");
    };
    assert!(!error.stack.is_empty(), "error should carry at least one stack level");
    assert!(
        error.stack[0].position.is_some(),
        "the sentence position should be recorded"
    );
}

#[test]
fn break_outside_a_loop_is_an_error() {
    assert_eq!(eval_error("break"), "unexpected break");
    assert_eq!(eval_error("continue"), "unexpected continue");
}

#[test]
fn return_surfaces_outside_callables() {
    let outcome = eval("return early");
    assert!(
        matches!(outcome, Outcome::Return(ref v) if *v == Value::str("early")),
        "got {outcome:?}"
    );
}
