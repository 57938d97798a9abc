/// Spec tests for the graph interpreter.
///
/// Programs run end-to-end — split, parse, lower, execute — against
/// injected stdin/stdout, so every assertion here is about observable
/// behavior: bytes on stdout or the error that stopped the run.
use std::cell::RefCell;
use std::io::{Cursor, Write};
use std::rc::Rc;

use vyra::graph::lower_program;
use vyra::interpreter::{Interpreter, RuntimeError};
use vyra::parser::parse_program;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn run_with_input(src: &str, input: &str) -> Result<String, RuntimeError> {
    let program = parse_program(src).expect("parse failed");
    let graph = lower_program(&program).expect("lower failed");

    let buf = SharedBuf::default();
    let mut interp = Interpreter::with_io(
        Box::new(Cursor::new(input.to_string())),
        Box::new(buf.clone()),
    );
    interp.run(&graph)?;

    let bytes = buf.0.borrow().clone();
    Ok(String::from_utf8(bytes).expect("output was not UTF-8"))
}

fn run(src: &str) -> String {
    run_with_input(src, "").expect("run failed")
}

fn run_err(src: &str) -> RuntimeError {
    run_with_input(src, "").expect_err("expected a runtime error")
}

// ---------------------------------------------------------------------------
// The seven canonical scenarios
// ---------------------------------------------------------------------------

#[test]
fn s1_hello_world() {
    assert_eq!(run("Display \"Hello, World!\"."), "Hello, World!\n");
}

#[test]
fn s2_arithmetic_with_assign() {
    assert_eq!(run("Set x to 5. Add 3 to x. Display x."), "8\n");
}

#[test]
fn s3_inline_if_else() {
    let src = "Set x to 7. If x is greater than 10, display \"big\". Otherwise display \"small\".";
    assert_eq!(run(src), "small\n");
}

#[test]
fn s4_while_countdown() {
    let src = "Set i to 3.\nWhile i is greater than 0:\n    Display i.\n    Decrement i.";
    assert_eq!(run(src), "3\n2\n1\n");
}

#[test]
fn s5_function_call_with_return() {
    let src = "Create function add that takes a and b:\n    Add a and b and store the result in s.\n    Return s.\nCall add with 4 and 5 and store in r.\nDisplay r.";
    assert_eq!(run(src), "9\n");
}

#[test]
fn s6_list_append_vs_arithmetic() {
    let src = "Create a list called xs with values [1, 2].\nAdd 3 to xs.\nSet n to 10.\nAdd 5 to n.\nDisplay xs.\nDisplay n.";
    assert_eq!(run(src), "[1, 2, 3]\n15\n");
}

#[test]
fn s7_division_by_zero() {
    let err = run_err("Set x to 1. Divide x by 0 and store in y.");
    assert!(matches!(err, RuntimeError::DivisionByZero));
    assert!(err.to_string().contains("DivisionByZero"));
    assert_eq!(err.exit_code(), 1);
}

// ---------------------------------------------------------------------------
// Display and stringification
// ---------------------------------------------------------------------------

#[test]
fn floats_always_show_a_fractional_digit() {
    assert_eq!(run("Set x to 1.0 plus 1.0. Display x."), "2.0\n");
    assert_eq!(run("Set x to 7 divided by 2.0. Display x."), "3.5\n");
}

#[test]
fn booleans_display_lowercase() {
    assert_eq!(run("Display 1 is equal to 1."), "true\n");
    assert_eq!(run("Display 1 is equal to 2."), "false\n");
}

#[test]
fn absent_displays_as_none() {
    assert_eq!(run("Create a variable called x. Display x."), "none\n");
}

#[test]
fn strings_inside_lists_are_quoted() {
    let src = "Create a list called xs with values [\"a\", 1].\nDisplay xs.";
    assert_eq!(run(src), "[\"a\", 1]\n");
}

#[test]
fn followed_by_stringifies_any_operand() {
    assert_eq!(
        run("Display \"n = \" followed by 4 followed by \"!\"."),
        "n = 4!\n"
    );
}

#[test]
fn string_concatenation_chain() {
    let src = "Set name to \"Alice\".\nSet greeting to \"Hello, \" followed by name followed by \"!\".\nDisplay greeting.";
    assert_eq!(run(src), "Hello, Alice!\n");
}

// ---------------------------------------------------------------------------
// Control flow
// ---------------------------------------------------------------------------

#[test]
fn nested_conditions() {
    let src = "Set age to 25.\nIf age is greater than or equal to 18:\n    If age is less than 65:\n        Display \"Adult\".\n    Otherwise:\n        Display \"Senior\".\nOtherwise:\n    Display \"Minor\".";
    assert_eq!(run(src), "Adult\n");
}

#[test]
fn elif_chain_picks_the_matching_arm() {
    let src = "Set x to 2.\nIf x is 1:\n    Display \"one\".\nOtherwise if x is 2:\n    Display \"two\".\nOtherwise:\n    Display \"many\".";
    assert_eq!(run(src), "two\n");
}

#[test]
fn while_accumulates() {
    let src = "Set i to 1.\nSet sum to 0.\nWhile i is less than or equal to 5:\n    Add i to sum.\n    Increment i.\nDisplay sum.";
    assert_eq!(run(src), "15\n");
}

#[test]
fn repeat_runs_exactly_n_times() {
    let src = "Set counter to 0.\nRepeat 5 times:\n    Increment counter.\nDisplay counter.";
    assert_eq!(run(src), "5\n");
}

#[test]
fn break_leaves_the_loop() {
    let src = "Set i to 0.\nWhile i is less than 10:\n    Increment i.\n    If i is equal to 5, stop the loop.\nDisplay i.";
    assert_eq!(run(src), "5\n");
}

#[test]
fn continue_skips_to_the_next_iteration() {
    let src = "Set total to 0.\nFor each n in [1, 2, 3, 4]:\n    If n modulo 2 is equal to 1, continue.\n    Add n to total.\nDisplay total.";
    assert_eq!(run(src), "6\n");
}

#[test]
fn continue_in_a_repeat_still_advances() {
    // The hidden counter increments at body entry, so continue cannot
    // turn a repeat into an infinite loop.
    let src = "Set hits to 0.\nRepeat 3 times:\n    Continue.\n    Increment hits.\nDisplay hits.";
    assert_eq!(run(src), "0\n");
}

#[test]
fn for_each_sums_a_list() {
    let src = "Create a list called numbers with values [1, 2, 3].\nSet sum to 0.\nFor each num in numbers:\n    Add num to sum.\nDisplay sum.";
    assert_eq!(run(src), "6\n");
}

#[test]
fn for_each_over_a_string_iterates_characters() {
    assert_eq!(run("For each c in \"abc\":\n    Display c."), "a\nb\nc\n");
}

#[test]
fn loop_variable_survives_the_loop() {
    let src = "For each n in [1, 2, 3]:\n    Set last to n.\nDisplay last.\nDisplay n.";
    assert_eq!(run(src), "3\n3\n");
}

#[test]
fn top_level_return_halts_the_program() {
    assert_eq!(run("Display 1.\nReturn.\nDisplay 2."), "1\n");
}

#[test]
fn loop_until_runs_while_false() {
    let src = "Set i to 0.\nLoop until i is equal to 3:\n    Increment i.\nDisplay i.";
    assert_eq!(run(src), "3\n");
}

// ---------------------------------------------------------------------------
// Functions and scope
// ---------------------------------------------------------------------------

#[test]
fn recursion_computes_factorial() {
    let src = "Create function fact that takes n:\n    If n is less than 2, return 1.\n    Call fact with n minus 1 and store in r.\n    Multiply n and r and store the result in p.\n    Return p.\nCall fact with 5 and store in f.\nDisplay f.";
    assert_eq!(run(src), "120\n");
}

#[test]
fn user_functions_work_in_expression_position() {
    let src = "Create function double that takes x:\n    Return x times 2.\nDisplay double(21).";
    assert_eq!(run(src), "42\n");
}

#[test]
fn function_without_return_yields_absent() {
    let src = "Create function noop that takes x:\n    Set y to x.\nCall noop with 1 and store in r.\nDisplay r.";
    assert_eq!(run(src), "none\n");
}

#[test]
fn function_locals_stay_local() {
    let src = "Create function f that takes x:\n    Set local to 1.\nCall f with 1.\nDisplay local.";
    assert!(matches!(run_err(src), RuntimeError::Name(_)));
}

#[test]
fn functions_see_globals() {
    let src = "Set g to 10.\nCreate function f that takes x:\n    Return g plus x.\nCall f with 5 and store in r.\nDisplay r.";
    assert_eq!(run(src), "15\n");
}

#[test]
fn assigning_an_existing_global_from_a_function_updates_it() {
    let src = "Set g to 1.\nCreate function f that takes x:\n    Set g to x.\nCall f with 9.\nDisplay g.";
    assert_eq!(run(src), "9\n");
}

#[test]
fn callers_locals_are_invisible_to_callees() {
    let src = "Create function outer that takes a:\n    Set hidden to 5.\n    Call inner with 1 and store in r.\n    Return r.\nCreate function inner that takes x:\n    Return hidden.\nCall outer with 1 and store in out.";
    assert!(matches!(run_err(src), RuntimeError::Name(_)));
}

#[test]
fn wrong_arity_is_an_arity_error() {
    let src = "Create function add that takes a and b:\n    Return a plus b.\nCall add with 1.";
    assert!(matches!(run_err(src), RuntimeError::Arity { .. }));
}

#[test]
fn calling_an_unknown_function_is_a_name_error() {
    assert!(matches!(
        run_err("Call ghost with 1."),
        RuntimeError::Name(_)
    ));
}

// ---------------------------------------------------------------------------
// Values, operators, built-ins
// ---------------------------------------------------------------------------

#[test]
fn lists_are_reference_shared() {
    let src = "Create a list called a with values [1].\nSet b to a.\nAdd 2 to a.\nDisplay b.";
    assert_eq!(run(src), "[1, 2]\n");
}

#[test]
fn list_indexing() {
    let src = "Create a list called xs with values [10, 20, 30].\nDisplay xs[1].";
    assert_eq!(run(src), "20\n");
}

#[test]
fn out_of_range_index_raises() {
    let src = "Create a list called xs with values [1].\nDisplay xs[5].";
    assert!(matches!(run_err(src), RuntimeError::Index { .. }));
}

#[test]
fn string_indexing_yields_a_character() {
    assert_eq!(run("Set s to \"hey\". Display s[1]."), "e\n");
}

#[test]
fn power_and_negative_exponents() {
    assert_eq!(run("Display 2 to the power of 10."), "1024\n");
    assert_eq!(run("Display 2 ** -1."), "0.5\n");
}

#[test]
fn modulo_truncates_toward_zero() {
    assert_eq!(run("Display -7 % 3."), "-1\n");
}

#[test]
fn float_division_by_zero_raises_too() {
    let err = run_err("Set x to 1.0 divided by 0.0.");
    assert!(matches!(err, RuntimeError::DivisionByZero));
}

#[test]
fn adding_number_and_text_is_a_type_error() {
    assert!(matches!(
        run_err("Set x to 1 plus \"a\"."),
        RuntimeError::Type(_)
    ));
}

#[test]
fn undefined_variable_is_a_name_error() {
    assert!(matches!(run_err("Display ghost."), RuntimeError::Name(_)));
}

#[test]
fn string_comparison_is_lexicographic() {
    assert_eq!(run("Display \"abc\" is less than \"abd\"."), "true\n");
}

#[test]
fn builtin_length_and_case() {
    assert_eq!(run("Display length(\"hello\")."), "5\n");
    assert_eq!(run("Display the length of \"hello\"."), "5\n");
    assert_eq!(run("Display uppercase(\"abc\")."), "ABC\n");
    assert_eq!(run("Display lowercase(\"ABC\")."), "abc\n");
}

#[test]
fn builtin_split_and_join() {
    assert_eq!(
        run("Set parts to split(\"a,b\", \",\"). Display parts."),
        "[\"a\", \"b\"]\n"
    );
    assert_eq!(
        run("Create a list called xs with values [1, 2]. Display join(xs, \"-\")."),
        "1-2\n"
    );
}

#[test]
fn builtin_type_of_and_conversions() {
    assert_eq!(run("Display type_of(3.5)."), "float\n");
    assert_eq!(run("Display type_of(\"hi\")."), "text\n");
    assert_eq!(run("Display int(\"42\") plus 1."), "43\n");
    assert_eq!(run("Display round(2.6)."), "3\n");
    assert_eq!(run("Display abs(-4)."), "4\n");
}

#[test]
fn builtins_check_their_argument_types() {
    assert!(matches!(
        run_err("Display length(5)."),
        RuntimeError::Type(_)
    ));
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[test]
fn ask_for_number_parses_and_prompts() {
    let src = "Ask the user for a number called n.\nDisplay n plus 1.";
    let out = run_with_input(src, "41\n").expect("run failed");
    assert_eq!(out, "Enter n: 42\n");
}

#[test]
fn ask_for_text_keeps_the_line_verbatim() {
    let src = "Ask the user for their name.\nDisplay \"hi \" followed by name.";
    let out = run_with_input(src, "Ada\n").expect("run failed");
    assert!(out.ends_with("hi Ada\n"));
}

#[test]
fn non_numeric_input_for_a_number_is_an_error() {
    let src = "Get a number from the user and store it in n.";
    let err = run_with_input(src, "abc\n").expect_err("expected input error");
    assert!(matches!(err, RuntimeError::Input(_)));
}

#[test]
fn end_of_input_is_an_error() {
    let err = run_with_input("Ask the user for their name.", "").unwrap_err();
    assert!(matches!(err, RuntimeError::Input(_)));
}

// ---------------------------------------------------------------------------
// Watchdog and determinism
// ---------------------------------------------------------------------------

#[test]
fn runaway_loop_hits_the_iteration_limit() {
    let src = "While 1 is equal to 1:\n    Set x to 1.";
    let program = parse_program(src).expect("parse failed");
    let graph = lower_program(&program).expect("lower failed");

    let buf = SharedBuf::default();
    let mut interp = Interpreter::with_io(
        Box::new(Cursor::new(String::new())),
        Box::new(buf.clone()),
    );
    interp.set_iteration_limit(50);
    let err = interp.run(&graph).expect_err("expected the watchdog");
    assert!(matches!(err, RuntimeError::IterationLimit(50)));
}

#[test]
fn identical_runs_produce_identical_output() {
    let src = "Set i to 3.\nWhile i is greater than 0:\n    Display i.\n    Decrement i.";
    assert_eq!(run(src), run(src));
}

#[test]
fn canonical_round_trip_preserves_behavior() {
    let src = "Create function add that takes a and b:\n    Return a plus b.\nCreate a list called xs with values [1, 2].\nAdd 3 to xs.\nSet total to 0.\nFor each n in xs:\n    Add n to total.\nIf total is greater than 5, display \"big\". Otherwise display \"small\".\nCall add with total and 1 and store in out.\nDisplay out.";
    let canonical = parse_program(src).expect("parse failed").to_canonical();
    assert_eq!(run(src), run(&canonical), "canonical form diverged:\n{}", canonical);
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[test]
fn write_then_read_roundtrip() {
    let path = std::env::temp_dir().join(format!("vyra-eval-{}.txt", std::process::id()));
    let path_str = path.to_str().expect("temp path is not UTF-8");

    let src = format!(
        "Set msg to \"hello\".\nWrite msg to file \"{0}\".\nRead file \"{0}\" into back.\nDisplay back.",
        path_str
    );
    assert_eq!(run(&src), "hello\n");

    std::fs::remove_file(&path).ok();
}

#[test]
fn reading_a_missing_file_is_an_io_error() {
    let err = run_err("Read file \"/definitely/not/here.txt\" into x.");
    assert!(matches!(err, RuntimeError::Io(_)));
    assert_eq!(err.exit_code(), 3);
}
