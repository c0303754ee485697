//! End-to-end scenarios driven through the public `Engine` API, each line
//! compiled and run as its own top-level form against one persistent engine
//! — the same shape an interactive session takes.

use wren::{Engine, EngineConfig, SliceSource, WrenError};

fn run_lines(engine: &mut Engine, lines: &[&str]) -> Vec<Option<i64>> {
    lines
        .iter()
        .map(|line| {
            let mut src = line.as_bytes().to_vec();
            src.push(b'\n');
            let mut source = SliceSource::new(&src);
            engine.compile_and_run_one(&mut source).unwrap()
        })
        .collect()
}

#[test]
fn arithmetic_precedence() {
    let mut engine = Engine::new(EngineConfig::default());
    assert_eq!(run_lines(&mut engine, &["1 + 2 * 3"]), vec![Some(7)]);
}

#[test]
fn let_then_assignment_expression_then_fetch() {
    let mut engine = Engine::new(EngineConfig::default());
    let results = run_lines(&mut engine, &["let x = 10", "x : x + 5", "x"]);
    assert_eq!(results, vec![None, Some(15), Some(15)]);
}

#[test]
fn fun_then_call() {
    let mut engine = Engine::new(EngineConfig::default());
    let results = run_lines(&mut engine, &["fun sq n = n * n", "sq 7"]);
    assert_eq!(results, vec![None, Some(49)]);
}

#[test]
fn recursive_fun_then_call() {
    let mut engine = Engine::new(EngineConfig::default());
    let results = run_lines(&mut engine, &["fun fact n = if n < 2 then 1 else n * fact (n - 1)", "fact 6"]);
    assert_eq!(results, vec![None, Some(720)]);
}

#[test]
fn if_then_else_takes_the_false_branch() {
    let mut engine = Engine::new(EngineConfig::default());
    assert_eq!(run_lines(&mut engine, &["if 0 then 1 else 2"]), vec![Some(2)]);
}

#[test]
fn hex_literal() {
    let mut engine = Engine::new(EngineConfig::default());
    assert_eq!(run_lines(&mut engine, &["0x1f + 1"]), vec![Some(32)]);
}

#[test]
fn string_literal_pushed_then_discarded() {
    let mut engine = Engine::new(EngineConfig::default());
    assert_eq!(run_lines(&mut engine, &["'hi' ; 0"]), vec![Some(0)]);
}

#[test]
fn tail_recursive_call_survives_ten_thousand_iterations() {
    let mut engine = Engine::new(EngineConfig::default());
    let results = run_lines(
        &mut engine,
        &["fun countdown n = if n then countdown (n - 1) else n", "countdown 10000"],
    );
    assert_eq!(results, vec![None, Some(0)]);
}

#[test]
fn unary_minus_matches_zero_minus() {
    let mut engine = Engine::new(EngineConfig::default());
    let results = run_lines(&mut engine, &["-5", "0 - 5"]);
    assert_eq!(results[0], results[1]);
}

#[test]
fn forget_is_lifo_and_then_the_name_is_gone() {
    let mut engine = Engine::new(EngineConfig::default());
    run_lines(&mut engine, &["let x = 1"]);
    let mut source = SliceSource::new(b"forget x\n");
    engine.compile_and_run_one(&mut source).unwrap();
    let mut source = SliceSource::new(b"x\n");
    assert_eq!(engine.compile_and_run_one(&mut source), Err(WrenError::UnknownIdentifier));
}

#[test]
fn oversized_hex_literal_is_numeric_overflow() {
    let mut engine = Engine::new(EngineConfig::default());
    let mut source = SliceSource::new(b"0x1ffffffffffffffff\n");
    assert_eq!(engine.compile_and_run_one(&mut source), Err(WrenError::NumericOverflow));
}
