use super::*;
use crate::check::Checker;
use crate::module::ModuleTable;
use crate::parser::parse;
use crate::print_handler::buffer_handler;
use crate::value::Type;
use pretty_assertions::assert_eq;

fn run_with(source: &str, args: &[&str], cancel: &CancellationToken) -> (Result<Outcome, Interrupted>, String) {
    let modules = ModuleTable::new();
    let script = parse(source).unwrap();
    let checked = Checker::new(source, &modules, Vec::<(String, Type)>::new(), Vec::new())
        .check(&script)
        .unwrap();
    let args: Vec<String> = args.iter().map(|s| (*s).to_string()).collect();
    let print = buffer_handler();
    let interpreter = Interpreter {
        source,
        resolutions: &checked.resolutions,
        args: &args,
        print: &print,
    };
    let outcome = interpreter.run(&script, FxHashMap::default(), cancel);
    (outcome, print.output())
}

fn run(source: &str) -> Outcome {
    run_with(source, &[], &CancellationToken::new()).0.unwrap()
}

#[test]
fn arithmetic_and_bindings() {
    let outcome = run("let x = 6; let y = x * 7; y - 2 % 3");
    assert_eq!(outcome.last, Some(Value::Int(40)));
    assert_eq!(outcome.bindings.get("y"), Some(&Value::Int(42)));
    assert_eq!(outcome.completed, 3);
    assert!(outcome.fault.is_none());
}

#[test]
fn strings_and_comparisons() {
    assert_eq!(run("\"ab\" + \"c\"").last, Some(Value::str("abc")));
    assert_eq!(run("\"a\" < \"b\" && 3 >= 3").last, Some(Value::Bool(true)));
    assert_eq!(run("len(\"héllo\")").last, Some(Value::Int(5)));
    assert_eq!(run("str(1 == 2)").last, Some(Value::str("false")));
}

#[test]
fn logical_operators_short_circuit() {
    // The right operand would fault if evaluated.
    assert_eq!(run("false && 1 / 0 == 0").last, Some(Value::Bool(false)));
    assert_eq!(run("true || 1 / 0 == 0").last, Some(Value::Bool(true)));
}

#[test]
fn fault_keeps_earlier_bindings() {
    let outcome = run("let a = 1; let b = a / 0; let c = 3");
    assert_eq!(outcome.completed, 1);
    assert_eq!(outcome.bindings.get("a"), Some(&Value::Int(1)));
    assert!(outcome.bindings.get("b").is_none());
    let fault = outcome.fault.unwrap();
    assert_eq!(fault.kind, FaultKind::DivisionByZero);
    assert_eq!(fault.to_string(), "(1:20): runtime fault: division by zero");
}

#[test]
fn overflow_is_a_fault() {
    let outcome = run("9223372036854775807 + 1");
    assert_eq!(outcome.fault.unwrap().kind, FaultKind::Overflow("+"));
    let outcome = run("-(-9223372036854775808)");
    assert_eq!(outcome.fault.unwrap().kind, FaultKind::Overflow("-"));
}

#[test]
fn panic_and_print() {
    let (outcome, printed) = run_with(
        "print(\"before\"); panic(\"boom\"); print(\"after\")",
        &[],
        &CancellationToken::new(),
    );
    let outcome = outcome.unwrap();
    assert_eq!(printed, "before\n");
    assert_eq!(outcome.fault.unwrap().kind, FaultKind::Panic("boom".to_string()));
}

#[test]
fn script_arguments() {
    let (outcome, _) = run_with("arg(1) + str(argc())", &["a", "b"], &CancellationToken::new());
    assert_eq!(outcome.unwrap().last, Some(Value::str("b2")));

    let (outcome, _) = run_with("arg(5)", &["a"], &CancellationToken::new());
    assert_eq!(
        outcome.unwrap().fault.unwrap().kind,
        FaultKind::ArgOutOfRange { index: 5, count: 1 }
    );
}

#[test]
fn cancelled_token_stops_before_first_statement() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let (outcome, printed) = run_with("print(1)", &[], &cancel);
    assert!(outcome.is_err());
    assert_eq!(printed, "");
}

#[test]
fn deeply_nested_expression_evaluates() {
    let depth = 50_000;
    let source = format!("{}1{}", "(1 + ".repeat(depth), ")".repeat(depth));
    assert_eq!(run(&source).last, Some(Value::Int(50_001)));

    let chain = format!("0{}", " + 1".repeat(depth));
    assert_eq!(run(&chain).last, Some(Value::Int(50_000)));
}
