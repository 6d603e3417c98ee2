use super::*;
use crate::config::SessionConfig;
use crate::fixture::{install_core, write_module};
use kiln_refs::{ArtifactPath, ArtifactRole, ResolutionError};
use kiln_script::{buffer_handler, ScriptEngine, ScriptState};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

struct Harness {
    evaluator: IncrementalEvaluator<ScriptEngine>,
    service: Arc<ReferenceService>,
    state: EvaluatorState<ScriptState>,
}

impl Harness {
    fn new(config: &SessionConfig) -> Self {
        let service = Arc::new(ReferenceService::new());
        service
            .load_framework(&config.framework, &config.search_paths)
            .unwrap();
        let evaluator = IncrementalEvaluator::new(
            ScriptEngine::new(buffer_handler()),
            ResolverChain::standard(config, Arc::clone(&service)),
            Arc::clone(&service),
            service.execution_artifacts(),
            config.imports.iter().cloned().collect(),
        );
        Harness {
            evaluator,
            service,
            state: EvaluatorState::Empty,
        }
    }

    /// Evaluate and move to the next state when there is one.
    fn submit(&mut self, text: &str) -> EvaluationResult {
        let evaluation = self
            .evaluator
            .evaluate(&self.state, text, &[], &CancellationToken::new());
        if let Some(next) = evaluation.next {
            self.state = EvaluatorState::Continuing(next);
        }
        evaluation.result
    }

    fn current(&self) -> &Arc<EvaluationState<ScriptState>> {
        self.state.current().unwrap()
    }
}

fn success(result: EvaluationResult) -> Success {
    match result {
        EvaluationResult::Success(success) => success,
        other => panic!("expected success, got {other:?}"),
    }
}

#[test]
fn first_submission_starts_the_chain() {
    let dir = tempdir().unwrap();
    let mut harness = Harness::new(&install_core(dir.path()));

    let result = success(harness.submit("1 + 1"));
    assert_eq!(result.return_value.as_deref(), Some("2"));
    assert_eq!(result.text, "1 + 1");
    assert!(result.imports.is_empty());
    assert_eq!(harness.current().generation(), 1);
}

#[test]
fn bindings_carry_across_submissions() {
    let dir = tempdir().unwrap();
    let mut harness = Harness::new(&install_core(dir.path()));

    let first = success(harness.submit("let x = 40;"));
    assert_eq!(first.return_value, None);
    let second = success(harness.submit("x + 2"));
    assert_eq!(second.return_value.as_deref(), Some("42"));
    assert_eq!(harness.current().generation(), 2);
    assert_eq!(
        harness.current().engine_state().binding("x").map(ToString::to_string),
        Some("40".to_string())
    );
}

#[test]
fn terminated_statement_has_no_return_value() {
    let dir = tempdir().unwrap();
    let mut harness = Harness::new(&install_core(dir.path()));
    assert_eq!(success(harness.submit("1 + 1;")).return_value, None);
}

#[test]
fn compile_error_leaves_the_chain_alone() {
    let dir = tempdir().unwrap();
    let mut harness = Harness::new(&install_core(dir.path()));
    success(harness.submit("let x = 1;"));
    let before = harness.state.clone();

    let result = harness.submit("x + true");
    let EvaluationResult::Error(EvalFailure::Compile(message)) = result else {
        panic!("expected compile error, got {result:?}");
    };
    assert!(message.contains("cannot apply '+' to int and bool"), "{message}");
    assert!(harness.state.same_as(&before));
}

#[test]
fn runtime_fault_advances_the_chain() {
    let dir = tempdir().unwrap();
    let mut harness = Harness::new(&install_core(dir.path()));

    let result = harness.submit("let a = 1;\nlet b = a / 0;");
    let EvaluationResult::Error(EvalFailure::Runtime(message)) = result else {
        panic!("expected runtime fault, got {result:?}");
    };
    assert!(message.contains("division by zero"), "{message}");
    assert_eq!(harness.current().generation(), 1);

    let after = success(harness.submit("a"));
    assert_eq!(after.return_value.as_deref(), Some("1"));
}

#[test]
fn faulted_submission_commits_the_statements_that_ran() {
    let dir = tempdir().unwrap();
    let harness = Harness::new(&install_core(dir.path()));

    let evaluation = harness.evaluator.evaluate(
        &harness.state,
        "let a = 1;
let b = a / 0;
let c = 2;",
        &[],
        &CancellationToken::new(),
    );
    assert!(matches!(evaluation.result, EvaluationResult::Error(EvalFailure::Runtime(_))));
    assert!(evaluation.next.is_some());
    let commit = evaluation.commit.unwrap();
    assert_eq!(commit.text, "let a = 1;");
    assert_eq!(commit.return_value, None);
}

#[test]
fn stalled_evaluations_commit_nothing() {
    let dir = tempdir().unwrap();
    let harness = Harness::new(&install_core(dir.path()));

    let evaluation = harness
        .evaluator
        .evaluate(&harness.state, "1 +", &[], &CancellationToken::new());
    assert!(evaluation.next.is_none());
    assert!(evaluation.commit.is_none());

    let evaluation = harness
        .evaluator
        .evaluate(&harness.state, "7", &[], &CancellationToken::new());
    assert_eq!(evaluation.commit.unwrap().text, "7");
}

#[test]
fn cancelled_before_start() {
    let dir = tempdir().unwrap();
    let harness = Harness::new(&install_core(dir.path()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let evaluation = harness
        .evaluator
        .evaluate(&EvaluatorState::Empty, "1", &[], &cancel);
    assert!(matches!(evaluation.result, EvaluationResult::Cancelled));
    assert!(evaluation.next.is_none());
}

#[test]
fn imports_accumulate_and_resolve_framework_exports() {
    let dir = tempdir().unwrap();
    let mut harness = Harness::new(&install_core(dir.path()));

    let result = success(harness.submit("use Kiln.Text;\nwidth"));
    assert_eq!(result.return_value.as_deref(), Some("80"));
    assert_eq!(result.imports.iter().collect::<Vec<_>>(), vec!["Kiln.Text"]);

    let result = success(harness.submit("greeting"));
    assert_eq!(result.return_value.as_deref(), Some("\"hello\""));
    assert!(harness.current().imports().contains("Kiln.Text"));
}

#[test]
fn configured_imports_apply_from_the_start() {
    let dir = tempdir().unwrap();
    let config = install_core(dir.path()).with_import("Kiln.Text");
    let mut harness = Harness::new(&config);
    let result = success(harness.submit("width * 2"));
    assert_eq!(result.return_value.as_deref(), Some("160"));
}

#[test]
fn framework_modules_reconcile_to_reference_copies() {
    let dir = tempdir().unwrap();
    let mut harness = Harness::new(&install_core(dir.path()));
    let result = success(harness.submit("1"));

    let execution = ArtifactPath::new(dir.path().join("shared/Kiln.Core/1.0.0/Kiln.Text.dll"));
    let reference = ArtifactPath::new(dir.path().join("packs/Kiln.Core.Ref/1.0.0/ref/Kiln.Text.dll"));
    assert!(result.artifacts.contains(&reference));
    assert!(!result.artifacts.contains(&execution));
    assert!(harness.current().references().contains(&reference));
}

#[test]
fn reference_directive_loads_and_reconciles_a_module() {
    let dir = tempdir().unwrap();
    let extra = write_module(&dir.path().join("lib/Extra.dll"), "Extra", "2.0.0.0", &[("answer", "42")]);
    let mut harness = Harness::new(&install_core(dir.path()));

    let result = success(harness.submit("#r \"lib/Extra.dll\"\nExtra.answer"));
    assert_eq!(result.return_value.as_deref(), Some("42"));

    let path = ArtifactPath::new(&extra);
    let synthesized = result.artifacts.get(&path).unwrap();
    assert_eq!(synthesized.role(), ArtifactRole::Both);
    assert!(harness.service.execution_artifacts().contains(&path));

    // Later submissions keep the module without repeating the directive.
    let again = success(harness.submit("Extra.answer + 1"));
    assert_eq!(again.return_value.as_deref(), Some("43"));
}

#[test]
fn unresolvable_directive_is_an_error_without_advancing() {
    let dir = tempdir().unwrap();
    let mut harness = Harness::new(&install_core(dir.path()));
    success(harness.submit("let x = 1;"));
    let before = harness.state.clone();

    let result = harness.submit("#r \"package: totally-bogus-package-xyz\"\nx");
    let EvaluationResult::Error(EvalFailure::Resolution(err)) = result else {
        panic!("expected resolution error, got {result:?}");
    };
    assert!(matches!(err, ResolutionError::PackageNotFound { ref name, .. } if name == "totally-bogus-package-xyz"));
    assert!(harness.state.same_as(&before));
}

#[test]
fn references_only_grow() {
    let dir = tempdir().unwrap();
    write_module(&dir.path().join("A.dll"), "A", "1.0.0.0", &[("a", "1")]);
    write_module(&dir.path().join("B.dll"), "B", "1.0.0.0", &[("b", "2")]);
    let mut harness = Harness::new(&install_core(dir.path()));

    let mut previous = harness.evaluator.initial_references.clone();
    for text in ["#r \"A.dll\"\nA.a", "1 + ", "#r \"B.dll\"\nB.b", "let z = 3;"] {
        harness.submit(text);
        let current = harness.current().references().clone();
        assert!(current.is_superset_of(&previous), "after {text:?}");
        previous = current;
    }
}
