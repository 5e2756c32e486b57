// tests/runtime_fake_executor.rs

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use minici::conclusion::Conclusion;
use minici::dag::{Scheduler, TaskGraph, TaskSpec, TaskStatus};
use minici::engine::{RunReport, Runtime, RuntimeEvent};
use minici::pipeline::RunState;
use minici_test_utils::fake_executor::FakeExecutor;
use minici_test_utils::{init_tracing, with_timeout};

fn ci_graph() -> TaskGraph {
    TaskGraph::build([
        TaskSpec::new("setup"),
        TaskSpec::new("build").after("setup"),
        TaskSpec::new("lint").after("build"),
        TaskSpec::new("typecheck").after("build"),
        TaskSpec::new("finally")
            .after("lint")
            .after("typecheck")
            .run_always(),
    ])
    .unwrap()
}

async fn run_with(graph: TaskGraph, failing: &[&str]) -> (RunReport, Vec<String>, Arc<RunState>) {
    init_tracing();
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx, Arc::clone(&executed)).failing(failing.iter().copied());
    let state = Arc::new(RunState::new("abc123"));

    let runtime = Runtime::new(Scheduler::new(graph), rx, executor, Arc::clone(&state));
    let report = with_timeout(runtime.run()).await.unwrap();
    let executed = executed.lock().unwrap().clone();
    (report, executed, state)
}

#[tokio::test]
async fn chain_runs_in_dependency_order() {
    let (report, executed, _) = run_with(ci_graph(), &[]).await;

    assert_eq!(executed.first().map(String::as_str), Some("setup"));
    assert_eq!(executed.get(1).map(String::as_str), Some("build"));
    assert_eq!(executed.last().map(String::as_str), Some("finally"));
    assert_eq!(executed.len(), 5);
    assert_eq!(report.conclusion(), Conclusion::Success);
}

#[tokio::test]
async fn lint_failure_still_runs_finalizer() {
    let (report, executed, state) = run_with(ci_graph(), &["lint"]).await;

    assert!(executed.contains(&"typecheck".to_string()));
    assert!(executed.contains(&"finally".to_string()));
    assert_eq!(report.status_of("lint"), Some(TaskStatus::Failure));
    assert_eq!(report.status_of("typecheck"), Some(TaskStatus::Success));
    assert_eq!(report.status_of("finally"), Some(TaskStatus::Success));
    assert_eq!(report.conclusion(), Conclusion::Failure);

    // The registry mirrors the final statuses.
    assert_eq!(state.task_statuses(), report.statuses);
}

#[tokio::test]
async fn early_failure_skips_downstream_but_not_finalizer() {
    let (report, executed, _) = run_with(ci_graph(), &["setup"]).await;

    assert_eq!(executed, vec!["setup".to_string(), "finally".to_string()]);
    for skipped in ["build", "lint", "typecheck"] {
        assert_eq!(report.status_of(skipped), Some(TaskStatus::Skipped));
    }
}

#[tokio::test]
async fn empty_graph_finishes_immediately() {
    let (report, executed, _) = run_with(TaskGraph::build(Vec::new()).unwrap(), &[]).await;
    assert!(executed.is_empty());
    assert!(report.statuses.is_empty());
}
