// tests/check_client.rs

use minici::annotate::{Annotation, AnnotationBatch, AnnotationLevel, Location};
use minici::checks::api::{RemoteStatus, UpdateCheckRun};
use minici::checks::CheckLifecycle;
use minici::conclusion::Conclusion;
use minici::errors::MiniciError;
use minici_test_utils::fake_api::{ApiCall, FakeCheckRunApi, client_for};
use minici_test_utils::init_tracing;

#[tokio::test]
async fn start_is_idempotent() {
    init_tracing();
    let api = FakeCheckRunApi::new();
    let client = client_for(&api);

    let first = client.start("mypy", None).await.unwrap();
    let second = client.start("mypy", None).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(api.creates(), 1);
    assert_eq!(client.lifecycle("mypy"), CheckLifecycle::InProgress);
}

#[tokio::test]
async fn start_reuses_a_run_created_elsewhere() {
    let api = FakeCheckRunApi::new().with_existing("mypy", RemoteStatus::InProgress);
    let existing = api.run_named("mypy").unwrap().id;

    // A fresh client has no local memory of the run.
    let id = client_for(&api).start("mypy", None).await.unwrap();

    assert_eq!(id, existing);
    assert_eq!(api.creates(), 0);
}

#[tokio::test]
async fn start_sends_commit_and_details_url() {
    let api = FakeCheckRunApi::new();
    client_for(&api)
        .start("ci", Some("https://ci.example/run/1"))
        .await
        .unwrap();

    let create = api
        .calls()
        .into_iter()
        .find_map(|c| match c {
            ApiCall::Create(req) => Some(req),
            _ => None,
        })
        .unwrap();
    assert_eq!(create.head_sha, "abc123");
    assert_eq!(create.status, RemoteStatus::InProgress);
    assert_eq!(create.details_url.as_deref(), Some("https://ci.example/run/1"));
}

#[tokio::test]
async fn conclude_without_start_is_rejected() {
    let api = FakeCheckRunApi::new();
    let err = client_for(&api)
        .conclude("ci", Conclusion::Success)
        .await
        .unwrap_err();

    assert!(matches!(err, MiniciError::CheckNotStarted(ref name) if name == "ci"));
    assert!(
        api.calls()
            .iter()
            .all(|c| !matches!(c, ApiCall::Update(..)))
    );
}

#[tokio::test]
async fn duplicate_names_resolve_to_the_first_listed() {
    let api = FakeCheckRunApi::new()
        .with_existing("ci", RemoteStatus::InProgress)
        .with_existing("ci", RemoteStatus::InProgress);
    let runs = api.runs();

    client_for(&api)
        .conclude("ci", Conclusion::Neutral)
        .await
        .unwrap();

    assert_eq!(api.updates_for(runs[0].id).len(), 1);
    assert!(api.updates_for(runs[1].id).is_empty());
}

#[tokio::test]
async fn direct_mode_completes_without_output() {
    let api = FakeCheckRunApi::new();
    let client = client_for(&api);
    let id = client.start("ci", None).await.unwrap();

    client.conclude("ci", Conclusion::Failure).await.unwrap();

    assert_eq!(
        api.updates_for(id),
        vec![UpdateCheckRun {
            status: Some(RemoteStatus::Completed),
            conclusion: Some("failure".into()),
            output: None,
        }]
    );
    assert_eq!(
        client.lifecycle("ci"),
        CheckLifecycle::Completed(Some(Conclusion::Failure))
    );
    assert_eq!(api.run_named("ci").unwrap().status, RemoteStatus::Completed);
}

#[tokio::test]
async fn derived_mode_attaches_parsed_annotations() {
    let api = FakeCheckRunApi::new();
    let client = client_for(&api);
    let id = client.start("mypy", None).await.unwrap();

    let conclusion = client
        .conclude_from_lines("mypy", ["src/app.py:10: error: bad type\r\n", "note: unrelated"])
        .await
        .unwrap();

    assert_eq!(conclusion, Conclusion::Failure);
    let updates = api.updates_for(id);
    assert_eq!(updates.len(), 1);
    let output = updates[0].output.as_ref().unwrap();
    assert_eq!(output.title, "Mypy");
    assert_eq!(output.annotations.len(), 1);
    assert_eq!(output.annotations[0].path, "src/app.py");
    assert_eq!(output.annotations[0].start_line, 10);
    assert_eq!(output.annotations[0].annotation_level, "failure");
    assert_eq!(updates[0].conclusion.as_deref(), Some("failure"));
}

#[tokio::test]
async fn clean_output_concludes_success() {
    let api = FakeCheckRunApi::new();
    let client = client_for(&api);
    client.start("pylint", None).await.unwrap();

    let conclusion = client
        .conclude_from_lines("pylint", Vec::<String>::new())
        .await
        .unwrap();
    assert_eq!(conclusion, Conclusion::Success);
}

#[tokio::test]
async fn derived_mode_needs_a_known_parser() {
    let api = FakeCheckRunApi::new();
    let client = client_for(&api);
    client.start("eslint", None).await.unwrap();

    let err = client
        .conclude_from_lines("eslint", ["a.js:1: error: x"])
        .await
        .unwrap_err();
    assert!(matches!(err, MiniciError::UnknownCheck(_)));
    assert!(client.unconcluded().contains(&"eslint".to_string()));
}

#[tokio::test]
async fn large_outputs_are_chunked() {
    let api = FakeCheckRunApi::new();
    let client = client_for(&api);
    let id = client.start("pylint", None).await.unwrap();

    let mut batch = AnnotationBatch::new("Pylint", "Result of pylint checks");
    for line in 1..=75 {
        batch.annotations.push(Annotation {
            location: Location::new("src/x.py", line),
            level: AnnotationLevel::Notice,
            message: "consider refactoring".into(),
            title: Some("too-many-branches".into()),
        });
    }
    let conclusion = client.conclude_with_batch("pylint", &batch).await.unwrap();
    assert_eq!(conclusion, Conclusion::Neutral);

    let updates = api.updates_for(id);
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].status, None);
    assert_eq!(updates[0].output.as_ref().unwrap().annotations.len(), 50);
    assert_eq!(updates[1].status, Some(RemoteStatus::Completed));
    assert_eq!(updates[1].output.as_ref().unwrap().annotations.len(), 25);
    assert!(
        updates[1]
            .output
            .as_ref()
            .unwrap()
            .summary
            .contains("75 annotations")
    );
}

#[tokio::test]
async fn remote_errors_surface_immediately() {
    let api = FakeCheckRunApi::new();
    let client = client_for(&api);
    client.start("ci", None).await.unwrap();

    api.fail_next(502);
    let err = client.conclude("ci", Conclusion::Success).await.unwrap_err();

    assert!(matches!(err, MiniciError::Network { status: 502, .. }));
    assert_eq!(client.lifecycle("ci"), CheckLifecycle::InProgress);
    assert_eq!(client.unconcluded(), vec!["ci".to_string()]);
}

#[tokio::test]
async fn unsupported_severity_is_not_dropped() {
    let api = FakeCheckRunApi::new();
    let client = client_for(&api);
    client.start("mypy", None).await.unwrap();

    let err = client
        .conclude_from_lines("mypy", ["src/app.py:3: warning: odd"])
        .await
        .unwrap_err();
    assert!(matches!(err, MiniciError::UnsupportedInput { .. }));
}
