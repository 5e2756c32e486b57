// tests/config_loading.rs

use std::fs;

use minici::config::{TaskKind, load_and_validate, load_from_str};
use minici::config::PipelineFile;
use minici::dag::CompletionPolicy;
use minici::errors::MiniciError;
use minici_test_utils::builders::{PipelineFileBuilder, TaskConfigBuilder, standard_pipeline};

fn validate(toml: &str) -> Result<PipelineFile, MiniciError> {
    PipelineFile::try_from(load_from_str(toml)?)
}

#[test]
fn loads_a_pipeline_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minici.toml");
    fs::write(
        &path,
        r#"
[pipeline]
umbrella_check = "ci"
image = "app:{commit}"
timeout_secs = 600

[task.setup]
kind = "setup"
cmd = "docker build . -t {image}"

[task.mypy]
kind = "check"
cmd = "docker run {image} mypy ."
after = ["setup"]
details_url = "https://ci.example/runs/42"

[task.finally]
kind = "finalize"
"#,
    )
    .unwrap();

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.pipeline.image, "app:{commit}");
    assert_eq!(cfg.pipeline.stash, "*");
    assert_eq!(cfg.pipeline.timeout_secs, Some(600));
    assert_eq!(cfg.task["setup"].kind, TaskKind::Setup);
    assert!(cfg.task["mypy"].fail_on_tool_error);

    let graph = cfg.graph();
    let order: Vec<&str> = graph.tasks().collect();
    assert_eq!(order.last(), Some(&"finally"));
    assert_eq!(graph.policy_of("finally"), CompletionPolicy::Always);
    let mut finally_deps = graph.dependencies_of("finally").to_vec();
    finally_deps.sort();
    assert_eq!(finally_deps, vec!["mypy".to_string(), "setup".to_string()]);
}

#[test]
fn cycles_are_rejected() {
    let err = validate(
        r#"
[task.a]
cmd = "echo a"
after = ["b"]

[task.b]
cmd = "echo b"
after = ["a"]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, MiniciError::Cycle(_)), "got {err:?}");
}

#[test]
fn unknown_dependency_is_rejected() {
    let err = validate(
        r#"
[task.a]
cmd = "echo a"
after = ["ghost"]
"#,
    )
    .unwrap_err();
    assert!(
        matches!(err, MiniciError::MissingDependency { ref dependency, .. } if dependency == "ghost")
    );
}

#[test]
fn unknown_placeholder_is_rejected() {
    let err = validate(
        r#"
[task.a]
cmd = "echo {branch}"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, MiniciError::Config(ref m) if m.contains("branch")));
}

#[test]
fn check_without_parser_is_rejected() {
    let err = PipelineFileBuilder::new()
        .with_task("eslint", TaskConfigBuilder::check("npx eslint .").build())
        .with_task("finally", TaskConfigBuilder::finalize().build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, MiniciError::UnknownCheck(ref c) if c == "eslint"));
}

#[test]
fn checks_need_a_finalizer() {
    let err = PipelineFileBuilder::new()
        .with_task("mypy", TaskConfigBuilder::check("mypy .").build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, MiniciError::Config(_)));
}

#[test]
fn single_setup_and_finalizer() {
    let err = standard_pipeline()
        .with_task("setup2", TaskConfigBuilder::setup("true").build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, MiniciError::Config(ref m) if m.contains("setup")));

    let err = standard_pipeline()
        .with_task("finally2", TaskConfigBuilder::finalize().build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, MiniciError::Config(ref m) if m.contains("finalize")));
}

#[test]
fn finalizer_must_wait_for_every_task() {
    let err = standard_pipeline()
        .with_task(
            "finally",
            TaskConfigBuilder::finalize().after(&["pylint"]).build(),
        )
        .try_build()
        .unwrap_err();
    assert!(
        matches!(err, MiniciError::Config(ref m) if m.contains("mypy") && !m.contains("setup")),
        "got {err:?}"
    );

    // Transitive predecessors count.
    let cfg = standard_pipeline()
        .with_task(
            "finally",
            TaskConfigBuilder::finalize().after(&["pylint", "mypy"]).build(),
        )
        .build();
    assert!(cfg.graph().not_awaited_by("finally").is_empty());
}

#[test]
fn image_placeholder_needs_a_setup_task() {
    let err = PipelineFileBuilder::new()
        .with_task("test", TaskConfigBuilder::command("docker run {image} pytest").build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, MiniciError::Config(ref m) if m.contains("{image}")));
}

#[test]
fn named_check_maps_to_parser() {
    let cfg = PipelineFileBuilder::new()
        .with_task(
            "types",
            TaskConfigBuilder::check("mypy src").check_name("mypy").build(),
        )
        .with_task("finally", TaskConfigBuilder::finalize().build())
        .build();
    assert_eq!(cfg.task["types"].check_name("types"), Some("mypy"));
}

#[test]
fn check_may_not_shadow_the_umbrella() {
    let err = PipelineFileBuilder::new()
        .with_umbrella_check("mypy")
        .with_task("mypy", TaskConfigBuilder::check("mypy .").build())
        .with_task("finally", TaskConfigBuilder::finalize().build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, MiniciError::Config(_)));
}

#[test]
fn finalize_cannot_run_commands() {
    let err = validate(
        r#"
[task.finally]
kind = "finalize"
cmd = "echo done"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, MiniciError::Config(_)));
}

#[test]
fn unknown_keys_are_rejected() {
    let err = validate(
        r#"
[task.a]
cmd = "echo a"
watch = ["src/**"]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, MiniciError::Toml(_)));
}

#[test]
fn empty_pipeline_is_rejected() {
    assert!(matches!(validate(""), Err(MiniciError::Config(_))));
}
