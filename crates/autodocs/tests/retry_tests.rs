//! Run-level retry behaviour when the provider rate-limits.

mod common;

use std::time::Duration;

use autodocs::db::{artifact_repo, job_repo};
use autodocs::job::JobStatus;
use autodocs::worker::TaskOutcome;

use common::{completion_body, zip_bytes, SettingsBuilder, TestHarness};

fn project() -> Vec<u8> {
    zip_bytes(&[("main.rs", "fn main() { println!(\"hi\"); }")])
}

#[test]
fn test_rate_limited_job_stays_processing_until_retries_exhausted() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body("{\"error\":\"rate_limited\"}")
        .expect(3)
        .create();

    let harness = TestHarness::with_settings(
        SettingsBuilder::new()
            .api_key("sk-test")
            .base_url(&server.url())
            .retry(2, 1),
    );

    let job = harness.api.upload("project.zip", &project()).unwrap();

    let first = harness
        .next_report(Duration::from_secs(10))
        .expect("first run should report");
    match first.outcome {
        TaskOutcome::Rescheduled { delay, retries } => {
            assert_eq!(delay, Duration::from_secs(1));
            assert_eq!(retries, 1);
        }
        other => panic!("expected reschedule, got {:?}", other),
    }

    // The retry is a second away; nothing may have settled the job yet
    let stored = job_repo::find_by_id(&harness.db, &job.id).unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Processing);
    assert!(stored.error_message.is_none());
    assert!(artifact_repo::list_for_job(&harness.db, &job.id).unwrap().is_empty());

    let rest = harness.wait_for_final(&job.id);
    assert_eq!(rest.len(), 2, "one more reschedule, then failure: {:?}", rest);
    assert!(matches!(rest[0], TaskOutcome::Rescheduled { retries: 2, .. }));
    assert!(matches!(rest[1], TaskOutcome::Failed { .. }));

    mock.assert();
    let stored = harness.api.get_job(&job.id).unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert!(stored.error_message.unwrap().contains("rate limit"));
    assert!(stored.artifacts.is_empty());
}

#[test]
fn test_rate_limit_then_recovery_completes_job() {
    let mut server = mockito::Server::new();
    // Mocks are matched in creation order until exhausted
    let limited = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .expect(1)
        .create();
    let healthy = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body("Recovered output"))
        .expect(5)
        .create();

    let harness = TestHarness::with_settings(
        SettingsBuilder::new()
            .api_key("sk-test")
            .base_url(&server.url())
            .retry(3, 1),
    );

    let (job_id, outcomes) = harness.upload_and_wait("project.zip", &project());

    limited.assert();
    healthy.assert();
    assert_eq!(outcomes.len(), 2);
    assert!(matches!(outcomes[0], TaskOutcome::Rescheduled { retries: 1, .. }));
    assert!(matches!(outcomes[1], TaskOutcome::Completed { .. }));

    let job = harness.api.get_job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job
        .artifacts
        .iter()
        .all(|a| a.content.as_deref() == Some("Recovered output")));
}

#[test]
fn test_non_rate_limit_failure_degrades_single_artifact() {
    let mut server = mockito::Server::new();
    let _broken = server
        .mock("POST", "/chat/completions")
        .match_body(mockito::Matcher::Regex("Mermaid".to_string()))
        .with_status(500)
        .with_body("upstream exploded")
        .create();
    let _ok = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body("Live output"))
        .create();

    let harness = TestHarness::with_settings(
        SettingsBuilder::new().api_key("sk-test").base_url(&server.url()),
    );

    let (job_id, outcomes) = harness.upload_and_wait("project.zip", &project());

    assert_eq!(outcomes.len(), 1);
    let job = harness.api.get_job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    for artifact in &job.artifacts {
        if artifact.kind == autodocs::job::ArtifactKind::Uml {
            assert_eq!(artifact.content, Some(artifact.kind.placeholder()));
        } else {
            assert_eq!(artifact.content.as_deref(), Some("Live output"));
        }
    }
}
