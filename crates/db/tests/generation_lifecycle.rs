//! Integration tests for the generation state machine: claim,
//! write-back, cancellation races, terminal idempotence, and the
//! timeout sweep.

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use weave_core::error::CoreError;
use weave_db::models::generation::{GenerationResult, RequestGeneration, WriteBack};
use weave_db::models::project::CreateProject;
use weave_db::models::snippet::{CreateSnippet, Position, Snippet};
use weave_db::models::status::GenerationStatus;
use weave_db::repositories::{GenerationRepo, ProjectRepo, SnippetRepo, VersionRepo};

const OWNER: i64 = 1;
const OTHER_OWNER: i64 = 2;

fn request(prompt: &str) -> RequestGeneration {
    RequestGeneration {
        model_id: "gpt-4o-mini".to_string(),
        prompt: prompt.to_string(),
        system_prompt: None,
        temperature: Some(0.7),
        max_tokens: Some(1024),
    }
}

fn text_result(text: &str) -> GenerationResult {
    GenerationResult {
        text: Some(text.to_string()),
        image_url: None,
        image_width: None,
        image_height: None,
        image_aspect_ratio: None,
    }
}

async fn project_with_snippet(pool: &SqlitePool) -> (i64, Snippet) {
    let project = ProjectRepo::create(
        pool,
        OWNER,
        &CreateProject {
            name: "Gen".to_string(),
            description: None,
        },
    )
    .await
    .unwrap();
    let snippet = SnippetRepo::create(
        pool,
        OWNER,
        project.id,
        &CreateSnippet {
            text_primary: "draft".to_string(),
            text_secondary: None,
            position: Position { x: 0.0, y: 0.0 },
            tags: Vec::new(),
            category: None,
            image_url: None,
            image_metadata: None,
        },
    )
    .await
    .unwrap();
    (project.id, snippet)
}

// ---------------------------------------------------------------------------
// Queueing and claiming
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn request_starts_queued(pool: SqlitePool) {
    let (_, snippet) = project_with_snippet(&pool).await;
    let generation = GenerationRepo::create(&pool, snippet.id, "text-to-text", &request("expand"))
        .await
        .unwrap();

    assert_eq!(generation.status_id, GenerationStatus::Queued.id());
    assert_eq!(generation.attempts, 0);
    assert!(generation.claimed_at.is_none());
    assert!(generation.result_version_id.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn claim_is_exclusive_and_fifo(pool: SqlitePool) {
    let (_, snippet) = project_with_snippet(&pool).await;
    let first = GenerationRepo::create(&pool, snippet.id, "text-to-text", &request("one"))
        .await
        .unwrap();
    let second = GenerationRepo::create(&pool, snippet.id, "text-to-text", &request("two"))
        .await
        .unwrap();

    let claimed = GenerationRepo::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(claimed.id, first.id, "oldest request is claimed first");
    assert_eq!(claimed.status_id, GenerationStatus::Running.id());
    assert!(claimed.claimed_at.is_some());

    let claimed_second = GenerationRepo::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(claimed_second.id, second.id);

    // Nothing left to claim.
    assert!(GenerationRepo::claim_next(&pool).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Success write-back
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn write_back_appends_version_and_repoints_snippet(pool: SqlitePool) {
    let (project_id, snippet) = project_with_snippet(&pool).await;
    let generation = GenerationRepo::create(&pool, snippet.id, "text-to-text", &request("expand"))
        .await
        .unwrap();
    GenerationRepo::claim_next(&pool).await.unwrap().unwrap();

    let outcome = GenerationRepo::commit_success(&pool, generation.id, &text_result("draft, expanded"))
        .await
        .unwrap();
    let version = match outcome {
        WriteBack::Committed(v) => v,
        WriteBack::Discarded => panic!("write-back should commit"),
    };

    assert_eq!(version.text_primary, "draft, expanded");
    assert_eq!(version.created_by, "generation");
    assert_eq!(version.generation_id, Some(generation.id));
    assert_eq!(version.seq, 2);

    let snippet_after = SnippetRepo::get(&pool, OWNER, project_id, snippet.id)
        .await
        .unwrap();
    assert_eq!(snippet_after.current_version_id, version.id);
    assert_eq!(snippet_after.revision, snippet.revision + 1);

    let generation_after = GenerationRepo::get_visible(&pool, OWNER, generation.id)
        .await
        .unwrap();
    assert_eq!(generation_after.status_id, GenerationStatus::Succeeded.id());
    assert_eq!(generation_after.result_version_id, Some(version.id));
    assert!(generation_after.completed_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn image_write_back_updates_snippet_image_fields(pool: SqlitePool) {
    let (project_id, snippet) = project_with_snippet(&pool).await;
    let generation = GenerationRepo::create(&pool, snippet.id, "text-to-image", &request("a cat"))
        .await
        .unwrap();
    GenerationRepo::claim_next(&pool).await.unwrap().unwrap();

    let result = GenerationResult {
        text: None,
        image_url: Some("https://store.example/img/cat.png".to_string()),
        image_width: Some(1024),
        image_height: Some(512),
        image_aspect_ratio: Some(2.0),
    };
    let outcome = GenerationRepo::commit_success(&pool, generation.id, &result)
        .await
        .unwrap();
    assert_matches!(outcome, WriteBack::Committed(_));

    let snippet_after = SnippetRepo::get(&pool, OWNER, project_id, snippet.id)
        .await
        .unwrap();
    assert_eq!(
        snippet_after.image_url.as_deref(),
        Some("https://store.example/img/cat.png")
    );
    assert_eq!(snippet_after.image_width, Some(1024));
    assert_eq!(snippet_after.image_height, Some(512));
    assert_eq!(snippet_after.image_aspect_ratio, Some(2.0));
    // The prompt text is untouched; the image attaches alongside it.
    assert_eq!(snippet_after.text_primary, "draft");
}

// ---------------------------------------------------------------------------
// Cancellation and races
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancel_beats_late_write_back(pool: SqlitePool) {
    let (project_id, snippet) = project_with_snippet(&pool).await;
    let generation = GenerationRepo::create(&pool, snippet.id, "text-to-text", &request("expand"))
        .await
        .unwrap();
    GenerationRepo::claim_next(&pool).await.unwrap().unwrap();

    let cancelled = GenerationRepo::cancel(&pool, OWNER, generation.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status_id, GenerationStatus::Cancelled.id());

    // The provider "returns" after the cancellation: discard, no mutation.
    let outcome = GenerationRepo::commit_success(&pool, generation.id, &text_result("too late"))
        .await
        .unwrap();
    assert_matches!(outcome, WriteBack::Discarded);

    let snippet_after = SnippetRepo::get(&pool, OWNER, project_id, snippet.id)
        .await
        .unwrap();
    assert_eq!(snippet_after.current_version_id, snippet.current_version_id);
    assert_eq!(VersionRepo::count_for_snippet(&pool, snippet.id).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancel_after_terminal_is_a_no_op(pool: SqlitePool) {
    let (_, snippet) = project_with_snippet(&pool).await;
    let generation = GenerationRepo::create(&pool, snippet.id, "text-to-text", &request("expand"))
        .await
        .unwrap();
    GenerationRepo::claim_next(&pool).await.unwrap().unwrap();
    GenerationRepo::commit_success(&pool, generation.id, &text_result("done"))
        .await
        .unwrap();

    // Last-writer-wins applies to the terminal field only; succeeded stays.
    let after_cancel = GenerationRepo::cancel(&pool, OWNER, generation.id)
        .await
        .unwrap();
    assert_eq!(after_cancel.status_id, GenerationStatus::Succeeded.id());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn terminal_status_reads_are_idempotent(pool: SqlitePool) {
    let (_, snippet) = project_with_snippet(&pool).await;
    let generation = GenerationRepo::create(&pool, snippet.id, "text-to-text", &request("expand"))
        .await
        .unwrap();
    GenerationRepo::claim_next(&pool).await.unwrap().unwrap();
    GenerationRepo::commit_success(&pool, generation.id, &text_result("done"))
        .await
        .unwrap();

    let first = GenerationRepo::get_visible(&pool, OWNER, generation.id)
        .await
        .unwrap();
    let second = GenerationRepo::get_visible(&pool, OWNER, generation.id)
        .await
        .unwrap();
    assert_eq!(first.status_id, second.status_id);
    assert_eq!(first.result_version_id, second.result_version_id);
    assert_eq!(first.completed_at, second.completed_at);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failure_is_terminal_and_writes_nothing(pool: SqlitePool) {
    let (_, snippet) = project_with_snippet(&pool).await;
    let generation = GenerationRepo::create(&pool, snippet.id, "text-to-text", &request("expand"))
        .await
        .unwrap();
    GenerationRepo::claim_next(&pool).await.unwrap().unwrap();

    assert!(GenerationRepo::fail(&pool, generation.id, "provider exploded")
        .await
        .unwrap());
    // Already terminal: a second fail does not overwrite.
    assert!(!GenerationRepo::fail(&pool, generation.id, "again")
        .await
        .unwrap());

    let after = GenerationRepo::get_visible(&pool, OWNER, generation.id)
        .await
        .unwrap();
    assert_eq!(after.status_id, GenerationStatus::Failed.id());
    assert_eq!(after.error_message.as_deref(), Some("provider exploded"));
    assert!(after.result_version_id.is_none());
    assert_eq!(VersionRepo::count_for_snippet(&pool, snippet.id).await.unwrap(), 1);
}

// ---------------------------------------------------------------------------
// Ownership
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn foreign_generation_read_is_not_found(pool: SqlitePool) {
    let (_, snippet) = project_with_snippet(&pool).await;
    let generation = GenerationRepo::create(&pool, snippet.id, "text-to-text", &request("expand"))
        .await
        .unwrap();

    let err = GenerationRepo::get_visible(&pool, OTHER_OWNER, generation.id)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "Generation", .. });
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn foreign_generation_cancel_is_forbidden(pool: SqlitePool) {
    let (_, snippet) = project_with_snippet(&pool).await;
    let generation = GenerationRepo::create(&pool, snippet.id, "text-to-text", &request("expand"))
        .await
        .unwrap();

    let err = GenerationRepo::cancel(&pool, OTHER_OWNER, generation.id)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Forbidden(_));
}

// ---------------------------------------------------------------------------
// Timeout sweep
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn sweep_fails_generations_stuck_in_running(pool: SqlitePool) {
    let (_, snippet) = project_with_snippet(&pool).await;
    let stuck = GenerationRepo::create(&pool, snippet.id, "text-to-text", &request("stuck"))
        .await
        .unwrap();
    GenerationRepo::claim_next(&pool).await.unwrap().unwrap();

    // Backdate the claim to simulate a runner that died mid-flight.
    let long_ago = Utc::now() - Duration::hours(2);
    sqlx::query("UPDATE generations SET claimed_at = ?1 WHERE id = ?2")
        .bind(long_ago)
        .bind(stuck.id)
        .execute(&pool)
        .await
        .unwrap();

    // A fresh running generation must not be swept.
    let fresh = GenerationRepo::create(&pool, snippet.id, "text-to-text", &request("fresh"))
        .await
        .unwrap();
    GenerationRepo::claim_next(&pool).await.unwrap().unwrap();

    let cutoff = Utc::now() - Duration::minutes(10);
    let swept = GenerationRepo::sweep_stuck(&pool, cutoff).await.unwrap();
    assert_eq!(swept.len(), 1);
    assert_eq!(swept[0].generation_id, stuck.id);

    let stuck_after = GenerationRepo::get_visible(&pool, OWNER, stuck.id)
        .await
        .unwrap();
    assert_eq!(stuck_after.status_id, GenerationStatus::Failed.id());
    assert_eq!(stuck_after.error_message.as_deref(), Some("generation timed out"));

    let fresh_after = GenerationRepo::get_visible(&pool, OWNER, fresh.id)
        .await
        .unwrap();
    assert_eq!(fresh_after.status_id, GenerationStatus::Running.id());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn generation_history_is_newest_first(pool: SqlitePool) {
    let (_, snippet) = project_with_snippet(&pool).await;
    let first = GenerationRepo::create(&pool, snippet.id, "text-to-text", &request("one"))
        .await
        .unwrap();
    let second = GenerationRepo::create(&pool, snippet.id, "text-to-text", &request("two"))
        .await
        .unwrap();

    let history = GenerationRepo::list_for_snippet(&pool, snippet.id, None)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.id);
    assert_eq!(history[1].id, first.id);
}
