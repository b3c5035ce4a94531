//! Integration tests for cascade deletes: no orphaned connection,
//! version, or generation is ever left behind.

use assert_matches::assert_matches;
use sqlx::SqlitePool;
use weave_core::error::CoreError;
use weave_db::models::connection::CreateConnection;
use weave_db::models::generation::RequestGeneration;
use weave_db::models::project::CreateProject;
use weave_db::models::snippet::{CreateSnippet, Position};
use weave_db::repositories::{
    ConnectionRepo, GenerationRepo, ProjectRepo, SnippetRepo, VersionRepo,
};

const OWNER: i64 = 1;

fn new_snippet(text: &str) -> CreateSnippet {
    CreateSnippet {
        text_primary: text.to_string(),
        text_secondary: None,
        position: Position { x: 0.0, y: 0.0 },
        tags: Vec::new(),
        category: None,
        image_url: None,
        image_metadata: None,
    }
}

fn request() -> RequestGeneration {
    RequestGeneration {
        model_id: "gpt-4o-mini".to_string(),
        prompt: "expand".to_string(),
        system_prompt: None,
        temperature: None,
        max_tokens: None,
    }
}

async fn table_count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_a_snippet_removes_incident_connections(pool: SqlitePool) {
    let project = ProjectRepo::create(
        &pool,
        OWNER,
        &CreateProject {
            name: "P".to_string(),
            description: None,
        },
    )
    .await
    .unwrap();
    let a = SnippetRepo::create(&pool, OWNER, project.id, &new_snippet("a"))
        .await
        .unwrap();
    let b = SnippetRepo::create(&pool, OWNER, project.id, &new_snippet("b"))
        .await
        .unwrap();
    ConnectionRepo::create(
        &pool,
        OWNER,
        project.id,
        &CreateConnection {
            source_snippet_id: a.id,
            target_snippet_id: b.id,
            label: None,
        },
    )
    .await
    .unwrap();

    SnippetRepo::delete(&pool, OWNER, project.id, a.id)
        .await
        .unwrap();

    let remaining = ConnectionRepo::list_by_project(&pool, OWNER, project.id)
        .await
        .unwrap();
    assert!(remaining.is_empty(), "no dangling edge may be observable");

    // B and its ledger survive.
    SnippetRepo::get(&pool, OWNER, project.id, b.id).await.unwrap();
    assert_eq!(VersionRepo::count_for_snippet(&pool, b.id).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_a_snippet_removes_inbound_connections_too(pool: SqlitePool) {
    let project = ProjectRepo::create(
        &pool,
        OWNER,
        &CreateProject {
            name: "P".to_string(),
            description: None,
        },
    )
    .await
    .unwrap();
    let a = SnippetRepo::create(&pool, OWNER, project.id, &new_snippet("a"))
        .await
        .unwrap();
    let b = SnippetRepo::create(&pool, OWNER, project.id, &new_snippet("b"))
        .await
        .unwrap();
    ConnectionRepo::create(
        &pool,
        OWNER,
        project.id,
        &CreateConnection {
            source_snippet_id: a.id,
            target_snippet_id: b.id,
            label: None,
        },
    )
    .await
    .unwrap();

    // Delete the *target* this time.
    SnippetRepo::delete(&pool, OWNER, project.id, b.id)
        .await
        .unwrap();
    let remaining = ConnectionRepo::list_by_project(&pool, OWNER, project.id)
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_a_snippet_removes_ledger_and_generations(pool: SqlitePool) {
    let project = ProjectRepo::create(
        &pool,
        OWNER,
        &CreateProject {
            name: "P".to_string(),
            description: None,
        },
    )
    .await
    .unwrap();
    let snippet = SnippetRepo::create(&pool, OWNER, project.id, &new_snippet("a"))
        .await
        .unwrap();
    GenerationRepo::create(&pool, snippet.id, "text-to-text", &request())
        .await
        .unwrap();

    SnippetRepo::delete(&pool, OWNER, project.id, snippet.id)
        .await
        .unwrap();

    assert_eq!(VersionRepo::count_for_snippet(&pool, snippet.id).await.unwrap(), 0);
    assert_eq!(table_count(&pool, "generations").await, 0);

    let err = SnippetRepo::get(&pool, OWNER, project.id, snippet.id)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "Snippet", .. });
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_a_project_removes_all_children(pool: SqlitePool) {
    let project = ProjectRepo::create(
        &pool,
        OWNER,
        &CreateProject {
            name: "Doomed".to_string(),
            description: None,
        },
    )
    .await
    .unwrap();
    let a = SnippetRepo::create(&pool, OWNER, project.id, &new_snippet("a"))
        .await
        .unwrap();
    let b = SnippetRepo::create(&pool, OWNER, project.id, &new_snippet("b"))
        .await
        .unwrap();
    ConnectionRepo::create(
        &pool,
        OWNER,
        project.id,
        &CreateConnection {
            source_snippet_id: a.id,
            target_snippet_id: b.id,
            label: None,
        },
    )
    .await
    .unwrap();
    GenerationRepo::create(&pool, a.id, "text-to-text", &request())
        .await
        .unwrap();

    // An unrelated project must survive the cascade untouched.
    let other = ProjectRepo::create(
        &pool,
        OWNER,
        &CreateProject {
            name: "Survivor".to_string(),
            description: None,
        },
    )
    .await
    .unwrap();
    SnippetRepo::create(&pool, OWNER, other.id, &new_snippet("safe"))
        .await
        .unwrap();

    ProjectRepo::delete(&pool, OWNER, project.id).await.unwrap();

    assert_eq!(table_count(&pool, "projects").await, 1);
    assert_eq!(table_count(&pool, "snippets").await, 1);
    assert_eq!(table_count(&pool, "connections").await, 0);
    assert_eq!(table_count(&pool, "generations").await, 0);
    assert_eq!(table_count(&pool, "versions").await, 1);

    let err = ProjectRepo::get(&pool, OWNER, project.id).await.unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "Project", .. });
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_a_missing_snippet_is_not_found(pool: SqlitePool) {
    let project = ProjectRepo::create(
        &pool,
        OWNER,
        &CreateProject {
            name: "P".to_string(),
            description: None,
        },
    )
    .await
    .unwrap();

    let err = SnippetRepo::delete(&pool, OWNER, project.id, 424242)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "Snippet", .. });
}
