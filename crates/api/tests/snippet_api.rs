//! HTTP-level integration tests for snippets and their version
//! ledgers.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, create_project, create_snippet, get, put_json, USER};
use serde_json::json;
use sqlx::SqlitePool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn snippet_create_returns_initial_version_pointer(pool: SqlitePool) {
    let app = build_test_app(pool);
    let project = create_project(&app.router, USER, "P").await;
    let project_id = project["id"].as_i64().unwrap();

    let snippet = create_snippet(&app.router, USER, project_id, "draft").await;
    assert_eq!(snippet["text_primary"], "draft");
    assert!(snippet["current_version_id"].as_i64().unwrap() > 0);

    let versions = body_json(
        get(
            &app.router,
            &format!(
                "/api/v1/projects/{project_id}/snippets/{}/versions",
                snippet["id"]
            ),
            USER,
        )
        .await,
    )
    .await;
    let data = versions["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["seq"], 1);
    assert_eq!(data[0]["created_by"], "user");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn text_edit_appends_to_ledger_position_move_does_not(pool: SqlitePool) {
    let app = build_test_app(pool);
    let project = create_project(&app.router, USER, "P").await;
    let project_id = project["id"].as_i64().unwrap();
    let snippet = create_snippet(&app.router, USER, project_id, "draft").await;
    let snippet_id = snippet["id"].as_i64().unwrap();
    let base = format!("/api/v1/projects/{project_id}/snippets/{snippet_id}");

    // Move only: revision bumps, ledger does not grow.
    let moved = put_json(
        &app.router,
        &base,
        USER,
        json!({ "position": { "x": 50.0, "y": 80.0 }, "revision": 1 }),
    )
    .await;
    assert_eq!(moved.status(), StatusCode::OK);
    let moved = body_json(moved).await;
    assert_eq!(moved["data"]["revision"], 2);
    assert_eq!(
        moved["data"]["current_version_id"],
        snippet["current_version_id"]
    );

    // Text edit: ledger grows and the pointer advances.
    let edited = body_json(
        put_json(
            &app.router,
            &base,
            USER,
            json!({ "text_primary": "draft, revised", "revision": 2 }),
        )
        .await,
    )
    .await;
    assert_ne!(
        edited["data"]["current_version_id"],
        snippet["current_version_id"]
    );

    let versions = body_json(get(&app.router, &format!("{base}/versions"), USER).await).await;
    let data = versions["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[1]["text_primary"], "draft, revised");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn conflicting_edits_surface_409(pool: SqlitePool) {
    let app = build_test_app(pool);
    let project = create_project(&app.router, USER, "P").await;
    let project_id = project["id"].as_i64().unwrap();
    let snippet = create_snippet(&app.router, USER, project_id, "draft").await;
    let base = format!(
        "/api/v1/projects/{project_id}/snippets/{}",
        snippet["id"].as_i64().unwrap()
    );

    let first = put_json(
        &app.router,
        &base,
        USER,
        json!({ "text_primary": "first", "revision": 1 }),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = put_json(
        &app.router,
        &base,
        USER,
        json!({ "text_primary": "second", "revision": 1 }),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    // Exactly one ledger entry was added by the race.
    let versions = body_json(get(&app.router, &format!("{base}/versions"), USER).await).await;
    assert_eq!(versions["data"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn version_listing_paginates_with_keyset(pool: SqlitePool) {
    let app = build_test_app(pool);
    let project = create_project(&app.router, USER, "P").await;
    let project_id = project["id"].as_i64().unwrap();
    let snippet = create_snippet(&app.router, USER, project_id, "v1").await;
    let snippet_id = snippet["id"].as_i64().unwrap();
    let base = format!("/api/v1/projects/{project_id}/snippets/{snippet_id}");

    for (revision, text) in [(1, "v2"), (2, "v3"), (3, "v4")] {
        let response = put_json(
            &app.router,
            &base,
            USER,
            json!({ "text_primary": text, "revision": revision }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let first_page =
        body_json(get(&app.router, &format!("{base}/versions?limit=2"), USER).await).await;
    let first: Vec<i64> = first_page["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["seq"].as_i64().unwrap())
        .collect();
    assert_eq!(first, vec![1, 2]);

    let second_page = body_json(
        get(
            &app.router,
            &format!("{base}/versions?after_seq=2&limit=2"),
            USER,
        )
        .await,
    )
    .await;
    let second: Vec<i64> = second_page["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["seq"].as_i64().unwrap())
        .collect();
    assert_eq!(second, vec![3, 4]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn snippet_validation_rejects_bad_input(pool: SqlitePool) {
    let app = build_test_app(pool);
    let project = create_project(&app.router, USER, "P").await;
    let project_id = project["id"].as_i64().unwrap();

    let response = common::post_json(
        &app.router,
        &format!("/api/v1/projects/{project_id}/snippets"),
        USER,
        json!({ "text_primary": "", "position": { "x": 0.0, "y": 0.0 } }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
