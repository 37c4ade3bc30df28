//! HTTP contract tests against the full router, with no model or external tools.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use euclid_catalog::Catalog;
use euclid_common::{Settings, SettingsStore};
use euclid_db::Database;
use euclid_tutor::{LocalEngine, RetrievedSnippet, SnippetSource, TutorService, VisualizationExecutor, WebRag};
use euclid_web::{build_router, AppState};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct NoSnippets;

#[async_trait]
impl SnippetSource for NoSnippets {
    async fn retrieve(&self, _query: &str, _limit: usize) -> Vec<RetrievedSnippet> {
        Vec::new()
    }
}

fn app(dir: &TempDir) -> Router {
    let mut settings = Settings::default();
    settings.paths.data_dir = dir.path().join("data");
    settings.paths.static_dir = dir.path().join("static");
    settings.paths.frontend_dir = dir.path().join("frontend");
    settings.paths.scenes_dir = dir.path().join("scenes");
    settings.paths.store_snapshot = None;
    settings.tools.python_bin = "definitely-not-python".to_string();
    settings.tools.tesseract_bin = "definitely-not-tesseract".to_string();
    settings.media.diffusion_url = None;
    settings.media.music_url = None;

    let base = Arc::new(settings);
    let store = Arc::new(SettingsStore::open(base.paths.settings_file()));
    let engine = LocalEngine::new(None, base.clone(), store.clone());
    let rag = Arc::new(WebRag::new(Arc::new(NoSnippets), base.clone(), store.clone()));
    let executor = VisualizationExecutor::new("definitely-not-python", Duration::from_secs(1), dir.path());
    let tutor = Arc::new(TutorService::new(base.clone(), store.clone(), engine, rag, executor));
    let catalog = Arc::new(Catalog::embedded().unwrap());
    let state = AppState::new(base, store, catalog, Arc::new(Database::in_memory()), tutor, None);
    build_router(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

// ── System ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_and_ready() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());

    let (status, body) = get(&app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_metrics_count_matched_routes() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);
    get(&app, "/health").await;

    let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("euclids_window_requests_total"));
    assert!(text.contains("endpoint=\"/health\""));
}

#[tokio::test]
async fn test_malformed_query_uses_detail_body() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, body) = get(&app, "/api/concepts?limit=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("Failed to deserialize query string"));

    let (status, body) = get(&app, "/api/euclid?limit=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

// ── Accounts and progress ────────────────────────────────────────────────────

async fn send_as(app: &Router, method: Method, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri).header(header::AUTHORIZATION, format!("Bearer {token}"));
    let body = match body {
        Some(body) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn register(app: &Router, email: &str) -> String {
    let (status, body) = post(app, "/api/auth/register", json!({"email": email, "password": "password123"})).await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_register_login_and_me() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, body) = post(
        &app,
        "/api/auth/register",
        json!({"email": "Ada@Example.com", "password": "password123", "name": "Test User"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["name"], "Test User");
    assert_eq!(body["user"]["learning_level"], "beginner");

    let (status, body) = post(&app, "/api/auth/register", json!({"email": "ada@example.com", "password": "password123"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("already registered"));

    let (status, body) = post(&app, "/api/auth/login", json!({"email": "ada@example.com", "password": "password123"})).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap().to_string();

    let (status, me) = send_as(&app, Method::GET, "/api/auth/me", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ada@example.com");

    let (status, updated) = send_as(
        &app,
        Method::PATCH,
        "/api/auth/me",
        &token,
        Some(json!({"name": "Updated Name", "learning_level": "intermediate"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Updated Name");
    assert_eq!(updated["learning_level"], "intermediate");
}

#[tokio::test]
async fn test_auth_failures() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);
    register(&app, "emmy@example.com").await;

    let (status, body) = post(&app, "/api/auth/login", json!({"email": "emmy@example.com", "password": "wrongpassword"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"detail": "Invalid email or password"}));
    let (status, _) = post(&app, "/api/auth/login", json!({"email": "nobody@example.com", "password": "password123"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send_as(&app, Method::GET, "/api/auth/me", "invalid_token", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid or expired token");
    let (status, body) = get(&app, "/api/progress").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Not authenticated");

    let (status, _) = post(&app, "/api/auth/register", json!({"email": "not-an-email", "password": "password123"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = post(&app, "/api/auth/register", json!({"email": "x@example.com", "password": "short"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_progress_upsert_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);
    let token = register(&app, "sofia@example.com").await;

    let uri = "/api/progress/pythagorean_theorem";
    let (status, body) = send_as(&app, Method::PUT, uri, &token, Some(json!({"status": "in_progress"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "in_progress");
    assert!(body["score"].is_null());

    send_as(&app, Method::PUT, uri, &token, Some(json!({"status": "completed", "score": 85}))).await;
    let (status, body) = send_as(&app, Method::GET, "/api/progress", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let progress = body["progress"].as_array().unwrap();
    assert_eq!(progress.len(), 1);
    assert_eq!(progress[0]["concept_slug"], "pythagorean_theorem");
    assert_eq!(progress[0]["score"], 85);

    let (status, _) = send_as(&app, Method::PUT, uri, &token, Some(json!({"status": "completed", "score": 101}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let other = register(&app, "hypatia@example.com").await;
    let (_, body) = send_as(&app, Method::GET, "/api/progress", &other, None).await;
    assert_eq!(body["progress"], json!([]));
}

#[tokio::test]
async fn test_conversations_are_scoped_to_the_signed_in_user() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);
    let token = register(&app, "ada@example.com").await;

    let (status, _) = send_as(&app, Method::POST, "/api/conversations?title=Mine", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    send(&app, Method::POST, "/api/conversations?title=Anonymous", None).await;

    let (_, mine) = send_as(&app, Method::GET, "/api/conversations", &token, None).await;
    let mine = mine["conversations"].as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["title"], "Mine");

    let (_, anonymous) = get(&app, "/api/conversations").await;
    let anonymous = anonymous["conversations"].as_array().unwrap();
    assert_eq!(anonymous.len(), 1);
    assert_eq!(anonymous[0]["title"], "Anonymous");
}

// ── Chat and conversations ───────────────────────────────────────────────────

#[tokio::test]
async fn test_chat_creates_conversation_and_stores_both_turns() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, body) = post(&app, "/api/chat/message", json!({"message": "What is the Pythagorean theorem?"})).await;
    assert_eq!(status, StatusCode::OK);
    let id = body["conversation_id"].as_str().unwrap().to_string();
    assert!(!body["response_text"].as_str().unwrap().is_empty());
    assert!(body["response_html"].as_str().unwrap().contains('<'));

    let (status, conversation) = get(&app, &format!("/api/conversations/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(conversation["title"], "What is the Pythagorean theorem?");
    let messages = conversation["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
}

#[tokio::test]
async fn test_chat_errors() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, body) =
        post(&app, "/api/chat/message", json!({"message": "hello", "conversation_id": "missing"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"detail": "Conversation not found"}));

    let (status, body) = post(&app, "/api/chat/message", json!({"message": ""})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/chat/message")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_conversation_crud() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, created) = send(&app, Method::POST, "/api/conversations?title=Geometry", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["title"], "Geometry");
    let id = created["id"].as_str().unwrap().to_string();

    let (_, list) = get(&app, "/api/conversations").await;
    assert_eq!(list["conversations"].as_array().unwrap().len(), 1);

    let uri = format!("/api/conversations/{id}");
    let (status, renamed) = send(&app, Method::PATCH, &uri, Some(json!({"title": "Triangles"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["title"], "Triangles");

    let (status, _) = send(&app, Method::PATCH, "/api/conversations/missing", Some(json!({"title": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"deleted": true}));

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Tutor and visualizations ─────────────────────────────────────────────────

#[tokio::test]
async fn test_tutor_answer_shape() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, body) = post(
        &app,
        "/api/ai/tutor",
        json!({"question": "Solve x^2 - 5x + 6 = 0", "response_mode": "both", "learner_level": "college"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["solution"].as_str().unwrap().is_empty());
    assert_eq!(body["response_mode"], "both");
    assert_eq!(body["learner_level"], "college");
    assert!(body["checks"].is_array());
    assert!(body["plain_explanation"].is_string());
    assert!(body["axiomatic_explanation"].is_string());
}

#[tokio::test]
async fn test_visualize_diagram_uses_builtin_figure() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, body) = post(&app, "/api/ai/visualize", json!({"question": "Graph a parabola"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["visualization"]["viz_type"], "plotly");
}

#[tokio::test]
async fn test_visualize_animation_without_scene() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, body) =
        post(&app, "/api/ai/visualize", json!({"question": "Explain set theory", "style": "animation"})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["visualization"].is_null());
    assert!(body["animation_id"].is_null());
    assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_visualize_animation_reports_missing_renderer() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, body) = post(
        &app,
        "/api/ai/visualize",
        json!({"question": "Show eigenvectors", "style": "animation", "async_render": false}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["animation_id"].is_string());
    assert_eq!(body["status"], "error");
    assert!(body["visualization"].is_null());
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_visualization_jobs_and_catalog_figures() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, body) = get(&app, "/api/visualizations/jobs/missing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not_found");

    let (_, body) = get(&app, "/api/visualizations/jobs?limit=5").await;
    assert_eq!(body["jobs"], json!([]));

    let (status, body) = send(&app, Method::DELETE, "/api/visualizations/jobs/missing", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"deleted": false}));

    let (status, body) = get(&app, "/api/visualizations/parabola_plotly").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["viz_type"], "plotly");
    assert!(body["data"]["data"].is_array());

    let (status, body) = get(&app, "/api/visualizations/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Visualization not found");
}

#[tokio::test]
async fn test_agents_listed() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, body) = get(&app, "/api/ai/agents").await;
    assert_eq!(status, StatusCode::OK);
    let agents = body["agents"].as_array().unwrap();
    assert_eq!(agents.len(), 7);
    assert_eq!(agents[0]["id"], "planner_agent");
    assert_eq!(agents[6]["id"], "web_research_agent");
}

// ── Scratchpad, media and settings ───────────────────────────────────────────

#[tokio::test]
async fn test_scratchpad_and_media_degrade_without_tools() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, body) = post(
        &app,
        "/api/ai/handwriting/recognize",
        json!({"image_data": "data:image/png;base64,aGVsbG8gd29ybGQgaGVsbG8="}),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["detail"].as_str().unwrap().contains("tesseract"));

    let (status, body) = post(
        &app,
        "/api/ai/handwriting/validate",
        json!({"question": "Solve x^2 - 5x + 6 = 0", "answer_text": "x = 2 or x = 3"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["pass_rate"].is_number());

    let (status, _) = post(&app, "/api/ai/media/image", json!({"prompt": "a golden spiral"})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) =
        post(&app, "/api/ai/media/music", json!({"prompt": "calm piano", "duration_seconds": 60})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_settings_overrides_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, before) = get(&app, "/api/settings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(before["local_web_rag_enabled"], true);

    let (status, after) =
        send(&app, Method::PUT, "/api/settings", Some(json!({"local_web_rag_enabled": false}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["local_web_rag_enabled"], false);

    let (_, reread) = get(&app, "/api/settings").await;
    assert_eq!(reread["local_web_rag_enabled"], false);
    assert!(dir.path().join("data").join("app_settings.json").exists());

    let (status, body) = post(&app, "/api/settings/test", json!({"target": "diffusion"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
}

// ── Catalog ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_mind_map_and_concepts() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, body) = get(&app, "/api/mindmap/pythagorean_theorem?depth=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["target"], "pythagorean_theorem");
    let nodes = body["nodes"].as_array().unwrap();
    assert!(nodes.iter().any(|n| n["id"] == "pythagorean_theorem" && n["is_target"] == true));

    let (status, body) = get(&app, "/api/mindmap/unknown_concept").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Concept not found");

    let (_, body) = get(&app, "/api/concepts?limit=3").await;
    assert_eq!(body["concepts"].as_array().unwrap().len(), 3);

    let (status, body) = get(&app, "/api/concepts/pythagorean_theorem/resources").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["resources"].as_array().unwrap().iter().any(|r| r["id"] == "res-khan-pythagoras"));
}

#[tokio::test]
async fn test_euclid_and_resources() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, body) = get(&app, "/api/euclid/I.Post.5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reference"], "I.Post.5");

    let (status, _) = get(&app, "/api/euclid/XIV.Prop.99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = get(&app, "/api/euclid?book=1&limit=2").await;
    assert!(body["entries"].as_array().unwrap().len() <= 2);

    let (status, body) = get(&app, "/api/resources/res-khan-pythagoras").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "res-khan-pythagoras");

    let (status, _) = get(&app, "/api/resources/res-missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_math_map_routes() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (_, body) = get(&app, "/api/mathmap/categories").await;
    assert!(body["categories"].as_array().unwrap().iter().any(|c| c["id"] == "number_theory"));

    let (status, body) = get(&app, "/api/mathmap/topic/prime_numbers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category_id"], "number_theory");

    let (status, _) = get(&app, "/api/mathmap/category/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = get(&app, "/api/mathmap/search?query=prime").await;
    assert!(!body["results"].as_array().unwrap().is_empty());

    let (_, body) = get(&app, "/api/prompt-collections?category_id=geometry").await;
    let categories = body["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["category_id"], "geometry");
}

// ── Animations ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_animation_routes_without_manim() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (_, body) = get(&app, "/api/animations/status/manim").await;
    assert_eq!(body["available"], false);
    assert_eq!(body["scenes_count"], 0);

    let (status, _) = post(&app, "/api/animations/render", json!({"scene_name": "not a class"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = post(&app, "/api/animations/render", json!({"scene_name": "PythagoreanTheorem"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");

    let (_, body) = get(&app, "/api/animations/0123456789abcdef").await;
    assert_eq!(body["status"], "not_found");
}

// ── Evaluation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_eval_report_history_compare_export() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, _) = get(&app, "/api/eval/report/export?latest=true").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, report) = get(&app, "/api/eval/report?persist=true&run_label=baseline&run_tags=ci,%20nightly").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_prompts"], 12);
    assert_eq!(report["mode"], "catalog");
    assert_eq!(report["run_tags"], json!(["ci", "nightly"]));

    let (_, history) = get(&app, "/api/eval/history?tag=ci").await;
    let runs = history["runs"].as_array().unwrap();
    assert_eq!(runs.len(), 1);
    let id = runs[0]["id"].as_str().unwrap();

    let (_, filtered) = get(&app, "/api/eval/history?label_contains=other").await;
    assert_eq!(filtered["runs"], json!([]));

    let (status, compared) = get(&app, &format!("/api/eval/compare?run_a_id={id}&run_b_id={id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(compared["delta"]["error_count"], 0);

    let (status, _) = get(&app, &format!("/api/eval/compare?run_a_id={id}&run_b_id=missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = Request::builder().uri("/api/eval/report/export?format=csv&latest=true").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(csv.starts_with("prompt,duration_ms,has_visualization"));
    assert_eq!(csv.lines().count(), 13);
}
