//! Axum router — maps all URL paths to handlers.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post, put};
use axum::{middleware, Router};
use euclid_common::Settings;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers::{animations, auth, catalog, chat, eval, progress, scratchpad, settings, system, tutor};
use crate::middleware::track_metrics;
use crate::sse::sse_handler;
use crate::state::{AppState, SharedState};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);
    let static_dir = shared.settings.paths.static_dir.clone();
    let frontend_dir = shared.settings.paths.frontend_dir.clone();
    let cors = cors_layer(&shared.settings);

    let api = Router::new()
        // Health
        .route("/health", get(system::health))
        .route("/ready",  get(system::ready))
        .route("/metrics", get(system::metrics))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // Accounts and progress
        .route("/api/auth/register",              post(auth::register))
        .route("/api/auth/login",                 post(auth::login))
        .route("/api/auth/me",                    get(auth::me).patch(auth::update_me))
        .route("/api/progress",                   get(progress::list_progress))
        .route("/api/progress/{concept_slug}",    put(progress::update_progress))

        // Chat
        .route("/api/chat/message",        post(chat::chat_message))
        .route("/api/conversations",       get(chat::list_conversations).post(chat::create_conversation))
        .route(
            "/api/conversations/{id}",
            get(chat::get_conversation).patch(chat::rename_conversation).delete(chat::delete_conversation),
        )

        // Tutor and visualizations
        .route("/api/ai/tutor",                  post(tutor::ai_tutor))
        .route("/api/ai/visualize",              post(tutor::visualize))
        .route("/api/ai/agents",                 get(tutor::list_agents))
        .route("/api/visualizations/jobs",       get(tutor::list_jobs))
        .route("/api/visualizations/jobs/{id}",  get(tutor::get_job).delete(tutor::delete_job))
        .route("/api/visualizations/{viz_id}",   get(tutor::get_visualization))

        // Scratchpad and media
        .route("/api/ai/handwriting/recognize", post(scratchpad::recognize))
        .route("/api/ai/handwriting/validate",  post(scratchpad::validate))
        .route("/api/ai/media/image",           post(scratchpad::generate_image))
        .route("/api/ai/media/music",           post(scratchpad::generate_music))

        // Settings
        .route("/api/settings",          get(settings::get_settings).put(settings::update_settings))
        .route("/api/settings/validate", get(settings::validate_settings))
        .route("/api/settings/test",     post(settings::test_settings))

        // Catalog
        .route("/api/prompt-collections",         get(catalog::prompt_collections))
        .route("/api/mindmap/{slug}",             get(catalog::mind_map))
        .route("/api/concepts",                   get(catalog::list_concepts))
        .route("/api/concepts/{slug}/resources",  get(catalog::concept_resources))
        .route("/api/euclid",                     get(catalog::search_euclid))
        .route("/api/euclid/{reference}",         get(catalog::get_euclid_entry))
        .route("/api/resources",                  get(catalog::search_resources))
        .route("/api/resources/{id}",             get(catalog::get_resource))
        .route("/api/mathmap",                    get(catalog::full_map))
        .route("/api/mathmap/categories",         get(catalog::map_categories))
        .route("/api/mathmap/category/{id}",      get(catalog::map_category))
        .route("/api/mathmap/topic/{id}",         get(catalog::map_topic))
        .route("/api/mathmap/search",             get(catalog::map_search))

        // Animations
        .route("/api/animations/scenes",       get(animations::list_scenes))
        .route("/api/animations/jobs",         get(animations::list_jobs))
        .route("/api/animations/status/manim", get(animations::manim_status))
        .route("/api/animations/render",       post(animations::render))
        .route(
            "/api/animations/{id}",
            get(animations::get_animation).delete(animations::delete_animation),
        )

        // Evaluation
        .route("/api/eval/report",        get(eval::report))
        .route("/api/eval/report/export", get(eval::export))
        .route("/api/eval/history",       get(eval::history))
        .route("/api/eval/compare",       get(eval::compare))

        // per-route metrics need the matched path, so this wraps routes only
        .route_layer(middleware::from_fn_with_state(shared.metrics.clone(), track_metrics));

    let frontend = ServeDir::new(&frontend_dir).fallback(ServeFile::new(frontend_dir.join("index.html")));

    api
        // Static files
        .nest_service("/static",     ServeDir::new(&static_dir))
        .nest_service("/animations", ServeDir::new(static_dir.join("animations")))
        .nest_service("/media",      ServeDir::new(static_dir.join("media")))
        .fallback_service(frontend)

        // Middleware
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Any origin unless `server.cors_origins` lists specific ones.
fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins = &settings.server.cors_origins;
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new().allow_origin(AllowOrigin::list(allowed)).allow_methods(Any).allow_headers(Any)
}
