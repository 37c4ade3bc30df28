//! Read-only lesson content: prompt library, mind map, concepts, Euclid,
//! resources and the math map.

use axum::extract::{Path, State};
use axum::Json;
use euclid_catalog::concepts::{DEFAULT_DEPTH, DEFAULT_LIST_LIMIT as DEFAULT_CONCEPT_LIMIT};
use euclid_catalog::euclid::{EuclidQuery, DEFAULT_SEARCH_LIMIT as DEFAULT_EUCLID_LIMIT};
use euclid_catalog::mathmap::{MapCategory, MathMapData, TopicWithCategory};
use euclid_catalog::resources::{ResourceQuery, DEFAULT_SEARCH_LIMIT as DEFAULT_RESOURCE_LIMIT};
use euclid_common::models::{
    ConceptListResponse, ConceptResponse, EuclidEntryResponse, EuclidSearchResponse, MindMapResponse,
    PromptCollectionsResponse, ResourceResponse, ResourceSearchResponse,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiQuery;
use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

const CONCEPT_NOT_FOUND: &str = "Concept not found";
const MAX_MIND_MAP_DEPTH: u32 = 6;

// ── Prompt collections ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct PromptCollectionQuery {
    pub category_id: Option<String>,
}

/// GET /api/prompt-collections?category_id=
pub async fn prompt_collections(
    State(state): State<SharedState>,
    ApiQuery(q): ApiQuery<PromptCollectionQuery>,
) -> Json<PromptCollectionsResponse> {
    Json(state.catalog.mathmap.prompt_collections(q.category_id.as_deref()))
}

// ── Mind map and concepts ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MindMapQuery {
    pub depth: Option<u32>,
    pub include_leads_to: Option<bool>,
}

/// GET /api/mindmap/{slug}
pub async fn mind_map(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
    ApiQuery(q): ApiQuery<MindMapQuery>,
) -> ApiResult<Json<MindMapResponse>> {
    let depth = q.depth.unwrap_or(DEFAULT_DEPTH).clamp(1, MAX_MIND_MAP_DEPTH);
    state
        .catalog
        .concepts
        .build_mind_map(&slug, depth, q.include_leads_to.unwrap_or(true))
        .map(Json)
        .ok_or_else(|| ApiError::not_found(CONCEPT_NOT_FOUND))
}

#[derive(Debug, Deserialize)]
pub struct ConceptListQuery {
    pub category: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/concepts?category=&limit=
pub async fn list_concepts(
    State(state): State<SharedState>,
    ApiQuery(q): ApiQuery<ConceptListQuery>,
) -> Json<ConceptListResponse> {
    let concepts = state
        .catalog
        .concepts
        .list_concepts(q.category.as_deref(), q.limit.unwrap_or(DEFAULT_CONCEPT_LIMIT))
        .into_iter()
        .map(ConceptResponse::from)
        .collect();
    Json(ConceptListResponse { concepts })
}

/// GET /api/concepts/{slug}/resources
pub async fn concept_resources(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<ResourceSearchResponse>> {
    if state.catalog.concepts.get(&slug).is_none() {
        return Err(ApiError::not_found(CONCEPT_NOT_FOUND));
    }
    let resources = state.catalog.resources.for_concept(&slug).into_iter().map(ResourceResponse::from).collect();
    Ok(Json(ResourceSearchResponse { resources }))
}

// ── Euclid's Elements ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EuclidSearchQuery {
    pub query: Option<String>,
    pub book: Option<u32>,
    pub entry_type: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/euclid?query=&book=&entry_type=&limit=
pub async fn search_euclid(
    State(state): State<SharedState>,
    ApiQuery(q): ApiQuery<EuclidSearchQuery>,
) -> Json<EuclidSearchResponse> {
    let query = EuclidQuery {
        query: q.query.as_deref(),
        book: q.book,
        entry_type: q.entry_type.as_deref(),
        limit: q.limit.unwrap_or(DEFAULT_EUCLID_LIMIT),
    };
    let entries = state.catalog.euclid.search(&query).into_iter().cloned().collect();
    Json(EuclidSearchResponse { entries })
}

/// GET /api/euclid/{reference}
pub async fn get_euclid_entry(
    State(state): State<SharedState>,
    Path(reference): Path<String>,
) -> ApiResult<Json<EuclidEntryResponse>> {
    state
        .catalog
        .euclid
        .get_by_reference(&reference)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Euclid entry not found"))
}

// ── Resources ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResourceSearchQuery {
    pub query: Option<String>,
    pub resource_type: Option<String>,
    pub difficulty: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/resources?query=&resource_type=&difficulty=&limit=
pub async fn search_resources(
    State(state): State<SharedState>,
    ApiQuery(q): ApiQuery<ResourceSearchQuery>,
) -> Json<ResourceSearchResponse> {
    let query = ResourceQuery {
        query: q.query.as_deref(),
        resource_type: q.resource_type.as_deref(),
        difficulty: q.difficulty.as_deref(),
        limit: q.limit.unwrap_or(DEFAULT_RESOURCE_LIMIT),
    };
    let resources = state.catalog.resources.search(&query).into_iter().map(ResourceResponse::from).collect();
    Json(ResourceSearchResponse { resources })
}

/// GET /api/resources/{id}
pub async fn get_resource(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ResourceResponse>> {
    state
        .catalog
        .resources
        .get_by_id(&id)
        .map(|r| Json(ResourceResponse::from(r)))
        .ok_or_else(|| ApiError::not_found("Resource not found"))
}

// ── Math map ─────────────────────────────────────────────────────────────────

/// GET /api/mathmap
pub async fn full_map(State(state): State<SharedState>) -> Json<MathMapData> {
    Json(state.catalog.mathmap.full_map().clone())
}

/// GET /api/mathmap/categories
pub async fn map_categories(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({ "categories": state.catalog.mathmap.categories() }))
}

/// GET /api/mathmap/category/{id}
pub async fn map_category(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MapCategory>> {
    state
        .catalog
        .mathmap
        .category(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Category not found"))
}

/// GET /api/mathmap/topic/{id}
pub async fn map_topic(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TopicWithCategory>> {
    state
        .catalog
        .mathmap
        .topic(&id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Topic not found"))
}

#[derive(Debug, Deserialize)]
pub struct MapSearchQuery {
    pub query: String,
}

/// GET /api/mathmap/search?query=
pub async fn map_search(State(state): State<SharedState>, ApiQuery(q): ApiQuery<MapSearchQuery>) -> Json<Value> {
    Json(json!({ "results": state.catalog.mathmap.search(&q.query) }))
}
