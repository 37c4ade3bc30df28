//! Tutor answers, on-demand visualizations, diagram jobs and agent status.

use axum::extract::{Path, State};
use axum::Json;
use euclid_catalog::visualizations;
use euclid_common::models::{
    AgentInfo, AgentListResponse, AnimationRenderRequest, AnimationResponse, DeleteResponse, JobStatus,
    TutorRequest, TutorResponse, VisualizationJobListResponse, VisualizationJobResponse,
    VisualizationOnDemandRequest, VisualizationOnDemandResponse, VisualizationPayload, VisualizationStyle,
    VisualizationType,
};
use euclid_tutor::animation::scene_for_question;
use euclid_tutor::coordinator::{HELPER_AGENTS, WEB_RESEARCH_AGENT_ID};
use euclid_tutor::jobs::NO_PLAN_ERROR;
use euclid_tutor::planner::PLANNER_AGENT_ID;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{validated, ApiJson, ApiQuery};
use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

const DEFAULT_JOB_LIST_LIMIT: usize = 20;

/// POST /api/ai/tutor
pub async fn ai_tutor(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<TutorRequest>,
) -> ApiResult<Json<TutorResponse>> {
    let req = validated(req)?;
    let resp = state.pipeline.respond(&req).await;
    info!(
        mode = ?resp.response_mode,
        level = ?resp.learner_level,
        has_visualization = resp.visualization.is_some(),
        "Tutor answered"
    );
    Ok(Json(resp))
}

/// POST /api/ai/visualize
pub async fn visualize(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<VisualizationOnDemandRequest>,
) -> ApiResult<Json<VisualizationOnDemandResponse>> {
    let req = validated(req)?;
    let question = req.question.trim();
    let resp = match req.style {
        VisualizationStyle::Diagram => diagram_on_demand(&state, question, req.async_render).await,
        VisualizationStyle::Animation => animation_on_demand(&state, question, &req).await,
    };
    Ok(Json(resp))
}

fn message_only(message: impl Into<String>) -> VisualizationOnDemandResponse {
    VisualizationOnDemandResponse {
        message: message.into(),
        visualization: None,
        animation_id: None,
        visualization_job_id: None,
        status: None,
        progress: None,
        error: None,
    }
}

async fn diagram_on_demand(state: &SharedState, question: &str, background: bool) -> VisualizationOnDemandResponse {
    if let Some(viz) = state.tutor().fallback_visualization(question).await {
        return VisualizationOnDemandResponse {
            visualization: Some(viz),
            status: Some(JobStatus::Completed),
            progress: Some(100),
            ..message_only("Here is a diagram for this topic.")
        };
    }
    if background {
        let job = state.jobs.start(question);
        return VisualizationOnDemandResponse {
            visualization_job_id: Some(job.id),
            status: Some(job.status),
            progress: Some(job.progress),
            ..message_only("Building a diagram in the background.")
        };
    }
    let prompt = format!("{question}. Provide a visualization.");
    match state.tutor().answer(&prompt, &[]).await.and_then(|a| a.visualization) {
        Some(viz) => VisualizationOnDemandResponse {
            visualization: Some(viz),
            status: Some(JobStatus::Completed),
            progress: Some(100),
            ..message_only("Here is a diagram for this topic.")
        },
        None => VisualizationOnDemandResponse {
            status: Some(JobStatus::Error),
            error: Some(NO_PLAN_ERROR.to_string()),
            ..message_only(NO_PLAN_ERROR)
        },
    }
}

async fn animation_on_demand(
    state: &SharedState,
    question: &str,
    req: &VisualizationOnDemandRequest,
) -> VisualizationOnDemandResponse {
    let Some(scene) = scene_for_question(question) else {
        return message_only("No animation is available for this topic yet.");
    };
    let render = AnimationRenderRequest {
        scene_name: scene.to_string(),
        quality: req.quality,
        output_format: req.output_format,
        background: req.async_render,
    };
    let result = if req.async_render {
        state.animations.start_render(render)
    } else {
        state.animations.render(&render).await
    };
    animation_reply(scene, result)
}

fn animation_reply(scene: &str, result: AnimationResponse) -> VisualizationOnDemandResponse {
    let mut resp = VisualizationOnDemandResponse {
        animation_id: Some(result.id.clone()),
        status: Some(result.status),
        progress: Some(result.progress),
        error: result.error.clone(),
        ..message_only(format!("Rendering the {scene} animation."))
    };
    match (result.status, result.url) {
        (JobStatus::Completed, Some(url)) => {
            resp.message = "Animation ready.".to_string();
            resp.visualization = Some(VisualizationPayload {
                viz_id: result.id,
                viz_type: VisualizationType::Manim,
                title: scene.to_string(),
                data: json!({ "url": url, "format": result.format }),
            });
        }
        (JobStatus::Error, _) => {
            resp.message = result.error.unwrap_or_else(|| "Animation failed.".to_string());
        }
        _ => {}
    }
    resp
}

#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    pub limit: Option<usize>,
}

/// GET /api/visualizations/jobs?limit=
pub async fn list_jobs(
    State(state): State<SharedState>,
    ApiQuery(q): ApiQuery<JobListQuery>,
) -> Json<VisualizationJobListResponse> {
    Json(VisualizationJobListResponse { jobs: state.jobs.list(q.limit.unwrap_or(DEFAULT_JOB_LIST_LIMIT)) })
}

/// GET /api/visualizations/jobs/{id}
pub async fn get_job(State(state): State<SharedState>, Path(id): Path<String>) -> Json<VisualizationJobResponse> {
    Json(state.jobs.get(&id))
}

/// DELETE /api/visualizations/jobs/{id}
pub async fn delete_job(State(state): State<SharedState>, Path(id): Path<String>) -> Json<DeleteResponse> {
    Json(DeleteResponse { deleted: state.jobs.delete(&id) })
}

/// GET /api/visualizations/{viz_id}
pub async fn get_visualization(Path(viz_id): Path<String>) -> ApiResult<Json<Value>> {
    visualizations::get_by_id(&viz_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Visualization not found"))
}

/// GET /api/ai/agents
pub async fn list_agents(State(state): State<SharedState>) -> Json<AgentListResponse> {
    let effective = state.store.effective(&state.settings);
    let registry = state.tutor().agents();
    let local = effective.local_ai_enabled;
    let helpers_on = local && effective.local_multi_agent_enabled && !effective.fast_mode_enabled;

    let mut agents: Vec<AgentInfo> = Vec::with_capacity(HELPER_AGENTS.len() + 2);
    agents.push(registry.info(
        PLANNER_AGENT_ID,
        "Planner Agent",
        local,
        Some(format!("model: {}", effective.local_llm_model)),
    ));
    for (id, name, _, _) in HELPER_AGENTS {
        agents.push(registry.info(id, name, helpers_on, None));
    }
    agents.push(registry.info(
        WEB_RESEARCH_AGENT_ID,
        "Web Research Agent",
        helpers_on && effective.local_web_rag_enabled,
        Some("Wikipedia summaries".to_string()),
    ));
    Json(AgentListResponse { agents })
}
