//! Chat turns and conversation CRUD.

use axum::extract::{Path, State};
use axum::Json;
use euclid_common::models::{
    ChatMessageRequest, ChatMessageResponse, ConversationCreateRequest, ConversationListResponse,
    ConversationResponse, ConversationUpdateRequest, DeleteResponse,
};
use euclid_db::conversations::DEFAULT_LIST_LIMIT;
use tracing::info;

use super::{validated, ApiJson, ApiQuery};
use crate::auth::MaybeUser;
use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

const TITLE_CHARS: usize = 50;
const CONVERSATION_NOT_FOUND: &str = "Conversation not found";

/// POST /api/chat/message
pub async fn chat_message(
    State(state): State<SharedState>,
    user: MaybeUser,
    ApiJson(req): ApiJson<ChatMessageRequest>,
) -> ApiResult<Json<ChatMessageResponse>> {
    let req = validated(req)?;

    let conversation_id = match req.conversation_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => {
            state
                .conversations
                .find_by_id(id)
                .await?
                .ok_or_else(|| ApiError::not_found(CONVERSATION_NOT_FOUND))?
                .id
        }
        None => {
            let title: String = req.message.chars().take(TITLE_CHARS).collect();
            state.conversations.create(Some(title), user.id().map(str::to_string)).await?.id
        }
    };
    state.conversations.add_message(&conversation_id, "user", &req.message, None).await?;

    let reply = state.pipeline.chat(&req.message).await;
    let viz_id = reply.visualization.as_ref().map(|v| v.viz_id.clone());
    state
        .conversations
        .add_message(&conversation_id, "assistant", &reply.response_text, viz_id)
        .await?;
    info!(conversation_id = %conversation_id, has_visualization = reply.visualization.is_some(), "Chat turn answered");

    Ok(Json(ChatMessageResponse {
        conversation_id: Some(conversation_id),
        response_html: Some(state.pipeline.renderer().render(&reply.response_text)),
        response_text: reply.response_text,
        related_concepts: reply.related_concepts,
        visualization: reply.visualization,
    }))
}

/// POST /api/conversations?title=
pub async fn create_conversation(
    State(state): State<SharedState>,
    user: MaybeUser,
    ApiQuery(req): ApiQuery<ConversationCreateRequest>,
) -> ApiResult<Json<ConversationResponse>> {
    let title = req.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    let conversation = state.conversations.create(title, user.id().map(str::to_string)).await?;
    info!(conversation_id = %conversation.id, "Created conversation");
    Ok(Json(ConversationResponse::from(&conversation)))
}

/// GET /api/conversations
///
/// A signed-in user sees their own conversations; anonymous callers see the
/// anonymous ones.
pub async fn list_conversations(
    State(state): State<SharedState>,
    user: MaybeUser,
) -> ApiResult<Json<ConversationListResponse>> {
    let conversations = state.conversations.list(user.id(), DEFAULT_LIST_LIMIT).await?;
    Ok(Json(ConversationListResponse {
        conversations: conversations.iter().map(ConversationResponse::from).collect(),
    }))
}

/// GET /api/conversations/{id}
pub async fn get_conversation(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ConversationResponse>> {
    let conversation = state
        .conversations
        .get_with_messages(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(CONVERSATION_NOT_FOUND))?;
    Ok(Json(ConversationResponse::from(&conversation)))
}

/// PATCH /api/conversations/{id}
pub async fn rename_conversation(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ConversationUpdateRequest>,
) -> ApiResult<Json<ConversationResponse>> {
    let req = validated(req)?;
    let conversation = state.conversations.rename(&id, &req.title).await.map_err(|e| match e {
        euclid_db::DbError::NotFound(_) => ApiError::not_found(CONVERSATION_NOT_FOUND),
        other => other.into(),
    })?;
    Ok(Json(ConversationResponse::from(&conversation)))
}

/// DELETE /api/conversations/{id}
pub async fn delete_conversation(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    if !state.conversations.delete(&id).await? {
        return Err(ApiError::not_found(CONVERSATION_NOT_FOUND));
    }
    info!(conversation_id = %id, "Deleted conversation");
    Ok(Json(DeleteResponse { deleted: true }))
}
