//! Conversation repository.
//!
//! Conversations are owned either by a user id or by nobody (anonymous).
//! Listing never mixes the two.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::schema::{Conversation, ConversationWithMessages, Message};

pub const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Clone)]
pub struct ConversationRepository {
    db: Arc<Database>,
}

impl ConversationRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(&self, title: Option<String>, user_id: Option<String>) -> Result<Conversation> {
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            user_id,
            title: title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            created_at: now,
            updated_at: now,
        };
        let mut tables = self.db.write().await;
        tables.conversations.push(conversation.clone());
        self.db.persist(&tables).await?;
        tracing::debug!(id = %conversation.id, "Conversation created");
        Ok(conversation)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Conversation>> {
        let tables = self.db.read().await;
        Ok(tables.conversations.iter().find(|c| c.id == id).cloned())
    }

    /// The conversation with its messages in creation order.
    pub async fn get_with_messages(&self, id: &str) -> Result<Option<ConversationWithMessages>> {
        let tables = self.db.read().await;
        let Some(conversation) = tables.conversations.iter().find(|c| c.id == id).cloned() else {
            return Ok(None);
        };
        let mut messages: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.conversation_id == id)
            .cloned()
            .collect();
        // stable: equal timestamps keep insertion order
        messages.sort_by_key(|m| m.created_at);
        Ok(Some(ConversationWithMessages { conversation, messages }))
    }

    /// Most recently updated first.
    pub async fn list(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<Conversation>> {
        let tables = self.db.read().await;
        let mut rows: Vec<Conversation> = tables
            .conversations
            .iter()
            .filter(|c| c.user_id.as_deref() == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        rows.truncate(limit);
        Ok(rows)
    }

    pub async fn add_message(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str,
        visualization_id: Option<String>,
    ) -> Result<Message> {
        let mut tables = self.db.write().await;
        let now = Utc::now();
        let conversation = tables
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| DbError::NotFound(format!("Conversation {conversation_id}")))?;
        conversation.updated_at = now;

        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role: role.to_string(),
            content: content.to_string(),
            visualization_id,
            created_at: now,
        };
        tables.messages.push(message.clone());
        self.db.persist(&tables).await?;
        Ok(message)
    }

    pub async fn rename(&self, id: &str, title: &str) -> Result<Conversation> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DbError::InvalidQuery("title must not be empty".to_string()));
        }
        let mut tables = self.db.write().await;
        let conversation = tables
            .conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| DbError::NotFound(format!("Conversation {id}")))?;
        conversation.title = Some(title.to_string());
        conversation.updated_at = Utc::now();
        let renamed = conversation.clone();
        self.db.persist(&tables).await?;
        Ok(renamed)
    }

    /// Delete a conversation and its messages. Returns false if it did not exist.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut tables = self.db.write().await;
        let before = tables.conversations.len();
        tables.conversations.retain(|c| c.id != id);
        if tables.conversations.len() == before {
            return Ok(false);
        }
        tables.messages.retain(|m| m.conversation_id != id);
        self.db.persist(&tables).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> ConversationRepository {
        ConversationRepository::new(Arc::new(Database::in_memory()))
    }

    #[tokio::test]
    async fn test_messages_come_back_in_order() {
        let repo = repo();
        let conv = repo.create(Some("Primes".into()), None).await.unwrap();
        repo.add_message(&conv.id, "user", "What is a prime?", None).await.unwrap();
        repo.add_message(&conv.id, "assistant", "A number with two divisors.", Some("primes_viz".into()))
            .await
            .unwrap();

        let full = repo.get_with_messages(&conv.id).await.unwrap().unwrap();
        let roles: Vec<&str> = full.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant"]);
        assert_eq!(full.messages[1].visualization_id.as_deref(), Some("primes_viz"));
        assert!(full.conversation.updated_at >= conv.updated_at);
    }

    #[tokio::test]
    async fn test_list_separates_anonymous_and_users() {
        let repo = repo();
        repo.create(None, None).await.unwrap();
        repo.create(None, Some("ada".into())).await.unwrap();

        assert_eq!(repo.list(None, DEFAULT_LIST_LIMIT).await.unwrap().len(), 1);
        let mine = repo.list(Some("ada"), DEFAULT_LIST_LIMIT).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id.as_deref(), Some("ada"));
    }

    #[tokio::test]
    async fn test_blank_title_is_stored_as_none() {
        let conv = repo().create(Some("   ".into()), None).await.unwrap();
        assert!(conv.title.is_none());
    }

    #[tokio::test]
    async fn test_add_message_to_missing_conversation() {
        let err = repo().add_message("nope", "user", "hi", None).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rename_and_delete() {
        let repo = repo();
        let conv = repo.create(None, None).await.unwrap();
        repo.add_message(&conv.id, "user", "hello", None).await.unwrap();

        let renamed = repo.rename(&conv.id, " Fractions ").await.unwrap();
        assert_eq!(renamed.title.as_deref(), Some("Fractions"));
        assert!(matches!(repo.rename(&conv.id, "").await, Err(DbError::InvalidQuery(_))));

        assert!(repo.delete(&conv.id).await.unwrap());
        assert!(!repo.delete(&conv.id).await.unwrap());
        assert!(repo.get_with_messages(&conv.id).await.unwrap().is_none());
    }
}
