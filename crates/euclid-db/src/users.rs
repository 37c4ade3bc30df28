//! User account repository. Passwords arrive already hashed.

use std::sync::Arc;

use chrono::Utc;
use euclid_common::models::LearningLevel;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::schema::User;

pub const EMAIL_TAKEN: &str = "Email already registered";

#[derive(Clone)]
pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new account. Emails compare case-insensitively.
    pub async fn create(&self, email: &str, password_hash: String, name: Option<String>) -> Result<User> {
        let email = email.trim().to_lowercase();
        let mut tables = self.db.write().await;
        if tables.users.iter().any(|u| u.email == email) {
            return Err(DbError::Conflict(EMAIL_TAKEN.to_string()));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash,
            name: name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            learning_level: LearningLevel::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        self.db.persist(&tables).await?;
        tracing::debug!(id = %user.id, "User created");
        Ok(user)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let tables = self.db.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        let tables = self.db.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    /// Apply the fields that are present; a blank name clears it.
    pub async fn update_profile(
        &self,
        id: &str,
        name: Option<String>,
        learning_level: Option<LearningLevel>,
    ) -> Result<User> {
        let mut tables = self.db.write().await;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| DbError::NotFound(format!("User {id}")))?;
        if let Some(name) = name {
            user.name = Some(name.trim().to_string()).filter(|n| !n.is_empty());
        }
        if let Some(level) = learning_level {
            user.learning_level = level;
        }
        user.updated_at = Utc::now();
        let updated = user.clone();
        self.db.persist(&tables).await?;
        Ok(updated)
    }
}
