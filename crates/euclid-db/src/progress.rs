//! Per-user concept progress.

use std::sync::Arc;

use chrono::Utc;
use euclid_common::models::ProgressStatus;

use crate::database::Database;
use crate::error::Result;
use crate::schema::Progress;

#[derive(Clone)]
pub struct ProgressRepository {
    db: Arc<Database>,
}

impl ProgressRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create or update the row for `(user_id, concept_slug)`. An absent
    /// `score` keeps the previous one.
    pub async fn upsert(
        &self,
        user_id: &str,
        concept_slug: &str,
        status: ProgressStatus,
        score: Option<u32>,
    ) -> Result<Progress> {
        let mut tables = self.db.write().await;
        let now = Utc::now();
        let existing = tables
            .progress
            .iter_mut()
            .find(|p| p.user_id == user_id && p.concept_slug == concept_slug);
        let row = match existing {
            Some(row) => {
                row.status = status;
                if score.is_some() {
                    row.score = score;
                }
                row.last_accessed = now;
                row.clone()
            }
            None => {
                let row = Progress {
                    user_id: user_id.to_string(),
                    concept_slug: concept_slug.to_string(),
                    status,
                    score,
                    last_accessed: now,
                };
                tables.progress.push(row.clone());
                row
            }
        };
        self.db.persist(&tables).await?;
        Ok(row)
    }

    /// Most recently touched first.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Progress>> {
        let tables = self.db.read().await;
        let mut rows: Vec<Progress> = tables.progress.iter().filter(|p| p.user_id == user_id).cloned().collect();
        rows.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> ProgressRepository {
        ProgressRepository::new(Arc::new(Database::in_memory()))
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_row_per_concept() {
        let repo = repo();
        repo.upsert("u1", "pythagorean_theorem", ProgressStatus::InProgress, None).await.unwrap();
        let done = repo.upsert("u1", "pythagorean_theorem", ProgressStatus::Completed, Some(85)).await.unwrap();
        assert_eq!(done.score, Some(85));

        let again = repo.upsert("u1", "pythagorean_theorem", ProgressStatus::Completed, None).await.unwrap();
        assert_eq!(again.score, Some(85));
        assert_eq!(repo.list("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_is_per_user_and_newest_first() {
        let repo = repo();
        repo.upsert("u1", "primes", ProgressStatus::InProgress, None).await.unwrap();
        repo.upsert("u2", "fractions", ProgressStatus::Completed, Some(70)).await.unwrap();
        repo.upsert("u1", "slope", ProgressStatus::NotStarted, None).await.unwrap();
        repo.upsert("u1", "primes", ProgressStatus::Completed, None).await.unwrap();

        let slugs: Vec<String> = repo.list("u1").await.unwrap().into_iter().map(|p| p.concept_slug).collect();
        assert_eq!(slugs, vec!["primes", "slope"]);
        assert!(repo.list("nobody").await.unwrap().is_empty());
    }
}
