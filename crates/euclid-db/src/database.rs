//! Database handle and snapshot persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::Result;
use crate::schema::{Conversation, EvalRun, Message, Progress, User};

/// Everything the store holds. Serialized as-is into the snapshot file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Tables {
    #[serde(default)]
    pub conversations: Vec<Conversation>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub eval_runs: Vec<EvalRun>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub progress: Vec<Progress>,
}

/// Main database handle.
pub struct Database {
    tables: RwLock<Tables>,
    snapshot: Option<PathBuf>,
}

impl Database {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self { tables: RwLock::new(Tables::default()), snapshot: None }
    }

    /// Open a store backed by a JSON snapshot, loading it if it exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let tables: Tables = serde_json::from_slice(&bytes)?;
                tracing::info!(
                    path = %path.display(),
                    conversations = tables.conversations.len(),
                    eval_runs = tables.eval_runs.len(),
                    users = tables.users.len(),
                    "Loaded store snapshot"
                );
                tables
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Tables::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { tables: RwLock::new(tables), snapshot: Some(path) })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().await
    }

    /// Flush the tables to the snapshot file, if one is configured.
    /// Takes the guard so the file always reflects a consistent state.
    pub(crate) async fn persist(&self, tables: &Tables) -> Result<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(tables)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}
