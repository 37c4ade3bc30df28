//! euclid-db — In-process store for accounts, conversations and evaluation runs.
//!
//! Records live in memory behind a single `RwLock`; when a snapshot path is
//! configured every write is flushed to a JSON file and reloaded on start.

pub mod conversations;
pub mod database;
pub mod error;
pub mod eval_runs;
pub mod progress;
pub mod schema;
pub mod users;

pub use conversations::ConversationRepository;
pub use database::Database;
pub use error::{DbError, Result};
pub use eval_runs::{EvalRunFilter, EvalRunRepository};
pub use progress::ProgressRepository;
pub use schema::{Conversation, ConversationWithMessages, EvalRun, Message, Progress, User};
pub use users::UserRepository;
