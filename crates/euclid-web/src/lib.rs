//! euclid-web — HTTP API for Euclid's Window.
//! Serves:
//!   - Accounts, bearer tokens and per-concept progress
//!   - Chat turns and conversation history
//!   - Tutor answers with checks, explanations and diagrams
//!   - Background diagram jobs and Manim renders (polled or via SSE)
//!   - Lesson catalog: math map, mind map, Euclid, resources
//!   - Scratchpad OCR, local media, settings and eval reports

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod sse;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use router::build_router;
pub use state::{AppState, SharedState};
