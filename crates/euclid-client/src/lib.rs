//! euclid-client — Talking to a running Euclid's Window server.
//!
//! - `api`: typed wrappers over the REST endpoints
//! - `poller`: bounded polling of diagram and animation jobs
//! - `error`: `ClientError` with user-facing messages

pub mod api;
pub mod error;
pub mod poller;

pub use api::{ApiClient, EvalQuery, DEFAULT_BASE_URL};
pub use error::{ClientError, Result};
pub use poller::{JobPoller, JobState};
