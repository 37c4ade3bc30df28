//! euclid-tutor — The maths tutor behind the HTTP API.
//!
//! - `planner` / `coordinator`: single-call and multi-agent answer planning
//! - `checker` / `algebra`: exact symbolic checks of worked solutions
//! - `didactics`: plain and axiomatic explanations, takeaways, follow-ups
//! - `visual_planner` / `executor`: built-in diagrams and sandboxed rendering
//! - `web_rag`: Wikipedia snippets for low-confidence answers
//! - `pipeline`: the chat and tutor request flows
//! - `jobs` / `animation`: background diagram and Manim render jobs
//! - `media` / `handwriting`: image, music and scratchpad OCR services
//! - `eval`: quality reports over the canonical prompts

pub mod algebra;
pub mod animation;
pub mod answer_cache;
pub mod checker;
pub mod coordinator;
pub mod didactics;
pub mod engine;
pub mod eval;
pub mod executor;
pub mod handwriting;
pub mod jobs;
pub mod media;
pub mod pipeline;
pub mod planner;
pub mod prompts;
pub mod service;
pub mod visual_planner;
pub mod web_rag;

pub use animation::AnimationService;
pub use checker::SymbolicChecker;
pub use engine::LocalEngine;
pub use eval::{EvalOptions, Evaluator};
pub use executor::{ExecError, VisualizationExecutor};
pub use handwriting::{HandwritingError, HandwritingService};
pub use jobs::{DiagramJobs, JobKind, JobUpdate};
pub use media::{MediaError, MediaService};
pub use pipeline::{ChatReply, RemoteExplainer, TutorPipeline};
pub use service::TutorService;
pub use web_rag::{RetrievedSnippet, SnippetSource, WebRag, WikipediaSource};
