//! euclid-llm — LLM backend abstraction layer.
//! Implements the LlmBackend trait for the local Ollama server and remote
//! OpenAI-compatible APIs, fallback routing between them, JSON extraction
//! from model output, and per-agent run metrics.

pub mod agents;
pub mod backend;
pub mod extract;
pub mod router;

pub use agents::AgentRegistry;
pub use backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message, OllamaBackend, OpenAiBackend};
pub use extract::extract_json_block;
pub use router::{LlmRouter, RoutingPolicy};
