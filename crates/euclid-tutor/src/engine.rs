//! The local text generator shared by the planner and the helper agents.

use std::sync::Arc;

use euclid_common::config::Settings;
use euclid_common::SettingsStore;
use euclid_llm::{LlmBackend, LlmError, LlmRequest, OllamaBackend};

/// A local LLM backend plus the runtime settings that choose its model.
#[derive(Clone)]
pub struct LocalEngine {
    backend: Option<Arc<dyn LlmBackend>>,
    base: Arc<Settings>,
    store: Arc<SettingsStore>,
}

impl LocalEngine {
    pub fn new(backend: Option<Arc<dyn LlmBackend>>, base: Arc<Settings>, store: Arc<SettingsStore>) -> Self {
        Self { backend, base, store }
    }

    /// Ollama over HTTP when the configured provider is `ollama`.
    pub fn from_settings(base: Arc<Settings>, store: Arc<SettingsStore>) -> Self {
        let local = &base.local_ai;
        let backend: Option<Arc<dyn LlmBackend>> = if local.llm_provider == "ollama" {
            Some(Arc::new(
                OllamaBackend::new(&local.llm_base_url, &local.llm_model).with_timeout(local.llm_timeout()),
            ))
        } else {
            tracing::warn!(provider = %local.llm_provider, "Unsupported local LLM provider");
            None
        };
        Self::new(backend, base, store)
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some() && self.store.effective(&self.base).local_ai_enabled
    }

    pub fn model(&self) -> String {
        self.store.effective(&self.base).local_llm_model
    }

    /// Generate a completion with the currently effective model.
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let Some(backend) = &self.backend else {
            return Err(LlmError::Unavailable("no local LLM provider configured".into()));
        };
        let req = LlmRequest::prompt(prompt).with_model(self.model());
        let resp = backend.complete(req).await?;
        Ok(resp.content)
    }
}
