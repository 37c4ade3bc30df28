//! LLM router — tries backends in preference order with fallback.

use std::sync::Arc;

use crate::backend::{LlmBackend, LlmError, LlmRequest, LlmResponse};

/// Routing policy controlling which backends may serve a request.
#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    /// If true, remote backends are never called.
    pub local_only_mode: bool,
    /// Backend tried first.
    pub default_backend: String,
    /// Tried when the default backend fails or is missing.
    pub fallback_backend: Option<String>,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            local_only_mode: false,
            default_backend: "openai".to_string(),
            fallback_backend: Some("ollama".to_string()),
        }
    }
}

pub struct LlmRouter {
    backends: Vec<(String, Arc<dyn LlmBackend>)>,
    policy: RoutingPolicy,
}

impl LlmRouter {
    pub fn new(policy: RoutingPolicy) -> Self {
        Self { backends: Vec::new(), policy }
    }

    pub fn register_backend(&mut self, name: impl Into<String>, backend: Arc<dyn LlmBackend>) {
        let name = name.into();
        self.backends.retain(|(existing, _)| *existing != name);
        self.backends.push((name, backend));
    }

    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    pub fn has_backends(&self) -> bool {
        !self.candidates().is_empty()
    }

    fn backend(&self, name: &str) -> Option<&Arc<dyn LlmBackend>> {
        self.backends.iter().find(|(n, _)| n == name).map(|(_, b)| b)
    }

    /// Backends allowed by the policy, in the order they will be tried.
    fn candidates(&self) -> Vec<(&str, &Arc<dyn LlmBackend>)> {
        let mut names = vec![self.policy.default_backend.as_str()];
        if let Some(fallback) = self.policy.fallback_backend.as_deref() {
            if fallback != self.policy.default_backend {
                names.push(fallback);
            }
        }
        names
            .into_iter()
            .filter_map(|name| self.backend(name).map(|b| (name, b)))
            .filter(|(_, b)| !self.policy.local_only_mode || b.is_local())
            .collect()
    }

    /// Send `req` to the first backend that answers.
    pub async fn route(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut last_error = None;
        for (name, backend) in self.candidates() {
            tracing::info!(
                backend = name,
                model = backend.model_id(),
                is_local = backend.is_local(),
                "LLM request routed"
            );
            match backend.complete(req.clone()).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    tracing::warn!(backend = name, error = %e, "LLM backend failed, trying next");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            LlmError::Unavailable("no LLM backend configured for this policy".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed {
        model: &'static str,
        local: bool,
        fail: bool,
    }

    #[async_trait]
    impl LlmBackend for Fixed {
        async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
            if self.fail {
                return Err(LlmError::Unavailable(self.model.to_string()));
            }
            Ok(LlmResponse {
                content: format!("from {}", self.model),
                model: self.model.to_string(),
                prompt_tokens: 0,
                completion_tokens: 0,
            })
        }
        fn model_id(&self) -> &str { self.model }
        fn is_local(&self) -> bool { self.local }
    }

    fn router(policy: RoutingPolicy, remote_fails: bool) -> LlmRouter {
        let mut router = LlmRouter::new(policy);
        router.register_backend("openai", Arc::new(Fixed { model: "gpt", local: false, fail: remote_fails }));
        router.register_backend("ollama", Arc::new(Fixed { model: "qwen", local: true, fail: false }));
        router
    }

    #[tokio::test]
    async fn test_default_backend_wins() {
        let resp = router(RoutingPolicy::default(), false).route(LlmRequest::prompt("q")).await.unwrap();
        assert_eq!(resp.content, "from gpt");
    }

    #[tokio::test]
    async fn test_falls_back_on_failure() {
        let resp = router(RoutingPolicy::default(), true).route(LlmRequest::prompt("q")).await.unwrap();
        assert_eq!(resp.content, "from qwen");
    }

    #[tokio::test]
    async fn test_local_only_skips_remote() {
        let policy = RoutingPolicy { local_only_mode: true, ..RoutingPolicy::default() };
        let resp = router(policy, false).route(LlmRequest::prompt("q")).await.unwrap();
        assert_eq!(resp.model, "qwen");
    }

    #[tokio::test]
    async fn test_no_backends_is_unavailable() {
        let router = LlmRouter::new(RoutingPolicy::default());
        assert!(!router.has_backends());
        assert!(matches!(router.route(LlmRequest::prompt("q")).await, Err(LlmError::Unavailable(_))));
    }
}
