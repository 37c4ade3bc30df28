//! Scratchpad handwriting: OCR through the tesseract CLI, then answer checks.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use euclid_common::config::Settings;
use euclid_common::models::{CheckStatus, HandwritingValidateResponse};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::checker::SymbolicChecker;
use crate::executor::{run_with_timeout, stderr_excerpt, ExecError};
use crate::web_rag::WebRag;

const OCR_TIMEOUT: Duration = Duration::from_secs(30);
const RAG_FEEDBACK_SNIPPETS: usize = 2;

const OCR_REPLACEMENTS: [(&str, &str); 9] = [
    ("—", "-"),
    ("−", "-"),
    ("×", "*"),
    ("÷", "/"),
    ("“", "\""),
    ("”", "\""),
    ("‘", "'"),
    ("’", "'"),
    ("O", "0"),
];

#[derive(Debug, Error)]
pub enum HandwritingError {
    #[error("Handwriting OCR runtime is unavailable. Install tesseract.")]
    Unavailable,

    #[error("invalid image data: {0}")]
    InvalidImage(String),

    #[error("OCR failed: {0}")]
    Ocr(#[from] ExecError),
}

/// Clean up OCR output of handwritten maths.
pub fn normalize_math_text(text: &str) -> String {
    let mut value = text.trim().to_string();
    if value.is_empty() {
        return value;
    }
    for (from, to) in OCR_REPLACEMENTS {
        value = value.replace(from, to);
    }
    let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
    value.replace(" = ", "=").replace("x2", "x^2").trim().to_string()
}

/// Bytes of a `data:image/...;base64,` URL or of bare base64.
pub fn decode_data_url(image_data: &str) -> Result<Vec<u8>, HandwritingError> {
    let encoded = image_data.split_once(',').map_or(image_data, |(_, rest)| rest);
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| HandwritingError::InvalidImage(e.to_string()))
}

pub struct HandwritingService {
    tesseract_bin: String,
    checker: SymbolicChecker,
    web_rag: Arc<WebRag>,
}

impl HandwritingService {
    pub fn new(tesseract_bin: impl Into<String>, web_rag: Arc<WebRag>) -> Self {
        Self { tesseract_bin: tesseract_bin.into(), checker: SymbolicChecker::new(), web_rag }
    }

    pub fn from_settings(settings: &Settings, web_rag: Arc<WebRag>) -> Self {
        Self::new(&settings.tools.tesseract_bin, web_rag)
    }

    /// Recognised text and a rough confidence.
    pub async fn recognize(&self, image_data: &str) -> Result<(String, f64), HandwritingError> {
        let bytes = decode_data_url(image_data)?;
        let dir = tempfile::tempdir().map_err(ExecError::from)?;
        let image_path = dir.path().join("scratchpad.png");
        tokio::fs::write(&image_path, &bytes).await.map_err(ExecError::from)?;

        let mut cmd = Command::new(&self.tesseract_bin);
        cmd.arg(&image_path).args(["stdout", "--psm", "6"]);
        let output = match run_with_timeout(&mut cmd, OCR_TIMEOUT).await {
            Ok(output) => output,
            Err(ExecError::NotInstalled(_)) => return Err(HandwritingError::Unavailable),
            Err(e) => return Err(e.into()),
        };
        if !output.status.success() {
            return Err(ExecError::Failed(stderr_excerpt(&output)).into());
        }

        let text = normalize_math_text(&String::from_utf8_lossy(&output.stdout));
        let confidence = if text.is_empty() { 0.2 } else { 0.8 };
        debug!(chars = text.len(), confidence, "Handwriting recognised");
        Ok((text, confidence))
    }

    /// Run the symbolic checks over a written answer. Reference snippets are
    /// attached when any check warns.
    pub async fn validate(&self, question: &str, answer_text: &str) -> HandwritingValidateResponse {
        let checks = self.checker.run(question, answer_text);
        let passed = checks.iter().filter(|c| c.passed()).count();
        let pass_rate = if checks.is_empty() { 0.0 } else { passed as f64 / checks.len() as f64 };
        let all_passed = !checks.is_empty() && passed == checks.len();

        let rag_feedback = if all_passed || !self.web_rag.is_enabled() {
            Vec::new()
        } else {
            self.web_rag
                .retrieve(question, RAG_FEEDBACK_SNIPPETS)
                .await
                .into_iter()
                .map(|s| format!("{}: {} (source: {})", s.title, s.snippet, s.url))
                .collect()
        };
        if !all_passed {
            warn!(pass_rate, "Handwritten answer has failing checks");
        }

        HandwritingValidateResponse {
            status: if all_passed { CheckStatus::Pass } else { CheckStatus::Warn },
            pass_rate,
            checks,
            rag_feedback,
            message: Some(if all_passed {
                "All checks passed.".to_string()
            } else {
                "Some checks need another look.".to_string()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web_rag::fakes::{hamiltonian_snippet, StaticSource};
    use euclid_common::SettingsStore;
    use pretty_assertions::assert_eq;

    fn service(dir: &std::path::Path, bin: &str) -> HandwritingService {
        let store = Arc::new(SettingsStore::open(dir.join("s.json")));
        let rag = Arc::new(WebRag::new(
            Arc::new(StaticSource(vec![hamiltonian_snippet()])),
            Arc::new(Settings::default()),
            store,
        ));
        HandwritingService::new(bin, rag)
    }

    #[test]
    fn test_normalize_math_text() {
        assert_eq!(normalize_math_text("  x2 − 4  =  O "), "x^2 - 4=0");
        assert_eq!(normalize_math_text("3 × 4 ÷ 2"), "3 * 4 / 2");
        assert_eq!(normalize_math_text("   "), "");
    }

    #[test]
    fn test_decode_data_url() {
        assert_eq!(decode_data_url("data:image/png;base64,aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_data_url("aGVsbG8=").unwrap(), b"hello");
        assert!(matches!(decode_data_url("data:image/png;base64,@@@"), Err(HandwritingError::InvalidImage(_))));
    }

    #[tokio::test]
    async fn test_missing_tesseract_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), "definitely-not-tesseract");
        let err = svc.recognize("data:image/png;base64,aGVsbG8=").await.unwrap_err();
        assert!(matches!(err, HandwritingError::Unavailable));
    }

    #[tokio::test]
    async fn test_validate_passing_answer() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), "tesseract");
        let resp = svc.validate("Solve x^2 - 5x + 6 = 0", "x = 2 and x = 3").await;
        assert_eq!(resp.status, CheckStatus::Pass);
        assert_eq!(resp.pass_rate, 1.0);
        assert!(resp.rag_feedback.is_empty());
    }

    #[tokio::test]
    async fn test_validate_wrong_answer_gets_feedback() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), "tesseract");
        let resp = svc.validate("Solve x^2 - 5x + 6 = 0", "x = 2 only").await;
        assert_eq!(resp.status, CheckStatus::Warn);
        assert!(resp.pass_rate < 1.0);
        assert_eq!(resp.rag_feedback.len(), 1);
        assert!(resp.rag_feedback[0].contains("Hamiltonian"));
    }
}
