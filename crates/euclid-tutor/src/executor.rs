//! Runs model-written visualization code in the external Python runtime.
//!
//! Plotly code must define `fig`; the script dumps it as JSON. Manim code must
//! define `GeneratedScene`; the rendered GIF is copied under
//! `<static>/animations`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use euclid_common::config::Settings;
use euclid_common::models::{VisualizationPayload, VisualizationType};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::process::Command;
use tracing::{error, warn};

use crate::planner::VisualizationPlan;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{0} is not installed on this system")]
    NotInstalled(String),

    #[error("execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("process failed: {0}")]
    Failed(String),

    #[error("expected output was not produced")]
    MissingOutput,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid figure JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Run `cmd` to completion within `timeout`. The child is killed on timeout.
pub(crate) async fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, ExecError> {
    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
    let child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ExecError::NotInstalled(program.clone()),
        _ => ExecError::Io(e),
    })?;
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => Ok(output?),
        Err(_) => Err(ExecError::Timeout(timeout)),
    }
}

/// The first 400 characters of a failed process's stderr.
pub(crate) fn stderr_excerpt(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).chars().take(400).collect()
}

/// A file under `dir` whose name contains `stem` and ends in `.ext`, else any `.ext` file.
pub(crate) fn find_output_file(dir: &Path, stem: &str, ext: &str) -> Option<PathBuf> {
    fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
        let Ok(entries) = std::fs::read_dir(dir) else { return };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(&path, out);
            } else {
                out.push(path);
            }
        }
    }
    let mut files = Vec::new();
    walk(dir, &mut files);
    files.sort();
    let with_ext = |p: &&PathBuf| p.extension() == Some(OsStr::new(ext));
    files
        .iter()
        .filter(with_ext)
        .find(|p| p.file_name().is_some_and(|n| n.to_string_lossy().contains(stem)))
        .or_else(|| files.iter().find(with_ext))
        .cloned()
}

pub(crate) fn short_id(prefix: &str) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &hex[..12])
}

#[derive(Debug, Clone)]
pub struct VisualizationExecutor {
    python_bin: String,
    timeout: Duration,
    animations_dir: PathBuf,
}

impl VisualizationExecutor {
    pub fn new(python_bin: impl Into<String>, timeout: Duration, static_dir: impl AsRef<Path>) -> Self {
        Self {
            python_bin: python_bin.into(),
            timeout,
            animations_dir: static_dir.as_ref().join("animations"),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.tools.python_bin, settings.local_ai.execution_timeout(), &settings.paths.static_dir)
    }

    /// Turn a plan into a payload. Ready figures are used as is; code is executed.
    pub async fn execute_plan(&self, plan: &VisualizationPlan) -> Option<VisualizationPayload> {
        if let Some(figure) = &plan.figure {
            return Some(VisualizationPayload {
                viz_id: short_id("plotly"),
                viz_type: VisualizationType::Plotly,
                title: plan.goal.clone(),
                data: strip_template(figure.clone()),
            });
        }
        let code = plan.code.as_deref().unwrap_or_default();
        if code.trim().is_empty() {
            warn!(goal = %plan.goal, "Visualization requested but code is empty");
            return None;
        }
        let result = match plan.viz_type {
            VisualizationType::Plotly => self.execute_plotly(code, &plan.goal).await,
            VisualizationType::Manim => self.execute_manim(code, &plan.goal).await,
            VisualizationType::Svg => {
                warn!("Unsupported visualization type");
                return None;
            }
        };
        match result {
            Ok(payload) => Some(payload),
            Err(e) => {
                error!(error = %e, viz_type = ?plan.viz_type, "Visualization execution failed");
                None
            }
        }
    }

    pub async fn execute_plotly(&self, code: &str, title: &str) -> Result<VisualizationPayload, ExecError> {
        let viz_id = short_id("plotly");
        let dir = tempfile::tempdir()?;
        let output_file = dir.path().join(format!("{viz_id}.json"));
        let script_path = dir.path().join("plotly_script.py");
        tokio::fs::write(&script_path, plotly_script(code, &output_file)).await?;

        let mut cmd = Command::new(&self.python_bin);
        cmd.arg(&script_path).env_remove("PYTHONPATH");
        let output = run_with_timeout(&mut cmd, self.timeout).await?;
        if !output.status.success() {
            let stderr = stderr_excerpt(&output);
            return Err(ExecError::Failed(if stderr.is_empty() { "Plotly execution failed".into() } else { stderr }));
        }

        let raw = tokio::fs::read_to_string(&output_file).await.map_err(|_| ExecError::MissingOutput)?;
        let figure: Value = serde_json::from_str(&raw)?;
        Ok(VisualizationPayload {
            viz_id,
            viz_type: VisualizationType::Plotly,
            title: title.to_string(),
            data: strip_template(figure),
        })
    }

    pub async fn execute_manim(&self, code: &str, title: &str) -> Result<VisualizationPayload, ExecError> {
        let animation_id = short_id("manim");
        let dir = tempfile::tempdir()?;
        let script_path = dir.path().join("generated_scene.py");
        tokio::fs::write(&script_path, code).await?;

        let mut cmd = Command::new(&self.python_bin);
        cmd.args(["-m", "manim", "-ql"])
            .arg(&script_path)
            .args(["GeneratedScene", "--format=gif", "--media_dir"])
            .arg(dir.path())
            .args(["-o", &animation_id]);
        let output = run_with_timeout(&mut cmd, self.timeout).await?;
        if !output.status.success() {
            return Err(ExecError::Failed(stderr_excerpt(&output)));
        }

        let produced = find_output_file(dir.path(), &animation_id, "gif").ok_or(ExecError::MissingOutput)?;
        tokio::fs::create_dir_all(&self.animations_dir).await?;
        tokio::fs::copy(&produced, self.animations_dir.join(format!("{animation_id}.gif"))).await?;

        Ok(VisualizationPayload {
            viz_id: animation_id.clone(),
            viz_type: VisualizationType::Manim,
            title: title.to_string(),
            data: json!({"url": format!("/animations/{animation_id}.gif"), "format": "gif"}),
        })
    }
}

fn plotly_script(code: &str, output_file: &Path) -> String {
    format!(
        "import json\n\
         import plotly.io as pio\n\
         from plotly import graph_objects as go\n\
         from plotly import express as px\n\n\
         {code}\n\n\
         if 'fig' not in locals():\n    raise RuntimeError('Plotly code must define a fig variable')\n\n\
         with open(r\"{}\", 'w', encoding='utf-8') as handle:\n    handle.write(pio.to_json(fig))\n",
        output_file.display()
    )
}

/// Keep only `data` and `layout`, dropping Plotly's default `layout.template`.
fn strip_template(figure: Value) -> Value {
    let mut layout = figure.get("layout").cloned().unwrap_or_else(|| json!({}));
    if let Some(obj) = layout.as_object_mut() {
        obj.remove("template");
    }
    json!({
        "data": figure.get("data").cloned().unwrap_or_else(|| json!([])),
        "layout": layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_template() {
        let fig = json!({"data": [{"x": [1]}], "layout": {"title": "t", "template": {"huge": true}}, "frames": []});
        assert_eq!(strip_template(fig), json!({"data": [{"x": [1]}], "layout": {"title": "t"}}));
        assert_eq!(strip_template(json!({})), json!({"data": [], "layout": {}}));
    }

    #[test]
    fn test_short_id_shape() {
        let id = short_id("viz");
        assert!(id.starts_with("viz-"));
        assert_eq!(id.len(), 16);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_find_output_prefers_matching_stem() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("videos/480p15");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("a_other.gif"), b"x").unwrap();
        std::fs::write(nested.join("manim-abc.gif"), b"x").unwrap();
        std::fs::write(nested.join("manim-abc.mp4"), b"x").unwrap();
        assert_eq!(find_output_file(dir.path(), "manim-abc", "gif"), Some(nested.join("manim-abc.gif")));
        assert_eq!(find_output_file(dir.path(), "nope", "gif"), Some(nested.join("a_other.gif")));
        assert_eq!(find_output_file(dir.path(), "nope", "webm"), None);
    }

    #[tokio::test]
    async fn test_plan_with_figure_skips_runtime() {
        let exec = VisualizationExecutor::new("definitely-not-python", Duration::from_secs(1), "/tmp");
        let plan = VisualizationPlan::plotly("Parabola", json!({"data": [], "layout": {"template": {}}}));
        let payload = exec.execute_plan(&plan).await.unwrap();
        assert_eq!(payload.viz_type, VisualizationType::Plotly);
        assert!(payload.viz_id.starts_with("plotly-"));
        assert_eq!(payload.data["layout"], json!({}));
    }

    #[tokio::test]
    async fn test_missing_runtime_degrades_to_none() {
        let exec = VisualizationExecutor::new("definitely-not-python", Duration::from_secs(1), "/tmp");
        let err = exec.execute_plotly("fig = None", "t").await.unwrap_err();
        assert!(matches!(err, ExecError::NotInstalled(_)));

        let mut plan = VisualizationPlan::plotly("t", Value::Null);
        plan.figure = None;
        plan.code = Some("fig = go.Figure()".into());
        assert!(exec.execute_plan(&plan).await.is_none());
    }
}
