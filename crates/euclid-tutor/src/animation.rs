//! Manim scene rendering with a memory and disk cache.
//!
//! Scenes are Python files under the scenes directory. Rendered files land in
//! `<static>/animations/<id>.<ext>`, where the id is derived from the scene
//! name, quality and output format, so a second request for the same render
//! is served from disk.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use euclid_common::cache::TtlCache;
use euclid_common::config::Settings;
use euclid_common::models::{
    AnimationRenderRequest, AnimationResponse, JobStatus, ManimStatusResponse, OutputFormat, RenderQuality, SceneInfo,
};
use regex::Regex;
use sha2::{Digest, Sha256};
use tokio::process::Command;
use tokio::sync::{broadcast, OnceCell};
use tracing::{error, info, warn};

use crate::checker::cached_regex;
use crate::executor::{find_output_file, run_with_timeout, ExecError};
use crate::jobs::{JobKind, JobUpdate};

const CACHE_TTL: Duration = Duration::from_secs(3600);
const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const NOT_INSTALLED: &str = "Manim is not installed on this system";
const NOT_FOUND: &str = "Animation not found";

/// `sha256("scene:quality:format")`, first 16 hex digits.
pub fn animation_id(scene_name: &str, quality: RenderQuality, format: OutputFormat) -> String {
    let digest = Sha256::digest(format!("{scene_name}:{}:{}", quality.as_str(), format.extension()));
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..16].to_string()
}

/// Scene rendered for an on-demand animation, first keyword match wins.
const SCENE_KEYWORDS: [(&[&str], &str); 13] = [
    (&["eigenvalue", "eigenvector"], "EigenvectorTransform"),
    (&["pythagor", "right triangle"], "PythagoreanTheorem"),
    (&["roots of unity"], "RootsOfUnity"),
    (&["euler"], "EulerIdentityCircle"),
    (&["polar"], "PolarCoordinates"),
    (&["taylor", "maclaurin"], "TaylorSeriesApprox"),
    (&["fourier", "fft", "dft"], "FourierTransformDemo"),
    (&["parabola", "quadratic"], "QuadraticFunction"),
    (&["number line"], "NumberLineOperations"),
    (&["derivative", "tangent"], "DerivativeAsSlope"),
    (&["integral"], "IntegralAsArea"),
    (&["limit"], "LimitConcept"),
    (&["gradient descent"], "GradientDescent"),
];

pub fn scene_for_question(question: &str) -> Option<&'static str> {
    let q = question.to_lowercase();
    SCENE_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| q.contains(k)))
        .map(|(_, scene)| *scene)
}

fn quality_flag(quality: RenderQuality) -> &'static str {
    match quality {
        RenderQuality::Low => "-ql",
        RenderQuality::Medium => "-qm",
        RenderQuality::High => "-qh",
    }
}

fn completed(id: &str, scene_name: Option<&str>, ext: &str) -> AnimationResponse {
    AnimationResponse {
        id: id.to_string(),
        status: JobStatus::Completed,
        progress: 100,
        scene_name: scene_name.map(str::to_string),
        url: Some(format!("/animations/{id}.{ext}")),
        format: Some(ext.to_string()),
        error: None,
    }
}

fn failed(id: &str, scene_name: &str, error: impl Into<String>) -> AnimationResponse {
    AnimationResponse {
        id: id.to_string(),
        status: JobStatus::Error,
        progress: 100,
        scene_name: Some(scene_name.to_string()),
        url: None,
        format: None,
        error: Some(error.into()),
    }
}

pub struct AnimationService {
    python_bin: String,
    scenes_dir: PathBuf,
    animations_dir: PathBuf,
    timeout: Duration,
    available: OnceCell<bool>,
    cache: TtlCache<AnimationResponse>,
    // background renders, newest last
    jobs: Mutex<Vec<AnimationResponse>>,
    events: broadcast::Sender<JobUpdate>,
}

impl AnimationService {
    pub fn new(
        python_bin: impl Into<String>,
        scenes_dir: impl Into<PathBuf>,
        static_dir: impl AsRef<Path>,
        timeout: Duration,
        events: broadcast::Sender<JobUpdate>,
    ) -> Self {
        Self {
            python_bin: python_bin.into(),
            scenes_dir: scenes_dir.into(),
            animations_dir: static_dir.as_ref().join("animations"),
            timeout,
            available: OnceCell::new(),
            cache: TtlCache::new(),
            jobs: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn from_settings(settings: &Settings, events: broadcast::Sender<JobUpdate>) -> Self {
        Self::new(
            &settings.tools.python_bin,
            &settings.paths.scenes_dir,
            &settings.paths.static_dir,
            Duration::from_secs(settings.tools.render_timeout_seconds),
            events,
        )
    }

    /// Whether `python -m manim --version` succeeds. Checked once.
    pub async fn is_available(&self) -> bool {
        *self
            .available
            .get_or_init(|| async {
                let mut cmd = Command::new(&self.python_bin);
                cmd.args(["-m", "manim", "--version"]);
                match run_with_timeout(&mut cmd, VERSION_CHECK_TIMEOUT).await {
                    Ok(out) if out.status.success() => {
                        info!(version = %String::from_utf8_lossy(&out.stdout).trim(), "Manim available");
                        true
                    }
                    _ => {
                        warn!("Manim not installed or not in PATH");
                        false
                    }
                }
            })
            .await
    }

    pub async fn status(&self) -> ManimStatusResponse {
        ManimStatusResponse { available: self.is_available().await, scenes_count: self.list_scenes().len() }
    }

    /// Every `class Name(...Scene)` in the scenes directory, by file name.
    pub fn list_scenes(&self) -> Vec<SceneInfo> {
        static SCENE_CLASS: OnceLock<Regex> = OnceLock::new();
        let re = cached_regex(&SCENE_CLASS, r"class (\w+)\(.*Scene\)");
        let mut scenes = Vec::new();
        for (name, content) in self.scene_files() {
            for cap in re.captures_iter(&content) {
                scenes.push(SceneInfo { name: cap[1].to_string(), file: name.clone() });
            }
        }
        scenes
    }

    fn scene_files(&self) -> Vec<(String, String)> {
        let Ok(entries) = std::fs::read_dir(&self.scenes_dir) else {
            return Vec::new();
        };
        let mut files: Vec<(String, String)> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "py"))
            .filter_map(|p| {
                let name = p.file_name()?.to_string_lossy().into_owned();
                if name.starts_with('_') {
                    return None;
                }
                let content = std::fs::read_to_string(&p).ok()?;
                Some((name, content))
            })
            .collect();
        files.sort();
        files
    }

    fn find_scene_file(&self, scene_name: &str) -> Option<PathBuf> {
        let needle = format!("class {scene_name}(");
        self.scene_files()
            .into_iter()
            .find(|(_, content)| content.contains(&needle))
            .map(|(name, _)| self.scenes_dir.join(name))
    }

    /// Memory cache first, then a rendered file on disk.
    pub fn get_cached(&self, id: &str) -> Option<AnimationResponse> {
        let key = format!("animation:{id}");
        if let Some(hit) = self.cache.get(&key) {
            return Some(hit);
        }
        let ext = ["mp4", "gif"].into_iter().find(|ext| self.animations_dir.join(format!("{id}.{ext}")).exists())?;
        let found = completed(id, None, ext);
        self.cache.set(key, found.clone(), Some(CACHE_TTL));
        Some(found)
    }

    /// Cached render, background job record, or a `not_found` record.
    pub fn get(&self, id: &str) -> AnimationResponse {
        if let Some(hit) = self.get_cached(id) {
            return hit;
        }
        if let Some(job) = self.lock_jobs().iter().find(|j| j.id == id) {
            return job.clone();
        }
        AnimationResponse {
            id: id.to_string(),
            status: JobStatus::NotFound,
            progress: 0,
            scene_name: None,
            url: None,
            format: None,
            error: Some(NOT_FOUND.to_string()),
        }
    }

    pub fn list_jobs(&self) -> Vec<AnimationResponse> {
        self.lock_jobs().iter().rev().cloned().collect()
    }

    /// Render and wait.
    pub async fn render(&self, req: &AnimationRenderRequest) -> AnimationResponse {
        let id = animation_id(&req.scene_name, req.quality, req.output_format);
        if let Some(hit) = self.get_cached(&id) {
            info!(animation_id = %id, "Animation served from cache");
            return hit;
        }
        if !self.is_available().await {
            return failed(&id, &req.scene_name, NOT_INSTALLED);
        }
        let Some(scene_file) = self.find_scene_file(&req.scene_name) else {
            return failed(&id, &req.scene_name, format!("Scene '{}' not found", req.scene_name));
        };

        match self.run_manim(&id, &scene_file, req).await {
            Ok(ext) => {
                let done = completed(&id, Some(&req.scene_name), ext);
                self.cache.set(format!("animation:{id}"), done.clone(), Some(CACHE_TTL));
                info!(animation_id = %id, "Animation rendered");
                done
            }
            Err(e) => {
                error!(animation_id = %id, error = %e, "Manim render failed");
                let message = match e {
                    ExecError::Timeout(_) => "Render timed out (>2 minutes)".to_string(),
                    ExecError::MissingOutput => "Output file not found after render".to_string(),
                    ExecError::Failed(stderr) => format!("Render failed: {stderr}"),
                    other => other.to_string(),
                };
                failed(&id, &req.scene_name, message)
            }
        }
    }

    /// Start a background render; returns the cached result or a `pending` record.
    pub fn start_render(self: &Arc<Self>, req: AnimationRenderRequest) -> AnimationResponse {
        let id = animation_id(&req.scene_name, req.quality, req.output_format);
        if let Some(hit) = self.get_cached(&id) {
            return hit;
        }
        if let Some(running) = self.lock_jobs().iter().find(|j| j.id == id && !j.status.is_terminal()) {
            return running.clone();
        }

        let pending = AnimationResponse {
            id: id.clone(),
            status: JobStatus::Pending,
            progress: 0,
            scene_name: Some(req.scene_name.clone()),
            url: None,
            format: None,
            error: None,
        };
        {
            let mut jobs = self.lock_jobs();
            jobs.retain(|j| j.id != id);
            jobs.push(pending.clone());
        }
        self.publish(&pending);

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.replace_job(AnimationResponse { status: JobStatus::Rendering, progress: 30, ..pending });
            let result = this.render(&req).await;
            this.replace_job(result);
        });
        self.get(&id)
    }

    pub fn delete(&self, id: &str) -> bool {
        self.cache.delete(&format!("animation:{id}"));
        self.lock_jobs().retain(|j| j.id != id);
        let mut deleted = false;
        for ext in ["mp4", "gif"] {
            let path = self.animations_dir.join(format!("{id}.{ext}"));
            if path.exists() && std::fs::remove_file(&path).is_ok() {
                deleted = true;
            }
        }
        deleted
    }

    async fn run_manim(
        &self,
        id: &str,
        scene_file: &Path,
        req: &AnimationRenderRequest,
    ) -> Result<&'static str, ExecError> {
        let tmp = tempfile::tempdir()?;
        let mut cmd = Command::new(&self.python_bin);
        cmd.args(["-m", "manim", quality_flag(req.quality)])
            .arg(scene_file)
            .arg(&req.scene_name)
            .args(["-o", id, "--media_dir"])
            .arg(tmp.path())
            .current_dir(&self.scenes_dir);
        if req.output_format == OutputFormat::Gif {
            cmd.arg("--format=gif");
        }
        info!(scene = %req.scene_name, animation_id = %id, "Rendering animation");

        let output = run_with_timeout(&mut cmd, self.timeout).await?;
        if !output.status.success() {
            let stderr: String = String::from_utf8_lossy(&output.stderr).chars().take(500).collect();
            return Err(ExecError::Failed(stderr));
        }
        let ext = req.output_format.extension();
        let produced = find_output_file(tmp.path(), id, ext).ok_or(ExecError::MissingOutput)?;
        tokio::fs::create_dir_all(&self.animations_dir).await?;
        tokio::fs::copy(&produced, self.animations_dir.join(format!("{id}.{ext}"))).await?;
        Ok(ext)
    }

    fn replace_job(&self, record: AnimationResponse) {
        {
            let mut jobs = self.lock_jobs();
            match jobs.iter_mut().find(|j| j.id == record.id) {
                Some(slot) => *slot = record.clone(),
                None => return,
            }
        }
        self.publish(&record);
    }

    fn publish(&self, record: &AnimationResponse) {
        let _ = self.events.send(JobUpdate {
            kind: JobKind::Animation,
            id: record.id.clone(),
            status: record.status,
            progress: record.progress,
        });
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, Vec<AnimationResponse>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        dir: tempfile::TempDir,
        service: Arc<AnimationService>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let scenes = dir.path().join("scenes");
        std::fs::create_dir_all(&scenes).unwrap();
        std::fs::write(
            scenes.join("geometry.py"),
            "from manim import *\n\nclass PythagoreanProof(Scene):\n    pass\n\nclass Helper:\n    pass\n\n\
             class UnitCircle(MovingCameraScene):\n    pass\n",
        )
        .unwrap();
        std::fs::write(scenes.join("_private.py"), "class Hidden(Scene):\n    pass\n").unwrap();
        std::fs::write(scenes.join("notes.txt"), "class Ignored(Scene)").unwrap();
        let (tx, _) = broadcast::channel(16);
        let service = Arc::new(AnimationService::new(
            "definitely-not-python",
            scenes,
            dir.path().join("static"),
            Duration::from_secs(5),
            tx,
        ));
        Fixture { dir, service }
    }

    fn request(scene: &str) -> AnimationRenderRequest {
        AnimationRenderRequest {
            scene_name: scene.into(),
            quality: RenderQuality::Low,
            output_format: OutputFormat::Gif,
            background: false,
        }
    }

    #[test]
    fn test_animation_id_is_stable_per_parameters() {
        let a = animation_id("PythagoreanProof", RenderQuality::Low, OutputFormat::Gif);
        assert_eq!(a.len(), 16);
        assert_eq!(a, animation_id("PythagoreanProof", RenderQuality::Low, OutputFormat::Gif));
        assert_ne!(a, animation_id("PythagoreanProof", RenderQuality::High, OutputFormat::Gif));
        assert_ne!(a, animation_id("PythagoreanProof", RenderQuality::Low, OutputFormat::Mp4));
    }

    #[test]
    fn test_scene_for_question() {
        assert_eq!(scene_for_question("Explain eigenvalues"), Some("EigenvectorTransform"));
        assert_eq!(scene_for_question("Animate the Pythagorean theorem"), Some("PythagoreanTheorem"));
        assert_eq!(scene_for_question("Explain FFT and DFT"), Some("FourierTransformDemo"));
        assert_eq!(scene_for_question("Explain set theory"), None);
    }

    #[test]
    fn test_scene_discovery() {
        let fx = fixture();
        let names: Vec<_> = fx.service.list_scenes().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["PythagoreanProof", "UnitCircle"]);
        assert!(fx.service.find_scene_file("UnitCircle").unwrap().ends_with("geometry.py"));
        assert!(fx.service.find_scene_file("Hidden").is_none());
    }

    #[tokio::test]
    async fn test_render_without_manim_reports_error() {
        let fx = fixture();
        let resp = fx.service.render(&request("PythagoreanProof")).await;
        assert_eq!(resp.status, JobStatus::Error);
        assert_eq!(resp.error.as_deref(), Some(NOT_INSTALLED));
        assert!(!fx.service.status().await.available);
        assert_eq!(fx.service.status().await.scenes_count, 2);
    }

    #[tokio::test]
    async fn test_rendered_file_on_disk_is_served_and_deletable() {
        let fx = fixture();
        let id = animation_id("UnitCircle", RenderQuality::Low, OutputFormat::Gif);
        let dir = fx.dir.path().join("static/animations");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{id}.gif")), b"GIF89a").unwrap();

        let resp = fx.service.render(&request("UnitCircle")).await;
        assert_eq!(resp.status, JobStatus::Completed);
        assert_eq!(resp.url, Some(format!("/animations/{id}.gif")));

        assert!(fx.service.delete(&id));
        assert_eq!(fx.service.get(&id).status, JobStatus::NotFound);
        assert!(!fx.service.delete(&id));
    }

    #[tokio::test]
    async fn test_background_render_ends_in_error_without_manim() {
        let fx = fixture();
        let started = fx.service.start_render(request("PythagoreanProof"));
        assert!(matches!(started.status, JobStatus::Pending | JobStatus::Rendering | JobStatus::Error));

        let mut last = started;
        for _ in 0..200 {
            last = fx.service.get(&last.id);
            if last.status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(last.status, JobStatus::Error);
        assert_eq!(fx.service.list_jobs().len(), 1);
    }
}
