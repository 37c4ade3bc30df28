//! Shared application state for the web server.

use std::sync::Arc;

use euclid_catalog::Catalog;
use euclid_common::metrics::MetricsRegistry;
use euclid_common::{Settings, SettingsStore};
use euclid_db::{ConversationRepository, Database, EvalRunRepository, ProgressRepository, UserRepository};
use euclid_tutor::{
    AnimationService, DiagramJobs, Evaluator, HandwritingService, JobUpdate, MediaService, RemoteExplainer,
    TutorPipeline, TutorService,
};
use tokio::sync::broadcast;
use tracing::info;

use crate::auth::TokenSigner;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<SettingsStore>,
    pub catalog: Arc<Catalog>,
    pub conversations: ConversationRepository,
    pub eval_runs: EvalRunRepository,
    pub users: UserRepository,
    pub progress: ProgressRepository,
    pub tokens: TokenSigner,
    pub pipeline: TutorPipeline,
    pub jobs: Arc<DiagramJobs>,
    pub animations: Arc<AnimationService>,
    pub media: MediaService,
    pub handwriting: HandwritingService,
    pub evaluator: Evaluator,
    pub metrics: MetricsRegistry,
    /// Broadcast channel for SSE job updates
    pub event_tx: broadcast::Sender<JobUpdate>,
}

impl AppState {
    /// Wire every service from configuration: catalog from the data dir,
    /// Ollama tutor, optional remote explainer, optional store snapshot.
    pub async fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let settings = Arc::new(settings);
        let store = Arc::new(SettingsStore::open(settings.paths.settings_file()));
        let catalog = Arc::new(Catalog::load(&settings.paths.data_dir)?);
        let db = match &settings.paths.store_snapshot {
            Some(path) => Database::open(path).await?,
            None => Database::in_memory(),
        };
        let tutor = Arc::new(TutorService::from_settings(settings.clone(), store.clone()));
        let remote = RemoteExplainer::from_settings(&settings);
        info!(remote = remote.is_some(), "Services configured");
        Ok(Self::new(settings, store, catalog, Arc::new(db), tutor, remote))
    }

    pub fn new(
        settings: Arc<Settings>,
        store: Arc<SettingsStore>,
        catalog: Arc<Catalog>,
        db: Arc<Database>,
        tutor: Arc<TutorService>,
        remote: Option<RemoteExplainer>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let jobs = Arc::new(DiagramJobs::new(tutor.clone(), event_tx.clone()));
        let animations = Arc::new(AnimationService::from_settings(&settings, event_tx.clone()));
        let media = MediaService::from_settings(settings.clone(), store.clone());
        let handwriting = HandwritingService::from_settings(&settings, tutor.web_rag().clone());
        let evaluator = Evaluator::new(catalog.clone(), tutor.clone());
        let pipeline = TutorPipeline::new(catalog.clone(), tutor, remote);
        Self {
            conversations: ConversationRepository::new(db.clone()),
            users: UserRepository::new(db.clone()),
            progress: ProgressRepository::new(db.clone()),
            eval_runs: EvalRunRepository::new(db),
            tokens: TokenSigner::from_settings(&settings.auth),
            settings,
            store,
            catalog,
            pipeline,
            jobs,
            animations,
            media,
            handwriting,
            evaluator,
            metrics: MetricsRegistry::new(),
            event_tx,
        }
    }

    pub fn tutor(&self) -> &TutorService {
        self.pipeline.tutor()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.event_tx.subscribe()
    }
}

pub type SharedState = Arc<AppState>;
