//! Shared application state.
//!
//! The document store, vector backend, and generation clients are
//! process-wide singletons initialized at startup; repositories and the
//! screening/ingestion assemblies are cheap per-request constructions
//! over those handles.

use std::sync::Arc;

use talentiq_common::{Settings, UsageSink};
use talentiq_db::{
    AssetRepository, ChunkRepository, Database, JobDescriptionRepository, ProjectRepository,
    ResumeRepository, UsageLogRepository,
};
use talentiq_ingestion::{IngestionEngine, UploadExpander};
use talentiq_llm::{build_generation_backend, GenerationBackend};
use talentiq_screening::ScreeningCore;
use talentiq_vector::{VectorIndexer, VectorStore};

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub db: Arc<Database>,
    pub generation: Arc<dyn GenerationBackend>,
    /// Client for the extraction fallback; may run a cheaper model.
    pub extraction: Arc<dyn GenerationBackend>,
    pub indexer: Arc<VectorIndexer>,
    pub usage: Arc<UsageLogRepository>,
}

impl AppState {
    pub async fn initialize(settings: Settings) -> anyhow::Result<Self> {
        let db = Arc::new(Database::open(&settings.storage.data_dir).await?);
        db.initialize().await?;
        tracing::info!(path = %settings.storage.data_dir, "Document store ready");

        let generation = build_generation_backend(&settings, None)?;
        let extraction =
            build_generation_backend(&settings, Some(settings.llm.extraction_model_id()))?;

        let store = VectorStore::new(
            &settings.vector.qdrant_url,
            settings.vector.embedding_model_size,
            &settings.vector.distance,
        )?;
        let indexer = Arc::new(VectorIndexer::new(store, generation.clone()));
        tracing::info!(url = %settings.vector.qdrant_url, "Vector backend ready");

        let usage = Arc::new(UsageLogRepository::new(db.clone()));

        Ok(Self { settings, db, generation, extraction, indexer, usage })
    }

    // ── Repositories ─────────────────────────────────────────────────────

    pub fn projects(&self) -> ProjectRepository {
        ProjectRepository::new(self.db.clone())
    }

    pub fn assets(&self) -> AssetRepository {
        AssetRepository::new(self.db.clone())
    }

    pub fn resumes(&self) -> ResumeRepository {
        ResumeRepository::new(self.db.clone())
    }

    pub fn chunks(&self) -> ChunkRepository {
        ChunkRepository::new(self.db.clone())
    }

    pub fn job_descriptions(&self) -> JobDescriptionRepository {
        JobDescriptionRepository::new(self.db.clone())
    }

    pub fn usage_sink(&self) -> Arc<dyn UsageSink> {
        self.usage.clone()
    }

    // ── Assemblies ───────────────────────────────────────────────────────

    pub fn upload_expander(&self) -> UploadExpander {
        UploadExpander::new(self.assets(), &self.settings)
    }

    pub fn ingestion_engine(&self) -> IngestionEngine {
        IngestionEngine::new(
            self.generation.clone(),
            self.extraction.clone(),
            self.assets(),
            self.resumes(),
            self.chunks(),
            self.indexer.clone(),
            Some(self.usage_sink()),
            self.settings.llm.concurrency_limit,
        )
    }

    pub fn screening_core(&self) -> Arc<ScreeningCore> {
        Arc::new(ScreeningCore::new(
            self.generation.clone(),
            self.indexer.clone(),
            self.resumes(),
            self.job_descriptions(),
            Some(self.usage_sink()),
            self.settings.llm.concurrency_limit,
        ))
    }
}

pub type SharedState = Arc<AppState>;
