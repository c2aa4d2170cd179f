//! Three-phase ingestion pipeline.
//!
//! Orchestrates the full flow for one (re)processing call:
//!   1. Extract every asset concurrently (bounded by the LLM semaphore),
//!      falling back to LLM extraction when local text is unusable.
//!   2. Structure locally-extracted text in batches of three and store
//!      résumé rows; LLM-extracted items are already structured.
//!   3. Chunk each résumé, bulk-insert, and mirror into the vector
//!      backend (dropping the collection first on reset).
//!
//! Per-asset failures are collected into the report, never raised; every
//! input asset ends up either processed or in the error list.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use talentiq_common::constants::mime_type_for;
use talentiq_common::{ActionType, Result, TalentiqError, UsageEvent, UsageSink};
use talentiq_db::{
    AssetRepository, Chunk, ChunkRepository, ExtractionMethod, Resume, ResumeRepository,
};
use talentiq_llm::{GenerationBackend, ParsedResume};
use talentiq_vector::{IndexableChunk, VectorIndexer};

use crate::chunker;
use crate::loader;
use crate::splitter::RecursiveSplitter;

/// Local-text items are structured in groups of this size.
const STRUCTURE_BATCH_SIZE: usize = 3;

/// Seam to the vector backend, kept as a trait so the pipeline can be
/// exercised without a running vector database.
#[async_trait]
pub trait ChunkIndexer: Send + Sync {
    async fn upsert_vectors(
        &self,
        project_id: &str,
        chunks: &[IndexableChunk],
        do_reset: bool,
    ) -> Result<()>;
}

#[async_trait]
impl ChunkIndexer for VectorIndexer {
    async fn upsert_vectors(
        &self,
        project_id: &str,
        chunks: &[IndexableChunk],
        do_reset: bool,
    ) -> Result<()> {
        VectorIndexer::upsert_vectors(self, project_id, chunks, do_reset)
            .await
            .map_err(Into::into)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestError {
    pub file_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub processed: usize,
    pub chunks_created: usize,
    pub errors: Vec<IngestError>,
}

/// One extracted asset between phases.
#[derive(Debug, Clone)]
struct ExtractedItem {
    file_id: String,
    content: String,
    method: ExtractionMethod,
}

pub struct IngestionEngine {
    generation: Arc<dyn GenerationBackend>,
    /// Client used for the extraction fallback; may be the generation
    /// client or a cheaper model.
    extraction: Arc<dyn GenerationBackend>,
    assets: AssetRepository,
    resumes: ResumeRepository,
    chunks: ChunkRepository,
    indexer: Arc<dyn ChunkIndexer>,
    usage: Option<Arc<dyn UsageSink>>,
    splitter: RecursiveSplitter,
    concurrency_limit: usize,
}

impl IngestionEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        generation: Arc<dyn GenerationBackend>,
        extraction: Arc<dyn GenerationBackend>,
        assets: AssetRepository,
        resumes: ResumeRepository,
        chunks: ChunkRepository,
        indexer: Arc<dyn ChunkIndexer>,
        usage: Option<Arc<dyn UsageSink>>,
        concurrency_limit: usize,
    ) -> Self {
        Self {
            generation,
            extraction,
            assets,
            resumes,
            chunks,
            indexer,
            usage,
            splitter: RecursiveSplitter::default(),
            concurrency_limit: concurrency_limit.max(1),
        }
    }

    /// Run the full pipeline for a project, optionally restricted to a
    /// subset of asset names.
    pub async fn process_and_store(
        &self,
        project_id: &str,
        file_ids: &[String],
        do_reset: bool,
    ) -> Result<IngestReport> {
        if do_reset {
            self.resumes.delete_by_project_id(project_id).await?;
            self.chunks.delete_by_project_id(project_id).await?;
        }

        let mut assets = self.assets.find_by_project_id(project_id).await?;
        if !file_ids.is_empty() {
            assets.retain(|a| file_ids.contains(&a.name));
        }
        if assets.is_empty() {
            return Ok(IngestReport { processed: 0, chunks_created: 0, errors: Vec::new() });
        }

        tracing::info!(project_id, assets = assets.len(), do_reset, "Starting ingestion");
        let mut errors: Vec<IngestError> = Vec::new();

        // ── Phase E: extract ─────────────────────────────────────────────
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let extractions = join_all(assets.iter().map(|asset| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| TalentiqError::Internal(e.to_string()))?;
                self.extract_one(project_id, &asset.url, &asset.name).await
            }
        }))
        .await;

        let mut items: Vec<ExtractedItem> = Vec::new();
        for (asset, outcome) in assets.iter().zip(extractions) {
            match outcome {
                Ok(item) => items.push(item),
                Err(e) => {
                    tracing::error!(file_id = %asset.name, error = %e, "Extraction failed");
                    errors.push(IngestError { file_id: asset.name.clone(), error: e.to_string() });
                }
            }
        }

        // ── Phase S: structure & store ───────────────────────────────────
        let stored = self.structure_and_store(project_id, items, &mut errors).await;

        // ── Phase C: chunk & vectorize ───────────────────────────────────
        let mut all_chunks: Vec<Chunk> = Vec::new();
        for resume in &stored {
            let resume_chunks = chunker::build_chunks(resume, &self.splitter);
            if resume_chunks.is_empty() {
                continue;
            }
            match self.chunks.insert_bulk(&resume_chunks).await {
                Ok(_) => all_chunks.extend(resume_chunks),
                Err(e) => {
                    tracing::error!(file_id = %resume.file_id, error = %e, "Chunk insert failed");
                    errors.push(IngestError {
                        file_id: resume.file_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if !all_chunks.is_empty() || do_reset {
            let indexable: Vec<IndexableChunk> = all_chunks
                .iter()
                .map(|c| IndexableChunk {
                    id: c.id,
                    content: c.content.clone(),
                    file_id: c.metadata.file_id.clone(),
                    section_type: c.metadata.section_type.clone(),
                    chunk_order: c.chunk_order,
                })
                .collect();

            if let Err(e) = self.indexer.upsert_vectors(project_id, &indexable, do_reset).await {
                tracing::error!(project_id, error = %e, "Vector upsert failed");
                errors.push(IngestError {
                    file_id: "vector_upsert".to_string(),
                    error: e.to_string(),
                });
            }
        }

        let report = IngestReport {
            processed: stored.len(),
            chunks_created: all_chunks.len(),
            errors,
        };
        tracing::info!(
            project_id,
            processed = report.processed,
            chunks = report.chunks_created,
            errors = report.errors.len(),
            "Ingestion complete"
        );
        Ok(report)
    }

    // ── Phase E helpers ──────────────────────────────────────────────────

    async fn extract_one(
        &self,
        project_id: &str,
        asset_url: &str,
        file_id: &str,
    ) -> Result<ExtractedItem> {
        let extension = file_id.rsplit('.').next().unwrap_or("").to_lowercase();
        let path = Path::new(asset_url);

        match loader::load_document(path, &extension).await {
            Ok(content) if loader::validate_extraction(&content) => {
                tracing::debug!(file_id, "Local extraction succeeded");
                return Ok(ExtractedItem {
                    file_id: file_id.to_string(),
                    content,
                    method: ExtractionMethod::Local,
                });
            }
            Ok(_) => {
                tracing::warn!(file_id, "Local extraction rejected by validator, using LLM fallback");
            }
            Err(e) => {
                tracing::warn!(file_id, error = %e, "Local extraction failed, using LLM fallback");
            }
        }

        self.extract_via_llm(project_id, path, file_id, &extension).await
    }

    async fn extract_via_llm(
        &self,
        project_id: &str,
        path: &Path,
        file_id: &str,
        extension: &str,
    ) -> Result<ExtractedItem> {
        let mime_type = mime_type_for(extension);
        let file_ref = self.extraction.upload_file(path, mime_type).await?;

        let started = Instant::now();
        let response = self.extraction.extract_structured_resume(&file_ref).await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        if let Some(sink) = &self.usage {
            if !response.usage.is_empty() {
                sink.record(UsageEvent {
                    project_id: project_id.to_string(),
                    file_id: Some(file_id.to_string()),
                    model_id: response.model.clone(),
                    action: ActionType::CvExtractionFallback,
                    usage: response.usage,
                    latency_ms,
                })
                .await;
            }
        }

        Ok(ExtractedItem {
            file_id: file_id.to_string(),
            content: response.content,
            method: ExtractionMethod::LlmFallback,
        })
    }

    // ── Phase S helpers ──────────────────────────────────────────────────

    async fn structure_and_store(
        &self,
        project_id: &str,
        items: Vec<ExtractedItem>,
        errors: &mut Vec<IngestError>,
    ) -> Vec<Resume> {
        let (fallback_items, local_items): (Vec<_>, Vec<_>) = items
            .into_iter()
            .partition(|item| item.method == ExtractionMethod::LlmFallback);

        let mut stored = Vec::new();

        // LLM-extracted content is already structured JSON.
        for item in fallback_items {
            match serde_json::from_str::<ParsedResume>(&item.content) {
                Ok(parsed) => {
                    self.store_resume(project_id, &item, parsed, &mut stored, errors).await;
                }
                Err(e) => {
                    tracing::error!(file_id = %item.file_id, error = %e, "Fallback content is not valid JSON");
                    errors.push(IngestError {
                        file_id: item.file_id.clone(),
                        error: format!("fallback parse failed: {e}"),
                    });
                }
            }
        }

        for batch in local_items.chunks(STRUCTURE_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|item| item.content.clone()).collect();

            let started = Instant::now();
            match self.generation.structure_resume_batch(&texts).await {
                Ok(structured) => {
                    let latency_ms = started.elapsed().as_millis() as u64;
                    if let Some(sink) = &self.usage {
                        if !structured.usage.is_empty() {
                            sink.record(UsageEvent {
                                project_id: project_id.to_string(),
                                file_id: None,
                                model_id: structured.model.clone(),
                                action: ActionType::CvStructuringBatch,
                                usage: structured.usage,
                                latency_ms,
                            })
                            .await;
                        }
                    }

                    if structured.resumes.len() != batch.len() {
                        tracing::warn!(
                            expected = batch.len(),
                            got = structured.resumes.len(),
                            "Batch structuring returned a mismatched array, padding with Unknown"
                        );
                    }

                    for (index, item) in batch.iter().enumerate() {
                        let parsed = structured
                            .resumes
                            .get(index)
                            .cloned()
                            .unwrap_or_else(ParsedResume::unknown);
                        self.store_resume(project_id, item, parsed, &mut stored, errors).await;
                    }
                }
                Err(e) => {
                    // The chunker's raw fallback fires later for these rows.
                    tracing::error!(error = %e, "Batch structuring failed, storing with empty parsed_data");
                    for item in batch {
                        self.store_resume(project_id, item, ParsedResume::unknown(), &mut stored, errors)
                            .await;
                    }
                }
            }
        }

        stored
    }

    async fn store_resume(
        &self,
        project_id: &str,
        item: &ExtractedItem,
        parsed: ParsedResume,
        stored: &mut Vec<Resume>,
        errors: &mut Vec<IngestError>,
    ) {
        let mut resume = Resume::new(project_id, &item.file_id);
        resume.candidate_name = parsed.candidate_name;
        resume.contact_info = parsed.contact_info;
        resume.full_content = item.content.clone();
        resume.parsed_data = parsed.parsed_data;
        resume.extraction_method = item.method;

        match self.resumes.create(&resume).await {
            Ok(()) => stored.push(resume),
            Err(e) => {
                tracing::error!(file_id = %item.file_id, error = %e, "Resume insert failed");
                errors.push(IngestError { file_id: item.file_id.clone(), error: e.to_string() });
            }
        }
    }
}
