//! End-to-end ingestion pipeline tests: embedded document store, stub
//! generation service, recording vector indexer.

use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use talentiq_common::{Result, TokenUsage};
use talentiq_db::{
    Asset, AssetRepository, ChunkRepository, Database, ExtractionMethod, ResumeRepository,
};
use talentiq_ingestion::{ChunkIndexer, IngestionEngine};
use talentiq_llm::{
    FileRef, GenerationBackend, GenerationConfig, LlmError, LlmResponse, ParsedResume,
    StructuredBatch,
};
use talentiq_vector::IndexableChunk;

// ── Stubs ─────────────────────────────────────────────────────────────────────

struct StubBackend {
    extraction_calls: AtomicUsize,
    batch_calls: AtomicUsize,
}

impl StubBackend {
    fn new() -> Self {
        Self {
            extraction_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GenerationBackend for StubBackend {
    async fn generate(
        &self,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> std::result::Result<LlmResponse, LlmError> {
        Ok(LlmResponse {
            content: "{}".to_string(),
            model: "stub-model".to_string(),
            usage: TokenUsage::default(),
        })
    }

    async fn upload_file(
        &self,
        path: &Path,
        mime: &str,
    ) -> std::result::Result<FileRef, LlmError> {
        Ok(FileRef::local(path, mime))
    }

    async fn extract_structured_resume(
        &self,
        _file_ref: &FileRef,
    ) -> std::result::Result<LlmResponse, LlmError> {
        self.extraction_calls.fetch_add(1, Ordering::SeqCst);
        let structured = json!({
            "candidate_name": "Fallback Candidate",
            "contact_info": {"email": "fb@example.com"},
            "parsed_data": {
                "summary": "Recovered via file upload.",
                "skills": ["rust"]
            }
        });
        Ok(LlmResponse {
            content: structured.to_string(),
            model: "stub-extraction-model".to_string(),
            usage: TokenUsage { prompt_tokens: 5, completion_tokens: 5, total_tokens: 10 },
        })
    }

    async fn structure_resume_batch(
        &self,
        texts: &[String],
    ) -> std::result::Result<StructuredBatch, LlmError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let resumes = texts
            .iter()
            .enumerate()
            .map(|(i, _)| {
                serde_json::from_value::<ParsedResume>(json!({
                    "candidate_name": format!("Local Candidate {i}"),
                    "contact_info": {},
                    "parsed_data": {
                        "summary": "A structured summary.",
                        "skills": ["rust", "sql"],
                        "work_history": [
                            {"title": "Engineer", "company": "Acme", "dates": "2020 - 2024",
                             "description": "Backend work."}
                        ]
                    }
                }))
                .map_err(LlmError::from)
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(StructuredBatch {
            resumes,
            model: "stub-model".to_string(),
            usage: TokenUsage { prompt_tokens: 8, completion_tokens: 8, total_tokens: 16 },
        })
    }

    async fn embed_documents(
        &self,
        _texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, LlmError> {
        Err(LlmError::Unsupported("stub".to_string()))
    }

    async fn embed_query(&self, _text: &str) -> std::result::Result<Vec<f32>, LlmError> {
        Err(LlmError::Unsupported("stub".to_string()))
    }

    fn model_id(&self) -> &str {
        "stub-model"
    }

    fn embedding_dimension(&self) -> usize {
        0
    }
}

#[derive(Default)]
struct RecordingIndexer {
    upserts: Mutex<Vec<(usize, bool)>>,
}

#[async_trait]
impl ChunkIndexer for RecordingIndexer {
    async fn upsert_vectors(
        &self,
        _project_id: &str,
        chunks: &[IndexableChunk],
        do_reset: bool,
    ) -> Result<()> {
        self.upserts.lock().unwrap().push((chunks.len(), do_reset));
        Ok(())
    }
}

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn plausible_resume(name: &str) -> String {
    format!(
        "{name}\nWork experience: backend engineer at Acme Corp.\n\
         Education: BSc Computer Science.\nSkills: Rust, SQL, Kubernetes.\n\
         Projects: search indexer, usage dashboards, streaming pipelines."
    )
}

fn garbled_content() -> String {
    // Mostly outside the permitted Unicode ranges: fails the validator.
    format!("experience education {}", "\u{4E2D}\u{6587}\u{5B57}".repeat(100))
}

async fn seed_assets(
    db: Arc<Database>,
    dir: &Path,
    contents: &[(&str, String)],
) -> Vec<String> {
    let assets = AssetRepository::new(db);
    let mut names = Vec::new();
    for (name, content) in contents {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        let asset = Asset {
            id: uuid::Uuid::new_v4(),
            project_id: "p1".to_string(),
            name: name.to_string(),
            mime_type: "text/plain".to_string(),
            size_bytes: content.len() as i64,
            url: path.to_string_lossy().to_string(),
            created_at: chrono::Utc::now(),
        };
        assets.insert(&asset).await.unwrap();
        names.push(name.to_string());
    }
    names
}

fn engine(db: Arc<Database>, backend: Arc<StubBackend>, indexer: Arc<RecordingIndexer>) -> IngestionEngine {
    IngestionEngine::new(
        backend.clone(),
        backend,
        AssetRepository::new(db.clone()),
        ResumeRepository::new(db.clone()),
        ChunkRepository::new(db),
        indexer,
        None,
        4,
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_mixed_extraction_methods() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::open(dir.path().join("db")).await.unwrap());
    db.initialize().await.unwrap();

    seed_assets(
        db.clone(),
        dir.path(),
        &[
            ("p1_garbled.txt", garbled_content()),
            ("p1_good_a.txt", plausible_resume("Alice Example")),
            ("p1_good_b.txt", plausible_resume("Bob Example")),
        ],
    )
    .await;

    let backend = Arc::new(StubBackend::new());
    let indexer = Arc::new(RecordingIndexer::default());
    let report = engine(db.clone(), backend.clone(), indexer.clone())
        .process_and_store("p1", &[], false)
        .await
        .unwrap();

    assert_eq!(report.processed, 3);
    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);
    assert!(report.chunks_created > 0);

    // Exactly one file took the LLM fallback path.
    assert_eq!(backend.extraction_calls.load(Ordering::SeqCst), 1);

    let resumes = ResumeRepository::new(db.clone())
        .find_by_project_id("p1")
        .await
        .unwrap();
    assert_eq!(resumes.len(), 3);
    let garbled = resumes.iter().find(|r| r.file_id == "p1_garbled.txt").unwrap();
    assert_eq!(garbled.extraction_method, ExtractionMethod::LlmFallback);
    assert_eq!(garbled.candidate_name, "Fallback Candidate");
    let good = resumes.iter().find(|r| r.file_id == "p1_good_a.txt").unwrap();
    assert_eq!(good.extraction_method, ExtractionMethod::Local);

    // Chunk invariants: file-scoped metadata, 1-based ordering, content.
    let chunks = ChunkRepository::new(db).find_by_project_id("p1").await.unwrap();
    assert_eq!(chunks.len(), report.chunks_created);
    for chunk in &chunks {
        assert!(!chunk.content.is_empty());
        assert!(chunk.chunk_order >= 1);
        assert!(resumes.iter().any(|r| r.file_id == chunk.metadata.file_id));
    }

    // The vector indexer saw every chunk exactly once, without reset.
    let upserts = indexer.upserts.lock().unwrap();
    assert_eq!(upserts.as_slice(), &[(report.chunks_created, false)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reset_round_trip_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::open(dir.path().join("db")).await.unwrap());
    db.initialize().await.unwrap();

    seed_assets(
        db.clone(),
        dir.path(),
        &[
            ("p1_a.txt", plausible_resume("Alice Example")),
            ("p1_b.txt", plausible_resume("Bob Example")),
        ],
    )
    .await;

    let backend = Arc::new(StubBackend::new());
    let indexer = Arc::new(RecordingIndexer::default());
    let eng = engine(db.clone(), backend, indexer.clone());

    let first = eng.process_and_store("p1", &[], false).await.unwrap();
    let second = eng.process_and_store("p1", &[], true).await.unwrap();

    assert_eq!(first.processed, second.processed);
    assert_eq!(first.chunks_created, second.chunks_created);

    // Row counts unchanged after the reset pass.
    let resumes = ResumeRepository::new(db.clone()).count_by_project_id("p1").await.unwrap();
    let chunks = ChunkRepository::new(db).count_by_project_id("p1").await.unwrap();
    assert_eq!(resumes, 2);
    assert_eq!(chunks as usize, second.chunks_created);

    // Second upsert carried the reset flag and the same point count.
    let upserts = indexer.upserts.lock().unwrap();
    assert_eq!(upserts.len(), 2);
    assert_eq!(upserts[1], (second.chunks_created, true));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_ids_subset_and_empty_project() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::open(dir.path().join("db")).await.unwrap());
    db.initialize().await.unwrap();

    seed_assets(
        db.clone(),
        dir.path(),
        &[
            ("p1_a.txt", plausible_resume("Alice Example")),
            ("p1_b.txt", plausible_resume("Bob Example")),
        ],
    )
    .await;

    let backend = Arc::new(StubBackend::new());
    let indexer = Arc::new(RecordingIndexer::default());
    let eng = engine(db.clone(), backend, indexer);

    let report = eng
        .process_and_store("p1", &["p1_b.txt".to_string()], false)
        .await
        .unwrap();
    assert_eq!(report.processed, 1);

    let report = eng
        .process_and_store("p1", &["does_not_exist.txt".to_string()], false)
        .await
        .unwrap();
    assert_eq!(report.processed, 0);
    assert_eq!(report.chunks_created, 0);
    assert!(report.errors.is_empty());
}
