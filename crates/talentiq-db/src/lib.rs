//! TalentIQ document store.
//!
//! Embedded storage layer on LanceDB for projects, uploaded assets,
//! processed résumés, retrieval chunks, job descriptions, and LLM usage
//! logs. One repository type per logical collection; all rows are scoped
//! to a `project_id` and the repositories enforce the per-project
//! uniqueness invariants (asset name, résumé file_id, one JD).
//!
//! Vector data does not live here — chunks are mirrored into the vector
//! backend by the indexer crate.

pub mod assets;
pub mod chunks;
pub mod database;
pub mod error;
pub mod job_descriptions;
pub mod projects;
pub mod resumes;
pub mod schema;
pub mod schema_arrow;
pub mod usage_logs;

pub use database::Database;
pub use error::{DbError, Result};
pub use schema::{
    Asset, Chunk, ChunkMetadata, ExtractionMethod, JobDescription, Project, Resume, UsageLog,
    TABLE_ASSETS, TABLE_CHUNKS, TABLE_JOB_DESCRIPTIONS, TABLE_PROJECTS, TABLE_RESUMES,
    TABLE_USAGE_LOGS,
};

pub use assets::AssetRepository;
pub use chunks::ChunkRepository;
pub use job_descriptions::JobDescriptionRepository;
pub use projects::ProjectRepository;
pub use resumes::ResumeRepository;
pub use usage_logs::UsageLogRepository;
