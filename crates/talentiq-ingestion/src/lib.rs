//! talentiq-ingestion — Upload expansion and the résumé ingestion pipeline.
//!
//! The pipeline runs three phases per batch:
//!   1. Extract — local loaders per extension, validated, with an
//!      LLM-upload fallback when local text is unusable.
//!   2. Structure & store — batch structuring of local text into parsed
//!      résumé records.
//!   3. Chunk & vectorize — section-aware chunking (raw splitting as a
//!      fallback), bulk persistence, hybrid vector upsert.
//!
//! Per-asset failures are collected, never raised; the batch always
//! reports which files made it and which did not.

pub mod chunker;
pub mod loader;
pub mod pipeline;
pub mod splitter;
pub mod upload;

pub use pipeline::{ChunkIndexer, IngestReport, IngestionEngine};
pub use splitter::RecursiveSplitter;
pub use upload::{IncomingFile, UploadExpander};
