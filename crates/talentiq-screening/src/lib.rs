//! talentiq-screening — Two-tier candidate screening.
//!
//! Candidates rank against the project's job description via hybrid
//! retrieval; a 1-D two-means split divides the ranking into a top tier
//! (full LLM evaluation, semaphore-bounded fan-out) and a bottom tier
//! (keyword match, one LLM call for the whole invocation). Results are
//! returned buffered or streamed as NDJSON with the bottom tier in rank
//! order and the top tier in completion order.

pub mod jd;
pub mod result;
pub mod screen;
pub mod split;
pub mod stream;

pub use jd::assemble_jd_context;
pub use screen::{CandidateRanker, ScreenOptions, ScreeningCore};
pub use split::dynamic_split;
