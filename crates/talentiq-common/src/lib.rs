//! talentiq-common — Shared types, errors, settings, and constants used
//! across all TalentIQ crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod usage;

pub use config::Settings;
pub use error::{Result, TalentiqError};
pub use usage::{ActionType, TokenUsage, UsageEvent, UsageSink};
