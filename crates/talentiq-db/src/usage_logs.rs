//! Usage log repository and aggregated reporting.
//!
//! Rows are append-only. Aggregation loads a project's rows and reduces
//! them in memory; the reductions are pure functions so they can be
//! tested without a store.

use crate::database::Database;
use crate::error::Result;
use crate::schema::{self, UsageLog};
use crate::schema_arrow::{record_to_usage_log, usage_log_to_record};
use arrow_array::RecordBatchIterator;
use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use talentiq_common::{UsageEvent, UsageSink};
use uuid::Uuid;

#[derive(Clone)]
pub struct UsageLogRepository {
    db: Arc<Database>,
}

impl UsageLogRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, log: &UsageLog) -> Result<()> {
        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_USAGE_LOGS)
            .execute()
            .await?;

        let record = usage_log_to_record(log)?;
        let table_schema = record.schema();
        let iter = RecordBatchIterator::new(vec![Ok(record)], table_schema);
        table.add(iter).execute().await?;
        Ok(())
    }

    pub async fn find_by_project_id(&self, project_id: &str) -> Result<Vec<UsageLog>> {
        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_USAGE_LOGS)
            .execute()
            .await?;

        let mut stream = table
            .query()
            .only_if(format!("project_id = '{project_id}'"))
            .execute()
            .await?;

        let mut logs = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                logs.push(record_to_usage_log(&batch, i)?);
            }
        }
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(logs)
    }

    /// Grand totals plus per-action and per-model breakdown.
    pub async fn project_summary(&self, project_id: &str) -> Result<UsageSummary> {
        let logs = self.find_by_project_id(project_id).await?;
        Ok(summarize(project_id, &logs))
    }

    /// Per-file breakdown: token sums, request counts, average latency,
    /// and the distinct models/actions that touched the file.
    pub async fn usage_by_file(&self, project_id: &str) -> Result<Vec<FileUsage>> {
        let logs = self.find_by_project_id(project_id).await?;
        Ok(group_by_file(&logs))
    }

    /// Paginated raw rows, newest first.
    pub async fn list_paginated(
        &self,
        project_id: &str,
        page: usize,
        page_size: usize,
    ) -> Result<UsagePage> {
        let logs = self.find_by_project_id(project_id).await?;
        let total = logs.len();
        let page = page.max(1);
        let start = (page - 1) * page_size;
        let rows = logs.into_iter().skip(start).take(page_size).collect();
        Ok(UsagePage { logs: rows, page, page_size, total })
    }
}

/// Durable sink: write failures are logged and swallowed so usage
/// accounting never fails the primary call.
#[async_trait]
impl UsageSink for UsageLogRepository {
    async fn record(&self, event: UsageEvent) {
        let log = UsageLog {
            id: Uuid::new_v4(),
            project_id: event.project_id,
            file_id: event.file_id,
            timestamp: Utc::now(),
            model_id: event.model_id,
            action_type: event.action.as_str().to_string(),
            prompt_tokens: event.usage.prompt_tokens as i64,
            completion_tokens: event.usage.completion_tokens as i64,
            total_tokens: event.usage.total_tokens as i64,
            latency_ms: event.latency_ms as i64,
        };

        if let Err(e) = self.insert(&log).await {
            tracing::error!(error = %e, project_id = %log.project_id, "Failed to write usage log");
        }
    }
}

// ── Aggregation ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UsageTotals {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub requests: usize,
    pub avg_latency_ms: f64,
}

impl UsageTotals {
    fn add(&mut self, log: &UsageLog) {
        self.prompt_tokens += log.prompt_tokens;
        self.completion_tokens += log.completion_tokens;
        self.total_tokens += log.total_tokens;
        // Running mean keeps a single pass over the rows.
        let n = self.requests as f64;
        self.avg_latency_ms = (self.avg_latency_ms * n + log.latency_ms as f64) / (n + 1.0);
        self.requests += 1;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    pub project_id: String,
    pub totals: UsageTotals,
    pub by_action: BTreeMap<String, UsageTotals>,
    pub by_model: BTreeMap<String, UsageTotals>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileUsage {
    pub file_id: String,
    pub totals: UsageTotals,
    pub models: Vec<String>,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsagePage {
    pub logs: Vec<UsageLog>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

pub fn summarize(project_id: &str, logs: &[UsageLog]) -> UsageSummary {
    let mut totals = UsageTotals::default();
    let mut by_action: BTreeMap<String, UsageTotals> = BTreeMap::new();
    let mut by_model: BTreeMap<String, UsageTotals> = BTreeMap::new();

    for log in logs {
        totals.add(log);
        by_action.entry(log.action_type.clone()).or_default().add(log);
        by_model.entry(log.model_id.clone()).or_default().add(log);
    }

    UsageSummary {
        project_id: project_id.to_string(),
        totals,
        by_action,
        by_model,
    }
}

pub fn group_by_file(logs: &[UsageLog]) -> Vec<FileUsage> {
    let mut by_file: BTreeMap<String, (UsageTotals, Vec<String>, Vec<String>)> = BTreeMap::new();

    for log in logs {
        let Some(file_id) = log.file_id.as_deref() else {
            continue;
        };
        let entry = by_file.entry(file_id.to_string()).or_default();
        entry.0.add(log);
        if !entry.1.contains(&log.model_id) {
            entry.1.push(log.model_id.clone());
        }
        if !entry.2.contains(&log.action_type) {
            entry.2.push(log.action_type.clone());
        }
    }

    by_file
        .into_iter()
        .map(|(file_id, (totals, models, actions))| FileUsage {
            file_id,
            totals,
            models,
            actions,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(file_id: Option<&str>, action: &str, model: &str, tokens: i64, latency: i64) -> UsageLog {
        UsageLog {
            id: Uuid::new_v4(),
            project_id: "p1".to_string(),
            file_id: file_id.map(|s| s.to_string()),
            timestamp: Utc::now(),
            model_id: model.to_string(),
            action_type: action.to_string(),
            prompt_tokens: tokens,
            completion_tokens: tokens / 2,
            total_tokens: tokens + tokens / 2,
            latency_ms: latency,
        }
    }

    #[test]
    fn test_summarize_totals_and_breakdowns() {
        let logs = vec![
            log(Some("a.pdf"), "screening", "gemini-2.0-flash", 100, 200),
            log(Some("b.pdf"), "screening", "gemini-2.0-flash", 200, 400),
            log(None, "jd_extraction", "llama-3.3-70b-versatile", 50, 100),
        ];

        let summary = summarize("p1", &logs);
        assert_eq!(summary.totals.requests, 3);
        assert_eq!(summary.totals.prompt_tokens, 350);
        assert_eq!(summary.totals.total_tokens, 525);
        assert!((summary.totals.avg_latency_ms - 233.333).abs() < 0.01);

        assert_eq!(summary.by_action["screening"].requests, 2);
        assert_eq!(summary.by_action["jd_extraction"].prompt_tokens, 50);
        assert_eq!(summary.by_model["gemini-2.0-flash"].prompt_tokens, 300);
    }

    #[test]
    fn test_group_by_file_skips_unscoped_rows() {
        let logs = vec![
            log(Some("a.pdf"), "screening", "m1", 100, 100),
            log(Some("a.pdf"), "cv_extraction_fallback", "m2", 10, 50),
            log(None, "jd_extraction", "m1", 5, 10),
        ];

        let files = group_by_file(&logs);
        assert_eq!(files.len(), 1);
        let a = &files[0];
        assert_eq!(a.file_id, "a.pdf");
        assert_eq!(a.totals.requests, 2);
        assert_eq!(a.models, vec!["m1".to_string(), "m2".to_string()]);
        assert_eq!(
            a.actions,
            vec!["screening".to_string(), "cv_extraction_fallback".to_string()]
        );
    }

    #[test]
    fn test_running_mean_latency() {
        let mut totals = UsageTotals::default();
        totals.add(&log(None, "generation", "m", 1, 100));
        totals.add(&log(None, "generation", "m", 1, 300));
        assert_eq!(totals.avg_latency_ms, 200.0);
        assert_eq!(totals.requests, 2);
    }
}
