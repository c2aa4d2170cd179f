//! NDJSON streaming drivers.
//!
//! The emitter owns an mpsc channel: workers push completed results,
//! the receiver side becomes the HTTP body. The first line is always a
//! meta record, the last a complete signal. Dropping the receiver ends
//! the emitter task, which aborts every in-flight screening worker.

use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;

use talentiq_common::Result;
use talentiq_db::Resume;
use talentiq_vector::RankedCandidate;

use crate::result::anonymize_one;
use crate::screen::{light_screen_resume, ScreenOptions, ScreeningCore};
use crate::split::dynamic_split;

/// Buffered lines between workers and the HTTP body.
const STREAM_CHANNEL_CAPACITY: usize = 32;

fn ndjson_line(value: &Value) -> String {
    // Object-shaped results always serialize.
    let mut line = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    line.push('\n');
    line
}

impl ScreeningCore {
    /// Streaming full screen: meta, results in completion order, complete.
    ///
    /// Validation errors (missing JD, injection) surface before the
    /// stream starts.
    pub async fn screen_stream(
        self: Arc<Self>,
        project_id: &str,
        file_ids: Option<Vec<String>>,
        anonymize: bool,
    ) -> Result<ReceiverStream<String>> {
        let (jd_context, _) = self.jd_context(project_id).await?;
        let resumes = self.fetch_resumes(project_id, file_ids.as_deref()).await?;

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let project_id = project_id.to_string();

        tokio::spawn(async move {
            let meta = json!({"signal": "meta", "total": resumes.len()});
            if tx.send(ndjson_line(&meta)).await.is_err() {
                return;
            }

            self.emit_completion_order(&tx, &project_id, resumes, &jd_context, anonymize)
                .await;

            let _ = tx.send(ndjson_line(&json!({"signal": "complete"}))).await;
        });

        Ok(ReceiverStream::new(rx))
    }

    /// Streaming smart screen: meta with tier counts, bottom tier in
    /// ranked order, top tier in completion order, complete.
    pub async fn smart_screen_stream(
        self: Arc<Self>,
        project_id: &str,
        options: ScreenOptions,
    ) -> Result<ReceiverStream<String>> {
        let (jd_context, jd) = self.jd_context(project_id).await?;
        let ranked = self
            .rank_for_jd(project_id, &jd, options.file_ids.as_deref())
            .await?;

        let scores: Vec<f64> = ranked.iter().map(|c| c.score).collect();
        let split = dynamic_split(&scores, options.min_top_count);
        let (top_tier, bottom_tier) = ranked.split_at(split);
        let top_tier = top_tier.to_vec();
        let bottom_tier = bottom_tier.to_vec();

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let project_id = project_id.to_string();
        let jd_description = jd.description.clone();
        let anonymize = options.anonymize;

        tokio::spawn(async move {
            let meta = json!({
                "signal": "meta",
                "total": top_tier.len() + bottom_tier.len(),
                "top_tier_count": top_tier.len(),
                "bottom_tier_count": bottom_tier.len(),
            });
            if tx.send(ndjson_line(&meta)).await.is_err() {
                return;
            }

            // Bottom tier first: deterministic, no per-candidate LLM call.
            if !self
                .emit_bottom_tier(&tx, &project_id, &bottom_tier, &jd_description, anonymize)
                .await
            {
                return;
            }

            // Top tier as results complete.
            if !top_tier.is_empty() {
                let file_ids: Vec<String> =
                    top_tier.iter().map(|c| c.file_id.clone()).collect();
                match self.fetch_resumes(&project_id, Some(&file_ids)).await {
                    Ok(resumes) => {
                        self.emit_completion_order(
                            &tx,
                            &project_id,
                            resumes,
                            &jd_context,
                            anonymize,
                        )
                        .await;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to load top-tier resumes");
                    }
                }
            }

            let _ = tx.send(ndjson_line(&json!({"signal": "complete"}))).await;
        });

        Ok(ReceiverStream::new(rx))
    }

    /// Emit light-screen results in ranked order, yielding after each
    /// line to keep the output responsive. Returns false when the
    /// receiver went away.
    async fn emit_bottom_tier(
        &self,
        tx: &mpsc::Sender<String>,
        project_id: &str,
        bottom_tier: &[RankedCandidate],
        jd_description: &str,
        anonymize: bool,
    ) -> bool {
        if bottom_tier.is_empty() {
            return true;
        }

        let file_ids: Vec<String> = bottom_tier.iter().map(|c| c.file_id.clone()).collect();
        let resumes = match self.fetch_resumes(project_id, Some(&file_ids)).await {
            Ok(resumes) => resumes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load bottom-tier resumes");
                return true;
            }
        };
        let keywords = self.extract_jd_keywords(project_id, jd_description).await;

        let resume_map: std::collections::HashMap<&str, &Resume> =
            resumes.iter().map(|r| (r.file_id.as_str(), r)).collect();

        for candidate in bottom_tier {
            let Some(resume) = resume_map.get(candidate.file_id.as_str()) else {
                continue;
            };
            let mut result = light_screen_resume(resume, candidate.score, &keywords);
            if anonymize {
                anonymize_one(&mut result);
            }
            if tx.send(ndjson_line(&result)).await.is_err() {
                return false;
            }
            tokio::task::yield_now().await;
        }
        true
    }

    /// Fan out full screens and emit each result as it completes.
    async fn emit_completion_order(
        self: Arc<Self>,
        tx: &mpsc::Sender<String>,
        project_id: &str,
        resumes: Vec<Resume>,
        jd_context: &str,
        anonymize: bool,
    ) {
        if resumes.is_empty() {
            return;
        }

        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.concurrency_limit()));
        let mut workers: JoinSet<Value> = JoinSet::new();

        for resume in resumes {
            let core = Arc::clone(&self);
            let semaphore = semaphore.clone();
            let project_id = project_id.to_string();
            let jd_context = jd_context.to_string();
            workers.spawn(async move {
                match semaphore.acquire().await {
                    Ok(_permit) => core.screen_single(&project_id, &resume, &jd_context).await,
                    Err(_) => {
                        crate::result::error_result(&resume, "Screening failed: semaphore closed")
                    }
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(mut result) => {
                    if anonymize {
                        anonymize_one(&mut result);
                    }
                    if tx.send(ndjson_line(&result)).await.is_err() {
                        // Receiver dropped: abort in-flight workers.
                        workers.abort_all();
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Screening worker panicked");
                }
            }
        }
    }
}
