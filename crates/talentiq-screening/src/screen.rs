//! Screening core: full LLM screen, light keyword screen, tiered smart
//! screen.

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;

use talentiq_common::{ActionType, Result, TalentiqError, UsageSink};
use talentiq_db::{JobDescription, JobDescriptionRepository, Resume, ResumeRepository};
use talentiq_llm::prompts::{jd_keyword_prompt, SCREENING_SYSTEM_PROMPT};
use talentiq_llm::{tracked_generate, GenerationBackend, GenerationConfig};
use talentiq_vector::{RankedCandidate, VectorIndexer};

use crate::jd::assemble_jd_context;
use crate::result;
use crate::split::dynamic_split;

/// Retrieval depth for candidate ranking.
pub const RANKING_K: u64 = 1000;

/// Retrieval seam: résumé-level ranking against a query text.
#[async_trait]
pub trait CandidateRanker: Send + Sync {
    async fn rank_candidates(
        &self,
        project_id: &str,
        query_text: &str,
        k: u64,
    ) -> Result<Vec<RankedCandidate>>;
}

#[async_trait]
impl CandidateRanker for VectorIndexer {
    async fn rank_candidates(
        &self,
        project_id: &str,
        query_text: &str,
        k: u64,
    ) -> Result<Vec<RankedCandidate>> {
        self.search_and_aggregate(project_id, query_text, k)
            .await
            .map_err(Into::into)
    }
}

#[derive(Debug, Clone)]
pub struct ScreenOptions {
    pub file_ids: Option<Vec<String>>,
    pub min_top_count: usize,
    pub anonymize: bool,
}

impl Default for ScreenOptions {
    fn default() -> Self {
        Self { file_ids: None, min_top_count: 5, anonymize: true }
    }
}

pub struct ScreeningCore {
    generation: Arc<dyn GenerationBackend>,
    ranker: Arc<dyn CandidateRanker>,
    resumes: ResumeRepository,
    jds: JobDescriptionRepository,
    usage: Option<Arc<dyn UsageSink>>,
    concurrency_limit: usize,
}

impl ScreeningCore {
    pub fn new(
        generation: Arc<dyn GenerationBackend>,
        ranker: Arc<dyn CandidateRanker>,
        resumes: ResumeRepository,
        jds: JobDescriptionRepository,
        usage: Option<Arc<dyn UsageSink>>,
        concurrency_limit: usize,
    ) -> Self {
        Self {
            generation,
            ranker,
            resumes,
            jds,
            usage,
            concurrency_limit: concurrency_limit.max(1),
        }
    }

    pub(crate) fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Load the project's JD and assemble the guarded prompt context.
    pub async fn jd_context(&self, project_id: &str) -> Result<(String, JobDescription)> {
        let jd = self
            .jds
            .get_by_project_id(project_id)
            .await?
            .ok_or_else(|| {
                TalentiqError::NotFound(format!("No job description found for project {project_id}"))
            })?;
        let context = assemble_jd_context(&jd)?;
        Ok((context, jd))
    }

    pub(crate) async fn fetch_resumes(
        &self,
        project_id: &str,
        file_ids: Option<&[String]>,
    ) -> Result<Vec<Resume>> {
        match file_ids {
            Some(ids) if !ids.is_empty() => {
                Ok(self.resumes.find_by_file_ids(project_id, ids).await?)
            }
            _ => Ok(self.resumes.find_by_project_id(project_id).await?),
        }
    }

    // ── Full LLM screen ──────────────────────────────────────────────────

    /// Screen one résumé. Never fails: parse or call errors materialize
    /// as an error-shaped result.
    pub async fn screen_single(
        &self,
        project_id: &str,
        resume: &Resume,
        jd_context: &str,
    ) -> Value {
        let prompt = format!(
            "{jd_context}\n\n{SCREENING_SYSTEM_PROMPT}\n\nNow analyze the following resume:\n\nRESUME (file_id: {}):\n{}\n\nReturn ONLY the JSON screening result.",
            resume.file_id, resume.full_content
        );

        let response = tracked_generate(
            self.generation.as_ref(),
            &prompt,
            &GenerationConfig::screening(),
            self.usage.as_ref(),
            project_id,
            Some(&resume.file_id),
            ActionType::Screening,
        )
        .await;

        match response {
            Ok(response) => match serde_json::from_str::<Value>(&response.content) {
                Ok(parsed) => result::post_process(parsed, resume, &response.model, response.usage),
                Err(e) => {
                    tracing::error!(cv_id = %resume.id, error = %e, "JSON parse error in screening result");
                    result::error_result(resume, "Failed to parse LLM response")
                }
            },
            Err(e) => {
                tracing::error!(cv_id = %resume.id, error = %e, "Screening call failed");
                result::error_result(resume, &format!("Screening failed: {e}"))
            }
        }
    }

    /// Semaphore-bounded fan-out over a set of résumés, input order
    /// preserved.
    pub(crate) async fn screen_concurrently(
        &self,
        project_id: &str,
        resumes: &[Resume],
        jd_context: &str,
    ) -> Vec<Value> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        join_all(resumes.iter().map(|resume| {
            let semaphore = semaphore.clone();
            async move {
                match semaphore.acquire().await {
                    Ok(_permit) => self.screen_single(project_id, resume, jd_context).await,
                    Err(_) => result::error_result(resume, "Screening failed: semaphore closed"),
                }
            }
        }))
        .await
    }

    /// Mode A: full-LLM screen over all (or selected) résumés.
    pub async fn full_screen(
        &self,
        project_id: &str,
        file_ids: Option<&[String]>,
        anonymize: bool,
    ) -> Result<Vec<Value>> {
        let (jd_context, _) = self.jd_context(project_id).await?;
        let resumes = self.fetch_resumes(project_id, file_ids).await?;
        if resumes.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = self.screen_concurrently(project_id, &resumes, &jd_context).await;
        if anonymize {
            result::anonymize_all(&mut results);
        }
        Ok(results)
    }

    // ── Light screen ─────────────────────────────────────────────────────

    /// Extract 5-10 critical keywords from the JD. Called once per
    /// smart-screen invocation; failures degrade to an empty list.
    pub async fn extract_jd_keywords(&self, project_id: &str, jd_description: &str) -> Vec<String> {
        let prompt = jd_keyword_prompt(jd_description);
        let response = tracked_generate(
            self.generation.as_ref(),
            &prompt,
            &GenerationConfig::json(),
            self.usage.as_ref(),
            project_id,
            None,
            ActionType::JdExtraction,
        )
        .await;

        match response {
            Ok(response) => serde_json::from_str::<Vec<String>>(response.content.trim())
                .unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "JD keyword extraction failed");
                Vec::new()
            }
        }
    }

    // ── Smart screen ─────────────────────────────────────────────────────

    /// Retrieve the ranked candidate list for the project's JD.
    pub async fn rank_for_jd(
        &self,
        project_id: &str,
        jd: &JobDescription,
        file_ids: Option<&[String]>,
    ) -> Result<Vec<RankedCandidate>> {
        let mut ranked = self
            .ranker
            .rank_candidates(project_id, &jd.description, RANKING_K)
            .await?;
        if let Some(filter) = file_ids {
            if !filter.is_empty() {
                ranked.retain(|candidate| filter.contains(&candidate.file_id));
            }
        }
        Ok(ranked)
    }

    /// Mode B: rank, split into tiers, full-screen the top tier and
    /// keyword-screen the bottom tier.
    pub async fn smart_screen(
        &self,
        project_id: &str,
        options: &ScreenOptions,
    ) -> Result<Vec<Value>> {
        let (jd_context, jd) = self.jd_context(project_id).await?;
        let ranked = self
            .rank_for_jd(project_id, &jd, options.file_ids.as_deref())
            .await?;
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let scores: Vec<f64> = ranked.iter().map(|c| c.score).collect();
        let split = dynamic_split(&scores, options.min_top_count);
        let (top_tier, bottom_tier) = ranked.split_at(split);
        tracing::info!(
            project_id,
            total = ranked.len(),
            top = top_tier.len(),
            bottom = bottom_tier.len(),
            "Smart screen tiers"
        );

        let mut results = self.screen_tier(project_id, top_tier, &jd_context).await?;
        results.extend(
            self.light_screen_tier(project_id, bottom_tier, &jd.description)
                .await?,
        );

        if options.anonymize {
            result::anonymize_all(&mut results);
        }
        Ok(results)
    }

    /// Full-screen the candidates of one tier.
    pub(crate) async fn screen_tier(
        &self,
        project_id: &str,
        tier: &[RankedCandidate],
        jd_context: &str,
    ) -> Result<Vec<Value>> {
        if tier.is_empty() {
            return Ok(Vec::new());
        }
        let file_ids: Vec<String> = tier.iter().map(|c| c.file_id.clone()).collect();
        let resumes = self.resumes.find_by_file_ids(project_id, &file_ids).await?;
        Ok(self.screen_concurrently(project_id, &resumes, jd_context).await)
    }

    /// Keyword-screen the candidates of one tier, in ranked order.
    pub(crate) async fn light_screen_tier(
        &self,
        project_id: &str,
        tier: &[RankedCandidate],
        jd_description: &str,
    ) -> Result<Vec<Value>> {
        if tier.is_empty() {
            return Ok(Vec::new());
        }

        let file_ids: Vec<String> = tier.iter().map(|c| c.file_id.clone()).collect();
        let resumes = self.resumes.find_by_file_ids(project_id, &file_ids).await?;
        let keywords = self.extract_jd_keywords(project_id, jd_description).await;

        let resume_map: std::collections::HashMap<&str, &Resume> =
            resumes.iter().map(|r| (r.file_id.as_str(), r)).collect();

        Ok(tier
            .iter()
            .filter_map(|candidate| {
                resume_map
                    .get(candidate.file_id.as_str())
                    .map(|resume| light_screen_resume(resume, candidate.score, &keywords))
            })
            .collect())
    }
}

/// Keyword-match evaluation of one résumé; no LLM involved.
pub fn light_screen_resume(resume: &Resume, vector_score: f64, keywords: &[String]) -> Value {
    let content = resume.full_content.to_lowercase();
    let (matched, missing): (Vec<String>, Vec<String>) = keywords
        .iter()
        .cloned()
        .partition(|keyword| content.contains(&keyword.to_lowercase()));

    result::light_result(resume, vector_score, matched, missing)
}
