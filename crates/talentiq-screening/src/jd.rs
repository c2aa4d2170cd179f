//! JD context assembly and the prompt-injection guard.

use talentiq_common::constants::INJECTION_PATTERNS;
use talentiq_common::{Result, TalentiqError};
use talentiq_db::JobDescription;

/// Assemble the prompt fragment representing the job.
///
/// The description and extra screening instructions are user-supplied
/// text that ends up inside an LLM prompt, so they are checked for
/// injection patterns before anything else touches them.
pub fn assemble_jd_context(jd: &JobDescription) -> Result<String> {
    let combined = format!("{}{}", jd.description, jd.prompt.as_deref().unwrap_or(""))
        .to_lowercase();
    if INJECTION_PATTERNS.iter().any(|pattern| combined.contains(pattern)) {
        return Err(TalentiqError::Validation(
            "Security validation failed: potential prompt injection detected in job description or prompt"
                .to_string(),
        ));
    }

    let mut context = format!(
        "=== JOB DESCRIPTION ===\nTitle: {}\n\n{}",
        jd.title, jd.description
    );
    if let Some(prompt) = jd.prompt.as_deref().filter(|p| !p.trim().is_empty()) {
        context.push_str(&format!("\n\nADDITIONAL SCREENING INSTRUCTIONS:\n{prompt}"));
    }
    if let Some(rubric) = jd.custom_rubric.as_deref().filter(|r| !r.trim().is_empty()) {
        context.push_str(&format!("\n\nCUSTOM EVALUATION RUBRIC:\n{rubric}"));
    }
    if let Some(weights) = jd.weights.as_ref().filter(|w| !w.is_empty()) {
        context.push_str(&format!(
            "\n\nSCORING WEIGHTS:\n{}",
            serde_json::to_string(weights)?
        ));
    }
    context.push_str("\n=== END JOB DESCRIPTION ===");

    Ok(context)
}
