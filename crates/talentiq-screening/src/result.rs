//! Screening result shapes, templates, and score calibration.
//!
//! Results are JSON documents: the full-screen shape comes back from the
//! LLM and is post-processed here; the error and light-match shapes are
//! built locally from templates.

use serde_json::{json, Map, Value};
use talentiq_common::TokenUsage;
use talentiq_db::Resume;

/// Résumés at least this long (trimmed) never keep a zero fit score.
const MIN_CONTENT_FOR_CALIBRATION: usize = 50;
/// Below this score the interview-prep block is replaced.
const NO_INTERVIEW_THRESHOLD: i64 = 20;

/// Map a fit score to its label band.
pub fn fit_label(score: i64) -> &'static str {
    match score {
        i64::MIN..=30 => "Low Match",
        31..=60 => "Medium Match",
        61..=85 => "High Match",
        _ => "Excellent Match",
    }
}

/// Error-shaped result for a candidate whose screening failed.
pub fn error_result(resume: &Resume, message: &str) -> Value {
    json!({
        "fit_score": 0,
        "fit_label": "Error",
        "executive_summary": message,
        "key_match_analysis": {
            "strengths": [],
            "missing_critical_skills": [],
            "experience_analysis": {
                "total_relevant_experience_years": 0.0,
                "required_years": 0.0,
                "seniority_level": "Unknown",
                "seniority_alignment": "Unknown",
                "role_fit_justification": "Screening failed"
            }
        },
        "flags": {"red_flags": ["Screening error"], "yellow_flags": []},
        "interview_prep": {"suggested_questions": []},
        "cv_id": resume.id.to_string(),
        "candidate_name": resume.candidate_name,
        "contact_info": resume.contact_info,
    })
}

/// Keyword-match result for a bottom-tier candidate. No LLM involved.
pub fn light_result(
    resume: &Resume,
    vector_score: f64,
    matched: Vec<String>,
    missing: Vec<String>,
) -> Value {
    let fit_score = (vector_score.min(1.0) * 100.0).round() as i64;
    json!({
        "fit_score": fit_score,
        "fit_label": "Light Match",
        "executive_summary": "Candidate processed via Light Screen (Standard Tier).",
        "key_match_analysis": {
            "strengths": matched,
            "missing_critical_skills": missing,
            "experience_analysis": {
                "total_relevant_experience_years": 0.0,
                "required_years": 0.0,
                "seniority_level": "Unverified",
                "seniority_alignment": "Unverified",
                "role_fit_justification": "Light Screen: Detailed analysis skipped."
            }
        },
        "flags": {"red_flags": [], "yellow_flags": []},
        "interview_prep": {"suggested_questions": []},
        "cv_id": resume.id.to_string(),
        "candidate_name": resume.candidate_name,
        "contact_info": resume.contact_info,
        "meta": {
            "method": "Light Screen (Keyword Match)",
            "model": "N/A",
            "tier": "Standard Tier"
        }
    })
}

/// Calibrate a parsed LLM result, attach metadata and candidate fields.
pub fn post_process(mut result: Value, resume: &Resume, model_id: &str, usage: TokenUsage) -> Value {
    if !result.is_object() {
        result = Value::Object(Map::new());
    }

    result["meta"] = json!({
        "method": "LLM Screen",
        "model": model_id,
        "usage": usage,
    });

    let fit_score = result["fit_score"].as_i64().unwrap_or(0);

    // A zero score on a non-empty résumé is an artifact, not a signal.
    let content_len = resume.full_content.trim().chars().count();
    let fit_score = if fit_score == 0 && content_len > MIN_CONTENT_FOR_CALIBRATION {
        result["fit_score"] = json!(5);
        5
    } else {
        fit_score
    };

    if fit_score < NO_INTERVIEW_THRESHOLD {
        result["interview_prep"] = json!({
            "interview_recommendation":
                "Not recommended for interview based on current resume evidence.",
            "suggested_questions": []
        });
    }

    result["cv_id"] = json!(resume.id.to_string());
    result["candidate_name"] = json!(resume.candidate_name);
    result["contact_info"] = json!(resume.contact_info);
    result
}

/// Redact PII from one assembled result.
pub fn anonymize_one(result: &mut Value) {
    result["candidate_name"] = json!("[REDACTED]");
    result["contact_info"] = json!({});
}

/// Redact PII across a result set.
pub fn anonymize_all(results: &mut [Value]) {
    for result in results {
        anonymize_one(result);
    }
}
