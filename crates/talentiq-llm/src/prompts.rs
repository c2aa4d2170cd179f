//! Prompt templates for the résumé pipeline.

/// Shared parser instructions for single-file extraction and batch
/// structuring. The provider must return either one object or an array
/// of objects in this shape.
pub const RESUME_STRUCTURE_PROMPT: &str = r#"You are a precise resume parser. Extract the following from each resume provided.
Return ONLY valid JSON with no extra text. For each resume, return an object with these exact keys:

{
  "candidate_name": "Full name of the candidate",
  "contact_info": {
    "email": "email or null",
    "phone": "phone or null",
    "linkedin": "linkedin URL or null",
    "location": "city/country or null"
  },
  "parsed_data": {
    "summary": "Professional summary paragraph or empty string",
    "work_history": [{"title": "Job Title", "company": "Company Name", "dates": "Start - End", "description": "Role description"}],
    "education": [{"degree": "Degree Name", "institution": "School Name", "dates": "Start - End"}],
    "skills": ["skill1", "skill2"],
    "certifications": ["cert1"],
    "projects": [{"name": "Project Name", "description": "Description"}],
    "languages": ["Language1"]
  }
}

RULES:
- Extract ONLY information explicitly stated in the resume. Do NOT invent or guess.
- If a section is not present, use an empty string or empty array as appropriate.
- For multiple resumes, return a JSON array of objects.
- Return ONLY the JSON, no markdown fences, no explanations."#;

/// Evaluation instructions for the full LLM screen.
pub const SCREENING_SYSTEM_PROMPT: &str = r#"You are an expert HR screening assistant. You analyze resumes against a job description and provide structured evaluations.

You MUST return ONLY valid JSON with no extra text. Use this exact structure:
{
  "fit_score": <integer 0-100>,
  "fit_label": "<Low Match|Medium Match|High Match|Excellent Match>",
  "executive_summary": "<2-3 sentence overview of candidate fit>",
  "key_match_analysis": {
    "strengths": ["<matching qualification 1>", "<matching qualification 2>"],
    "missing_critical_skills": ["<missing skill 1>", "<missing skill 2>"],
    "experience_analysis": {
      "total_relevant_experience_years": <number>,
      "required_years": <number>,
      "seniority_level": "<Junior|Mid|Senior|Lead|Unknown>",
      "seniority_alignment": "<Below Requirements|Meets Requirements|Exceeds Requirements|Unknown>",
      "role_fit_justification": "<1-2 sentence assessment>"
    }
  },
  "flags": {
    "red_flags": ["<serious concern 1>"],
    "yellow_flags": ["<minor concern 1>"]
  },
  "interview_prep": {
    "suggested_questions": ["<question 1>", "<question 2>"]
  }
}

RULES:
- Score 0-30: Low Match, 31-60: Medium Match, 61-85: High Match, 86-100: Excellent Match
- Base your analysis ONLY on what is explicitly stated in the resume and job description
- Do NOT invent qualifications or experience not present in the resume
- Return ONLY the JSON, no markdown fences, no explanations"#;

/// Keyword extraction for the light-screen tier. `{jd_text}` is replaced
/// with the (truncated) job description.
pub const JD_KEYWORD_EXTRACTION_PROMPT: &str = r#"Extract the 5-10 most critical skills, technologies, or qualifications from this job description.
Return ONLY a JSON array of short lowercase strings, no extra text.

JOB DESCRIPTION:
{jd_text}"#;

/// Build the keyword-extraction prompt, truncating long JDs.
pub fn jd_keyword_prompt(jd_text: &str) -> String {
    let truncated: String = jd_text.chars().take(2000).collect();
    JD_KEYWORD_EXTRACTION_PROMPT.replace("{jd_text}", &truncated)
}

/// Build the batch-structuring prompt for N résumé texts.
pub fn batch_structure_prompt(texts: &[String]) -> String {
    let mut prompt = String::from(RESUME_STRUCTURE_PROMPT);
    prompt.push_str(&format!(
        "\n\nStructure the following {} resumes. Return a JSON array of exactly {} objects, in the same order.\n",
        texts.len(),
        texts.len()
    ));
    for (i, text) in texts.iter().enumerate() {
        prompt.push_str(&format!("\n--- RESUME {} ---\n{}\n", i + 1, text));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jd_keyword_prompt_truncates() {
        let long = "x".repeat(5000);
        let prompt = jd_keyword_prompt(&long);
        assert!(prompt.len() < 2500);
        assert!(prompt.contains("JSON array"));
    }

    #[test]
    fn test_batch_prompt_numbers_resumes() {
        let texts = vec!["cv one".to_string(), "cv two".to_string()];
        let prompt = batch_structure_prompt(&texts);
        assert!(prompt.contains("2 resumes"));
        assert!(prompt.contains("--- RESUME 1 ---"));
        assert!(prompt.contains("--- RESUME 2 ---"));
        assert!(prompt.contains("cv two"));
    }
}
