//! Section-aware résumé chunker.
//!
//! Structured résumés chunk per section in a fixed order, so chunk
//! numbering is stable across re-ingestion of the same parsed data. The
//! simple text sections are table-driven; the three list sections each
//! have their own formatter. Résumés without structured data fall back
//! to the recursive splitter over the full content.

use serde_json::{Map, Value};
use talentiq_db::{Chunk, ChunkMetadata, Resume};

use crate::splitter::RecursiveSplitter;

/// Simple section table: key, section type, formatter.
type SectionFormatter = fn(&Value) -> Option<String>;

const SIMPLE_SECTIONS: [(&str, &str, SectionFormatter); 4] = [
    ("summary", "summary", format_summary),
    ("skills", "skills", format_skills),
    ("certifications", "certifications", format_certifications),
    ("languages", "languages", format_languages),
];

/// Produce all chunks for a résumé.
pub fn build_chunks(resume: &Resume, splitter: &RecursiveSplitter) -> Vec<Chunk> {
    if resume.parsed_data.is_empty() {
        fallback_chunks(&resume.full_content, &resume.file_id, &resume.project_id, splitter)
    } else {
        chunks_from_parsed_data(&resume.parsed_data, &resume.file_id, &resume.project_id)
    }
}

/// Section-aware chunks from structured data, `chunk_order` from 1.
pub fn chunks_from_parsed_data(
    parsed_data: &Map<String, Value>,
    file_id: &str,
    project_id: &str,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut order: i64 = 1;

    let mut push = |chunks: &mut Vec<Chunk>, content: String, section_type: &str| {
        chunks.push(Chunk::new(
            project_id,
            content,
            ChunkMetadata {
                file_id: file_id.to_string(),
                section_type: section_type.to_string(),
            },
            order,
        ));
        order += 1;
    };

    for (key, section_type, formatter) in SIMPLE_SECTIONS {
        if let Some(value) = parsed_data.get(key) {
            if let Some(content) = formatter(value) {
                push(&mut chunks, content, section_type);
            }
        }
    }

    for job in iter_objects(parsed_data.get("work_history")) {
        let content = format!(
            "{} at {} ({})\n{}",
            field(job, "title"),
            field(job, "company"),
            field(job, "dates"),
            field(job, "description"),
        );
        push(&mut chunks, content.trim().to_string(), "work_history");
    }

    for edu in iter_objects(parsed_data.get("education")) {
        let content = format!(
            "{} at {} ({})",
            field(edu, "degree"),
            field(edu, "institution"),
            field(edu, "dates"),
        );
        push(&mut chunks, content.trim().to_string(), "education");
    }

    for project in iter_objects(parsed_data.get("projects")) {
        let content = format!(
            "Project: {}\n{}",
            field(project, "name"),
            field(project, "description"),
        );
        push(&mut chunks, content.trim().to_string(), "projects");
    }

    chunks
}

/// Raw recursive split of the full content, `section_type = "raw"`.
pub fn fallback_chunks(
    full_content: &str,
    file_id: &str,
    project_id: &str,
    splitter: &RecursiveSplitter,
) -> Vec<Chunk> {
    splitter
        .split_text(full_content)
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            Chunk::new(
                project_id,
                text,
                ChunkMetadata {
                    file_id: file_id.to_string(),
                    section_type: "raw".to_string(),
                },
                (i + 1) as i64,
            )
        })
        .collect()
}

// ── Formatters ────────────────────────────────────────────────────────────────

fn format_summary(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn format_skills(value: &Value) -> Option<String> {
    joined_list(value).map(|items| format!("Skills: {items}"))
}

fn format_certifications(value: &Value) -> Option<String> {
    joined_list(value).map(|items| format!("Certifications: {items}"))
}

fn format_languages(value: &Value) -> Option<String> {
    joined_list(value).map(|items| format!("Languages: {items}"))
}

fn joined_list(value: &Value) -> Option<String> {
    let items: Vec<&str> = value
        .as_array()?
        .iter()
        .filter_map(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items.join(", "))
    }
}

fn iter_objects(value: Option<&Value>) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .filter_map(|item| item.as_object())
}

fn field<'a>(object: &'a Map<String, Value>, key: &str) -> &'a str {
    object.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed() -> Map<String, Value> {
        json!({
            "summary": "Senior backend engineer.",
            "skills": ["Rust", "Postgres"],
            "certifications": [],
            "languages": ["English", "Arabic"],
            "work_history": [
                {"title": "Engineer", "company": "Acme", "dates": "2019 - 2023", "description": "Built services."},
                {"title": "Intern", "company": "Beta", "dates": "2018", "description": "Helped out."}
            ],
            "education": [
                {"degree": "BSc CS", "institution": "Tech U", "dates": "2014 - 2018"}
            ],
            "projects": [
                {"name": "Indexer", "description": "A search index."}
            ]
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_section_order_and_numbering() {
        let chunks = chunks_from_parsed_data(&parsed(), "f.pdf", "p1");
        let sections: Vec<&str> = chunks.iter().map(|c| c.metadata.section_type.as_str()).collect();
        assert_eq!(
            sections,
            vec![
                "summary",
                "skills",
                "languages",
                "work_history",
                "work_history",
                "education",
                "projects"
            ]
        );
        let orders: Vec<i64> = chunks.iter().map(|c| c.chunk_order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_section_formats() {
        let chunks = chunks_from_parsed_data(&parsed(), "f.pdf", "p1");
        assert_eq!(chunks[0].content, "Senior backend engineer.");
        assert_eq!(chunks[1].content, "Skills: Rust, Postgres");
        assert_eq!(chunks[2].content, "Languages: English, Arabic");
        assert_eq!(chunks[3].content, "Engineer at Acme (2019 - 2023)\nBuilt services.");
        assert_eq!(chunks[5].content, "BSc CS at Tech U (2014 - 2018)");
        assert_eq!(chunks[6].content, "Project: Indexer\nA search index.");
    }

    #[test]
    fn test_empty_sections_skipped() {
        // Empty certifications array produced no chunk above.
        let chunks = chunks_from_parsed_data(&parsed(), "f.pdf", "p1");
        assert!(chunks.iter().all(|c| c.metadata.section_type != "certifications"));

        let empty = Map::new();
        assert!(chunks_from_parsed_data(&empty, "f.pdf", "p1").is_empty());
    }

    #[test]
    fn test_metadata_carries_file_id() {
        let chunks = chunks_from_parsed_data(&parsed(), "p1_x.pdf", "p1");
        assert!(chunks.iter().all(|c| c.metadata.file_id == "p1_x.pdf"));
        assert!(chunks.iter().all(|c| !c.content.is_empty()));
    }

    #[test]
    fn test_fallback_chunks_numbered_from_one() {
        let splitter = RecursiveSplitter::new(50, 10);
        let content = "Work experience and education details. ".repeat(10);
        let chunks = fallback_chunks(&content, "f.pdf", "p1", &splitter);
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].chunk_order, 1);
        assert!(chunks.iter().all(|c| c.metadata.section_type == "raw"));
        let orders: Vec<i64> = chunks.iter().map(|c| c.chunk_order).collect();
        let expected: Vec<i64> = (1..=chunks.len() as i64).collect();
        assert_eq!(orders, expected);
    }

    #[test]
    fn test_build_chunks_dispatch() {
        let splitter = RecursiveSplitter::default();

        let mut structured = Resume::new("p1", "a.pdf");
        structured.parsed_data = parsed();
        let chunks = build_chunks(&structured, &splitter);
        assert_eq!(chunks[0].metadata.section_type, "summary");

        let mut raw = Resume::new("p1", "b.pdf");
        raw.full_content = "Plain resume text with work and education keywords.".to_string();
        let chunks = build_chunks(&raw, &splitter);
        assert_eq!(chunks[0].metadata.section_type, "raw");
    }
}
