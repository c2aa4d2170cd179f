//! Local document loaders and the extraction validator.
//!
//! Extensions with a local loader: `pdf` (lopdf), `docx` (zip +
//! word/document.xml), `txt` (filesystem read). `epub`/`mobi` have no
//! local loader and always take the LLM extraction fallback.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::path::{Path, PathBuf};
use talentiq_common::constants::SECTION_KEYWORDS;
use talentiq_common::{Result, TalentiqError};

/// Load a document's text by extension. PDF and DOCX parsing is
/// CPU-bound and runs on the blocking pool.
pub async fn load_document(path: &Path, extension: &str) -> Result<String> {
    match extension {
        "pdf" => {
            let path = path.to_path_buf();
            tokio::task::spawn_blocking(move || load_pdf(&path))
                .await
                .map_err(|e| TalentiqError::Internal(format!("join error: {e}")))?
        }
        "docx" => {
            let path = path.to_path_buf();
            tokio::task::spawn_blocking(move || load_docx(&path))
                .await
                .map_err(|e| TalentiqError::Internal(format!("join error: {e}")))?
        }
        "txt" => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TalentiqError::Extraction(format!("txt read failed: {e}"))),
        other => Err(TalentiqError::Extraction(format!(
            "no local loader for .{other} files"
        ))),
    }
}

fn load_pdf(path: &PathBuf) -> Result<String> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| TalentiqError::Extraction(format!("pdf load failed: {e}")))?;

    let mut text = String::new();
    for page_number in doc.get_pages().keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                tracing::debug!(page = page_number, error = %e, "Page text extraction failed");
            }
        }
    }

    if text.trim().is_empty() {
        return Err(TalentiqError::Extraction("pdf produced no text".to_string()));
    }
    Ok(text)
}

/// DOCX is a zip container; the paragraph text lives in
/// word/document.xml as `w:t` runs.
fn load_docx(path: &PathBuf) -> Result<String> {
    let file = std::fs::File::open(path)
        .map_err(|e| TalentiqError::Extraction(format!("docx open failed: {e}")))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| TalentiqError::Extraction(format!("docx is not a zip: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| TalentiqError::Extraction(format!("docx missing document.xml: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| TalentiqError::Extraction(format!("docx read failed: {e}")))?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"t" => in_text_run = true,
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_run => {
                let value = e
                    .unescape()
                    .map_err(|err| TalentiqError::Extraction(format!("docx xml error: {err}")))?;
                text.push_str(&value);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TalentiqError::Extraction(format!("docx xml error: {e}")));
            }
            _ => {}
        }
    }

    if text.trim().is_empty() {
        return Err(TalentiqError::Extraction("docx produced no text".to_string()));
    }
    Ok(text)
}

/// Decide whether locally-extracted text is usable as a résumé.
///
/// Three checks: enough substance (≥ 100 non-whitespace chars), résumé
/// shape (≥ 2 section keywords), and a garbled-character ratio bound
/// over the permitted Unicode ranges.
pub fn validate_extraction(content: &str) -> bool {
    let substance: usize = content.chars().filter(|c| !c.is_whitespace()).count();
    if substance < 100 {
        return false;
    }

    let lower = content.to_lowercase();
    let keyword_hits = SECTION_KEYWORDS.iter().filter(|kw| lower.contains(**kw)).count();
    if keyword_hits < 2 {
        return false;
    }

    let total = content.chars().count();
    let garbled = content.chars().filter(|c| !is_permitted_char(*c)).count();
    let garbled_ratio = garbled as f64 / total as f64;

    garbled_ratio <= 0.3
}

/// Basic Latin, Latin Extended, and Arabic.
fn is_permitted_char(c: char) -> bool {
    matches!(c,
        '\u{0000}'..='\u{007F}' | '\u{00C0}'..='\u{024F}' | '\u{0600}'..='\u{06FF}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn plausible_resume() -> String {
        format!(
            "{}\n\nSkills: Rust, SQL, Kubernetes\nEducation: BSc Computer Science\n{}",
            "Work experience at Acme Corp as a backend engineer.",
            "More detail about projects and employment history to pass the length check."
        )
    }

    #[test]
    fn test_validator_accepts_plausible_resume() {
        assert!(validate_extraction(&plausible_resume()));
    }

    #[test]
    fn test_validator_rejects_short_content() {
        assert!(!validate_extraction("skills education"));
    }

    #[test]
    fn test_validator_rejects_missing_keywords() {
        let content = "lorem ipsum dolor sit amet ".repeat(20);
        assert!(!validate_extraction(&content));
    }

    #[test]
    fn test_validator_rejects_garbled_content() {
        // Over 30% of characters outside the permitted ranges.
        let garbled = "\u{4E2D}\u{6587}\u{5B57}\u{7B26}".repeat(40);
        let content = format!("experience education skills {garbled}");
        assert!(!validate_extraction(&content));
    }

    #[test]
    fn test_validator_accepts_arabic_text() {
        let arabic = "\u{0645}\u{0647}\u{0646}\u{062F}\u{0633}".repeat(30);
        let content = format!("experience education skills summary {arabic}");
        assert!(validate_extraction(&content));
    }

    #[tokio::test]
    async fn test_load_txt() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", plausible_resume()).unwrap();
        let text = load_document(file.path(), "txt").await.unwrap();
        assert!(text.contains("Acme Corp"));
    }

    #[tokio::test]
    async fn test_epub_has_no_local_loader() {
        let err = load_document(Path::new("/tmp/x.epub"), "epub").await.unwrap_err();
        assert!(matches!(err, TalentiqError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_load_docx_paragraphs() {
        let mut buffer = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer
                .write_all(
                    br#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>First paragraph</w:t></w:r></w:p>
    <w:p><w:r><w:t>Second paragraph</w:t></w:r></w:p>
  </w:body>
</w:document>"#,
                )
                .unwrap();
            writer.finish().unwrap();
        }

        let mut file = tempfile::NamedTempFile::with_suffix(".docx").unwrap();
        file.write_all(buffer.get_ref()).unwrap();

        let text = load_document(file.path(), "docx").await.unwrap();
        assert!(text.contains("First paragraph"));
        assert!(text.contains("Second paragraph"));
        assert!(text.contains('\n'));
    }
}
