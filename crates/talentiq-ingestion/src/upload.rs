//! Upload expansion: bundle limits, archive handling, asset persistence.
//!
//! Limits are enforced both before and after archive expansion. Archive
//! entries are flattened to their basename; anything that is a
//! directory, macOS metadata, hidden, or outside the allowed résumé
//! extensions is skipped. A malformed archive fails the whole upload, as
//! does any storage write — uploads land as a unit or not at all.

use std::io::{Cursor, Read};
use std::path::PathBuf;
use talentiq_common::constants::{is_allowed_extension, mime_type_for, ZIP_CONTENT_TYPES};
use talentiq_common::{Result, Settings, TalentiqError};
use talentiq_db::{Asset, AssetRepository};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// One file of an incoming bundle, already buffered.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A flat candidate document after expansion.
#[derive(Debug, Clone)]
pub struct ExpandedFile {
    pub name: String,
    pub extension: String,
    pub bytes: Vec<u8>,
}

pub struct UploadExpander {
    assets: AssetRepository,
    upload_dir: PathBuf,
    max_files: usize,
    max_total_bytes: u64,
    write_chunk_size: usize,
}

impl UploadExpander {
    pub fn new(assets: AssetRepository, settings: &Settings) -> Self {
        Self {
            assets,
            upload_dir: PathBuf::from(&settings.storage.upload_dir),
            max_files: settings.upload.max_files,
            max_total_bytes: settings.upload.max_total_size_bytes(),
            write_chunk_size: settings.upload.file_default_chunk_size.max(1),
        }
    }

    /// Expand a bundle and persist every surviving file as a project asset.
    pub async fn expand_and_store(
        &self,
        project_id: &str,
        files: Vec<IncomingFile>,
    ) -> Result<Vec<Asset>> {
        let expanded = expand_bundle(files, self.max_files, self.max_total_bytes)?;

        let project_dir = self.upload_dir.join(project_id);
        tokio::fs::create_dir_all(&project_dir)
            .await
            .map_err(|e| TalentiqError::Internal(format!("Failed to create asset dir: {e}")))?;

        let mut assets = Vec::with_capacity(expanded.len());
        for file in expanded {
            let storage_name = format!("{project_id}_{}.{}", Uuid::new_v4(), file.extension);
            let path = project_dir.join(&storage_name);

            self.write_file(&path, &file.bytes).await.map_err(|e| {
                TalentiqError::Internal(format!("Failed to store {}: {e}", file.name))
            })?;

            let asset = Asset {
                id: Uuid::new_v4(),
                project_id: project_id.to_string(),
                name: storage_name,
                mime_type: mime_type_for(&file.extension).to_string(),
                size_bytes: file.bytes.len() as i64,
                url: path.to_string_lossy().to_string(),
                created_at: chrono::Utc::now(),
            };
            self.assets.insert(&asset).await?;
            assets.push(asset);
        }

        tracing::info!(project_id, count = assets.len(), "Stored uploaded assets");
        Ok(assets)
    }

    /// Copy bytes to disk in fixed-size chunks.
    async fn write_file(&self, path: &std::path::Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(path).await?;
        for chunk in bytes.chunks(self.write_chunk_size) {
            file.write_all(chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

/// Validate limits and flatten archives into a list of candidate files.
pub fn expand_bundle(
    files: Vec<IncomingFile>,
    max_files: usize,
    max_total_bytes: u64,
) -> Result<Vec<ExpandedFile>> {
    if files.len() > max_files {
        return Err(TalentiqError::Validation(format!(
            "too many files: {} exceeds the limit of {max_files}",
            files.len()
        )));
    }

    let total_bytes: u64 = files.iter().map(|f| f.bytes.len() as u64).sum();
    if total_bytes > max_total_bytes {
        return Err(TalentiqError::Validation(format!(
            "upload too large: {total_bytes} bytes exceeds the limit of {max_total_bytes}"
        )));
    }

    let mut expanded = Vec::new();
    for file in files {
        if is_archive(&file) {
            expanded.extend(expand_archive(&file, max_files)?);
        } else {
            let extension = extension_of(&file.name);
            if !is_allowed_extension(&extension) {
                return Err(TalentiqError::Validation(format!(
                    "unsupported file type: {}",
                    file.name
                )));
            }
            expanded.push(ExpandedFile { name: file.name, extension, bytes: file.bytes });
        }
    }

    if expanded.len() > max_files {
        return Err(TalentiqError::Validation(format!(
            "too many files after archive expansion: {} exceeds the limit of {max_files}",
            expanded.len()
        )));
    }

    let expanded_bytes: u64 = expanded.iter().map(|f| f.bytes.len() as u64).sum();
    if expanded_bytes > max_total_bytes {
        return Err(TalentiqError::Validation(format!(
            "upload too large after archive expansion: {expanded_bytes} bytes"
        )));
    }

    Ok(expanded)
}

fn is_archive(file: &IncomingFile) -> bool {
    ZIP_CONTENT_TYPES.contains(&file.content_type.as_str())
        || file.name.to_lowercase().ends_with(".zip")
}

fn expand_archive(file: &IncomingFile, max_files: usize) -> Result<Vec<ExpandedFile>> {
    let cursor = Cursor::new(file.bytes.as_slice());
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| TalentiqError::Validation(format!("bad archive {}: {e}", file.name)))?;

    // Zip-bomb guard: reject before reading any entry bytes.
    if archive.len() > max_files {
        return Err(TalentiqError::Validation(format!(
            "bad archive {}: {} entries exceeds the limit of {max_files}",
            file.name,
            archive.len()
        )));
    }

    let mut expanded = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| TalentiqError::Validation(format!("bad archive {}: {e}", file.name)))?;

        if entry.is_dir() {
            continue;
        }

        let raw_name = entry.name().to_string();
        if raw_name.starts_with("__MACOSX") {
            continue;
        }

        // Flatten to basename, collapsing both separator styles.
        let basename = raw_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&raw_name)
            .to_string();
        if basename.is_empty() || basename.starts_with('.') {
            continue;
        }

        let extension = extension_of(&basename);
        if !is_allowed_extension(&extension) {
            tracing::debug!(entry = %raw_name, "Skipping archive entry with disallowed extension");
            continue;
        }

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| TalentiqError::Validation(format!("bad archive {}: {e}", file.name)))?;

        expanded.push(ExpandedFile { name: basename, extension, bytes });
    }

    Ok(expanded)
}

fn extension_of(name: &str) -> String {
    name.rsplit('.').next().unwrap_or("").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn make_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            for (name, bytes) in entries {
                writer
                    .start_file(name.to_string(), SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(bytes).unwrap();
            }
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    fn plain(name: &str, bytes: &[u8]) -> IncomingFile {
        IncomingFile {
            name: name.to_string(),
            content_type: "application/pdf".to_string(),
            bytes: bytes.to_vec(),
        }
    }

    fn archive(name: &str, bytes: Vec<u8>) -> IncomingFile {
        IncomingFile {
            name: name.to_string(),
            content_type: "application/zip".to_string(),
            bytes,
        }
    }

    #[test]
    fn test_expand_mixed_bundle() {
        let zip_bytes = make_zip(&[
            ("cv_c.pdf", b"pdf c"),
            ("__MACOSX/x", b"junk"),
            (".DS_Store", b"junk"),
            ("cv_d.exe", b"nope"),
        ]);
        let files = vec![
            plain("cv_a.pdf", b"pdf a"),
            plain("cv_b.docx", b"docx b"),
            archive("archive.zip", zip_bytes),
        ];

        let expanded = expand_bundle(files, 200, 50 * 1024 * 1024).unwrap();
        let names: Vec<&str> = expanded.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["cv_a.pdf", "cv_b.docx", "cv_c.pdf"]);
    }

    #[test]
    fn test_too_many_files_pre_expansion() {
        let files: Vec<IncomingFile> = (0..201)
            .map(|i| plain(&format!("cv_{i}.pdf"), &[0u8; 10]))
            .collect();
        let err = expand_bundle(files, 200, 50 * 1024 * 1024).unwrap_err();
        assert!(matches!(err, TalentiqError::Validation(msg) if msg.contains("too many files")));
    }

    #[test]
    fn test_too_many_files_post_expansion() {
        let entries: Vec<(String, Vec<u8>)> =
            (0..5).map(|i| (format!("cv_{i}.pdf"), vec![0u8; 4])).collect();
        let refs: Vec<(&str, &[u8])> = entries
            .iter()
            .map(|(n, b)| (n.as_str(), b.as_slice()))
            .collect();
        let files = vec![archive("many.zip", make_zip(&refs))];
        let err = expand_bundle(files, 3, 50 * 1024 * 1024).unwrap_err();
        assert!(matches!(err, TalentiqError::Validation(msg) if msg.contains("bad archive")));
    }

    #[test]
    fn test_upload_too_large() {
        let files = vec![plain("big.pdf", &vec![0u8; 1024])];
        let err = expand_bundle(files, 200, 512).unwrap_err();
        assert!(matches!(err, TalentiqError::Validation(msg) if msg.contains("too large")));
    }

    #[test]
    fn test_malformed_archive_fails_upload() {
        let files = vec![archive("broken.zip", b"not a zip at all".to_vec())];
        let err = expand_bundle(files, 200, 50 * 1024 * 1024).unwrap_err();
        assert!(matches!(err, TalentiqError::Validation(msg) if msg.contains("bad archive")));
    }

    #[test]
    fn test_nested_paths_flattened() {
        let zip_bytes = make_zip(&[("folder/sub/cv_x.pdf", b"x")]);
        let expanded =
            expand_bundle(vec![archive("a.zip", zip_bytes)], 200, 50 * 1024 * 1024).unwrap();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].name, "cv_x.pdf");
    }

    #[test]
    fn test_zip_detected_by_name() {
        let mut file = archive("bundle.ZIP", make_zip(&[("cv.txt", b"hello")]));
        file.content_type = "application/octet-stream".to_string();
        let expanded = expand_bundle(vec![file], 200, 50 * 1024 * 1024).unwrap();
        assert_eq!(expanded[0].name, "cv.txt");
    }

    #[test]
    fn test_top_level_disallowed_extension_rejected() {
        let files = vec![plain("virus.exe", b"nope")];
        let err = expand_bundle(files, 200, 50 * 1024 * 1024).unwrap_err();
        assert!(matches!(err, TalentiqError::Validation(msg) if msg.contains("unsupported")));
    }
}
