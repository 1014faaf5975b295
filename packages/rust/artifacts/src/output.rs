//! Output document serialization with all-or-nothing writes.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use vrac_shared::{OutputDocument, PeriodRecord, Result, VracError};

/// Metadata about a written artifact file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMeta {
    pub path: PathBuf,
    /// Hex SHA-256 of the written bytes.
    pub sha256: String,
    pub size_bytes: usize,
}

/// Render the output document as pretty JSON with a trailing newline.
pub fn render_output(doc: &OutputDocument) -> Result<String> {
    let mut json = serde_json::to_string_pretty(doc)
        .map_err(|e| VracError::Serialization(format!("output document: {e}")))?;
    json.push('\n');
    Ok(json)
}

/// Serialize `doc` into a temp file next to `path` without committing it.
#[instrument(skip_all, fields(path = %path.display(), periods = doc.periods.len()))]
pub fn stage_output(path: &Path, doc: &OutputDocument) -> Result<StagedFile> {
    let json = render_output(doc)?;
    stage_text(path, &json)
}

/// Write `content` to `path` via a temp file + rename.
///
/// Parent directories are created. On any failure the temp file is removed
/// and the destination is left untouched.
pub fn write_text_atomic(path: &Path, content: &str) -> Result<ArtifactMeta> {
    stage_text(path, content)?.commit()
}

/// A fully written temp file waiting to be renamed over its destination.
///
/// Dropping an uncommitted `StagedFile` removes the temp file, so several
/// files can be staged and only committed once all of them were written.
#[derive(Debug)]
pub struct StagedFile {
    temp: Option<PathBuf>,
    meta: ArtifactMeta,
}

impl StagedFile {
    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.meta.path
    }

    /// Rename the temp file over the destination.
    pub fn commit(mut self) -> Result<ArtifactMeta> {
        let Some(temp) = self.temp.take() else {
            return Ok(self.meta.clone());
        };
        if let Err(e) = std::fs::rename(&temp, &self.meta.path) {
            discard_temp(&temp);
            return Err(VracError::io(&self.meta.path, e));
        }

        debug!(path = %self.meta.path.display(), size = self.meta.size_bytes, "wrote file");
        Ok(self.meta.clone())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Some(temp) = self.temp.take() {
            discard_temp(&temp);
        }
    }
}

/// Write `content` to a temp file beside `path`.
///
/// Fails early when `path` is an existing directory, since the later rename
/// could never succeed.
pub fn stage_text(path: &Path, content: &str) -> Result<StagedFile> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| VracError::io(&parent, e))?;

    if path.is_dir() {
        return Err(VracError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::IsADirectory, "destination is a directory"),
        ));
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            VracError::validation(format!("output path {} has no file name", path.display()))
        })?;
    let temp = parent.join(format!(".{file_name}.{}.tmp", Uuid::now_v7()));

    if let Err(e) = std::fs::write(&temp, content) {
        discard_temp(&temp);
        return Err(VracError::io(&temp, e));
    }

    Ok(StagedFile {
        temp: Some(temp),
        meta: ArtifactMeta {
            path: path.to_path_buf(),
            sha256: sha256_hex(content.as_bytes()),
            size_bytes: content.len(),
        },
    })
}

/// Load a previously written output document.
pub fn read_output(path: &Path) -> Result<OutputDocument> {
    let content = std::fs::read_to_string(path).map_err(|e| VracError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| VracError::validation(format!("invalid artifact {}: {e}", path.display())))
}

/// SHA-256 over the compact JSON of `periods`.
///
/// Excludes `processedAt`, so two runs over an unchanged tree share a digest.
pub fn periods_digest(periods: &[PeriodRecord]) -> Result<String> {
    let bytes = serde_json::to_vec(periods)
        .map_err(|e| VracError::Serialization(format!("periods: {e}")))?;
    Ok(sha256_hex(&bytes))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn discard_temp(temp: &Path) {
    if let Err(e) = std::fs::remove_file(temp) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %temp.display(), error = %e, "failed to remove temp file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use vrac_shared::{PharmacyId, ProductSale};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("vrac-artifacts-test-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_doc() -> OutputDocument {
        let mut sirop = ProductSale::new("3400930007", "SIROP TOUX", 85);
        sirop.stock = Some(12.0);
        let record = PeriodRecord::new(
            PharmacyId::Tanda,
            "Aug–Dec 2024",
            NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 10).unwrap(),
            vec![ProductSale::new("3400930001", "COARTEM", 1300), sirop],
        );
        OutputDocument {
            periods: vec![record],
            processed_at: Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap(),
        }
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn staged_output_reads_back() {
        let tmp = temp_dir();
        let path = tmp.join("nested").join("processed.json");
        let doc = sample_doc();

        let meta = stage_output(&path, &doc).unwrap().commit().unwrap();
        assert_eq!(meta.path, path);
        assert_eq!(meta.sha256.len(), 64);
        assert_eq!(meta.size_bytes, std::fs::metadata(&path).unwrap().len() as usize);

        let loaded = read_output(&path).unwrap();
        assert_eq!(loaded, doc);
        assert_eq!(entries(&tmp.join("nested")), vec!["processed.json"]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn output_has_exactly_two_top_level_fields() {
        let json = render_output(&sample_doc()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["periods", "processedAt"]);

        let period = &value["periods"][0];
        assert_eq!(period["pharmacyId"], "tanda");
        assert_eq!(period["periodStart"], "2024-08-01");
        assert_eq!(period["totalQuantity"], 1385);
        assert_eq!(period["products"][1]["quantitySold"], 85);
        assert_eq!(period["products"][1]["stock"], 12.0);
        assert!(period["products"][0].get("price").is_none());
        assert!(json.ends_with("}\n"));
    }

    #[test]
    fn overwrite_replaces_previous_content() {
        let tmp = temp_dir();
        let path = tmp.join("out.txt");

        write_text_atomic(&path, "first").unwrap();
        write_text_atomic(&path, "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(entries(&tmp), vec!["out.txt"]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let tmp = temp_dir();
        // A directory at the destination is refused.
        let target = tmp.join("processed.json");
        std::fs::create_dir_all(target.join("occupied")).unwrap();

        let err = write_text_atomic(&target, "{}").unwrap_err();
        assert!(matches!(err, VracError::Io { .. }));
        assert_eq!(entries(&tmp), vec!["processed.json"]);
        assert!(target.is_dir());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn dropped_stage_leaves_nothing_behind() {
        let tmp = temp_dir();
        let first = stage_text(&tmp.join("a.csv"), "a").unwrap();
        let second = stage_text(&tmp.join("b.json"), "b").unwrap();
        assert_eq!(entries(&tmp).len(), 2);

        drop(first);
        drop(second);
        assert!(entries(&tmp).is_empty());

        let staged = stage_text(&tmp.join("c.json"), "c").unwrap();
        assert_eq!(staged.path(), tmp.join("c.json"));
        staged.commit().unwrap();
        assert_eq!(entries(&tmp), vec!["c.json"]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn staging_over_a_directory_fails_before_writing() {
        let tmp = temp_dir();
        let target = tmp.join("health.csv");
        std::fs::create_dir_all(&target).unwrap();

        let err = stage_text(&target, "x").unwrap_err();
        assert!(matches!(err, VracError::Io { .. }));
        assert_eq!(entries(&tmp), vec!["health.csv"]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn read_rejects_unknown_top_level_fields() {
        let tmp = temp_dir();
        let path = tmp.join("bad.json");
        std::fs::write(
            &path,
            r#"{"periods":[],"processedAt":"2025-01-15T09:30:00Z","extra":1}"#,
        )
        .unwrap();

        let err = read_output(&path).unwrap_err();
        assert!(matches!(err, VracError::Validation { .. }));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn digest_ignores_timestamp() {
        let a = sample_doc();
        let mut b = sample_doc();
        b.processed_at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

        assert_eq!(
            periods_digest(&a.periods).unwrap(),
            periods_digest(&b.periods).unwrap()
        );

        b.periods[0].products.pop();
        assert_ne!(
            periods_digest(&a.periods).unwrap(),
            periods_digest(&b.periods).unwrap()
        );
    }
}
