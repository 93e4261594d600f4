use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use super::CacheError;
use crate::bedfiles::{BedFile, FormattingPolicy};
use crate::core::panel::Panel;

/// One `bedfiles` invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// md5 of the uncompressed BED contents
    pub artifact_hash: String,
    pub panel_digest: String,
    pub policy: FormattingPolicy,
    pub source_file_hashes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub region_count: usize,
    /// RFC 3339
    pub recorded_at: String,
}

impl AuditEntry {
    #[must_use]
    pub fn new(panel: &Panel, bed: &BedFile, policy: &FormattingPolicy, output: Option<&Path>) -> Self {
        Self {
            artifact_hash: bed.artifact_hash(),
            panel_digest: panel.digest(),
            policy: policy.clone(),
            source_file_hashes: panel.provenance.source_file_hashes.clone(),
            output: output.map(|p| p.display().to_string()),
            region_count: bed.len(),
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Append-only JSON Lines audit log
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry
    ///
    /// # Errors
    ///
    /// Returns a `CacheError` if the log cannot be written.
    pub fn append(&self, entry: &AuditEntry) -> Result<(), CacheError> {
        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.sync_data()?;
        info!(
            "Recorded audit entry {} in {}",
            entry.artifact_hash,
            self.path.display()
        );
        Ok(())
    }

    /// Every entry, oldest first
    ///
    /// # Errors
    ///
    /// Returns `CacheError::CorruptLog` naming the first unparseable line.
    pub fn entries(&self) -> Result<Vec<AuditEntry>, CacheError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(std::fs::File::open(&self.path)?);
        let mut entries = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|e| CacheError::CorruptLog {
                line: line_num + 1,
                reason: e.to_string(),
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Entries for one artifact hash
    ///
    /// # Errors
    ///
    /// As for [`AuditLog::entries`].
    pub fn find(&self, artifact_hash: &str) -> Result<Vec<AuditEntry>, CacheError> {
        let wanted = artifact_hash.trim().to_lowercase();
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.artifact_hash == wanted)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bedfiles::writer::write;
    use crate::core::panel::Provenance;
    use crate::core::region::GenomicRegion;
    use crate::core::types::SourceKind;
    use tempfile::TempDir;

    fn entry(region_id: &str) -> AuditEntry {
        let region = GenomicRegion::new(region_id, "chr1", 10, 20, SourceKind::Coordinate, region_id).unwrap();
        let panel = Panel {
            regions: vec![region],
            provenance: Provenance::now(),
        };
        let policy = FormattingPolicy::default();
        let bed = write(&panel, &policy).unwrap();
        AuditEntry::new(&panel, &bed, &policy, Some(Path::new("out.bed")))
    }

    #[test]
    fn test_append_and_find() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(dir.path().join("db").join("audit.jsonl"));
        assert!(log.entries().unwrap().is_empty());

        let first = entry("a");
        let second = entry("b");
        log.append(&first).unwrap();
        log.append(&second).unwrap();
        log.append(&first).unwrap();

        assert_eq!(log.entries().unwrap().len(), 3);
        let found = log.find(&first.artifact_hash.to_uppercase()).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].region_count, 1);
        assert_eq!(found[0].output.as_deref(), Some("out.bed"));
        assert!(log.find("0".repeat(32).as_str()).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_line_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        let log = AuditLog::new(&path);
        log.append(&entry("a")).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{truncated\n").unwrap();

        match log.entries() {
            Err(CacheError::CorruptLog { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corrupt log, got {other:?}"),
        }
    }
}
