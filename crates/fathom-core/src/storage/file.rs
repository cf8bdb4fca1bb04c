use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::config::StorageConfig;

use super::error::StorageError;
use super::{ReportRecord, ReportStore, ReportUpdate};

/// File-based report storage.
///
/// One JSON file per report:
/// ```text
/// .fathom/
///   reports/
///     {report-id}.json
/// ```
pub struct FileReportStore {
    reports_dir: PathBuf,
    /// Serializes read-modify-write updates.
    write_lock: Mutex<()>,
}

impl FileReportStore {
    /// Creates a store rooted at `reports_dir`.
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a store from configuration (`{data_dir}/{reports_dir}`).
    pub fn with_config(config: &StorageConfig) -> Self {
        Self::new(config.reports_path())
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Returns the path to a report's file.
    fn report_file(&self, id: &str) -> Result<PathBuf, StorageError> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(StorageError::InvalidId(id.to_string()));
        }
        Ok(self.reports_dir.join(format!("{}.json", id)))
    }

    /// Ensures the reports directory exists.
    fn ensure_reports_dir(&self) -> Result<(), StorageError> {
        let dir = &self.reports_dir;
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        }
        Ok(())
    }

    fn read_record(&self, path: &Path) -> Result<ReportRecord, StorageError> {
        let json = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Writes through a temporary file so readers never see a partial record.
    fn write_record(&self, record: &ReportRecord) -> Result<(), StorageError> {
        self.ensure_reports_dir()?;
        let path = self.report_file(&record.id)?;
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&tmp, json).map_err(|e| StorageError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::io(&path, e))?;
        Ok(())
    }
}

impl ReportStore for FileReportStore {
    fn create_report(&self, report: &ReportRecord) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.report_file(&report.id)?;
        if path.exists() {
            return Err(StorageError::ReportExists(report.id.clone()));
        }
        self.write_record(report)?;
        debug!(id = %report.id, "Created report");
        Ok(())
    }

    fn update_report(&self, id: &str, update: ReportUpdate) -> Result<ReportRecord, StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.report_file(id)?;
        if !path.exists() {
            return Err(StorageError::ReportNotFound(id.to_string()));
        }

        let mut record = self.read_record(&path)?;
        record.apply(update);
        self.write_record(&record)?;
        debug!(id = %id, status = record.status.display_name(), "Updated report");

        Ok(record)
    }

    fn list_reports(&self) -> Result<Vec<ReportRecord>, StorageError> {
        let dir = &self.reports_dir;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut reports = Vec::new();
        let entries = fs::read_dir(dir).map_err(|e| StorageError::io(dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(dir, e))?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match self.read_record(&path) {
                Ok(record) => reports.push(record),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable report"),
            }
        }

        // Most recent first
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(reports)
    }

    fn get_report(&self, id: &str) -> Result<Option<ReportRecord>, StorageError> {
        let path = match self.report_file(id) {
            Ok(path) => path,
            Err(StorageError::InvalidId(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        if !path.exists() {
            return Ok(None);
        }
        self.read_record(&path).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ReportStatus;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn store() -> (TempDir, FileReportStore) {
        let dir = TempDir::new().unwrap();
        let store = FileReportStore::new(dir.path().join("reports"));
        (dir, store)
    }

    #[test]
    fn test_create_and_get() {
        let (_dir, store) = store();
        let record = ReportRecord::new("fusion energy");
        store.create_report(&record).unwrap();

        let loaded = store.get_report(&record.id).unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(store.reports_dir().join(format!("{}.json", record.id)).exists());
    }

    #[test]
    fn test_duplicate_create_fails() {
        let (_dir, store) = store();
        let record = ReportRecord::new("q");
        store.create_report(&record).unwrap();
        assert!(matches!(
            store.create_report(&record),
            Err(StorageError::ReportExists(_))
        ));
    }

    #[test]
    fn test_update() {
        let (_dir, store) = store();
        let record = ReportRecord::new("q");
        store.create_report(&record).unwrap();

        let updated = store
            .update_report(&record.id, ReportUpdate::completed("# Done"))
            .unwrap();
        assert_eq!(updated.status, ReportStatus::Completed);

        let loaded = store.get_report(&record.id).unwrap().unwrap();
        assert_eq!(loaded.content.as_deref(), Some("# Done"));
    }

    #[test]
    fn test_update_missing() {
        let (_dir, store) = store();
        assert!(matches!(
            store.update_report("nope", ReportUpdate::failed("x")),
            Err(StorageError::ReportNotFound(_))
        ));
    }

    #[test]
    fn test_list_newest_first() {
        let (_dir, store) = store();
        let mut older = ReportRecord::new("older");
        older.created_at = Utc::now() - Duration::hours(1);
        let newer = ReportRecord::new("newer");
        store.create_report(&older).unwrap();
        store.create_report(&newer).unwrap();

        let list = store.list_reports().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].query, "newer");
        assert_eq!(list[1].query, "older");
    }

    #[test]
    fn test_list_empty_when_missing_dir() {
        let (_dir, store) = store();
        assert!(store.list_reports().unwrap().is_empty());
    }

    #[test]
    fn test_path_traversal_rejected() {
        let (_dir, store) = store();
        assert!(store.get_report("../secret").unwrap().is_none());
    }
}
