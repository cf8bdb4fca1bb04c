mod error;
mod file;
mod report;

pub use error::StorageError;
pub use file::FileReportStore;
pub use report::{ReportRecord, ReportStatus, ReportUpdate};

/// Trait for report storage backends.
///
/// Implementations must be shareable across tasks: background synthesis
/// updates records while the API reads them.
pub trait ReportStore: Send + Sync {
    /// Saves a new report. Fails if the id is already taken.
    fn create_report(&self, report: &ReportRecord) -> Result<(), StorageError>;

    /// Applies a partial update to an existing report.
    fn update_report(&self, id: &str, update: ReportUpdate) -> Result<ReportRecord, StorageError>;

    /// Lists all reports, newest first.
    fn list_reports(&self) -> Result<Vec<ReportRecord>, StorageError>;

    /// Loads a report by id.
    fn get_report(&self, id: &str) -> Result<Option<ReportRecord>, StorageError>;
}
