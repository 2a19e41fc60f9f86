use thiserror::Error;

use crate::observability::AnalysisSeverity;

/// Convenience result type used across the crate.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Error type returned by table, aggregation and pipeline functions.
///
/// A single enum is shared by every stage so that a failure anywhere in a run surfaces to the
/// caller of [`crate::pipeline::analyze`] unchanged.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding/encoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A table's header row does not satisfy its required columns (or is empty/ambiguous).
    #[error("schema error: {message}")]
    Schema { message: String },

    /// A named column was accessed on a row that does not contain it.
    #[error("lookup error at line {line}: column '{column}' {message}")]
    Lookup {
        line: u64,
        column: String,
        message: String,
    },

    /// An id field could not be parsed as an integer.
    #[error("failed to parse value at line {line} column '{column}': {message} (raw='{raw}')")]
    Parse {
        line: u64,
        column: String,
        raw: String,
        message: String,
    },

    /// A counter increment targeted a department outside the aggregate's universe.
    #[error("department {department_id} is not part of the aggregate")]
    UnknownDepartment { department_id: i64 },

    /// Invalid command-line usage or unreadable input path.
    #[error("usage error: {message}")]
    Usage { message: String },
}

impl AnalyticsError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Severity used when reporting this error to an observer.
    ///
    /// Infrastructure failures (I/O, including I/O underneath the CSV reader) are `Critical`;
    /// data and usage problems are `Error`.
    pub fn severity(&self) -> AnalysisSeverity {
        match self {
            Self::Io(_) => AnalysisSeverity::Critical,
            Self::Csv(err) => match err.kind() {
                csv::ErrorKind::Io(_) => AnalysisSeverity::Critical,
                _ => AnalysisSeverity::Error,
            },
            Self::Schema { .. }
            | Self::Lookup { .. }
            | Self::Parse { .. }
            | Self::UnknownDepartment { .. }
            | Self::Usage { .. } => AnalysisSeverity::Error,
        }
    }
}
