//! Report output.
//!
//! The report is a CSV table with a fixed header row followed by one line per department that
//! received at least one order.

use std::fs::{self, Permissions};
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::AnalyticsResult;
use crate::types::ReportRow;

/// Header row of the report, in column order.
pub const REPORT_HEADERS: [&str; 4] = [
    "department_id",
    "number_of_orders",
    "number_of_first_orders",
    "percentage",
];

/// Write the header row and then every row, `\n`-terminated.
///
/// The header is written even when `rows` is empty.
pub fn write_report<W: Write>(rows: &[ReportRow], sink: W) -> AnalyticsResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(sink);

    wtr.write_record(REPORT_HEADERS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the report to `path`, replacing any existing file only once the full report is on disk.
///
/// Rows are written to a temporary file in the destination directory which is then renamed over
/// `path`; on failure the temporary file is removed and `path` is left as it was.
///
/// A replaced report keeps its permissions. A new report is `rw-r--r--` on Unix rather than the
/// owner-only mode of the temporary file.
pub fn write_report_to_path(rows: &[ReportRow], path: impl AsRef<Path>) -> AnalyticsResult<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    write_report(rows, tmp.as_file_mut())?;
    if let Some(perms) = report_permissions(path) {
        tmp.as_file().set_permissions(perms)?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn report_permissions(path: &Path) -> Option<Permissions> {
    match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => new_report_permissions(),
    }
}

#[cfg(unix)]
fn new_report_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_report_permissions() -> Option<Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::{write_report, write_report_to_path};
    use crate::types::ReportRow;

    fn row(department_id: i64, orders: u64, first: u64, pct: &str) -> ReportRow {
        ReportRow {
            department_id,
            order_count: orders,
            first_order_count: first,
            percentage: pct.to_string(),
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let mut out = Vec::new();
        write_report(&[row(10, 2, 1, "0.50"), row(20, 1, 1, "1.00")], &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "department_id,number_of_orders,number_of_first_orders,percentage\n\
             10,2,1,0.50\n\
             20,1,1,1.00\n"
        );
    }

    #[test]
    fn writes_header_only_when_empty() {
        let mut out = Vec::new();
        write_report(&[], &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "department_id,number_of_orders,number_of_first_orders,percentage\n"
        );
    }

    #[test]
    fn path_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        std::fs::write(&path, "stale").unwrap();

        write_report_to_path(&[row(1, 1, 0, "0.00")], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("1,1,0,0.00\n"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn path_write_is_not_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        write_report_to_path(&[], &path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);

        let kept = dir.path().join("kept.csv");
        std::fs::write(&kept, "stale").unwrap();
        std::fs::set_permissions(&kept, std::fs::Permissions::from_mode(0o640)).unwrap();
        write_report_to_path(&[], &kept).unwrap();
        let mode = std::fs::metadata(&kept).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn path_write_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.csv");
        assert!(write_report_to_path(&[], &path).is_err());
        assert!(!path.exists());
    }
}
