//! Run observers.
//!
//! [`crate::pipeline::analyze_paths`] reports the outcome of every run to an optional
//! [`AnalysisObserver`]. Stage-level progress is logged separately through `tracing`.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::AnalyticsError;
use crate::pipeline::AnalysisStats;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnalysisSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (the run failed).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

/// The inputs and output of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisContext {
    pub order_lines_path: PathBuf,
    pub catalog_path: PathBuf,
    pub report_path: PathBuf,
}

/// Observer interface for analysis outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait AnalysisObserver: Send + Sync {
    /// Called when a run succeeds and the report has been written.
    fn on_success(&self, _ctx: &AnalysisContext, _stats: &AnalysisStats) {}

    /// Called when a run fails.
    fn on_failure(&self, _ctx: &AnalysisContext, _severity: AnalysisSeverity, _error: &AnalyticsError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &AnalysisContext, severity: AnalysisSeverity, error: &AnalyticsError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn AnalysisObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn AnalysisObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl AnalysisObserver for CompositeObserver {
    fn on_success(&self, ctx: &AnalysisContext, stats: &AnalysisStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &AnalysisContext, severity: AnalysisSeverity, error: &AnalyticsError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &AnalysisContext, severity: AnalysisSeverity, error: &AnalyticsError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Emits run outcomes as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl AnalysisObserver for TracingObserver {
    fn on_success(&self, ctx: &AnalysisContext, stats: &AnalysisStats) {
        tracing::info!(
            report = %ctx.report_path.display(),
            departments = stats.report_rows,
            order_lines = stats.order_lines,
            join_misses = stats.join_misses,
            elapsed = ?stats.elapsed,
            "report written"
        );
    }

    fn on_failure(&self, ctx: &AnalysisContext, severity: AnalysisSeverity, error: &AnalyticsError) {
        tracing::error!(
            ?severity,
            order_lines = %ctx.order_lines_path.display(),
            catalog = %ctx.catalog_path.display(),
            err = %error,
            "analysis failed"
        );
    }

    fn on_alert(&self, ctx: &AnalysisContext, severity: AnalysisSeverity, error: &AnalyticsError) {
        tracing::error!(
            alert = true,
            ?severity,
            order_lines = %ctx.order_lines_path.display(),
            catalog = %ctx.catalog_path.display(),
            err = %error,
            "analysis failed"
        );
    }
}

/// Appends run outcomes to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl AnalysisObserver for FileObserver {
    fn on_success(&self, ctx: &AnalysisContext, stats: &AnalysisStats) {
        self.append_line(&format!(
            "{} ok report={} {}",
            unix_ts(),
            ctx.report_path.display(),
            stats
        ));
    }

    fn on_failure(&self, ctx: &AnalysisContext, severity: AnalysisSeverity, error: &AnalyticsError) {
        self.append_line(&format!(
            "{} fail severity={:?} order_lines={} catalog={} err={}",
            unix_ts(),
            severity,
            ctx.order_lines_path.display(),
            ctx.catalog_path.display(),
            error
        ));
    }

    fn on_alert(&self, ctx: &AnalysisContext, severity: AnalysisSeverity, error: &AnalyticsError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} order_lines={} catalog={} err={}",
            unix_ts(),
            severity,
            ctx.order_lines_path.display(),
            ctx.catalog_path.display(),
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
