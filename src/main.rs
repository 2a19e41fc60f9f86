use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use purchase_analytics::cli::{CliArgs, LOG_FILE_ENV};
use purchase_analytics::observability::{
    AnalysisObserver, AnalysisSeverity, CompositeObserver, FileObserver, TracingObserver,
};
use purchase_analytics::pipeline::{analyze_paths, AnalysisOptions};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    if let Err(e) = args.validate() {
        eprintln!("{e}\n\n{}", CliArgs::command().render_usage());
        return ExitCode::from(2);
    }

    let mut observers: Vec<Arc<dyn AnalysisObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(log) = std::env::var_os(LOG_FILE_ENV) {
        observers.push(Arc::new(FileObserver::new(log)));
    }
    let options = AnalysisOptions {
        observer: Some(Arc::new(CompositeObserver::new(observers))),
        alert_at_or_above: AnalysisSeverity::Critical,
    };

    info!(
        order_lines = %args.order_lines_path.display(),
        catalog = %args.catalog_path.display(),
        "starting analysis"
    );
    match analyze_paths(
        &args.order_lines_path,
        &args.catalog_path,
        &args.report_path,
        &options,
    ) {
        Ok(stats) => {
            info!(%stats, "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(err = %e, "no report written");
            ExitCode::FAILURE
        }
    }
}
