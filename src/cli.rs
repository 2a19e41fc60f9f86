//! Command-line arguments for the `purchase-analytics` binary.

use std::fs::File;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::error::{AnalyticsError, AnalyticsResult};

/// Environment variable naming an optional run log file.
pub const LOG_FILE_ENV: &str = "PURCHASE_ANALYTICS_LOG";

/// Positional arguments of the binary.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "purchase-analytics", version)]
#[command(about = "Per-department order and first-order counts from a product catalog and order lines")]
pub struct CliArgs {
    /// Order lines CSV (order_id, product_id, add_to_cart_order, reordered)
    #[arg(value_name = "ORDER_PRODUCTS_CSV")]
    pub order_lines_path: PathBuf,

    /// Product catalog CSV (product_id, product_name, aisle_id, department_id)
    #[arg(value_name = "PRODUCTS_CSV")]
    pub catalog_path: PathBuf,

    /// Report destination, replaced atomically
    #[arg(value_name = "REPORT_CSV")]
    pub report_path: PathBuf,
}

impl CliArgs {
    /// Check the parsed paths before any input is read.
    ///
    /// Both inputs must be readable files and the report's directory must exist; any violation
    /// is an [`AnalyticsError::Usage`].
    pub fn validate(&self) -> AnalyticsResult<()> {
        check_readable(&self.order_lines_path, "order products")?;
        check_readable(&self.catalog_path, "products")?;

        if let Some(dir) = self.report_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !dir.is_dir() {
                return Err(AnalyticsError::Usage {
                    message: format!("report directory does not exist: {}", dir.display()),
                });
            }
        }
        Ok(())
    }
}

fn check_readable(path: &Path, what: &str) -> AnalyticsResult<()> {
    if !path.is_file() {
        return Err(AnalyticsError::Usage {
            message: format!("{what} file not found: {}", path.display()),
        });
    }
    File::open(path).map_err(|e| AnalyticsError::Usage {
        message: format!("{what} file is not readable: {} ({e})", path.display()),
    })?;
    Ok(())
}
