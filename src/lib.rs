//! `purchase-analytics` computes, per product department, how many order lines were recorded and
//! how many of them were a customer's first purchase of that product.
//!
//! Inputs are two CSV tables:
//!
//! - a **product catalog** with at least `product_id, product_name, aisle_id, department_id`
//! - **order lines** with at least `order_id, product_id, add_to_cart_order, reordered`
//!
//! The output is a CSV report with the header
//! `department_id,number_of_orders,number_of_first_orders,percentage`, one row per department
//! with at least one order, in ascending numeric department order.
//!
//! ## Quick example
//!
//! ```no_run
//! use purchase_analytics::pipeline::{analyze_paths, AnalysisOptions};
//!
//! # fn main() -> Result<(), purchase_analytics::AnalyticsError> {
//! let stats = analyze_paths(
//!     "input/order_products.csv",
//!     "input/products.csv",
//!     "output/report.csv",
//!     &AnalysisOptions::default(),
//! )?;
//! println!("departments={}", stats.report_rows);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`table`]: schema-validated CSV row streaming and the two typed input views
//! - [`aggregate`]: per-department counters and the final summary
//! - [`pipeline`]: the single-pass join and the path-based entry point
//! - [`report`]: report writing
//! - [`observability`]: run observers (tracing, log file, fan-out)
//! - [`cli`]: argument checking for the binary
//! - [`types`]: record types shared by the modules above
//! - [`error`]: the crate's error type

pub mod aggregate;
pub mod cli;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod table;
pub mod types;

pub use error::{AnalyticsError, AnalyticsResult};
