//! The department purchase analysis.
//!
//! One run is a hash join between the product catalog (fully loaded into a
//! [`ProductDepartmentIndex`]) and the order lines (streamed once, never collected), reduced to
//! per-department counters in a single pass:
//!
//! 1. open the catalog and build `product_id -> department_id`
//! 2. create one zeroed counter per department seen in the catalog
//! 3. stream every order line, skipping products missing from the catalog
//! 4. summarize the counters and write the report
//!
//! Memory is bounded by the number of distinct products and departments, not by the number of
//! order lines.
//!
//! ```rust
//! use purchase_analytics::pipeline::analyze;
//!
//! let catalog = "product_id,product_name,aisle_id,department_id\n1,A,1,10\n2,B,1,10\n3,C,1,20\n";
//! let orders = "order_id,product_id,add_to_cart_order,reordered\n1,1,1,0\n2,2,1,1\n3,3,1,0\n4,9,1,0\n";
//!
//! let mut out = Vec::new();
//! let stats = analyze(orders.as_bytes(), catalog.as_bytes(), &mut out).unwrap();
//! assert_eq!(stats.join_misses, 1);
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     "department_id,number_of_orders,number_of_first_orders,percentage\n10,2,1,0.50\n20,1,1,1.00\n"
//! );
//! ```

use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::aggregate::DepartmentAggregate;
use crate::error::AnalyticsResult;
use crate::observability::{AnalysisContext, AnalysisObserver, AnalysisSeverity};
use crate::report::{write_report, write_report_to_path};
use crate::table::{OrderLineView, ProductCatalogView};
use crate::types::{ProductDepartmentIndex, ReportRow};

/// Options controlling a path-based run.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct AnalysisOptions {
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn AnalysisObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: AnalysisSeverity,
}

impl fmt::Debug for AnalysisOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisOptions")
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            observer: None,
            alert_at_or_above: AnalysisSeverity::Critical,
        }
    }
}

/// Counts from the streaming join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    /// Order lines read.
    pub order_lines: u64,
    /// Lines whose product was found in the catalog.
    pub matched: u64,
    /// Lines skipped because their product is not in the catalog.
    pub join_misses: u64,
}

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisStats {
    /// Distinct products in the catalog.
    pub products: usize,
    /// Distinct departments in the catalog.
    pub departments: usize,
    pub order_lines: u64,
    pub matched: u64,
    pub join_misses: u64,
    /// Departments written to the report.
    pub report_rows: usize,
    pub elapsed: Duration,
}

impl fmt::Display for AnalysisStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "products={} departments={} order_lines={} matched={} join_misses={} report_rows={} elapsed={:?}",
            self.products,
            self.departments,
            self.order_lines,
            self.matched,
            self.join_misses,
            self.report_rows,
            self.elapsed
        )
    }
}

/// Report rows plus the stats of the run that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentReport {
    pub rows: Vec<ReportRow>,
    pub stats: AnalysisStats,
}

/// Fully consume the catalog into a product → department index.
///
/// If a product id repeats, the last row wins.
pub fn build_product_index<R: Read>(
    catalog: &mut ProductCatalogView<R>,
) -> AnalyticsResult<ProductDepartmentIndex> {
    let mut index = ProductDepartmentIndex::new();
    for record in catalog.records() {
        let record = record?;
        if let Some(previous) = index.insert(record.product_id, record.department_id) {
            if previous != record.department_id {
                debug!(
                    product_id = record.product_id,
                    previous,
                    department_id = record.department_id,
                    "product remapped to a different department"
                );
            }
        }
    }
    Ok(index)
}

/// Stream every order line once into `aggregate`.
///
/// Lines whose product is not in `index` are skipped and only counted as join misses.
pub fn aggregate_order_lines<R: Read>(
    index: &ProductDepartmentIndex,
    order_lines: &mut OrderLineView<R>,
    aggregate: &mut DepartmentAggregate,
) -> AnalyticsResult<JoinStats> {
    let mut stats = JoinStats::default();
    for line in order_lines.records() {
        let line = line?;
        stats.order_lines += 1;

        let Some(department_id) = index.department_of(line.product_id) else {
            stats.join_misses += 1;
            continue;
        };

        aggregate.add_order(department_id)?;
        if line.is_first_purchase() {
            aggregate.add_first_order(department_id)?;
        }
        stats.matched += 1;
    }
    Ok(stats)
}

/// Run the join and aggregation, returning the report rows without writing them.
pub fn department_report<O: Read, C: Read>(
    order_lines: O,
    catalog: C,
) -> AnalyticsResult<DepartmentReport> {
    let start = Instant::now();

    let index = {
        let mut catalog = ProductCatalogView::open(catalog)?;
        build_product_index(&mut catalog)?
    };
    let mut aggregate = DepartmentAggregate::new(index.departments());
    info!(
        products = index.len(),
        departments = aggregate.len(),
        elapsed = ?start.elapsed(),
        "catalog loaded"
    );

    let join = {
        let mut orders = OrderLineView::open(order_lines)?;
        aggregate_order_lines(&index, &mut orders, &mut aggregate)?
    };
    info!(
        order_lines = join.order_lines,
        matched = join.matched,
        join_misses = join.join_misses,
        elapsed = ?start.elapsed(),
        "order lines aggregated"
    );

    let departments = aggregate.len();
    let rows = aggregate.into_report();
    let stats = AnalysisStats {
        products: index.len(),
        departments,
        order_lines: join.order_lines,
        matched: join.matched,
        join_misses: join.join_misses,
        report_rows: rows.len(),
        elapsed: start.elapsed(),
    };
    Ok(DepartmentReport { rows, stats })
}

/// Analyze `order_lines` against `catalog` and write the report to `sink`.
///
/// Nothing is written to `sink` unless both inputs were read successfully.
pub fn analyze<O: Read, C: Read, W: Write>(
    order_lines: O,
    catalog: C,
    sink: W,
) -> AnalyticsResult<AnalysisStats> {
    let DepartmentReport { rows, stats } = department_report(order_lines, catalog)?;
    write_report(&rows, sink)?;
    Ok(stats)
}

/// Path-based entry point.
///
/// The catalog is opened first, then the order lines. The report at `report_path` is replaced
/// atomically: on any failure no (partial) report is left behind.
///
/// When an observer is configured, this function reports:
///
/// - `on_success` on success, with run stats
/// - `on_failure` on failure, with the error's severity
/// - `on_alert` on failure when that severity is >= `options.alert_at_or_above`
pub fn analyze_paths(
    order_lines_path: impl AsRef<Path>,
    catalog_path: impl AsRef<Path>,
    report_path: impl AsRef<Path>,
    options: &AnalysisOptions,
) -> AnalyticsResult<AnalysisStats> {
    let ctx = AnalysisContext {
        order_lines_path: order_lines_path.as_ref().to_path_buf(),
        catalog_path: catalog_path.as_ref().to_path_buf(),
        report_path: report_path.as_ref().to_path_buf(),
    };

    let result = run_paths(&ctx);

    if let Some(obs) = options.observer.as_ref() {
        match &result {
            Ok(stats) => obs.on_success(&ctx, stats),
            Err(e) => {
                let sev = e.severity();
                obs.on_failure(&ctx, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(&ctx, sev, e);
                }
            }
        }
    }

    result
}

fn run_paths(ctx: &AnalysisContext) -> AnalyticsResult<AnalysisStats> {
    let start = Instant::now();
    let catalog = File::open(&ctx.catalog_path)?;
    let order_lines = File::open(&ctx.order_lines_path)?;

    let DepartmentReport { rows, mut stats } = department_report(order_lines, catalog)?;
    write_report_to_path(&rows, &ctx.report_path)?;

    stats.elapsed = start.elapsed();
    info!(
        report = %ctx.report_path.display(),
        rows = rows.len(),
        elapsed = ?stats.elapsed,
        "report written"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::{aggregate_order_lines, analyze, build_product_index, department_report};
    use crate::aggregate::DepartmentAggregate;
    use crate::error::AnalyticsError;
    use crate::table::{OrderLineView, ProductCatalogView};

    const CATALOG: &str = "product_id,product_name,aisle_id,department_id\n1,A,1,10\n2,B,1,10\n3,C,1,20\n4,D,2,30\n";
    const ORDERS: &str = "order_id,product_id,add_to_cart_order,reordered\n1,1,1,0\n2,2,1,1\n3,3,1,0\n4,9,1,0\n";

    #[test]
    fn product_index_maps_every_catalog_row() {
        let mut catalog = ProductCatalogView::open(CATALOG.as_bytes()).unwrap();
        let index = build_product_index(&mut catalog).unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.department_of(3), Some(20));
        assert_eq!(index.department_of(9), None);
    }

    #[test]
    fn join_skips_unknown_products() {
        let mut catalog = ProductCatalogView::open(CATALOG.as_bytes()).unwrap();
        let index = build_product_index(&mut catalog).unwrap();
        let mut aggregate = DepartmentAggregate::new(index.departments());
        let mut orders = OrderLineView::open(ORDERS.as_bytes()).unwrap();

        let stats = aggregate_order_lines(&index, &mut orders, &mut aggregate).unwrap();
        assert_eq!(stats.order_lines, 4);
        assert_eq!(stats.matched, 3);
        assert_eq!(stats.join_misses, 1);

        let dept10 = aggregate.get(10).unwrap();
        assert_eq!((dept10.order_count, dept10.first_order_count), (2, 1));
        let dept30 = aggregate.get(30).unwrap();
        assert_eq!(dept30.order_count, 0);
    }

    #[test]
    fn report_excludes_departments_without_orders() {
        let report = department_report(ORDERS.as_bytes(), CATALOG.as_bytes()).unwrap();
        let ids: Vec<i64> = report.rows.iter().map(|r| r.department_id).collect();
        assert_eq!(ids, vec![10, 20]);
        assert_eq!(report.stats.departments, 3);
        assert_eq!(report.stats.report_rows, 2);
    }

    #[test]
    fn schema_failure_writes_nothing() {
        let bad_orders = "order_id,product_id,reordered\n1,1,0\n";
        let mut out = Vec::new();
        let err = analyze(bad_orders.as_bytes(), CATALOG.as_bytes(), &mut out).unwrap_err();
        assert!(matches!(err, AnalyticsError::Schema { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn trailing_comma_catalog_still_produces_report() {
        let catalog = "product_id,product_name,aisle_id,department_id,,\n1,A,1,10,,\n";
        let mut out = Vec::new();
        analyze(ORDERS.as_bytes(), catalog.as_bytes(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "department_id,number_of_orders,number_of_first_orders,percentage\n10,1,1,1.00\n"
        );
    }

    #[test]
    fn header_only_orders_yield_header_only_report() {
        let orders = "order_id,product_id,add_to_cart_order,reordered\n";
        let mut out = Vec::new();
        analyze(orders.as_bytes(), CATALOG.as_bytes(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "department_id,number_of_orders,number_of_first_orders,percentage\n"
        );
    }
}
