//! Typed views over the two input tables.
//!
//! Each view declares the columns its source must carry, resolves the indexes it reads once at
//! open time, and projects rows straight into a small record instead of a name-keyed map.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::AnalyticsResult;
use crate::types::{OrderLine, ProductDepartment};

use super::schema_table::SchemaTable;

/// Raw value of the `reordered` column that marks a reorder.
pub const REORDERED_FLAG: &str = "1";

/// Columns a catalog must carry; only `product_id` and `department_id` are read.
pub const CATALOG_HEADERS: [&str; 4] = ["product_id", "product_name", "aisle_id", "department_id"];

/// Columns an order-line source must carry; only `product_id` and `reordered` are read.
pub const ORDER_LINE_HEADERS: [&str; 4] = ["order_id", "product_id", "add_to_cart_order", "reordered"];

/// Product catalog: product → department mapping.
#[derive(Debug)]
pub struct ProductCatalogView<R> {
    table: SchemaTable<R>,
    product_id: usize,
    department_id: usize,
}

impl ProductCatalogView<File> {
    /// Open a catalog CSV file.
    pub fn from_path(path: impl AsRef<Path>) -> AnalyticsResult<Self> {
        Self::open(File::open(path)?)
    }
}

impl<R: Read> ProductCatalogView<R> {
    /// Validate the header row of `source` and prepare to stream catalog rows.
    pub fn open(source: R) -> AnalyticsResult<Self> {
        let table = SchemaTable::open(source, &CATALOG_HEADERS)?;
        let product_id = table.column("product_id")?;
        let department_id = table.column("department_id")?;
        Ok(Self {
            table,
            product_id,
            department_id,
        })
    }

    /// Stream `(product_id, department_id)` pairs in source order.
    pub fn records(&mut self) -> impl Iterator<Item = AnalyticsResult<ProductDepartment>> + '_ {
        let (product_id, department_id) = (self.product_id, self.department_id);
        self.table.project(move |_, row| {
            Ok(ProductDepartment {
                product_id: row.parse_i64(product_id, "product_id")?,
                department_id: row.parse_i64(department_id, "department_id")?,
            })
        })
    }

    /// Access the underlying table, e.g. for full name-keyed rows.
    pub fn table_mut(&mut self) -> &mut SchemaTable<R> {
        &mut self.table
    }
}

/// Order lines: one row per product in an order.
///
/// This is the large input, so rows are projected to two fields and never collected.
#[derive(Debug)]
pub struct OrderLineView<R> {
    table: SchemaTable<R>,
    product_id: usize,
    reordered: usize,
}

impl OrderLineView<File> {
    /// Open an order-line CSV file.
    pub fn from_path(path: impl AsRef<Path>) -> AnalyticsResult<Self> {
        Self::open(File::open(path)?)
    }
}

impl<R: Read> OrderLineView<R> {
    /// Validate the header row of `source` and prepare to stream order lines.
    pub fn open(source: R) -> AnalyticsResult<Self> {
        let table = SchemaTable::open(source, &ORDER_LINE_HEADERS)?;
        let product_id = table.column("product_id")?;
        let reordered = table.column("reordered")?;
        Ok(Self {
            table,
            product_id,
            reordered,
        })
    }

    /// Stream `(product_id, reordered)` pairs in source order.
    ///
    /// `reordered` is `true` only for the exact text `"1"`; `"0"`, an empty value or anything
    /// else counts as a first purchase.
    pub fn records(&mut self) -> impl Iterator<Item = AnalyticsResult<OrderLine>> + '_ {
        let (product_id, reordered) = (self.product_id, self.reordered);
        self.table.project(move |_, row| {
            Ok(OrderLine {
                product_id: row.parse_i64(product_id, "product_id")?,
                reordered: row.require(reordered, "reordered")? == REORDERED_FLAG,
            })
        })
    }

    pub fn table_mut(&mut self) -> &mut SchemaTable<R> {
        &mut self.table
    }
}
