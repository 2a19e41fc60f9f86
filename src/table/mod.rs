//! Schema-validated CSV tables.
//!
//! [`SchemaTable`] reads a header row, checks it against a set of required column names and then
//! streams data rows lazily. Rows can be consumed raw ([`SchemaTable::rows`]), as name-keyed maps
//! ([`SchemaTable::dict_rows`]) or through a projection function ([`SchemaTable::project`]).
//!
//! The typed views in [`views`] are thin wrappers that fix the required columns and the
//! projection for each input of the analysis.
//!
//! ```rust
//! use purchase_analytics::table::SchemaTable;
//!
//! let input = "order_id,product_id\n1,42\n";
//! let mut table = SchemaTable::open(input.as_bytes(), &["product_id"]).unwrap();
//! let row = table.dict_rows().next().unwrap().unwrap();
//! assert_eq!(row.get("product_id").unwrap(), "42");
//! ```

mod schema_table;
pub mod views;

pub use schema_table::{DictRow, HeaderIndex, Row, SchemaTable};
pub use views::{
    CATALOG_HEADERS, ORDER_LINE_HEADERS, OrderLineView, ProductCatalogView, REORDERED_FLAG,
};
