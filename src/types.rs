//! Core record types flowing through the analysis.
//!
//! Views project raw CSV rows into [`ProductDepartment`] and [`OrderLine`]; the aggregate keeps
//! one [`DepartmentCounter`] per department and finally emits [`ReportRow`]s.

use std::collections::HashMap;

use serde::Serialize;

/// One catalog row reduced to the two fields the join needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductDepartment {
    /// Product id.
    pub product_id: i64,
    /// Department the product belongs to.
    pub department_id: i64,
}

/// One order line reduced to the two fields the aggregation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    /// Product id of the line item.
    pub product_id: i64,
    /// `true` iff the raw reorder flag was exactly `"1"`.
    pub reordered: bool,
}

impl OrderLine {
    /// A line is a first purchase when it was not a reorder.
    pub fn is_first_purchase(&self) -> bool {
        !self.reordered
    }
}

/// Product id → department id lookup, fully built before aggregation starts.
///
/// Built by [`crate::pipeline::build_product_index`]; a repeated product id keeps the last
/// department seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDepartmentIndex {
    map: HashMap<i64, i64>,
}

impl ProductDepartmentIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mapping, returning the department previously mapped to `product_id`, if any.
    pub fn insert(&mut self, product_id: i64, department_id: i64) -> Option<i64> {
        self.map.insert(product_id, department_id)
    }

    /// Department for `product_id`, or `None` on a join-miss.
    pub fn department_of(&self, product_id: i64) -> Option<i64> {
        self.map.get(&product_id).copied()
    }

    /// Number of distinct products.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate the department ids referenced by the index (may repeat).
    pub fn departments(&self) -> impl Iterator<Item = i64> + '_ {
        self.map.values().copied()
    }
}

impl FromIterator<ProductDepartment> for ProductDepartmentIndex {
    fn from_iter<I: IntoIterator<Item = ProductDepartment>>(iter: I) -> Self {
        let mut index = Self::new();
        for pd in iter {
            index.insert(pd.product_id, pd.department_id);
        }
        index
    }
}

/// Mutable per-department counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepartmentCounter {
    pub department_id: i64,
    pub order_count: u64,
    pub first_order_count: u64,
}

impl DepartmentCounter {
    /// A zeroed counter for `department_id`.
    pub fn new(department_id: i64) -> Self {
        Self {
            department_id,
            order_count: 0,
            first_order_count: 0,
        }
    }

    /// `first_order_count / order_count` with exactly two fractional digits.
    ///
    /// Returns `None` when there are no orders.
    pub fn percentage(&self) -> Option<String> {
        if self.order_count == 0 {
            return None;
        }
        let ratio = self.first_order_count as f64 / self.order_count as f64;
        Some(format!("{ratio:.2}"))
    }
}

/// One line of the output report.
///
/// Field names double as the report's column names when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub department_id: i64,
    #[serde(rename = "number_of_orders")]
    pub order_count: u64,
    #[serde(rename = "number_of_first_orders")]
    pub first_order_count: u64,
    pub percentage: String,
}
