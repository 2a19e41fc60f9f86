//! Per-department order counters.

use std::collections::BTreeMap;

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::types::{DepartmentCounter, ReportRow};

/// Order and first-order counters keyed by department id.
///
/// The department universe is fixed at construction; incrementing a department outside it is
/// an [`AnalyticsError::UnknownDepartment`]. Counters are kept in ascending numeric id order, so
/// [`Self::summarize`] never has to compare ids as text.
///
/// There is no empty default; an aggregate always starts from a universe or from counters:
///
/// ```compile_fail
/// let _ = purchase_analytics::aggregate::DepartmentAggregate::default();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentAggregate {
    counters: BTreeMap<i64, DepartmentCounter>,
}

impl DepartmentAggregate {
    /// One zeroed counter per department id. Repeated ids collapse into one counter.
    pub fn new<I>(departments: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        let counters = departments
            .into_iter()
            .map(|id| (id, DepartmentCounter::new(id)))
            .collect();
        Self { counters }
    }

    /// Build from pre-supplied counters (e.g. a previously summarized run).
    ///
    /// A later counter for the same department replaces an earlier one.
    pub fn from_counters<I>(counters: I) -> Self
    where
        I: IntoIterator<Item = DepartmentCounter>,
    {
        let counters = counters
            .into_iter()
            .map(|c| (c.department_id, c))
            .collect();
        Self { counters }
    }

    /// Number of departments in the universe.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Current counter for `department_id`.
    pub fn get(&self, department_id: i64) -> Option<&DepartmentCounter> {
        self.counters.get(&department_id)
    }

    /// Department ids in ascending order.
    pub fn departments(&self) -> impl Iterator<Item = i64> + '_ {
        self.counters.keys().copied()
    }

    fn counter_mut(&mut self, department_id: i64) -> AnalyticsResult<&mut DepartmentCounter> {
        self.counters
            .get_mut(&department_id)
            .ok_or(AnalyticsError::UnknownDepartment { department_id })
    }

    /// Count one order for `department_id`.
    pub fn add_order(&mut self, department_id: i64) -> AnalyticsResult<()> {
        self.add_orders(department_id, 1)
    }

    /// Count `count` orders for `department_id`.
    pub fn add_orders(&mut self, department_id: i64, count: u64) -> AnalyticsResult<()> {
        self.counter_mut(department_id)?.order_count += count;
        Ok(())
    }

    /// Count one first order for `department_id`.
    pub fn add_first_order(&mut self, department_id: i64) -> AnalyticsResult<()> {
        self.add_first_orders(department_id, 1)
    }

    /// Count `count` first orders for `department_id`.
    pub fn add_first_orders(&mut self, department_id: i64, count: u64) -> AnalyticsResult<()> {
        self.counter_mut(department_id)?.first_order_count += count;
        Ok(())
    }

    /// Report rows for every department with at least one order, ascending by id.
    ///
    /// Counters are left untouched, so calling this again yields the same rows.
    pub fn summarize(&self) -> Vec<ReportRow> {
        self.counters
            .values()
            .filter_map(|c| {
                c.percentage().map(|percentage| ReportRow {
                    department_id: c.department_id,
                    order_count: c.order_count,
                    first_order_count: c.first_order_count,
                    percentage,
                })
            })
            .collect()
    }

    /// Consume the aggregate into its final report rows.
    pub fn into_report(self) -> Vec<ReportRow> {
        self.summarize()
    }
}
