//! Schema-checked CSV row streaming.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::error::{AnalyticsError, AnalyticsResult};

/// Ordered header names plus a name → column index map.
///
/// Fixed when a table is opened and never mutated afterwards. A repeated name resolves to its
/// last position; repeats are only an error when a required column is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
    repeated: Vec<String>,
}

impl HeaderIndex {
    /// Build an index from a header row.
    ///
    /// Fails with [`AnalyticsError::Schema`] if the row is empty or every name is blank.
    pub fn new<I, S>(names: I) -> AnalyticsResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        if let Some(first) = names.first_mut() {
            if let Some(stripped) = first.strip_prefix('\u{feff}') {
                *first = stripped.to_owned();
            }
        }

        if names.iter().all(|n| n.is_empty()) {
            return Err(AnalyticsError::schema("headers cannot be empty"));
        }

        let mut positions = HashMap::with_capacity(names.len());
        let mut repeated = Vec::new();
        for (idx, name) in names.iter().enumerate() {
            if positions.insert(name.clone(), idx).is_some() && !repeated.contains(name) {
                repeated.push(name.clone());
            }
        }

        Ok(Self {
            names,
            positions,
            repeated,
        })
    }

    fn from_record(record: &StringRecord) -> AnalyticsResult<Self> {
        Self::new(record.iter())
    }

    /// Column index of `name`, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Header names in source order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names that occur more than once in the header row.
    pub fn repeated(&self) -> &[String] {
        &self.repeated
    }

    /// Check that every name in `required` is present exactly once.
    ///
    /// The error enumerates both the missing names and the full required set.
    pub fn require(&self, required: &[&str]) -> AnalyticsResult<()> {
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| !self.positions.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(AnalyticsError::schema(format!(
                "missing required column(s) {}; headers must include {}. headers={:?}",
                quoted(&missing),
                required.join(", "),
                self.names
            )));
        }

        let ambiguous: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| self.repeated.iter().any(|r| r == name))
            .collect();
        if !ambiguous.is_empty() {
            return Err(AnalyticsError::schema(format!(
                "required column(s) {} appear more than once. headers={:?}",
                quoted(&ambiguous),
                self.names
            )));
        }

        Ok(())
    }
}

fn quoted(names: &[&str]) -> String {
    names
        .iter()
        .map(|n| format!("'{n}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One data row as read from the source.
///
/// A row may be wider than the header (extra trailing fields are ignored) or narrower; accessing
/// a column past its width is a lookup error for that access only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    record: StringRecord,
    line: u64,
}

impl Row {
    fn from_record(record: StringRecord) -> Self {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        Self { record, line }
    }

    /// 1-based line number in the source.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Number of fields in this row.
    pub fn len(&self) -> usize {
        self.record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }

    /// Raw field at `idx`, if the row is wide enough.
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.record.get(idx)
    }

    /// Iterate raw fields in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.record.iter()
    }

    /// Raw field at `idx`, where `column` names it for error reporting.
    pub fn require(&self, idx: usize, column: &str) -> AnalyticsResult<&str> {
        self.record.get(idx).ok_or_else(|| AnalyticsError::Lookup {
            line: self.line,
            column: column.to_owned(),
            message: format!(
                "is at index {idx} but the row has only {} field(s)",
                self.record.len()
            ),
        })
    }

    /// Raw field for the named column.
    pub fn field<'r>(&'r self, headers: &HeaderIndex, column: &str) -> AnalyticsResult<&'r str> {
        let idx = headers.index_of(column).ok_or_else(|| AnalyticsError::Lookup {
            line: self.line,
            column: column.to_owned(),
            message: "is not in the header row".to_string(),
        })?;
        self.require(idx, column)
    }

    /// Parse the field at `idx` as an integer id (surrounding whitespace ignored).
    pub fn parse_i64(&self, idx: usize, column: &str) -> AnalyticsResult<i64> {
        let raw = self.require(idx, column)?;
        raw.trim().parse::<i64>().map_err(|e| AnalyticsError::Parse {
            line: self.line,
            column: column.to_owned(),
            raw: raw.to_owned(),
            message: e.to_string(),
        })
    }
}

/// Name-keyed projection of a [`Row`].
///
/// Only the columns present in the row are included; a missing key is a lookup error, never a
/// default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictRow {
    values: HashMap<String, String>,
    line: u64,
}

impl DictRow {
    fn project(headers: &HeaderIndex, row: &Row) -> Self {
        let values = headers
            .names()
            .iter()
            .zip(row.iter())
            .map(|(name, value)| (name.clone(), value.to_owned()))
            .collect();
        Self {
            values,
            line: row.line(),
        }
    }

    /// Value for `column`.
    pub fn get(&self, column: &str) -> AnalyticsResult<&str> {
        self.values
            .get(column)
            .map(String::as_str)
            .ok_or_else(|| AnalyticsError::Lookup {
                line: self.line,
                column: column.to_owned(),
                message: "is not present in this row".to_string(),
            })
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// Number of columns present.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 1-based line number in the source.
    pub fn line(&self) -> u64 {
        self.line
    }
}

/// A row stream bound to a validated header set.
///
/// Rows are read lazily from the underlying source, exactly once. Every traversal method
/// continues from where the previous one stopped, so once the source is exhausted any further
/// traversal yields nothing.
#[derive(Debug)]
pub struct SchemaTable<R> {
    reader: csv::Reader<R>,
    headers: HeaderIndex,
}

impl SchemaTable<File> {
    /// Open a CSV file and validate its header row against `required`.
    pub fn from_path(path: impl AsRef<Path>, required: &[&str]) -> AnalyticsResult<Self> {
        Self::open(File::open(path)?, required)
    }
}

impl<R: Read> SchemaTable<R> {
    /// Read the header row from `source` and validate it against `required`.
    ///
    /// No data row is read before validation succeeds. An empty `required` accepts any
    /// non-empty header row.
    pub fn open(source: R, required: &[&str]) -> AnalyticsResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(source);
        let headers = HeaderIndex::from_record(reader.headers()?)?;
        headers.require(required)?;
        Ok(Self { reader, headers })
    }

    /// Header set of this table.
    pub fn headers(&self) -> &HeaderIndex {
        &self.headers
    }

    /// Stream raw rows in source order.
    pub fn rows(&mut self) -> impl Iterator<Item = AnalyticsResult<Row>> + '_ {
        self.reader
            .records()
            .map(|result| -> AnalyticsResult<Row> { Ok(Row::from_record(result?)) })
    }

    /// Stream name-keyed projections of each row.
    pub fn dict_rows(&mut self) -> impl Iterator<Item = AnalyticsResult<DictRow>> + '_ {
        self.project(|headers, row| Ok(DictRow::project(headers, row)))
    }

    /// Stream rows through a caller-supplied projection.
    ///
    /// The projection sees the header index and each row; its errors are yielded in place of
    /// that row's value.
    pub fn project<'a, T, F>(&'a mut self, mut f: F) -> impl Iterator<Item = AnalyticsResult<T>> + 'a
    where
        F: FnMut(&HeaderIndex, &Row) -> AnalyticsResult<T> + 'a,
        T: 'a,
    {
        let headers = &self.headers;
        self.reader.records().map(move |result| -> AnalyticsResult<T> {
            let row = Row::from_record(result?);
            f(headers, &row)
        })
    }

    /// Resolve the column index of `name` or fail with a schema error.
    pub(crate) fn column(&self, name: &str) -> AnalyticsResult<usize> {
        self.headers.index_of(name).ok_or_else(|| {
            AnalyticsError::schema(format!(
                "missing required column '{name}'. headers={:?}",
                self.headers.names()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{HeaderIndex, SchemaTable};
    use crate::error::AnalyticsError;

    fn open<'a>(input: &'a str, required: &[&str]) -> SchemaTable<&'a [u8]> {
        SchemaTable::open(input.as_bytes(), required).unwrap()
    }

    #[test]
    fn header_index_maps_names_to_positions() {
        let idx = HeaderIndex::new(["a", "b", "c"]).unwrap();
        assert_eq!(idx.index_of("a"), Some(0));
        assert_eq!(idx.index_of("c"), Some(2));
        assert_eq!(idx.index_of("missing"), None);
        assert_eq!(idx.len(), 3);
    }

    #[test]
    fn header_index_strips_byte_order_mark() {
        let idx = HeaderIndex::new(["\u{feff}order_id", "product_id"]).unwrap();
        assert_eq!(idx.index_of("order_id"), Some(0));
    }

    #[test]
    fn header_index_rejects_empty_names() {
        let empty: [&str; 0] = [];
        let err = HeaderIndex::new(empty).unwrap_err();
        assert!(err.to_string().contains("headers cannot be empty"));

        let err = HeaderIndex::new(["", ""]).unwrap_err();
        assert!(matches!(err, AnalyticsError::Schema { .. }));
    }

    #[test]
    fn repeated_optional_names_resolve_to_last_position() {
        let idx = HeaderIndex::new(["a", "", "b", "", "a"]).unwrap();
        assert_eq!(idx.index_of("a"), Some(4));
        assert_eq!(idx.index_of(""), Some(3));
        assert_eq!(idx.repeated(), [String::new(), "a".to_string()]);
        assert!(idx.require(&["b"]).is_ok());
    }

    #[test]
    fn repeated_required_name_is_a_schema_error() {
        let idx = HeaderIndex::new(["a", "b", "a"]).unwrap();
        let err = idx.require(&["a", "b"]).unwrap_err();
        assert!(matches!(err, AnalyticsError::Schema { .. }));
        assert!(err.to_string().contains("required column(s) 'a' appear more than once"));
    }

    #[test]
    fn trailing_comma_header_still_opens() {
        let mut table = open("a,b,,\n1,2,,\n", &["a", "b"]);
        let row = table.dict_rows().next().unwrap().unwrap();
        assert_eq!(row.get("b").unwrap(), "2");
        assert_eq!(row.get("").unwrap(), "");
    }

    #[test]
    fn require_lists_missing_and_required_names() {
        let idx = HeaderIndex::new(["order_id", "product_id"]).unwrap();
        let err = idx
            .require(&["order_id", "product_id", "add_to_cart_order", "reordered"])
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'add_to_cart_order', 'reordered'"));
        assert!(msg.contains("headers must include order_id, product_id, add_to_cart_order, reordered"));
    }

    #[test]
    fn open_rejects_empty_source_even_without_requirements() {
        let err = SchemaTable::open("".as_bytes(), &[]).unwrap_err();
        assert!(matches!(err, AnalyticsError::Schema { .. }));
    }

    #[test]
    fn rows_stream_once_in_source_order() {
        let mut table = open("a,b\n1,2\n3,4\n", &["a"]);
        let rows: Vec<_> = table.rows().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(0), Some("1"));
        assert_eq!(rows[1].get(1), Some("4"));
        assert_eq!(rows[1].line(), 3);

        assert_eq!(table.rows().count(), 0);
        assert_eq!(table.dict_rows().count(), 0);
    }

    #[test]
    fn dict_rows_only_contain_present_columns() {
        let mut table = open("header1,header2\n1,2\n3\n", &[]);
        let rows: Vec<_> = table.dict_rows().map(|r| r.unwrap()).collect();

        assert_eq!(rows[0].get("header2").unwrap(), "2");
        assert_eq!(rows[1].get("header1").unwrap(), "3");
        assert_eq!(rows[1].len(), 1);

        let err = rows[1].get("header2").unwrap_err();
        assert!(matches!(err, AnalyticsError::Lookup { line: 3, .. }));
    }

    #[test]
    fn wide_rows_ignore_extra_fields() {
        let mut table = open("a,b\n1,2,3,4\n", &["a", "b"]);
        let row = table.dict_rows().next().unwrap().unwrap();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("b").unwrap(), "2");
    }

    #[test]
    fn field_lookup_reports_unknown_and_short_columns() {
        let mut table = open("a,b\n1\n", &[]);
        let headers = table.headers().clone();
        let row = table.rows().next().unwrap().unwrap();

        assert_eq!(row.field(&headers, "a").unwrap(), "1");
        assert!(matches!(
            row.field(&headers, "b"),
            Err(AnalyticsError::Lookup { .. })
        ));
        assert!(matches!(
            row.field(&headers, "zzz"),
            Err(AnalyticsError::Lookup { .. })
        ));
    }

    #[test]
    fn parse_i64_trims_and_reports_bad_values() {
        let mut table = open("id\n 42 \nabc\n", &["id"]);
        let rows: Vec<_> = table.rows().map(|r| r.unwrap()).collect();
        assert_eq!(rows[0].parse_i64(0, "id").unwrap(), 42);

        let err = rows[1].parse_i64(0, "id").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("failed to parse value at line 3"));
        assert!(msg.contains("column 'id'"));
    }

    #[test]
    fn project_applies_projection_per_row() {
        let mut table = open("x,y\n1,2\n5,6\n", &["x", "y"]);
        let sums: Vec<i64> = table
            .project(|headers, row| {
                let x = row.parse_i64(headers.index_of("x").unwrap_or(0), "x")?;
                let y = row.parse_i64(headers.index_of("y").unwrap_or(1), "y")?;
                Ok(x + y)
            })
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(sums, vec![3, 11]);
    }
}
