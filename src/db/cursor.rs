//! Forward-only result cursors.

use crate::error::{CoercionError, DbError, DbResult};
use crate::models::DbValue;
use std::collections::VecDeque;
use uuid::Uuid;

/// The minimal cursor surface the materializer depends on.
///
/// All accessors address the current row; [`ResultCursor::advance`] moves to
/// the next one and must be called before the first row is read.
pub trait ResultCursor {
    /// Number of columns in the result.
    fn field_count(&self) -> usize;

    /// Name of the column at `index`.
    fn field_name(&self, index: usize) -> DbResult<&str>;

    /// Value of the column at `index` in the current row.
    fn value(&self, index: usize) -> DbResult<DbValue>;

    /// Whether the column at `index` in the current row is NULL.
    fn is_null(&self, index: usize) -> DbResult<bool>;

    /// Read the column at `index` as a unique identifier.
    fn get_uuid(&self, index: usize) -> DbResult<Uuid>;

    /// Move to the next row. Returns `false` once the rows are exhausted.
    fn advance(&mut self) -> DbResult<bool>;
}

/// A cursor over rows that have already been fetched from the driver.
#[derive(Debug, Clone, Default)]
pub struct RowCursor {
    columns: Vec<String>,
    pending: VecDeque<Vec<DbValue>>,
    current: Option<Vec<DbValue>>,
}

impl RowCursor {
    /// Create a cursor from column names and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<DbValue>>) -> Self {
        Self {
            columns,
            pending: rows.into(),
            current: None,
        }
    }

    /// Build a single-row cursor from `(column, value)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, DbValue)>,
        S: Into<String>,
    {
        let (columns, row): (Vec<String>, Vec<DbValue>) =
            pairs.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self::new(columns, vec![row])
    }

    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows not yet reached by [`ResultCursor::advance`].
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    fn current_cell(&self, index: usize) -> DbResult<&DbValue> {
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| DbError::invalid_input("Cursor is not positioned on a row"))?;
        row.get(index).ok_or_else(|| {
            DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index,
                row.len()
            ))
        })
    }
}

impl ResultCursor for RowCursor {
    fn field_count(&self) -> usize {
        self.columns.len()
    }

    fn field_name(&self, index: usize) -> DbResult<&str> {
        self.columns.get(index).map(String::as_str).ok_or_else(|| {
            DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index,
                self.columns.len()
            ))
        })
    }

    fn value(&self, index: usize) -> DbResult<DbValue> {
        self.current_cell(index).cloned()
    }

    fn is_null(&self, index: usize) -> DbResult<bool> {
        Ok(self.current_cell(index)?.is_null())
    }

    fn get_uuid(&self, index: usize) -> DbResult<Uuid> {
        let column = self.field_name(index)?.to_string();
        let value = self.current_cell(index)?;
        uuid_from_value(value).map_err(|e| DbError::coercion("uuid", column, e))
    }

    fn advance(&mut self) -> DbResult<bool> {
        self.current = self.pending.pop_front();
        Ok(self.current.is_some())
    }
}

/// Interpret a value as a UUID: native, textual or 16 raw bytes.
pub fn uuid_from_value(value: &DbValue) -> Result<Uuid, CoercionError> {
    match value {
        DbValue::Uuid(u) => Ok(*u),
        DbValue::Text(s) => Uuid::parse_str(s.trim())
            .map_err(|e| CoercionError::incompatible("Uuid", value.type_name(), e.to_string())),
        DbValue::Bytes(b) => Uuid::from_slice(b)
            .map_err(|e| CoercionError::incompatible("Uuid", value.type_name(), e.to_string())),
        other => Err(CoercionError::incompatible(
            "Uuid",
            other.type_name(),
            "not a unique identifier",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_must_advance_before_reading() {
        let cursor = RowCursor::from_pairs([("Name", DbValue::from("Alice"))]);
        assert!(cursor.value(0).is_err());
    }

    #[test]
    fn test_cursor_reads_rows_in_order() {
        let mut cursor = RowCursor::new(
            vec!["Id".into()],
            vec![vec![DbValue::Int(1)], vec![DbValue::Int(2)]],
        );
        assert_eq!(cursor.remaining(), 2);
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.value(0).unwrap(), DbValue::Int(1));
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.value(0).unwrap(), DbValue::Int(2));
        assert!(!cursor.advance().unwrap());
    }

    #[test]
    fn test_cursor_field_metadata() {
        let cursor = RowCursor::from_pairs([
            ("Name", DbValue::from("Alice")),
            ("Age", DbValue::Int(30)),
        ]);
        assert_eq!(cursor.field_count(), 2);
        assert_eq!(cursor.field_name(1).unwrap(), "Age");
        assert!(cursor.field_name(2).is_err());
    }

    #[test]
    fn test_cursor_is_null() {
        let mut cursor = RowCursor::from_pairs([("Age", DbValue::Null)]);
        cursor.advance().unwrap();
        assert!(cursor.is_null(0).unwrap());
    }

    #[test]
    fn test_get_uuid_accepts_text_and_bytes() {
        let id = Uuid::new_v4();
        let mut cursor = RowCursor::from_pairs([
            ("A", DbValue::Text(id.to_string())),
            ("B", DbValue::Bytes(id.as_bytes().to_vec())),
            ("C", DbValue::Int(7)),
        ]);
        cursor.advance().unwrap();
        assert_eq!(cursor.get_uuid(0).unwrap(), id);
        assert_eq!(cursor.get_uuid(1).unwrap(), id);
        assert!(matches!(
            cursor.get_uuid(2),
            Err(DbError::Coercion { .. })
        ));
    }
}
