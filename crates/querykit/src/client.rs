//! The connection contract consumed by the execution façade.

use crate::binding::Bindings;
use crate::error::{Failure, QueryError, QueryResult};
use crate::value::Value;

/// One result row as an ordered column-name → value mapping.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Build a row from `(column, value)` pairs in result order.
    pub fn from_pairs(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    /// Value of a named column.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, value)| value)
    }

    /// Column names in result order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(col, _)| col.as_str())
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check for a columnless row.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// What one execution produced: materialized rows plus the driver's
/// affected-row count and last auto-generated id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outcome {
    rows: Vec<Row>,
    affected: u64,
    last_insert_id: Option<u64>,
}

impl Outcome {
    /// Build an outcome from the driver's raw results.
    pub fn new(rows: Vec<Row>, affected: u64, last_insert_id: Option<u64>) -> Self {
        Self {
            rows,
            affected,
            last_insert_id,
        }
    }

    /// All returned rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Rows returned for row-returning statements, otherwise the
    /// affected-row count.
    pub fn count(&self) -> u64 {
        if self.rows.is_empty() {
            self.affected
        } else {
            self.rows.len() as u64
        }
    }

    /// Last auto-generated id, when the driver reported one.
    pub fn last_insert_id(&self) -> Option<u64> {
        self.last_insert_id
    }
}

/// A live driver handle.
///
/// Implementations own exactly one underlying connection; the façade
/// assumes at most one in-flight statement per handle and implements no
/// pooling or queuing. Errors are reported as raw [`Failure`] detail and
/// also retained for [`Connection::last_error`].
pub trait Connection: Send {
    /// Driver-prepared statement handle.
    type Prepared: Send + Sync;

    /// Driver tag (e.g. `"mysql"`).
    fn driver_name(&self) -> &str;

    /// Prepare a statement on this handle.
    fn prepare(
        &mut self,
        sql: &str,
    ) -> impl std::future::Future<Output = Result<Self::Prepared, Failure>> + Send;

    /// Bind parameters and submit a prepared statement.
    fn run(
        &mut self,
        prepared: &Self::Prepared,
        bindings: &Bindings,
    ) -> impl std::future::Future<Output = Result<Outcome, Failure>> + Send;

    /// The most recent failure reported by this handle.
    fn last_error(&self) -> Option<&Failure>;

    /// Open a transaction on this handle.
    fn begin(&mut self) -> impl std::future::Future<Output = Result<(), Failure>> + Send;

    /// Commit the open transaction.
    fn commit(&mut self) -> impl std::future::Future<Output = Result<(), Failure>> + Send;

    /// Roll back the open transaction.
    fn rollback(&mut self) -> impl std::future::Future<Output = Result<(), Failure>> + Send;
}

/// Holder for an optionally-established connection handle.
///
/// Executing a query against a disconnected database fails immediately
/// with the no-connection condition, before any SQL is rendered to the
/// wire. Every descriptor takes the database explicitly; there is no
/// ambient global handle.
#[derive(Debug, Default)]
pub struct Database<C> {
    conn: Option<C>,
}

impl<C: Connection> Database<C> {
    /// Wrap an established connection.
    pub fn new(conn: C) -> Self {
        Self { conn: Some(conn) }
    }

    /// A database with no connection; every execution against it fails
    /// with [`QueryError::NoConnection`].
    pub fn disconnected() -> Self {
        Self { conn: None }
    }

    /// Whether a connection has been established.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Driver tag; defaults to `"mysql"` when disconnected.
    pub fn driver_name(&self) -> &str {
        self.conn
            .as_ref()
            .map(Connection::driver_name)
            .unwrap_or("mysql")
    }

    /// Mutable access to the underlying handle, if established.
    pub fn connection(&mut self) -> Option<&mut C> {
        self.conn.as_mut()
    }

    /// Drop the handle, returning it to the caller.
    pub fn take(&mut self) -> Option<C> {
        self.conn.take()
    }

    /// Open a transaction.
    pub async fn begin(&mut self) -> QueryResult<()> {
        let conn = self.conn.as_mut().ok_or(QueryError::NoConnection)?;
        conn.begin().await.map_err(QueryError::Execution)
    }

    /// Commit the open transaction.
    pub async fn commit(&mut self) -> QueryResult<()> {
        let conn = self.conn.as_mut().ok_or(QueryError::NoConnection)?;
        conn.commit().await.map_err(QueryError::Execution)
    }

    /// Roll back the open transaction.
    pub async fn rollback(&mut self) -> QueryResult<()> {
        let conn = self.conn.as_mut().ok_or(QueryError::NoConnection)?;
        conn.rollback().await.map_err(QueryError::Execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_lookup() {
        let row = Row::from_pairs(vec![
            ("id".to_string(), Value::Int(1)),
            ("name".to_string(), Value::Text("a".to_string())),
        ]);
        assert_eq!(row.get("id"), Some(&Value::Int(1)));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["id", "name"]);
    }

    #[test]
    fn outcome_count_prefers_rows() {
        let with_rows = Outcome::new(vec![Row::default(), Row::default()], 9, None);
        assert_eq!(with_rows.count(), 2);
        let mutation = Outcome::new(vec![], 3, Some(42));
        assert_eq!(mutation.count(), 3);
        assert_eq!(mutation.last_insert_id(), Some(42));
    }
}
