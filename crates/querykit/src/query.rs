//! The query descriptor: one mutable, chainable value per statement.

use std::sync::Arc;

use crate::binding::{Bindings, NameSource};
use crate::client::{Connection, Database, Outcome, Row};
use crate::error::{Failure, QueryError, QueryResult};
use crate::render::{Dialect, MySql, Statement};
use crate::value::{Arg, Value};

/// Statement kind. Fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Select,
    Count,
    Insert,
    InsertIgnore,
    Update,
    Delete,
    Verbatim,
}

/// LIMIT clause: a bare row count or an `offset, count` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Limit {
    Count(u64),
    OffsetCount { offset: u64, count: u64 },
}

/// One JOIN clause: kind, joined table, ON expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Join {
    pub kind: String,
    pub table: String,
    pub on: String,
}

/// A statement being built.
///
/// Configuration calls consume and return the descriptor so they chain;
/// single-valued fields are last-write-wins, multi-valued fields append.
/// Values passed to `set` / `values` / `against` are bound to generated
/// placeholders immediately, so rendering is deterministic and repeatable.
///
/// ```ignore
/// let entries = querykit::select("entries")
///     .columns(&["id", "title"])
///     .predicate_with("author = :author", [(":author", "alice")].into_iter().collect())
///     .order_by("id", "desc")
///     .limit(20);
/// let stmt = entries.render();
/// ```
#[derive(Clone)]
pub struct Query {
    pub(crate) kind: Kind,
    pub(crate) table: String,
    pub(crate) columns: Vec<String>,
    pub(crate) predicate: Option<String>,
    pub(crate) match_token: Option<String>,
    pub(crate) order: Option<(String, String)>,
    pub(crate) limit: Option<Limit>,
    pub(crate) joins: Vec<Join>,
    pub(crate) assignments: Vec<(String, String)>,
    pub(crate) rows: Vec<Vec<String>>,
    pub(crate) unions: Vec<Query>,
    pub(crate) delayed: bool,
    pub(crate) ignore: bool,
    pub(crate) bindings: Bindings,
    pub(crate) raw_sql: String,
    names: NameSource,
    dialect: Arc<dyn Dialect>,
    failure: Option<Failure>,
    outcome: Option<Outcome>,
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("kind", &self.kind)
            .field("table", &self.table)
            .field("dialect", &self.dialect.name())
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

impl Query {
    /// Create a descriptor of the given kind targeting `table`.
    ///
    /// The rendering dialect defaults to MySQL.
    pub fn new(kind: Kind, table: &str) -> Self {
        Self {
            kind,
            table: table.to_string(),
            columns: Vec::new(),
            predicate: None,
            match_token: None,
            order: None,
            limit: None,
            joins: Vec::new(),
            assignments: Vec::new(),
            rows: Vec::new(),
            unions: Vec::new(),
            delayed: false,
            ignore: false,
            bindings: Bindings::new(),
            raw_sql: String::new(),
            names: NameSource::Entropy,
            dialect: Arc::new(MySql),
            failure: None,
            outcome: None,
        }
    }

    /// Create a verbatim descriptor; `raw_sql` bypasses every other field.
    pub fn verbatim(raw_sql: &str) -> Self {
        let mut query = Self::new(Kind::Verbatim, "");
        query.raw_sql = raw_sql.to_string();
        query
    }

    /// Select a different rendering dialect.
    pub fn with_dialect(mut self, dialect: Arc<dyn Dialect>) -> Self {
        self.dialect = dialect;
        self
    }

    /// Switch generated placeholder names to a deterministic sequence
    /// (`:p1`, `:p2`, …). Call before binding any values; intended for
    /// golden-output assertions.
    pub fn with_sequential_placeholders(mut self) -> Self {
        self.names = NameSource::Sequence(0);
        self
    }

    /// Statement kind.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Rendering dialect tag (e.g. `"mysql"`).
    pub fn driver(&self) -> &'static str {
        self.dialect.name()
    }

    /// Current bindings, in insertion order.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    // ==================== Projection / insert columns ====================

    /// Set the column list (last-write-wins). Empty means `*` for
    /// SELECT/COUNT.
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Append one column.
    pub fn add_column(mut self, column: &str) -> Self {
        self.columns.push(column.to_string());
        self
    }

    // ==================== Predicate ====================

    /// Set the WHERE body (last-write-wins) without binding anything.
    pub fn predicate(mut self, expr: &str) -> Self {
        self.predicate = Some(expr.to_string());
        self
    }

    /// Set the WHERE body and merge its named parameters into the binding
    /// set. Existing bindings win on key collision.
    pub fn predicate_with(mut self, expr: &str, params: Bindings) -> Self {
        for (name, value) in params.iter() {
            self.bindings.insert_missing(name, value.clone());
        }
        self.predicate = Some(expr.to_string());
        self
    }

    /// Configure a full-text search: binds `value` to a generated
    /// placeholder used in the AGAINST clause.
    ///
    /// Legacy surface: when a match is active, the predicate text is
    /// rendered as the MATCH column list rather than as a boolean
    /// expression.
    pub fn against(mut self, value: impl Into<Value>) -> Self {
        let token = self.bind(value.into());
        self.match_token = Some(token);
        self
    }

    // ==================== SET assignments (UPDATE) ====================

    /// Assign a column through a generated placeholder.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        let token = self.bind(value.into());
        self.assignments.push((column.to_string(), token));
        self
    }

    /// Assign a column a raw SQL expression, spliced verbatim.
    pub fn set_literal(mut self, column: &str, expr: &str) -> Self {
        self.assignments
            .push((column.to_string(), expr.to_string()));
        self
    }

    /// Assign a column a JSON-serialized value.
    pub fn set_json<T: serde::Serialize>(self, column: &str, value: &T) -> QueryResult<Self> {
        let json = serde_json::to_value(value)?;
        Ok(self.set(column, Value::Json(json)))
    }

    // ==================== Row values (INSERT) ====================

    /// Append one VALUES row; every cell is bound to a generated
    /// placeholder.
    pub fn values<V: Into<Value>>(mut self, row: Vec<V>) -> Self {
        let tokens: Vec<String> = row.into_iter().map(|cell| self.bind(cell.into())).collect();
        self.rows.push(tokens);
        self
    }

    /// Append one VALUES row of mixed bound values and raw literals.
    pub fn values_args(mut self, row: Vec<Arg>) -> Self {
        let tokens: Vec<String> = row
            .into_iter()
            .map(|cell| match cell {
                Arg::Bind(value) => self.bind(value),
                Arg::Literal(expr) => expr,
            })
            .collect();
        self.rows.push(tokens);
        self
    }

    // ==================== Joins ====================

    /// Append a JOIN clause; the kind is rendered upper-case.
    pub fn join(mut self, kind: &str, table: &str, on: &str) -> Self {
        self.joins.push(Join {
            kind: kind.to_string(),
            table: table.to_string(),
            on: on.to_string(),
        });
        self
    }

    /// Append an INNER JOIN.
    pub fn inner_join(self, table: &str, on: &str) -> Self {
        self.join("inner", table, on)
    }

    /// Append a LEFT JOIN.
    pub fn left_join(self, table: &str, on: &str) -> Self {
        self.join("left", table, on)
    }

    // ==================== Ordering & limits ====================

    /// Set the ordering pair; direction is case-insensitive on input and
    /// rendered upper-case.
    pub fn order_by(mut self, column: &str, direction: &str) -> Self {
        self.order = Some((column.to_string(), direction.to_string()));
        self
    }

    /// Set a bare row-count LIMIT.
    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(Limit::Count(count));
        self
    }

    /// Set an `offset, count` LIMIT pair.
    pub fn limit_offset(mut self, offset: u64, count: u64) -> Self {
        self.limit = Some(Limit::OffsetCount { offset, count });
        self
    }

    // ==================== Sub-selects & modifiers ====================

    /// Append a nested SELECT to be UNIONed as this INSERT's value source.
    /// Sub-select bindings are merged at render time, not here.
    pub fn add_union(mut self, select: Query) -> Self {
        self.unions.push(select);
        self
    }

    /// Render the write as deferred (`INSERT DELAYED`).
    pub fn delayed(mut self) -> Self {
        self.delayed = true;
        self
    }

    /// Suppress duplicate-key errors (`INSERT IGNORE`).
    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    // ==================== Rendering ====================

    /// Render into an immutable `(sql, bindings)` statement.
    pub fn render(&self) -> Statement {
        self.dialect.render(self)
    }

    /// The rendered SQL text (for debugging).
    pub fn to_sql(&self) -> String {
        self.render().sql
    }

    // ==================== Execution ====================

    /// Render and submit this statement through `db`.
    ///
    /// Fails with [`QueryError::NoConnection`] before any SQL is sent when
    /// the database handle was never established. Prepare and execution
    /// failures are recorded on the descriptor (see
    /// [`Query::failed_because`]) and returned. Re-invoking re-renders and
    /// re-submits; nothing is cached.
    ///
    /// Returns the row count for row-returning statements, otherwise the
    /// affected-row count.
    pub async fn execute<C: Connection>(&mut self, db: &mut Database<C>) -> QueryResult<u64> {
        self.failure = None;
        self.outcome = None;

        let statement = self.render();
        let Some(conn) = db.connection() else {
            self.failure = Some(Failure::message("no connection established"));
            return Err(QueryError::NoConnection);
        };

        tracing::debug!(
            sql = %statement.sql,
            bindings = statement.bindings.len(),
            "executing statement"
        );

        let prepared = match conn.prepare(&statement.sql).await {
            Ok(prepared) => prepared,
            Err(failure) => {
                self.failure = Some(failure.clone());
                return Err(QueryError::Prepare(failure));
            }
        };

        match conn.run(&prepared, &statement.bindings).await {
            Ok(outcome) => {
                let count = outcome.count();
                self.outcome = Some(outcome);
                Ok(count)
            }
            Err(failure) => {
                self.failure = Some(failure.clone());
                Err(QueryError::Execution(failure))
            }
        }
    }

    /// All rows produced by the last successful execution.
    pub fn fetch(&self) -> QueryResult<&[Row]> {
        match &self.outcome {
            Some(outcome) => Ok(outcome.rows()),
            None => Err(QueryError::NoResult("fetch before a successful execute")),
        }
    }

    /// Row count of the last execution (returned rows, or affected rows
    /// for mutations). Zero before any execution.
    pub fn count(&self) -> u64 {
        self.outcome.as_ref().map(Outcome::count).unwrap_or(0)
    }

    /// Last auto-generated id from the connection; meaningful after an
    /// INSERT-kind execution.
    pub fn last_id(&self) -> Option<u64> {
        self.outcome.as_ref().and_then(Outcome::last_insert_id)
    }

    /// The recorded failure of the last render/execute, if any.
    pub fn failed_because(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Bind a value to a freshly generated placeholder and return the
    /// token for inline use.
    fn bind(&mut self, value: Value) -> String {
        let token = self.names.next_name();
        self.bindings.insert(&token, value);
        token
    }
}
