//! # querykit
//!
//! A chainable MySQL statement builder with named-parameter bindings.
//!
//! ## Features
//!
//! - **One descriptor per statement**: chainable configuration calls build
//!   a [`Query`], rendering produces an immutable `(sql, bindings)`
//!   [`Statement`]
//! - **Collision-free placeholders**: values bound through `set`/`values`/
//!   `against` get generated `:name` tokens that cannot clash with
//!   caller-written placeholders
//! - **Compositional sub-selects**: nested SELECTs UNIONed as an INSERT's
//!   value source, with their bindings merged at render time
//! - **Pluggable dialects**: rendering dispatches through the [`Dialect`]
//!   trait, selected at descriptor construction
//! - **Explicit connections**: execution takes a [`Database`] handle; no
//!   ambient global connection
//!
//! ## Usage
//!
//! ```ignore
//! use querykit::{select, insert, ConnectOptions, Database, MySqlConnection};
//!
//! let mut db = Database::new(
//!     MySqlConnection::establish(&ConnectOptions::new("localhost", "app", "secret", "blog"))
//!         .await?,
//! );
//!
//! let mut entries = select("entries")
//!     .columns(&["id", "title"])
//!     .predicate_with("author = :author", [(":author", "alice")].into_iter().collect())
//!     .order_by("id", "desc")
//!     .limit(20);
//! entries.execute(&mut db).await?;
//! for row in entries.fetch()? {
//!     // ...
//! }
//!
//! let mut log = insert("audit_log")
//!     .columns(&["actor", "at"])
//!     .values_args(vec![querykit::Arg::bind("alice"), querykit::Arg::literal("NOW()")]);
//! log.execute(&mut db).await?;
//! let id = log.last_id();
//! ```

pub mod binding;
pub mod client;
pub mod error;
pub mod mysql;
pub mod query;
pub mod render;
pub mod value;

pub use binding::{Bindings, NameSource};
pub use client::{Connection, Database, Outcome, Row};
pub use error::{ConnectError, Failure, QueryError, QueryResult};
pub use mysql::{ConnectOptions, MySqlConnection};
pub use query::{Join, Kind, Limit, Query};
pub use render::{Dialect, MySql, Statement};
pub use value::{Arg, Value};

/// Create a SELECT descriptor for the given table.
pub fn select(table: &str) -> Query {
    Query::new(Kind::Select, table)
}

/// Create a COUNT descriptor for the given table.
///
/// Renders as `SELECT COUNT(<projection>) FROM …`.
pub fn count(table: &str) -> Query {
    Query::new(Kind::Count, table)
}

/// Create an INSERT descriptor for the given table.
pub fn insert(table: &str) -> Query {
    Query::new(Kind::Insert, table)
}

/// Create an INSERT IGNORE descriptor for the given table.
pub fn insert_ignore(table: &str) -> Query {
    Query::new(Kind::InsertIgnore, table)
}

/// Create an UPDATE descriptor for the given table.
pub fn update(table: &str) -> Query {
    Query::new(Kind::Update, table)
}

/// Create a DELETE descriptor for the given table.
pub fn delete(table: &str) -> Query {
    Query::new(Kind::Delete, table)
}

/// Create a verbatim descriptor; the raw SQL is passed through untouched
/// apart from terminator normalization.
pub fn verbatim(raw_sql: &str) -> Query {
    Query::verbatim(raw_sql)
}
