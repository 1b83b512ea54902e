//! `Connection` implementation over `mysql_async`.

use chrono::{Datelike, NaiveDate, Timelike};
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder, Params};

use crate::binding::Bindings;
use crate::client::{Connection, Outcome, Row};
use crate::error::{ConnectError, Failure, QueryError, QueryResult};
use crate::value::Value;

/// Connect options for [`MySqlConnection::establish`].
///
/// Host, username and schema are required; establishing with any of them
/// empty is a configuration error surfaced before the driver is touched.
#[derive(Clone, Debug, Default)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub schema: String,
}

impl ConnectOptions {
    /// Options for the given host/username/schema on the default port.
    pub fn new(host: &str, username: &str, password: &str, schema: &str) -> Self {
        Self {
            host: host.to_string(),
            port: 3306,
            username: username.to_string(),
            password: password.to_string(),
            schema: schema.to_string(),
        }
    }

    /// Override the TCP port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Read options from `QUERYKIT_DB_HOST` / `_PORT` / `_USER` /
    /// `_PASSWORD` / `_SCHEMA`.
    pub fn from_env() -> QueryResult<Self> {
        let get = |key: &str| std::env::var(key).unwrap_or_default();
        let port = std::env::var("QUERYKIT_DB_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3306);
        let options = Self {
            host: get("QUERYKIT_DB_HOST"),
            port,
            username: get("QUERYKIT_DB_USER"),
            password: get("QUERYKIT_DB_PASSWORD"),
            schema: get("QUERYKIT_DB_SCHEMA"),
        };
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> QueryResult<()> {
        if self.host.is_empty() {
            return Err(QueryError::Config("database host is required".to_string()));
        }
        if self.username.is_empty() {
            return Err(QueryError::Config(
                "database username is required".to_string(),
            ));
        }
        if self.schema.is_empty() {
            return Err(QueryError::Config(
                "database schema is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// A single MySQL connection handle.
pub struct MySqlConnection {
    conn: Conn,
    last_failure: Option<Failure>,
}

impl std::fmt::Debug for MySqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("last_failure", &self.last_failure)
            .finish_non_exhaustive()
    }
}

impl MySqlConnection {
    /// Establish a connection.
    ///
    /// Missing required options fail as [`QueryError::Config`]; driver
    /// failures are classified into a friendly message where the cause is
    /// well known (unreachable server, bad credentials, unknown schema)
    /// and returned as [`QueryError::Connect`]. Never retried.
    pub async fn establish(options: &ConnectOptions) -> QueryResult<Self> {
        options.validate()?;

        let opts = OptsBuilder::default()
            .ip_or_hostname(options.host.clone())
            .tcp_port(options.port)
            .user(Some(options.username.clone()))
            .pass(Some(options.password.clone()))
            .db_name(Some(options.schema.clone()));

        match Conn::new(opts).await {
            Ok(conn) => Ok(Self {
                conn,
                last_failure: None,
            }),
            Err(err) => Err(QueryError::Connect(classify_connect_error(err))),
        }
    }

    /// The underlying driver handle, for operations outside this crate's
    /// surface.
    pub fn raw(&mut self) -> &mut Conn {
        &mut self.conn
    }

    fn record(&mut self, err: mysql_async::Error) -> Failure {
        let failure = failure_from(err);
        self.last_failure = Some(failure.clone());
        failure
    }

    async fn exec_raw(&mut self, sql: &str) -> Result<(), Failure> {
        match self.conn.query_drop(sql).await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.record(err)),
        }
    }
}

impl Connection for MySqlConnection {
    type Prepared = mysql_async::Statement;

    fn driver_name(&self) -> &str {
        "mysql"
    }

    async fn prepare(&mut self, sql: &str) -> Result<Self::Prepared, Failure> {
        match self.conn.prep(sql).await {
            Ok(prepared) => Ok(prepared),
            Err(err) => Err(self.record(err)),
        }
    }

    async fn run(
        &mut self,
        prepared: &Self::Prepared,
        bindings: &Bindings,
    ) -> Result<Outcome, Failure> {
        let params = params_from(bindings);
        let mut result = match self.conn.exec_iter(prepared, params).await {
            Ok(result) => result,
            Err(err) => return Err(self.record(err)),
        };

        let raw_rows: Vec<mysql_async::Row> = match result.collect().await {
            Ok(rows) => rows,
            Err(err) => {
                drop(result);
                return Err(self.record(err));
            }
        };
        let affected = result.affected_rows();
        let last_insert_id = result.last_insert_id();
        drop(result);

        let rows = raw_rows.into_iter().map(row_from).collect();
        Ok(Outcome::new(rows, affected, last_insert_id))
    }

    fn last_error(&self) -> Option<&Failure> {
        self.last_failure.as_ref()
    }

    async fn begin(&mut self) -> Result<(), Failure> {
        self.exec_raw("START TRANSACTION").await
    }

    async fn commit(&mut self) -> Result<(), Failure> {
        self.exec_raw("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), Failure> {
        self.exec_raw("ROLLBACK").await
    }
}

/// Map well-known low-level failures to human text; anything else keeps an
/// empty friendly message beside the raw failure.
fn classify_connect_error(err: mysql_async::Error) -> ConnectError {
    let friendly = match &err {
        mysql_async::Error::Io(_) => "The database server cannot be reached",
        mysql_async::Error::Server(server) if server.code == 1045 => {
            "Access denied: check the username and password"
        }
        mysql_async::Error::Server(server) if server.code == 1049 => {
            "The requested schema does not exist"
        }
        _ => "",
    };
    ConnectError {
        friendly: friendly.to_string(),
        failure: failure_from(err),
    }
}

fn failure_from(err: mysql_async::Error) -> Failure {
    match err {
        mysql_async::Error::Server(server) => Failure {
            sqlstate: Some(server.state.clone()),
            code: Some(u32::from(server.code)),
            message: server.message,
        },
        other => Failure::message(other.to_string()),
    }
}

/// Convert the binding set into driver named parameters, stripping the
/// leading `:` from each token.
fn params_from(bindings: &Bindings) -> Params {
    if bindings.is_empty() {
        return Params::Empty;
    }
    let named: Vec<(String, mysql_async::Value)> = bindings
        .iter()
        .map(|(token, value)| {
            (
                token.trim_start_matches(':').to_string(),
                mysql_value_from(value),
            )
        })
        .collect();
    Params::from(named)
}

fn mysql_value_from(value: &Value) -> mysql_async::Value {
    match value {
        Value::Null => mysql_async::Value::NULL,
        Value::Bool(b) => mysql_async::Value::Int(i64::from(*b)),
        Value::Int(n) => mysql_async::Value::Int(*n),
        Value::UInt(n) => mysql_async::Value::UInt(*n),
        Value::Double(f) => mysql_async::Value::Double(*f),
        Value::Text(s) => mysql_async::Value::Bytes(s.clone().into_bytes()),
        Value::Bytes(b) => mysql_async::Value::Bytes(b.clone()),
        Value::DateTime(dt) => mysql_async::Value::Date(
            dt.year() as u16,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            dt.nanosecond() / 1000,
        ),
        Value::Json(json) => mysql_async::Value::Bytes(json.to_string().into_bytes()),
        #[cfg(feature = "rust_decimal")]
        Value::Decimal(d) => mysql_async::Value::Bytes(d.to_string().into_bytes()),
    }
}

fn value_from_mysql(value: mysql_async::Value) -> Value {
    match value {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Int(n) => Value::Int(n),
        mysql_async::Value::UInt(n) => Value::UInt(n),
        mysql_async::Value::Float(f) => Value::Double(f64::from(f)),
        mysql_async::Value::Double(f) => Value::Double(f),
        mysql_async::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(err) => Value::Bytes(err.into_bytes()),
        },
        mysql_async::Value::Date(year, month, day, hour, minute, second, micros) => {
            NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
                .and_then(|date| {
                    date.and_hms_micro_opt(
                        u32::from(hour),
                        u32::from(minute),
                        u32::from(second),
                        micros,
                    )
                })
                .map(Value::DateTime)
                .unwrap_or(Value::Null)
        }
        mysql_async::Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            let total_hours = u32::from(days) * 24 + u32::from(hours);
            Value::Text(format!(
                "{}{:02}:{:02}:{:02}.{:06}",
                sign, total_hours, minutes, seconds, micros
            ))
        }
    }
}

fn row_from(row: mysql_async::Row) -> Row {
    let names: Vec<String> = row
        .columns_ref()
        .iter()
        .map(|column| column.name_str().into_owned())
        .collect();
    let values = row.unwrap();
    Row::from_pairs(
        names
            .into_iter()
            .zip(values.into_iter().map(value_from_mysql))
            .collect(),
    )
}
