//! Execution façade behavior against a scripted in-memory connection.

use std::collections::VecDeque;

use querykit::{
    Bindings, Connection, Database, Failure, Outcome, QueryError, Row, Value, insert, select,
    update,
};

/// A connection whose outcomes are scripted up front. Records every
/// prepared SQL string and the bindings submitted with it.
#[derive(Debug, Default)]
struct ScriptedConn {
    prepare_failures: VecDeque<Failure>,
    outcomes: VecDeque<Result<Outcome, Failure>>,
    prepared: Vec<String>,
    submitted: Vec<Bindings>,
    last_failure: Option<Failure>,
}

impl ScriptedConn {
    fn returning(outcomes: Vec<Result<Outcome, Failure>>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
            ..Self::default()
        }
    }

    fn failing_prepare(failure: Failure) -> Self {
        Self {
            prepare_failures: VecDeque::from([failure]),
            ..Self::default()
        }
    }
}

impl Connection for ScriptedConn {
    type Prepared = String;

    fn driver_name(&self) -> &str {
        "scripted"
    }

    async fn prepare(&mut self, sql: &str) -> Result<String, Failure> {
        if let Some(failure) = self.prepare_failures.pop_front() {
            self.last_failure = Some(failure.clone());
            return Err(failure);
        }
        self.prepared.push(sql.to_string());
        Ok(sql.to_string())
    }

    async fn run(&mut self, _prepared: &String, bindings: &Bindings) -> Result<Outcome, Failure> {
        self.submitted.push(bindings.clone());
        match self.outcomes.pop_front() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(failure)) => {
                self.last_failure = Some(failure.clone());
                Err(failure)
            }
            None => Ok(Outcome::default()),
        }
    }

    fn last_error(&self) -> Option<&Failure> {
        self.last_failure.as_ref()
    }

    async fn begin(&mut self) -> Result<(), Failure> {
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), Failure> {
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), Failure> {
        Ok(())
    }
}

fn row(id: i64, title: &str) -> Row {
    Row::from_pairs(vec![
        ("id".to_string(), Value::Int(id)),
        ("title".to_string(), Value::Text(title.to_string())),
    ])
}

#[tokio::test]
async fn disconnected_database_never_reaches_the_driver() {
    let mut db: Database<ScriptedConn> = Database::disconnected();
    let mut query = select("entries");

    let err = query.execute(&mut db).await.unwrap_err();
    assert!(matches!(err, QueryError::NoConnection));
    assert!(query.failed_because().is_some());
    assert_eq!(query.count(), 0);
    assert!(matches!(query.fetch(), Err(QueryError::NoResult(_))));
}

#[tokio::test]
async fn select_fetch_and_count() {
    let conn = ScriptedConn::returning(vec![Ok(Outcome::new(
        vec![row(1, "first"), row(2, "second")],
        0,
        None,
    ))]);
    let mut db = Database::new(conn);

    let mut query = select("entries").columns(&["id", "title"]).limit(10);
    let count = query.execute(&mut db).await.unwrap();
    assert_eq!(count, 2);
    assert_eq!(query.count(), 2);

    let rows = query.fetch().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("id"), Some(&Value::Int(1)));
    assert_eq!(rows[1].get("title"), Some(&Value::Text("second".to_string())));
    assert!(query.failed_because().is_none());

    let conn = db.take().unwrap();
    assert_eq!(conn.prepared, vec!["SELECT id, title FROM entries LIMIT 10;"]);
}

#[tokio::test]
async fn mutation_count_and_last_id() {
    let conn = ScriptedConn::returning(vec![Ok(Outcome::new(vec![], 1, Some(42)))]);
    let mut db = Database::new(conn);

    let mut query = insert("entries")
        .with_sequential_placeholders()
        .columns(&["title"])
        .values(vec!["hello"]);
    let count = query.execute(&mut db).await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(query.last_id(), Some(42));

    let conn = db.take().unwrap();
    assert_eq!(
        conn.prepared,
        vec!["INSERT INTO entries (title) VALUES (:p1);"]
    );
    assert_eq!(
        conn.submitted[0].get(":p1"),
        Some(&Value::Text("hello".to_string()))
    );
}

#[tokio::test]
async fn prepare_failure_is_recorded_raw() {
    let conn = ScriptedConn::failing_prepare(Failure {
        sqlstate: Some("42S02".to_string()),
        code: Some(1146),
        message: "Table 'app.missing' doesn't exist".to_string(),
    });
    let mut db = Database::new(conn);

    let mut query = select("missing");
    let err = query.execute(&mut db).await.unwrap_err();
    assert!(matches!(err, QueryError::Prepare(_)));

    let failure = query.failed_because().unwrap();
    assert_eq!(failure.code, Some(1146));
    assert_eq!(failure.sqlstate.as_deref(), Some("42S02"));
    assert_eq!(failure.message, "Table 'app.missing' doesn't exist");
    assert_eq!(db.connection().unwrap().last_error(), Some(failure));
}

#[tokio::test]
async fn execution_failure_clears_previous_outcome() {
    let conn = ScriptedConn::returning(vec![
        Ok(Outcome::new(vec![], 1, None)),
        Err(Failure::with_code("Duplicate entry '1'", 1062)),
    ]);
    let mut db = Database::new(conn);

    let mut query = update("entries")
        .with_sequential_placeholders()
        .set("title", "renamed")
        .predicate("id = 1");
    assert_eq!(query.execute(&mut db).await.unwrap(), 1);
    assert_eq!(query.count(), 1);

    let err = query.execute(&mut db).await.unwrap_err();
    assert!(matches!(err, QueryError::Execution(_)));
    assert_eq!(query.failed_because().unwrap().code, Some(1062));
    // The stale outcome from the first run is gone.
    assert_eq!(query.count(), 0);
    assert!(matches!(query.fetch(), Err(QueryError::NoResult(_))));
}

#[tokio::test]
async fn union_bindings_travel_with_the_statement() {
    let conn = ScriptedConn::returning(vec![Ok(Outcome::new(vec![], 2, None))]);
    let mut db = Database::new(conn);

    let source = select("archive").predicate_with(
        "year = :year",
        [(":year", 2020i64)].into_iter().collect(),
    );
    let mut query = insert("entries").columns(&["id"]).add_union(source);
    assert_eq!(query.execute(&mut db).await.unwrap(), 2);

    let conn = db.take().unwrap();
    assert_eq!(
        conn.prepared,
        vec!["INSERT INTO entries (id) SELECT * FROM archive WHERE year = :year;"]
    );
    // The sub-select's binding was merged into the submitted set even
    // though the descriptor itself holds none.
    assert!(query.bindings().is_empty());
    assert_eq!(conn.submitted[0].get(":year"), Some(&Value::Int(2020)));
}

#[tokio::test]
async fn re_execute_renders_fresh() {
    let conn = ScriptedConn::returning(vec![
        Ok(Outcome::new(vec![row(1, "a")], 0, None)),
        Ok(Outcome::new(vec![row(1, "a"), row(2, "b")], 0, None)),
    ]);
    let mut db = Database::new(conn);

    let mut query = select("entries").predicate("id > 0");
    assert_eq!(query.execute(&mut db).await.unwrap(), 1);
    assert_eq!(query.execute(&mut db).await.unwrap(), 2);
    assert_eq!(query.count(), 2);

    let conn = db.take().unwrap();
    assert_eq!(conn.prepared.len(), 2);
    assert_eq!(conn.prepared[0], conn.prepared[1]);
}
