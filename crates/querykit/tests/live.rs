//! Smoke test against a live MySQL server.
//!
//! Skipped unless connect options are present in the environment (a `.env`
//! file is honored): set `QUERYKIT_DB_HOST`, `QUERYKIT_DB_USER` and
//! `QUERYKIT_DB_SCHEMA` to enable it.

use querykit::{ConnectOptions, Database, MySqlConnection, Value, verbatim};

#[tokio::test]
async fn live_select_one() {
    dotenvy::dotenv().ok();
    let Ok(options) = ConnectOptions::from_env() else {
        eprintln!("live test skipped: QUERYKIT_DB_* not set");
        return;
    };

    let conn = MySqlConnection::establish(&options)
        .await
        .expect("connect to the configured server");
    let mut db = Database::new(conn);

    let mut query = verbatim("SELECT 1 AS one");
    assert_eq!(query.execute(&mut db).await.unwrap(), 1);
    let rows = query.fetch().unwrap();
    assert_eq!(rows[0].get("one"), Some(&Value::Int(1)));
}
