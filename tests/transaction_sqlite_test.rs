//! Transaction lifecycle against the SQLite driver.

use sqlgate::{DbError, IsolationLevel, Params, QueryEngine, ServerDescriptor, SqlValue, SqliteDriver};
use tempfile::NamedTempFile;

fn temp_db_path() -> String {
    NamedTempFile::new()
        .unwrap()
        .into_temp_path()
        .keep()
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

async fn setup() -> QueryEngine<SqliteDriver> {
    let path = temp_db_path();
    let mut engine = QueryEngine::new(
        SqliteDriver::new(),
        vec![ServerDescriptor::local("primary", path.as_str())],
    );
    engine
        .query(
            "CREATE TABLE accounts (account_id INTEGER PRIMARY KEY, balance INTEGER)",
            Params::None,
        )
        .await
        .unwrap();
    engine
}

async fn account_count(engine: &mut QueryEngine<SqliteDriver>) -> i64 {
    let row = engine
        .query_row("SELECT COUNT(*) AS n FROM accounts", Params::None)
        .await
        .unwrap();
    match row.get("n") {
        Some(SqlValue::Int(n)) => *n,
        other => panic!("unexpected count: {other:?}"),
    }
}

#[tokio::test]
async fn committed_work_is_visible() {
    let mut engine = setup().await;

    engine.start_transaction(None).await.unwrap();
    engine
        .query(
            "INSERT INTO accounts (balance) VALUES (?)",
            Params::values([100i64]),
        )
        .await
        .unwrap();

    // Uncommitted rows are visible inside the transaction.
    assert_eq!(account_count(&mut engine).await, 1);

    engine.commit_transaction().await.unwrap();
    assert_eq!(account_count(&mut engine).await, 1);
}

#[tokio::test]
async fn rolled_back_work_is_discarded() {
    let mut engine = setup().await;

    engine.start_transaction(None).await.unwrap();
    engine
        .query(
            "INSERT INTO accounts (balance) VALUES (?)",
            Params::values([100i64]),
        )
        .await
        .unwrap();

    assert!(engine.rollback_transaction().await.unwrap());
    assert_eq!(account_count(&mut engine).await, 0);
}

#[tokio::test]
async fn rollback_while_idle_returns_false() {
    let mut engine = setup().await;
    assert!(!engine.rollback_transaction().await.unwrap());
}

#[tokio::test]
async fn commit_while_idle_is_fatal() {
    let mut engine = setup().await;
    let err = engine.commit_transaction().await.unwrap_err();
    assert!(matches!(err, DbError::Transaction { .. }));
}

#[tokio::test]
async fn transactions_do_not_nest() {
    let mut engine = setup().await;
    engine.start_transaction(None).await.unwrap();
    let err = engine.start_transaction(None).await.unwrap_err();
    assert!(matches!(err, DbError::Transaction { .. }));
    engine.rollback_transaction().await.unwrap();
}

#[tokio::test]
async fn isolation_intent_is_accepted() {
    let mut engine = setup().await;
    engine
        .start_transaction(Some(IsolationLevel::ReadCommitted))
        .await
        .unwrap();
    engine.commit_transaction().await.unwrap();

    engine
        .start_transaction(Some(IsolationLevel::RepeatableRead))
        .await
        .unwrap();
    engine.rollback_transaction().await.unwrap();
}

#[tokio::test]
async fn get_last_dumps_the_transaction_log() {
    let mut engine = setup().await;

    engine.start_transaction(None).await.unwrap();
    engine
        .query(
            "INSERT INTO accounts (balance) VALUES (?)",
            Params::values([1i64]),
        )
        .await
        .unwrap();
    engine
        .query(
            "UPDATE accounts SET balance = ? WHERE balance = ?",
            Params::values([2i64, 1]),
        )
        .await
        .unwrap();
    engine.commit_transaction().await.unwrap();

    let dump = engine.get_last();
    assert_eq!(
        dump,
        "INSERT INTO accounts (balance) VALUES (1)\nUPDATE accounts SET balance = 2 WHERE balance = 1"
    );
}

#[tokio::test]
async fn close_discards_the_open_transaction() {
    let mut engine = setup().await;

    engine.start_transaction(None).await.unwrap();
    engine
        .query(
            "INSERT INTO accounts (balance) VALUES (?)",
            Params::values([7i64]),
        )
        .await
        .unwrap();
    engine.close().await;

    // Reconnect: the uncommitted row is gone.
    assert_eq!(account_count(&mut engine).await, 0);
    assert!(!engine.rollback_transaction().await.unwrap());
}
