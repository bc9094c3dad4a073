//! Streaming cursor behavior against the SQLite driver.

use sqlgate::{DbError, Param, Params, QueryEngine, ServerDescriptor, SqlValue, SqliteDriver};
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

async fn setup(rows: i64) -> QueryEngine<SqliteDriver> {
    let path = temp_db_path();
    let mut engine = QueryEngine::new(
        SqliteDriver::new(),
        vec![ServerDescriptor::local("primary", path.as_str())],
    );
    engine
        .query(
            "CREATE TABLE items (item_id INTEGER PRIMARY KEY, label TEXT)",
            Params::None,
        )
        .await
        .unwrap();
    for i in 1..=rows {
        engine
            .query(
                "INSERT INTO items (item_id, label) VALUES (?, ?)",
                Params::positional([Param::from(i), Param::from(format!("item{i}"))]),
            )
            .await
            .unwrap();
    }
    engine
}

async fn drain_ids(engine: &mut QueryEngine<SqliteDriver>) -> Vec<i64> {
    let mut ids = Vec::new();
    while let Some(row) = engine.query_next().await.unwrap() {
        match row.get("item_id") {
            Some(SqlValue::Int(id)) => ids.push(*id),
            other => panic!("unexpected id value: {other:?}"),
        }
    }
    ids
}

#[tokio::test]
async fn cursor_yields_rows_one_at_a_time() {
    let mut engine = setup(5).await;
    engine
        .query_loop("SELECT item_id FROM items ORDER BY item_id", Params::None)
        .await
        .unwrap();

    assert_eq!(drain_ids(&mut engine).await, vec![1, 2, 3, 4, 5]);

    // Exhausted cursor keeps reporting the end.
    assert!(engine.query_next().await.unwrap().is_none());
}

#[tokio::test]
async fn new_loop_discards_the_open_cursor() {
    let mut engine = setup(3).await;

    engine
        .query_loop("SELECT item_id FROM items ORDER BY item_id", Params::None)
        .await
        .unwrap();
    let first = engine.query_next().await.unwrap().unwrap();
    assert_eq!(first.get("item_id"), Some(&SqlValue::Int(1)));

    // Replacing the cursor restarts the walk under the new statement.
    engine
        .query_loop(
            "SELECT item_id FROM items ORDER BY item_id DESC",
            Params::None,
        )
        .await
        .unwrap();
    assert_eq!(drain_ids(&mut engine).await, vec![3, 2, 1]);
}

#[tokio::test]
async fn cursor_dies_with_its_connection() {
    let mut engine = setup(3).await;
    engine
        .query_loop("SELECT item_id FROM items", Params::None)
        .await
        .unwrap();

    // Persistence toggle replaces the connection.
    engine.set_persistent_connection(true).await.unwrap();

    let err = engine.query_next().await.unwrap_err();
    assert!(matches!(err, DbError::InvalidCursor { .. }));
}

#[tokio::test]
async fn query_next_without_a_loop_is_an_error() {
    let mut engine = setup(0).await;
    let err = engine.query_next().await.unwrap_err();
    assert!(matches!(err, DbError::InvalidCursor { .. }));
}

#[tokio::test]
async fn cursor_with_parameters() {
    let mut engine = setup(6).await;
    engine
        .query_loop(
            "SELECT item_id FROM items WHERE item_id IN (?) ORDER BY item_id",
            Params::positional([Param::list([2i64, 4, 6])]),
        )
        .await
        .unwrap();
    assert_eq!(drain_ids(&mut engine).await, vec![2, 4, 6]);
}

#[tokio::test]
async fn buffered_queries_still_work_after_a_cursor() {
    let mut engine = setup(4).await;
    engine
        .query_loop("SELECT item_id FROM items ORDER BY item_id", Params::None)
        .await
        .unwrap();
    assert_eq!(drain_ids(&mut engine).await, vec![1, 2, 3, 4]);

    // Cursor exhausted; the connection serves ordinary queries again.
    let outcome = engine
        .query("SELECT COUNT(*) AS n FROM items", Params::None)
        .await
        .unwrap();
    assert_eq!(outcome.rows()[0].get("n"), Some(&SqlValue::Int(4)));
}
