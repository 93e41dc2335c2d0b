/// Concurrent access tests
///
/// Independent call chains sharing one Connection
/// Run with: cargo test --test concurrent_access_tests

use futures::future::join_all;
use sqlite_transaction::{Connection, ConnectionConfig, Context, Error};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

async fn open_db() -> (TempDir, Arc<Connection>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrent.db");
    let config = ConnectionConfig::new(path.to_str().unwrap()).max_connections(4);
    let conn = Connection::open(config).await.unwrap();

    conn.executor(&Context::background())
        .execute_raw("CREATE TABLE events (id INTEGER PRIMARY KEY, task INTEGER NOT NULL);")
        .await
        .unwrap();

    (dir, Arc::new(conn))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_next_value_is_contiguous() {
    let (_dir, conn) = open_db().await;
    conn.register_sequence("events").await.unwrap();

    let seq = conn.sequence("events").unwrap();
    let start = seq.current_value();
    let num_tasks = 64;

    let handles: Vec<_> = (0..num_tasks)
        .map(|_| {
            let seq = Arc::clone(&seq);
            tokio::spawn(async move { seq.next_value() })
        })
        .collect();

    let mut values: Vec<i64> = join_all(handles)
        .await
        .into_iter()
        .map(|handle| handle.unwrap())
        .collect();
    values.sort_unstable();

    let expected: Vec<i64> = (start + 1..=start + num_tasks).collect();
    assert_eq!(values, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_chains_get_independent_transactions() {
    let (_dir, conn) = open_db().await;
    let root = Context::background();

    let (ctx_a, tx_a) = conn.begin(&root).await.unwrap();
    let (ctx_b, tx_b) = conn.begin(&root).await.unwrap();

    assert!(!tx_a.is_noop());
    assert!(!tx_b.is_noop());
    assert_ne!(tx_a.id(), tx_b.id());

    // Beginning chain B didn't touch chain A's carrier or the root
    assert!(conn.executor(&ctx_a).is_transactional());
    assert!(conn.executor(&ctx_b).is_transactional());
    assert!(!conn.executor(&root).is_transactional());

    tx_a.rollback().await.unwrap();
    tx_b.rollback().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_units_of_work() {
    let (_dir, conn) = open_db().await;
    conn.register_sequence("events").await.unwrap();

    let num_tasks = 8;
    let writes_per_task = 5;

    let handles: Vec<_> = (0..num_tasks)
        .map(|task| {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move {
                let db = &conn;
                db.wrap(&Context::background(), |ctx| async move {
                    let seq = db.sequence("events")?;
                    let executor = db.executor(&ctx);
                    let mut ids = Vec::with_capacity(writes_per_task);

                    for _ in 0..writes_per_task {
                        let id = seq.next_value();
                        executor
                            .execute(sqlx::query("INSERT INTO events (id, task) VALUES (?1, ?2)").bind(id).bind(task as i64))
                            .await?;
                        ids.push(id);
                    }

                    Ok::<_, Error>(ids)
                })
                .await
            })
        })
        .collect();

    let mut all_ids = HashSet::new();
    for handle in join_all(handles).await {
        for id in handle.unwrap().unwrap() {
            assert!(all_ids.insert(id), "duplicate id {id}");
        }
    }

    let total: i64 = conn
        .executor(&Context::background())
        .fetch_scalar(sqlx::query_scalar("SELECT COUNT(*) FROM events"))
        .await
        .unwrap();
    assert_eq!(total, (num_tasks * writes_per_task) as i64);
    assert_eq!(all_ids.len(), num_tasks * writes_per_task);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_unit_of_work_does_not_affect_others() {
    let (_dir, conn) = open_db().await;

    let ok = {
        let conn = Arc::clone(&conn);
        tokio::spawn(async move {
            let db = &conn;
            db.wrap(&Context::background(), |ctx| async move {
                db.executor(&ctx)
                    .execute(sqlx::query("INSERT INTO events (id, task) VALUES (1, 1)"))
                    .await?;
                Ok::<_, Error>(())
            })
            .await
        })
    };

    let failed = {
        let conn = Arc::clone(&conn);
        tokio::spawn(async move {
            let db = &conn;
            db.wrap(&Context::background(), |ctx| async move {
                db.executor(&ctx)
                    .execute(sqlx::query("INSERT INTO events (id, task) VALUES (2, 2)"))
                    .await?;
                Err::<(), _>(Error::SequenceNotFound("events".into()))
            })
            .await
        })
    };

    assert!(ok.await.unwrap().is_ok());
    assert!(matches!(failed.await.unwrap(), Err(Error::SequenceNotFound(_))));

    let tasks: Vec<i64> = conn
        .executor(&Context::background())
        .fetch_all_as(sqlx::query_as::<_, (i64,)>("SELECT task FROM events"))
        .await
        .unwrap()
        .into_iter()
        .map(|(task,)| task)
        .collect();
    assert_eq!(tasks, vec![1]);
}
