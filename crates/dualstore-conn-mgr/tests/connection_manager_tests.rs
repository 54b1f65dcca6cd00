use dualstore_conn_mgr::{ConnectionManager, ConnectionManagerConfig, Error, Migrator};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

async fn create_test_db(config: Option<ConnectionManagerConfig>) -> (Arc<ConnectionManager>, TempDir) {
   let temp_dir = TempDir::new().expect("Failed to create temp directory");
   let db_path = temp_dir.path().join("relational.db");
   let db = ConnectionManager::connect(&db_path, config)
      .await
      .expect("Failed to connect to test database");

   db.with_connection(|lease| {
      Box::pin(async move {
         sqlx::query("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE)")
            .execute(&mut **lease)
            .await?;
         Ok::<_, Error>(())
      })
   })
   .await
   .unwrap();

   (db, temp_dir)
}

async fn count_items(db: &ConnectionManager) -> i64 {
   db.with_connection(|lease| {
      Box::pin(async move {
         let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items")
            .fetch_one(&mut **lease)
            .await?;
         Ok::<_, Error>(count)
      })
   })
   .await
   .unwrap()
}

/// Wait for leases abandoned mid-transaction to finish rolling back
async fn wait_for_idle(db: &ConnectionManager) {
   tokio::time::timeout(Duration::from_secs(5), async {
      while db.outstanding_leases() > 0 {
         tokio::time::sleep(Duration::from_millis(10)).await;
      }
   })
   .await
   .expect("abandoned lease was never released");
}

/// Error type owned by the caller, used to prove errors come back unchanged
#[derive(Debug, PartialEq)]
enum AppError {
   Rejected(&'static str),
   Pool(String),
}

impl From<Error> for AppError {
   fn from(e: Error) -> Self {
      AppError::Pool(e.to_string())
   }
}

#[tokio::test]
async fn test_default_capacity() {
   let (db, _temp) = create_test_db(None).await;

   assert_eq!(db.capacity(), 10);
   assert_eq!(db.outstanding_leases(), 0);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn test_zero_capacity_rejected() {
   let temp_dir = TempDir::new().unwrap();
   let config = ConnectionManagerConfig {
      max_connections: 0,
      ..Default::default()
   };

   let result = ConnectionManager::connect(temp_dir.path().join("zero.db"), Some(config)).await;
   assert!(matches!(result, Err(Error::InvalidCapacity(0))));
}

#[tokio::test]
async fn test_empty_path_rejected() {
   let result = ConnectionManager::connect("", None).await;
   assert!(matches!(result, Err(Error::Io(_))));
}

#[tokio::test]
async fn test_lease_released_after_success() {
   let (db, _temp) = create_test_db(None).await;

   let value = db
      .with_connection(|lease| {
         Box::pin(async move {
            let (one,): (i64,) = sqlx::query_as("SELECT 1").fetch_one(&mut **lease).await?;
            Ok::<_, Error>(one)
         })
      })
      .await
      .unwrap();

   assert_eq!(value, 1);
   assert_eq!(db.outstanding_leases(), 0);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn test_lease_released_after_failure() {
   let (db, _temp) = create_test_db(None).await;

   for _ in 0..25 {
      let result: Result<(), AppError> = db
         .with_connection(|_lease| Box::pin(async move { Err(AppError::Rejected("nope")) }))
         .await;
      assert_eq!(result, Err(AppError::Rejected("nope")));

      let result: Result<(), AppError> = db
         .with_transaction(|_lease| Box::pin(async move { Err(AppError::Rejected("nope")) }))
         .await;
      assert_eq!(result, Err(AppError::Rejected("nope")));
   }

   // 50 failed units of work against a pool of 10 - none leaked
   assert_eq!(db.outstanding_leases(), 0);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn test_lease_released_after_panic() {
   let (db, _temp) = create_test_db(None).await;

   let db_clone = Arc::clone(&db);
   let handle = tokio::spawn(async move {
      let _: Result<(), Error> = db_clone
         .with_transaction(|lease| {
            Box::pin(async move {
               if lease.in_transaction() {
                  panic!("unit of work panicked");
               }
               Ok(())
            })
         })
         .await;
   });

   assert!(handle.await.is_err());
   assert_eq!(db.outstanding_leases(), 0);

   // Pool is still fully usable
   assert_eq!(count_items(&db).await, 0);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn test_transaction_commits_on_success() {
   let (db, _temp) = create_test_db(None).await;

   let rows = db
      .with_transaction(|lease| {
         Box::pin(async move {
            let mut rows = 0;
            for name in ["margherita", "marinara"] {
               rows += sqlx::query("INSERT INTO items (name) VALUES (?)")
                  .bind(name)
                  .execute(&mut **lease)
                  .await?
                  .rows_affected();
            }
            Ok::<_, Error>(rows)
         })
      })
      .await
      .unwrap();

   assert_eq!(rows, 2);
   assert_eq!(count_items(&db).await, 2);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn test_transaction_rolls_back_on_failure() {
   let (db, _temp) = create_test_db(None).await;

   let result: Result<(), AppError> = db
      .with_transaction(|lease| {
         Box::pin(async move {
            sqlx::query("INSERT INTO items (name) VALUES ('written then undone')")
               .execute(&mut **lease)
               .await
               .map_err(|e| AppError::Pool(e.to_string()))?;
            Err(AppError::Rejected("validation failed"))
         })
      })
      .await;

   // Original error, not a rollback artifact
   assert_eq!(result, Err(AppError::Rejected("validation failed")));

   // A fresh transaction sees none of the failed unit's writes
   assert_eq!(count_items(&db).await, 0);
   assert_eq!(db.outstanding_leases(), 0);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn test_statement_error_propagates_unchanged() {
   let (db, _temp) = create_test_db(None).await;

   let result: Result<(), Error> = db
      .with_transaction(|lease| {
         Box::pin(async move {
            sqlx::query("INSERT INTO items (name) VALUES ('dup')")
               .execute(&mut **lease)
               .await?;
            sqlx::query("INSERT INTO items (name) VALUES ('dup')")
               .execute(&mut **lease)
               .await?;
            Ok(())
         })
      })
      .await;

   match result {
      Err(Error::Sqlx(e)) => {
         let db_err = e.as_database_error().expect("expected a database error");
         assert!(db_err.is_unique_violation());
      }
      other => panic!("expected unique violation, got {other:?}"),
   }

   // First insert was rolled back together with the failing one
   assert_eq!(count_items(&db).await, 0);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn test_cancelled_transaction_is_not_left_open() {
   let (db, _temp) = create_test_db(None).await;

   let cancelled = tokio::time::timeout(
      Duration::from_millis(50),
      db.with_transaction(|lease| {
         Box::pin(async move {
            sqlx::query("INSERT INTO items (name) VALUES ('never committed')")
               .execute(&mut **lease)
               .await?;
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, Error>(())
         })
      }),
   )
   .await;

   assert!(cancelled.is_err(), "transaction should have been cancelled");
   wait_for_idle(&db).await;

   // The abandoned write lock is gone and the write is not visible
   db.with_transaction(|lease| {
      Box::pin(async move {
         sqlx::query("INSERT INTO items (name) VALUES ('after cancel')")
            .execute(&mut **lease)
            .await?;
         Ok::<_, Error>(())
      })
   })
   .await
   .unwrap();

   assert_eq!(count_items(&db).await, 1);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn test_cancelled_memory_transaction_keeps_committed_data() {
   let db = ConnectionManager::connect(":memory:", None).await.unwrap();
   assert_eq!(db.capacity(), 1);

   db.with_transaction(|lease| {
      Box::pin(async move {
         sqlx::query("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE)")
            .execute(&mut **lease)
            .await?;
         sqlx::query("INSERT INTO items (name) VALUES ('kept')")
            .execute(&mut **lease)
            .await?;
         Ok::<_, Error>(())
      })
   })
   .await
   .unwrap();

   let cancelled = tokio::time::timeout(
      Duration::from_millis(50),
      db.with_transaction(|lease| {
         Box::pin(async move {
            sqlx::query("INSERT INTO items (name) VALUES ('never committed')")
               .execute(&mut **lease)
               .await?;
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, Error>(())
         })
      }),
   )
   .await;
   assert!(cancelled.is_err(), "transaction should have been cancelled");

   // Waits for the rollback to hand the only connection back
   assert_eq!(count_items(&db).await, 1);
   wait_for_idle(&db).await;

   db.with_transaction(|lease| {
      Box::pin(async move {
         sqlx::query("INSERT INTO items (name) VALUES ('after cancel')")
            .execute(&mut **lease)
            .await?;
         Ok::<_, Error>(())
      })
   })
   .await
   .unwrap();
   assert_eq!(count_items(&db).await, 2);
}

#[tokio::test]
async fn test_exhausted_pool_blocks_until_release() {
   let config = ConnectionManagerConfig {
      max_connections: 2,
      ..Default::default()
   };
   let (db, _temp) = create_test_db(Some(config)).await;

   let first = db.acquire().await.unwrap();
   let second = db.acquire().await.unwrap();
   assert_eq!(db.outstanding_leases(), 2);

   // Third caller waits while both leases are out
   let waiting = tokio::time::timeout(Duration::from_millis(50), db.acquire()).await;
   assert!(waiting.is_err(), "acquire should block while the pool is exhausted");

   let db_clone = Arc::clone(&db);
   let waiter = tokio::spawn(async move {
      let lease = db_clone.acquire().await.unwrap();
      drop(lease);
   });

   tokio::time::sleep(Duration::from_millis(20)).await;
   assert!(!waiter.is_finished());

   drop(first);
   waiter.await.unwrap();

   drop(second);
   assert_eq!(db.outstanding_leases(), 0);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_transactions_respect_capacity() {
   use std::sync::atomic::{AtomicUsize, Ordering};

   let config = ConnectionManagerConfig {
      max_connections: 3,
      ..Default::default()
   };
   let (db, _temp) = create_test_db(Some(config)).await;
   let max_seen = Arc::new(AtomicUsize::new(0));

   let handles: Vec<_> = (0..12)
      .map(|i| {
         let (db, max_seen) = (Arc::clone(&db), Arc::clone(&max_seen));

         tokio::spawn(async move {
            let name = format!("item-{i}");
            let observer = Arc::clone(&db);
            db.with_transaction(move |lease| {
               Box::pin(async move {
                  max_seen.fetch_max(observer.outstanding_leases(), Ordering::SeqCst);
                  sqlx::query("INSERT INTO items (name) VALUES (?)")
                     .bind(name)
                     .execute(&mut **lease)
                     .await?;
                  Ok::<_, Error>(())
               })
            })
            .await
            .unwrap();
         })
      })
      .collect();

   for handle in handles {
      handle.await.unwrap();
   }

   assert!(max_seen.load(Ordering::SeqCst) <= 3);
   assert_eq!(count_items(&db).await, 12);
   assert_eq!(db.outstanding_leases(), 0);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn test_ping() {
   let (db, _temp) = create_test_db(None).await;

   db.ping().await.unwrap();
   assert_eq!(db.outstanding_leases(), 0);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn test_database_closed_error() {
   let (db, _temp) = create_test_db(None).await;

   // Clone db so we can use it after close
   let db_ref = Arc::clone(&db);
   db.close().await.unwrap();

   assert!(matches!(db_ref.acquire().await, Err(Error::DatabaseClosed)));
   assert!(matches!(db_ref.ping().await, Err(Error::DatabaseClosed)));

   let result: Result<(), Error> = db_ref
      .with_transaction(|_lease| Box::pin(async move { Ok(()) }))
      .await;
   assert!(matches!(result, Err(Error::DatabaseClosed)));
}

#[tokio::test]
async fn test_run_migrations_is_repeatable() {
   let (db, temp) = create_test_db(None).await;

   let migrations_dir = temp.path().join("migrations");
   std::fs::create_dir_all(&migrations_dir).unwrap();
   std::fs::write(
      migrations_dir.join("0001_menu.sql"),
      "CREATE TABLE menu (id INTEGER PRIMARY KEY, title TEXT NOT NULL);",
   )
   .unwrap();

   let migrator = Migrator::new(migrations_dir.as_path()).await.unwrap();

   db.run_migrations(&migrator).await.unwrap();
   db.run_migrations(&migrator).await.unwrap();

   let tables: Vec<(String,)> =
      db.with_connection(|lease| {
         Box::pin(async move {
            Ok::<_, Error>(
               sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'menu'")
                  .fetch_all(&mut **lease)
                  .await?,
            )
         })
      })
      .await
      .unwrap();

   assert_eq!(tables.len(), 1);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn test_remove_deletes_files() {
   let (db, temp) = create_test_db(None).await;
   let db_path = temp.path().join("relational.db");

   assert!(db_path.exists(), "Database file should exist");

   db.remove().await.unwrap();

   assert!(!db_path.exists(), "Database file should be removed");
   assert!(!temp.path().join("relational.db-wal").exists());
   assert!(!temp.path().join("relational.db-shm").exists());
}
