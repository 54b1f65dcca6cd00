//! Bounded connection pool with scoped leases and scoped transactions

use crate::Result;
use crate::config::ConnectionManagerConfig;
use crate::error::Error;
use crate::lease::Lease;
use futures::future::BoxFuture;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error};

/// Relational connection manager.
///
/// Every connection handed out is wrapped in a [`Lease`]. The number of live
/// leases never exceeds [`capacity`](Self::capacity); once the budget is spent,
/// [`acquire`](Self::acquire) waits for a lease to be dropped. The wait has no
/// timeout of its own, so callers that need one should wrap the call in
/// `tokio::time::timeout`.
///
/// # Example
///
/// ```no_run
/// use dualstore_conn_mgr::{ConnectionManager, Error};
///
/// # async fn example() -> Result<(), dualstore_conn_mgr::Error> {
/// let db = ConnectionManager::connect("orders.db", None).await?;
///
/// let inserted = db
///    .with_transaction(|lease| {
///       Box::pin(async move {
///          let result = sqlx::query("INSERT INTO people (email, name) VALUES (?, ?)")
///             .bind("ada@example.com")
///             .bind("Ada")
///             .execute(&mut **lease)
///             .await?;
///          Ok::<_, Error>(result.rows_affected())
///       })
///    })
///    .await?;
///
/// assert_eq!(inserted, 1);
/// db.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConnectionManager {
   /// Read-write connections, sized to the lease budget
   pool: Pool<Sqlite>,

   /// One permit per lease that may be checked out
   leases: Arc<Semaphore>,

   /// Number of permits `leases` was created with
   capacity: u32,

   /// Marks the manager as closed to prevent further operations
   closed: AtomicBool,

   /// Path to database file (used for cleanup)
   path: PathBuf,
}

impl ConnectionManager {
   /// Open a connection pool on a SQLite database
   ///
   /// The database file is created if it doesn't exist. File databases are
   /// switched to WAL mode so readers don't block on an in-flight write
   /// transaction.
   ///
   /// # Arguments
   ///
   /// * `path` - Path to the SQLite database file (will be created if missing)
   /// * `custom_config` - Optional pool configuration. Pass `None` to use the
   ///   defaults (10 leases, 30 second idle timeout, 5 second busy timeout).
   ///
   /// `:memory:` databases only exist on the connection that created them, so
   /// their pool is clamped to a single connection that is never idled out.
   pub async fn connect(
      path: impl AsRef<Path>,
      custom_config: Option<ConnectionManagerConfig>,
   ) -> Result<Arc<Self>> {
      let config = custom_config.unwrap_or_default();
      let path = path.as_ref();

      // Validate path is not empty
      if path.as_os_str().is_empty() {
         return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Database path cannot be empty",
         )));
      }

      if config.max_connections == 0 {
         return Err(Error::InvalidCapacity(config.max_connections));
      }

      let memory = is_memory_database(path);
      let capacity = if memory { 1 } else { config.max_connections };

      let mut options = SqliteConnectOptions::new()
         .filename(path)
         .create_if_missing(true)
         .foreign_keys(true)
         .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

      if !memory {
         // https://www.sqlite.org/wal.html#performance_considerations
         options = options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
      }

      let pool_options = SqlitePoolOptions::new().max_connections(capacity);
      let pool_options = if memory {
         pool_options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
      } else {
         pool_options
            .min_connections(0)
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_secs)))
      };

      let pool = pool_options.connect_with(options).await?;

      debug!(
         "Opened relational pool on {} with {} lease(s)",
         path.display(),
         capacity
      );

      Ok(Arc::new(Self {
         pool,
         leases: Arc::new(Semaphore::new(capacity as usize)),
         capacity,
         closed: AtomicBool::new(false),
         path: path.to_path_buf(),
      }))
   }

   /// Check out one connection
   ///
   /// Waits until a lease slot is free, then takes a connection from the pool.
   /// The returned [`Lease`] gives both back when dropped.
   pub async fn acquire(&self) -> Result<Lease> {
      if self.closed.load(Ordering::SeqCst) {
         return Err(Error::DatabaseClosed);
      }

      let permit = Arc::clone(&self.leases)
         .acquire_owned()
         .await
         .map_err(|_| Error::DatabaseClosed)?;

      // The permit guarantees the pool has room for us
      let conn = self.pool.acquire().await?;

      Ok(Lease::new(conn, permit, is_memory_database(&self.path)))
   }

   /// Run a unit of work on one leased connection
   ///
   /// The lease is released when this call returns, whether the unit of work
   /// succeeded, failed or returned early.
   pub async fn with_connection<F, T, E>(&self, f: F) -> std::result::Result<T, E>
   where
      F: for<'c> FnOnce(&'c mut Lease) -> BoxFuture<'c, std::result::Result<T, E>>,
      E: From<Error>,
   {
      let mut lease = self.acquire().await?;
      f(&mut lease).await
   }

   /// Run a unit of work inside a transaction on one leased connection
   ///
   /// Issues `BEGIN IMMEDIATE`, runs `f`, and commits if it returns `Ok`. If
   /// `f` returns `Err` the transaction is rolled back and that same error is
   /// returned. A failed rollback is logged but never replaces the caller's
   /// error. If the commit itself fails, the transaction is rolled back and
   /// the commit error is returned.
   ///
   /// # Example
   ///
   /// ```no_run
   /// use dualstore_conn_mgr::{ConnectionManager, Error};
   ///
   /// # async fn example(db: &ConnectionManager) -> Result<(), Error> {
   /// let result: Result<(), Error> = db
   ///    .with_transaction(|lease| {
   ///       Box::pin(async move {
   ///          sqlx::query("DELETE FROM orders").execute(&mut **lease).await?;
   ///          Err(Error::DatabaseClosed)
   ///       })
   ///    })
   ///    .await;
   ///
   /// // The delete was rolled back and the original error came through
   /// assert!(matches!(result, Err(Error::DatabaseClosed)));
   /// # Ok(())
   /// # }
   /// ```
   pub async fn with_transaction<F, T, E>(&self, f: F) -> std::result::Result<T, E>
   where
      F: for<'c> FnOnce(&'c mut Lease) -> BoxFuture<'c, std::result::Result<T, E>>,
      E: From<Error>,
   {
      let mut lease = self.acquire().await?;
      lease.begin().await?;

      let outcome = f(&mut lease).await;

      match outcome {
         Ok(value) => {
            if let Err(commit_err) = lease.commit().await {
               if let Err(rollback_err) = lease.rollback().await {
                  error!("Rollback after failed commit also failed: {}", rollback_err);
               }
               return Err(commit_err.into());
            }
            Ok(value)
         }
         Err(e) => {
            if let Err(rollback_err) = lease.rollback().await {
               error!("Rollback failed: {}", rollback_err);
            }
            Err(e)
         }
      }
   }

   /// Check that the database answers a trivial query
   pub async fn ping(&self) -> Result<()> {
      self
         .with_connection(|lease| {
            Box::pin(async move {
               sqlx::query("SELECT 1").execute(&mut **lease).await?;
               Ok::<_, Error>(())
            })
         })
         .await
   }

   /// Apply pending migrations from the provided migrator
   ///
   /// SQLx tracks applied migrations, so this is safe to call multiple times.
   pub async fn run_migrations(&self, migrator: &Migrator) -> Result<()> {
      let mut lease = self.acquire().await?;
      migrator.run(&mut *lease).await?;
      Ok(())
   }

   /// Maximum number of leases that can be checked out at once
   pub fn capacity(&self) -> u32 {
      self.capacity
   }

   /// Number of leases currently checked out
   pub fn outstanding_leases(&self) -> usize {
      (self.capacity as usize).saturating_sub(self.leases.available_permits())
   }

   /// Path of the underlying database file
   pub fn path(&self) -> &Path {
      &self.path
   }

   /// Close the pool and clean up resources
   ///
   /// Waits for outstanding leases to come back, checkpoints the WAL and closes
   /// every connection. After calling close, any operation on this manager
   /// returns `Error::DatabaseClosed`.
   ///
   /// Note: Takes `Arc<Self>` to consume ownership, preventing use-after-close at compile time.
   pub async fn close(self: Arc<Self>) -> Result<()> {
      self.closed.store(true, Ordering::SeqCst);
      self.leases.close();

      if !is_memory_database(&self.path)
         && let Ok(mut conn) = self.pool.acquire().await
      {
         let _ = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&mut *conn)
            .await;
      }

      self.pool.close().await;

      Ok(())
   }

   /// Close the pool and delete all database files
   ///
   /// Deletes the database file and its WAL and SHM files. Use with caution!
   pub async fn remove(self: Arc<Self>) -> Result<()> {
      let path = self.path.clone();

      self.close().await?;

      // Remove main database file - propagate errors (file should exist)
      std::fs::remove_file(&path).map_err(Error::Io)?;

      // WAL and SHM files may not exist if nothing was ever written
      for suffix in ["-wal", "-shm"] {
         if let Err(e) = std::fs::remove_file(sidecar_path(&path, suffix))
            && e.kind() != std::io::ErrorKind::NotFound
         {
            return Err(Error::Io(e));
         }
      }

      Ok(())
   }
}

fn is_memory_database(path: &Path) -> bool {
   path.as_os_str() == ":memory:"
}

fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
   let mut name = OsString::from(path.as_os_str());
   name.push(suffix);
   PathBuf::from(name)
}
