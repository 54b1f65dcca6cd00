use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use tracing::debug;

use crate::collection::Collection;
use crate::config::DocumentStoreConfig;
use crate::index::validate_name;
use crate::{Error, Result};

/// A connected document database.
///
/// Cloning is cheap: every clone shares the same client and connections.
/// Obtain one through [`DocumentStore::get`](crate::DocumentStore::get).
#[derive(Clone, Debug)]
pub struct DocumentDatabase {
   inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
   pool: Pool<Sqlite>,
   /// Collections whose table is known to exist
   collections: Mutex<HashSet<String>>,
   path: PathBuf,
}

impl DocumentDatabase {
   pub(crate) async fn open(path: &Path, config: &DocumentStoreConfig) -> Result<Self> {
      if path.as_os_str().is_empty() {
         return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Document store path cannot be empty",
         )));
      }

      let memory = path.as_os_str() == ":memory:";

      let mut options = SqliteConnectOptions::new()
         .filename(path)
         .create_if_missing(true)
         .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

      if !memory {
         options = options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
      }

      // Long-lived client: keep a connection open and never idle it out
      let pool = SqlitePoolOptions::new()
         .max_connections(if memory { 1 } else { config.max_connections.max(1) })
         .min_connections(1)
         .idle_timeout(None)
         .max_lifetime(None)
         .connect_with(options)
         .await?;

      debug!("Opened document store client on {}", path.display());

      Ok(Self {
         inner: Arc::new(Inner {
            pool,
            collections: Mutex::new(HashSet::new()),
            path: path.to_path_buf(),
         }),
      })
   }

   /// Get a handle to a collection.
   ///
   /// The name is validated here; the collection itself is created on first use.
   pub fn collection(&self, name: &str) -> Result<Collection<'_>> {
      validate_name(name)?;
      Ok(Collection::new(self, name.to_string()))
   }

   /// Names of the collections that currently exist, sorted.
   pub async fn list_collection_names(&self) -> Result<Vec<String>> {
      let rows: Vec<(String,)> = sqlx::query_as(
         "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
      )
      .fetch_all(&self.inner.pool)
      .await?;

      Ok(rows.into_iter().map(|(name,)| name).collect())
   }

   /// Whether two handles share the same underlying client.
   pub fn ptr_eq(&self, other: &DocumentDatabase) -> bool {
      Arc::ptr_eq(&self.inner, &other.inner)
   }

   pub fn path(&self) -> &Path {
      &self.inner.path
   }

   pub(crate) fn pool(&self) -> &Pool<Sqlite> {
      &self.inner.pool
   }

   /// Create the table backing `name` unless this client already has.
   pub(crate) async fn ensure_collection(&self, name: &str) -> Result<()> {
      if self.inner.collections.lock().contains(name) {
         return Ok(());
      }

      let sql = format!(
         r#"CREATE TABLE IF NOT EXISTS "{name}" (
            _id TEXT PRIMARY KEY NOT NULL,
            doc TEXT NOT NULL CHECK (json_valid(doc))
         )"#
      );
      sqlx::query(&sql).execute(&self.inner.pool).await?;

      self.inner.collections.lock().insert(name.to_string());
      Ok(())
   }

   pub(crate) async fn close(&self) {
      self.inner.pool.close().await;
   }
}
