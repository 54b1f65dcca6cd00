//! Configuration for the document store connection

use serde::{Deserialize, Serialize};

/// Configuration for a [`DocumentStore`](crate::DocumentStore)
///
/// ```
/// use dualstore_docstore::DocumentStoreConfig;
///
/// let config = DocumentStoreConfig {
///     max_connections: 2,
///     ..Default::default()
/// };
/// assert_eq!(config.busy_timeout_secs, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStoreConfig {
   /// Connections kept by the single shared client
   ///
   /// The client is created once per [`DocumentStore`](crate::DocumentStore)
   /// and keeps at least one connection open for its whole lifetime.
   ///
   /// Default: 4
   pub max_connections: u32,

   /// How long SQLite waits on a locked database before returning `SQLITE_BUSY`
   ///
   /// Default: 5
   pub busy_timeout_secs: u64,
}

impl Default for DocumentStoreConfig {
   fn default() -> Self {
      Self {
         max_connections: 4,
         busy_timeout_secs: 5,
      }
   }
}
