//! Configuration for the relational connection pool

use serde::{Deserialize, Serialize};

/// Configuration for a [`ConnectionManager`](crate::ConnectionManager)
///
/// # Examples
///
/// ```
/// use dualstore_conn_mgr::ConnectionManagerConfig;
///
/// // Use defaults
/// let config = ConnectionManagerConfig::default();
/// assert_eq!(config.max_connections, 10);
///
/// // Override just one field
/// let config = ConnectionManagerConfig {
///     max_connections: 4,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionManagerConfig {
   /// Maximum number of leases that may be checked out at once
   ///
   /// This is also the size of the underlying connection pool. Callers that
   /// ask for a lease while all of them are out wait until one is released.
   ///
   /// Default: 10
   pub max_connections: u32,

   /// Idle timeout for pooled connections (in seconds)
   ///
   /// Connections that sit in the pool unused for this long are closed.
   /// Ignored for `:memory:` databases, whose only connection must stay open.
   ///
   /// Default: 30
   pub idle_timeout_secs: u64,

   /// How long SQLite waits on a locked database before returning `SQLITE_BUSY`
   ///
   /// Default: 5
   pub busy_timeout_secs: u64,
}

impl Default for ConnectionManagerConfig {
   fn default() -> Self {
      Self {
         max_connections: 10,
         idle_timeout_secs: 30,
         busy_timeout_secs: 5,
      }
   }
}
