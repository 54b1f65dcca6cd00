use serde::Serialize;

/// Result type alias for toolkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for migration, mode resolution and health checks.
///
/// Errors from the stores are carried unchanged so their original message
/// reaches the caller. Use [`Error::kind`] to classify one.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from a statement run on a leased relational connection.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// Error from the relational connection manager.
   #[error(transparent)]
   ConnectionManager(#[from] dualstore_conn_mgr::Error),

   /// Error from the document store.
   #[error(transparent)]
   DocumentStore(#[from] dualstore_docstore::Error),

   /// The relational snapshot refers to a row that is not in it.
   #[error("inconsistent relational snapshot: {0}")]
   InconsistentSnapshot(String),

   /// Another migration is already running in this process.
   #[error("a migration is already in progress")]
   MigrationInProgress,
}

/// Broad classes of failure, used to pick a status at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
   /// No connection could be leased, or the pool is gone.
   Lease,
   /// A unit of work failed inside a relational transaction.
   Transaction,
   /// A document write collided with an existing key.
   DuplicateKey,
   /// Creating or dropping an index failed.
   IndexMaintenance,
   /// The relational data could not be turned into documents.
   Snapshot,
   /// The operation is already running.
   Busy,
   Other,
}

impl ErrorKind {
   /// Status reported to callers of the external interface.
   pub fn status_code(self) -> u16 {
      match self {
         ErrorKind::Lease => 503,
         ErrorKind::DuplicateKey | ErrorKind::Busy => 409,
         ErrorKind::Transaction
         | ErrorKind::IndexMaintenance
         | ErrorKind::Snapshot
         | ErrorKind::Other => 500,
      }
   }

   pub fn as_str(self) -> &'static str {
      match self {
         ErrorKind::Lease => "lease",
         ErrorKind::Transaction => "transaction",
         ErrorKind::DuplicateKey => "duplicate_key",
         ErrorKind::IndexMaintenance => "index_maintenance",
         ErrorKind::Snapshot => "snapshot",
         ErrorKind::Busy => "busy",
         ErrorKind::Other => "other",
      }
   }
}

impl Error {
   pub fn kind(&self) -> ErrorKind {
      match self {
         Error::ConnectionManager(e) if e.is_lease_error() => ErrorKind::Lease,
         Error::ConnectionManager(_) => ErrorKind::Transaction,
         Error::Sqlx(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed) => ErrorKind::Lease,
         Error::Sqlx(_) => ErrorKind::Transaction,
         Error::DocumentStore(e) => match e {
            dualstore_docstore::Error::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            dualstore_docstore::Error::IndexMaintenance { .. }
            | dualstore_docstore::Error::IndexNotFound { .. } => ErrorKind::IndexMaintenance,
            _ => ErrorKind::Other,
         },
         Error::InconsistentSnapshot(_) => ErrorKind::Snapshot,
         Error::MigrationInProgress => ErrorKind::Busy,
      }
   }

   /// True when a document write hit an existing key, which during migration
   /// means the data was already migrated.
   pub fn is_duplicate_key(&self) -> bool {
      self.kind() == ErrorKind::DuplicateKey
   }

   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::Sqlx(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
         Error::ConnectionManager(_) => "CONNECTION_ERROR".to_string(),
         Error::DocumentStore(e) => e.error_code(),
         Error::InconsistentSnapshot(_) => "INCONSISTENT_SNAPSHOT".to_string(),
         Error::MigrationInProgress => "MIGRATION_IN_PROGRESS".to_string(),
      }
   }
}
