//! Error types for dualstore-conn-mgr

use thiserror::Error;

/// Errors that may occur while leasing connections or running transactions
#[derive(Error, Debug)]
pub enum Error {
   /// IO error when accessing database files. Standard library IO errors
   /// are converted to this variant.
   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   /// Error from the sqlx library. Query, commit and connection failures all
   /// arrive here with the driver's original message.
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),

   /// Migration error from the sqlx migrate framework
   #[error("Migration error: {0}")]
   Migration(#[from] sqlx::migrate::MigrateError),

   /// Database has been closed and cannot be used
   #[error("Database has been closed")]
   DatabaseClosed,

   /// A pool needs room for at least one lease
   #[error("Invalid pool capacity {0}: must be at least 1")]
   InvalidCapacity(u32),
}

impl Error {
   /// True when the error comes from the pool or the lease budget rather than
   /// from a statement executed on a leased connection.
   pub fn is_lease_error(&self) -> bool {
      match self {
         Error::DatabaseClosed | Error::InvalidCapacity(_) => true,
         Error::Sqlx(e) => matches!(
            e,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
         ),
         _ => false,
      }
   }
}
