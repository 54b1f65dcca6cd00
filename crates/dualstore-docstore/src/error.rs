/// Result type alias for document store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for document store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from SQLx operations.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// Document could not be encoded to or decoded from JSON.
   #[error(transparent)]
   Json(#[from] serde_json::Error),

   /// I/O error when accessing database files.
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),

   /// Collection, index or field name that cannot be used.
   #[error("invalid name '{0}': use ASCII letters, digits and underscores, not starting with a digit")]
   InvalidName(String),

   /// Value that is not a storable document.
   #[error("invalid document: {0}")]
   InvalidDocument(String),

   /// A write collided with an existing `_id` or a unique index.
   #[error("duplicate key in collection '{collection}': {message}")]
   DuplicateKey { collection: String, message: String },

   /// Index to drop does not exist.
   #[error("index '{name}' not found on collection '{collection}'")]
   IndexNotFound { collection: String, name: String },

   /// Creating or dropping an index failed for a reason other than absence.
   #[error("index '{name}' maintenance failed: {source}")]
   IndexMaintenance {
      name: String,
      #[source]
      source: sqlx::Error,
   },

   /// The store has been closed.
   #[error("document store has been closed")]
   Closed,
}

impl Error {
   /// Extract a structured error code from the error type.
   pub fn error_code(&self) -> String {
      match self {
         Error::Sqlx(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
         Error::Json(_) => "JSON_ERROR".to_string(),
         Error::Io(_) => "IO_ERROR".to_string(),
         Error::InvalidName(_) => "INVALID_NAME".to_string(),
         Error::InvalidDocument(_) => "INVALID_DOCUMENT".to_string(),
         Error::DuplicateKey { .. } => "DUPLICATE_KEY".to_string(),
         Error::IndexNotFound { .. } => "INDEX_NOT_FOUND".to_string(),
         Error::IndexMaintenance { .. } => "INDEX_MAINTENANCE".to_string(),
         Error::Closed => "DOCUMENT_STORE_CLOSED".to_string(),
      }
   }

   /// True for a write rejected because the key is already taken.
   pub fn is_duplicate_key(&self) -> bool {
      matches!(self, Error::DuplicateKey { .. })
   }

   /// Turn a write failure into [`Error::DuplicateKey`] when the engine
   /// reports a unique violation.
   pub(crate) fn from_write(collection: &str, e: sqlx::Error) -> Self {
      if let Some(db_err) = e.as_database_error()
         && db_err.is_unique_violation()
      {
         return Error::DuplicateKey {
            collection: collection.to_string(),
            message: db_err.message().to_string(),
         };
      }
      Error::Sqlx(e)
   }
}
