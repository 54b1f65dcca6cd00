use dualstore_toolkit::ErrorKind;
use serde::{Serialize, Serializer};

/// Result type alias for plugin operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error response for frontend.
#[derive(Serialize)]
struct ErrorResponse {
   code: String,
   kind: ErrorKind,
   status: u16,
   message: String,
}

/// Error types for the dual-store plugin.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from migration, mode resolution, health checks or either store.
   #[error(transparent)]
   Toolkit(#[from] dualstore_toolkit::Error),

   /// Invalid database path provided.
   #[error("invalid database path: {0}")]
   InvalidPath(String),

   /// I/O error when accessing database files.
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),
}

impl From<dualstore_conn_mgr::Error> for Error {
   fn from(e: dualstore_conn_mgr::Error) -> Self {
      Error::Toolkit(e.into())
   }
}

impl From<dualstore_docstore::Error> for Error {
   fn from(e: dualstore_docstore::Error) -> Self {
      Error::Toolkit(e.into())
   }
}

impl Error {
   pub fn kind(&self) -> ErrorKind {
      match self {
         Error::Toolkit(e) => e.kind(),
         Error::InvalidPath(_) | Error::Io(_) => ErrorKind::Other,
      }
   }

   /// Status the boundary reports for this error.
   pub fn status_code(&self) -> u16 {
      self.kind().status_code()
   }

   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for frontend error handling.
   fn error_code(&self) -> String {
      match self {
         Error::Toolkit(e) => e.error_code(),
         Error::InvalidPath(_) => "INVALID_PATH".to_string(),
         Error::Io(_) => "IO_ERROR".to_string(),
      }
   }
}

impl Serialize for Error {
   fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
   where
      S: Serializer,
   {
      let response = ErrorResponse {
         code: self.error_code(),
         kind: self.kind(),
         status: self.status_code(),
         message: self.to_string(),
      };
      response.serialize(serializer)
   }
}
