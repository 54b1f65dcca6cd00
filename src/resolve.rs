use std::fs::create_dir_all;
use std::path::PathBuf;

use tauri::{AppHandle, Manager, Runtime};

use crate::Error;

/// Resolve a database file path relative to the app config directory.
///
/// Paths are joined to `app_config_dir()` (e.g., `Library/Application Support/${bundleIdentifier}` on iOS).
/// `:memory:` is passed through unchanged.
pub fn resolve_database_path<R: Runtime>(path: &str, app: &AppHandle<R>) -> Result<PathBuf, Error> {
   if path == ":memory:" {
      return Ok(PathBuf::from(path));
   }

   if path.is_empty() {
      return Err(Error::InvalidPath("database path cannot be empty".to_string()));
   }

   let app_path = app
      .path()
      .app_config_dir()
      .map_err(|_| Error::InvalidPath("No app config path found".to_string()))?;

   create_dir_all(&app_path)?;

   Ok(app_path.join(path))
}
