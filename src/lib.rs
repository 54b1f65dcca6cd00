use dualstore_toolkit::{ConnectionManagerConfig, DocumentStoreConfig, MigrationCounts};
use serde::Serialize;
use tauri::{Manager, RunEvent, Runtime, plugin::Builder as PluginBuilder};
use tracing::{debug, error, info, warn};

mod commands;
mod error;
mod resolve;
mod store;

pub use commands::MigrateResponse;
pub use error::{Error, Result};
pub use store::DualStore;

/// Default relational database file, relative to the app config directory.
pub const DEFAULT_RELATIONAL_PATH: &str = "relational.db";

/// Default document database file, relative to the app config directory.
pub const DEFAULT_DOCUMENT_PATH: &str = "documents.db";

/// Event payload emitted on `dualstore:migration`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationEvent {
   /// Status: "running", "completed", "failed"
   pub status: String,
   /// Documents written per entity (on "completed")
   #[serde(skip_serializing_if = "Option::is_none")]
   pub migrated: Option<MigrationCounts>,
   /// Error message (on "failed")
   #[serde(skip_serializing_if = "Option::is_none")]
   pub error: Option<String>,
}

impl MigrationEvent {
   pub fn running() -> Self {
      Self {
         status: "running".to_string(),
         migrated: None,
         error: None,
      }
   }

   pub fn completed(migrated: MigrationCounts) -> Self {
      Self {
         status: "completed".to_string(),
         migrated: Some(migrated),
         error: None,
      }
   }

   pub fn failed(error: String) -> Self {
      Self {
         status: "failed".to_string(),
         migrated: None,
         error: Some(error),
      }
   }
}

/// Builder for the dual-store plugin.
///
/// Use this to configure the plugin and build the plugin instance.
///
/// # Example
///
/// ```ignore
/// // Note: This example uses `ignore` instead of `no_run` because
/// // tauri::generate_context!() requires tauri.conf.json at compile time,
/// // which cannot be provided in doc test environments.
/// use tauri_plugin_dualstore::Builder;
///
/// # fn main() {
/// tauri::Builder::default()
///     .plugin(
///         Builder::new()
///             .relational_path("food.db")
///             .document_path("food-documents.db")
///             .build()
///     )
///     .run(tauri::generate_context!())
///     .expect("error while running tauri application");
/// # }
/// ```
pub struct Builder {
   relational_path: String,
   relational_config: Option<ConnectionManagerConfig>,
   document_path: String,
   document_config: Option<DocumentStoreConfig>,
}

impl Default for Builder {
   fn default() -> Self {
      Self::new()
   }
}

impl Builder {
   /// Create a new builder instance.
   pub fn new() -> Self {
      Self {
         relational_path: DEFAULT_RELATIONAL_PATH.to_string(),
         relational_config: None,
         document_path: DEFAULT_DOCUMENT_PATH.to_string(),
         document_config: None,
      }
   }

   /// Relational database path (relative to app config directory).
   pub fn relational_path(mut self, path: &str) -> Self {
      self.relational_path = path.to_string();
      self
   }

   /// Pool settings for the relational store.
   pub fn relational_config(mut self, config: ConnectionManagerConfig) -> Self {
      self.relational_config = Some(config);
      self
   }

   /// Document database path (relative to app config directory).
   pub fn document_path(mut self, path: &str) -> Self {
      self.document_path = path.to_string();
      self
   }

   /// Client settings for the document store.
   pub fn document_config(mut self, config: DocumentStoreConfig) -> Self {
      self.document_config = Some(config);
      self
   }

   /// Build the plugin with command registration and state management.
   pub fn build<R: Runtime>(self) -> tauri::plugin::TauriPlugin<R> {
      PluginBuilder::<R>::new("dualstore")
         .invoke_handler(tauri::generate_handler![
            commands::migrate_to_document_store,
            commands::health,
         ])
         .setup(move |app, _api| {
            let relational_path = resolve::resolve_database_path(&self.relational_path, app)?;
            let document_path = resolve::resolve_database_path(&self.document_path, app)?;

            let store = DualStore::new(
               relational_path,
               self.relational_config.clone(),
               document_path,
               self.document_config.clone(),
            );
            app.manage(store.clone());

            // Connect both stores and set up indexes in the background
            tauri::async_runtime::spawn(async move {
               match store.start().await {
                  Ok(()) => info!("Dual-store plugin ready"),
                  Err(e) => error!("Dual-store startup failed: {}", e),
               }
            });

            debug!("Dual-store plugin initialized");
            Ok(())
         })
         .on_event(|app, event| match event {
            RunEvent::ExitRequested { api, code, .. } => {
               info!("App exit requested (code: {:?}) - closing stores", code);

               // Prevent immediate exit so we can close connections and checkpoint WAL
               api.prevent_exit();

               let app_handle = app.clone();

               let handle = match tokio::runtime::Handle::try_current() {
                  Ok(h) => h,
                  Err(_) => {
                     warn!("No tokio runtime available for cleanup");
                     app_handle.exit(code.unwrap_or(0));
                     return;
                  }
               };

               let store = app.state::<DualStore>().inner().clone();

               // Close on a separate thread (block_in_place panics on current_thread runtime)
               let cleanup_result = std::thread::spawn(move || {
                  handle.block_on(async {
                     let timeout_result =
                        tokio::time::timeout(std::time::Duration::from_secs(5), store.close()).await;

                     match timeout_result {
                        Ok(Ok(())) => debug!("Store cleanup complete"),
                        Ok(Err(e)) => warn!("Error closing stores: {}", e),
                        Err(_) => warn!("Store cleanup timed out after 5 seconds"),
                     }
                  })
               })
               .join();

               if let Err(e) = cleanup_result {
                  error!("Store cleanup thread panicked: {:?}", e);
               }

               app_handle.exit(code.unwrap_or(0));
            }
            RunEvent::Exit => {
               debug!("Exit event: stores already closed");
            }
            _ => {
               // Other events don't require action
            }
         })
         .build()
   }
}

/// Initializes the plugin with default configuration.
pub fn init<R: Runtime>() -> tauri::plugin::TauriPlugin<R> {
   Builder::new().build()
}
