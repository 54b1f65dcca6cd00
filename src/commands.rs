//! Dual-store plugin commands
//!
//! This module implements the Tauri command handlers that the frontend calls.
//! Both commands work on the [`DualStore`] managed by the plugin.

use dualstore_toolkit::{HealthReport, MigrationCounts};
use serde::Serialize;
use tauri::{AppHandle, Emitter, Runtime, State};
use tracing::{error, info, warn};

use crate::{DualStore, MigrationEvent, Result};

/// Response of a successful migration.
#[derive(Debug, Clone, Serialize)]
pub struct MigrateResponse {
   pub ok: bool,
   pub migrated: MigrationCounts,
}

/// Copy the current relational snapshot into the document store.
///
/// Takes no input. Emits `dualstore:migration` events as the run starts and
/// finishes. Any failure fails the whole command; a re-run over orders that
/// were already migrated fails with a duplicate key error.
#[tauri::command]
pub async fn migrate_to_document_store<R: Runtime>(
   app: AppHandle<R>,
   store: State<'_, DualStore>,
) -> Result<MigrateResponse> {
   emit_migration_event(&app, MigrationEvent::running());

   match store.migrate().await {
      Ok(migrated) => {
         info!("Migration to document store completed");
         emit_migration_event(&app, MigrationEvent::completed(migrated));
         Ok(MigrateResponse { ok: true, migrated })
      }
      Err(e) => {
         error!("Migration to document store failed: {}", e);
         emit_migration_event(&app, MigrationEvent::failed(e.to_string()));
         Err(e)
      }
   }
}

/// Report store reachability, document counts, the migration marker and
/// the resolved mode.
#[tauri::command]
pub async fn health(store: State<'_, DualStore>) -> Result<HealthReport> {
   store.health().await
}

fn emit_migration_event<R: Runtime>(app: &AppHandle<R>, event: MigrationEvent) {
   if let Err(e) = app.emit("dualstore:migration", &event) {
      warn!("Failed to emit migration event: {}", e);
   }
}
