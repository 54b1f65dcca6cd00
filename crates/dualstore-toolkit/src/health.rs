use dualstore_conn_mgr::ConnectionManager;
use dualstore_docstore::{DocumentStore, collections};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::Result;
use crate::mode::{Mode, read_marker};

/// Read-only status of both stores and the resolved mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
   pub ok: bool,
   pub active_mode: Mode,
   pub relational: RelationalStatus,
   pub document: DocumentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationalStatus {
   pub ok: bool,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentStatus {
   pub ok: bool,
   /// Document count per collection, in a fixed order
   pub counts: IndexMap<String, u64>,
   /// Raw migration marker, `null` when no migration has completed
   pub migration: Option<JsonValue>,
}

/// Check both stores.
///
/// An unreachable relational store is reported in the result rather than
/// returned as an error. The document store's indexes are ensured first, so
/// a health check also repairs a missing index.
pub async fn check(relational: &ConnectionManager, documents: &DocumentStore) -> Result<HealthReport> {
   let relational = match relational.ping().await {
      Ok(()) => RelationalStatus {
         ok: true,
         error: None,
      },
      Err(e) => {
         warn!("Relational store unreachable: {}", e);
         RelationalStatus {
            ok: false,
            error: Some(e.to_string()),
         }
      }
   };

   documents.ensure_indexes().await?;
   let db = documents.get().await?;

   let mut counts = IndexMap::new();
   for name in [collections::RESTAURANTS, collections::PEOPLE, collections::ORDERS] {
      let count = db.collection(name)?.count_documents().await?;
      counts.insert(name.to_string(), count);
   }

   let migration = read_marker(&db).await?;
   let orders = counts.get(collections::ORDERS).copied().unwrap_or(0);
   let active_mode = Mode::resolve(migration.as_ref(), orders);

   Ok(HealthReport {
      ok: relational.ok,
      active_mode,
      relational,
      document: DocumentStatus {
         ok: true,
         counts,
         migration,
      },
   })
}
