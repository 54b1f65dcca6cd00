//! Which store is authoritative for reporting

use std::fmt;
use std::sync::Arc;

use dualstore_docstore::{DocumentDatabase, DocumentStore, collections};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::Result;
use crate::model::MARKER_ID;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
   Relational,
   Document,
}

impl Mode {
   /// Document mode needs both a marker with a non-empty `lastMigrationAt`
   /// and at least one order document. A stale marker left over after the
   /// orders were removed resolves to relational.
   pub fn resolve(marker: Option<&JsonValue>, order_count: u64) -> Mode {
      let stamped = marker
         .and_then(|m| m.get("lastMigrationAt"))
         .and_then(JsonValue::as_str)
         .is_some_and(|ts| !ts.is_empty());

      if stamped && order_count > 0 {
         Mode::Document
      } else {
         Mode::Relational
      }
   }

   pub fn as_str(self) -> &'static str {
      match self {
         Mode::Relational => "relational",
         Mode::Document => "document",
      }
   }
}

impl fmt::Display for Mode {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

/// Recomputes the [`Mode`] from document store state on every call.
#[derive(Debug, Clone)]
pub struct ModeResolver {
   documents: Arc<DocumentStore>,
}

impl ModeResolver {
   pub fn new(documents: Arc<DocumentStore>) -> Self {
      Self { documents }
   }

   pub async fn current_mode(&self) -> Result<Mode> {
      let db = self.documents.get().await?;
      let marker = read_marker(&db).await?;
      let orders = db.collection(collections::ORDERS)?.count_documents().await?;

      Ok(Mode::resolve(marker.as_ref(), orders))
   }
}

/// The raw migration marker without its `_id`, or `None` when absent.
pub(crate) async fn read_marker(db: &DocumentDatabase) -> Result<Option<JsonValue>> {
   let marker: Option<JsonValue> = db
      .collection(collections::META)?
      .find_by_id(MARKER_ID)
      .await?;

   Ok(marker.map(|mut m| {
      if let Some(fields) = m.as_object_mut() {
         fields.remove("_id");
      }
      m
   }))
}
