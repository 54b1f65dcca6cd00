use std::sync::Arc;

use dualstore_conn_mgr::ConnectionManager;
use dualstore_docstore::{DocumentStore, collections};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::model::{DEFAULT_SOURCE, MARKER_ID, MigrationCounts, MigrationMarker};
use crate::snapshot::RelationalSnapshot;
use crate::{Error, Result, transform};

/// Copies the relational snapshot into the document store.
///
/// One orchestrator per process. It holds the two store handles and
/// refuses to start a second run while one is in flight.
///
/// ```no_run
/// use std::sync::Arc;
/// use dualstore_conn_mgr::ConnectionManager;
/// use dualstore_docstore::DocumentStore;
/// use dualstore_toolkit::MigrationOrchestrator;
///
/// # async fn example() -> Result<(), dualstore_toolkit::Error> {
/// let relational = ConnectionManager::connect("orders.db", None).await?;
/// let documents = Arc::new(DocumentStore::new("documents.db", None));
///
/// let orchestrator = MigrationOrchestrator::new(relational, documents);
/// let counts = orchestrator.migrate().await?;
/// println!("migrated {} orders", counts.orders);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MigrationOrchestrator {
   relational: Arc<ConnectionManager>,
   documents: Arc<DocumentStore>,
   source: String,
   running: Mutex<()>,
}

impl MigrationOrchestrator {
   pub fn new(relational: Arc<ConnectionManager>, documents: Arc<DocumentStore>) -> Self {
      Self {
         relational,
         documents,
         source: DEFAULT_SOURCE.to_string(),
         running: Mutex::new(()),
      }
   }

   /// Origin store identifier written to the marker's `source` field.
   pub fn with_source(mut self, source: impl Into<String>) -> Self {
      self.source = source.into();
      self
   }

   /// Run one migration.
   ///
   /// Reads every entity table inside a single relational transaction, then
   /// writes restaurants, people and orders in that order, then stamps the
   /// marker. Restaurants and people are upserted by key, and reference
   /// documents for rows no longer in the snapshot are removed. Orders are
   /// inserted, so a re-run over orders that were already migrated stops
   /// with a duplicate key error instead of writing them twice.
   ///
   /// The returned counts, like the marker's, are the documents present in
   /// each collection once the writes are done.
   ///
   /// The marker is written only after every entity write succeeded; on any
   /// earlier failure it keeps whatever value it had before.
   pub async fn migrate(&self) -> Result<MigrationCounts> {
      let _running = self.running.try_lock().map_err(|_| {
         warn!("Rejected migration request: another run is in progress");
         Error::MigrationInProgress
      })?;

      let snapshot = self
         .relational
         .with_transaction(|lease| {
            Box::pin(async move { Ok::<_, Error>(RelationalSnapshot::read(lease).await?) })
         })
         .await?;

      let docs = transform::to_documents(&snapshot)?;
      let written = docs.counts();

      let db = self.documents.get().await?;

      let restaurants = db.collection(collections::RESTAURANTS)?;
      for doc in &docs.restaurants {
         restaurants.replace_one(&doc.id, doc, true).await?;
      }
      let ids: Vec<String> = docs.restaurants.iter().map(|d| d.id.clone()).collect();
      let removed = restaurants.retain_ids(&ids).await?;
      debug!(
         "Wrote {} restaurant documents, removed {} stale",
         written.restaurants, removed
      );

      let people = db.collection(collections::PEOPLE)?;
      for doc in &docs.people {
         people.replace_one(&doc.id, doc, true).await?;
      }
      let ids: Vec<String> = docs.people.iter().map(|d| d.id.clone()).collect();
      let removed = people.retain_ids(&ids).await?;
      debug!("Wrote {} people documents, removed {} stale", written.people, removed);

      let orders = db.collection(collections::ORDERS)?;
      orders.insert_many(&docs.orders).await?;
      debug!("Wrote {} order documents", written.orders);

      // The marker records what the collections hold now
      let counts = MigrationCounts {
         restaurants: restaurants.count_documents().await?,
         people: people.count_documents().await?,
         orders: orders.count_documents().await?,
      };

      let marker = MigrationMarker {
         source: self.source.clone(),
         last_migration_at: OffsetDateTime::now_utc(),
         migrated: counts,
      };
      db.collection(collections::META)?
         .replace_one(MARKER_ID, &marker, true)
         .await?;

      info!(
         "Migration from {} complete: {} restaurants, {} people, {} orders",
         self.source, counts.restaurants, counts.people, counts.orders
      );

      Ok(counts)
   }
}
