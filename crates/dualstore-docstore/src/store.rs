//! Process-wide document store handle

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::DocumentStoreConfig;
use crate::database::DocumentDatabase;
use crate::index::{IndexModel, SortOrder};
use crate::{Error, Result};

/// Collection names used by the food-ordering document model.
pub mod collections {
   pub const RESTAURANTS: &str = "restaurants";
   pub const PEOPLE: &str = "people";
   pub const ORDERS: &str = "orders";
   /// Holds the singleton migration marker
   pub const META: &str = "meta";
}

/// Index names maintained on the `orders` collection.
pub mod indexes {
   /// Uniqueness of the numeric `orderId`
   pub const ORDER_ID_UNIQUE: &str = "idx_orders_orderId_unique";
   /// Rider report: rider email, creation time, delivery status, assignment time
   pub const RIDER_REPORT: &str = "idx_orders_rider_report";
   /// Restaurant report: restaurant name, creation time
   pub const RESTAURANT_REPORT: &str = "idx_orders_restaurant_report";
   /// Earlier name of the rider report index, removed when found
   pub const SUPERSEDED_RIDER_REPORT: &str = "idx_orders_delivery_rider_date_status";
}

/// The indexes [`DocumentStore::ensure_indexes`] keeps on `orders`.
pub fn required_indexes() -> Vec<IndexModel> {
   vec![
      IndexModel::new(indexes::ORDER_ID_UNIQUE)
         .key("orderId", SortOrder::Ascending)
         .unique(),
      IndexModel::new(indexes::RIDER_REPORT)
         .key("delivery.rider.email", SortOrder::Ascending)
         .key("createdAt", SortOrder::Descending)
         .key("delivery.deliveryStatus", SortOrder::Ascending)
         .key("delivery.assignedAt", SortOrder::Descending),
      IndexModel::new(indexes::RESTAURANT_REPORT)
         .key("restaurant.name", SortOrder::Ascending)
         .key("createdAt", SortOrder::Descending),
   ]
}

/// Handle to the document database.
///
/// Construct it once at startup and share it (typically behind an `Arc`)
/// with everything that talks to the document store. No connection is made
/// until the first [`get`](Self::get); that call creates the client and every
/// later call returns the same one. Concurrent first calls wait on a single
/// initializer instead of racing to create clients of their own.
///
/// ```no_run
/// use dualstore_docstore::DocumentStore;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), dualstore_docstore::Error> {
/// let store = Arc::new(DocumentStore::new("documents.db", None));
///
/// let a = store.get().await?;
/// let b = store.get().await?;
/// assert!(a.ptr_eq(&b));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DocumentStore {
   path: PathBuf,
   config: DocumentStoreConfig,
   database: OnceCell<DocumentDatabase>,
   closed: AtomicBool,
}

impl DocumentStore {
   /// Create the handle. Does not touch the database.
   pub fn new(path: impl Into<PathBuf>, custom_config: Option<DocumentStoreConfig>) -> Self {
      Self {
         path: path.into(),
         config: custom_config.unwrap_or_default(),
         database: OnceCell::new(),
         closed: AtomicBool::new(false),
      }
   }

   /// Get the connected database, connecting on the first call.
   ///
   /// The first successful call also runs [`ensure_indexes`](Self::ensure_indexes),
   /// so the `orderId` uniqueness constraint is in place before any caller can
   /// write an order. A failed first call leaves the handle unconnected and
   /// the next call tries again.
   pub async fn get(&self) -> Result<DocumentDatabase> {
      if self.closed.load(Ordering::SeqCst) {
         return Err(Error::Closed);
      }

      let db = self
         .database
         .get_or_try_init(|| async {
            let db = DocumentDatabase::open(&self.path, &self.config).await?;
            apply_indexes(&db).await?;
            info!("Document store connected at {}", self.path.display());
            Ok::<_, Error>(db)
         })
         .await?;

      Ok(db.clone())
   }

   /// Make sure the `orders` indexes match [`required_indexes`].
   ///
   /// Existing indexes are left alone and the superseded rider index is
   /// dropped if present. Safe to call on every start and before every health
   /// check, including while other requests read and write.
   pub async fn ensure_indexes(&self) -> Result<()> {
      let db = self.get().await?;
      apply_indexes(&db).await
   }

   /// Whether the client has been created.
   pub fn is_connected(&self) -> bool {
      self.database.initialized()
   }

   pub fn path(&self) -> &Path {
      &self.path
   }

   /// Close the client if it was ever created.
   ///
   /// After calling close, [`get`](Self::get) returns [`Error::Closed`].
   pub async fn close(&self) -> Result<()> {
      self.closed.store(true, Ordering::SeqCst);

      if let Some(db) = self.database.get() {
         db.close().await;
         debug!("Document store closed");
      }

      Ok(())
   }
}

async fn apply_indexes(db: &DocumentDatabase) -> Result<()> {
   let orders = db.collection(collections::ORDERS)?;

   match orders.drop_index(indexes::SUPERSEDED_RIDER_REPORT).await {
      Ok(()) => info!("Dropped superseded index {}", indexes::SUPERSEDED_RIDER_REPORT),
      Err(Error::IndexNotFound { .. }) => {}
      Err(e) => return Err(e),
   }

   for index in required_indexes() {
      orders.create_index(&index).await?;
   }

   Ok(())
}
