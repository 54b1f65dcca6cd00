use std::path::{Path, PathBuf};
use std::sync::Arc;

use dualstore_toolkit::{
   ConnectionManager, ConnectionManagerConfig, DocumentStore, DocumentStoreConfig, HealthReport,
   MigrationCounts, MigrationOrchestrator, Mode, ModeResolver, RELATIONAL_SCHEMA, health,
};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::Result;

/// Both stores plus the migration orchestrator, shared by every command.
///
/// The relational pool is connected and its schema applied on first use.
/// The document store connects lazily on its own. Cloning shares the same
/// stores.
#[derive(Clone, Debug)]
pub struct DualStore {
   inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
   relational_path: PathBuf,
   relational_config: Option<ConnectionManagerConfig>,
   relational: OnceCell<Arc<ConnectionManager>>,
   documents: Arc<DocumentStore>,
   orchestrator: OnceCell<MigrationOrchestrator>,
}

impl DualStore {
   /// Create the handles. Does not touch either database.
   pub fn new(
      relational_path: impl Into<PathBuf>,
      relational_config: Option<ConnectionManagerConfig>,
      document_path: impl Into<PathBuf>,
      document_config: Option<DocumentStoreConfig>,
   ) -> Self {
      Self {
         inner: Arc::new(Inner {
            relational_path: relational_path.into(),
            relational_config,
            relational: OnceCell::new(),
            documents: Arc::new(DocumentStore::new(document_path, document_config)),
            orchestrator: OnceCell::new(),
         }),
      }
   }

   /// The relational pool, connecting and applying the schema on first call.
   pub async fn relational(&self) -> Result<Arc<ConnectionManager>> {
      let db = self
         .inner
         .relational
         .get_or_try_init(|| async {
            let db = ConnectionManager::connect(
               &self.inner.relational_path,
               self.inner.relational_config.clone(),
            )
            .await?;
            db.run_migrations(&RELATIONAL_SCHEMA).await?;
            info!(
               "Relational store ready at {}",
               self.inner.relational_path.display()
            );
            Ok::<_, crate::Error>(db)
         })
         .await?;

      Ok(Arc::clone(db))
   }

   pub fn documents(&self) -> &Arc<DocumentStore> {
      &self.inner.documents
   }

   pub fn relational_path(&self) -> &Path {
      &self.inner.relational_path
   }

   /// Connect both stores and make sure the document indexes exist.
   pub async fn start(&self) -> Result<()> {
      self.relational().await?;
      self.inner.documents.ensure_indexes().await?;
      debug!("Dual store started");
      Ok(())
   }

   /// Run one relational-to-document migration.
   pub async fn migrate(&self) -> Result<MigrationCounts> {
      let relational = self.relational().await?;
      let orchestrator = self
         .inner
         .orchestrator
         .get_or_init(|| async move {
            MigrationOrchestrator::new(relational, Arc::clone(&self.inner.documents))
         })
         .await;

      Ok(orchestrator.migrate().await?)
   }

   pub async fn current_mode(&self) -> Result<Mode> {
      Ok(ModeResolver::new(Arc::clone(&self.inner.documents))
         .current_mode()
         .await?)
   }

   pub async fn health(&self) -> Result<HealthReport> {
      let relational = self.relational().await?;
      Ok(health::check(&relational, &self.inner.documents).await?)
   }

   /// Close both stores. Later calls fail with a closed-store error.
   pub async fn close(&self) -> Result<()> {
      if let Some(relational) = self.inner.relational.get() {
         Arc::clone(relational).close().await?;
      }

      if let Err(e) = self.inner.documents.close().await {
         warn!("Error closing document store: {}", e);
      }

      debug!("Dual store closed");
      Ok(())
   }
}
