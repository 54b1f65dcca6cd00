//! Relational-to-document migration and store status for the food-ordering core.
//!
//! This crate sits on top of the relational connection manager
//! (`dualstore-conn-mgr`) and the document store (`dualstore-docstore`) and
//! provides:
//!
//! - [`RELATIONAL_SCHEMA`]: the fixed relational source schema
//! - [`RelationalSnapshot`]: a consistent read of every entity table
//! - [`transform::to_documents`]: the denormalizing relational-to-document transform
//! - [`MigrationOrchestrator`]: the "migrate now" operation
//! - [`ModeResolver`] and [`Mode`]: which store is authoritative for reporting
//! - [`health::check`]: the composite health report
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dualstore_conn_mgr::ConnectionManager;
//! use dualstore_docstore::DocumentStore;
//! use dualstore_toolkit::{MigrationOrchestrator, ModeResolver, Mode, RELATIONAL_SCHEMA, health};
//!
//! # async fn example() -> Result<(), dualstore_toolkit::Error> {
//! let relational = ConnectionManager::connect("orders.db", None).await?;
//! relational.run_migrations(&RELATIONAL_SCHEMA).await?;
//!
//! let documents = Arc::new(DocumentStore::new("documents.db", None));
//!
//! let orchestrator = MigrationOrchestrator::new(Arc::clone(&relational), Arc::clone(&documents));
//! let counts = orchestrator.migrate().await?;
//!
//! let mode = ModeResolver::new(Arc::clone(&documents)).current_mode().await?;
//! if counts.orders > 0 {
//!    assert_eq!(mode, Mode::Document);
//! }
//!
//! let report = health::check(&relational, &documents).await?;
//! assert_eq!(report.active_mode, mode);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod health;
pub mod migration;
pub mod mode;
pub mod model;
pub mod snapshot;
pub mod transform;

pub use error::{Error, ErrorKind, Result};
pub use health::{DocumentStatus, HealthReport, RelationalStatus};
pub use migration::MigrationOrchestrator;
pub use mode::{Mode, ModeResolver};
pub use model::{MARKER_ID, MigrationCounts, MigrationMarker};
pub use snapshot::RelationalSnapshot;

// Re-export commonly used types from the store crates
pub use dualstore_conn_mgr::{ConnectionManager, ConnectionManagerConfig, Migrator};
pub use dualstore_docstore::{DocumentStore, DocumentStoreConfig};

/// The relational source schema, applied with
/// [`ConnectionManager::run_migrations`].
pub static RELATIONAL_SCHEMA: Migrator = sqlx::migrate!("./migrations");
