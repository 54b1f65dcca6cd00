//! Schema-flexible JSON document collections stored in SQLite.
//!
//! Each collection is a table keyed by the document's `_id` with the document
//! body kept as JSON. Secondary indexes are SQLite expression indexes over
//! `json_extract`, so uniqueness constraints are enforced by the engine and
//! survive restarts like any other index metadata.
//!
//! - [`DocumentStore`]: process-wide handle; connects on first use, exactly once
//! - [`DocumentDatabase`]: a connected database, cheap to clone
//! - [`Collection`]: insert, replace, find, count and index operations
//! - [`IndexModel`]: declarative index definitions
//!
//! # Example
//!
//! ```no_run
//! use dualstore_docstore::{DocumentStore, collections};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), dualstore_docstore::Error> {
//! let store = DocumentStore::new("documents.db", None);
//!
//! // First call connects and sets up the order indexes
//! let db = store.get().await?;
//!
//! let orders = db.collection(collections::ORDERS)?;
//! orders.insert_one(&json!({ "orderId": 1, "status": "created" })).await?;
//! assert_eq!(orders.count_documents().await?, 1);
//!
//! store.close().await?;
//! # Ok(())
//! # }
//! ```

mod collection;
mod config;
mod database;
mod error;
mod index;
mod store;

pub use collection::{Collection, Document};
pub use config::DocumentStoreConfig;
pub use database::DocumentDatabase;
pub use error::{Error, Result};
pub use index::{IndexKey, IndexModel, SortOrder};
pub use store::{DocumentStore, collections, indexes, required_indexes};
