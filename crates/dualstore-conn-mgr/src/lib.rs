//! # dualstore-conn-mgr
//!
//! A bounded SQLite connection pool that hands out connections only through
//! scoped leases and scoped transactions.
//!
//! ## Core Types
//!
//! - **[`ConnectionManager`]**: Owns the pool and the lease budget
//! - **[`ConnectionManagerConfig`]**: Configuration for pool capacity and timeouts
//! - **[`Lease`]**: RAII guard for one checked-out connection
//! - **[`Migrator`]**: Re-exported from sqlx for applying the relational schema
//! - **[`Error`]**: Error type for pool and transaction operations
//!
//! ## Architecture
//!
//! - **Bounded leases**: At most `max_connections` leases exist at once. Callers
//!   past that bound wait for a lease to be released; there is no acquire timeout
//! - **Guaranteed release**: A [`Lease`] returns its connection and its slot on
//!   drop, so every exit path of a unit of work releases it exactly once
//! - **Scoped transactions**: [`ConnectionManager::with_transaction`] commits on
//!   `Ok`, rolls back on `Err` and hands the caller's error back untouched
//! - **No leaked transactions**: A lease dropped while its transaction is still
//!   open has it rolled back before the connection goes back to the pool
//!
//! ## Usage
//!
//! ```no_run
//! use dualstore_conn_mgr::{ConnectionManager, Error};
//!
//! #[tokio::main]
//! async fn main() -> dualstore_conn_mgr::Result<()> {
//!     let db = ConnectionManager::connect("orders.db", None).await?;
//!
//!     // All-or-nothing write
//!     db.with_transaction(|lease| {
//!         Box::pin(async move {
//!             sqlx::query("INSERT INTO restaurants (name) VALUES (?)")
//!                 .bind("Pizza Place")
//!                 .execute(&mut **lease)
//!                 .await?;
//!             Ok::<_, Error>(())
//!         })
//!     })
//!     .await?;
//!
//!     // Plain unit of work on one connection
//!     let (count,): (i64,) = db
//!         .with_connection(|lease| {
//!             Box::pin(async move {
//!                 Ok::<_, Error>(
//!                     sqlx::query_as("SELECT COUNT(*) FROM restaurants")
//!                         .fetch_one(&mut **lease)
//!                         .await?,
//!                 )
//!             })
//!         })
//!         .await?;
//!     assert_eq!(count, 1);
//!
//!     db.close().await?;
//!     Ok(())
//! }
//! ```
//!
mod config;
mod error;
mod lease;
mod manager;

// Re-export public types
pub use config::ConnectionManagerConfig;
pub use error::Error;
pub use lease::Lease;
pub use manager::ConnectionManager;

// Re-export sqlx migrate types for convenience
pub use sqlx::migrate::Migrator;

/// A type alias for Results with our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
