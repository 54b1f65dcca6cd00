//! Lease guard for exclusive use of one pooled connection

use sqlx::Sqlite;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteConnection;
use std::ops::{Deref, DerefMut};
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, error, warn};

use crate::Result;

/// RAII guard for one connection checked out of a
/// [`ConnectionManager`](crate::ConnectionManager)
///
/// The lease owns both the pooled connection and a slot of the manager's lease
/// budget. Dropping it returns the connection to the pool and frees the slot,
/// whichever way the owning scope is left.
///
/// The guard derefs to `SqliteConnection` allowing direct use with sqlx queries.
///
/// # Example
///
/// ```no_run
/// use dualstore_conn_mgr::ConnectionManager;
///
/// # async fn example() -> Result<(), dualstore_conn_mgr::Error> {
/// let db = ConnectionManager::connect("orders.db", None).await?;
/// let mut lease = db.acquire().await?;
/// sqlx::query("SELECT 1").execute(&mut *lease).await?;
/// // Connection and slot are released here
/// drop(lease);
/// # Ok(())
/// # }
/// ```
#[must_use = "if unused, the lease is immediately released"]
#[derive(Debug)]
pub struct Lease {
   // Both are `Some` until drop
   conn: Option<PoolConnection<Sqlite>>,
   // Freed after `conn` is handed back. The return itself finishes on a pool
   // task, so a caller that wins this slot first waits on the pool's own
   // capacity until the connection is actually back.
   permit: Option<OwnedSemaphorePermit>,
   in_transaction: bool,
   // A `:memory:` database lives only as long as its connection
   memory: bool,
}

impl Lease {
   pub(crate) fn new(conn: PoolConnection<Sqlite>, permit: OwnedSemaphorePermit, memory: bool) -> Self {
      Self {
         conn: Some(conn),
         permit: Some(permit),
         in_transaction: false,
         memory,
      }
   }

   /// Whether a transaction opened on this lease has not yet been finalized
   pub fn in_transaction(&self) -> bool {
      self.in_transaction
   }

   pub(crate) async fn begin(&mut self) -> Result<()> {
      sqlx::query("BEGIN IMMEDIATE").execute(&mut **self).await?;
      self.in_transaction = true;
      Ok(())
   }

   pub(crate) async fn commit(&mut self) -> Result<()> {
      sqlx::query("COMMIT").execute(&mut **self).await?;
      self.in_transaction = false;
      Ok(())
   }

   pub(crate) async fn rollback(&mut self) -> Result<()> {
      sqlx::query("ROLLBACK").execute(&mut **self).await?;
      self.in_transaction = false;
      Ok(())
   }
}

impl Deref for Lease {
   type Target = SqliteConnection;

   fn deref(&self) -> &Self::Target {
      self.conn.as_ref().expect("BUG: lease connection already released")
   }
}

impl DerefMut for Lease {
   fn deref_mut(&mut self) -> &mut Self::Target {
      self.conn.as_mut().expect("BUG: lease connection already released")
   }
}

impl Drop for Lease {
   fn drop(&mut self) {
      // An open transaction can only survive to here if the unit of work was
      // cancelled mid-flight or its rollback failed
      if !self.in_transaction {
         return;
      }

      let (Some(conn), Some(permit)) = (self.conn.take(), self.permit.take()) else {
         return;
      };
      let memory = self.memory;

      match tokio::runtime::Handle::try_current() {
         Ok(handle) => {
            warn!("Lease dropped with an open transaction; rolling it back");
            // The slot stays taken until the rollback has run, so the next
            // caller never sees the abandoned transaction
            handle.spawn(rollback_abandoned(conn, permit, memory));
         }
         Err(_) => release_unrolled(conn, memory),
      }
   }
}

async fn rollback_abandoned(mut conn: PoolConnection<Sqlite>, permit: OwnedSemaphorePermit, memory: bool) {
   match sqlx::query("ROLLBACK").execute(&mut *conn).await {
      Ok(_) => debug!("Rolled back abandoned transaction"),
      Err(e) => {
         error!("Rollback of abandoned transaction failed: {}", e);
         release_unrolled(conn, memory);
      }
   }
   drop(permit);
}

/// Give up a connection whose transaction could not be rolled back.
///
/// File connections are closed so the transaction dies with them. Closing
/// the only connection of a `:memory:` database would discard every committed
/// row, so that one goes back to the pool as is.
fn release_unrolled(mut conn: PoolConnection<Sqlite>, memory: bool) {
   if memory {
      error!("Returning in-memory connection with a transaction that could not be rolled back");
   } else {
      conn.close_on_drop();
   }
}
