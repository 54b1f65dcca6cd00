#![allow(dead_code)]

use std::sync::Arc;

use dualstore_toolkit::{ConnectionManager, DocumentStore, Error, RELATIONAL_SCHEMA};
use tempfile::TempDir;

pub struct Stores {
   pub relational: Arc<ConnectionManager>,
   pub documents: Arc<DocumentStore>,
   _temp: TempDir,
}

/// Fresh relational and document stores with the schema applied.
pub async fn create_stores() -> Stores {
   let temp = TempDir::new().expect("Failed to create temp directory");

   let relational = ConnectionManager::connect(temp.path().join("relational.db"), None)
      .await
      .expect("Failed to connect relational store");
   relational
      .run_migrations(&RELATIONAL_SCHEMA)
      .await
      .expect("Failed to apply relational schema");

   let documents = Arc::new(DocumentStore::new(temp.path().join("documents.db"), None));

   Stores {
      relational,
      documents,
      _temp: temp,
   }
}

/// 2 restaurants, 3 people (one customer, two riders) and 1 delivered order.
pub async fn seed_small(relational: &ConnectionManager) {
   execute_batch(
      relational,
      &[
         "INSERT INTO restaurants (id, name, address) VALUES (1, 'Pizza Place', '1 Main St')",
         "INSERT INTO restaurants (id, name) VALUES (2, 'Noodle Bar')",
         "INSERT INTO menu_items (id, restaurant_id, name, price) VALUES (10, 1, 'Margherita', 9.5)",
         "INSERT INTO menu_items (id, restaurant_id, name, price) VALUES (20, 2, 'Ramen', 12.0)",
         "INSERT INTO people (id, email, name) VALUES (1, 'ann@example.com', 'Ann')",
         "INSERT INTO people (id, email, name, phone) VALUES (2, 'rick@example.com', 'Rick', '555-0100')",
         "INSERT INTO people (id, email, name) VALUES (3, 'rita@example.com', 'Rita')",
         "INSERT INTO customers (person_id, default_address) VALUES (1, '2 Side St')",
         "INSERT INTO riders (person_id, vehicle_type) VALUES (2, 'bike')",
         "INSERT INTO riders (person_id, vehicle_type) VALUES (3, 'scooter')",
         "INSERT INTO orders (id, customer_id, restaurant_id, status, total_amount, created_at, payment_method, paid_at)
          VALUES (1, 1, 1, 'paid', 19.0, '2025-01-10T12:00:00Z', 'card', '2025-01-10T12:05:00Z')",
         "INSERT INTO order_items (order_id, menu_item_id, quantity, unit_price) VALUES (1, 10, 2, 9.5)",
         "INSERT INTO deliveries (order_id, rider_id, delivery_status, assigned_at)
          VALUES (1, 2, 'delivered', '2025-01-10T12:10:00Z')",
      ],
   )
   .await;
}

/// Add one more unpaid order for Ann at the noodle bar.
pub async fn add_order(relational: &ConnectionManager, id: i64) {
   let sql = format!(
      "INSERT INTO orders (id, customer_id, restaurant_id, status, total_amount, created_at)
       VALUES ({id}, 1, 2, 'created', 12.0, '2025-01-11T09:00:00Z')"
   );
   execute_batch(relational, &[sql.as_str()]).await;
}

pub async fn execute_batch(relational: &ConnectionManager, statements: &[&str]) {
   let statements: Vec<String> = statements.iter().map(|s| s.to_string()).collect();
   relational
      .with_transaction(|lease| {
         Box::pin(async move {
            for sql in &statements {
               sqlx::query(sql).execute(&mut **lease).await?;
            }
            Ok::<_, Error>(())
         })
      })
      .await
      .expect("Failed to seed relational store");
}
