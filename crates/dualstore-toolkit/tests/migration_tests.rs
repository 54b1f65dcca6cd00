mod common;

use std::sync::Arc;

use common::{add_order, create_stores, execute_batch, seed_small};
use dualstore_docstore::collections;
use dualstore_toolkit::{
   Error, ErrorKind, MARKER_ID, MigrationCounts, MigrationMarker, MigrationOrchestrator,
};
use serde_json::{Value as JsonValue, json};

#[tokio::test]
async fn test_migrate_returns_counts() {
   let stores = create_stores().await;
   seed_small(&stores.relational).await;

   let orchestrator =
      MigrationOrchestrator::new(Arc::clone(&stores.relational), Arc::clone(&stores.documents));
   let counts = orchestrator.migrate().await.unwrap();

   assert_eq!(
      counts,
      MigrationCounts {
         restaurants: 2,
         people: 3,
         orders: 1
      }
   );
   assert_eq!(
      serde_json::to_value(counts).unwrap(),
      json!({ "restaurants": 2, "people": 3, "orders": 1 })
   );
}

#[tokio::test]
async fn test_marker_counts_match_documents() {
   let stores = create_stores().await;
   seed_small(&stores.relational).await;

   MigrationOrchestrator::new(Arc::clone(&stores.relational), Arc::clone(&stores.documents))
      .with_source("sqlite-test")
      .migrate()
      .await
      .unwrap();

   let db = stores.documents.get().await.unwrap();
   let marker: MigrationMarker = db
      .collection(collections::META)
      .unwrap()
      .find_by_id(MARKER_ID)
      .await
      .unwrap()
      .expect("marker written");

   assert_eq!(marker.source, "sqlite-test");
   assert_eq!(
      marker.migrated.restaurants,
      db.collection(collections::RESTAURANTS).unwrap().count_documents().await.unwrap()
   );
   assert_eq!(
      marker.migrated.people,
      db.collection(collections::PEOPLE).unwrap().count_documents().await.unwrap()
   );
   assert_eq!(
      marker.migrated.orders,
      db.collection(collections::ORDERS).unwrap().count_documents().await.unwrap()
   );
}

#[tokio::test]
async fn test_rerun_drops_deleted_reference_documents() {
   let stores = create_stores().await;
   execute_batch(
      &stores.relational,
      &[
         "INSERT INTO restaurants (id, name) VALUES (1, 'Pizza Place')",
         "INSERT INTO restaurants (id, name) VALUES (2, 'Noodle Bar')",
         "INSERT INTO people (id, email, name) VALUES (1, 'ann@example.com', 'Ann')",
      ],
   )
   .await;

   let orchestrator =
      MigrationOrchestrator::new(Arc::clone(&stores.relational), Arc::clone(&stores.documents));
   assert_eq!(orchestrator.migrate().await.unwrap().restaurants, 2);

   execute_batch(&stores.relational, &["DELETE FROM restaurants WHERE id = 2"]).await;

   // No orders yet, so the re-run goes through
   let counts = orchestrator.migrate().await.unwrap();

   let db = stores.documents.get().await.unwrap();
   let restaurants = db.collection(collections::RESTAURANTS).unwrap();
   let marker: MigrationMarker = db
      .collection(collections::META)
      .unwrap()
      .find_by_id(MARKER_ID)
      .await
      .unwrap()
      .expect("marker written");

   assert_eq!(counts.restaurants, 1);
   assert_eq!(marker.migrated, counts);
   assert_eq!(restaurants.count_documents().await.unwrap(), 1);
   assert!(
      restaurants
         .find_by_id::<JsonValue>("restaurant:2")
         .await
         .unwrap()
         .is_none()
   );
}

#[tokio::test]
async fn test_order_documents_are_denormalized() {
   let stores = create_stores().await;
   seed_small(&stores.relational).await;

   MigrationOrchestrator::new(Arc::clone(&stores.relational), Arc::clone(&stores.documents))
      .migrate()
      .await
      .unwrap();

   let db = stores.documents.get().await.unwrap();
   let orders: Vec<JsonValue> = db.collection(collections::ORDERS).unwrap().find_all().await.unwrap();
   let order = &orders[0];

   assert_eq!(order["orderId"], json!(1));
   assert_eq!(order["restaurant"]["name"], json!("Pizza Place"));
   assert_eq!(order["customer"]["email"], json!("ann@example.com"));
   assert_eq!(order["items"][0]["name"], json!("Margherita"));
   assert_eq!(order["items"][0]["quantity"], json!(2));
   assert_eq!(order["payment"]["method"], json!("card"));
   assert_eq!(order["delivery"]["rider"]["email"], json!("rick@example.com"));
   assert_eq!(order["delivery"]["deliveryStatus"], json!("delivered"));
   assert_eq!(order["delivery"]["assignedAt"], json!("2025-01-10T12:10:00Z"));
   assert!(order["_id"].is_string());

   let restaurant: JsonValue = db
      .collection(collections::RESTAURANTS)
      .unwrap()
      .find_by_id("restaurant:2")
      .await
      .unwrap()
      .unwrap();
   assert_eq!(restaurant["menu"][0]["name"], json!("Ramen"));
}

#[tokio::test]
async fn test_second_migration_fails_with_duplicate_key() {
   let stores = create_stores().await;
   seed_small(&stores.relational).await;

   let orchestrator =
      MigrationOrchestrator::new(Arc::clone(&stores.relational), Arc::clone(&stores.documents));
   orchestrator.migrate().await.unwrap();

   let db = stores.documents.get().await.unwrap();
   let meta = db.collection(collections::META).unwrap();
   let first: JsonValue = meta.find_by_id(MARKER_ID).await.unwrap().unwrap();

   let err = orchestrator.migrate().await.unwrap_err();
   assert!(err.is_duplicate_key(), "expected duplicate key, got {err:?}");
   assert_eq!(err.kind(), ErrorKind::DuplicateKey);
   assert_eq!(err.kind().status_code(), 409);

   // Nothing doubled, marker untouched
   let orders = db.collection(collections::ORDERS).unwrap();
   assert_eq!(orders.count_documents().await.unwrap(), 1);
   assert_eq!(db.collection(collections::RESTAURANTS).unwrap().count_documents().await.unwrap(), 2);
   assert_eq!(db.collection(collections::PEOPLE).unwrap().count_documents().await.unwrap(), 3);

   let second: JsonValue = meta.find_by_id(MARKER_ID).await.unwrap().unwrap();
   assert_eq!(first, second);
}

#[tokio::test]
async fn test_failed_order_write_leaves_marker_unstamped() {
   let stores = create_stores().await;
   seed_small(&stores.relational).await;

   // An order with the same orderId is already in the document store
   let db = stores.documents.get().await.unwrap();
   db.collection(collections::ORDERS)
      .unwrap()
      .insert_one(&json!({ "orderId": 1, "status": "created" }))
      .await
      .unwrap();

   let err = MigrationOrchestrator::new(Arc::clone(&stores.relational), Arc::clone(&stores.documents))
      .migrate()
      .await
      .unwrap_err();
   assert!(err.is_duplicate_key());

   let marker: Option<JsonValue> = db
      .collection(collections::META)
      .unwrap()
      .find_by_id(MARKER_ID)
      .await
      .unwrap();
   assert!(marker.is_none());
}

#[tokio::test]
async fn test_new_orders_after_migration_still_collide() {
   let stores = create_stores().await;
   seed_small(&stores.relational).await;

   let orchestrator =
      MigrationOrchestrator::new(Arc::clone(&stores.relational), Arc::clone(&stores.documents));
   orchestrator.migrate().await.unwrap();

   add_order(&stores.relational, 2).await;

   // Order 1 is inserted first and collides before order 2 is attempted
   let err = orchestrator.migrate().await.unwrap_err();
   assert!(err.is_duplicate_key());

   let db = stores.documents.get().await.unwrap();
   assert_eq!(db.collection(collections::ORDERS).unwrap().count_documents().await.unwrap(), 1);
}

#[tokio::test]
async fn test_empty_relational_store_migrates_nothing() {
   let stores = create_stores().await;

   let counts = MigrationOrchestrator::new(Arc::clone(&stores.relational), Arc::clone(&stores.documents))
      .migrate()
      .await
      .unwrap();

   assert_eq!(counts, MigrationCounts::default());

   // The run still completed, so the marker is stamped
   let db = stores.documents.get().await.unwrap();
   let marker: Option<MigrationMarker> = db
      .collection(collections::META)
      .unwrap()
      .find_by_id(MARKER_ID)
      .await
      .unwrap();
   assert_eq!(marker.unwrap().migrated, MigrationCounts::default());
}

#[tokio::test]
async fn test_relational_failure_writes_no_documents() {
   let stores = create_stores().await;
   seed_small(&stores.relational).await;

   // Break the snapshot read
   execute_batch(&stores.relational, &["DROP TABLE deliveries"]).await;

   let err = MigrationOrchestrator::new(Arc::clone(&stores.relational), Arc::clone(&stores.documents))
      .migrate()
      .await
      .unwrap_err();

   assert!(matches!(err, Error::Sqlx(_)));
   assert_eq!(err.kind(), ErrorKind::Transaction);
   assert_eq!(stores.relational.outstanding_leases(), 0);

   // The document store was never written, not even connected
   assert!(!stores.documents.is_connected());
}

#[tokio::test]
async fn test_concurrent_migrations_rejected() {
   let stores = create_stores().await;
   seed_small(&stores.relational).await;

   let orchestrator = Arc::new(MigrationOrchestrator::new(
      Arc::clone(&stores.relational),
      Arc::clone(&stores.documents),
   ));

   let (a, b) = tokio::join!(orchestrator.migrate(), orchestrator.migrate());

   // Exactly one run went ahead; the other was turned away before touching either store
   let (ok, rejected) = match (a, b) {
      (Ok(counts), Err(e)) | (Err(e), Ok(counts)) => (counts, e),
      other => panic!("expected one success and one rejection, got {other:?}"),
   };
   assert_eq!(ok.orders, 1);
   assert!(matches!(rejected, Error::MigrationInProgress));
   assert_eq!(rejected.kind(), ErrorKind::Busy);

   let db = stores.documents.get().await.unwrap();
   assert_eq!(db.collection(collections::ORDERS).unwrap().count_documents().await.unwrap(), 1);
}

#[tokio::test]
async fn test_closed_relational_store_is_lease_error() {
   let stores = create_stores().await;
   let orchestrator =
      MigrationOrchestrator::new(Arc::clone(&stores.relational), Arc::clone(&stores.documents));

   Arc::clone(&stores.relational).close().await.unwrap();

   let err = orchestrator.migrate().await.unwrap_err();
   assert_eq!(err.kind(), ErrorKind::Lease);
   assert_eq!(err.kind().status_code(), 503);
}
