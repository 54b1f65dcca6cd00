//! Row types and the full read of the relational store

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use time::OffsetDateTime;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RestaurantRow {
   pub id: i64,
   pub name: String,
   pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MenuItemRow {
   pub id: i64,
   pub restaurant_id: i64,
   pub name: String,
   pub price: f64,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PersonRow {
   pub id: i64,
   pub email: String,
   pub name: String,
   pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CustomerRow {
   pub person_id: i64,
   pub default_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RiderRow {
   pub person_id: i64,
   pub vehicle_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentMethod {
   Card,
   Cash,
   Paypal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DeliveryStatus {
   Assigned,
   PickedUp,
   Delivered,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OrderRow {
   pub id: i64,
   pub customer_id: i64,
   pub restaurant_id: i64,
   pub status: String,
   pub total_amount: f64,
   pub created_at: OffsetDateTime,
   pub payment_method: Option<PaymentMethod>,
   pub paid_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OrderItemRow {
   pub order_id: i64,
   pub menu_item_id: i64,
   pub quantity: i64,
   pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DeliveryRow {
   pub order_id: i64,
   pub rider_id: i64,
   pub delivery_status: DeliveryStatus,
   pub assigned_at: OffsetDateTime,
}

/// Every row of every entity table, read on one connection.
///
/// Read it inside a transaction so all tables come from the same point in
/// time. Rows are ordered by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationalSnapshot {
   pub restaurants: Vec<RestaurantRow>,
   pub menu_items: Vec<MenuItemRow>,
   pub people: Vec<PersonRow>,
   pub customers: Vec<CustomerRow>,
   pub riders: Vec<RiderRow>,
   pub orders: Vec<OrderRow>,
   pub order_items: Vec<OrderItemRow>,
   pub deliveries: Vec<DeliveryRow>,
}

impl RelationalSnapshot {
   pub async fn read(conn: &mut SqliteConnection) -> Result<Self, sqlx::Error> {
      let restaurants = sqlx::query_as("SELECT id, name, address FROM restaurants ORDER BY id")
         .fetch_all(&mut *conn)
         .await?;

      let menu_items =
         sqlx::query_as("SELECT id, restaurant_id, name, price FROM menu_items ORDER BY id")
            .fetch_all(&mut *conn)
            .await?;

      let people = sqlx::query_as("SELECT id, email, name, phone FROM people ORDER BY id")
         .fetch_all(&mut *conn)
         .await?;

      let customers =
         sqlx::query_as("SELECT person_id, default_address FROM customers ORDER BY person_id")
            .fetch_all(&mut *conn)
            .await?;

      let riders = sqlx::query_as("SELECT person_id, vehicle_type FROM riders ORDER BY person_id")
         .fetch_all(&mut *conn)
         .await?;

      let orders = sqlx::query_as(
         "SELECT id, customer_id, restaurant_id, status, total_amount, created_at, payment_method, paid_at
          FROM orders ORDER BY id",
      )
      .fetch_all(&mut *conn)
      .await?;

      let order_items = sqlx::query_as(
         "SELECT order_id, menu_item_id, quantity, unit_price
          FROM order_items ORDER BY order_id, menu_item_id",
      )
      .fetch_all(&mut *conn)
      .await?;

      let deliveries = sqlx::query_as(
         "SELECT order_id, rider_id, delivery_status, assigned_at FROM deliveries ORDER BY order_id",
      )
      .fetch_all(&mut *conn)
      .await?;

      let snapshot = Self {
         restaurants,
         menu_items,
         people,
         customers,
         riders,
         orders,
         order_items,
         deliveries,
      };

      debug!(
         "Read relational snapshot: {} restaurants, {} people, {} orders",
         snapshot.restaurants.len(),
         snapshot.people.len(),
         snapshot.orders.len()
      );

      Ok(snapshot)
   }
}
