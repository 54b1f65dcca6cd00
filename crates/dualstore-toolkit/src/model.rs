//! Document shapes written to the document store

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::snapshot::{DeliveryStatus, PaymentMethod};

/// `_id` of the singleton migration marker in the `meta` collection.
pub const MARKER_ID: &str = "migration";

/// Source identifier stamped on the marker unless the orchestrator is told otherwise.
pub const DEFAULT_SOURCE: &str = "sqlite";

pub fn restaurant_document_id(restaurant_id: i64) -> String {
   format!("restaurant:{restaurant_id}")
}

pub fn person_document_id(person_id: i64) -> String {
   format!("person:{person_id}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantDocument {
   #[serde(rename = "_id")]
   pub id: String,
   pub restaurant_id: i64,
   pub name: String,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub address: Option<String>,
   pub menu: Vec<MenuItemDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemDocument {
   pub menu_item_id: i64,
   pub name: String,
   pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
   Customer,
   Rider,
}

/// A person with their customer and rider profiles folded in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDocument {
   #[serde(rename = "_id")]
   pub id: String,
   pub person_id: i64,
   pub email: String,
   pub name: String,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub phone: Option<String>,
   pub roles: Vec<Role>,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub customer: Option<CustomerProfile>,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub rider: Option<RiderProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
   #[serde(skip_serializing_if = "Option::is_none")]
   pub default_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderProfile {
   #[serde(skip_serializing_if = "Option::is_none")]
   pub vehicle_type: Option<String>,
}

/// Embedded reference to a person, enough to render a report row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRef {
   pub person_id: i64,
   pub email: String,
   pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantRef {
   pub restaurant_id: i64,
   pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDocument {
   pub menu_item_id: i64,
   pub name: String,
   pub unit_price: f64,
   pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDocument {
   pub method: PaymentMethod,
   #[serde(with = "time::serde::rfc3339::option", default)]
   pub paid_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDocument {
   pub rider: PersonRef,
   pub delivery_status: DeliveryStatus,
   #[serde(with = "time::serde::rfc3339")]
   pub assigned_at: OffsetDateTime,
}

/// A fully denormalized order.
///
/// Orders have no deterministic `_id`; the store generates one and the unique
/// `orderId` index catches a second copy of the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDocument {
   pub order_id: i64,
   pub status: String,
   #[serde(with = "time::serde::rfc3339")]
   pub created_at: OffsetDateTime,
   pub total_amount: f64,
   pub customer: PersonRef,
   pub restaurant: RestaurantRef,
   pub items: Vec<OrderItemDocument>,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub payment: Option<PaymentDocument>,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub delivery: Option<DeliveryDocument>,
}

/// Documents written per entity by one migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationCounts {
   pub restaurants: u64,
   pub people: u64,
   pub orders: u64,
}

/// The singleton record proving a migration run finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationMarker {
   pub source: String,
   #[serde(with = "time::serde::rfc3339")]
   pub last_migration_at: OffsetDateTime,
   pub migrated: MigrationCounts,
}

/// Output of the relational-to-document transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSet {
   pub restaurants: Vec<RestaurantDocument>,
   pub people: Vec<PersonDocument>,
   pub orders: Vec<OrderDocument>,
}

impl DocumentSet {
   pub fn counts(&self) -> MigrationCounts {
      MigrationCounts {
         restaurants: self.restaurants.len() as u64,
         people: self.people.len() as u64,
         orders: self.orders.len() as u64,
      }
   }
}
