//! Relational rows to denormalized documents

use std::collections::{HashMap, HashSet};

use crate::model::{
   CustomerProfile, DeliveryDocument, DocumentSet, MenuItemDocument, OrderDocument,
   OrderItemDocument, PaymentDocument, PersonDocument, PersonRef, RestaurantDocument,
   RestaurantRef, RiderProfile, Role, person_document_id, restaurant_document_id,
};
use crate::snapshot::{
   CustomerRow, DeliveryRow, MenuItemRow, OrderItemRow, PersonRow, RelationalSnapshot,
   RestaurantRow, RiderRow,
};
use crate::{Error, Result};

/// Turn a relational snapshot into restaurant, person and order documents.
///
/// Restaurants embed their menu. People carry their roles and profiles. Each
/// order embeds its customer, restaurant, line items, payment and delivery.
/// A reference to a row missing from the snapshot is
/// [`Error::InconsistentSnapshot`]; nothing is silently dropped.
pub fn to_documents(snapshot: &RelationalSnapshot) -> Result<DocumentSet> {
   let restaurants: HashMap<i64, &RestaurantRow> =
      snapshot.restaurants.iter().map(|r| (r.id, r)).collect();
   let people: HashMap<i64, &PersonRow> = snapshot.people.iter().map(|p| (p.id, p)).collect();
   let customers: HashMap<i64, &CustomerRow> =
      snapshot.customers.iter().map(|c| (c.person_id, c)).collect();
   let riders: HashMap<i64, &RiderRow> =
      snapshot.riders.iter().map(|r| (r.person_id, r)).collect();
   let menu_items: HashMap<i64, &MenuItemRow> =
      snapshot.menu_items.iter().map(|m| (m.id, m)).collect();

   let mut menus: HashMap<i64, Vec<MenuItemDocument>> = HashMap::new();
   for item in &snapshot.menu_items {
      if !restaurants.contains_key(&item.restaurant_id) {
         return Err(Error::InconsistentSnapshot(format!(
            "menu item {} references missing restaurant {}",
            item.id, item.restaurant_id
         )));
      }
      menus.entry(item.restaurant_id).or_default().push(MenuItemDocument {
         menu_item_id: item.id,
         name: item.name.clone(),
         price: item.price,
      });
   }

   let restaurant_docs = snapshot
      .restaurants
      .iter()
      .map(|r| RestaurantDocument {
         id: restaurant_document_id(r.id),
         restaurant_id: r.id,
         name: r.name.clone(),
         address: r.address.clone(),
         menu: menus.remove(&r.id).unwrap_or_default(),
      })
      .collect();

   for person_id in customers.keys().chain(riders.keys()) {
      if !people.contains_key(person_id) {
         return Err(Error::InconsistentSnapshot(format!(
            "profile references missing person {person_id}"
         )));
      }
   }

   let people_docs = snapshot
      .people
      .iter()
      .map(|p| {
         let customer = customers.get(&p.id).map(|c| CustomerProfile {
            default_address: c.default_address.clone(),
         });
         let rider = riders.get(&p.id).map(|r| RiderProfile {
            vehicle_type: r.vehicle_type.clone(),
         });

         let mut roles = Vec::new();
         if customer.is_some() {
            roles.push(Role::Customer);
         }
         if rider.is_some() {
            roles.push(Role::Rider);
         }

         PersonDocument {
            id: person_document_id(p.id),
            person_id: p.id,
            email: p.email.clone(),
            name: p.name.clone(),
            phone: p.phone.clone(),
            roles,
            customer,
            rider,
         }
      })
      .collect();

   let mut items_by_order: HashMap<i64, Vec<&OrderItemRow>> = HashMap::new();
   for item in &snapshot.order_items {
      items_by_order.entry(item.order_id).or_default().push(item);
   }
   let deliveries: HashMap<i64, &DeliveryRow> =
      snapshot.deliveries.iter().map(|d| (d.order_id, d)).collect();

   let mut order_docs = Vec::with_capacity(snapshot.orders.len());
   for order in &snapshot.orders {
      if !customers.contains_key(&order.customer_id) {
         return Err(Error::InconsistentSnapshot(format!(
            "order {} references missing customer {}",
            order.id, order.customer_id
         )));
      }
      let customer = person_ref(&people, order.customer_id, order.id)?;

      let restaurant = restaurants.get(&order.restaurant_id).ok_or_else(|| {
         Error::InconsistentSnapshot(format!(
            "order {} references missing restaurant {}",
            order.id, order.restaurant_id
         ))
      })?;

      let items = items_by_order
         .remove(&order.id)
         .unwrap_or_default()
         .into_iter()
         .map(|item| -> Result<OrderItemDocument> {
            let menu_item = menu_items.get(&item.menu_item_id).ok_or_else(|| {
               Error::InconsistentSnapshot(format!(
                  "order {} references missing menu item {}",
                  order.id, item.menu_item_id
               ))
            })?;
            Ok(OrderItemDocument {
               menu_item_id: item.menu_item_id,
               name: menu_item.name.clone(),
               unit_price: item.unit_price,
               quantity: item.quantity,
            })
         })
         .collect::<Result<Vec<_>>>()?;

      let delivery = match deliveries.get(&order.id) {
         Some(d) => {
            if !riders.contains_key(&d.rider_id) {
               return Err(Error::InconsistentSnapshot(format!(
                  "delivery for order {} references missing rider {}",
                  order.id, d.rider_id
               )));
            }
            Some(DeliveryDocument {
               rider: person_ref(&people, d.rider_id, order.id)?,
               delivery_status: d.delivery_status,
               assigned_at: d.assigned_at,
            })
         }
         None => None,
      };

      order_docs.push(OrderDocument {
         order_id: order.id,
         status: order.status.clone(),
         created_at: order.created_at,
         total_amount: order.total_amount,
         customer,
         restaurant: RestaurantRef {
            restaurant_id: restaurant.id,
            name: restaurant.name.clone(),
         },
         items,
         payment: order.payment_method.map(|method| PaymentDocument {
            method,
            paid_at: order.paid_at,
         }),
         delivery,
      });
   }

   if let Some(order_id) = items_by_order.keys().next() {
      return Err(Error::InconsistentSnapshot(format!(
         "line items reference missing order {order_id}"
      )));
   }
   let order_ids: HashSet<i64> = snapshot.orders.iter().map(|o| o.id).collect();
   if let Some(d) = snapshot
      .deliveries
      .iter()
      .find(|d| !order_ids.contains(&d.order_id))
   {
      return Err(Error::InconsistentSnapshot(format!(
         "delivery references missing order {}",
         d.order_id
      )));
   }

   Ok(DocumentSet {
      restaurants: restaurant_docs,
      people: people_docs,
      orders: order_docs,
   })
}

fn person_ref(people: &HashMap<i64, &PersonRow>, person_id: i64, order_id: i64) -> Result<PersonRef> {
   let person = people.get(&person_id).ok_or_else(|| {
      Error::InconsistentSnapshot(format!(
         "order {order_id} references missing person {person_id}"
      ))
   })?;

   Ok(PersonRef {
      person_id: person.id,
      email: person.email.clone(),
      name: person.name.clone(),
   })
}
