use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::database::DocumentDatabase;
use crate::index::{IndexModel, validate_name};
use crate::{Error, Result};

/// A JSON document: an object at the top level.
pub type Document = serde_json::Map<String, JsonValue>;

/// Operations on one named collection.
///
/// Every document has a string `_id`. Documents written without one get a
/// random UUID; the `_id` is unique within the collection.
#[derive(Debug)]
pub struct Collection<'a> {
   db: &'a DocumentDatabase,
   name: String,
}

impl<'a> Collection<'a> {
   pub(crate) fn new(db: &'a DocumentDatabase, name: String) -> Self {
      Self { db, name }
   }

   pub fn name(&self) -> &str {
      &self.name
   }

   /// Insert one document and return its `_id`.
   ///
   /// Fails with [`Error::DuplicateKey`] if the `_id` or any unique index
   /// value is already taken. Existing documents are never overwritten.
   pub async fn insert_one<T: Serialize>(&self, doc: &T) -> Result<String> {
      self.db.ensure_collection(&self.name).await?;

      let (id, body) = prepare(doc, None)?;
      sqlx::query(&format!(
         r#"INSERT INTO "{}" (_id, doc) VALUES (?, json(?))"#,
         self.name
      ))
      .bind(&id)
      .bind(body)
      .execute(self.db.pool())
      .await
      .map_err(|e| Error::from_write(&self.name, e))?;

      Ok(id)
   }

   /// Insert documents in order, one write per document.
   ///
   /// Stops at the first failure. Documents inserted before the failure stay
   /// in place; there is no batch-wide rollback.
   pub async fn insert_many<T: Serialize>(&self, docs: &[T]) -> Result<u64> {
      let mut inserted = 0u64;
      for doc in docs {
         if let Err(e) = self.insert_one(doc).await {
            warn!(
               "insert_many into '{}' stopped after {} of {} documents: {}",
               self.name,
               inserted,
               docs.len(),
               e
            );
            return Err(e);
         }
         inserted += 1;
      }
      Ok(inserted)
   }

   /// Replace the document stored under `id`.
   ///
   /// With `upsert` the document is inserted when no document has that `_id`.
   /// Returns the number of documents written (0 or 1). A collision on a
   /// unique index other than `_id` is still [`Error::DuplicateKey`].
   pub async fn replace_one<T: Serialize>(&self, id: &str, doc: &T, upsert: bool) -> Result<u64> {
      self.db.ensure_collection(&self.name).await?;

      let (id, body) = prepare(doc, Some(id))?;
      let sql = if upsert {
         format!(
            r#"INSERT INTO "{}" (_id, doc) VALUES (?, json(?))
               ON CONFLICT(_id) DO UPDATE SET doc = excluded.doc"#,
            self.name
         )
      } else {
         format!(r#"UPDATE "{}" SET doc = json(?2) WHERE _id = ?1"#, self.name)
      };

      let result = sqlx::query(&sql)
         .bind(&id)
         .bind(body)
         .execute(self.db.pool())
         .await
         .map_err(|e| Error::from_write(&self.name, e))?;

      Ok(result.rows_affected())
   }

   pub async fn find_by_id<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>> {
      self.db.ensure_collection(&self.name).await?;

      let row: Option<(String,)> =
         sqlx::query_as(&format!(r#"SELECT doc FROM "{}" WHERE _id = ?"#, self.name))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

      row.map(|(doc,)| serde_json::from_str(&doc).map_err(Error::from))
         .transpose()
   }

   /// All documents in insertion order.
   pub async fn find_all<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
      self.db.ensure_collection(&self.name).await?;

      let rows: Vec<(String,)> =
         sqlx::query_as(&format!(r#"SELECT doc FROM "{}" ORDER BY rowid"#, self.name))
            .fetch_all(self.db.pool())
            .await?;

      rows
         .into_iter()
         .map(|(doc,)| serde_json::from_str(&doc).map_err(Error::from))
         .collect()
   }

   pub async fn count_documents(&self) -> Result<u64> {
      self.db.ensure_collection(&self.name).await?;

      let (count,): (i64,) = sqlx::query_as(&format!(r#"SELECT COUNT(*) FROM "{}""#, self.name))
         .fetch_one(self.db.pool())
         .await?;

      Ok(count as u64)
   }

   /// Delete every document, keeping the collection and its indexes.
   pub async fn delete_all(&self) -> Result<u64> {
      self.db.ensure_collection(&self.name).await?;

      let result = sqlx::query(&format!(r#"DELETE FROM "{}""#, self.name))
         .execute(self.db.pool())
         .await?;

      Ok(result.rows_affected())
   }

   /// Delete every document whose `_id` is not in `keep`.
   ///
   /// Returns the number of documents removed.
   pub async fn retain_ids(&self, keep: &[String]) -> Result<u64> {
      self.db.ensure_collection(&self.name).await?;

      let result = sqlx::query(&format!(
         r#"DELETE FROM "{}" WHERE _id NOT IN (SELECT value FROM json_each(?))"#,
         self.name
      ))
      .bind(serde_json::to_string(keep)?)
      .execute(self.db.pool())
      .await?;

      Ok(result.rows_affected())
   }

   /// Create an index. A no-op when an index with the same name exists.
   pub async fn create_index(&self, model: &IndexModel) -> Result<()> {
      self.db.ensure_collection(&self.name).await?;

      let sql = model.create_sql(&self.name)?;
      sqlx::query(&sql)
         .execute(self.db.pool())
         .await
         .map_err(|source| match Error::from_write(&self.name, source) {
            // Existing documents already violate the new unique index
            duplicate @ Error::DuplicateKey { .. } => duplicate,
            Error::Sqlx(source) => Error::IndexMaintenance {
               name: model.name.clone(),
               source,
            },
            other => other,
         })?;

      debug!("Ensured index {} on {}", model.name, self.name);
      Ok(())
   }

   /// Drop an index by name.
   ///
   /// Returns [`Error::IndexNotFound`] when the collection has no such index.
   pub async fn drop_index(&self, name: &str) -> Result<()> {
      validate_name(name)?;
      self.db.ensure_collection(&self.name).await?;

      let existing: Option<(String,)> = sqlx::query_as(
         "SELECT name FROM sqlite_master WHERE type = 'index' AND name = ? AND tbl_name = ?",
      )
      .bind(name)
      .bind(&self.name)
      .fetch_optional(self.db.pool())
      .await?;

      if existing.is_none() {
         return Err(Error::IndexNotFound {
            collection: self.name.clone(),
            name: name.to_string(),
         });
      }

      sqlx::query(&format!(r#"DROP INDEX IF EXISTS "{name}""#))
         .execute(self.db.pool())
         .await
         .map_err(|source| Error::IndexMaintenance {
            name: name.to_string(),
            source,
         })?;

      debug!("Dropped index {} on {}", name, self.name);
      Ok(())
   }

   /// Names of the secondary indexes on this collection, sorted.
   pub async fn list_index_names(&self) -> Result<Vec<String>> {
      self.db.ensure_collection(&self.name).await?;

      // Implicit indexes (the `_id` primary key) have no SQL text
      let rows: Vec<(String,)> = sqlx::query_as(
         "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ? AND sql IS NOT NULL ORDER BY name",
      )
      .bind(&self.name)
      .fetch_all(self.db.pool())
      .await?;

      Ok(rows.into_iter().map(|(name,)| name).collect())
   }
}

/// Serialize a document and settle its `_id`.
///
/// `forced_id` wins over any `_id` in the document; otherwise a string `_id`
/// is kept and a missing one is generated.
fn prepare<T: Serialize>(doc: &T, forced_id: Option<&str>) -> Result<(String, String)> {
   let mut object = match serde_json::to_value(doc)? {
      JsonValue::Object(map) => map,
      other => {
         return Err(Error::InvalidDocument(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
         )));
      }
   };

   let id = match (forced_id, object.get("_id")) {
      (Some(id), _) => id.to_string(),
      (None, Some(JsonValue::String(id))) => id.clone(),
      (None, Some(other)) => {
         return Err(Error::InvalidDocument(format!(
            "_id must be a string, got {}",
            json_type_name(other)
         )));
      }
      (None, None) => uuid::Uuid::new_v4().to_string(),
   };

   object.insert("_id".to_string(), JsonValue::String(id.clone()));
   Ok((id, serde_json::to_string(&object)?))
}

fn json_type_name(value: &JsonValue) -> &'static str {
   match value {
      JsonValue::Null => "null",
      JsonValue::Bool(_) => "boolean",
      JsonValue::Number(_) => "number",
      JsonValue::String(_) => "string",
      JsonValue::Array(_) => "array",
      JsonValue::Object(_) => "object",
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use serde_json::json;

   #[test]
   fn test_prepare_generates_missing_id() {
      let (id, body) = prepare(&json!({ "orderId": 7 }), None).unwrap();
      let stored: JsonValue = serde_json::from_str(&body).unwrap();

      assert!(uuid::Uuid::parse_str(&id).is_ok());
      assert_eq!(stored["_id"], json!(id));
      assert_eq!(stored["orderId"], json!(7));
   }

   #[test]
   fn test_prepare_keeps_string_id() {
      let (id, _) = prepare(&json!({ "_id": "restaurant:1" }), None).unwrap();
      assert_eq!(id, "restaurant:1");
   }

   #[test]
   fn test_prepare_forced_id_wins() {
      let (id, body) = prepare(&json!({ "_id": "other", "source": "sqlite" }), Some("migration")).unwrap();
      let stored: JsonValue = serde_json::from_str(&body).unwrap();

      assert_eq!(id, "migration");
      assert_eq!(stored["_id"], json!("migration"));
   }

   #[test]
   fn test_prepare_rejects_non_objects_and_numeric_ids() {
      assert!(matches!(
         prepare(&json!([1, 2, 3]), None),
         Err(Error::InvalidDocument(_))
      ));
      assert!(matches!(
         prepare(&json!({ "_id": 5 }), None),
         Err(Error::InvalidDocument(_))
      ));
   }
}
