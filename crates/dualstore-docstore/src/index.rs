//! Declarative index definitions rendered as SQLite expression indexes

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Direction of one indexed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
   Ascending,
   Descending,
}

impl SortOrder {
   fn as_sql(self) -> &'static str {
      match self {
         SortOrder::Ascending => "ASC",
         SortOrder::Descending => "DESC",
      }
   }
}

/// One key of an index: a dotted document path and its direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexKey {
   pub path: String,
   pub order: SortOrder,
}

/// Named index over one or more document paths.
///
/// ```
/// use dualstore_docstore::{IndexModel, SortOrder};
///
/// let index = IndexModel::new("idx_orders_restaurant_report")
///     .key("restaurant.name", SortOrder::Ascending)
///     .key("createdAt", SortOrder::Descending);
/// assert!(!index.unique);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexModel {
   pub name: String,
   pub keys: Vec<IndexKey>,
   pub unique: bool,
}

impl IndexModel {
   pub fn new(name: impl Into<String>) -> Self {
      Self {
         name: name.into(),
         keys: Vec::new(),
         unique: false,
      }
   }

   pub fn key(mut self, path: impl Into<String>, order: SortOrder) -> Self {
      self.keys.push(IndexKey {
         path: path.into(),
         order,
      });
      self
   }

   /// Reject writes whose indexed values collide with an existing document.
   pub fn unique(mut self) -> Self {
      self.unique = true;
      self
   }

   pub(crate) fn create_sql(&self, collection: &str) -> Result<String> {
      validate_name(&self.name)?;
      validate_name(collection)?;

      if self.keys.is_empty() {
         return Err(Error::InvalidName(format!("{} (no keys)", self.name)));
      }

      let columns = self
         .keys
         .iter()
         .map(|key| -> Result<String> {
            Ok(format!("{} {}", json_path_expr(&key.path)?, key.order.as_sql()))
         })
         .collect::<Result<Vec<_>>>()?
         .join(", ");

      Ok(format!(
         r#"CREATE {unique}INDEX IF NOT EXISTS "{name}" ON "{collection}" ({columns})"#,
         unique = if self.unique { "UNIQUE " } else { "" },
         name = self.name,
      ))
   }
}

/// Check a collection, index or path segment name.
///
/// Names are interpolated into SQL, so only plain identifiers are accepted.
pub(crate) fn validate_name(name: &str) -> Result<()> {
   let mut chars = name.chars();
   let valid = match chars.next() {
      Some(first) if first.is_ascii_alphabetic() || first == '_' => {
         chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
      }
      _ => false,
   };

   if !valid || name.to_ascii_lowercase().starts_with("sqlite_") {
      return Err(Error::InvalidName(name.to_string()));
   }
   Ok(())
}

/// `delivery.rider.email` -> `json_extract(doc, '$.delivery.rider.email')`
pub(crate) fn json_path_expr(path: &str) -> Result<String> {
   for segment in path.split('.') {
      validate_name(segment).map_err(|_| Error::InvalidName(path.to_string()))?;
   }
   Ok(format!("json_extract(doc, '$.{path}')"))
}
