//! One-time database setup for the diary backend's document store.
//!
//! The plan is rendered, not executed: the output is a `mongosh` script or a
//! JSON description for whatever tooling provisions the store.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndexOrder {
    Ascending,
    Descending,
}

impl IndexOrder {
    fn as_i8(self) -> i8 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

impl Serialize for IndexKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.field, &self.order.as_i8())?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey {
    pub field: String,
    pub order: IndexOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
    pub keys: Vec<IndexKey>,
}

impl IndexSpec {
    pub fn ascending(fields: &[&str]) -> Self {
        Self {
            keys: fields
                .iter()
                .map(|f| IndexKey {
                    field: f.to_string(),
                    order: IndexOrder::Ascending,
                })
                .collect(),
        }
    }

    /// Key document in shell syntax, e.g. `{ user_id: 1, date: 1 }`.
    fn key_document(&self) -> String {
        let fields: Vec<String> = self
            .keys
            .iter()
            .map(|k| format!("{}: {}", k.field, k.order.as_i8()))
            .collect();
        format!("{{ {} }}", fields.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionPlan {
    pub name: String,
    pub indexes: Vec<IndexSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexPlan {
    pub database: String,
    pub collections: Vec<CollectionPlan>,
}

impl Default for IndexPlan {
    /// Conversations are looked up by user and date, and filtered by status.
    fn default() -> Self {
        Self {
            database: "ai_diary".into(),
            collections: vec![CollectionPlan {
                name: "conversations".into(),
                indexes: vec![
                    IndexSpec::ascending(&["user_id", "date"]),
                    IndexSpec::ascending(&["status"]),
                ],
            }],
        }
    }
}

impl IndexPlan {
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn render_mongosh(&self) -> String {
        let mut out = format!("db = db.getSiblingDB('{}');\n", self.database);
        for coll in &self.collections {
            out.push_str(&format!("\ndb.createCollection('{}');\n", coll.name));
            for index in &coll.indexes {
                out.push_str(&format!(
                    "db.{}.createIndex({});\n",
                    coll.name,
                    index.key_document()
                ));
            }
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
