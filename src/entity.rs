use crate::events::{ChangeEvent, ChangeKind, ChangePublisher, NoopPublisher};
use crate::query::QueryPlan;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Attributes that clients can never assign
const GUARDED: &[&str] = &["id"];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read data file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write data file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse data file '{path}': {message}")]
    Parse { path: String, message: String },
    #[error("Entity '{0}' must be an array of JSON objects")]
    NotACollection(String),
    #[error("Data document must be an object mapping entity names to record arrays")]
    NotADocument,
    #[error("Unknown entity '{0}'")]
    UnknownEntity(String),
    #[error("No record with id {id} in entity '{entity}'")]
    RecordNotFound { entity: String, id: u64 },
    #[error("Entity '{0}' has no id left to assign")]
    IdExhausted(String),
    #[error("Record attributes must be a JSON object")]
    InvalidAttributes,
    #[error("Failed to serialize entities: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// In-memory collections of JSON records, addressed by entity name
pub struct EntityStore {
    collections: BTreeMap<String, Vec<Value>>,
    publisher: Arc<dyn ChangePublisher>,
    exchange: String,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self {
            collections: BTreeMap::new(),
            publisher: Arc::new(NoopPublisher),
            exchange: "monrestapi".to_string(),
        }
    }
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from `{"entity": [{...}, ...], ...}`
    pub fn from_value(document: Value) -> Result<Self, StoreError> {
        let Value::Object(entities) = document else {
            return Err(StoreError::NotADocument);
        };

        let mut store = Self::new();
        for (name, records) in entities {
            let Value::Array(records) = records else {
                return Err(StoreError::NotACollection(name));
            };
            if !records.iter().all(Value::is_object) {
                return Err(StoreError::NotACollection(name));
            }
            store.collections.insert(name, records);
        }
        Ok(store)
    }

    /// Load a JSON5 data file (plain JSON is valid JSON5)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let path_display = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path_display.clone(),
            source,
        })?;
        let document: Value = json5::from_str(&raw).map_err(|err| StoreError::Parse {
            path: path_display,
            message: err.to_string(),
        })?;

        let store = Self::from_value(document)?;
        debug!(
            path = %path.display(),
            entities = store.collections.len(),
            "data file loaded"
        );
        Ok(store)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let body = serde_json::to_string_pretty(&self.collections)?;
        fs::write(path, body + "\n").map_err(|source| StoreError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn with_publisher(
        mut self,
        publisher: Arc<dyn ChangePublisher>,
        exchange: impl Into<String>,
    ) -> Self {
        self.publisher = publisher;
        self.exchange = exchange.into();
        self
    }

    pub fn entities(&self) -> Vec<&str> {
        self.collections.keys().map(String::as_str).collect()
    }

    pub fn records(&self, entity: &str) -> Result<&[Value], StoreError> {
        self.collections
            .get(entity)
            .map(Vec::as_slice)
            .ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))
    }

    /// Records of `entity` satisfying every constraint of `plan`, in storage order
    pub fn query(&self, entity: &str, plan: &QueryPlan) -> Result<Vec<&Value>, StoreError> {
        let records = self.records(entity)?;
        let matched = plan.filter(records);
        debug!(
            entity,
            predicate = %plan,
            scanned = records.len(),
            matched = matched.len(),
            "query executed"
        );
        Ok(matched)
    }

    pub fn find(&self, entity: &str, id: u64) -> Result<&Value, StoreError> {
        self.records(entity)?
            .iter()
            .find(|record| record_id(record) == Some(id))
            .ok_or_else(|| StoreError::RecordNotFound {
                entity: entity.to_string(),
                id,
            })
    }

    /// Insert a record. The id is always assigned by the store; a missing
    /// entity is created on first insert.
    pub fn create(&mut self, entity: &str, attributes: Value) -> Result<Value, StoreError> {
        let mut attributes = fillable(attributes)?;
        let records = self.collections.entry(entity.to_string()).or_default();
        let id = records
            .iter()
            .filter_map(record_id)
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| StoreError::IdExhausted(entity.to_string()))?;

        let mut record = Map::new();
        record.insert("id".to_string(), Value::from(id));
        record.append(&mut attributes);
        let record = Value::Object(record);
        records.push(record.clone());

        self.notify(ChangeEvent::new(
            &self.exchange,
            entity,
            ChangeKind::Created,
            record.clone(),
        ));
        Ok(record)
    }

    /// Merge attributes into an existing record. No event is published when
    /// nothing actually changed.
    pub fn update(&mut self, entity: &str, id: u64, attributes: Value) -> Result<Value, StoreError> {
        let attributes = fillable(attributes)?;
        let record = self.find_mut(entity, id)?;
        let Value::Object(fields) = &mut *record else {
            return Err(StoreError::NotACollection(entity.to_string()));
        };

        let mut dirty = Map::new();
        for (key, value) in attributes {
            if fields.get(&key) != Some(&value) {
                dirty.insert(key.clone(), value.clone());
                fields.insert(key, value);
            }
        }
        let updated = record.clone();

        if dirty.is_empty() {
            debug!(entity, id, "update changed nothing");
        } else {
            self.notify(ChangeEvent::updated(
                &self.exchange,
                entity,
                &updated,
                Value::Object(dirty),
            ));
        }
        Ok(updated)
    }

    pub fn delete(&mut self, entity: &str, id: u64) -> Result<Value, StoreError> {
        let records = self
            .collections
            .get_mut(entity)
            .ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))?;
        let position = records
            .iter()
            .position(|record| record_id(record) == Some(id))
            .ok_or_else(|| StoreError::RecordNotFound {
                entity: entity.to_string(),
                id,
            })?;
        let removed = records.remove(position);

        self.notify(ChangeEvent::new(
            &self.exchange,
            entity,
            ChangeKind::Deleted,
            removed.clone(),
        ));
        Ok(removed)
    }

    /// Bulk delete every record satisfying `plan`; one event per record
    pub fn delete_where(&mut self, entity: &str, plan: &QueryPlan) -> Result<Vec<Value>, StoreError> {
        let records = self
            .collections
            .get_mut(entity)
            .ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))?;

        let (removed, kept): (Vec<Value>, Vec<Value>) =
            records.drain(..).partition(|record| plan.matches(record));
        *records = kept;

        for record in &removed {
            self.notify(ChangeEvent::new(
                &self.exchange,
                entity,
                ChangeKind::Deleted,
                record.clone(),
            ));
        }
        Ok(removed)
    }

    fn find_mut(&mut self, entity: &str, id: u64) -> Result<&mut Value, StoreError> {
        self.collections
            .get_mut(entity)
            .ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))?
            .iter_mut()
            .find(|record| record_id(record) == Some(id))
            .ok_or_else(|| StoreError::RecordNotFound {
                entity: entity.to_string(),
                id,
            })
    }

    fn notify(&self, event: ChangeEvent) {
        if let Err(err) = self.publisher.publish(&event) {
            warn!(routing_key = %event.routing_key, error = %err, "change event not published");
        }
    }
}

pub fn record_id(record: &Value) -> Option<u64> {
    match record.get("id")? {
        // JSON5 input may hand integral ids over as floats
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn fillable(attributes: Value) -> Result<Map<String, Value>, StoreError> {
    let Value::Object(mut attributes) = attributes else {
        return Err(StoreError::InvalidAttributes);
    };
    for key in GUARDED {
        attributes.remove(*key);
    }
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_rejects_non_collections() {
        assert!(matches!(
            EntityStore::from_value(json!([1, 2])),
            Err(StoreError::NotADocument)
        ));
        assert!(matches!(
            EntityStore::from_value(json!({"users": {"id": 1}})),
            Err(StoreError::NotACollection(name)) if name == "users"
        ));
        assert!(matches!(
            EntityStore::from_value(json!({"users": [1]})),
            Err(StoreError::NotACollection(_))
        ));
    }

    #[test]
    fn test_create_assigns_next_id_and_guards_supplied_id() {
        let mut store = EntityStore::from_value(json!({"users": [{"id": 7, "name": "a"}]})).unwrap();
        let created = store
            .create("users", json!({"id": 1, "name": "b"}))
            .unwrap();
        assert_eq!(created, json!({"id": 8, "name": "b"}));
        assert_eq!(store.records("users").unwrap().len(), 2);
    }

    #[test]
    fn test_create_fails_when_ids_are_exhausted() {
        let mut store =
            EntityStore::from_value(json!({"users": [{"id": u64::MAX, "name": "a"}]})).unwrap();
        assert!(matches!(
            store.create("users", json!({"name": "b"})),
            Err(StoreError::IdExhausted(name)) if name == "users"
        ));
        assert_eq!(store.records("users").unwrap().len(), 1);
    }

    #[test]
    fn test_update_keeps_id_and_merges() {
        let mut store =
            EntityStore::from_value(json!({"users": [{"id": 1, "name": "a", "age": 3}]})).unwrap();
        let updated = store
            .update("users", 1, json!({"id": 99, "age": 4}))
            .unwrap();
        assert_eq!(updated, json!({"id": 1, "name": "a", "age": 4}));
    }

    #[test]
    fn test_string_ids_are_accepted() {
        let store = EntityStore::from_value(json!({"users": [{"id": "12"}]})).unwrap();
        assert!(store.find("users", 12).is_ok());
        assert!(matches!(
            store.find("users", 13),
            Err(StoreError::RecordNotFound { id: 13, .. })
        ));
    }
}
