use rest_filter::entity::{EntityStore, StoreError};
use rest_filter::events::{ChangeKind, MemoryPublisher};
use rest_filter::filter::{FilterCompiler, apply_all};
use rest_filter::query::QueryPlan;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::tempdir;

fn sample_store() -> EntityStore {
    EntityStore::from_value(json!({
        "users": [
            {"id": 1, "name": "Ann", "age": 25, "status": "active", "score": 5, "address": {"city": "Hanoi"}},
            {"id": 2, "name": "Bob", "age": 31, "status": "pending", "score": 15},
            {"id": 3, "name": "Cid", "age": 30, "status": "closed", "score": 25},
            {"id": 4, "name": "Dan", "status": "active"}
        ],
        "posts": []
    }))
    .expect("valid document")
}

fn plan(tokens: &[&str]) -> QueryPlan {
    apply_all(
        QueryPlan::new(),
        &FilterCompiler::standard().compile(tokens),
    )
}

fn ids(records: &[&Value]) -> Vec<u64> {
    records
        .iter()
        .filter_map(|r| r.get("id").and_then(Value::as_u64))
        .collect()
}

#[test]
fn test_query_applies_conjoined_filters() {
    let store = sample_store();

    let records = store.query("users", &plan(&["age<=30"])).unwrap();
    assert_eq!(ids(&records), vec![1, 3], "records without age never match");

    let records = store
        .query("users", &plan(&["age<=30", "status={active;pending}"]))
        .unwrap();
    assert_eq!(ids(&records), vec![1]);

    let records = store.query("users", &plan(&["score!=[10;20]"])).unwrap();
    assert_eq!(ids(&records), vec![1, 3]);

    let records = store.query("users", &plan(&["address.city=Hanoi"])).unwrap();
    assert_eq!(ids(&records), vec![1]);

    let records = store.query("users", &plan(&["name~%n"])).unwrap();
    assert_eq!(ids(&records), vec![1, 4]);
}

#[test]
fn test_unrecognized_filter_leaves_listing_unconstrained() {
    let store = sample_store();
    let records = store.query("users", &plan(&["score!=[abc;20]"])).unwrap();
    assert_eq!(records.len(), 4);
}

#[test]
fn test_unknown_entity_is_an_error() {
    let store = sample_store();
    assert!(matches!(
        store.query("nope", &QueryPlan::new()),
        Err(StoreError::UnknownEntity(name)) if name == "nope"
    ));
}

#[test]
fn test_mutations_publish_change_events() {
    let publisher = Arc::new(MemoryPublisher::new());
    let mut store = sample_store().with_publisher(publisher.clone(), "test-exchange");

    let created = store.create("posts", json!({"title": "hello"})).unwrap();
    assert_eq!(created["id"], json!(1));

    store.update("users", 2, json!({"status": "active", "name": "Bob"})).unwrap();
    // Nothing changes: no event
    store.update("users", 2, json!({"status": "active"})).unwrap();
    store.delete("users", 3).unwrap();

    let events = publisher.events();
    let keys: Vec<&str> = events.iter().map(|e| e.routing_key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["data.posts.created", "data.users.updated", "data.users.deleted"]
    );
    assert!(events.iter().all(|e| e.exchange == "test-exchange"));
    assert_eq!(events[1].kind, ChangeKind::Updated);
    assert_eq!(
        events[1].payload["updated_data"],
        json!({"status": "active"}),
        "only changed attributes are reported as dirty"
    );
    assert_eq!(events[2].payload["name"], json!("Cid"));
}

#[test]
fn test_bulk_delete_removes_only_matching_records() {
    let publisher = Arc::new(MemoryPublisher::new());
    let mut store = sample_store().with_publisher(publisher.clone(), "monrestapi");

    let removed = store
        .delete_where("users", &plan(&["status={active}"]))
        .unwrap();
    assert_eq!(removed.len(), 2);
    assert_eq!(store.records("users").unwrap().len(), 2);
    assert_eq!(publisher.events().len(), 2);
}

#[test]
fn test_missing_record_errors() {
    let mut store = sample_store();
    assert!(matches!(
        store.update("users", 42, json!({"a": 1})),
        Err(StoreError::RecordNotFound { id: 42, .. })
    ));
    assert!(matches!(
        store.delete("users", 42),
        Err(StoreError::RecordNotFound { .. })
    ));
    assert!(matches!(
        store.create("users", json!([1])),
        Err(StoreError::InvalidAttributes)
    ));
}

#[test]
fn test_save_and_load_round_trip_through_json5() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("data.json5");
    std::fs::write(
        &path,
        "// fixture\n{ users: [ { id: 1, name: 'Ann', }, ], }\n",
    )
    .expect("write fixture");

    let mut store = EntityStore::load(&path).expect("json5 should load");
    store.create("users", json!({"name": "Bea"})).unwrap();
    store.save(&path).expect("save");

    let reloaded = EntityStore::load(&path).expect("reload");
    assert_eq!(reloaded.entities(), vec!["users"]);
    assert_eq!(reloaded.find("users", 2).unwrap()["name"], json!("Bea"));
}

#[test]
fn test_load_reports_parse_errors_with_path() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ users: [").expect("write fixture");

    let err = EntityStore::load(&path).err().expect("should fail");
    assert!(matches!(err, StoreError::Parse { .. }));
    assert!(err.to_string().contains("broken.json"));
}
