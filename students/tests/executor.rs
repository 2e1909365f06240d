use std::sync::Arc;

use itemlayer::{memory::InMemoryStore, store::ItemStore};
use serde_json::{Value, json};
use students::{
    Executor, Request, Resolver,
    executor::{FieldRequest, OperationKind},
    resolver::IdGenerator,
};

struct FixedId;

impl IdGenerator for FixedId {
    fn next_id(&self) -> String {
        "42".to_string()
    }
}

async fn executor() -> Executor<InMemoryStore> {
    let store = Arc::new(ItemStore::new(InMemoryStore::new()));
    store.open().await.unwrap();
    Executor::new(Resolver::new(store))
}

async fn add(executor: &Executor<InMemoryStore>, first: &str, major: &str, gpa: &str) -> String {
    let response = executor
        .execute(Request::mutation([FieldRequest::new(
            "addStudent",
            json!({ "input": { "name": { "first": first }, "major": major, "gpa": gpa } }),
        )]))
        .await;

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    response.data["addStudent"]["sid"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn requests_parse_from_json() {
    let request: Request = serde_json::from_value(json!({
        "kind": "mutation",
        "fields": [{ "name": "deleteStudent", "alias": "gone", "arguments": { "input": { "sid": "s-1" } } }]
    }))
    .unwrap();

    assert_eq!(request.kind, OperationKind::Mutation);
    assert_eq!(request.fields[0].response_key(), "gone");

    let defaulted: Request = serde_json::from_value(json!({ "fields": [{ "name": "allStudents" }] })).unwrap();
    assert_eq!(defaulted.kind, OperationKind::Query);
}

#[tokio::test]
async fn added_student_is_visible_to_queries() {
    let executor = executor().await;
    let sid = add(&executor, "Ada", "Computer Science", "3.9").await;

    let response = executor
        .execute(Request::query([
            FieldRequest::new("student", json!({ "sid": sid })),
            FieldRequest::new("allStudents", json!({})),
        ]))
        .await;

    assert!(response.errors.is_empty());
    assert_eq!(response.data["student"]["name"]["first"], "Ada");
    assert_eq!(response.data["student"]["registered"], response.data["student"]["modified"]);
    assert_eq!(response.data["allStudents"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn failed_field_does_not_sink_siblings() {
    let executor = executor().await;
    add(&executor, "Ada", "Computer Science", "3.9").await;

    let response = executor
        .execute(Request::query([
            FieldRequest::new("search", json!({ "field": "major", "query": "(" })).with_alias("broken"),
            FieldRequest::new("search", json!({ "field": "major", "query": "Comp" })).with_alias("working"),
        ]))
        .await;

    assert_eq!(response.data["broken"], Value::Null);
    assert_eq!(response.data["working"].as_array().map(Vec::len), Some(1));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].path, ["broken"]);
}

#[tokio::test]
async fn search_direction_defaults_to_ascending() {
    let executor = executor().await;
    add(&executor, "Ada", "Computer Science", "3.9").await;
    add(&executor, "Alan", "Computer Engineering", "3.7").await;

    let response = executor
        .execute(Request::query([FieldRequest::new(
            "search",
            json!({ "field": "major", "query": "Comp", "sort": "gpa" }),
        )]))
        .await;

    let gpas = response.data["search"]
        .as_array()
        .unwrap()
        .iter()
        .map(|student| student["gpa"].as_str().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(gpas, ["3.7", "3.9"]);
}

#[tokio::test]
async fn unknown_fields_and_misplaced_mutations_are_field_errors() {
    let executor = executor().await;

    let response = executor
        .execute(Request::query([
            FieldRequest::new("expelStudent", json!({})),
            FieldRequest::new("addStudent", json!({ "input": {} })),
            FieldRequest::new("allStudents", json!({})),
        ]))
        .await;

    assert_eq!(response.errors.len(), 2);
    assert_eq!(response.data["expelStudent"], Value::Null);
    assert_eq!(response.data["addStudent"], Value::Null);
    assert_eq!(response.data["allStudents"], json!([]));
}

#[tokio::test]
async fn missing_required_argument_is_a_field_error() {
    let executor = executor().await;

    let response = executor.execute(Request::query([FieldRequest::new("student", json!({}))])).await;

    assert_eq!(response.data["student"], Value::Null);
    assert!(response.errors[0].message.contains("student"));
}

#[tokio::test]
async fn mutations_run_in_request_order() {
    let executor = executor().await;
    let sid = add(&executor, "Ada", "Computer Science", "3.5").await;

    let response = executor
        .execute(Request::mutation([
            FieldRequest::new("updateStudent", json!({ "input": { "sid": sid, "gpa": "3.9" } })),
            FieldRequest::new("deleteStudent", json!({ "input": { "sid": sid } })),
            FieldRequest::new("updateStudent", json!({ "input": { "sid": sid, "gpa": "4.0" } })).with_alias("late"),
        ]))
        .await;

    assert!(response.errors.is_empty());
    assert_eq!(response.data["updateStudent"]["gpa"], "3.9");
    assert_eq!(response.data["deleteStudent"], json!({ "ok": true, "deletedCount": 1 }));
    assert_eq!(response.data["late"], Value::Null);
}

#[tokio::test]
async fn invalid_dob_surfaces_as_field_error() {
    let executor = executor().await;

    let response = executor
        .execute(Request::mutation([FieldRequest::new(
            "addStudent",
            json!({ "input": { "dob": "someday" } }),
        )]))
        .await;

    assert_eq!(response.data["addStudent"], Value::Null);
    assert!(response.errors[0].message.starts_with("Invalid input"));
}

#[tokio::test]
async fn colliding_id_is_a_field_error() {
    let store = Arc::new(ItemStore::new(InMemoryStore::new()));
    store.open().await.unwrap();
    let executor = Executor::new(Resolver::new(store).with_id_generator(FixedId));

    let response = executor
        .execute(Request::mutation([
            FieldRequest::new("addStudent", json!({ "input": { "major": "CS" } })).with_alias("first"),
            FieldRequest::new("addStudent", json!({ "input": { "major": "Math" } })).with_alias("second"),
        ]))
        .await;

    assert_eq!(response.data["first"]["sid"], "42");
    assert_eq!(response.data["second"], Value::Null);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].path, ["second"]);
    assert!(response.errors[0].message.contains("already exists"));

    let after = executor
        .execute(Request::query([FieldRequest::new("student", json!({ "sid": 42 }))]))
        .await;
    assert!(after.errors.is_empty());
    assert_eq!(after.data["student"]["major"], "CS");
}

#[tokio::test]
async fn integer_ids_are_accepted() {
    let store = Arc::new(ItemStore::new(InMemoryStore::new()));
    store.open().await.unwrap();
    let executor = Executor::new(Resolver::new(store).with_id_generator(FixedId));
    add(&executor, "Ada", "CS", "3.9").await;

    let response = executor
        .execute(Request::mutation([FieldRequest::new("deleteStudent", json!({ "input": { "sid": 42 } }))]))
        .await;

    assert!(response.errors.is_empty());
    assert_eq!(response.data["deleteStudent"], json!({ "ok": true, "deletedCount": 1 }));
}

#[tokio::test]
async fn duplicate_response_keys_reject_the_request() {
    let executor = executor().await;

    let response = executor
        .execute(Request::mutation([
            FieldRequest::new("addStudent", json!({ "input": { "major": "CS" } })),
            FieldRequest::new("addStudent", json!({ "input": { "major": "Math" } })),
        ]))
        .await;

    assert!(response.data.is_empty());
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].path.is_empty());

    let all = executor.execute(Request::query([FieldRequest::new("allStudents", json!({}))])).await;
    assert_eq!(all.data["allStudents"], json!([]));
}
