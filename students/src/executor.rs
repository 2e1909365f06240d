//! Request execution: dispatches each requested field to its resolver and
//! assembles a response with per-field errors.
//!
//! A request names its operation kind and a list of fields:
//!
//! ```json
//! {"kind": "query", "fields": [
//!     {"name": "search", "alias": "cs", "arguments": {"field": "major", "query": "Comp", "sort": "gpa", "direction": -1}}
//! ]}
//! ```
//!
//! Query fields are resolved concurrently; mutation fields run one after another in
//! request order. A failed field yields `null` under its key and an entry in
//! `errors`; the other fields still resolve. Response keys (alias, else name) must
//! be unique within a request.

use std::collections::HashSet;

use futures::future::join_all;
use itemlayer::backend::StoreBackend;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    error::ResolverError,
    model::{DeleteInput, StudentInput, deserialize_id},
    resolver::Resolver,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    #[default]
    Query,
    Mutation,
}

impl OperationKind {
    fn type_name(self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldRequest {
    #[serde(default)]
    pub alias: Option<String>,
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl FieldRequest {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { alias: None, name: name.into(), arguments }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The key the field's result is stored under.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub kind: OperationKind,
    pub fields: Vec<FieldRequest>,
}

impl Request {
    pub fn query(fields: impl IntoIterator<Item = FieldRequest>) -> Self {
        Self { kind: OperationKind::Query, fields: fields.into_iter().collect() }
    }

    pub fn mutation(fields: impl IntoIterator<Item = FieldRequest>) -> Self {
        Self { kind: OperationKind::Mutation, fields: fields.into_iter().collect() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub message: String,
    pub path: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
    pub data: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl Response {
    /// A response for a request that could not be read at all.
    pub fn request_error(message: impl Into<String>) -> Self {
        Self { data: Map::new(), errors: vec![FieldError { message: message.into(), path: Vec::new() }] }
    }
}

/// Why a single field failed.
#[derive(Error, Debug)]
pub enum FieldFailure {
    #[error("Cannot query field \"{0}\" on type \"{1}\"")]
    UnknownField(String, &'static str),
    #[error("Invalid arguments for \"{0}\": {1}")]
    InvalidArguments(String, serde_json::Error),
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    #[error("Failed to render result: {0}")]
    Output(serde_json::Error),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArguments {}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StudentArguments {
    #[serde(deserialize_with = "deserialize_id")]
    sid: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchArguments {
    field: String,
    query: String,
    #[serde(default)]
    sort: Option<String>,
    #[serde(default = "ascending")]
    direction: i32,
}

fn ascending() -> i32 {
    1
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct InputArguments<T> {
    input: T,
}

enum Operation {
    Student(StudentArguments),
    AllStudents,
    Search(SearchArguments),
    AddStudent(StudentInput),
    UpdateStudent(StudentInput),
    DeleteStudent(DeleteInput),
}

impl Operation {
    fn parse(kind: OperationKind, field: &FieldRequest) -> Result<Self, FieldFailure> {
        let operation = match (kind, field.name.as_str()) {
            (OperationKind::Query, "student") => Operation::Student(arguments(field)?),
            (OperationKind::Query, "allStudents") => {
                arguments::<NoArguments>(field)?;
                Operation::AllStudents
            }
            (OperationKind::Query, "search") => Operation::Search(arguments(field)?),
            (OperationKind::Mutation, "addStudent") => {
                Operation::AddStudent(arguments::<InputArguments<_>>(field)?.input)
            }
            (OperationKind::Mutation, "updateStudent") => {
                Operation::UpdateStudent(arguments::<InputArguments<_>>(field)?.input)
            }
            (OperationKind::Mutation, "deleteStudent") => {
                Operation::DeleteStudent(arguments::<InputArguments<_>>(field)?.input)
            }
            (kind, name) => return Err(FieldFailure::UnknownField(name.to_string(), kind.type_name())),
        };
        Ok(operation)
    }
}

fn duplicate_key(fields: &[FieldRequest]) -> Option<&str> {
    let mut seen = HashSet::new();
    fields
        .iter()
        .map(FieldRequest::response_key)
        .find(|key| !seen.insert(*key))
}

fn arguments<T: DeserializeOwned>(field: &FieldRequest) -> Result<T, FieldFailure> {
    serde_json::from_value(Value::Object(field.arguments.clone()))
        .map_err(|err| FieldFailure::InvalidArguments(field.name.clone(), err))
}

#[derive(Debug)]
pub struct Executor<B: StoreBackend> {
    resolver: Resolver<B>,
}

impl<B: StoreBackend> Executor<B> {
    pub fn new(resolver: Resolver<B>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Resolver<B> {
        &self.resolver
    }

    /// Resolves every field of the request.
    ///
    /// A request in which two fields share a response key is rejected as a whole,
    /// before any field runs.
    pub async fn execute(&self, request: Request) -> Response {
        debug!(kind = ?request.kind, fields = request.fields.len(), "executing request");

        if let Some(key) = duplicate_key(&request.fields) {
            warn!(key, "duplicate response key");
            return Response::request_error(format!(
                "Fields share the response key \"{key}\"; use an alias to tell them apart"
            ));
        }

        let kind = request.kind;
        let results = match kind {
            OperationKind::Query => {
                join_all(
                    request
                        .fields
                        .iter()
                        .map(|field| async move { (field, self.resolve(kind, field).await) }),
                )
                .await
            }
            OperationKind::Mutation => {
                let mut results = Vec::with_capacity(request.fields.len());
                for field in &request.fields {
                    results.push((field, self.resolve(kind, field).await));
                }
                results
            }
        };

        let mut response = Response::default();
        for (field, result) in results {
            let key = field.response_key().to_string();
            match result {
                Ok(value) => {
                    response.data.insert(key, value);
                }
                Err(err) => {
                    warn!(field = %field.name, error = %err, "field failed");
                    response.data.insert(key.clone(), Value::Null);
                    response.errors.push(FieldError { message: err.to_string(), path: vec![key] });
                }
            }
        }
        response
    }

    async fn resolve(&self, kind: OperationKind, field: &FieldRequest) -> Result<Value, FieldFailure> {
        let resolver = &self.resolver;

        let value = match Operation::parse(kind, field)? {
            Operation::Student(args) => serde_json::to_value(resolver.student(&args.sid).await?),
            Operation::AllStudents => serde_json::to_value(resolver.all_students().await?),
            Operation::Search(args) => serde_json::to_value(
                resolver
                    .search(&args.field, &args.query, args.sort.as_deref(), args.direction)
                    .await?,
            ),
            Operation::AddStudent(input) => serde_json::to_value(resolver.add_student(input).await?),
            Operation::UpdateStudent(input) => serde_json::to_value(resolver.update_student(input).await?),
            Operation::DeleteStudent(input) => serde_json::to_value(resolver.delete_student(input).await?),
        };

        value.map_err(FieldFailure::Output)
    }
}
