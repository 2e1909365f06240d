//! Resolvers for the student operations.
//!
//! Each operation maps its arguments onto exactly one item access layer call and
//! shapes the result for the API. The resolver never opens the store; it is handed
//! one that is shared and already open.

use std::sync::Arc;

use itemlayer::{
    backend::StoreBackend,
    collection::TypedCollection,
    query::{Filter, Query, SortDirection},
    store::ItemStore,
};
use tracing::debug;

use crate::{
    error::ResolverResult,
    model::{DeleteInput, DeleteResponse, Student, StudentInput, StudentRecord},
};

/// Source of the modification timestamps, in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Source of new student ids.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random (version 4) UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

pub struct Resolver<B: StoreBackend> {
    store: Arc<ItemStore<B>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl<B: StoreBackend> Resolver<B> {
    pub fn new(store: Arc<ItemStore<B>>) -> Self {
        Self { store, clock: Arc::new(SystemClock), ids: Arc::new(UuidGenerator) }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn store(&self) -> &ItemStore<B> {
        &self.store
    }

    fn students(&self) -> TypedCollection<'_, B, StudentRecord> {
        self.store.typed_collection::<StudentRecord>()
    }

    /// `student(sid)`: the student with the given id, if any.
    pub async fn student(&self, sid: &str) -> ResolverResult<Option<Student>> {
        let found = self.students().find_one(Filter::eq("sid", sid)).await?;

        Ok(found.map(Student::from))
    }

    /// `allStudents`: every student, in store order.
    pub async fn all_students(&self) -> ResolverResult<Vec<Student>> {
        let found = self.students().find_many(Query::new()).await?;

        Ok(found.into_iter().map(Student::from).collect())
    }

    /// `search(field, query, sort, direction)`: students whose `field` matches the
    /// pattern `query`, ordered by `sort` when given.
    ///
    /// `direction` must be `1` or `-1`.
    pub async fn search(
        &self,
        field: &str,
        query: &str,
        sort: Option<&str>,
        direction: i32,
    ) -> ResolverResult<Vec<Student>> {
        let direction = SortDirection::try_from(direction)?;

        let mut builder = Query::builder().filter(Filter::regex(field, query));
        if let Some(sort) = sort {
            builder = builder.sort(sort, direction);
        }

        debug!(field, query, sort, "searching students");

        let found = self.students().find_many(builder.build()).await?;

        Ok(found.into_iter().map(Student::from).collect())
    }

    /// `addStudent(input)`: stores a new student with a fresh id. Registration and
    /// modification times are both set to now.
    pub async fn add_student(&self, input: StudentInput) -> ResolverResult<Student> {
        let record = input.into_record(self.ids.next_id(), self.clock.now_millis())?;
        let created = self.students().create(&record).await?;

        debug!(sid = %created.sid, "student added");

        Ok(Student::from(created))
    }

    /// `updateStudent(input)`: overwrites the supplied fields of the student `input.sid`
    /// and refreshes its modification time.
    ///
    /// Returns `None` when no student has that id.
    pub async fn update_student(&self, input: StudentInput) -> ResolverResult<Option<Student>> {
        let (sid, patch) = input.into_patch(self.clock.now_millis())?;
        let updated = self.students().update(Filter::eq("sid", sid.as_str()), &patch).await?;

        debug!(sid = %sid, matched = updated.is_some(), "student updated");

        Ok(updated.map(Student::from))
    }

    /// `deleteStudent(input)`: removes the student `input.sid`. Deleting an unknown
    /// id succeeds with a count of zero.
    pub async fn delete_student(&self, input: DeleteInput) -> ResolverResult<DeleteResponse> {
        let outcome = self.students().delete(Filter::eq("sid", input.sid.as_str())).await?;

        debug!(sid = %input.sid, deleted = outcome.deleted_count, "student deleted");

        Ok(DeleteResponse { ok: outcome.ok, deleted_count: outcome.deleted_count })
    }
}

impl<B: StoreBackend> std::fmt::Debug for Resolver<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").field("store", &self.store).finish_non_exhaustive()
    }
}
