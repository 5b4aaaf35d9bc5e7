//! Document store adapter.
//!
//! Four collections of JSON documents (`users`, `services`, `bookings`,
//! `payments`). Callers work through [`Repository`], which owns the
//! translation between raw documents and the typed models; nothing outside
//! [`records`] looks at raw field names or fills in missing values.

pub mod local;
mod records;
mod repo;
mod sqlite;

use serde_json::{Map, Value};

pub use records::{NewBooking, NewPayment, NewService, NewUser, ProfileChanges, ServiceChanges};
pub use repo::Repository;
pub use sqlite::SqliteDocumentStore;

/// A collection in the document store, doubling as the query cache tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Users,
    Services,
    Bookings,
    Payments,
}

impl EntityKind {
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Users => "users",
            EntityKind::Services => "services",
            EntityKind::Bookings => "bookings",
            EntityKind::Payments => "payments",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            EntityKind::Users => "User",
            EntityKind::Services => "Service",
            EntityKind::Bookings => "Booking",
            EntityKind::Payments => "Payment",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            EntityKind::Users => 0,
            EntityKind::Services => 1,
            EntityKind::Bookings => 2,
            EntityKind::Payments => 3,
        }
    }
}

/// Equality filter over top-level document fields; all clauses must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::default().and(field, value)
    }

    pub fn and(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push((field.to_string(), value.into()));
        self
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: Map<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{} {id} not found", kind.singular())]
    NotFound { kind: EntityKind, id: String },

    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

/// Per-collection CRUD over JSON documents.
///
/// Writes are independent requests: there are no transactions spanning
/// documents and concurrent updates to one document resolve last-write-wins.
pub trait DocumentStore: Send + Sync {
    fn get_all(&self, kind: EntityKind, filter: Option<&Filter>) -> Result<Vec<Document>, StoreError>;

    fn get_one(&self, kind: EntityKind, id: &str) -> Result<Option<Document>, StoreError>;

    /// Inserts a document under a generated id and returns that id.
    fn create(&self, kind: EntityKind, record: &Map<String, Value>) -> Result<String, StoreError>;

    /// Inserts or replaces the document stored under `id`.
    fn put(&self, kind: EntityKind, id: &str, record: &Map<String, Value>) -> Result<(), StoreError>;

    /// Merges `partial` into an existing document.
    fn update(&self, kind: EntityKind, id: &str, partial: &Map<String, Value>) -> Result<(), StoreError>;

    fn delete(&self, kind: EntityKind, id: &str) -> Result<(), StoreError>;
}
