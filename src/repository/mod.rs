use async_trait::async_trait;
use sqlx::{
    FromRow, Postgres, QueryBuilder,
    postgres::PgRow,
    query_builder::Separated,
};
use std::sync::Arc;

use crate::models::{Note, User};

mod entities;
mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::{PgCrud, PgNoteRepository, PgUserRepository};

/// StoreError
///
/// Failures raised by the data-access layer. Mutations that fail are rolled back
/// before the error is returned, and the original `sqlx::Error` is kept as the source.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("not authorized to act on note {note_id}")]
    Forbidden { note_id: i64 },

    #[error("transaction rolled back: {0}")]
    Transaction(#[source] sqlx::Error),

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
}

impl StoreError {
    /// True when the store rejected a write because of a unique constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Transaction(sqlx::Error::Database(db)) | Self::Query(sqlx::Error::Database(db)) => {
                db.is_unique_violation()
            }
            _ => false,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Entity
///
/// Describes how a row type maps onto its table so that one generic implementation
/// (`PgCrud<E>`) can serve every entity. `Create` and `Update` are the insert and
/// partial-update payloads; they write their own column lists into the query.
pub trait Entity: for<'r> FromRow<'r, PgRow> + Clone + Send + Sync + Unpin + 'static {
    /// Human-readable entity name, used in error messages.
    const NAME: &'static str;
    const TABLE: &'static str;
    /// Column list selected by every read and returned by every write.
    const COLUMNS: &'static str;

    type Create: Send + 'static;
    type Update: Send + 'static;

    /// Writes `(columns) VALUES (binds)` for an insert.
    fn push_insert<'args>(values: Self::Create, query: &mut QueryBuilder<'args, Postgres>);

    /// Writes one `column = bind` assignment per supplied field. Fields left unset in
    /// `changes` must not produce an assignment. `updated_at` is handled by the caller.
    fn push_assignments<'args>(
        changes: Self::Update,
        set: &mut Separated<'_, 'args, Postgres, &'static str>,
    );
}

/// CrudRepository
///
/// Generic create/read/update/delete contract over an entity type. `Send + Sync` and
/// `async_trait` keep it usable as `Arc<dyn ...>` across Axum's task boundaries.
#[async_trait]
pub trait CrudRepository<E: Entity>: Send + Sync {
    async fn get(&self, id: i64) -> StoreResult<Option<E>>;

    /// Every row, ordered by id.
    async fn get_all(&self) -> StoreResult<Vec<E>>;

    /// Inserts a row and returns it with its generated id and timestamps.
    async fn create(&self, values: E::Create) -> StoreResult<E>;

    /// Applies only the supplied fields and refreshes `updated_at`.
    /// Returns `None` if no row has this id.
    async fn update(&self, id: i64, changes: E::Update) -> StoreResult<Option<E>>;

    /// Removes a row and returns it, or `None` if no row has this id.
    async fn delete(&self, id: i64) -> StoreResult<Option<E>>;
}

/// NoteRepository
///
/// Note-specific queries on top of the generic CRUD contract.
#[async_trait]
pub trait NoteRepository: CrudRepository<Note> {
    async fn list_by_owner(&self, owner_id: i64) -> StoreResult<Vec<Note>>;

    /// Notes with `is_public = true`, whoever owns them.
    async fn list_public(&self) -> StoreResult<Vec<Note>>;

    /// assert_owner
    ///
    /// Fetches the note and checks that `caller_id` owns it.
    /// Fails with `NotFound` if the note is absent and `Forbidden` on an owner mismatch.
    async fn assert_owner(&self, note_id: i64, caller_id: i64) -> StoreResult<Note> {
        let note = <Self as CrudRepository<Note>>::get(self, note_id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: <Note as Entity>::NAME,
                id: note_id,
            })?;

        if note.user_id != caller_id {
            return Err(StoreError::Forbidden { note_id });
        }
        Ok(note)
    }
}

/// UserRepository
///
/// Account lookups needed by authentication on top of the generic CRUD contract.
#[async_trait]
pub trait UserRepository: CrudRepository<User> {
    /// Case-insensitive lookup by email.
    async fn get_by_email(&self, email: &str) -> StoreResult<Option<User>>;
}

/// Shared handles stored in `AppState`.
pub type NoteRepositoryState = Arc<dyn NoteRepository>;
pub type UserRepositoryState = Arc<dyn UserRepository>;
