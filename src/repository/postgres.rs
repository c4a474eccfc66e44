use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::marker::PhantomData;

use super::{CrudRepository, Entity, NoteRepository, StoreError, StoreResult, UserRepository};
use crate::models::{Note, User};

/// PgCrud
///
/// The PostgreSQL implementation of `CrudRepository`, written once and instantiated
/// per entity type. Reads go straight to the pool; every write runs in its own
/// transaction.
pub struct PgCrud<E> {
    pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

pub type PgNoteRepository = PgCrud<Note>;
pub type PgUserRepository = PgCrud<User>;

impl<E> PgCrud<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }
}

impl<E> Clone for PgCrud<E> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

/// settle
///
/// Commits on success. On failure the transaction is rolled back and the original
/// error is handed back untouched; a failing rollback is only logged.
async fn settle<T>(
    tx: Transaction<'static, Postgres>,
    outcome: Result<T, sqlx::Error>,
) -> StoreResult<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(StoreError::Transaction)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::error!(error = %rollback, "rollback failed");
            }
            Err(StoreError::Transaction(err))
        }
    }
}

#[async_trait]
impl<E: Entity> CrudRepository<E> for PgCrud<E> {
    async fn get(&self, id: i64) -> StoreResult<Option<E>> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", E::COLUMNS, E::TABLE);
        let row = sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_all(&self) -> StoreResult<Vec<E>> {
        let sql = format!("SELECT {} FROM {} ORDER BY id", E::COLUMNS, E::TABLE);
        let rows = sqlx::query_as::<_, E>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn create(&self, values: E::Create) -> StoreResult<E> {
        let mut query = QueryBuilder::<Postgres>::new(format!("INSERT INTO {} ", E::TABLE));
        E::push_insert(values, &mut query);
        query.push(" RETURNING ").push(E::COLUMNS);

        let mut tx = self.pool.begin().await.map_err(StoreError::Transaction)?;
        let outcome = query.build_query_as::<E>().fetch_one(&mut *tx).await;
        settle(tx, outcome).await
    }

    async fn update(&self, id: i64, changes: E::Update) -> StoreResult<Option<E>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("UPDATE {} SET ", E::TABLE));
        {
            let mut set = query.separated(", ");
            E::push_assignments(changes, &mut set);
            set.push("updated_at = NOW()");
        }
        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(E::COLUMNS);

        let mut tx = self.pool.begin().await.map_err(StoreError::Transaction)?;
        let outcome = query.build_query_as::<E>().fetch_optional(&mut *tx).await;
        settle(tx, outcome).await
    }

    async fn delete(&self, id: i64) -> StoreResult<Option<E>> {
        let sql = format!(
            "DELETE FROM {} WHERE id = $1 RETURNING {}",
            E::TABLE,
            E::COLUMNS
        );

        let mut tx = self.pool.begin().await.map_err(StoreError::Transaction)?;
        let outcome = sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await;
        settle(tx, outcome).await
    }
}

#[async_trait]
impl NoteRepository for PgCrud<Note> {
    async fn list_by_owner(&self, owner_id: i64) -> StoreResult<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE user_id = $1 ORDER BY id",
            Note::COLUMNS,
            Note::TABLE
        );
        let notes = sqlx::query_as::<_, Note>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(notes)
    }

    async fn list_public(&self) -> StoreResult<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE is_public = true ORDER BY id",
            Note::COLUMNS,
            Note::TABLE
        );
        let notes = sqlx::query_as::<_, Note>(&sql).fetch_all(&self.pool).await?;
        Ok(notes)
    }
}

#[async_trait]
impl UserRepository for PgCrud<User> {
    async fn get_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE lower(email) = lower($1)",
            User::COLUMNS,
            User::TABLE
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}
