use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{CrudRepository, NoteRepository, StoreError, StoreResult, UserRepository};
use crate::models::{NewNote, NewUser, Note, NoteUpdate, User, UserChanges};

/// InMemoryRepository
///
/// A process-local implementation of the note and user repositories, used by the test
/// suites to exercise handlers and the router without a database. One instance backs
/// both traits so notes and users share the same tables.
///
/// With `new_failing()` every write is rejected with `StoreError::Transaction` and
/// leaves the tables untouched, mirroring a rolled-back transaction.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
    fail_writes: bool,
}

#[derive(Default)]
struct Tables {
    notes: BTreeMap<i64, Note>,
    users: BTreeMap<i64, User>,
    last_note_id: i64,
    last_user_id: i64,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Inserts a fully-formed user, bypassing hashing. Test fixture helper.
    pub fn seed_user(&self, user: User) -> User {
        let mut tables = self.lock();
        tables.last_user_id = tables.last_user_id.max(user.id);
        tables.users.insert(user.id, user.clone());
        user
    }

    /// Inserts a fully-formed note. Test fixture helper.
    pub fn seed_note(&self, note: Note) -> Note {
        let mut tables = self.lock();
        tables.last_note_id = tables.last_note_id.max(note.id);
        tables.notes.insert(note.id, note.clone());
        note
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // Every operation leaves the maps consistent, so a poisoned lock is still usable.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes {
            return Err(StoreError::Transaction(sqlx::Error::Protocol(
                "simulated write failure".to_string(),
            )));
        }
        Ok(())
    }
}

/// Strictly later than `previous`, so consecutive writes always advance `updated_at`.
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous + Duration::microseconds(1))
}

#[async_trait]
impl CrudRepository<Note> for InMemoryRepository {
    async fn get(&self, id: i64) -> StoreResult<Option<Note>> {
        Ok(self.lock().notes.get(&id).cloned())
    }

    async fn get_all(&self) -> StoreResult<Vec<Note>> {
        Ok(self.lock().notes.values().cloned().collect())
    }

    async fn create(&self, values: NewNote) -> StoreResult<Note> {
        self.check_writable()?;
        let mut tables = self.lock();
        tables.last_note_id += 1;
        let now = Utc::now();
        let note = Note {
            id: tables.last_note_id,
            title: values.title,
            content: values.content,
            is_public: true,
            is_completed: true,
            user_id: values.user_id,
            created_at: now,
            updated_at: now,
        };
        tables.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn update(&self, id: i64, changes: NoteUpdate) -> StoreResult<Option<Note>> {
        self.check_writable()?;
        let mut tables = self.lock();
        let Some(note) = tables.notes.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            note.title = title;
        }
        if let Some(content) = changes.content {
            note.content = content;
        }
        if let Some(is_public) = changes.is_public {
            note.is_public = is_public;
        }
        if let Some(is_completed) = changes.is_completed {
            note.is_completed = is_completed;
        }
        note.updated_at = next_timestamp(note.updated_at);
        Ok(Some(note.clone()))
    }

    async fn delete(&self, id: i64) -> StoreResult<Option<Note>> {
        self.check_writable()?;
        Ok(self.lock().notes.remove(&id))
    }
}

#[async_trait]
impl NoteRepository for InMemoryRepository {
    async fn list_by_owner(&self, owner_id: i64) -> StoreResult<Vec<Note>> {
        Ok(self
            .lock()
            .notes
            .values()
            .filter(|note| note.user_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_public(&self) -> StoreResult<Vec<Note>> {
        Ok(self
            .lock()
            .notes
            .values()
            .filter(|note| note.is_public)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CrudRepository<User> for InMemoryRepository {
    async fn get(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn get_all(&self) -> StoreResult<Vec<User>> {
        Ok(self.lock().users.values().cloned().collect())
    }

    async fn create(&self, values: NewUser) -> StoreResult<User> {
        self.check_writable()?;
        let mut tables = self.lock();
        tables.last_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: tables.last_user_id,
            email: values.email,
            hashed_password: values.hashed_password,
            is_active: true,
            is_superuser: false,
            is_verified: false,
            full_name: values.full_name,
            age: values.age,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> StoreResult<Option<User>> {
        self.check_writable()?;
        let mut tables = self.lock();
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hashed_password) = changes.hashed_password {
            user.hashed_password = hashed_password;
        }
        if let Some(full_name) = changes.full_name {
            user.full_name = full_name;
        }
        if let Some(age) = changes.age {
            user.age = age;
        }
        if let Some(is_active) = changes.is_active {
            user.is_active = is_active;
        }
        if let Some(is_superuser) = changes.is_superuser {
            user.is_superuser = is_superuser;
        }
        if let Some(is_verified) = changes.is_verified {
            user.is_verified = is_verified;
        }
        user.updated_at = next_timestamp(user.updated_at);
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i64) -> StoreResult<Option<User>> {
        self.check_writable()?;
        let mut tables = self.lock();
        let removed = tables.users.remove(&id);
        if removed.is_some() {
            // Mirrors ON DELETE CASCADE on notes.user_id.
            tables.notes.retain(|_, note| note.user_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn get_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        // Same folding as `lower(email) = lower($1)` in Postgres.
        let wanted = email.to_lowercase();
        Ok(self
            .lock()
            .users
            .values()
            .find(|user| user.email.to_lowercase() == wanted)
            .cloned())
    }
}
