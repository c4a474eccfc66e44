use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{config::NoteLimits, error::ApiError};

// --- Core Application Schemas (Mapped to Database) ---

/// Note
///
/// A row of the `notes` table. Every note has exactly one owner (`user_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    // Public notes are listed by `GET /notes/global` for every caller.
    pub is_public: bool,
    pub is_completed: bool,
    // FK to users.id (Owner).
    pub user_id: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// CompactNote
///
/// Response shape for create and update: identical to `Note` except that fields
/// holding null are left out of the JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CompactNote {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub content: Option<String>,
    pub is_public: bool,
    pub is_completed: bool,
    pub user_id: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl From<Note> for CompactNote {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
            is_public: note.is_public,
            is_completed: note.is_completed,
            user_id: note.user_id,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

/// NewNote
///
/// Insert payload handed to the data-access layer. The owner is always the caller,
/// never something read from the request body.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub title: String,
    pub content: Option<String>,
    pub user_id: i64,
}

/// User
///
/// A row of the `users` table. Deliberately not `Serialize`: the password hash must
/// never leave the server, so responses go through `UserRead`.
#[derive(Debug, Clone, PartialEq, FromRow, Default)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_verified: bool,
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// NewUser
///
/// Insert payload for the `users` table. The password is already hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub age: Option<i32>,
}

/// UserChanges
///
/// Partial update payload for the `users` table. `None` leaves a column untouched;
/// for the nullable profile columns `Some(None)` clears the value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub hashed_password: Option<String>,
    pub full_name: Option<Option<String>>,
    pub age: Option<Option<i32>>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
    pub is_verified: Option<bool>,
}

// --- Request Payloads (Input Schemas) ---

/// NoteCreate
///
/// Input payload for `POST /notes`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct NoteCreate {
    #[schema(example = "Groceries")]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl NoteCreate {
    /// Rejects blank or oversized fields.
    pub fn validate(&self, limits: &NoteLimits) -> Result<(), ApiError> {
        validate_title(&self.title, limits)?;
        if let Some(content) = &self.content {
            validate_content(content, limits)?;
        }
        Ok(())
    }

    pub fn into_new_note(self, user_id: i64) -> NewNote {
        NewNote {
            title: self.title,
            content: self.content,
            user_id,
        }
    }
}

/// NoteUpdate
///
/// Partial update payload for `PATCH /notes/{id}`. Only keys present in the JSON body
/// overwrite stored values. `content` distinguishes an absent key (`None`) from an
/// explicit `null` (`Some(None)`), which clears the content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct NoteUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub title: Option<String>,

    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub content: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub is_public: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub is_completed: Option<bool>,
}

impl NoteUpdate {
    pub fn validate(&self, limits: &NoteLimits) -> Result<(), ApiError> {
        if let Some(title) = &self.title {
            validate_title(title, limits)?;
        }
        if let Some(Some(content)) = &self.content {
            validate_content(content, limits)?;
        }
        Ok(())
    }
}

/// UserCreate
///
/// Input payload for `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserCreate {
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
}

impl UserCreate {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        validate_age(self.age)
    }
}

/// UserUpdate
///
/// Partial update payload for `PATCH /users/me` and `PATCH /users/{id}`.
/// The privilege flags are only honoured on the superuser route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub password: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub full_name: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<i32>)]
    #[ts(type = "number | null")]
    pub age: Option<Option<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub is_superuser: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub is_verified: Option<bool>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        if let Some(age) = self.age {
            validate_age(age)?;
        }
        Ok(())
    }

    /// Drops the privilege flags. Used when a user edits their own account.
    pub fn without_privileges(self) -> Self {
        Self {
            is_active: None,
            is_superuser: None,
            is_verified: None,
            ..self
        }
    }
}

/// LoginForm
///
/// Form-encoded credentials for `POST /auth/jwt/login`. `username` carries the email.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

// --- Output Schemas ---

/// UserRead
///
/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserRead {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_verified: bool,
    pub full_name: Option<String>,
    pub age: Option<i32>,
}

impl From<User> for UserRead {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            is_active: user.is_active,
            is_superuser: user.is_superuser,
            is_verified: user.is_verified,
            full_name: user.full_name,
            age: user.age,
        }
    }
}

/// AccessToken
///
/// Bearer token returned by a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

impl AccessToken {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

// --- Validation helpers ---

const MIN_PASSWORD_LENGTH: usize = 8;

fn validate_title(title: &str, limits: &NoteLimits) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be blank".to_string()));
    }
    let len = title.chars().count();
    if len > limits.title {
        return Err(ApiError::Validation(format!(
            "title is {len} characters long, the maximum is {}",
            limits.title
        )));
    }
    Ok(())
}

fn validate_content(content: &str, limits: &NoteLimits) -> Result<(), ApiError> {
    let len = content.chars().count();
    if len > limits.content {
        return Err(ApiError::Validation(format!(
            "content is {len} characters long, the maximum is {}",
            limits.content
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid && !email.chars().any(char::is_whitespace) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!("{email:?} is not a valid email address")))
    }
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_age(age: Option<i32>) -> Result<(), ApiError> {
    match age {
        Some(age) if age < 0 => Err(ApiError::Validation("age must not be negative".to_string())),
        _ => Ok(()),
    }
}

/// Marks a key as present even when its value is `null`, so that `Option<Option<T>>`
/// can tell "absent" apart from "explicitly cleared".
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
