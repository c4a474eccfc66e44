use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    extract::{ValidJson, ValidPath, json_body},
    models::{CompactNote, Note, NoteCreate, NoteUpdate},
    policy,
};

fn note_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("note {id} not found"))
}

/// create_note
///
/// [Authenticated Route] Creates a note owned by the caller. The owner is taken from
/// the resolved identity, never from the body. Null fields are omitted from the response.
#[utoipa::path(
    post,
    path = "/notes",
    request_body = NoteCreate,
    responses(
        (status = 201, description = "Created", body = CompactNote),
        (status = 422, description = "Invalid fields")
    )
)]
pub async fn create_note(
    caller: AuthUser,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<NoteCreate>,
) -> ApiResult<(StatusCode, Json<CompactNote>)> {
    payload.validate(&state.config.note_limits)?;

    let note = state.notes.create(payload.into_new_note(caller.id)).await?;
    tracing::info!(note_id = note.id, user_id = caller.id, "note created");

    Ok((StatusCode::CREATED, Json(note.into())))
}

/// list_notes
///
/// [Authenticated Route] The caller's own notes, or every note for a superuser.
#[utoipa::path(
    get,
    path = "/notes",
    responses((status = 200, description = "Notes", body = [Note]))
)]
pub async fn list_notes(
    caller: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Note>>> {
    let notes = if caller.is_superuser {
        state.notes.get_all().await?
    } else {
        state.notes.list_by_owner(caller.id).await?
    };
    Ok(Json(notes))
}

/// list_public_notes
///
/// [Authenticated Route] Every note marked public, for any role.
#[utoipa::path(
    get,
    path = "/notes/global",
    responses((status = 200, description = "Public notes", body = [Note]))
)]
pub async fn list_public_notes(
    _caller: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Note>>> {
    Ok(Json(state.notes.list_public().await?))
}

/// get_note
///
/// [Authenticated Route] A single note. Non-owners get 403 even when the note is
/// public; public notes are only shared through `/notes/global`.
#[utoipa::path(
    get,
    path = "/notes/{id}",
    params(("id" = i64, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Found", body = Note),
        (status = 403, description = "Not owner"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_note(
    caller: AuthUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<Json<Note>> {
    let note = state.notes.get(id).await?.ok_or_else(|| note_not_found(id))?;

    if !policy::can_read(&caller, &note) {
        return Err(ApiError::Forbidden(format!("note {id} belongs to another user")));
    }
    Ok(Json(note))
}

/// update_note
///
/// [Authenticated Route] Partial update. Authorization runs before the body is even
/// parsed, so a non-owner gets 403 whatever they send.
#[utoipa::path(
    patch,
    path = "/notes/{id}",
    params(("id" = i64, Path, description = "Note ID")),
    request_body = NoteUpdate,
    responses(
        (status = 200, description = "Updated", body = CompactNote),
        (status = 403, description = "Not owner"),
        (status = 404, description = "Not found"),
        (status = 422, description = "Invalid fields")
    )
)]
pub async fn update_note(
    caller: AuthUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
    payload: Result<Json<NoteUpdate>, JsonRejection>,
) -> ApiResult<Json<CompactNote>> {
    policy::authorize(state.notes.as_ref(), &caller, id).await?;

    let changes = json_body(payload)?;
    changes.validate(&state.config.note_limits)?;

    let note = state
        .notes
        .update(id, changes)
        .await?
        .ok_or_else(|| note_not_found(id))?;
    tracing::info!(note_id = id, user_id = caller.id, "note updated");

    Ok(Json(note.into()))
}

/// delete_note
///
/// [Authenticated Route] Removes a note. Deleting an id that is already gone is a 404,
/// every time.
#[utoipa::path(
    delete,
    path = "/notes/{id}",
    params(("id" = i64, Path, description = "Note ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not owner"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_note(
    caller: AuthUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<StatusCode> {
    policy::authorize(state.notes.as_ref(), &caller, id).await?;

    state
        .notes
        .delete(id)
        .await?
        .ok_or_else(|| note_not_found(id))?;
    tracing::info!(note_id = id, user_id = caller.id, "note deleted");

    Ok(StatusCode::NO_CONTENT)
}
