use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use notes_api::{
    AppState, InMemoryRepository,
    auth::{self, AuthUser},
    config::AppConfig,
    extract::{ValidForm, ValidJson, ValidPath},
    handlers,
    models::{CompactNote, LoginForm, Note, NoteCreate, NoteUpdate, User, UserCreate, UserUpdate},
};
use std::sync::Arc;
use tokio::test;

// --- TEST UTILITIES ---

const ALICE: i64 = 1;
const BOB: i64 = 2;
const ROOT: i64 = 3;

fn seeded_repo() -> Arc<InMemoryRepository> {
    let repo = Arc::new(InMemoryRepository::new());
    seed_users(&repo);
    repo
}

fn seed_users(repo: &InMemoryRepository) {
    for (id, is_superuser) in [(ALICE, false), (BOB, false), (ROOT, true)] {
        repo.seed_user(User {
            id,
            email: format!("user{id}@example.com"),
            hashed_password: "not-a-real-hash".to_string(),
            is_active: true,
            is_superuser,
            ..User::default()
        });
    }
}

fn create_test_state(repo: Arc<InMemoryRepository>) -> AppState {
    AppState::in_memory(repo, AppConfig::default())
}

fn user(id: i64) -> AuthUser {
    AuthUser {
        id,
        is_superuser: false,
    }
}

fn superuser() -> AuthUser {
    AuthUser {
        id: ROOT,
        is_superuser: true,
    }
}

fn new_note(title: &str, content: Option<&str>) -> NoteCreate {
    NoteCreate {
        title: title.to_string(),
        content: content.map(str::to_string),
    }
}

async fn create_as(state: &AppState, owner: i64, title: &str) -> CompactNote {
    let (status, Json(note)) = handlers::create_note(
        user(owner),
        State(state.clone()),
        ValidJson(new_note(title, Some("body"))),
    )
    .await
    .expect("note creation should succeed");
    assert_eq!(status, StatusCode::CREATED);
    note
}

async fn patch(
    state: &AppState,
    caller: AuthUser,
    id: i64,
    changes: NoteUpdate,
) -> Result<CompactNote, notes_api::ApiError> {
    handlers::update_note(caller, State(state.clone()), ValidPath(id), Ok(Json(changes)))
        .await
        .map(|Json(note)| note)
}

// --- NOTE HANDLERS ---

#[test]
async fn test_create_note_assigns_caller_and_defaults() {
    let state = create_test_state(seeded_repo());

    let note = create_as(&state, ALICE, "Groceries").await;

    assert_eq!(note.user_id, ALICE);
    assert_eq!(note.title, "Groceries");
    assert_eq!(note.content.as_deref(), Some("body"));
    assert!(note.is_public);
    assert!(note.is_completed);
}

#[test]
async fn test_create_note_title_limits() {
    let state = create_test_state(seeded_repo());

    let at_limit = "t".repeat(100);
    let result = handlers::create_note(
        user(ALICE),
        State(state.clone()),
        ValidJson(new_note(&at_limit, None)),
    )
    .await;
    assert!(result.is_ok(), "a 100 character title is allowed");

    let too_long = "t".repeat(101);
    let err = handlers::create_note(
        user(ALICE),
        State(state.clone()),
        ValidJson(new_note(&too_long, None)),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let err = handlers::create_note(user(ALICE), State(state), ValidJson(new_note("   ", None)))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
async fn test_create_note_content_limit() {
    let state = create_test_state(seeded_repo());
    let content = "c".repeat(1001);

    let err = handlers::create_note(
        user(ALICE),
        State(state.clone()),
        ValidJson(new_note("Long", Some(&content))),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err.code(), "VALIDATION_ERROR");
    // Nothing was stored.
    let Json(notes) = handlers::list_notes(user(ALICE), State(state)).await.unwrap();
    assert!(notes.is_empty());
}

#[test]
async fn test_create_note_storage_failure_is_internal_error() {
    let repo = Arc::new(InMemoryRepository::new_failing());
    seed_users(&repo);
    let state = create_test_state(repo);

    let err = handlers::create_note(
        user(ALICE),
        State(state.clone()),
        ValidJson(new_note("Doomed", None)),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.code(), "INTERNAL_ERROR");
    let Json(notes) = handlers::list_notes(superuser(), State(state)).await.unwrap();
    assert!(notes.is_empty(), "a failed write leaves no trace");
}

#[test]
async fn test_get_note_owner_and_superuser() {
    let state = create_test_state(seeded_repo());
    let created = create_as(&state, ALICE, "Mine").await;

    let Json(note) = handlers::get_note(user(ALICE), State(state.clone()), ValidPath(created.id))
        .await
        .unwrap();
    assert_eq!(note.id, created.id);

    let Json(note) = handlers::get_note(superuser(), State(state), ValidPath(created.id))
        .await
        .unwrap();
    assert_eq!(note.user_id, ALICE);
}

#[test]
async fn test_get_note_forbidden_even_when_public() {
    let state = create_test_state(seeded_repo());
    let created = create_as(&state, ALICE, "Shared").await;
    assert!(created.is_public);

    let err = handlers::get_note(user(BOB), State(state), ValidPath(created.id))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
}

#[test]
async fn test_get_note_not_found() {
    let state = create_test_state(seeded_repo());

    let err = handlers::get_note(user(ALICE), State(state), ValidPath(999))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_update_note_only_touches_supplied_fields() {
    let state = create_test_state(seeded_repo());
    let created = create_as(&state, ALICE, "Keep me").await;

    let updated = patch(
        &state,
        user(ALICE),
        created.id,
        NoteUpdate {
            is_completed: Some(false),
            ..NoteUpdate::default()
        },
    )
    .await
    .unwrap();

    assert!(!updated.is_completed);
    assert_eq!(updated.title, "Keep me");
    assert_eq!(updated.content.as_deref(), Some("body"));
    assert!(updated.is_public);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);
}

#[test]
async fn test_update_note_title_only() {
    let state = create_test_state(seeded_repo());
    let created = create_as(&state, ALICE, "Old").await;
    // Start from non-default flags so an accidental reset would show.
    let before = patch(
        &state,
        user(ALICE),
        created.id,
        NoteUpdate {
            is_public: Some(false),
            is_completed: Some(false),
            ..NoteUpdate::default()
        },
    )
    .await
    .unwrap();

    let changes: NoteUpdate = serde_json::from_str(r#"{"title": "New"}"#).unwrap();
    let updated = patch(&state, user(ALICE), created.id, changes).await.unwrap();

    assert_eq!(updated.title, "New");
    assert_eq!(updated.content, before.content);
    assert_eq!(updated.is_public, before.is_public);
    assert_eq!(updated.is_completed, before.is_completed);
    assert_eq!(updated.user_id, ALICE);
    assert!(updated.updated_at > before.updated_at);
}

#[test]
async fn test_update_note_null_content_clears_and_is_omitted() {
    let state = create_test_state(seeded_repo());
    let created = create_as(&state, ALICE, "Clear body").await;

    let updated = patch(
        &state,
        user(ALICE),
        created.id,
        NoteUpdate {
            content: Some(None),
            ..NoteUpdate::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.content, None);
    let json = serde_json::to_value(&updated).unwrap();
    assert!(json.get("content").is_none(), "null fields are left out: {json}");

    let Json(stored) = handlers::get_note(user(ALICE), State(state), ValidPath(created.id))
        .await
        .unwrap();
    assert_eq!(stored.content, None);
}

#[test]
async fn test_update_note_non_owner_forbidden_and_unchanged() {
    let state = create_test_state(seeded_repo());
    let created = create_as(&state, ALICE, "Original").await;

    let err = patch(
        &state,
        user(BOB),
        created.id,
        NoteUpdate {
            title: Some("Hijacked".to_string()),
            ..NoteUpdate::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

    let Json(stored) = handlers::get_note(user(ALICE), State(state), ValidPath(created.id))
        .await
        .unwrap();
    assert_eq!(stored.title, "Original");
}

#[test]
async fn test_update_note_superuser_bypass() {
    let state = create_test_state(seeded_repo());
    let created = create_as(&state, ALICE, "Moderate me").await;

    let updated = patch(
        &state,
        superuser(),
        created.id,
        NoteUpdate {
            is_public: Some(false),
            ..NoteUpdate::default()
        },
    )
    .await
    .unwrap();

    assert!(!updated.is_public);
    assert_eq!(updated.user_id, ALICE, "ownership never changes");
}

#[test]
async fn test_update_note_missing_and_invalid() {
    let state = create_test_state(seeded_repo());

    let err = patch(&state, user(ALICE), 42, NoteUpdate::default())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

    let created = create_as(&state, ALICE, "Valid").await;
    let err = patch(
        &state,
        user(ALICE),
        created.id,
        NoteUpdate {
            title: Some("x".repeat(101)),
            ..NoteUpdate::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
async fn test_delete_note_then_not_found() {
    let state = create_test_state(seeded_repo());
    let created = create_as(&state, ALICE, "Temporary").await;

    let status = handlers::delete_note(user(ALICE), State(state.clone()), ValidPath(created.id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    for _ in 0..2 {
        let err = handlers::delete_note(user(ALICE), State(state.clone()), ValidPath(created.id))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    let err = handlers::get_note(user(ALICE), State(state), ValidPath(created.id))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_delete_note_non_owner_forbidden() {
    let state = create_test_state(seeded_repo());
    let created = create_as(&state, ALICE, "Not yours").await;

    let err = handlers::delete_note(user(BOB), State(state.clone()), ValidPath(created.id))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

    assert!(
        handlers::get_note(user(ALICE), State(state.clone()), ValidPath(created.id))
            .await
            .is_ok()
    );

    let status = handlers::delete_note(superuser(), State(state), ValidPath(created.id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[test]
async fn test_list_notes_scoped_to_owner() {
    let state = create_test_state(seeded_repo());
    create_as(&state, ALICE, "A1").await;
    create_as(&state, ALICE, "A2").await;
    create_as(&state, BOB, "B1").await;

    let Json(alice_notes) = handlers::list_notes(user(ALICE), State(state.clone()))
        .await
        .unwrap();
    assert_eq!(alice_notes.len(), 2);
    assert!(alice_notes.iter().all(|n| n.user_id == ALICE));

    let Json(bob_notes) = handlers::list_notes(user(BOB), State(state.clone()))
        .await
        .unwrap();
    assert_eq!(bob_notes.len(), 1);

    let Json(all) = handlers::list_notes(superuser(), State(state)).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
async fn test_list_public_notes_across_owners() {
    let state = create_test_state(seeded_repo());
    let shared = create_as(&state, ALICE, "Shared").await;
    let private = create_as(&state, BOB, "Private").await;
    patch(
        &state,
        user(BOB),
        private.id,
        NoteUpdate {
            is_public: Some(false),
            ..NoteUpdate::default()
        },
    )
    .await
    .unwrap();

    let Json(global) = handlers::list_public_notes(user(BOB), State(state))
        .await
        .unwrap();

    let ids: Vec<i64> = global.iter().map(|n: &Note| n.id).collect();
    assert_eq!(ids, vec![shared.id]);
}

// --- USER HANDLERS ---

fn registration(email: &str, password: &str) -> UserCreate {
    UserCreate {
        email: email.to_string(),
        password: password.to_string(),
        full_name: Some("Test User".to_string()),
        age: Some(30),
    }
}

#[test]
async fn test_register_and_login() {
    let state = create_test_state(Arc::new(InMemoryRepository::new()));

    let (status, Json(created)) = handlers::register_user(
        State(state.clone()),
        ValidJson(registration("carol@example.com", "correct-horse")),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert!(created.is_active);
    assert!(!created.is_superuser);
    assert!(!created.is_verified);

    let Json(token) = handlers::login(
        State(state.clone()),
        ValidForm(LoginForm {
            username: "Carol@Example.com".to_string(),
            password: "correct-horse".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(token.token_type, "bearer");

    let claims = auth::validate_token(&token.access_token, &state.config.jwt_secret).unwrap();
    assert_eq!(claims.sub, created.id.to_string());
}

#[test]
async fn test_register_duplicate_email_case_insensitive() {
    let state = create_test_state(Arc::new(InMemoryRepository::new()));
    handlers::register_user(
        State(state.clone()),
        ValidJson(registration("dave@example.com", "password-1")),
    )
    .await
    .unwrap();

    let err = handlers::register_user(
        State(state),
        ValidJson(registration("DAVE@example.com", "password-2")),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(err.code(), "REGISTER_USER_ALREADY_EXISTS");
}

#[test]
async fn test_email_matching_folds_non_ascii_case() {
    let state = create_test_state(Arc::new(InMemoryRepository::new()));
    handlers::register_user(
        State(state.clone()),
        ValidJson(registration("élise@example.com", "password-1")),
    )
    .await
    .unwrap();

    let err = handlers::register_user(
        State(state.clone()),
        ValidJson(registration("ÉLISE@EXAMPLE.COM", "password-2")),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "REGISTER_USER_ALREADY_EXISTS");

    let login = handlers::login(
        State(state),
        ValidForm(LoginForm {
            username: "Élise@Example.com".to_string(),
            password: "password-1".to_string(),
        }),
    )
    .await;
    assert!(login.is_ok());
}

#[test]
async fn test_register_rejects_invalid_fields() {
    let state = create_test_state(Arc::new(InMemoryRepository::new()));

    for payload in [
        registration("erin@example.com", "short"),
        registration("not-an-email", "long-enough"),
        UserCreate {
            age: Some(-1),
            ..registration("erin@example.com", "long-enough")
        },
    ] {
        let err = handlers::register_user(State(state.clone()), ValidJson(payload))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

#[test]
async fn test_login_bad_credentials() {
    let state = create_test_state(Arc::new(InMemoryRepository::new()));
    handlers::register_user(
        State(state.clone()),
        ValidJson(registration("frank@example.com", "right-password")),
    )
    .await
    .unwrap();

    for (username, password) in [
        ("frank@example.com", "wrong-password"),
        ("nobody@example.com", "right-password"),
    ] {
        let err = handlers::login(
            State(state.clone()),
            ValidForm(LoginForm {
                username: username.to_string(),
                password: password.to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "LOGIN_BAD_CREDENTIALS");
    }
}

#[test]
async fn test_update_me_ignores_privilege_flags() {
    let state = create_test_state(seeded_repo());

    let Json(me) = handlers::update_me(
        user(ALICE),
        State(state),
        ValidJson(UserUpdate {
            full_name: Some(Some("Alice".to_string())),
            is_superuser: Some(true),
            is_verified: Some(true),
            ..UserUpdate::default()
        }),
    )
    .await
    .unwrap();

    assert_eq!(me.full_name.as_deref(), Some("Alice"));
    assert!(!me.is_superuser);
    assert!(!me.is_verified);
}

#[test]
async fn test_update_me_email_taken() {
    let state = create_test_state(seeded_repo());

    let err = handlers::update_me(
        user(ALICE),
        State(state),
        ValidJson(UserUpdate {
            email: Some(format!("user{BOB}@example.com")),
            ..UserUpdate::default()
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.code(), "UPDATE_USER_EMAIL_ALREADY_EXISTS");
}

#[test]
async fn test_user_admin_routes_require_superuser() {
    let state = create_test_state(seeded_repo());

    let err = handlers::get_user(user(ALICE), State(state.clone()), ValidPath(BOB))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

    let Json(bob) = handlers::get_user(superuser(), State(state.clone()), ValidPath(BOB))
        .await
        .unwrap();
    assert_eq!(bob.id, BOB);

    let Json(bob) = handlers::update_user(
        superuser(),
        State(state.clone()),
        ValidPath(BOB),
        ValidJson(UserUpdate {
            is_active: Some(false),
            ..UserUpdate::default()
        }),
    )
    .await
    .unwrap();
    assert!(!bob.is_active);

    let err = handlers::get_user(superuser(), State(state), ValidPath(404))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_get_me_and_logout() {
    let state = create_test_state(seeded_repo());

    let Json(me) = handlers::get_me(user(BOB), State(state)).await.unwrap();
    assert_eq!(me.email, format!("user{BOB}@example.com"));

    assert_eq!(handlers::logout(user(BOB)).await, StatusCode::NO_CONTENT);
}
