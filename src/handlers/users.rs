use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{ApiError, ApiResult},
    extract::{ValidForm, ValidJson, ValidPath},
    models::{AccessToken, LoginForm, NewUser, UserChanges, UserCreate, UserRead, UserUpdate},
    repository::StoreError,
};

const REGISTER_USER_ALREADY_EXISTS: &str = "REGISTER_USER_ALREADY_EXISTS";
const LOGIN_BAD_CREDENTIALS: &str = "LOGIN_BAD_CREDENTIALS";
const UPDATE_USER_EMAIL_ALREADY_EXISTS: &str = "UPDATE_USER_EMAIL_ALREADY_EXISTS";

fn user_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("user {id} not found"))
}

fn require_superuser(caller: &AuthUser) -> ApiResult<()> {
    if caller.is_superuser {
        Ok(())
    } else {
        Err(ApiError::Forbidden("superuser role required".to_string()))
    }
}

/// register_user
///
/// [Public Route] Creates an account. Emails are unique, compared case-insensitively.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = UserCreate,
    responses(
        (status = 201, description = "Registered", body = UserRead),
        (status = 400, description = "Email already registered"),
        (status = 422, description = "Invalid fields")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<UserCreate>,
) -> ApiResult<(StatusCode, Json<UserRead>)> {
    payload.validate()?;

    if state.users.get_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::BadRequest(REGISTER_USER_ALREADY_EXISTS));
    }

    let new_user = NewUser {
        email: payload.email,
        hashed_password: auth::hash_password(&payload.password)?,
        full_name: payload.full_name,
        age: payload.age,
    };

    let user = state.users.create(new_user).await.map_err(|e| {
        if e.is_unique_violation() {
            ApiError::BadRequest(REGISTER_USER_ALREADY_EXISTS)
        } else {
            ApiError::Store(e)
        }
    })?;
    tracing::info!(user_id = user.id, "user registered");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// login
///
/// [Public Route] Exchanges form-encoded credentials for a bearer token.
/// Unknown email, wrong password and inactive account all answer the same way.
#[utoipa::path(
    post,
    path = "/auth/jwt/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token", body = AccessToken),
        (status = 400, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidForm(form): ValidForm<LoginForm>,
) -> ApiResult<Json<AccessToken>> {
    let user = state
        .users
        .get_by_email(&form.username)
        .await?
        .ok_or(ApiError::BadRequest(LOGIN_BAD_CREDENTIALS))?;

    if !user.is_active || !auth::verify_password(&form.password, &user.hashed_password)? {
        return Err(ApiError::BadRequest(LOGIN_BAD_CREDENTIALS));
    }

    let token = auth::issue_token(
        user.id,
        &state.config.jwt_secret,
        state.config.token_lifetime_secs,
    )?;
    tracing::info!(user_id = user.id, "user logged in");

    Ok(Json(AccessToken::bearer(token)))
}

/// logout
///
/// [Authenticated Route] Tokens are stateless, so there is nothing to revoke; the
/// route only confirms the token was valid.
#[utoipa::path(
    post,
    path = "/auth/jwt/logout",
    responses((status = 204, description = "Logged out"), (status = 401, description = "Invalid token"))
)]
pub async fn logout(_caller: AuthUser) -> StatusCode {
    StatusCode::NO_CONTENT
}

/// get_me
///
/// [Authenticated Route] The caller's own account.
#[utoipa::path(
    get,
    path = "/users/me",
    responses((status = 200, description = "Profile", body = UserRead))
)]
pub async fn get_me(caller: AuthUser, State(state): State<AppState>) -> ApiResult<Json<UserRead>> {
    let user = state
        .users
        .get(caller.id)
        .await?
        .ok_or_else(|| user_not_found(caller.id))?;
    Ok(Json(user.into()))
}

/// update_me
///
/// [Authenticated Route] Edits the caller's own account. Privilege flags in the body
/// are ignored.
#[utoipa::path(
    patch,
    path = "/users/me",
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated", body = UserRead),
        (status = 400, description = "Email already registered"),
        (status = 422, description = "Invalid fields")
    )
)]
pub async fn update_me(
    caller: AuthUser,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<UserUpdate>,
) -> ApiResult<Json<UserRead>> {
    let user = apply_user_update(&state, caller.id, payload.without_privileges()).await?;
    Ok(Json(user))
}

/// get_user
///
/// [Admin Route] Any account by id. Superuser only.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserRead),
        (status = 403, description = "Not a superuser"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_user(
    caller: AuthUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<Json<UserRead>> {
    require_superuser(&caller)?;
    let user = state.users.get(id).await?.ok_or_else(|| user_not_found(id))?;
    Ok(Json(user.into()))
}

/// update_user
///
/// [Admin Route] Edits any account, including its privilege flags. Superuser only.
#[utoipa::path(
    patch,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated", body = UserRead),
        (status = 403, description = "Not a superuser"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_user(
    caller: AuthUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(payload): ValidJson<UserUpdate>,
) -> ApiResult<Json<UserRead>> {
    require_superuser(&caller)?;
    let user = apply_user_update(&state, id, payload).await?;
    tracing::info!(user_id = id, by = caller.id, "user updated by superuser");
    Ok(Json(user))
}

async fn apply_user_update(state: &AppState, id: i64, payload: UserUpdate) -> ApiResult<UserRead> {
    payload.validate()?;

    if let Some(email) = &payload.email {
        let taken = state
            .users
            .get_by_email(email)
            .await?
            .is_some_and(|existing| existing.id != id);
        if taken {
            return Err(ApiError::BadRequest(UPDATE_USER_EMAIL_ALREADY_EXISTS));
        }
    }

    let hashed_password = payload
        .password
        .as_deref()
        .map(auth::hash_password)
        .transpose()?;

    let changes = UserChanges {
        email: payload.email,
        hashed_password,
        full_name: payload.full_name,
        age: payload.age,
        is_active: payload.is_active,
        is_superuser: payload.is_superuser,
        is_verified: payload.is_verified,
    };

    let user = state
        .users
        .update(id, changes)
        .await
        .map_err(|e: StoreError| {
            if e.is_unique_violation() {
                ApiError::BadRequest(UPDATE_USER_EMAIL_ALREADY_EXISTS)
            } else {
                ApiError::Store(e)
            }
        })?
        .ok_or_else(|| user_not_found(id))?;

    Ok(user.into())
}
