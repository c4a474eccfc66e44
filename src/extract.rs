//! Request extraction that reports failures in the API error envelope.

use axum::{
    Form, Json,
    extract::{
        FromRequest, FromRequestParts, Path, Request,
        rejection::{FormRejection, JsonRejection, PathRejection},
    },
    http::request::Parts,
};

use crate::error::ApiError;

/// ValidJson
///
/// Drop-in replacement for `Json<T>` whose rejection is a 422 `ApiError::Validation`
/// instead of Axum's plain-text response.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Json::<T>::from_request(req, state).await;
        json_body(body).map(ValidJson)
    }
}

/// Unwraps a deferred `Json` extraction. Handlers that must authorize before looking
/// at the body take `Result<Json<T>, JsonRejection>` and call this afterwards.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::Validation(rejection.body_text()))
}

/// ValidPath
///
/// `Path<T>` with enveloped rejections: an unparsable segment such as `/notes/abc`
/// is a 422. A route wired without the parameter is a server bug and stays a 500.
pub struct ValidPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ValidPath(value)),
            Err(rejection) if rejection.status().is_server_error() => {
                Err(ApiError::Internal(rejection.body_text()))
            }
            Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
        }
    }
}

/// ValidForm
///
/// `Form<T>` whose rejection (missing field, wrong content type) is a 422 envelope.
pub struct ValidForm<T>(pub T);

impl<S, T> FromRequest<S> for ValidForm<T>
where
    Form<T>: FromRequest<S, Rejection = FormRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Form::<T>::from_request(req, state)
            .await
            .map(|Form(value)| ValidForm(value))
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))
    }
}
