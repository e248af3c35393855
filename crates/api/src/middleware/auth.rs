//! API-key authentication for system endpoints.
//!
//! Each registered system has its own key in the `systems` table. Callers
//! send it in the `X-API-Key` header; the extractor only pulls the header
//! out, the per-system comparison happens in [`authorize_system`] once the
//! handler knows which system the request targets.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use genpipe_core::error::CoreError;
use genpipe_db::models::system::System;
use genpipe_db::repositories::SystemRepo;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};

/// Header carrying the system credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Raw API key extracted from the `X-API-Key` request header.
///
/// Rejects with 401 when the header is missing. Use together with
/// [`authorize_system`]:
///
/// ```ignore
/// async fn handler(key: ApiKey, State(state): State<AppState>) -> AppResult<Json<()>> {
///     let system = authorize_system(&state.pool, "some-system", &key).await?;
///     ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiKey(pub String);

impl<S> FromRequestParts<S> for ApiKey
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Missing X-API-Key header".into()))
            })?;

        Ok(ApiKey(key.to_string()))
    }
}

/// Look up a system by slug and verify the caller's key against it.
///
/// Unknown slug is 404, wrong key is 401.
pub async fn authorize_system(pool: &PgPool, slug: &str, key: &ApiKey) -> AppResult<System> {
    let system = SystemRepo::find_by_slug(pool, slug)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "System",
            key: slug.to_string(),
        }))?;

    if system.api_key != key.0 {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid API key for this system".into(),
        )));
    }

    Ok(system)
}
