//! API surface: the GraphQL endpoint and health checks

pub mod health;
pub mod mutation;
pub mod objects;
pub mod query;
pub mod schema;

use std::convert::Infallible;

use async_graphql::{Context, ErrorExtensions};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::{
    error::{AppError, AppResult},
    models::user::Requester,
    services::Services,
    AppState,
};

pub use schema::{build_schema, LibrarySchema};

/// Bearer token from the Authorization header, if any.
/// Malformed headers are treated as absent; the caller is then anonymous.
pub struct BearerToken(pub Option<String>);

#[async_trait]
impl FromRequestParts<AppState> for BearerToken {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        Ok(BearerToken(token))
    }
}

pub(crate) fn services<'a>(ctx: &Context<'a>) -> &'a Services {
    ctx.data_unchecked::<Services>()
}

/// Requester attached by the HTTP handler; anonymous when executed without one
pub(crate) fn requester(ctx: &Context<'_>) -> Requester {
    ctx.data_opt::<Requester>().copied().unwrap_or(Requester::Anonymous)
}

/// Map a missing entity to `null` instead of an error
pub(crate) fn optional<T>(result: AppResult<T>) -> async_graphql::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AppError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.extend()),
    }
}
