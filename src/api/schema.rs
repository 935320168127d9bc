//! Schema assembly and the HTTP handlers that serve it

use async_graphql::{
    http::GraphiQLSource, EmptySubscription, ErrorExtensions, Pos, Response, Schema,
};
use axum::{extract::State, response::Html, Json};

use super::{mutation::MutationRoot, query::QueryRoot, BearerToken};
use crate::{services::Services, AppState};

pub type LibrarySchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

const MAX_QUERY_DEPTH: usize = 12;

/// Build the schema; services are shared with every resolver
pub fn build_schema(services: Services) -> LibrarySchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(services)
        .limit_depth(MAX_QUERY_DEPTH)
        .finish()
}

/// Execute a GraphQL request on behalf of the bearer of the request's token
pub async fn graphql_handler(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Json(request): Json<async_graphql::Request>,
) -> Json<Response> {
    let requester = match state.services.auth.resolve(token.as_deref()).await {
        Ok(requester) => requester,
        Err(e) => {
            return Json(Response::from_errors(vec![e
                .extend()
                .into_server_error(Pos::default())]))
        }
    };

    Json(state.schema.execute(request.data(requester)).await)
}

/// Interactive explorer
pub async fn graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}
