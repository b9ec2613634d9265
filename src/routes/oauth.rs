use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};

use crate::oauth::{AuthorizeRequest, OAuthError, TokenRequest};
use crate::state::AppState;

pub async fn authorize_query(
    State(state): State<AppState>,
    Query(req): Query<AuthorizeRequest>,
) -> Result<Redirect, OAuthError> {
    authorize(&state, req).await
}

pub async fn authorize_form(
    State(state): State<AppState>,
    Form(req): Form<AuthorizeRequest>,
) -> Result<Redirect, OAuthError> {
    authorize(&state, req).await
}

async fn authorize(state: &AppState, req: AuthorizeRequest) -> Result<Redirect, OAuthError> {
    let location = state.oauth.authorize(req).await?;
    Ok(Redirect::to(&location))
}

pub async fn token(
    State(state): State<AppState>,
    Form(req): Form<TokenRequest>,
) -> Result<Response, OAuthError> {
    let tokens = state.oauth.token(req).await?;
    Ok(([(header::CACHE_CONTROL, "no-store")], Json(tokens)).into_response())
}
