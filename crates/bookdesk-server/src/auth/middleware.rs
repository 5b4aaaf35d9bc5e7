use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;

use super::guard::{self, Decision};
use super::reset::generate_token;
use super::session::SessionStore;
use crate::error::AppError;
use crate::routes::AppState;

pub const CLIENT_COOKIE: &str = "bookdesk_client";

/// Identifies the browser whose durable storage backs the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

fn is_valid_client_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 64
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn build_client_cookie(id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((CLIENT_COOKIE, id))
        .path("/")
        .max_age(time::Duration::days(365))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Tags every request with a client id, issuing a fresh cookie when missing.
pub async fn assign_client(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = jar
        .get(CLIENT_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| is_valid_client_id(v));

    let (jar, client_id) = match existing {
        Some(id) => (jar, id),
        None => {
            let id = generate_token();
            tracing::debug!("Issuing new client id");
            let cookie = build_client_cookie(id.clone(), state.config.secure_cookies);
            (jar.add(cookie), id)
        }
    };

    request.extensions_mut().insert(ClientId(client_id));
    let response = next.run(request).await;
    (jar, response).into_response()
}

impl FromRequestParts<AppState> for SessionStore {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let client = parts
            .extensions
            .get::<ClientId>()
            .ok_or(AppError::Unauthorized)?;
        Ok(state.session_for(&client.0))
    }
}

fn redirect(path: &str, to: &'static str) -> Response {
    tracing::debug!(path, to, "Gate redirect");
    Redirect::to(to).into_response()
}

pub async fn require_guest(
    State(state): State<AppState>,
    Extension(client): Extension<ClientId>,
    request: Request,
    next: Next,
) -> Response {
    let session = state.session_for(&client.0);
    match guard::guest(session.current()) {
        Decision::Allow => next.run(request).await,
        Decision::Redirect(to) => redirect(request.uri().path(), to),
    }
}

/// Dashboard subtree gate. Admits signed-in users and exposes their identity
/// to handlers as an `Extension<Identity>`.
pub async fn require_project(
    State(state): State<AppState>,
    Extension(client): Extension<ClientId>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = state.session_for(&client.0);
    match guard::project(session.current(), request.uri().path()) {
        Decision::Allow => {
            if let Some(identity) = session.current() {
                request.extensions_mut().insert(identity.clone());
            }
            next.run(request).await
        }
        Decision::Redirect(to) => redirect(request.uri().path(), to),
    }
}

pub async fn require_admin(
    State(state): State<AppState>,
    Extension(client): Extension<ClientId>,
    request: Request,
    next: Next,
) -> Response {
    let session = state.session_for(&client.0);
    match guard::admin(session.current()) {
        Decision::Allow => next.run(request).await,
        Decision::Redirect(to) => redirect(request.uri().path(), to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ids_are_restricted_to_token_alphabet() {
        assert!(is_valid_client_id(&generate_token()));
        assert!(is_valid_client_id("abc-DEF_123"));
        assert!(!is_valid_client_id(""));
        assert!(!is_valid_client_id("../etc"));
        assert!(!is_valid_client_id(&"a".repeat(65)));
    }
}
