use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use super::Mutation;
use crate::auth::provider::InteractiveOutcome;
use crate::auth::session::SessionStore;
use crate::error::AppResult;
use crate::models::{Identity, Notice};

#[derive(Debug, Serialize)]
pub struct EntryView {
    pub sign_in_methods: [&'static str; 2],
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// What the client relays after the interactive sign-in window closes.
#[derive(Debug, Deserialize)]
pub struct ProviderRequest {
    pub assertion: Option<String>,
    #[serde(default)]
    pub cancelled: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmResetRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}

fn signed_in(session: &SessionStore, notice: Notice) -> Json<Mutation<Option<Identity>>> {
    Json(Mutation::new(session.current().cloned(), notice))
}

pub async fn entry() -> Json<EntryView> {
    Json(EntryView {
        sign_in_methods: ["credentials", "provider"],
    })
}

pub async fn sign_in(
    mut session: SessionStore,
    Json(body): Json<SignInRequest>,
) -> AppResult<Json<Mutation<Option<Identity>>>> {
    let notice = session
        .sign_in_with_credentials(&body.email, &body.password)
        .await?;
    Ok(signed_in(&session, notice))
}

pub async fn sign_up(
    mut session: SessionStore,
    Json(body): Json<SignUpRequest>,
) -> AppResult<impl IntoResponse> {
    let notice = session
        .sign_up_with_credentials(&body.name, &body.email, &body.password)
        .await?;
    Ok((StatusCode::CREATED, signed_in(&session, notice)))
}

pub async fn provider_sign_in(
    mut session: SessionStore,
    Json(body): Json<ProviderRequest>,
) -> AppResult<Json<Mutation<Option<Identity>>>> {
    let outcome = match body.assertion {
        Some(assertion) if !body.cancelled => InteractiveOutcome::Assertion(assertion),
        _ => InteractiveOutcome::Cancelled,
    };
    let notice = session.sign_in_with_provider(outcome).await?;
    Ok(signed_in(&session, notice))
}

pub async fn logout(mut session: SessionStore) -> AppResult<Json<Mutation<Option<Identity>>>> {
    let notice = session.logout()?;
    Ok(signed_in(&session, notice))
}

pub async fn reset_password(
    session: SessionStore,
    Json(body): Json<ResetRequest>,
) -> AppResult<Json<Mutation<()>>> {
    let notice = session.reset_password(&body.email).await?;
    Ok(Json(Mutation::new((), notice)))
}

pub async fn confirm_reset(
    session: SessionStore,
    Json(body): Json<ConfirmResetRequest>,
) -> AppResult<Json<Mutation<()>>> {
    let notice = session
        .confirm_password_reset(&body.token, &body.password)
        .await?;
    Ok(Json(Mutation::new((), notice)))
}
