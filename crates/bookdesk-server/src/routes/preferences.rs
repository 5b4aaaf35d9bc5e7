use axum::Json;
use serde::{Deserialize, Serialize};

use super::Mutation;
use crate::auth::session::SessionStore;
use crate::error::AppResult;
use crate::models::Notice;
use crate::services::theme;

#[derive(Debug, Serialize, Deserialize)]
pub struct ThemePreference {
    pub theme: String,
}

pub async fn get_theme(session: SessionStore) -> AppResult<Json<ThemePreference>> {
    Ok(Json(ThemePreference {
        theme: theme::current_theme(session.storage())?,
    }))
}

pub async fn set_theme(
    session: SessionStore,
    Json(body): Json<ThemePreference>,
) -> AppResult<Json<Mutation<ThemePreference>>> {
    theme::set_theme(session.storage(), &body.theme)?;
    Ok(Json(Mutation::new(body, Notice::success("Theme updated."))))
}
