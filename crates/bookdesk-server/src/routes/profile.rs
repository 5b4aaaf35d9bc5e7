use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use super::{AppState, Mutation};
use crate::auth::session::SessionStore;
use crate::error::AppResult;
use crate::models::{Identity, Profile};
use crate::services::users;
use crate::store::ProfileChanges;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureRequest {
    #[serde(default)]
    pub data_url: String,
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
) -> AppResult<Json<Profile>> {
    Ok(Json(users::get_profile(&state.repo, &user)?))
}

/// A changed name is written through to the session as well.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    mut session: SessionStore,
    Json(changes): Json<ProfileChanges>,
) -> AppResult<Json<Mutation<Profile>>> {
    let committed = users::update_profile(&state.repo, &state.cache, &user, changes)?;
    let notice = committed.notice("Profile updated successfully");
    let profile = committed.into_inner();

    if profile.identity.name != user.name {
        session.refresh(Identity {
            name: profile.identity.name.clone(),
            ..user
        })?;
    }
    Ok(Json(Mutation::new(profile, notice)))
}

pub async fn set_picture(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    Json(body): Json<PictureRequest>,
) -> AppResult<Json<Mutation<()>>> {
    let committed = users::set_profile_pic(&state.repo, &state.cache, &user, &body.data_url)?;
    Ok(Json(Mutation::committed(committed, "Profile picture updated!")))
}
