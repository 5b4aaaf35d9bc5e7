use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::auth::guard;
use crate::error::AppResult;
use crate::models::Identity;
use crate::services::analytics::{self, AdminOverview, UserOverview};
use crate::services::help::{self, Contact, Faq};

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Overview {
    Admin(AdminOverview),
    User(UserOverview),
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub user: Identity,
    pub overview: Overview,
}

#[derive(Debug, Deserialize)]
pub struct HelpQuery {
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HelpView {
    pub faqs: Vec<Faq>,
    pub contacts: &'static [Contact],
}

pub async fn overview(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
) -> AppResult<Json<DashboardView>> {
    let overview = if guard::is_admin(Some(&user)) {
        Overview::Admin(analytics::admin_overview(&state.repo, &state.cache, &user)?)
    } else {
        Overview::User(analytics::user_overview(&state.repo, &state.cache, &user)?)
    };
    Ok(Json(DashboardView { user, overview }))
}

pub async fn help(Query(query): Query<HelpQuery>) -> Json<HelpView> {
    Json(HelpView {
        faqs: help::search_faqs(query.search.as_deref()),
        contacts: &help::CONTACTS,
    })
}
