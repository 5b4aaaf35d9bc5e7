use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use super::{AppState, Mutation};
use crate::error::AppResult;
use crate::models::{Identity, Role, Service};
use crate::services::catalog::{self, ServiceForm};
use crate::services::listing::{paginate, ListQuery, Page};
use crate::services::users;
use crate::store::ServiceChanges;

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Page<Identity>>> {
    let all = users::list_users(&state.repo, &state.cache, &admin)?;
    Ok(Json(paginate(&all, &query)))
}

pub async fn set_role(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
    Json(body): Json<RoleRequest>,
) -> AppResult<Json<Mutation<Identity>>> {
    let committed = users::set_role(&state.repo, &state.cache, &admin, &id, body.role)?;
    Ok(Json(Mutation::committed(committed, "Role updated.")))
}

pub async fn toggle_status(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
) -> AppResult<Json<Mutation<Identity>>> {
    let committed = users::toggle_status(&state.repo, &state.cache, &admin, &id)?;
    Ok(Json(Mutation::committed(committed, "User status updated.")))
}

pub async fn list_services(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Page<Service>>> {
    let all = catalog::list_services(&state.repo, &state.cache)?;
    Ok(Json(paginate(&all, &query)))
}

pub async fn create_service(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Json(form): Json<ServiceForm>,
) -> AppResult<(StatusCode, Json<Mutation<Service>>)> {
    let committed = catalog::create_service(&state.repo, &state.cache, &admin, &form)?;
    Ok((
        StatusCode::CREATED,
        Json(Mutation::committed(committed, "Service added successfully!")),
    ))
}

pub async fn update_service(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
    Json(changes): Json<ServiceChanges>,
) -> AppResult<Json<Mutation<Service>>> {
    let committed = catalog::update_service(&state.repo, &state.cache, &admin, &id, changes)?;
    Ok(Json(Mutation::committed(committed, "Service updated successfully!")))
}

pub async fn delete_service(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
) -> AppResult<Json<Mutation<()>>> {
    let committed = catalog::delete_service(&state.repo, &state.cache, &admin, &id)?;
    Ok(Json(Mutation::committed(committed, "Service deleted.")))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::super::test_support::{location, TestApp};
    use crate::models::Role;

    #[tokio::test]
    async fn non_admins_are_sent_back_to_the_dashboard() {
        let app = TestApp::new();
        app.sign_in_as("u", "Jane Doe", Role::User).await;

        for (method, path) in [
            ("GET", "/dashboard/admin/services"),
            ("GET", "/dashboard/admin/users"),
            ("POST", "/dashboard/admin/services"),
        ] {
            let response = app.send(Some("u"), method, path, None).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{method} {path}");
            assert_eq!(location(&response), Some("/dashboard"), "{method} {path}");
        }
    }

    #[tokio::test]
    async fn admin_manages_services_and_listing_is_refreshed() {
        let app = TestApp::new();
        app.sign_in_as("a", "Root Admin", Role::Admin).await;

        let (status, body) = app.json(Some("a"), "GET", "/dashboard/admin/services", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);

        let (status, body) = app
            .json(
                Some("a"),
                "POST",
                "/dashboard/admin/services",
                Some(json!({"title": "Wash", "category": "Cleaning", "price": 0})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "All fields are required!");

        let (status, body) = app
            .json(
                Some("a"),
                "POST",
                "/dashboard/admin/services",
                Some(json!({"title": "Wash", "category": "Cleaning", "price": 25})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["notice"]["message"], "Service added successfully!");
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (_, body) = app.json(Some("a"), "GET", "/dashboard/admin/services", None).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["status"], "Active");

        let path = format!("/dashboard/admin/services/{id}");
        let (status, body) = app
            .json(Some("a"), "PUT", &path, Some(json!({"status": "Inactive"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Wash");

        let (_, body) = app
            .json(Some("a"), "GET", "/dashboard/admin/services?status=Active", None)
            .await;
        assert_eq!(body["total"], 0);

        let (status, _) = app.json(Some("a"), "DELETE", &path, None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = app.json(Some("a"), "GET", "/dashboard/admin/services", None).await;
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn role_change_applies_at_next_sign_in() {
        let app = TestApp::new();
        app.sign_in_as("a", "Root Admin", Role::Admin).await;
        let jane = app.sign_in_as("u", "Jane Doe", Role::User).await;

        let path = format!("/dashboard/admin/users/{}/role", jane.id);
        let (status, body) = app.json(Some("a"), "PUT", &path, Some(json!({"role": "admin"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["role"], "admin");

        // The stored session still says `user` until Jane signs in again.
        let response = app.send(Some("u"), "GET", "/dashboard/admin/users", None).await;
        assert_eq!(location(&response), Some("/dashboard"));

        app.json(Some("u"), "POST", "/auth/logout", None).await;
        let (status, _) = app
            .json(
                Some("u"),
                "POST",
                "/auth/sign-in",
                Some(json!({"email": "jane.doe@example.com", "password": "Secret123"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app.json(Some("u"), "GET", "/dashboard/admin/users", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
    }

    #[tokio::test]
    async fn deactivated_users_cannot_sign_back_in() {
        let app = TestApp::new();
        app.sign_in_as("a", "Root Admin", Role::Admin).await;
        let jane = app.sign_in_as("u", "Jane Doe", Role::User).await;

        let path = format!("/dashboard/admin/users/{}/status", jane.id);
        let (_, body) = app.json(Some("a"), "PUT", &path, None).await;
        assert_eq!(body["data"]["status"], false);

        let (status, body) = app
            .json(
                Some("fresh"),
                "POST",
                "/auth/sign-in",
                Some(json!({"email": "jane.doe@example.com", "password": "Secret123"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Account is deactivated.");
    }
}
