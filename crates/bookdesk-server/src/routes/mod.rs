mod admin;
mod auth;
mod bookings;
mod dashboard;
mod preferences;
mod profile;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use serde::Serialize;

use crate::auth::local::LocalIdentityProvider;
use crate::auth::middleware::{assign_client, require_admin, require_guest, require_project};
use crate::auth::provider::IdentityProvider;
use crate::auth::session::SessionStore;
use crate::cache::{Committed, QueryCache};
use crate::config::Config;
use crate::db::DbPool;
use crate::models::Notice;
use crate::store::local::ClientStorage;
use crate::store::{Repository, SqliteDocumentStore};

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub repo: Repository,
    pub cache: QueryCache,
    pub provider: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        Self {
            repo: Repository::new(Arc::new(SqliteDocumentStore::new(db.clone()))),
            cache: QueryCache::new(config.cache_capacity),
            provider: Arc::new(LocalIdentityProvider::new(db.clone(), config.clone())),
            db,
            config,
        }
    }

    pub fn storage_for(&self, client_id: &str) -> Arc<ClientStorage> {
        Arc::new(ClientStorage::new(self.db.clone(), client_id))
    }

    pub fn session_for(&self, client_id: &str) -> SessionStore {
        SessionStore::hydrate(
            self.storage_for(client_id),
            self.provider.clone(),
            self.repo.clone(),
            self.cache.clone(),
        )
    }
}

/// Body of every successful mutation.
#[derive(Debug, Serialize)]
pub struct Mutation<T> {
    pub data: T,
    pub notice: Notice,
}

impl<T> Mutation<T> {
    pub fn new(data: T, notice: Notice) -> Self {
        Self { data, notice }
    }

    pub fn committed(committed: Committed<T>, message: &str) -> Self {
        let notice = committed.notice(message);
        Self::new(committed.into_inner(), notice)
    }
}

async fn health() -> &'static str {
    "ok"
}

pub fn create_router(state: AppState) -> Router {
    // Public entry: only for visitors without a session
    let entry = Router::new()
        .route("/", get(auth::entry))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/provider", post(auth::provider_sign_in))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_guest));

    let open = Router::new()
        .route("/health", get(health))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/confirm-reset", post(auth::confirm_reset))
        .route(
            "/preferences/theme",
            get(preferences::get_theme).put(preferences::set_theme),
        );

    let admin = Router::new()
        .route(
            "/dashboard/admin/users",
            get(admin::list_users),
        )
        .route("/dashboard/admin/users/{id}/role", put(admin::set_role))
        .route("/dashboard/admin/users/{id}/status", put(admin::toggle_status))
        .route(
            "/dashboard/admin/services",
            get(admin::list_services).post(admin::create_service),
        )
        .route(
            "/dashboard/admin/services/{id}",
            put(admin::update_service).delete(admin::delete_service),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // The project gate wraps the whole subtree, admin leaves included
    let dashboard = Router::new()
        .route("/dashboard", get(dashboard::overview))
        .route("/dashboard/help", get(dashboard::help))
        .route(
            "/dashboard/bookings",
            get(bookings::list_bookings).post(bookings::book),
        )
        .route("/dashboard/bookings/{id}", delete(bookings::cancel))
        .route("/dashboard/bookings/{id}/decision", put(bookings::decide))
        .route("/dashboard/payments", get(bookings::list_payments))
        .route("/dashboard/payments/{id}/pay", post(bookings::pay))
        .route(
            "/dashboard/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/dashboard/profile/picture", put(profile::set_picture))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_project));

    Router::new()
        .merge(entry)
        .merge(open)
        .merge(dashboard)
        .layer(middleware::from_fn_with_state(state.clone(), assign_client))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, Response, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::middleware::CLIENT_COOKIE;
    use crate::models::{Identity, Role};

    pub struct TestApp {
        pub state: AppState,
        pub router: Router,
    }

    impl TestApp {
        pub fn new() -> Self {
            let state = AppState::new(crate::db::create_memory_pool(), Config::for_tests());
            Self {
                router: create_router(state.clone()),
                state,
            }
        }

        /// Signs `client` in as a freshly registered user with `role`.
        pub async fn sign_in_as(&self, client: &str, name: &str, role: Role) -> Identity {
            let mut session = self.state.session_for(client);
            let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
            session
                .sign_up_with_credentials(name, &email, "Secret123")
                .await
                .unwrap();
            let mut identity = session.current().unwrap().clone();
            if role == Role::Admin {
                self.state.repo.set_role(&identity.id, Role::Admin).unwrap();
                identity.role = Role::Admin;
                session.refresh(identity.clone()).unwrap();
            }
            identity
        }

        pub async fn send(
            &self,
            client: Option<&str>,
            method: &str,
            uri: &str,
            body: Option<Value>,
        ) -> Response<Body> {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(client) = client {
                builder = builder.header(header::COOKIE, format!("{CLIENT_COOKIE}={client}"));
            }
            let request = match body {
                Some(json) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            self.router.clone().oneshot(request).await.unwrap()
        }

        pub async fn json(
            &self,
            client: Option<&str>,
            method: &str,
            uri: &str,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let response = self.send(client, method, uri, body).await;
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }
    }

    pub fn location(response: &Response<Body>) -> Option<&str> {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}
