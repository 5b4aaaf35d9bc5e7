//! Per-client session store.
//!
//! A client's session is the identity serialized under [`USER_KEY`] in its
//! durable storage. It is read back on every request without re-checking the
//! user document; the document is consulted again only on the next sign-in.

use std::sync::Arc;

use super::provider::{IdentityProvider, InteractiveOutcome, ProviderError};
use crate::cache::QueryCache;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::{Identity, Notice, Role};
use crate::store::local::KeyValueStore;
use crate::store::{EntityKind, Repository};

pub const USER_KEY: &str = "user";

fn provider_failure(err: ProviderError, fallback: &'static str) -> AppError {
    match err {
        ProviderError::Cancelled => {
            tracing::debug!("User closed the sign-in popup");
            AppError::Cancelled
        }
        ProviderError::Internal(msg) => {
            tracing::error!("Identity provider error: {msg}");
            AppError::Auth(fallback.to_string())
        }
        other => {
            tracing::info!("Identity provider rejected request: {other}");
            AppError::Auth(other.friendly_message(fallback).to_string())
        }
    }
}

fn ensure_active(identity: &Identity) -> AppResult<()> {
    if identity.status {
        Ok(())
    } else {
        tracing::info!(user_id = %identity.id, "Sign-in refused for deactivated account");
        Err(AppError::Auth("Account is deactivated.".to_string()))
    }
}

pub struct SessionStore {
    current: Option<Identity>,
    storage: Arc<dyn KeyValueStore>,
    provider: Arc<dyn IdentityProvider>,
    repo: Repository,
    cache: QueryCache,
}

impl SessionStore {
    /// Restores whatever identity the client's storage holds.
    pub fn hydrate(
        storage: Arc<dyn KeyValueStore>,
        provider: Arc<dyn IdentityProvider>,
        repo: Repository,
        cache: QueryCache,
    ) -> Self {
        let current = match storage.get(USER_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Identity>(&raw) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    tracing::warn!("Discarding unreadable stored session: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::error!("Failed to read stored session: {e}");
                None
            }
        };

        Self {
            current,
            storage,
            provider,
            repo,
            cache,
        }
    }

    pub fn current(&self) -> Option<&Identity> {
        self.current.as_ref()
    }

    pub fn storage(&self) -> &dyn KeyValueStore {
        self.storage.as_ref()
    }

    /// Persists first so a storage failure leaves the session as it was.
    fn establish(&mut self, identity: Identity) -> AppResult<&Identity> {
        let serialized = serde_json::to_string(&identity)
            .map_err(|e| AppError::Internal(format!("Failed to serialize identity: {e}")))?;
        self.storage.set(USER_KEY, &serialized)?;
        tracing::info!(user_id = %identity.id, role = identity.role.as_str(), "Session established");
        Ok(&*self.current.insert(identity))
    }

    pub async fn sign_in_with_provider(&mut self, outcome: InteractiveOutcome) -> AppResult<Notice> {
        let credential = self
            .provider
            .sign_in_interactive(outcome)
            .await
            .map_err(|e| provider_failure(e, "Google Sign-In failed."))?;

        let identity = match self.repo.get_signed_in_user(&credential.uid, &credential.email)? {
            Some(existing) => existing,
            None => {
                let identity = Identity {
                    id: credential.uid.clone(),
                    name: credential.display_name.clone().unwrap_or_else(|| "User".to_string()),
                    email: credential.email.clone(),
                    role: Role::User,
                    created_at: db::now(),
                    status: true,
                };
                self.cache
                    .commit(&[EntityKind::Users], || Ok(self.repo.put_user(&identity)?))?
                    .into_inner();
                identity
            }
        };
        ensure_active(&identity)?;

        let identity = self.establish(identity)?;
        Ok(Notice::success(format!("Welcome, {}!", identity.name)))
    }

    pub async fn sign_up_with_credentials(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
    ) -> AppResult<Notice> {
        let name = name.trim();
        if name.is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AppError::BadRequest("Please fill in all fields.".to_string()));
        }

        let credential = self
            .provider
            .create_credential(name, email, password)
            .await
            .map_err(|e| provider_failure(e, "Signup failed."))?;

        let identity = Identity {
            id: credential.uid,
            name: name.to_string(),
            email: credential.email,
            role: Role::User,
            created_at: db::now(),
            status: true,
        };
        let committed = self
            .cache
            .commit(&[EntityKind::Users], || Ok(self.repo.put_user(&identity)?))?;

        self.establish(identity)?;
        Ok(committed.notice("Signup successful!"))
    }

    pub async fn sign_in_with_credentials(&mut self, email: &str, password: &str) -> AppResult<Notice> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::BadRequest("Please fill in all fields.".to_string()));
        }

        let credential = self
            .provider
            .sign_in_with_credential(email, password)
            .await
            .map_err(|e| provider_failure(e, "Sign-in failed."))?;

        let identity = self
            .repo
            .get_signed_in_user(&credential.uid, &credential.email)?
            .unwrap_or_else(|| Identity {
                id: credential.uid.clone(),
                name: "User".to_string(),
                email: credential.email.clone(),
                role: Role::User,
                created_at: db::now(),
                status: true,
            });
        ensure_active(&identity)?;

        let identity = self.establish(identity)?;
        Ok(Notice::success(format!("Welcome back, {}!", identity.name)))
    }

    /// Clears the session. Safe to call without one.
    pub fn logout(&mut self) -> AppResult<Notice> {
        self.storage.remove(USER_KEY)?;
        if let Some(identity) = self.current.take() {
            tracing::info!(user_id = %identity.id, "Logged out");
        }
        Ok(Notice::success("Logged out successfully!"))
    }

    /// Same notice for registered and unknown emails.
    pub async fn reset_password(&self, email: &str) -> AppResult<Notice> {
        if email.trim().is_empty() {
            return Err(AppError::BadRequest("Please enter your email.".to_string()));
        }

        self.provider
            .send_password_reset(email)
            .await
            .map_err(|e| provider_failure(e, "Error resetting password."))?;
        Ok(Notice::success("Reset link sent! Check your email."))
    }

    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> AppResult<Notice> {
        if token.is_empty() || new_password.is_empty() {
            return Err(AppError::BadRequest("All fields are required!".to_string()));
        }

        self.provider
            .confirm_password_reset(token, new_password)
            .await
            .map_err(|e| provider_failure(e, "Error resetting password."))?;
        Ok(Notice::success("Password updated. Please sign in."))
    }

    /// Re-persists the session after the user edits their own record.
    pub fn refresh(&mut self, identity: Identity) -> AppResult<()> {
        self.establish(identity).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::local::{sign_assertion, AssertionClaims, LocalIdentityProvider};
    use crate::config::Config;
    use crate::db::DbPool;
    use crate::store::local::ClientStorage;
    use crate::store::SqliteDocumentStore;

    struct Harness {
        pool: DbPool,
        provider: Arc<dyn IdentityProvider>,
        repo: Repository,
        cache: QueryCache,
    }

    impl Harness {
        fn new() -> Self {
            let pool = db::create_memory_pool();
            Self {
                provider: Arc::new(LocalIdentityProvider::new(pool.clone(), Config::for_tests())),
                repo: Repository::new(Arc::new(SqliteDocumentStore::new(pool.clone()))),
                cache: QueryCache::new(100),
                pool,
            }
        }

        fn storage(&self, client: &str) -> Arc<ClientStorage> {
            Arc::new(ClientStorage::new(self.pool.clone(), client))
        }

        fn session(&self, client: &str) -> SessionStore {
            SessionStore::hydrate(
                self.storage(client),
                self.provider.clone(),
                self.repo.clone(),
                self.cache.clone(),
            )
        }

        fn assertion(&self, email: &str) -> InteractiveOutcome {
            InteractiveOutcome::Assertion(sign_assertion(
                &Config::for_tests().provider_secret,
                &AssertionClaims {
                    email: email.to_string(),
                    name: Some("Oauth Person".to_string()),
                    exp: chrono::Utc::now().timestamp() + 60,
                },
            ))
        }
    }

    #[tokio::test]
    async fn sign_up_persists_user_identity_and_session() {
        let h = Harness::new();
        let mut session = h.session("c1");

        let notice = session
            .sign_up_with_credentials("Jane Doe", "jane@example.com", "Secret123")
            .await
            .unwrap();
        assert_eq!(notice.message, "Signup successful!");

        let current = session.current().unwrap().clone();
        assert_eq!(current.name, "Jane Doe");
        assert_eq!(current.email, "jane@example.com");
        assert_eq!(current.role, Role::User);
        assert!(current.status);

        let stored = h.repo.get_user(&current.id).unwrap().unwrap();
        assert_eq!(stored, current);

        let reloaded = h.session("c1");
        assert_eq!(reloaded.current(), Some(&current));
    }

    #[tokio::test]
    async fn failed_sign_up_leaves_session_untouched() {
        let h = Harness::new();
        let mut session = h.session("c1");
        session
            .sign_up_with_credentials("Jane Doe", "jane@example.com", "Secret123")
            .await
            .unwrap();
        let before = session.current().cloned();

        let mut other = h.session("c2");
        let err = other
            .sign_up_with_credentials("Impostor", "jane@example.com", "Secret123")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(ref m) if m == "Email already registered."));
        assert!(other.current().is_none());
        assert_eq!(h.session("c2").current(), None);

        let err = session
            .sign_in_with_credentials("jane@example.com", "wrong-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(ref m) if m == "Sign-in failed."));
        assert_eq!(session.current().cloned(), before);
    }

    #[tokio::test]
    async fn validation_happens_before_the_provider_is_called() {
        let h = Harness::new();
        let mut session = h.session("c1");
        let err = session
            .sign_up_with_credentials("  ", "jane@example.com", "Secret123")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        // The email is still free, so nothing reached the provider.
        session
            .sign_up_with_credentials("Jane", "jane@example.com", "Secret123")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn credential_sign_in_reads_role_from_user_document() {
        let h = Harness::new();
        let mut first = h.session("c1");
        first
            .sign_up_with_credentials("Root", "root@example.com", "Secret123")
            .await
            .unwrap();
        let id = first.current().unwrap().id.clone();
        h.repo.set_role(&id, Role::Admin).unwrap();

        // Trust-on-read: the old session keeps its stored role.
        assert_eq!(h.session("c1").current().unwrap().role, Role::User);

        let mut second = h.session("c2");
        let notice = second
            .sign_in_with_credentials("root@example.com", "Secret123")
            .await
            .unwrap();
        assert_eq!(notice.message, "Welcome back, Root!");
        assert_eq!(second.current().unwrap().role, Role::Admin);
    }

    #[tokio::test]
    async fn provider_sign_in_creates_missing_user_record() {
        let h = Harness::new();
        let mut session = h.session("c1");

        let notice = session
            .sign_in_with_provider(h.assertion("new@example.com"))
            .await
            .unwrap();
        assert_eq!(notice.message, "Welcome, Oauth Person!");

        let id = session.current().unwrap().id.clone();
        let stored = h.repo.get_user(&id).unwrap().unwrap();
        assert_eq!(stored.role, Role::User);
        assert!(stored.status);
    }

    #[tokio::test]
    async fn cancelled_provider_sign_in_is_silent() {
        let h = Harness::new();
        let mut session = h.session("c1");
        let err = session
            .sign_in_with_provider(InteractiveOutcome::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn deactivated_accounts_cannot_sign_in() {
        let h = Harness::new();
        let mut session = h.session("c1");
        session
            .sign_up_with_credentials("Jane", "jane@example.com", "Secret123")
            .await
            .unwrap();
        let id = session.current().unwrap().id.clone();
        session.logout().unwrap();
        h.repo.set_active(&id, false).unwrap();

        let err = session
            .sign_in_with_credentials("jane@example.com", "Secret123")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(ref m) if m == "Account is deactivated."));
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn logout_without_session_is_a_no_op() {
        let h = Harness::new();
        let mut session = h.session("c1");
        assert!(session.logout().is_ok());
        assert!(session.logout().is_ok());
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn logout_clears_durable_storage() {
        let h = Harness::new();
        let mut session = h.session("c1");
        session
            .sign_up_with_credentials("Jane", "jane@example.com", "Secret123")
            .await
            .unwrap();
        session.logout().unwrap();

        assert!(h.session("c1").current().is_none());
        assert_eq!(h.storage("c1").get(USER_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn reset_password_does_not_reveal_registration() {
        let h = Harness::new();
        let mut session = h.session("c1");
        session
            .sign_up_with_credentials("Jane", "jane@example.com", "Secret123")
            .await
            .unwrap();

        let known = session.reset_password("jane@example.com").await.unwrap();
        let unknown = session.reset_password("ghost@example.com").await.unwrap();
        assert_eq!(known, unknown);
        assert_eq!(known.message, "Reset link sent! Check your email.");
    }

    #[test]
    fn corrupt_stored_session_hydrates_as_empty() {
        let h = Harness::new();
        h.storage("c1").set(USER_KEY, "{not json").unwrap();
        assert!(h.session("c1").current().is_none());
    }
}
