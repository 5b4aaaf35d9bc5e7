//! Identity provider contract.

use async_trait::async_trait;

/// A successful provider authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("popup-closed-by-user")]
    Cancelled,

    #[error("email-already-in-use")]
    EmailInUse,

    #[error("invalid-email")]
    InvalidEmail,

    #[error("weak-password")]
    WeakPassword,

    #[error("invalid-credential")]
    InvalidCredential,

    #[error("invalid-assertion")]
    InvalidAssertion,

    #[error("expired-action-code")]
    ExpiredActionCode,

    #[error("internal: {0}")]
    Internal(String),
}

impl ProviderError {
    /// User-facing text; codes without a dedicated message use `fallback`.
    pub fn friendly_message(&self, fallback: &'static str) -> &'static str {
        match self {
            ProviderError::EmailInUse => "Email already registered.",
            ProviderError::InvalidEmail => "Invalid email.",
            ProviderError::WeakPassword => "Weak password.",
            _ => fallback,
        }
    }
}

/// Outcome of an interactive (OAuth) sign-in, as relayed by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractiveOutcome {
    /// Signed assertion from the upstream broker.
    Assertion(String),
    /// The user closed the sign-in window.
    Cancelled,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_interactive(&self, outcome: InteractiveOutcome) -> Result<Credential, ProviderError>;

    async fn create_credential(
        &self,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Credential, ProviderError>;

    async fn sign_in_with_credential(&self, email: &str, password: &str) -> Result<Credential, ProviderError>;

    /// Succeeds whether or not `email` belongs to an account.
    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError>;

    async fn confirm_password_reset(&self, token: &str, new_password: &str) -> Result<(), ProviderError>;
}
