//! Bundled identity provider: credentials in SQLite, interactive sign-in via
//! assertions signed by the upstream OAuth broker.
//!
//! An assertion is `base64url(claims_json) "." hex(hmac_sha256(secret, base64url(claims_json)))`.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use super::password;
use super::provider::{Credential, IdentityProvider, InteractiveOutcome, ProviderError};
use super::reset;
use crate::config::Config;
use crate::db::{self, DbPool};
use crate::error::AppError;
use crate::services::email;

type HmacSha256 = Hmac<Sha256>;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub email: String,
    pub name: Option<String>,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

fn internal(e: impl std::fmt::Display) -> ProviderError {
    ProviderError::Internal(e.to_string())
}

fn mac(secret: &str) -> Result<HmacSha256, ProviderError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(internal)
}

#[cfg(test)]
pub fn sign_assertion(secret: &str, claims: &AssertionClaims) -> String {
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).expect("claims serialize"));
    let mut mac = mac(secret).expect("hmac key");
    mac.update(payload.as_bytes());
    format!("{payload}.{}", hex::encode(mac.finalize().into_bytes()))
}

fn verify_assertion(secret: &str, assertion: &str) -> Result<AssertionClaims, ProviderError> {
    let (payload, signature) = assertion
        .split_once('.')
        .ok_or(ProviderError::InvalidAssertion)?;
    let signature = hex::decode(signature).map_err(|_| ProviderError::InvalidAssertion)?;

    let mut mac = mac(secret)?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| ProviderError::InvalidAssertion)?;

    let raw = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| ProviderError::InvalidAssertion)?;
    let claims: AssertionClaims =
        serde_json::from_slice(&raw).map_err(|_| ProviderError::InvalidAssertion)?;

    if claims.exp <= chrono::Utc::now().timestamp() {
        return Err(ProviderError::InvalidAssertion);
    }
    Ok(claims)
}

fn validate_email(email: &str) -> Result<(), ProviderError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ProviderError::InvalidEmail)
    }
}

struct StoredCredential {
    credential: Credential,
    password_hash: Option<String>,
}

#[derive(Clone)]
pub struct LocalIdentityProvider {
    pool: DbPool,
    config: Config,
}

impl LocalIdentityProvider {
    pub fn new(pool: DbPool, config: Config) -> Self {
        Self { pool, config }
    }

    fn find_by_email(&self, email: &str) -> Result<Option<StoredCredential>, ProviderError> {
        let conn = self.pool.get().map_err(internal)?;
        let result = conn.query_row(
            "SELECT uid, email, display_name, password_hash FROM credentials WHERE email = ?1",
            rusqlite::params![email],
            |row| {
                Ok(StoredCredential {
                    credential: Credential {
                        uid: row.get(0)?,
                        email: row.get(1)?,
                        display_name: row.get(2)?,
                    },
                    password_hash: row.get(3)?,
                })
            },
        );

        match result {
            Ok(stored) => Ok(Some(stored)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(internal(e)),
        }
    }

    fn insert(
        &self,
        email: &str,
        display_name: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Credential, ProviderError> {
        let uid = Uuid::new_v4().simple().to_string();
        let conn = self.pool.get().map_err(internal)?;
        let result = conn.execute(
            "INSERT INTO credentials (uid, email, display_name, password_hash, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![uid, email, display_name, password_hash, db::now()],
        );

        match result {
            Ok(_) => Ok(Credential {
                uid,
                email: email.to_string(),
                display_name: display_name.map(str::to_string),
            }),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(ProviderError::EmailInUse)
            }
            Err(e) => Err(internal(e)),
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in_interactive(&self, outcome: InteractiveOutcome) -> Result<Credential, ProviderError> {
        let assertion = match outcome {
            InteractiveOutcome::Cancelled => return Err(ProviderError::Cancelled),
            InteractiveOutcome::Assertion(assertion) => assertion,
        };
        let claims = verify_assertion(&self.config.provider_secret, &assertion)?;
        let email = claims.email.trim().to_lowercase();
        validate_email(&email)?;

        // Accounts are linked by email: an existing password account keeps its uid.
        match self.find_by_email(&email)? {
            Some(stored) => Ok(Credential {
                display_name: stored.credential.display_name.or(claims.name),
                ..stored.credential
            }),
            None => self.insert(&email, claims.name.as_deref(), None),
        }
    }

    async fn create_credential(
        &self,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Credential, ProviderError> {
        let email = email.trim().to_lowercase();
        validate_email(&email)?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ProviderError::WeakPassword);
        }

        let hash = password::hash_password(password)?;
        self.insert(&email, Some(display_name), Some(&hash))
    }

    async fn sign_in_with_credential(&self, email: &str, password: &str) -> Result<Credential, ProviderError> {
        let email = email.trim().to_lowercase();
        validate_email(&email)?;

        let stored = self
            .find_by_email(&email)?
            .ok_or(ProviderError::InvalidCredential)?;
        let hash = stored
            .password_hash
            .as_deref()
            .ok_or(ProviderError::InvalidCredential)?;

        if !password::verify_password(password, hash)? {
            return Err(ProviderError::InvalidCredential);
        }
        Ok(stored.credential)
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        let email = email.trim().to_lowercase();
        validate_email(&email)?;

        let Some(stored) = self.find_by_email(&email)? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = reset::create_reset_token(&self.pool, &stored.credential.uid).map_err(internal)?;
        let name = stored
            .credential
            .display_name
            .as_deref()
            .unwrap_or("there");
        email::dispatch(&self.config, email::password_reset(&self.config, &email, name, &token));
        Ok(())
    }

    async fn confirm_password_reset(&self, token: &str, new_password: &str) -> Result<(), ProviderError> {
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(ProviderError::WeakPassword);
        }

        let uid = reset::consume_reset_token(&self.pool, token).map_err(|e| match e {
            AppError::BadRequest(_) => ProviderError::ExpiredActionCode,
            other => internal(other),
        })?;

        let hash = password::hash_password(new_password)?;
        let conn = self.pool.get().map_err(internal)?;
        conn.execute(
            "UPDATE credentials SET password_hash = ?1 WHERE uid = ?2",
            rusqlite::params![hash, uid],
        )
        .map_err(internal)?;
        Ok(())
    }
}
