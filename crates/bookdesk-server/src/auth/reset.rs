use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::db::{self, DbPool, TIMESTAMP_FORMAT};
use crate::error::{AppError, AppResult};

const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Create a password reset token for a credential. Replaces any outstanding token.
pub fn create_reset_token(pool: &DbPool, uid: &str) -> AppResult<String> {
    let conn = pool.get()?;

    conn.execute(
        "DELETE FROM password_reset_tokens WHERE uid = ?1",
        rusqlite::params![uid],
    )?;

    let id = Uuid::new_v4().to_string();
    let token = generate_token();
    let expires_at = (Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS))
        .format(TIMESTAMP_FORMAT)
        .to_string();

    conn.execute(
        "INSERT INTO password_reset_tokens (id, uid, token, expires_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![id, uid, token, expires_at],
    )?;

    Ok(token)
}

/// Validate a reset token and return the credential uid it belongs to.
/// The token, any sibling tokens, and every expired token are removed.
pub fn consume_reset_token(pool: &DbPool, token: &str) -> AppResult<String> {
    let conn = pool.get()?;
    let now = db::now();

    let uid: String = conn
        .query_row(
            "SELECT uid FROM password_reset_tokens WHERE token = ?1 AND expires_at > ?2",
            rusqlite::params![token, now],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::BadRequest("Invalid or expired reset link".to_string())
            }
            _ => AppError::Database(e),
        })?;

    conn.execute(
        "DELETE FROM password_reset_tokens WHERE uid = ?1 OR expires_at < ?2",
        rusqlite::params![uid, now],
    )?;

    Ok(uid)
}

pub(crate) fn generate_token() -> String {
    use base64::Engine;
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
