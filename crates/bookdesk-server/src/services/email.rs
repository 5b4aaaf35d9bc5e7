//! Transactional email through the Resend HTTP API.

use serde::Serialize;

use crate::config::Config;
use crate::error::{AppError, AppResult};

const RESEND_URL: &str = "https://api.resend.com/emails";

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    #[serde(skip)]
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    #[serde(flatten)]
    email: &'a Email,
}

fn escape_html(raw: &str) -> String {
    raw.chars()
        .fold(String::with_capacity(raw.len()), |mut out, c| {
            match c {
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '&' => out.push_str("&amp;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                c => out.push(c),
            }
            out
        })
}

pub fn password_reset(config: &Config, to: &str, name: &str, token: &str) -> Email {
    let reset_url = format!("{}/reset-password?token={token}", config.app_url);
    let name = escape_html(name);
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; color: #333;">
  <h2 style="color: #1a1a1a;">Hi {name},</h2>
  <p>We received a request to reset your password. Choose a new one with the button below:</p>
  <p style="text-align: center; margin: 30px 0;">
    <a href="{reset_url}" style="display: inline-block; padding: 14px 28px; background: #2c67f2; color: #fff; text-decoration: none; border-radius: 6px; font-weight: 600; font-size: 16px;">Reset Password</a>
  </p>
  <p style="font-size: 14px; color: #666;">Or copy and paste this link into your browser:</p>
  <p style="font-size: 14px; word-break: break-all; color: #666;">{reset_url}</p>
  <hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;" />
  <p style="font-size: 12px; color: #999;">This link expires in 1 hour. If you didn't ask for a reset, you can safely ignore this email.</p>
</body>
</html>"#
    );
    Email {
        to: to.to_string(),
        subject: "Reset your Bookdesk password".to_string(),
        html,
    }
}

/// Delivers `email` and reports the outcome. Without an API key the message
/// is logged and dropped.
pub async fn deliver(config: &Config, email: &Email) -> AppResult<()> {
    let Some(api_key) = config.resend_api_key.as_deref() else {
        tracing::warn!(subject = %email.subject, "RESEND_API_KEY not set, email not sent");
        return Ok(());
    };

    let payload = ResendPayload {
        from: &config.from_email,
        to: [&email.to],
        email,
    };
    reqwest::Client::new()
        .post(RESEND_URL)
        .bearer_auth(api_key)
        .json(&payload)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| AppError::Internal(format!("Failed to send email: {e}")))?;

    tracing::info!(subject = %email.subject, "Email sent");
    Ok(())
}

/// Hands `email` to a background task. Delivery failures are logged there and
/// never reach the caller.
pub fn dispatch(config: &Config, email: Email) {
    let config = config.clone();
    tokio::spawn(async move {
        if let Err(e) = deliver(&config, &email).await {
            tracing::error!(subject = %email.subject, "Email delivery failed: {e}");
        }
    });
}
