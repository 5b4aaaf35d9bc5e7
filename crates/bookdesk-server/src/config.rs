use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub sqlite_path: String,
    /// Shared secret the upstream OAuth broker signs interactive sign-in assertions with.
    pub provider_secret: String,
    pub cors_origin: String,
    pub secure_cookies: bool,
    pub resend_api_key: Option<String>,
    /// Account promoted to the admin role at startup, if it exists.
    pub admin_email: Option<String>,
    pub from_email: String,
    pub app_url: String,
    pub cache_capacity: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4000),
            sqlite_path: env::var("SQLITE_PATH")
                .unwrap_or_else(|_| "./data/bookdesk.db".to_string()),
            provider_secret: env::var("PROVIDER_SECRET")
                .unwrap_or_else(|_| "change-me-to-a-random-32-char-string".to_string()),
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            secure_cookies: env::var("SECURE_COOKIES")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            resend_api_key: env::var("RESEND_API_KEY").ok(),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            from_email: env::var("FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@bookdesk.app".to_string()),
            app_url: env::var("APP_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            cache_capacity: env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
        }
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            server_port: 0,
            sqlite_path: ":memory:".to_string(),
            provider_secret: "test-provider-secret".to_string(),
            cors_origin: "http://localhost:5173".to_string(),
            secure_cookies: false,
            resend_api_key: None,
            admin_email: None,
            from_email: "noreply@bookdesk.test".to_string(),
            app_url: "http://localhost:5173".to_string(),
            cache_capacity: 100,
        }
    }
}
