use crate::error::{AppError, AppResult};
use crate::store::local::KeyValueStore;

pub const THEME_KEY: &str = "theme";
pub const DEFAULT_THEME: &str = "theme_navy_dark";

pub const THEMES: [&str; 10] = [
    "theme_navy_dark",
    "theme_red_dark",
    "theme_purple_dark",
    "theme_magenta_dark",
    "theme_rose_dark",
    "theme_orange_dark",
    "theme_cyan_dark",
    "theme_pastel_light",
    "theme_mint_light",
    "theme_sunset_light",
];

/// The stored theme, or the default when unset or no longer offered.
pub fn current_theme(storage: &dyn KeyValueStore) -> AppResult<String> {
    Ok(storage
        .get(THEME_KEY)?
        .filter(|name| THEMES.contains(&name.as_str()))
        .unwrap_or_else(|| DEFAULT_THEME.to_string()))
}

pub fn set_theme(storage: &dyn KeyValueStore, name: &str) -> AppResult<()> {
    if !THEMES.contains(&name) {
        return Err(AppError::BadRequest(format!("Unknown theme: {name}")));
    }
    storage.set(THEME_KEY, name)?;
    tracing::debug!(theme = name, "Theme preference saved");
    Ok(())
}
