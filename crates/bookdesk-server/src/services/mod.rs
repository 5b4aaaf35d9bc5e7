pub mod analytics;
pub mod bookings;
pub mod catalog;
pub mod email;
pub mod help;
pub mod listing;
pub mod theme;
pub mod users;

use crate::error::AppResult;
use crate::store::{EntityKind, StoreError};

/// Turns a missing document into the store's not-found error.
pub(crate) fn require<T>(found: Option<T>, kind: EntityKind, id: &str) -> AppResult<T> {
    found.ok_or_else(|| {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
        .into()
    })
}
