//! Query cache for collection reads.
//!
//! Entries are keyed by entity kind plus an optional scope (the owning user
//! id for per-user reads) and dropped wholesale per kind whenever a mutation
//! of that kind succeeds. There is no TTL.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::sync::Cache;

use crate::error::AppResult;
use crate::models::{Booking, Identity, Notice, Payment, Service};
use crate::store::EntityKind;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct QueryKey {
    pub kind: EntityKind,
    pub scope: Option<String>,
}

impl QueryKey {
    pub fn all(kind: EntityKind) -> Self {
        Self { kind, scope: None }
    }

    pub fn scoped(kind: EntityKind, scope: impl Into<String>) -> Self {
        Self {
            kind,
            scope: Some(scope.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CacheValue {
    Users(Arc<Vec<Identity>>),
    Services(Arc<Vec<Service>>),
    Bookings(Arc<Vec<Booking>>),
    Payments(Arc<Vec<Payment>>),
}

/// Conversion between a cached list and its [`CacheValue`] variant.
pub trait Cached: Sized {
    fn wrap(value: Arc<Vec<Self>>) -> CacheValue;
    fn unwrap(value: CacheValue) -> Option<Arc<Vec<Self>>>;
}

macro_rules! cached {
    ($ty:ty, $variant:ident) => {
        impl Cached for $ty {
            fn wrap(value: Arc<Vec<Self>>) -> CacheValue {
                CacheValue::$variant(value)
            }

            fn unwrap(value: CacheValue) -> Option<Arc<Vec<Self>>> {
                match value {
                    CacheValue::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

cached!(Identity, Users);
cached!(Service, Services);
cached!(Booking, Bookings);
cached!(Payment, Payments);

/// Proof that a mutation succeeded and its kinds were invalidated.
///
/// Success notices for mutations are built from this value, so a notice can
/// never reach the user ahead of the invalidation.
#[derive(Debug)]
#[must_use]
pub struct Committed<T> {
    value: T,
}

impl<T> Committed<T> {
    pub fn notice(&self, message: impl Into<String>) -> Notice {
        Notice::success(message)
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

#[derive(Clone)]
pub struct QueryCache {
    entries: Cache<QueryKey, CacheValue>,
    generations: Arc<[AtomicU64; 4]>,
}

impl QueryCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(capacity)
                .support_invalidation_closures()
                .build(),
            generations: Arc::new(Default::default()),
        }
    }

    fn generation(&self, kind: EntityKind) -> u64 {
        self.generations[kind.index()].load(Ordering::Acquire)
    }

    /// Returns the cached list for `key`, running `fetch` on a miss.
    ///
    /// A fetch that overlaps an invalidation of the same kind is returned to
    /// the caller but not stored, so it cannot resurrect pre-mutation data.
    pub fn get_or_fetch<T, F>(&self, key: QueryKey, fetch: F) -> AppResult<Arc<Vec<T>>>
    where
        T: Cached,
        F: FnOnce() -> AppResult<Vec<T>>,
    {
        if let Some(hit) = self.entries.get(&key).and_then(T::unwrap) {
            tracing::trace!(?key, "query cache hit");
            return Ok(hit);
        }

        let started = self.generation(key.kind);
        let fresh = Arc::new(fetch()?);
        if self.generation(key.kind) == started {
            self.entries.insert(key, T::wrap(fresh.clone()));
        }
        Ok(fresh)
    }

    /// Drops every entry of `kind`, across all scopes.
    pub fn invalidate(&self, kind: EntityKind) {
        self.generations[kind.index()].fetch_add(1, Ordering::AcqRel);
        if let Err(e) = self.entries.invalidate_entries_if(move |key, _| key.kind == kind) {
            // Closures are enabled at build time; fall back to a full flush regardless.
            tracing::warn!("query cache predicate rejected, flushing all: {e}");
            self.entries.invalidate_all();
        }
        tracing::debug!(?kind, "query cache invalidated");
    }

    /// Runs a mutation and, only if it succeeds, invalidates `kinds`.
    pub fn commit<T, F>(&self, kinds: &[EntityKind], mutation: F) -> AppResult<Committed<T>>
    where
        F: FnOnce() -> AppResult<T>,
    {
        let value = mutation()?;
        for kind in kinds {
            self.invalidate(*kind);
        }
        Ok(Committed { value })
    }

    #[cfg(test)]
    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.get(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::ServiceStatus;

    fn service(title: &str) -> Service {
        Service {
            id: title.to_lowercase(),
            title: title.to_string(),
            category: "General".to_string(),
            price: 10.0,
            status: ServiceStatus::Active,
        }
    }

    #[test]
    fn second_read_is_served_from_cache() {
        let cache = QueryCache::new(10);
        let key = QueryKey::all(EntityKind::Services);
        let mut calls = 0;

        for _ in 0..2 {
            let list = cache
                .get_or_fetch(key.clone(), || {
                    calls += 1;
                    Ok(vec![service("Wash")])
                })
                .unwrap();
            assert_eq!(list.len(), 1);
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn successful_commit_forces_refetch_of_that_kind_only() {
        let cache = QueryCache::new(10);
        let services = QueryKey::all(EntityKind::Services);
        let bookings = QueryKey::scoped(EntityKind::Bookings, "u1");
        cache
            .get_or_fetch(services.clone(), || Ok(vec![service("Old")]))
            .unwrap();
        cache
            .get_or_fetch::<Booking, _>(bookings.clone(), || Ok(vec![]))
            .unwrap();

        let committed = cache
            .commit(&[EntityKind::Services], || Ok::<_, AppError>(()))
            .unwrap();
        assert_eq!(committed.notice("Saved").message, "Saved");

        let after = cache
            .get_or_fetch(services, || Ok(vec![service("New")]))
            .unwrap();
        assert_eq!(after[0].title, "New");
        assert!(cache.contains(&bookings));
    }

    #[test]
    fn invalidation_spans_every_scope_of_a_kind() {
        let cache = QueryCache::new(10);
        let mine = QueryKey::scoped(EntityKind::Payments, "u1");
        let theirs = QueryKey::scoped(EntityKind::Payments, "u2");
        let all = QueryKey::all(EntityKind::Payments);
        for key in [&mine, &theirs, &all] {
            cache.get_or_fetch::<Payment, _>(key.clone(), || Ok(vec![])).unwrap();
        }

        cache.invalidate(EntityKind::Payments);

        assert!(!cache.contains(&mine));
        assert!(!cache.contains(&theirs));
        assert!(!cache.contains(&all));
    }

    #[test]
    fn failed_commit_leaves_cache_untouched() {
        let cache = QueryCache::new(10);
        let key = QueryKey::all(EntityKind::Services);
        cache.get_or_fetch(key.clone(), || Ok(vec![service("Kept")])).unwrap();

        let result = cache.commit::<(), _>(&[EntityKind::Services], || {
            Err(AppError::BadRequest("All fields are required!".into()))
        });
        assert!(result.is_err());
        assert!(cache.contains(&key));
    }

    #[test]
    fn fetch_overlapping_invalidation_is_not_stored() {
        let cache = QueryCache::new(10);
        let key = QueryKey::all(EntityKind::Services);

        let stale = cache
            .get_or_fetch(key.clone(), || {
                cache.invalidate(EntityKind::Services);
                Ok(vec![service("Stale")])
            })
            .unwrap();
        assert_eq!(stale[0].title, "Stale");
        assert!(!cache.contains(&key));
    }

    #[test]
    fn failed_fetch_is_not_cached() {
        let cache = QueryCache::new(10);
        let key = QueryKey::all(EntityKind::Users);
        let result = cache.get_or_fetch::<Identity, _>(key.clone(), || {
            Err(AppError::Internal("store offline".into()))
        });
        assert!(result.is_err());
        assert!(!cache.contains(&key));
    }
}
