use std::sync::Arc;

use serde::Deserialize;

use super::require;
use crate::auth::guard;
use crate::cache::{Committed, QueryCache, QueryKey};
use crate::error::{AppError, AppResult};
use crate::models::{Identity, Service, ServiceStatus};
use crate::store::{EntityKind, NewService, Repository, ServiceChanges};

const REQUIRED: &str = "All fields are required!";

#[derive(Debug, Deserialize)]
pub struct ServiceForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: f64,
    pub status: Option<ServiceStatus>,
}

fn ensure_admin(actor: &Identity) -> AppResult<()> {
    if guard::is_admin(Some(actor)) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only administrators can manage services.".to_string()))
    }
}

fn validate_price(price: f64) -> AppResult<()> {
    if price.is_finite() && price > 0.0 {
        Ok(())
    } else {
        Err(AppError::BadRequest(REQUIRED.to_string()))
    }
}

pub fn list_services(repo: &Repository, cache: &QueryCache) -> AppResult<Arc<Vec<Service>>> {
    cache.get_or_fetch(QueryKey::all(EntityKind::Services), || Ok(repo.list_services()?))
}

/// Services open for booking.
pub fn bookable_services(repo: &Repository, cache: &QueryCache) -> AppResult<Vec<Service>> {
    Ok(list_services(repo, cache)?
        .iter()
        .filter(|s| s.status == ServiceStatus::Active)
        .cloned()
        .collect())
}

pub fn create_service(
    repo: &Repository,
    cache: &QueryCache,
    actor: &Identity,
    form: &ServiceForm,
) -> AppResult<Committed<Service>> {
    ensure_admin(actor)?;
    let title = form.title.trim();
    let category = form.category.trim();
    if title.is_empty() || category.is_empty() {
        return Err(AppError::BadRequest(REQUIRED.to_string()));
    }
    validate_price(form.price)?;
    let status = form.status.unwrap_or_default();

    cache.commit(&[EntityKind::Services], || {
        let id = repo.create_service(&NewService {
            title,
            category,
            price: form.price,
            status,
        })?;
        tracing::info!(service_id = %id, title, "Service created");

        Ok(Service {
            id,
            title: title.to_string(),
            category: category.to_string(),
            price: form.price,
            status,
        })
    })
}

/// Partial update; absent fields are left as stored.
pub fn update_service(
    repo: &Repository,
    cache: &QueryCache,
    actor: &Identity,
    id: &str,
    mut changes: ServiceChanges,
) -> AppResult<Committed<Service>> {
    ensure_admin(actor)?;
    for field in [&mut changes.title, &mut changes.category] {
        if let Some(value) = field {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(AppError::BadRequest(REQUIRED.to_string()));
            }
            *value = trimmed.to_string();
        }
    }
    if let Some(price) = changes.price {
        validate_price(price)?;
    }

    cache.commit(&[EntityKind::Services], || {
        repo.update_service(id, &changes)?;
        tracing::info!(service_id = %id, "Service updated");
        require(repo.get_service(id)?, EntityKind::Services, id)
    })
}

pub fn delete_service(
    repo: &Repository,
    cache: &QueryCache,
    actor: &Identity,
    id: &str,
) -> AppResult<Committed<()>> {
    ensure_admin(actor)?;
    cache.commit(&[EntityKind::Services], || {
        repo.delete_service(id)?;
        tracing::info!(service_id = %id, "Service deleted");
        Ok(())
    })
}
