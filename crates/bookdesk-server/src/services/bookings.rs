//! Booking and payment lifecycle.
//!
//! Bookings start Pending. An admin decision moves them to Approved or
//! Rejected; approval opens exactly one Pending payment, which the booking's
//! owner may complete once. Only the owner may cancel, and only while the
//! booking is still Pending.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::require;
use crate::auth::guard;
use crate::cache::{Committed, QueryCache, QueryKey};
use crate::error::{AppError, AppResult};
use crate::models::{Booking, BookingStatus, Identity, Payment, PaymentStatus, ServiceStatus};
use crate::store::{EntityKind, NewBooking, NewPayment, Repository};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    pub card_number: String,
}

/// Result of an admin decision. `payment` is set only for approvals.
#[derive(Debug, Serialize)]
pub struct Decided {
    pub booking: Booking,
    pub payment: Option<Payment>,
}

fn scope_for(actor: &Identity) -> Option<&str> {
    if guard::is_admin(Some(actor)) {
        None
    } else {
        Some(actor.id.as_str())
    }
}

fn bookings_for(repo: &Repository, cache: &QueryCache, owner: Option<&str>) -> AppResult<Arc<Vec<Booking>>> {
    let key = match owner {
        Some(id) => QueryKey::scoped(EntityKind::Bookings, id),
        None => QueryKey::all(EntityKind::Bookings),
    };
    cache.get_or_fetch(key, || Ok(repo.list_bookings(owner)?))
}

fn payments_for(repo: &Repository, cache: &QueryCache, owner: Option<&str>) -> AppResult<Arc<Vec<Payment>>> {
    let key = match owner {
        Some(id) => QueryKey::scoped(EntityKind::Payments, id),
        None => QueryKey::all(EntityKind::Payments),
    };
    cache.get_or_fetch(key, || Ok(repo.list_payments(owner)?))
}

/// Admins see every booking, everyone else only their own.
pub fn list_bookings(repo: &Repository, cache: &QueryCache, actor: &Identity) -> AppResult<Arc<Vec<Booking>>> {
    bookings_for(repo, cache, scope_for(actor))
}

pub fn list_payments(repo: &Repository, cache: &QueryCache, actor: &Identity) -> AppResult<Arc<Vec<Payment>>> {
    payments_for(repo, cache, scope_for(actor))
}

pub fn own_bookings(repo: &Repository, cache: &QueryCache, user_id: &str) -> AppResult<Arc<Vec<Booking>>> {
    bookings_for(repo, cache, Some(user_id))
}

pub fn own_payments(repo: &Repository, cache: &QueryCache, user_id: &str) -> AppResult<Arc<Vec<Payment>>> {
    payments_for(repo, cache, Some(user_id))
}

pub fn book(
    repo: &Repository,
    cache: &QueryCache,
    actor: &Identity,
    service_id: &str,
) -> AppResult<Committed<Booking>> {
    if service_id.trim().is_empty() {
        return Err(AppError::BadRequest("Please select a service.".to_string()));
    }

    let service = require(repo.get_service(service_id)?, EntityKind::Services, service_id)?;
    if service.status == ServiceStatus::Inactive {
        return Err(AppError::Conflict(format!(
            "{} is not available for booking.",
            service.title
        )));
    }

    cache.commit(&[EntityKind::Bookings], || {
        let id = repo.create_booking(&NewBooking {
            user_id: &actor.id,
            service_id: &service.id,
            service_title: &service.title,
            category: &service.category,
            price: service.price,
            status: BookingStatus::Pending,
        })?;
        tracing::info!(booking_id = %id, user_id = %actor.id, service_id = %service.id, "Booking created");

        Ok(Booking {
            id,
            user_id: actor.id.clone(),
            service_id: service.id.clone(),
            service_title: service.title.clone(),
            category: service.category.clone(),
            price: service.price,
            status: BookingStatus::Pending,
        })
    })
}

pub fn decide(
    repo: &Repository,
    cache: &QueryCache,
    actor: &Identity,
    booking_id: &str,
    status: BookingStatus,
) -> AppResult<Committed<Decided>> {
    if !guard::is_admin(Some(actor)) {
        return Err(AppError::Forbidden(
            "Only administrators can approve or reject bookings.".to_string(),
        ));
    }
    if status == BookingStatus::Pending {
        return Err(AppError::BadRequest(
            "A booking can only be approved or rejected.".to_string(),
        ));
    }

    let mut booking = require(repo.get_booking(booking_id)?, EntityKind::Bookings, booking_id)?;
    if booking.status != BookingStatus::Pending {
        return Err(AppError::Conflict(format!(
            "Booking is already {}.",
            booking.status.as_str()
        )));
    }

    cache.commit(&[EntityKind::Bookings, EntityKind::Payments], || {
        repo.set_booking_status(&booking.id, status)?;
        booking.status = status;
        tracing::info!(booking_id = %booking.id, status = status.as_str(), "Booking decided");

        if status != BookingStatus::Approved {
            return Ok(Decided { booking, payment: None });
        }

        let created = repo.create_payment(&NewPayment {
            booking_id: &booking.id,
            user_id: &booking.user_id,
            service_title: &booking.service_title,
            price: booking.price,
            payment_status: PaymentStatus::Pending,
        });
        let payment_id = match created {
            Ok(id) => id,
            Err(e) => {
                // The status write already landed; readers must see it.
                tracing::error!(booking_id = %booking.id, "Approved booking without payment: {e}");
                cache.invalidate(EntityKind::Bookings);
                return Err(e.into());
            }
        };

        let payment = Payment {
            id: payment_id,
            booking_id: booking.id.clone(),
            user_id: booking.user_id.clone(),
            service_title: booking.service_title.clone(),
            price: booking.price,
            payment_status: PaymentStatus::Pending,
        };
        Ok(Decided {
            booking,
            payment: Some(payment),
        })
    })
}

pub fn cancel(
    repo: &Repository,
    cache: &QueryCache,
    actor: &Identity,
    booking_id: &str,
) -> AppResult<Committed<()>> {
    let booking = require(repo.get_booking(booking_id)?, EntityKind::Bookings, booking_id)?;
    if booking.user_id != actor.id {
        return Err(AppError::Forbidden("You can only cancel your own bookings.".to_string()));
    }
    if booking.status != BookingStatus::Pending {
        return Err(AppError::Conflict("Only pending bookings can be cancelled.".to_string()));
    }

    cache.commit(&[EntityKind::Bookings], || {
        repo.delete_booking(&booking.id)?;
        tracing::info!(booking_id = %booking.id, "Booking cancelled");
        Ok(())
    })
}

pub fn pay(
    repo: &Repository,
    cache: &QueryCache,
    actor: &Identity,
    payment_id: &str,
    card: &CardDetails,
) -> AppResult<Committed<Payment>> {
    if card.card_number.trim().is_empty() {
        return Err(AppError::BadRequest("Please fill card number".to_string()));
    }

    let mut payment = require(repo.get_payment(payment_id)?, EntityKind::Payments, payment_id)?;
    if payment.user_id != actor.id {
        return Err(AppError::Forbidden("You can only pay for your own bookings.".to_string()));
    }
    if payment.payment_status == PaymentStatus::Completed {
        return Err(AppError::Conflict("Payment is already completed.".to_string()));
    }

    cache.commit(&[EntityKind::Payments, EntityKind::Bookings], || {
        repo.set_payment_status(&payment.id, PaymentStatus::Completed)?;
        payment.payment_status = PaymentStatus::Completed;
        tracing::info!(payment_id = %payment.id, booking_id = %payment.booking_id, "Payment completed");
        Ok(payment)
    })
}

/// Whether a completed payment exists for the booking.
pub fn is_paid(repo: &Repository, booking_id: &str) -> AppResult<bool> {
    Ok(repo
        .payments_for_booking(booking_id)?
        .iter()
        .any(|p| p.payment_status == PaymentStatus::Completed))
}
