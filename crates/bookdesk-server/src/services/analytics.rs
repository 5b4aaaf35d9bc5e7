//! Dashboard read models, computed from cached collection reads.

use serde::Serialize;

use super::bookings::{list_bookings, list_payments, own_bookings, own_payments};
use super::catalog::list_services;
use super::users::list_users;
use crate::cache::QueryCache;
use crate::error::AppResult;
use crate::models::{Booking, BookingStatus, Identity, Payment, PaymentStatus};
use crate::store::Repository;

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct UserCounts {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct BookingCounts {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl BookingCounts {
    fn tally(bookings: &[Booking]) -> Self {
        let count = |status: BookingStatus| bookings.iter().filter(|b| b.status == status).count();
        Self {
            total: bookings.len(),
            pending: count(BookingStatus::Pending),
            approved: count(BookingStatus::Approved),
            rejected: count(BookingStatus::Rejected),
        }
    }
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ServiceBookings {
    pub title: String,
    pub bookings: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverview {
    pub users: UserCounts,
    pub bookings: BookingCounts,
    pub total_revenue: f64,
    pub total_services: usize,
    pub bookings_per_service: Vec<ServiceBookings>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOverview {
    pub bookings: BookingCounts,
    pub total_spent: f64,
    pub completed_payments: usize,
    pub pending_payments: usize,
    /// Titles of the user's approved bookings.
    pub active_services: Vec<String>,
}

fn completed_total(payments: &[Payment]) -> f64 {
    payments
        .iter()
        .filter(|p| p.payment_status == PaymentStatus::Completed)
        .map(|p| p.price)
        .sum()
}

/// `actor` must be an admin; the underlying user listing enforces it.
pub fn admin_overview(repo: &Repository, cache: &QueryCache, actor: &Identity) -> AppResult<AdminOverview> {
    let users = list_users(repo, cache, actor)?;
    let services = list_services(repo, cache)?;
    let bookings = list_bookings(repo, cache, actor)?;
    let payments = list_payments(repo, cache, actor)?;

    let active = users.iter().filter(|u| u.status).count();
    let bookings_per_service = services
        .iter()
        .map(|s| ServiceBookings {
            title: s.title.clone(),
            bookings: bookings.iter().filter(|b| b.service_id == s.id).count(),
        })
        .collect();

    Ok(AdminOverview {
        users: UserCounts {
            total: users.len(),
            active,
            inactive: users.len() - active,
        },
        bookings: BookingCounts::tally(&bookings),
        total_revenue: completed_total(&payments),
        total_services: services.len(),
        bookings_per_service,
    })
}

/// Figures over the actor's own bookings and payments.
pub fn user_overview(repo: &Repository, cache: &QueryCache, actor: &Identity) -> AppResult<UserOverview> {
    let bookings = own_bookings(repo, cache, &actor.id)?;
    let payments = own_payments(repo, cache, &actor.id)?;

    let count = |status: PaymentStatus| payments.iter().filter(|p| p.payment_status == status).count();
    Ok(UserOverview {
        bookings: BookingCounts::tally(&bookings),
        total_spent: completed_total(&payments),
        completed_payments: count(PaymentStatus::Completed),
        pending_payments: count(PaymentStatus::Pending),
        active_services: bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Approved)
            .map(|b| b.service_title.clone())
            .collect(),
    })
}
