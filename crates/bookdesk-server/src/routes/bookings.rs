use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::{AppState, Mutation};
use crate::error::AppResult;
use crate::models::{Booking, BookingStatus, Identity, Payment, Service};
use crate::services::bookings::{self, CardDetails, Decided};
use crate::services::catalog;
use crate::services::listing::{paginate, ListQuery, Page};

#[derive(Debug, Serialize)]
pub struct BookingRow {
    #[serde(flatten)]
    pub booking: Booking,
    pub paid: bool,
}

#[derive(Debug, Serialize)]
pub struct BookingsView {
    pub bookings: Page<BookingRow>,
    /// Services that can currently be booked.
    pub services: Vec<Service>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    #[serde(default)]
    pub service_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub status: BookingStatus,
}

pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<BookingsView>> {
    let all = bookings::list_bookings(&state.repo, &state.cache, &user)?;
    let page = paginate(&all, &query);

    let rows = page
        .items
        .into_iter()
        .map(|booking| -> AppResult<BookingRow> {
            let paid = booking.status == BookingStatus::Approved
                && bookings::is_paid(&state.repo, &booking.id)?;
            Ok(BookingRow { booking, paid })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(BookingsView {
        bookings: Page {
            items: rows,
            page: page.page,
            total_pages: page.total_pages,
            total: page.total,
        },
        services: catalog::bookable_services(&state.repo, &state.cache)?,
    }))
}

pub async fn book(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    Json(body): Json<BookRequest>,
) -> AppResult<(StatusCode, Json<Mutation<Booking>>)> {
    let committed = bookings::book(&state.repo, &state.cache, &user, &body.service_id)?;
    Ok((
        StatusCode::CREATED,
        Json(Mutation::committed(committed, "Service booked successfully!")),
    ))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    Path(id): Path<String>,
) -> AppResult<Json<Mutation<()>>> {
    let committed = bookings::cancel(&state.repo, &state.cache, &user, &id)?;
    Ok(Json(Mutation::committed(committed, "Booking cancelled.")))
}

pub async fn decide(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    Path(id): Path<String>,
    Json(body): Json<DecisionRequest>,
) -> AppResult<Json<Mutation<Decided>>> {
    let committed = bookings::decide(&state.repo, &state.cache, &user, &id, body.status)?;
    let message = format!("Booking {}.", body.status.as_str().to_lowercase());
    Ok(Json(Mutation::committed(committed, &message)))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Page<Payment>>> {
    let all = bookings::list_payments(&state.repo, &state.cache, &user)?;
    Ok(Json(paginate(&all, &query)))
}

pub async fn pay(
    State(state): State<AppState>,
    Extension(user): Extension<Identity>,
    Path(id): Path<String>,
    Json(card): Json<CardDetails>,
) -> AppResult<Json<Mutation<Payment>>> {
    let committed = bookings::pay(&state.repo, &state.cache, &user, &id, &card)?;
    Ok(Json(Mutation::committed(committed, "Payment successful!")))
}
