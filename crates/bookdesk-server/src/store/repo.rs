use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::records::{
    decode, encode, BookingRecord, PaymentRecord, ServiceRecord, UserRecord,
};
use super::{
    DocumentStore, EntityKind, Filter, NewBooking, NewPayment, NewService, NewUser,
    ProfileChanges, ServiceChanges, StoreError,
};
use crate::models::{
    Booking, BookingStatus, Identity, Payment, PaymentStatus, Profile, Role, Service,
};

type StoreResult<T> = Result<T, StoreError>;

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Typed access to the four collections.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    // Users

    pub fn list_users(&self) -> StoreResult<Vec<Identity>> {
        self.store
            .get_all(EntityKind::Users, None)?
            .into_iter()
            .map(|doc| decode::<UserRecord>(doc).map(|(id, r)| r.into_identity(id)))
            .collect()
    }

    pub fn get_user(&self, id: &str) -> StoreResult<Option<Identity>> {
        self.store
            .get_one(EntityKind::Users, id)?
            .map(|doc| decode::<UserRecord>(doc).map(|(id, r)| r.into_identity(id)))
            .transpose()
    }

    /// Reads a user record for sign-in, falling back to the provider-reported email.
    pub fn get_signed_in_user(&self, id: &str, provider_email: &str) -> StoreResult<Option<Identity>> {
        self.store
            .get_one(EntityKind::Users, id)?
            .map(|doc| decode::<UserRecord>(doc).map(|(id, r)| r.into_signed_in(id, provider_email)))
            .transpose()
    }

    pub fn find_user_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let docs = self
            .store
            .get_all(EntityKind::Users, Some(&Filter::eq("email", email)))?;
        docs.into_iter()
            .next()
            .map(|doc| decode::<UserRecord>(doc).map(|(id, r)| r.into_identity(id)))
            .transpose()
    }

    pub fn get_profile(&self, id: &str) -> StoreResult<Option<Profile>> {
        self.store
            .get_one(EntityKind::Users, id)?
            .map(|doc| decode::<UserRecord>(doc).map(|(id, r)| r.into_profile(id)))
            .transpose()
    }

    pub fn put_user(&self, identity: &Identity) -> StoreResult<()> {
        self.store
            .put(EntityKind::Users, &identity.id, &encode(&NewUser::from(identity))?)
    }

    pub fn set_role(&self, id: &str, role: Role) -> StoreResult<()> {
        self.store
            .update(EntityKind::Users, id, &fields(json!({ "role": role })))
    }

    pub fn set_active(&self, id: &str, status: bool) -> StoreResult<()> {
        self.store
            .update(EntityKind::Users, id, &fields(json!({ "status": status })))
    }

    pub fn update_profile(&self, id: &str, changes: &ProfileChanges) -> StoreResult<()> {
        self.store.update(EntityKind::Users, id, &encode(changes)?)
    }

    pub fn set_profile_pic(&self, id: &str, data_url: &str) -> StoreResult<()> {
        self.store
            .update(EntityKind::Users, id, &fields(json!({ "profilePic": data_url })))
    }

    // Services

    pub fn list_services(&self) -> StoreResult<Vec<Service>> {
        self.store
            .get_all(EntityKind::Services, None)?
            .into_iter()
            .map(|doc| decode::<ServiceRecord>(doc).map(|(id, r)| r.into_service(id)))
            .collect()
    }

    pub fn get_service(&self, id: &str) -> StoreResult<Option<Service>> {
        self.store
            .get_one(EntityKind::Services, id)?
            .map(|doc| decode::<ServiceRecord>(doc).map(|(id, r)| r.into_service(id)))
            .transpose()
    }

    pub fn create_service(&self, service: &NewService<'_>) -> StoreResult<String> {
        self.store.create(EntityKind::Services, &encode(service)?)
    }

    pub fn update_service(&self, id: &str, changes: &ServiceChanges) -> StoreResult<()> {
        self.store.update(EntityKind::Services, id, &encode(changes)?)
    }

    pub fn delete_service(&self, id: &str) -> StoreResult<()> {
        self.store.delete(EntityKind::Services, id)
    }

    // Bookings

    /// All bookings, or only those owned by `owner`.
    pub fn list_bookings(&self, owner: Option<&str>) -> StoreResult<Vec<Booking>> {
        let filter = owner.map(|user_id| Filter::eq("userId", user_id));
        self.store
            .get_all(EntityKind::Bookings, filter.as_ref())?
            .into_iter()
            .map(|doc| decode::<BookingRecord>(doc).map(|(id, r)| r.into_booking(id)))
            .collect()
    }

    pub fn get_booking(&self, id: &str) -> StoreResult<Option<Booking>> {
        self.store
            .get_one(EntityKind::Bookings, id)?
            .map(|doc| decode::<BookingRecord>(doc).map(|(id, r)| r.into_booking(id)))
            .transpose()
    }

    pub fn create_booking(&self, booking: &NewBooking<'_>) -> StoreResult<String> {
        self.store.create(EntityKind::Bookings, &encode(booking)?)
    }

    pub fn set_booking_status(&self, id: &str, status: BookingStatus) -> StoreResult<()> {
        self.store
            .update(EntityKind::Bookings, id, &fields(json!({ "status": status })))
    }

    pub fn delete_booking(&self, id: &str) -> StoreResult<()> {
        self.store.delete(EntityKind::Bookings, id)
    }

    // Payments

    pub fn list_payments(&self, owner: Option<&str>) -> StoreResult<Vec<Payment>> {
        let filter = owner.map(|user_id| Filter::eq("userId", user_id));
        self.store
            .get_all(EntityKind::Payments, filter.as_ref())?
            .into_iter()
            .map(|doc| decode::<PaymentRecord>(doc).map(|(id, r)| r.into_payment(id)))
            .collect()
    }

    pub fn get_payment(&self, id: &str) -> StoreResult<Option<Payment>> {
        self.store
            .get_one(EntityKind::Payments, id)?
            .map(|doc| decode::<PaymentRecord>(doc).map(|(id, r)| r.into_payment(id)))
            .transpose()
    }

    pub fn payments_for_booking(&self, booking_id: &str) -> StoreResult<Vec<Payment>> {
        self.store
            .get_all(EntityKind::Payments, Some(&Filter::eq("bookingId", booking_id)))?
            .into_iter()
            .map(|doc| decode::<PaymentRecord>(doc).map(|(id, r)| r.into_payment(id)))
            .collect()
    }

    pub fn create_payment(&self, payment: &NewPayment<'_>) -> StoreResult<String> {
        self.store.create(EntityKind::Payments, &encode(payment)?)
    }

    pub fn set_payment_status(&self, id: &str, status: PaymentStatus) -> StoreResult<()> {
        self.store.update(
            EntityKind::Payments,
            id,
            &fields(json!({ "paymentStatus": status })),
        )
    }
}
