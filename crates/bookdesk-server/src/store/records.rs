//! Raw document shapes and the one place missing fields get their defaults.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::{Document, StoreError};
use crate::models::{
    Booking, BookingStatus, Identity, Payment, PaymentStatus, Profile, Role, Service,
    ServiceStatus,
};

/// Numbers stored as JSON numbers or numeric strings; anything else reads as absent.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(lenient_f64(deserializer)?
        .filter(|n| n.is_finite() && *n >= 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n as u32))
}

pub(super) fn decode<T: for<'de> Deserialize<'de>>(doc: Document) -> Result<(String, T), StoreError> {
    let record = serde_json::from_value(Value::Object(doc.body))?;
    Ok((doc.id, record))
}

pub(super) fn encode<T: Serialize>(record: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Malformed(<serde_json::Error as serde::ser::Error>::custom(
            format!("expected an object, got {other}"),
        ))),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UserRecord {
    name: Option<String>,
    email: Option<String>,
    role: Option<String>,
    status: Option<bool>,
    #[serde(rename = "created_at")]
    created_at: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    age: Option<u32>,
    profile_pic: Option<String>,
}

impl UserRecord {
    pub(super) fn into_identity(self, id: String) -> Identity {
        Identity {
            id,
            name: self.name.unwrap_or_else(|| "Unnamed User".to_string()),
            email: self.email.unwrap_or_else(|| "No Email".to_string()),
            role: self.role.as_deref().map(Role::parse_lenient).unwrap_or_default(),
            created_at: self.created_at.unwrap_or_else(crate::db::now),
            status: self.status.unwrap_or(true),
        }
    }

    /// Sign-in flavour: name falls back to "User" and email to what the provider reported.
    pub(super) fn into_signed_in(self, id: String, provider_email: &str) -> Identity {
        Identity {
            id,
            name: self.name.unwrap_or_else(|| "User".to_string()),
            email: self.email.unwrap_or_else(|| provider_email.to_string()),
            role: self.role.as_deref().map(Role::parse_lenient).unwrap_or_default(),
            created_at: self.created_at.unwrap_or_else(crate::db::now),
            status: self.status.unwrap_or(true),
        }
    }

    pub(super) fn into_profile(mut self, id: String) -> Profile {
        let phone = self.phone.take();
        let address = self.address.take();
        let age = self.age.take();
        let profile_pic = self.profile_pic.take();
        Profile {
            identity: self.into_identity(id),
            phone,
            address,
            age,
            profile_pic,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub role: Role,
    pub created_at: &'a str,
    pub status: bool,
}

impl<'a> From<&'a Identity> for NewUser<'a> {
    fn from(identity: &'a Identity) -> Self {
        Self {
            name: &identity.name,
            email: &identity.email,
            role: identity.role,
            created_at: &identity.created_at,
            status: identity.status,
        }
    }
}

/// Fields a user may change on their own record. Role and email are not among them.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ServiceRecord {
    title: Option<String>,
    category: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    price: Option<f64>,
    status: Option<String>,
}

impl ServiceRecord {
    pub(super) fn into_service(self, id: String) -> Service {
        Service {
            id,
            title: self.title.unwrap_or_else(|| "Unnamed Service".to_string()),
            category: self.category.unwrap_or_else(|| "Uncategorized".to_string()),
            price: self.price.unwrap_or(0.0),
            status: match self.status.as_deref() {
                Some(s) if s.eq_ignore_ascii_case("inactive") => ServiceStatus::Inactive,
                _ => ServiceStatus::Active,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewService<'a> {
    pub title: &'a str,
    pub category: &'a str,
    pub price: f64,
    pub status: ServiceStatus,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ServiceChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct BookingRecord {
    user_id: Option<String>,
    service_id: Option<String>,
    service_title: Option<String>,
    category: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    price: Option<f64>,
    status: Option<String>,
}

impl BookingRecord {
    pub(super) fn into_booking(self, id: String) -> Booking {
        Booking {
            id,
            user_id: self.user_id.unwrap_or_default(),
            service_id: self.service_id.unwrap_or_default(),
            service_title: self.service_title.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            price: self.price.unwrap_or(0.0),
            status: match self.status.as_deref() {
                Some("Approved") => BookingStatus::Approved,
                Some("Rejected") => BookingStatus::Rejected,
                _ => BookingStatus::Pending,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking<'a> {
    pub user_id: &'a str,
    pub service_id: &'a str,
    pub service_title: &'a str,
    pub category: &'a str,
    pub price: f64,
    pub status: BookingStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PaymentRecord {
    booking_id: Option<String>,
    user_id: Option<String>,
    service_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    price: Option<f64>,
    payment_status: Option<String>,
}

impl PaymentRecord {
    pub(super) fn into_payment(self, id: String) -> Payment {
        Payment {
            id,
            booking_id: self.booking_id.unwrap_or_default(),
            user_id: self.user_id.unwrap_or_default(),
            service_title: self.service_title.unwrap_or_default(),
            price: self.price.unwrap_or(0.0),
            // Legacy "Failed" rows read as Pending; only Completed counts as paid.
            payment_status: match self.payment_status.as_deref() {
                Some(s) if s.eq_ignore_ascii_case("completed") => PaymentStatus::Completed,
                _ => PaymentStatus::Pending,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment<'a> {
    pub booking_id: &'a str,
    pub user_id: &'a str,
    pub service_title: &'a str,
    pub price: f64,
    pub payment_status: PaymentStatus,
}
