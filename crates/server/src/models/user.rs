//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use emporium_core::{Email, UserId};

use super::{Cart, Favourites};

/// Postal address. Every field is optional until the user fills it in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
}

/// Optional profile details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Address,
}

/// A registered user together with their cart and favourites.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub user_name: String,
    /// Login email (unique, normalized).
    pub email: Email,
    pub profile: Profile,
    pub cart: Cart,
    pub favourites: Favourites,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Fields for a new registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_name: String,
    pub email: Email,
}
