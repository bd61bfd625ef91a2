mod id;
mod memory;
mod repository;
mod seed;
mod service;

pub use id::*;
pub use memory::*;
pub use repository::*;
pub use seed::*;
pub use service::*;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::Result;

const REQUIRED_MESSAGE: &str = "Name and email are required";

/// User as saved on the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub image: String,
    pub bio: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reduced set of [`User`] fields returned when listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub image: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            created_at: user.created_at,
            image: user.image.clone(),
        }
    }
}

/// Body accepted when creating or replacing a [`User`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    #[validate(
        required(message = "Name and email are required"),
        length(min = 1, message = "Name and email are required")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "Name and email are required"),
        length(min = 1, message = "Name and email are required")
    )]
    pub email: Option<String>,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub is_admin: Option<bool>,
}

impl UserInput {
    /// Required `name` and `email`, both non-empty.
    pub(crate) fn required(&self) -> Result<(String, String)> {
        let mut errors = ValidationErrors::new();
        let name = self.name.clone().filter(|n| !n.is_empty());
        let email = self.email.clone().filter(|e| !e.is_empty());

        if name.is_none() {
            errors.add(
                "name",
                ValidationError::new("required").with_message(REQUIRED_MESSAGE.into()),
            );
        }
        if email.is_none() {
            errors.add(
                "email",
                ValidationError::new("required").with_message(REQUIRED_MESSAGE.into()),
            );
        }

        match name.zip(email) {
            Some(pair) => Ok(pair),
            None => Err(errors.into()),
        }
    }
}

/// Current time at the store's precision.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

impl User {
    /// Build a new [`User`] from validated input, defaulting optional fields.
    pub fn create(input: UserInput, now: DateTime<Utc>) -> Result<Self> {
        let (name, email) = input.required()?;

        Ok(Self {
            id: ObjectId::new(),
            name,
            email,
            image: input.image.unwrap_or_default(),
            bio: input.bio.unwrap_or_default(),
            is_admin: input.is_admin.unwrap_or(false),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace mutable fields of `self` with `input`.
    ///
    /// - `name`, `email`: always taken from `input`.
    /// - `isAdmin`: `input` when present, stored value otherwise.
    /// - `bio`, `image`: `input` when present and non-empty, stored value otherwise.
    /// - `createdAt`: kept.
    /// - `updatedAt`: `now`, bumped past the stored value when the clock lags.
    pub fn merge(&self, input: UserInput, now: DateTime<Utc>) -> Result<Self> {
        let (name, email) = input.required()?;
        let floor = self.updated_at + Duration::microseconds(1);

        Ok(Self {
            id: self.id,
            name,
            email,
            is_admin: input.is_admin.unwrap_or(self.is_admin),
            bio: input
                .bio
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| self.bio.clone()),
            image: input
                .image
                .filter(|i| !i.is_empty())
                .unwrap_or_else(|| self.image.clone()),
            created_at: self.created_at,
            updated_at: now.max(floor),
        })
    }
}
