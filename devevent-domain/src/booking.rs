use chrono::{DateTime, SubsecRound, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::EventRepository;
use crate::{StoreResult, ValidationError};

// Deliberately loose: anything@anything.anything without whitespace.
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// A booking of one email address onto one event.
///
/// Tracks whether its event reference changed since it was last loaded or
/// saved, so the existence check only runs when it can fail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    id: Uuid,
    event_id: Uuid,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    persisted: bool,
    #[serde(skip)]
    event_changed: bool,
}

impl Booking {
    pub fn new(event_id: Uuid, email: impl Into<String>) -> Self {
        let now = Utc::now().trunc_subsecs(6);
        Self {
            id: Uuid::new_v4(),
            event_id,
            email: email.into(),
            created_at: now,
            updated_at: now,
            persisted: false,
            event_changed: true,
        }
    }

    /// Rebuilds a booking read back from storage.
    pub fn from_stored(
        id: Uuid,
        event_id: Uuid,
        email: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            event_id,
            email,
            created_at,
            updated_at,
            persisted: true,
            event_changed: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn is_event_changed(&self) -> bool {
        self.event_changed
    }

    pub fn set_event_id(&mut self, event_id: Uuid) {
        if event_id != self.event_id {
            self.event_id = event_id;
            self.event_changed = true;
        }
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
    }

    /// Write-path guard every repository runs before persisting.
    ///
    /// Normalizes and validates fields first, then, only for a new or
    /// changed event reference, checks that the event exists.
    pub async fn prepare_for_save(&mut self, events: &dyn EventRepository) -> StoreResult<()> {
        if self.event_id.is_nil() {
            return Err(ValidationError::Required("Event ID").into());
        }

        self.email = normalize_email(&self.email);
        if self.email.is_empty() {
            return Err(ValidationError::Required("Email").into());
        }
        if !is_valid_email(&self.email) {
            return Err(ValidationError::InvalidEmail.into());
        }

        if self.event_changed && events.find_by_id(self.event_id).await?.is_none() {
            return Err(ValidationError::MissingEvent.into());
        }

        if self.persisted {
            self.updated_at = Utc::now().trunc_subsecs(6);
        }
        Ok(())
    }

    /// Called by repositories once the row is written.
    pub fn mark_saved(&mut self) {
        self.persisted = true;
        self.event_changed = false;
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub event_id: Option<String>,
    pub email: Option<String>,
}

impl CreateBookingRequest {
    pub fn into_booking(self) -> Result<Booking, ValidationError> {
        let raw_id = self
            .event_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ValidationError::Required("Event ID"))?;
        let event_id = Uuid::parse_str(raw_id.trim())
            .map_err(|_| ValidationError::InvalidEventId(raw_id.clone()))?;

        Ok(Booking::new(event_id, self.email.unwrap_or_default()))
    }
}
