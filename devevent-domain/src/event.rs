use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ValidationError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub image: String,
    pub slug: String,
    pub location: String,
    pub date: String,
    pub time: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An event that has not been persisted yet.
///
/// Built from loosely-typed form input; `validate` must succeed before the
/// draft is written.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub image: String,
    pub slug: String,
    pub location: String,
    pub date: String,
    pub time: String,
}

impl NewEvent {
    /// Maps form fields onto event attributes. Unknown names are dropped,
    /// later duplicates win.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut draft = Self::default();
        for (name, value) in fields {
            let slot = match name.as_ref() {
                "title" => &mut draft.title,
                "image" => &mut draft.image,
                "slug" => &mut draft.slug,
                "location" => &mut draft.location,
                "date" => &mut draft.date,
                "time" => &mut draft.time,
                _ => continue,
            };
            *slot = value.into();
        }
        draft
    }

    /// Trims every attribute, checks the required ones and fills in the slug
    /// from the title when none was given.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        for (label, value) in [
            ("Title", &mut self.title),
            ("Image", &mut self.image),
            ("Location", &mut self.location),
            ("Date", &mut self.date),
            ("Time", &mut self.time),
        ] {
            *value = value.trim().to_string();
            if value.is_empty() {
                return Err(ValidationError::Required(label));
            }
        }

        self.slug = self.slug.trim().to_string();
        if self.slug.is_empty() {
            self.slug = slugify(&self.title);
        }
        Ok(())
    }

    /// Stamps a validated draft with a fresh identifier and timestamps.
    ///
    /// Timestamps keep microseconds only, which is what Postgres stores.
    pub fn into_event(self, now: DateTime<Utc>) -> Event {
        let now = now.trunc_subsecs(6);
        Event {
            id: Uuid::new_v4(),
            title: self.title,
            image: self.image,
            slug: self.slug,
            location: self.location,
            date: self.date,
            time: self.time,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lower-cases `title` and collapses every run of non-alphanumeric
/// characters into a single `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Showcase events used to seed an empty store.
pub fn sample_events() -> Vec<NewEvent> {
    [
        ("Tech Innovators Summit 2026", "/images/event1.png", "San Francisco, CA", "2026-01-15", "09:00 AM"),
        ("Global Hackathon 2026", "/images/event2.png", "Online", "2026-02-01", "10:00 AM"),
        ("AI & Future Tech", "/images/event3.png", "New York, NY", "2026-03-20", "08:30 AM"),
        ("Developer Week", "/images/event4.png", "Austin, TX", "2026-04-15", "09:00 AM"),
        ("Web3 Conference", "/images/event5.png", "Miami, FL", "2026-05-10", "10:00 AM"),
        ("Startup Pitch Night", "/images/event6.png", "Seattle, WA", "2026-06-05", "06:00 PM"),
    ]
    .into_iter()
    .map(|(title, image, location, date, time)| NewEvent {
        title: title.to_string(),
        image: image.to_string(),
        slug: slugify(title),
        location: location.to_string(),
        date: date.to_string(),
        time: time.to_string(),
    })
    .collect()
}
