use crate::errors::AppError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Simplified RFC 5322: local@domain.tld
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .unwrap()
    })
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?[\d\s\-()]+$").unwrap())
}

/// Validate an email address.
///
/// Checks for:
/// - Basic shape (contains @ and ., minimum length)
/// - Fake/placeholder patterns (repeated digit runs like 9999, 1111)
/// - `local@domain.tld` grammar
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    let fake_patterns = ["999999", "111111", "000000", "123456789"];
    for pattern in &fake_patterns {
        if email.contains(pattern) {
            tracing::warn!(
                "Invalid email detected (fake pattern '{}'): {}",
                pattern,
                email
            );
            return false;
        }
    }

    email_regex().is_match(email)
}

/// Validate a phone number: at least 10 characters drawn from
/// digits, spaces, `+`, `-` and parentheses.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() >= 10 && phone_regex().is_match(phone)
}

/// A fully validated person record.
///
/// Immutable once constructed; a refreshed search produces a new record that
/// replaces the old one rather than mutating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(rename = "linkedIn", skip_serializing_if = "Option::is_none")]
    pub linked_in: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PersonRecord {
    /// Builds a record from merged partial data, enforcing the entity
    /// invariants: `name` must be non-empty, a set `email` must match the
    /// email grammar and a set `phone` the phone grammar.
    pub fn create(name: &str, data: PartialPersonData) -> Result<Self, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("name is required".to_string()));
        }

        if let Some(ref email) = data.email {
            if !is_valid_email(email) {
                return Err(AppError::BadRequest(format!("invalid email: {}", email)));
            }
        }

        if let Some(ref phone) = data.phone {
            if !is_valid_phone(phone) {
                return Err(AppError::BadRequest(format!("invalid phone: {}", phone)));
            }
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: data.email,
            company: data.company,
            instagram: data.instagram,
            whatsapp: data.whatsapp,
            linked_in: data.linked_in,
            twitter: data.twitter,
            phone: data.phone,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn has_contact_info(&self) -> bool {
        self.whatsapp.is_some() || self.phone.is_some() || self.email.is_some()
    }

    pub fn has_social_media(&self) -> bool {
        self.instagram.is_some() || self.linked_in.is_some() || self.twitter.is_some()
    }
}

/// Partial person data as returned by a single provider.
///
/// All fields optional; no invariants. Validation happens only when the
/// merged result is promoted to a [`PersonRecord`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialPersonData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub whatsapp: Option<String>,
    #[serde(rename = "linkedIn", default)]
    pub linked_in: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

fn prefer(slot: &mut Option<String>, candidate: &Option<String>) {
    let has_value = slot.as_deref().is_some_and(|s| !s.trim().is_empty());
    if !has_value {
        if let Some(value) = candidate.as_deref() {
            if !value.trim().is_empty() {
                *slot = Some(value.to_string());
            }
        }
    }
}

impl PartialPersonData {
    /// First-non-empty-wins merge: fields already set on `self` are kept,
    /// empty fields take the other side's value. Callers fold provider
    /// results in registration order so earlier providers take priority
    /// per field.
    pub fn merge_missing_from(&mut self, other: &PartialPersonData) {
        prefer(&mut self.name, &other.name);
        prefer(&mut self.email, &other.email);
        prefer(&mut self.company, &other.company);
        prefer(&mut self.instagram, &other.instagram);
        prefer(&mut self.whatsapp, &other.whatsapp);
        prefer(&mut self.linked_in, &other.linked_in);
        prefer(&mut self.twitter, &other.twitter);
        prefer(&mut self.phone, &other.phone);
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.company.is_none()
            && self.instagram.is_none()
            && self.whatsapp.is_none()
            && self.linked_in.is_none()
            && self.twitter.is_none()
            && self.phone.is_none()
    }
}

/// Incoming search request body for `POST /api/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(rename = "type", default)]
    pub search_type: String,
}

/// Either a single person (email search) or a list (company search).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SearchData {
    Person(PersonRecord),
    Persons(Vec<PersonRecord>),
}

/// Outcome of a search, serialized directly as the response body.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SearchData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

impl SearchResponse {
    pub fn found(data: SearchData, cached: bool) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            cached: Some(cached),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            cached: None,
        }
    }
}
