// the fundamental records that queries and mutations act upon

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------- Tenant -------------
/// The organization every query and mutation is scoped to.
///
/// A tenant id is handed to us by the authentication layer and never parsed out
/// of a request body or a filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ------------- Persistence mode -------------
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}
impl PersistenceMode {
    /// `:memory:` (or an empty location) selects an in-memory store.
    pub fn from_location(location: &str) -> Self {
        match location.trim() {
            "" | ":memory:" => Self::InMemory,
            path => Self::File(path.to_string()),
        }
    }
}

// ------------- Contact -------------
/// A contact row as returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub organization_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    pub current_company_name: Option<String>,
    pub lead_status: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub additional_data: Option<serde_json::Value>,
    // lifted out of additional_data when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<serde_json::Value>,
    pub tags: Vec<String>,
}

/// The writable attributes of a contact, used when seeding the store.
#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    pub current_company_name: Option<String>,
    pub lead_status: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub additional_data: Option<serde_json::Value>,
}

impl NewContact {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
    pub fn name(mut self, first: &str, last: &str) -> Self {
        self.first_name = Some(first.to_string());
        self.last_name = Some(last.to_string());
        self
    }
    pub fn email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }
    pub fn company(mut self, company: &str) -> Self {
        self.current_company_name = Some(company.to_string());
        self
    }
    pub fn lead_status(mut self, status: &str) -> Self {
        self.lead_status = Some(status.to_string());
        self
    }
    pub fn location(mut self, city: &str, state: &str, country: &str) -> Self {
        self.city = Some(city.to_string());
        self.state = Some(state.to_string());
        self.country = Some(country.to_string());
        self
    }
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
    pub fn additional_data(mut self, data: serde_json::Value) -> Self {
        self.additional_data = Some(data);
        self
    }
}

// ------------- Bulk outcome -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub deleted_count: usize,
    pub invalid_count: usize,
}
