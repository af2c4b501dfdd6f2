//! Service catalog data model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of service categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceCategory {
    Technology,
    Health,
    Home,
    Education,
    Transportation,
    Entertainment,
    Finance,
}

impl ServiceCategory {
    /// Stable wire/storage representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Technology => "Technology",
            Self::Health => "Health",
            Self::Home => "Home",
            Self::Education => "Education",
            Self::Transportation => "Transportation",
            Self::Entertainment => "Entertainment",
            Self::Finance => "Finance",
        }
    }

    pub const fn all() -> [ServiceCategory; 7] {
        [
            Self::Technology,
            Self::Health,
            Self::Home,
            Self::Education,
            Self::Transportation,
            Self::Entertainment,
            Self::Finance,
        ]
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown service category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for ServiceCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// A service in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub cost: f64,
    pub category: ServiceCategory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Fields for creating a service.
#[derive(Debug, Clone)]
pub struct NewService {
    pub name: String,
    pub description: String,
    pub cost: f64,
    pub category: ServiceCategory,
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ServiceChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cost: Option<f64>,
    pub category: Option<ServiceCategory>,
}
