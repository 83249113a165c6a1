use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Visit metadata captured on the redirect path, before it is stored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewVisit {
    pub ip: String,
    pub os: String,
    pub platform: String,
    pub browser: String,
}

/// Stored visit record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Visit {
    pub id: i64,
    pub ip: String,
    pub os: String,
    pub platform: String,
    pub browser: String,
    /// Unix timestamp assigned by the database on insert
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(rename = "countryCode", skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

impl Visit {
    /// Any stored location part counts, so partial results are not looked up again
    pub fn is_enriched(&self) -> bool {
        self.country.is_some() || self.city.is_some() || self.country_code.is_some()
    }

    pub fn apply_location(&mut self, location: &GeoLocation) {
        self.country = location.country.clone();
        self.city = location.city.clone();
        self.country_code = location.country_code.clone();
    }
}

/// Location resolved for a visitor IP
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub country: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
}

impl GeoLocation {
    pub fn is_empty(&self) -> bool {
        self.country.is_none() && self.city.is_none() && self.country_code.is_none()
    }
}
