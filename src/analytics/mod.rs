//! Visitor provenance and location analytics
//!
//! Provenance (client IP plus parsed User-Agent) is computed synchronously on
//! the redirect path with no I/O. Location lookups happen later, when visits
//! are listed, and are strictly best-effort.

pub mod geoip;
pub mod ip_extractor;
pub mod user_agent;

use axum::http::{header::USER_AGENT, HeaderMap};

use crate::models::NewVisit;

pub use geoip::{enrich_visits, GeoLookup, IpApiLookup, MaxMindLookup};
pub use ip_extractor::extract_client_ip;
pub use user_agent::{parse_user_agent, UserAgentInfo};

/// Derive the visit metadata for an inbound request. Degrades to empty
/// parts rather than failing.
pub fn extract_provenance(headers: &HeaderMap, remote_addr: &str) -> NewVisit {
    let ip = extract_client_ip(headers, remote_addr);
    let user_agent = headers.get(USER_AGENT).and_then(|h| h.to_str().ok());
    let UserAgentInfo {
        os,
        platform,
        browser,
    } = parse_user_agent(user_agent);

    NewVisit {
        ip,
        os,
        platform,
        browser,
    }
}
