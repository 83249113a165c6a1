//! Best-effort visitor geolocation
//!
//! Two providers are available: the ip-api.com HTTP endpoint and a local
//! MaxMind GeoLite2/GeoIP2 City database. Lookups never fail the request that
//! triggers them; misses are logged and the visit is returned unenriched.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use maxminddb::{geoip2, Mmap, Reader};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{GeoLocation, Visit};
use crate::storage::VisitRecorder;

#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn lookup(&self, ip: &str) -> Result<GeoLocation>;
}

/// Lookups against the ip-api.com JSON endpoint
pub struct IpApiLookup {
    client: Client,
    base_url: String,
}

impl IpApiLookup {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent("waypoint-geoip/0.1.0")
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for geo lookups")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
}

impl IpApiResponse {
    fn into_location(self) -> Result<GeoLocation> {
        if self.status.as_deref() == Some("fail") {
            bail!(
                "ip-api lookup failed: {}",
                self.message.as_deref().unwrap_or("no reason given")
            );
        }

        Ok(GeoLocation {
            country: non_empty(self.country),
            city: non_empty(self.city),
            country_code: non_empty(self.country_code),
        })
    }
}

#[async_trait]
impl GeoLookup for IpApiLookup {
    async fn lookup(&self, ip: &str) -> Result<GeoLocation> {
        let url = format!("{}/json/{}", self.base_url, ip);
        let response: IpApiResponse = self
            .client
            .get(&url)
            .send()
            .await
            .context("failed to request ip-api")?
            .error_for_status()
            .context("ip-api returned an error status")?
            .json()
            .await
            .context("failed to parse ip-api response")?;

        response.into_location()
    }
}

/// Lookups against a memory-mapped MaxMind City database
#[derive(Clone)]
pub struct MaxMindLookup {
    city_reader: Arc<Reader<Mmap>>,
}

impl MaxMindLookup {
    pub fn new(path: &str) -> Result<Self> {
        let reader = unsafe { Reader::open_mmap(path) }
            .with_context(|| format!("Failed to open GeoIP City database at {}", path))?;

        Ok(Self {
            city_reader: Arc::new(reader),
        })
    }
}

#[async_trait]
impl GeoLookup for MaxMindLookup {
    async fn lookup(&self, ip: &str) -> Result<GeoLocation> {
        let addr: IpAddr = ip
            .parse()
            .map_err(|_| anyhow!("'{ip}' is not an IP address"))?;

        let result = self.city_reader.lookup(addr)?;
        let city = result
            .decode::<geoip2::City>()?
            .ok_or_else(|| anyhow!("no City record for {ip}"))?;

        Ok(GeoLocation {
            country: city.country.names.english.map(|s| s.to_string()),
            city: city.city.names.english.map(|s| s.to_string()),
            country_code: city.country.iso_code.map(|s| s.to_string()),
        })
    }
}

/// Fill in location fields for visits that lack them and persist the result.
///
/// Each distinct IP is looked up at most once per call. Failures of either the
/// lookup or the write are logged and skipped.
pub async fn enrich_visits(
    visits: &mut [Visit],
    lookup: &dyn GeoLookup,
    recorder: &dyn VisitRecorder,
) {
    let mut resolved: HashMap<String, Option<GeoLocation>> = HashMap::new();

    for visit in visits.iter_mut() {
        if visit.is_enriched() || visit.ip.is_empty() {
            continue;
        }

        if !resolved.contains_key(&visit.ip) {
            let location = match lookup.lookup(&visit.ip).await {
                Ok(location) if !location.is_empty() => Some(location),
                Ok(_) => {
                    debug!(ip = %visit.ip, "geo lookup returned no location");
                    None
                }
                Err(err) => {
                    warn!(ip = %visit.ip, error = %err, "failed to get ip location");
                    None
                }
            };
            resolved.insert(visit.ip.clone(), location);
        }

        let Some(Some(location)) = resolved.get(&visit.ip) else {
            continue;
        };

        visit.apply_location(location);
        if let Err(err) = recorder.enrich_visit(visit.id, location).await {
            warn!(visit_id = visit.id, error = %err, "failed to store visit location");
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
