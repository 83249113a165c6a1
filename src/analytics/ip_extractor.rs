//! Client IP extraction from HTTP headers
//!
//! The first entry of `X-Forwarded-For` wins when present. Proxies are trusted
//! implicitly: there is no allow-list, so any client can choose the address it
//! is recorded under. Without the header the transport peer address is used.

use axum::http::HeaderMap;
use std::net::SocketAddr;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Extract the client IP address for a request
///
/// # Arguments
/// * `headers` - HTTP request headers
/// * `remote_addr` - The transport-level peer address, usually `host:port`
///
/// # Returns
/// The best-effort client address. Never fails: if `remote_addr` cannot be
/// split into host and port it is returned unmodified.
pub fn extract_client_ip(headers: &HeaderMap, remote_addr: &str) -> String {
    if let Some(ip) = extract_forwarded_for(headers) {
        return ip;
    }

    split_host(remote_addr).unwrap_or_else(|| remote_addr.to_string())
}

/// First element of a non-empty X-Forwarded-For header
fn extract_forwarded_for(headers: &HeaderMap) -> Option<String> {
    let xff = headers.get(X_FORWARDED_FOR)?.to_str().ok()?;
    if xff.is_empty() {
        return None;
    }

    xff.split(',').next().map(|first| first.trim().to_string())
}

/// Host part of a `host:port` or `[v6]:port` address
fn split_host(remote_addr: &str) -> Option<String> {
    if let Ok(addr) = remote_addr.parse::<SocketAddr>() {
        return Some(addr.ip().to_string());
    }

    if let Some(rest) = remote_addr.strip_prefix('[') {
        let (host, port) = rest.split_once("]:")?;
        return is_port(port).then(|| host.to_string());
    }

    let (host, port) = remote_addr.rsplit_once(':')?;
    // An unbracketed IPv6 literal has too many colons to carry a port
    if host.contains(':') || !is_port(port) {
        return None;
    }

    Some(host.to_string())
}

fn is_port(port: &str) -> bool {
    !port.is_empty() && port.chars().all(|c| c.is_ascii_digit())
}
