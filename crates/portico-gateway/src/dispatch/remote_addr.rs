//! Caller address resolution.
//!
//! An ordered chain of header-based resolvers, falling back to the
//! transport peer address when none matches.  Like the origin rebuild, this
//! trusts inbound headers and is valid only behind a controlled edge.

use portico_kernel::gateway::Headers;
use std::net::{IpAddr, SocketAddr};

/// Headers consulted in order before falling back to the peer address.
const RESOLVER_CHAIN: [&str; 4] = [
    super::forwarded::FOR,
    "proxy-client-ip",
    "wl-proxy-client-ip",
    "x-real-ip",
];

/// Resolve the caller's address.
pub fn resolve(headers: &Headers, peer: Option<SocketAddr>) -> Option<IpAddr> {
    for header in RESOLVER_CHAIN {
        if let Some(value) = headers.first(header) {
            // X-Forwarded-For may carry a chain; the first entry is the
            // original caller.
            let candidate = value.split(',').next().unwrap_or("").trim();
            if candidate.is_empty() || candidate.eq_ignore_ascii_case("unknown") {
                continue;
            }
            if let Ok(addr) = candidate.parse() {
                return Some(addr);
            }
        }
    }
    peer.map(|p| p.ip())
}
