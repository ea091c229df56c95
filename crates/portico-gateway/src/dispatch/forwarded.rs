//! Forwarding headers: the canonical set the gateway consumes and
//! re-synthesizes for downstream hops.

use portico_kernel::gateway::{Headers, OriginUri};

pub const PROTO: &str = "x-forwarded-proto";
pub const HOST: &str = "x-forwarded-host";
pub const PORT: &str = "x-forwarded-port";
pub const FOR: &str = "x-forwarded-for";
/// Tenant code of the caller's namespace.
pub const TENANT: &str = "x-forwarded-tenant";
/// Mount path the upstream edge serves this tenant under.
pub const PATH: &str = "x-forwarded-path";
/// Full externally observed URI, for downstream link generation.
pub const ORIGIN_URI: &str = "x-forwarded-origin-uri";
/// Per-hop token signed with the target application's key.
pub const TOKEN: &str = "x-forwarded-token";

fn default_port(scheme: &str) -> u16 {
    match scheme {
        "https" => 443,
        _ => 80,
    }
}

/// Split `host[:port]`, tolerating bracketed IPv6 literals.
fn split_host_port(value: &str) -> (String, Option<u16>) {
    if let Some(rest) = value.strip_prefix('[') {
        // "[::1]:8080" or "[::1]"
        if let Some((host, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').and_then(|p| p.parse().ok());
            return (format!("[{host}]"), port);
        }
        return (value.to_string(), None);
    }
    match value.split_once(':') {
        Some((host, port)) => (host.to_string(), port.parse().ok()),
        None => (value.to_string(), None),
    }
}

/// Rebuild the externally observed URI, preferring the trusted forwarding
/// headers over what the transport itself saw.  Valid only behind a
/// controlled upstream edge.
pub fn rebuild_origin(
    headers: &Headers,
    path: &str,
    query: Option<&str>,
    default_scheme: &str,
) -> OriginUri {
    let scheme = headers
        .first(PROTO)
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default_scheme.to_string());

    let host_header = headers
        .first(HOST)
        .or_else(|| headers.first("host"))
        .unwrap_or("localhost");
    let (host, host_port) = split_host_port(host_header.trim());

    let port = headers
        .first(PORT)
        .and_then(|p| p.trim().parse().ok())
        .or(host_port)
        .unwrap_or_else(|| default_port(&scheme));

    OriginUri {
        scheme,
        host,
        port,
        path: path.to_string(),
        query: query.map(String::from),
    }
}

/// Stamp the canonical forwarding set onto the request headers for the
/// upstream hop, replacing whatever arrived.
pub fn synthesize(headers: &mut Headers, origin: &OriginUri, remote_addr: Option<&str>) {
    headers.set(PROTO, origin.scheme.clone());
    headers.set(HOST, origin.host.clone());
    headers.set(PORT, origin.port.to_string());
    headers.set(ORIGIN_URI, origin.to_string());
    if let Some(addr) = remote_addr {
        headers.set(FOR, addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarding_headers_override_the_transport_view() {
        let mut headers = Headers::new();
        headers.append("host", "gateway-internal:8080");
        headers.append(PROTO, "https");
        headers.append(HOST, "edge.example.com");
        headers.append(PORT, "443");

        let origin = rebuild_origin(&headers, "/portal/", Some("a=1"), "http");
        assert_eq!(origin.scheme, "https");
        assert_eq!(origin.host, "edge.example.com");
        assert_eq!(origin.port, 443);
        assert_eq!(origin.to_string(), "https://edge.example.com/portal/?a=1");
    }

    #[test]
    fn falls_back_to_the_host_header_and_scheme_default() {
        let mut headers = Headers::new();
        headers.append("host", "localhost:3000");

        let origin = rebuild_origin(&headers, "/", None, "http");
        assert_eq!(origin.scheme, "http");
        assert_eq!(origin.host, "localhost");
        assert_eq!(origin.port, 3000);
    }

    #[test]
    fn bracketed_ipv6_hosts_are_kept_intact() {
        let mut headers = Headers::new();
        headers.append("host", "[::1]:8443");

        let origin = rebuild_origin(&headers, "/", None, "https");
        assert_eq!(origin.host, "[::1]");
        assert_eq!(origin.port, 8443);
    }

    #[test]
    fn synthesize_replaces_inbound_values() {
        let mut headers = Headers::new();
        headers.append(PROTO, "http");
        headers.append(FOR, "203.0.113.9");

        let origin = OriginUri {
            scheme: "https".into(),
            host: "edge.example.com".into(),
            port: 443,
            path: "/portal/".into(),
            query: None,
        };
        synthesize(&mut headers, &origin, Some("198.51.100.7"));

        assert_eq!(headers.all(PROTO).collect::<Vec<_>>(), vec!["https"]);
        assert_eq!(headers.first(FOR), Some("198.51.100.7"));
        assert_eq!(
            headers.first(ORIGIN_URI),
            Some("https://edge.example.com/portal/")
        );
    }
}
