//! Address validation: the gate every target passes before a fetch.
//!
//! Validation operates on resolved addresses, never on the hostname string,
//! which is what defeats hostname-based bypasses of an address blocklist. A
//! [`ValidatedTarget`] is recomputed on every call because the addresses a
//! name resolves to can legitimately change between calls; DNS rebinding is
//! re-checked, not cached away.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tokio::net::lookup_host;
use url::Url;

use crate::error::ProxyError;

/// A URL proven eligible for fetching, together with the addresses it
/// resolved to. Only [`validate_target`] constructs one.
#[derive(Debug, Clone)]
pub struct ValidatedTarget {
    url: Url,
    addrs: Vec<IpAddr>,
}

impl ValidatedTarget {
    /// The target URL, exactly as supplied; validation never rewrites it.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The addresses the host resolved to at validation time.
    pub fn addrs(&self) -> &[IpAddr] {
        &self.addrs
    }
}

/// Validate a URI for fetching.
///
/// The URI must parse as an absolute `http` or `https` URL whose host
/// resolves, and every resolved address must be globally routable. Rejections
/// map to [`ProxyError::InvalidUri`], [`ProxyError::UnsupportedProtocol`], or
/// [`ProxyError::PrivateAddress`]; no network request is made beyond the
/// address resolution itself.
pub async fn validate_target(uri: &str) -> Result<ValidatedTarget, ProxyError> {
    let url = Url::parse(uri).map_err(|e| ProxyError::InvalidUri(format!("{uri}: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ProxyError::UnsupportedProtocol(other.to_string())),
    }

    let host = url
        .host_str()
        .ok_or_else(|| ProxyError::InvalidUri(format!("{uri}: no host")))?;
    let port = url.port_or_known_default().unwrap_or(80);

    let addrs = resolve(host, port).await?;
    for addr in &addrs {
        if !is_routable(*addr) {
            tracing::warn!(host, %addr, "target resolves to a non-routable address");
            return Err(ProxyError::PrivateAddress(*addr));
        }
    }

    tracing::debug!(host, addrs = addrs.len(), "target validated");
    Ok(ValidatedTarget { url, addrs })
}

/// Resolve a host to its concrete addresses. IP literals skip DNS entirely.
async fn resolve(host: &str, port: u16) -> Result<Vec<IpAddr>, ProxyError> {
    // `Url::host_str` keeps IPv6 literals bracketed.
    let literal = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(addr) = literal.parse::<IpAddr>() {
        return Ok(vec![addr]);
    }

    let addrs: Vec<IpAddr> = lookup_host((literal, port))
        .await
        .map_err(|e| ProxyError::InvalidUri(format!("failed to resolve {host}: {e}")))?
        .map(|sockaddr| sockaddr.ip())
        .collect();

    if addrs.is_empty() {
        return Err(ProxyError::InvalidUri(format!(
            "{host} resolved to no addresses"
        )));
    }
    Ok(addrs)
}

/// Whether an address is globally routable and therefore fetchable.
///
/// Covers the IPv4 and IPv6 reserved blocks: loopback, RFC 1918 private
/// space, link-local, carrier-grade NAT, benchmarking, documentation,
/// multicast, broadcast, and the unspecified address. IPv4-mapped IPv6
/// addresses are judged by their embedded IPv4 address.
pub fn is_routable(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => routable_v4(v4),
        IpAddr::V6(v6) => routable_v6(v6),
    }
}

fn routable_v4(addr: Ipv4Addr) -> bool {
    if addr.is_unspecified()
        || addr.is_loopback()
        || addr.is_private()
        || addr.is_link_local()
        || addr.is_broadcast()
        || addr.is_multicast()
        || addr.is_documentation()
    {
        return false;
    }

    let octets = addr.octets();
    // 0.0.0.0/8 "this network"
    if octets[0] == 0 {
        return false;
    }
    // 100.64.0.0/10 carrier-grade NAT
    if octets[0] == 100 && (octets[1] & 0xc0) == 64 {
        return false;
    }
    // 192.0.0.0/24 protocol assignments
    if octets[0] == 192 && octets[1] == 0 && octets[2] == 0 {
        return false;
    }
    // 198.18.0.0/15 benchmarking
    if octets[0] == 198 && (octets[1] & 0xfe) == 18 {
        return false;
    }
    // 240.0.0.0/4 reserved
    if octets[0] >= 240 {
        return false;
    }
    true
}

fn routable_v6(addr: Ipv6Addr) -> bool {
    if addr.is_unspecified() || addr.is_loopback() || addr.is_multicast() {
        return false;
    }
    if let Some(v4) = addr.to_ipv4_mapped() {
        return routable_v4(v4);
    }

    let segments = addr.segments();
    // fc00::/7 unique local
    if (segments[0] & 0xfe00) == 0xfc00 {
        return false;
    }
    // fe80::/10 link local
    if (segments[0] & 0xffc0) == 0xfe80 {
        return false;
    }
    // 2001:db8::/32 documentation
    if segments[0] == 0x2001 && segments[1] == 0x0db8 {
        return false;
    }
    true
}
