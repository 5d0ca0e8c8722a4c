//! Outbound URL validation for the trigger webhook.
//!
//! The webhook target comes from configuration, so it is checked once at startup: it must be
//! `https`, or `http` only for loopback hosts, must name a host, and must not embed userinfo or
//! a fragment. IP-literal hosts in private, link-local, multicast or unspecified ranges are
//! refused. Hostnames are not resolved here.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EgressError {
    #[error("invalid URL: {0}")]
    Parse(String),
    #[error("outbound URL must be https, or http only for localhost/loopback")]
    Scheme,
    #[error("outbound URL must include a host")]
    MissingHost,
    #[error("outbound URL must not contain userinfo")]
    Userinfo,
    #[error("outbound URL must not contain a fragment")]
    Fragment,
    #[error("outbound URL host is a disallowed IP (private/link-local/multicast/unspecified)")]
    DisallowedIp,
}

fn strip_ipv6_brackets(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

fn is_loopback_host(host: &str) -> bool {
    let host = strip_ipv6_brackets(host);
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

fn is_disallowed_ipv4(ip: Ipv4Addr) -> bool {
    ip.is_unspecified()
        || ip.is_link_local()
        || ip.is_private()
        || ip.is_multicast()
        || ip.is_broadcast()
}

fn is_disallowed_ipv6(ip: Ipv6Addr) -> bool {
    ip.is_unspecified() || ip.is_unicast_link_local() || ip.is_unique_local() || ip.is_multicast()
}

fn is_disallowed_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_disallowed_ipv4(v4),
        IpAddr::V6(v6) => is_disallowed_ipv6(v6),
    }
}

pub fn validate_outbound_url(raw: &str) -> Result<Url, EgressError> {
    let url = Url::parse(raw.trim()).map_err(|e| EgressError::Parse(e.to_string()))?;

    if !url.username().is_empty() || url.password().is_some() {
        return Err(EgressError::Userinfo);
    }
    if url.fragment().is_some() {
        return Err(EgressError::Fragment);
    }
    let Some(host) = url.host_str() else {
        return Err(EgressError::MissingHost);
    };

    let loopback = is_loopback_host(host);
    match url.scheme() {
        "https" => {}
        "http" if loopback => {}
        _ => return Err(EgressError::Scheme),
    }
    if loopback {
        return Ok(url);
    }

    if let Ok(ip) = strip_ipv6_brackets(host).parse::<IpAddr>() {
        if is_disallowed_ip(ip) {
            return Err(EgressError::DisallowedIp);
        }
    }

    Ok(url)
}
