//! Transport scheme resolution for registry endpoints

use crate::error::Result;
use crate::registry::domain::{join_host_port, parse_domain};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Scheme requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RequestScheme {
    /// HTTPS unless the host is local or private
    #[default]
    Auto,
    Http,
    Https,
}

/// Resolved transport mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Secure,
    Insecure,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Secure => "https",
            Scheme::Insecure => "http",
        }
    }
}

/// Where the registry lives and how to reach it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: Scheme,
    pub host: String,
    pub port: Option<u16>,
}

impl Endpoint {
    pub fn authority(&self) -> String {
        join_host_port(&self.host, self.port)
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme.as_str(), self.authority())
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == Scheme::Secure
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url())
    }
}

/// Build the endpoint for a resolved domain.
///
/// An explicit `http`/`https` request always wins. With `auto` the endpoint
/// is secure unless [`requires_insecure`] matches the host.
pub fn scheme_for(domain: &str, requested: RequestScheme) -> Result<Endpoint> {
    let (host, port) = parse_domain(domain)?;

    let scheme = match requested {
        RequestScheme::Http => Scheme::Insecure,
        RequestScheme::Https => Scheme::Secure,
        RequestScheme::Auto if requires_insecure(&host) => Scheme::Insecure,
        RequestScheme::Auto => Scheme::Secure,
    };

    Ok(Endpoint { scheme, host, port })
}

/// Hosts reached over plain HTTP when no scheme is requested:
/// `localhost` and `*.localhost`, `*.local`, `*.internal`, loopback,
/// RFC 1918 private and link-local IPv4, IPv6 unique-local and link-local.
pub fn requires_insecure(host: &str) -> bool {
    let bare = host.trim_start_matches('[').trim_end_matches(']');

    if let Ok(ip) = bare.parse::<IpAddr>() {
        return match ip {
            IpAddr::V4(v4) => is_local_v4(&v4),
            IpAddr::V6(v6) => is_local_v6(&v6),
        };
    }

    let host = bare.to_ascii_lowercase();
    host == "localhost"
        || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host.ends_with(".internal")
}

fn is_local_v4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local()
}

fn is_local_v6(ip: &Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_local_v4(&v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_scheme_table() {
        let cases = [
            ("registry.example.com", Scheme::Secure),
            ("ghcr.io", Scheme::Secure),
            ("8.8.8.8:5000", Scheme::Secure),
            ("172.32.0.1", Scheme::Secure),
            ("[2001:db8::1]", Scheme::Secure),
            ("localhost", Scheme::Insecure),
            ("localhost:5000", Scheme::Insecure),
            ("registry.localhost", Scheme::Insecure),
            ("builder.local:5000", Scheme::Insecure),
            ("registry.corp.internal", Scheme::Insecure),
            ("127.0.0.1:5000", Scheme::Insecure),
            ("127.1.2.3", Scheme::Insecure),
            ("10.1.2.3", Scheme::Insecure),
            ("172.16.0.10", Scheme::Insecure),
            ("192.168.64.1:5000", Scheme::Insecure),
            ("169.254.1.1", Scheme::Insecure),
            ("[::1]:5000", Scheme::Insecure),
            ("[fd00::10]", Scheme::Insecure),
            ("[fe80::1]", Scheme::Insecure),
        ];

        for (domain, expected) in cases {
            let endpoint = scheme_for(domain, RequestScheme::Auto).unwrap();
            assert_eq!(endpoint.scheme, expected, "domain {:?}", domain);
        }
    }

    #[test]
    fn test_explicit_scheme_wins() {
        let endpoint = scheme_for("localhost:5000", RequestScheme::Https).unwrap();
        assert_eq!(endpoint.base_url(), "https://localhost:5000");

        let endpoint = scheme_for("registry.example.com", RequestScheme::Http).unwrap();
        assert_eq!(endpoint.base_url(), "http://registry.example.com");
    }

    #[test]
    fn test_scheme_for_is_pure() {
        let first = scheme_for("192.168.1.10:5000", RequestScheme::Auto).unwrap();
        let _ = scheme_for("registry.example.com", RequestScheme::Https).unwrap();
        let second = scheme_for("192.168.1.10:5000", RequestScheme::Auto).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            Endpoint {
                scheme: Scheme::Insecure,
                host: "192.168.1.10".to_string(),
                port: Some(5000),
            }
        );
    }

    #[test]
    fn test_endpoint_display() {
        let endpoint = scheme_for("[::1]:5000", RequestScheme::Auto).unwrap();
        assert_eq!(endpoint.to_string(), "http://[::1]:5000");
        assert!(!endpoint.is_secure());
    }

    #[test]
    fn test_scheme_for_rejects_invalid_domain() {
        assert!(scheme_for("not a host", RequestScheme::Auto).is_err());
    }
}
