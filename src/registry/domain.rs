//! Registry server name normalization
//!
//! Turns whatever the user typed (`https://Registry.example.com:5000/v2/`,
//! `docker.io`, `[::1]:5000`) into the canonical `host[:port]` domain used as
//! the credential-store key.

use crate::error::{RegistryError, Result};
use url::Host;

/// Canonical Docker Hub registry host
pub const DOCKER_HUB_DOMAIN: &str = "registry-1.docker.io";

const DOCKER_HUB_ALIASES: &[&str] = &["docker.io", "index.docker.io"];

/// Normalize a raw server argument into `host[:port]`.
///
/// Strips scheme, userinfo, path, query and fragment, lowercases the host and
/// validates it. `resolve_domain(resolve_domain(x)?) == resolve_domain(x)`.
pub fn resolve_domain(server: &str) -> Result<String> {
    let (host, port) = parse_domain(server)?;

    let host = match port {
        None if DOCKER_HUB_ALIASES.contains(&host.as_str()) => DOCKER_HUB_DOMAIN.to_string(),
        _ => host,
    };

    Ok(join_host_port(&host, port))
}

/// Split a server name into its canonical host and optional port
pub(crate) fn parse_domain(server: &str) -> Result<(String, Option<u16>)> {
    let authority = extract_authority(server)?;
    let (host, port) = split_host_port(authority)?;
    Ok((canonical_host(&host)?, port))
}

pub(crate) fn join_host_port(host: &str, port: Option<u16>) -> String {
    match port {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn extract_authority(server: &str) -> Result<&str> {
    let trimmed = server.trim();

    let without_scheme = match trimmed.find("://") {
        Some(pos) => &trimmed[pos + 3..],
        None => trimmed,
    };

    let end = without_scheme
        .find(['/', '?', '#'])
        .unwrap_or(without_scheme.len());
    let authority = &without_scheme[..end];

    // user:pass@host is never part of the key
    let authority = match authority.rfind('@') {
        Some(pos) => &authority[pos + 1..],
        None => authority,
    };

    if authority.is_empty() {
        return Err(RegistryError::InvalidArgument(format!(
            "Invalid registry server '{}': missing host",
            server
        )));
    }

    Ok(authority)
}

fn split_host_port(authority: &str) -> Result<(String, Option<u16>)> {
    if authority.starts_with('[') {
        let end = authority.find(']').ok_or_else(|| {
            RegistryError::InvalidArgument(format!("Unterminated IPv6 address: {}", authority))
        })?;
        let host = &authority[..=end];
        let rest = &authority[end + 1..];
        return match rest.strip_prefix(':') {
            Some(port) => Ok((host.to_string(), Some(parse_port(port, authority)?))),
            None if rest.is_empty() => Ok((host.to_string(), None)),
            None => Err(RegistryError::InvalidArgument(format!(
                "Invalid registry server: {}",
                authority
            ))),
        };
    }

    match authority.matches(':').count() {
        0 => Ok((authority.to_string(), None)),
        1 => {
            let (host, port) = authority.split_once(':').unwrap_or((authority, ""));
            Ok((host.to_string(), Some(parse_port(port, authority)?)))
        }
        // Bare IPv6 literal without brackets
        _ => Ok((format!("[{}]", authority), None)),
    }
}

fn parse_port(port: &str, authority: &str) -> Result<u16> {
    match port.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(RegistryError::InvalidArgument(format!(
            "Invalid port '{}' in registry server '{}'",
            port, authority
        ))),
    }
}

fn canonical_host(host: &str) -> Result<String> {
    let lowered = host.to_ascii_lowercase();
    // Fully qualified form names the same registry
    let unrooted = match lowered.strip_suffix('.') {
        Some(name) if !name.is_empty() && !name.starts_with('[') => name,
        _ => lowered.as_str(),
    };
    let parsed = Host::parse(unrooted).map_err(|e| {
        RegistryError::InvalidArgument(format!("Invalid registry host '{}': {}", host, e))
    })?;

    Ok(match parsed {
        Host::Domain(domain) if domain.split('.').any(str::is_empty) => {
            return Err(RegistryError::InvalidArgument(format!(
                "Invalid registry host '{}': empty label",
                host
            )));
        }
        Host::Domain(domain) => domain,
        Host::Ipv4(ip) => ip.to_string(),
        Host::Ipv6(ip) => format!("[{}]", ip),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_domain_strips_scheme_and_path() {
        let cases = [
            ("registry.example.com", "registry.example.com"),
            ("https://registry.example.com", "registry.example.com"),
            ("https://registry.example.com/", "registry.example.com"),
            ("http://registry.example.com:5000/v2/", "registry.example.com:5000"),
            ("Registry.Example.COM", "registry.example.com"),
            ("  localhost:5000  ", "localhost:5000"),
            ("https://user:pw@ghcr.io/owner/repo", "ghcr.io"),
            ("registry.example.com/?x=1", "registry.example.com"),
            ("127.0.0.1:5000", "127.0.0.1:5000"),
            ("[::1]:5000", "[::1]:5000"),
            ("::1", "[::1]"),
            ("docker.io", DOCKER_HUB_DOMAIN),
            ("https://index.docker.io/v1/", DOCKER_HUB_DOMAIN),
        ];

        for (input, expected) in cases {
            assert_eq!(resolve_domain(input).unwrap(), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_resolve_domain_is_idempotent() {
        let inputs = [
            "https://Registry.example.com:443/",
            "docker.io",
            "registry-1.docker.io",
            "[fe80::1]:8080",
            "::1",
            "10.0.0.5",
            "http://localhost/",
        ];

        for input in inputs {
            let once = resolve_domain(input).unwrap();
            let twice = resolve_domain(&once).unwrap();
            assert_eq!(once, twice, "input {:?}", input);
            assert!(!once.contains("://"));
            assert!(!once.ends_with('/'));
        }
    }

    #[test]
    fn test_resolve_domain_rejects_garbage() {
        for input in ["", "   ", "https://", "host:port", "host:0", "host:70000", "bad host", "[::1"] {
            let err = resolve_domain(input).unwrap_err();
            assert!(
                matches!(err, RegistryError::InvalidArgument(_)),
                "input {:?} gave {:?}",
                input,
                err
            );
        }
    }

    #[test]
    fn test_trailing_dot_names_the_same_registry() {
        assert_eq!(resolve_domain("example.com.").unwrap(), "example.com");
        assert_eq!(resolve_domain("https://Example.com.:5000/v2/").unwrap(), "example.com:5000");
        assert_eq!(resolve_domain("docker.io.").unwrap(), DOCKER_HUB_DOMAIN);
        assert_eq!(
            resolve_domain("example.com.").unwrap(),
            resolve_domain(&resolve_domain("example.com.").unwrap()).unwrap()
        );
        assert!(resolve_domain(".").is_err());
        assert!(resolve_domain("example.com..").is_err());
    }

    #[test]
    fn test_docker_hub_alias_keeps_explicit_port() {
        assert_eq!(resolve_domain("docker.io:443").unwrap(), "docker.io:443");
    }
}
