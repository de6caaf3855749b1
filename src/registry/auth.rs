//! Authentication challenge handling for Docker Registry v2

use crate::credential::Credential;
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

/// Parsed `WWW-Authenticate` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChallenge {
    Bearer {
        realm: String,
        service: Option<String>,
        scope: Option<String>,
    },
    Basic {
        realm: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
    expires_in: Option<u64>,
}

/// Result of asking the token service for a bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenGrant {
    Granted(String),
    /// Token service refused; carries its HTTP status
    Denied(u16),
}

impl AuthChallenge {
    /// Parse `Bearer realm="...",service="...",scope="..."` or `Basic realm="..."`
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (kind, params_str) = header.split_once(' ').unwrap_or((header, ""));
        let params = parse_params(params_str);

        if kind.eq_ignore_ascii_case("bearer") {
            let realm = params.get("realm")?.clone();
            Some(AuthChallenge::Bearer {
                realm,
                service: params.get("service").cloned(),
                scope: params.get("scope").cloned(),
            })
        } else if kind.eq_ignore_ascii_case("basic") {
            Some(AuthChallenge::Basic {
                realm: params.get("realm").cloned(),
            })
        } else {
            None
        }
    }
}

// Quote-aware: scopes like "repository:a/b:pull,push" contain commas
fn parse_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if *c == ',' || c.is_whitespace()) {
            chars.next();
        }

        let key: String = chars
            .by_ref()
            .take_while(|c| *c != '=')
            .collect::<String>()
            .trim()
            .to_ascii_lowercase();
        if key.is_empty() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => value.push(c),
                }
            }
        } else {
            while let Some(c) = chars.peek() {
                if *c == ',' {
                    break;
                }
                value.push(*c);
                chars.next();
            }
            value = value.trim().to_string();
        }

        params.insert(key, value);
    }

    params
}

// A bad realm is the registry's fault and will not fix itself on retry
fn parse_realm(realm: &str) -> Result<Url> {
    let invalid = |reason: String| RegistryError::UnexpectedStatus {
        status: 401,
        message: format!("Bearer challenge has an invalid realm '{}': {}", realm, reason),
    };

    let url = Url::parse(realm).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        scheme => Err(invalid(format!("unsupported scheme '{}'", scheme))),
    }
}

/// Exchange basic credentials for a bearer token at the challenge realm
pub async fn request_token(
    client: &Client,
    realm: &str,
    service: Option<&str>,
    scope: Option<&str>,
    credential: &Credential,
    output: &Logger,
) -> Result<TokenGrant> {
    let mut query: Vec<(&str, &str)> = Vec::new();
    if let Some(service) = service {
        query.push(("service", service));
    }
    if let Some(scope) = scope {
        query.push(("scope", scope));
    }

    let realm_url = parse_realm(realm)?;
    output.detail(&format!("Requesting token from: {}", realm_url));

    let response = client
        .get(realm_url)
        .query(&query)
        .basic_auth(&credential.username, Some(&credential.password))
        .send()
        .await
        .map_err(|e| RegistryError::Network(format!("Failed to get auth token: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        output.detail(&format!("Token request failed with status {}", status));
        return Ok(TokenGrant::Denied(status.as_u16()));
    }

    let token_response: TokenResponse =
        response
            .json()
            .await
            .map_err(|e| RegistryError::UnexpectedStatus {
                status: status.as_u16(),
                message: format!("Failed to parse token response: {}", e),
            })?;

    if let Some(expires_in) = token_response.expires_in {
        output.detail(&format!("Token expires in {} seconds", expires_in));
    }

    match token_response.token.or(token_response.access_token) {
        Some(token) if !token.is_empty() => {
            output.detail(&format!("Token obtained (length: {} chars)", token.len()));
            Ok(TokenGrant::Granted(token))
        }
        _ => Err(RegistryError::UnexpectedStatus {
            status: status.as_u16(),
            message: "Token response did not contain a token".to_string(),
        }),
    }
}
