//! Retry-wrapped connectivity probe
//!
//! Proves that a credential authenticates against a registry without touching
//! any stored state. Server-side failures are retried under the [`RetryPolicy`];
//! client errors such as 401 end the probe on the spot, since repeating a bad
//! password only risks an account lockout.

use crate::error::handlers::HttpErrorHandler;
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::registry::retry::RetryPolicy;
use async_trait::async_trait;
use tokio::time::sleep;

/// Something that can issue one authenticated ping against a registry
#[async_trait]
pub trait PingTransport: Send + Sync {
    /// Perform a single ping and return the HTTP status.
    ///
    /// `Err` means no status was obtained at all (connection refused, TLS
    /// failure, timeout).
    async fn ping_once(&self) -> Result<u16>;
}

/// Outcome of a successful probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    pub attempts: u32,
    pub status: u16,
}

pub async fn probe(
    transport: &dyn PingTransport,
    policy: &RetryPolicy,
    output: &Logger,
) -> Result<ProbeReport> {
    let max_attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        output.detail(&format!("Ping attempt {} of {}", attempt, max_attempts));

        let failure = match transport.ping_once().await {
            Ok(status) if (200..300).contains(&status) => {
                output.detail(&format!("Registry answered {} on attempt {}", status, attempt));
                return Ok(ProbeReport {
                    attempts: attempt,
                    status,
                });
            }
            Ok(status) if policy.should_retry(status) => {
                HttpErrorHandler::handle_server_error(status, "")
            }
            Ok(status) => return Err(HttpErrorHandler::classify(status, "")),
            Err(e) if e.is_transient() => e,
            Err(e) => return Err(e),
        };

        if attempt >= max_attempts {
            output.detail(&format!(
                "Giving up after {} attempts. Last error: {}",
                attempt, failure
            ));
            return Err(RegistryError::RetriesExhausted {
                attempts: attempt,
                last: Box::new(failure),
            });
        }

        output.verbose(&format!(
            "Attempt {} failed: {}. Retrying in {}",
            attempt,
            failure,
            output.format_duration(policy.interval)
        ));
        sleep(policy.interval).await;
    }
}
