//! Authenticated registry client used to verify login credentials

use crate::credential::Credential;
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::registry::auth::{AuthChallenge, TokenGrant, request_token};
use crate::registry::probe::{PingTransport, ProbeReport, probe};
use crate::registry::retry::RetryPolicy;
use crate::registry::scheme::Endpoint;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::WWW_AUTHENTICATE;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("registry-login/", env!("CARGO_PKG_VERSION"));

pub struct RegistryClientBuilder {
    endpoint: Endpoint,
    credential: Option<Credential>,
    retry_policy: RetryPolicy,
    timeout: Duration,
    output: Logger,
}

impl RegistryClientBuilder {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            credential: None,
            retry_policy: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            output: Logger::silent(),
        }
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_output(mut self, output: Logger) -> Self {
        self.output = output;
        self
    }

    pub fn build(self) -> Result<RegistryClient> {
        let credential = self.credential.ok_or_else(|| {
            RegistryError::InvalidArgument("Registry client requires a credential".to_string())
        })?;

        let client = Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RegistryError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(RegistryClient {
            client,
            endpoint: self.endpoint,
            credential,
            retry_policy: self.retry_policy,
            output: self.output,
        })
    }
}

pub struct RegistryClient {
    client: Client,
    endpoint: Endpoint,
    credential: Credential,
    retry_policy: RetryPolicy,
    output: Logger,
}

impl RegistryClient {
    pub fn builder(endpoint: Endpoint) -> RegistryClientBuilder {
        RegistryClientBuilder::new(endpoint)
    }

    /// Verify the credential, retrying under the client's policy
    pub async fn ping(&self) -> Result<ProbeReport> {
        probe(self, &self.retry_policy, &self.output).await
    }

    fn version_check_url(&self) -> String {
        format!("{}/v2/", self.endpoint.base_url())
    }

    async fn get_version_check(&self, auth: VersionCheckAuth<'_>) -> Result<reqwest::Response> {
        let url = self.version_check_url();
        let request = self.client.get(&url);
        let request = match auth {
            VersionCheckAuth::Anonymous => request,
            VersionCheckAuth::Basic => {
                request.basic_auth(&self.credential.username, Some(&self.credential.password))
            }
            VersionCheckAuth::Bearer(token) => request.bearer_auth(token),
        };

        request
            .send()
            .await
            .map_err(|e| RegistryError::Network(format!("Failed to reach {}: {}", url, e)))
    }
}

enum VersionCheckAuth<'a> {
    Anonymous,
    Basic,
    Bearer(&'a str),
}

#[async_trait]
impl PingTransport for RegistryClient {
    async fn ping_once(&self) -> Result<u16> {
        let response = self.get_version_check(VersionCheckAuth::Anonymous).await?;
        let status = response.status().as_u16();
        self.output
            .detail(&format!("{} answered {}", self.version_check_url(), status));

        if status != 401 {
            return Ok(status);
        }

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok())
            .and_then(AuthChallenge::parse);

        let response = match challenge {
            Some(AuthChallenge::Bearer {
                realm,
                service,
                scope,
            }) => {
                self.output.detail(&format!(
                    "Bearer challenge - realm: {}, service: {:?}",
                    realm, service
                ));
                let grant = request_token(
                    &self.client,
                    &realm,
                    service.as_deref(),
                    scope.as_deref(),
                    &self.credential,
                    &self.output,
                )
                .await?;

                match grant {
                    TokenGrant::Granted(token) => {
                        self.get_version_check(VersionCheckAuth::Bearer(&token))
                            .await?
                    }
                    TokenGrant::Denied(status) => return Ok(status),
                }
            }
            _ => {
                self.output.detail("Using basic authentication");
                self.get_version_check(VersionCheckAuth::Basic).await?
            }
        };

        Ok(response.status().as_u16())
    }
}

/// Builds transports for the login flow; swapped for fakes in tests
pub trait TransportFactory: Send + Sync {
    fn connect(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
    ) -> Result<Box<dyn PingTransport>>;
}

/// Produces real HTTP [`RegistryClient`]s
#[derive(Debug, Clone)]
pub struct HttpTransportFactory {
    timeout: Duration,
    output: Logger,
}

impl HttpTransportFactory {
    pub fn new(timeout: Duration, output: Logger) -> Self {
        Self { timeout, output }
    }
}

impl TransportFactory for HttpTransportFactory {
    fn connect(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
    ) -> Result<Box<dyn PingTransport>> {
        let client = RegistryClient::builder(endpoint.clone())
            .with_credential(credential.clone())
            .with_timeout(self.timeout)
            .with_output(self.output.clone())
            .build()?;
        Ok(Box::new(client))
    }
}
