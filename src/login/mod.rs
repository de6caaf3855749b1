//! Login orchestration
//!
//! One-shot, strictly forward state machine:
//!
//! ```text
//! Start -> InputsResolved -> EndpointResolved -> ProbeSucceeded -> Persisted -> Done
//! ```
//!
//! Any step may end in `Failed`. The credential reaches the store only after
//! the probe succeeds, and cancellation is only observed up to that point.

pub mod input;

use crate::error::{FailureKind, RegistryError, Result};
use crate::logging::Logger;
use crate::registry::client::TransportFactory;
use crate::registry::domain::resolve_domain;
use crate::registry::probe::probe;
use crate::registry::retry::RetryPolicy;
use crate::registry::scheme::{Endpoint, scheme_for};
use crate::store::SecureStore;
use crate::trust::compute_trusted_paths;
use std::future::Future;
use std::path::PathBuf;

pub use input::{CredentialSource, LoginRequest, TerminalSource, resolve_inputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Start,
    InputsResolved,
    EndpointResolved,
    ProbeSucceeded,
    Persisted,
    Done,
    Failed(FailureKind),
}

/// Summary of a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginReport {
    pub domain: String,
    pub username: String,
    pub endpoint: Endpoint,
    pub trusted_paths: Vec<PathBuf>,
    pub attempts: u32,
}

pub struct LoginFlow<'a> {
    transports: &'a dyn TransportFactory,
    store: &'a dyn SecureStore,
    install_root: PathBuf,
    policy: RetryPolicy,
    output: Logger,
    state: LoginState,
}

impl<'a> LoginFlow<'a> {
    pub fn new(
        transports: &'a dyn TransportFactory,
        store: &'a dyn SecureStore,
        install_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transports,
            store,
            install_root: install_root.into(),
            policy: RetryPolicy::default(),
            output: Logger::silent(),
            state: LoginState::Start,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_output(mut self, output: Logger) -> Self {
        self.output = output;
        self
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    /// Run the flow once. `cancel` resolving before the probe succeeds aborts
    /// the login with [`RegistryError::Cancelled`] and nothing is stored.
    pub async fn run<C>(
        &mut self,
        request: &LoginRequest,
        source: &mut dyn CredentialSource,
        cancel: C,
    ) -> Result<LoginReport>
    where
        C: Future<Output = ()>,
    {
        if self.state != LoginState::Start {
            return Err(RegistryError::InvalidArgument(
                "login flow has already run".to_string(),
            ));
        }

        match self.execute(request, source, cancel).await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.output.debug(&format!("Login failed in state {:?}", self.state));
                self.state = LoginState::Failed(e.kind());
                Err(e)
            }
        }
    }

    async fn execute<C>(
        &mut self,
        request: &LoginRequest,
        source: &mut dyn CredentialSource,
        cancel: C,
    ) -> Result<LoginReport>
    where
        C: Future<Output = ()>,
    {
        tokio::pin!(cancel);

        self.output.section("Registry login");
        let credential = resolve_inputs(request, source)?;
        self.advance(LoginState::InputsResolved);
        self.output
            .step(&format!("Logging in to {} as {}", credential.domain, credential.username));

        let endpoint = scheme_for(&credential.domain, request.scheme)?;
        self.advance(LoginState::EndpointResolved);
        self.output.step(&format!("Registry endpoint: {}", endpoint));
        if !endpoint.is_secure() {
            self.output
                .warning(&format!("Using insecure transport for {}", endpoint.authority()));
        }

        let transport = self.transports.connect(&endpoint, &credential)?;
        let report = tokio::select! {
            biased;
            _ = &mut cancel => return Err(RegistryError::Cancelled),
            result = probe(transport.as_ref(), &self.policy, &self.output) => result?,
        };
        drop(transport);
        self.advance(LoginState::ProbeSucceeded);
        self.output.step(&format!(
            "Credentials verified (status {}, {} attempt(s))",
            report.status, report.attempts
        ));

        let trusted_paths = compute_trusted_paths(&self.install_root)?;
        let trusted_display: Vec<String> = trusted_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        self.output.list("Trusted callers", &trusted_display);

        self.store
            .save(
                &credential.domain,
                &credential.username,
                &credential.password,
                &trusted_paths,
            )
            .await?;
        self.advance(LoginState::Persisted);

        let report = LoginReport {
            domain: credential.domain.clone(),
            username: credential.username.clone(),
            endpoint,
            trusted_paths,
            attempts: report.attempts,
        };
        drop(credential);
        self.advance(LoginState::Done);

        Ok(report)
    }

    fn advance(&mut self, next: LoginState) {
        debug_assert!(
            matches!(
                (self.state, next),
                (LoginState::Start, LoginState::InputsResolved)
                    | (LoginState::InputsResolved, LoginState::EndpointResolved)
                    | (LoginState::EndpointResolved, LoginState::ProbeSucceeded)
                    | (LoginState::ProbeSucceeded, LoginState::Persisted)
                    | (LoginState::Persisted, LoginState::Done)
            ),
            "illegal login transition {:?} -> {:?}",
            self.state,
            next
        );
        self.output.debug(&format!("{:?} -> {:?}", self.state, next));
        self.state = next;
    }
}

/// Result of removing stored credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutReport {
    pub domain: String,
    pub removed: bool,
}

pub async fn logout(server: &str, store: &dyn SecureStore, output: &Logger) -> Result<LogoutReport> {
    let domain = resolve_domain(server)?;
    output.step(&format!("Removing stored credentials for {}", domain));
    let removed = store.delete(&domain).await?;
    Ok(LogoutReport { domain, removed })
}
