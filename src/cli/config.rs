//! Configuration management module
//!
//! Precedence, lowest first: built-in defaults, JSON config file,
//! `REGISTRY_LOGIN_*` environment variables, command-line flags.

use crate::cli::args::Args;
use crate::error::{RegistryError, Result};
use crate::registry::client::DEFAULT_TIMEOUT;
use crate::registry::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_INTERVAL, RetryPolicy};
use crate::store::StoreBackend;
use crate::store::keychain::DEFAULT_KEYCHAIN_ID;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    pub store: StoreBackend,
    pub keychain_id: String,
    pub credentials_file: PathBuf,
    /// Defaults to the prefix of the running executable
    pub install_root: Option<PathBuf>,
    pub retry_attempts: u32,
    pub retry_interval_ms: u64,
    pub timeout: u64,
    pub verbose: bool,
    pub quiet: bool,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::default(),
            keychain_id: DEFAULT_KEYCHAIN_ID.to_string(),
            credentials_file: default_credentials_file(),
            install_root: None,
            retry_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL.as_millis() as u64,
            timeout: DEFAULT_TIMEOUT.as_secs(),
            verbose: false,
            quiet: false,
        }
    }
}

/// `~/.config/registry-login/credentials.json`
pub fn default_credentials_file() -> PathBuf {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    home.join(".config")
        .join("registry-login")
        .join("credentials.json")
}

impl LoginConfig {
    /// Build the effective configuration for a command line
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::default().merge(&Self::load(path)?),
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry_attempts == 0 {
            return Err(RegistryError::Config(
                "retry_attempts must be greater than 0".to_string(),
            ));
        }
        if self.timeout == 0 {
            return Err(RegistryError::Config(
                "timeout must be greater than 0".to_string(),
            ));
        }
        if self.keychain_id.trim().is_empty() {
            return Err(RegistryError::Config(
                "keychain_id cannot be empty".to_string(),
            ));
        }
        if self.store == StoreBackend::File && self.credentials_file.as_os_str().is_empty() {
            return Err(RegistryError::Config(
                "credentials_file is required for the file store".to_string(),
            ));
        }
        Ok(())
    }

    /// Load a JSON config file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RegistryError::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            RegistryError::Config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("REGISTRY_LOGIN_STORE") {
            self.store = <StoreBackend as ValueEnum>::from_str(&val, true)
                .map_err(|_| invalid_env("REGISTRY_LOGIN_STORE", &val))?;
        }
        if let Some(val) = lookup("REGISTRY_LOGIN_KEYCHAIN_ID") {
            self.keychain_id = val;
        }
        if let Some(val) = lookup("REGISTRY_LOGIN_CREDENTIALS_FILE") {
            self.credentials_file = PathBuf::from(val);
        }
        if let Some(val) = lookup("REGISTRY_LOGIN_INSTALL_ROOT") {
            self.install_root = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup("REGISTRY_LOGIN_RETRY") {
            self.retry_attempts = parse_env("REGISTRY_LOGIN_RETRY", &val)?;
        }
        if let Some(val) = lookup("REGISTRY_LOGIN_RETRY_INTERVAL_MS") {
            self.retry_interval_ms = parse_env("REGISTRY_LOGIN_RETRY_INTERVAL_MS", &val)?;
        }
        if let Some(val) = lookup("REGISTRY_LOGIN_TIMEOUT") {
            self.timeout = parse_env("REGISTRY_LOGIN_TIMEOUT", &val)?;
        }
        if let Some(val) = lookup("REGISTRY_LOGIN_VERBOSE") {
            self.verbose = match val.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => return Err(invalid_env("REGISTRY_LOGIN_VERBOSE", &val)),
            };
        }
        Ok(())
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(store) = args.store {
            self.store = store;
        }
        if let Some(keychain_id) = &args.keychain_id {
            self.keychain_id = keychain_id.clone();
        }
        if let Some(credentials_file) = &args.credentials_file {
            self.credentials_file = credentials_file.clone();
        }
        if let Some(install_root) = &args.install_root {
            self.install_root = Some(install_root.clone());
        }
        if let Some(retry) = args.retry {
            self.retry_attempts = retry;
        }
        if let Some(interval) = args.retry_interval_ms {
            self.retry_interval_ms = interval;
        }
        if let Some(timeout) = args.timeout {
            self.timeout = timeout;
        }
        if args.verbose {
            self.verbose = true;
            self.quiet = false;
        }
        if args.quiet {
            self.quiet = true;
            self.verbose = false;
        }
    }

    /// Merge with another config, preferring non-default values
    pub fn merge(mut self, other: &LoginConfig) -> Self {
        let default = LoginConfig::default();

        if other.store != default.store {
            self.store = other.store;
        }
        if other.keychain_id != default.keychain_id {
            self.keychain_id = other.keychain_id.clone();
        }
        if other.credentials_file != default.credentials_file {
            self.credentials_file = other.credentials_file.clone();
        }
        if other.install_root.is_some() {
            self.install_root = other.install_root.clone();
        }
        if other.retry_attempts != default.retry_attempts {
            self.retry_attempts = other.retry_attempts;
        }
        if other.retry_interval_ms != default.retry_interval_ms {
            self.retry_interval_ms = other.retry_interval_ms;
        }
        if other.timeout != default.timeout {
            self.timeout = other.timeout;
        }
        if other.verbose != default.verbose {
            self.verbose = other.verbose;
        }
        if other.quiet != default.quiet {
            self.quiet = other.quiet;
        }

        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_interval_ms),
        )
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

fn invalid_env(key: &str, value: &str) -> RegistryError {
    RegistryError::Config(format!("Invalid value '{}' for {}", value, key))
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| invalid_env(key, value))
}
