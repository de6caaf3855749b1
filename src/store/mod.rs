//! Secure credential persistence
//!
//! A [`SecureStore`] keeps one entry per registry domain: the username,
//! password and the ACL of binaries trusted to read it. Saving replaces the
//! previous entry for the domain as a whole or leaves it untouched.

pub mod file;
pub mod keychain;
pub mod memory;

use crate::error::StoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub use file::FileStore;
pub use keychain::KeychainStore;
pub use memory::MemoryStore;

/// Persisted unit, keyed by domain
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub domain: String,
    pub username: String,
    pub password: String,
    pub trusted_paths: Vec<PathBuf>,
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredential")
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("trusted_paths", &self.trusted_paths)
            .finish()
    }
}

#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store or replace the entry for `domain`. All-or-nothing.
    async fn save(
        &self,
        domain: &str,
        username: &str,
        password: &str,
        trusted_paths: &[PathBuf],
    ) -> StoreResult<()>;

    async fn get(&self, domain: &str) -> StoreResult<Option<StoredCredential>>;

    /// Remove the entry for `domain`; `false` if there was none
    async fn delete(&self, domain: &str) -> StoreResult<bool>;
}

/// Which store the CLI persists to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Platform keychain
    #[default]
    Keychain,
    /// JSON credentials file
    File,
    /// In-process only; verifies credentials without keeping them
    Memory,
}

pub fn open_store(
    backend: StoreBackend,
    keychain_id: &str,
    credentials_file: &Path,
) -> Box<dyn SecureStore> {
    match backend {
        StoreBackend::Keychain => Box::new(KeychainStore::new(keychain_id)),
        StoreBackend::File => Box::new(FileStore::new(credentials_file)),
        StoreBackend::Memory => Box::new(MemoryStore::new()),
    }
}
