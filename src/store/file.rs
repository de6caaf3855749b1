//! JSON credentials file store
//!
//! Layout mirrors the Docker `config.json` `auths` map:
//!
//! ```json
//! { "auths": { "registry.example.com": { "auth": "<base64 user:pass>", "trusted_paths": [] } } }
//! ```
//!
//! Every write goes to a uniquely named sibling file that is renamed over the
//! original, so readers see either the old file or the new one. Writers hold an
//! exclusive OS lock on `.<name>.lock` for the whole read-modify-rename, which
//! serializes separate handles and separate processes sharing the file.

use crate::error::{StoreError, StoreResult};
use crate::store::{SecureStore, StoredCredential};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    auths: BTreeMap<String, FileEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileEntry {
    auth: String,
    #[serde(default)]
    trusted_paths: Vec<PathBuf>,
}

impl FileEntry {
    fn encode(username: &str, password: &str, trusted_paths: &[PathBuf]) -> Self {
        Self {
            auth: STANDARD.encode(format!("{}:{}", username, password)),
            trusted_paths: trusted_paths.to_vec(),
        }
    }

    fn decode(&self, domain: &str) -> StoreResult<StoredCredential> {
        let raw = STANDARD
            .decode(&self.auth)
            .map_err(|e| StoreError::Serialization(format!("{}: {}", domain, e)))?;
        let raw = String::from_utf8(raw)
            .map_err(|e| StoreError::Serialization(format!("{}: {}", domain, e)))?;
        let (username, password) = raw.split_once(':').ok_or_else(|| {
            StoreError::Serialization(format!("{}: auth is not user:password", domain))
        })?;

        Ok(StoredCredential {
            domain: domain.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            trusted_paths: self.trusted_paths.clone(),
        })
    }
}

pub struct FileStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn read_all(path: &Path) -> StoreResult<CredentialsFile> {
        match fs::read_to_string(path) {
            Ok(json) if json.trim().is_empty() => Ok(CredentialsFile::default()),
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CredentialsFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(path: &Path, file: &CredentialsFile) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(file)?;

        let dir = Self::parent_dir(path);
        fs::create_dir_all(&dir)?;

        let tmp = dir.join(format!(".{}.{}.tmp", Self::file_name(path), Uuid::new_v4()));

        let result = Self::write_private(&tmp, &json).and_then(|_| fs::rename(&tmp, path));
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        Ok(result?)
    }

    fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        file.write_all(bytes)?;
        file.sync_all()
    }

    fn parent_dir(path: &Path) -> PathBuf {
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "credentials.json".to_string())
    }

    fn lock_path(path: &Path) -> PathBuf {
        Self::parent_dir(path).join(format!(".{}.lock", Self::file_name(path)))
    }

    /// Blocks until no other writer holds the lock. Released when the handle is dropped.
    fn lock_exclusive(path: &Path) -> StoreResult<File> {
        let lock_path = Self::lock_path(path);
        fs::create_dir_all(Self::parent_dir(path))?;

        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        FileExt::lock_exclusive(&lock)?;
        Ok(lock)
    }

    fn update<F>(path: &Path, change: F) -> StoreResult<bool>
    where
        F: FnOnce(&mut CredentialsFile) -> bool,
    {
        let _lock = Self::lock_exclusive(path)?;
        let mut file = Self::read_all(path)?;
        if !change(&mut file) {
            return Ok(false);
        }
        Self::write_all(path, &file)?;
        Ok(true)
    }
}

fn join_error(e: tokio::task::JoinError) -> StoreError {
    StoreError::Io(format!("Task join error: {}", e))
}

#[async_trait]
impl SecureStore for FileStore {
    async fn save(
        &self,
        domain: &str,
        username: &str,
        password: &str,
        trusted_paths: &[PathBuf],
    ) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let path = self.path.clone();
        let domain = domain.to_string();
        let entry = FileEntry::encode(username, password, trusted_paths);

        tokio::task::spawn_blocking(move || {
            Self::update(&path, |file| {
                file.auths.insert(domain, entry);
                true
            })
        })
        .await
        .map_err(join_error)??;
        Ok(())
    }

    async fn get(&self, domain: &str) -> StoreResult<Option<StoredCredential>> {
        let path = self.path.clone();
        let domain = domain.to_string();

        tokio::task::spawn_blocking(move || {
            let file = Self::read_all(&path)?;
            file.auths
                .get(&domain)
                .map(|entry| entry.decode(&domain))
                .transpose()
        })
        .await
        .map_err(join_error)?
    }

    async fn delete(&self, domain: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;

        let path = self.path.clone();
        let domain = domain.to_string();

        tokio::task::spawn_blocking(move || {
            Self::update(&path, |file| file.auths.remove(&domain).is_some())
        })
        .await
        .map_err(join_error)?
    }
}
