use async_trait::async_trait;
use registry_login::credential::Credential;
use registry_login::error::{FailureKind, RegistryError, Result};
use registry_login::login::{CredentialSource, LoginFlow, LoginRequest, LoginState, logout};
use registry_login::logging::Logger;
use registry_login::registry::{Endpoint, PingTransport, RetryPolicy, Scheme, TransportFactory};
use registry_login::store::{MemoryStore, SecureStore};
use registry_login::trust::TRUSTED_PLUGINS;
use std::collections::VecDeque;
use std::future::pending;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Hands out transports that replay a shared script of statuses
#[derive(Default)]
struct ScriptedRegistry {
    statuses: Arc<Mutex<VecDeque<u16>>>,
    pings: Arc<AtomicU32>,
    connections: Mutex<Vec<(Endpoint, Credential)>>,
}

impl ScriptedRegistry {
    fn new(statuses: &[u16]) -> Self {
        Self {
            statuses: Arc::new(Mutex::new(statuses.iter().copied().collect())),
            ..Default::default()
        }
    }

    fn pings(&self) -> u32 {
        self.pings.load(Ordering::SeqCst)
    }

    fn connections(&self) -> Vec<(Endpoint, Credential)> {
        self.connections.lock().unwrap().clone()
    }
}

struct ScriptedTransport {
    statuses: Arc<Mutex<VecDeque<u16>>>,
    pings: Arc<AtomicU32>,
}

#[async_trait]
impl PingTransport for ScriptedTransport {
    async fn ping_once(&self) -> Result<u16> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        let status = self.statuses.lock().unwrap().pop_front();
        status.ok_or_else(|| RegistryError::Network("script exhausted".to_string()))
    }
}

impl TransportFactory for ScriptedRegistry {
    fn connect(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
    ) -> Result<Box<dyn PingTransport>> {
        self.connections
            .lock()
            .unwrap()
            .push((endpoint.clone(), credential.clone()));
        Ok(Box::new(ScriptedTransport {
            statuses: self.statuses.clone(),
            pings: self.pings.clone(),
        }))
    }
}

/// Stdin holds the password; prompts must not be reached
struct PipedStdin(&'static str);

impl CredentialSource for PipedStdin {
    fn prompt_username(&mut self, domain: &str) -> Result<String> {
        panic!("unexpected username prompt for {}", domain)
    }

    fn prompt_password(&mut self) -> Result<String> {
        panic!("unexpected password prompt")
    }

    fn read_password_stdin(&mut self) -> Result<String> {
        Ok(self.0.to_string())
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(10, Duration::from_millis(1))
}

fn install_plugin(root: &Path, relative: &str) -> PathBuf {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"plugin").unwrap();
    path
}

fn alice_request(server: &str) -> LoginRequest {
    LoginRequest::new(server)
        .with_username("alice")
        .with_password_stdin(true)
}

#[tokio::test]
async fn test_successful_login_persists_credentials() {
    let install_root = tempfile::tempdir().unwrap();
    let image_store = install_plugin(install_root.path(), TRUSTED_PLUGINS[0]);

    let registry = ScriptedRegistry::new(&[200]);
    let store = MemoryStore::new();
    let mut flow = LoginFlow::new(&registry, &store, install_root.path())
        .with_retry_policy(fast_policy())
        .with_output(Logger::silent());

    let report = flow
        .run(
            &alice_request("registry.example.com"),
            &mut PipedStdin("secret\n"),
            pending(),
        )
        .await
        .unwrap();

    assert_eq!(flow.state(), LoginState::Done);
    assert_eq!(report.domain, "registry.example.com");
    assert_eq!(report.attempts, 1);
    assert_eq!(report.trusted_paths, vec![image_store.clone()]);

    let entry = store.get("registry.example.com").await.unwrap().unwrap();
    assert_eq!(entry.username, "alice");
    assert_eq!(entry.password, "secret");
    assert_eq!(entry.trusted_paths, vec![image_store]);

    let connections = registry.connections();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].0.scheme, Scheme::Secure);
    assert_eq!(connections[0].1.password, "secret");
}

#[tokio::test]
async fn test_rejected_credentials_leave_store_untouched() {
    let install_root = tempfile::tempdir().unwrap();
    let registry = ScriptedRegistry::new(&[401]);
    let store = MemoryStore::new();
    store
        .save("registry.example.com", "alice", "previous", &[])
        .await
        .unwrap();

    let mut flow = LoginFlow::new(&registry, &store, install_root.path())
        .with_retry_policy(fast_policy());

    let err = flow
        .run(
            &alice_request("registry.example.com"),
            &mut PipedStdin("wrong\n"),
            pending(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Auth { status: 401, .. }));
    assert_eq!(flow.state(), LoginState::Failed(FailureKind::Auth));
    assert_eq!(registry.pings(), 1);
    assert_eq!(store.save_calls(), 1);

    let entry = store.get("registry.example.com").await.unwrap().unwrap();
    assert_eq!(entry.password, "previous");
}

#[tokio::test]
async fn test_unexpected_status_is_not_reported_as_bad_credentials() {
    let install_root = tempfile::tempdir().unwrap();
    let registry = ScriptedRegistry::new(&[302]);
    let store = MemoryStore::new();
    let mut flow = LoginFlow::new(&registry, &store, install_root.path())
        .with_retry_policy(fast_policy());

    let err = flow
        .run(&alice_request("ghcr.io"), &mut PipedStdin("token"), pending())
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::UnexpectedStatus { status: 302, .. }));
    assert_eq!(flow.state(), LoginState::Failed(FailureKind::Protocol));
    assert_eq!(registry.pings(), 1);
    assert_eq!(store.save_calls(), 0);
}

#[tokio::test]
async fn test_transient_failures_then_success() {
    let install_root = tempfile::tempdir().unwrap();
    let registry = ScriptedRegistry::new(&[503, 500, 200]);
    let store = MemoryStore::new();
    let mut flow = LoginFlow::new(&registry, &store, install_root.path())
        .with_retry_policy(fast_policy());

    let report = flow
        .run(&alice_request("ghcr.io"), &mut PipedStdin("token"), pending())
        .await
        .unwrap();

    assert_eq!(report.attempts, 3);
    assert_eq!(registry.pings(), 3);
    assert!(store.get("ghcr.io").await.unwrap().is_some());
}

#[tokio::test]
async fn test_exhausted_retries_do_not_persist() {
    let install_root = tempfile::tempdir().unwrap();
    let registry = ScriptedRegistry::new(&[500; 10]);
    let store = MemoryStore::new();
    let mut flow = LoginFlow::new(&registry, &store, install_root.path())
        .with_retry_policy(fast_policy());

    let err = flow
        .run(&alice_request("ghcr.io"), &mut PipedStdin("token"), pending())
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::RetriesExhausted { attempts: 10, .. }));
    assert_eq!(flow.state(), LoginState::Failed(FailureKind::Transient));
    assert_eq!(registry.pings(), 10);
    assert_eq!(store.save_calls(), 0);
}

#[tokio::test]
async fn test_store_failure_is_reported_distinctly() {
    let install_root = tempfile::tempdir().unwrap();
    let registry = ScriptedRegistry::new(&[200]);
    let store = MemoryStore::new();
    store.fail_next_save();

    let mut flow = LoginFlow::new(&registry, &store, install_root.path())
        .with_retry_policy(fast_policy());

    let err = flow
        .run(&alice_request("ghcr.io"), &mut PipedStdin("token"), pending())
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Store(_)));
    assert_eq!(flow.state(), LoginState::Failed(FailureKind::Store));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_cancellation_before_probe_saves_nothing() {
    let install_root = tempfile::tempdir().unwrap();
    let registry = ScriptedRegistry::new(&[200]);
    let store = MemoryStore::new();
    let mut flow = LoginFlow::new(&registry, &store, install_root.path());

    let err = flow
        .run(&alice_request("ghcr.io"), &mut PipedStdin("token"), async {})
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Cancelled));
    assert_eq!(flow.state(), LoginState::Failed(FailureKind::Cancelled));
    assert_eq!(registry.pings(), 0);
    assert_eq!(store.save_calls(), 0);
}

#[tokio::test]
async fn test_cancellation_during_retries() {
    let install_root = tempfile::tempdir().unwrap();
    let registry = ScriptedRegistry::new(&[500; 10]);
    let store = MemoryStore::new();
    let mut flow = LoginFlow::new(&registry, &store, install_root.path())
        .with_retry_policy(RetryPolicy::new(10, Duration::from_secs(60)));

    let err = flow
        .run(
            &alice_request("ghcr.io"),
            &mut PipedStdin("token"),
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Cancelled));
    assert_eq!(registry.pings(), 1);
    assert_eq!(store.save_calls(), 0);
}

#[tokio::test]
async fn test_invalid_server_fails_before_network() {
    let install_root = tempfile::tempdir().unwrap();
    let registry = ScriptedRegistry::new(&[200]);
    let store = MemoryStore::new();
    let mut flow = LoginFlow::new(&registry, &store, install_root.path());

    let err = flow
        .run(&alice_request("https://"), &mut PipedStdin("token"), pending())
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::InvalidArgument(_)));
    assert_eq!(flow.state(), LoginState::Failed(FailureKind::InvalidArgument));
    assert!(registry.connections().is_empty());
}

#[tokio::test]
async fn test_local_registry_uses_plain_http() {
    let install_root = tempfile::tempdir().unwrap();
    let registry = ScriptedRegistry::new(&[200]);
    let store = MemoryStore::new();
    let mut flow = LoginFlow::new(&registry, &store, install_root.path());

    let report = flow
        .run(
            &alice_request("http://localhost:5000/"),
            &mut PipedStdin("token\n"),
            pending(),
        )
        .await
        .unwrap();

    assert_eq!(report.domain, "localhost:5000");
    assert_eq!(report.endpoint.base_url(), "http://localhost:5000");
    assert!(store.get("localhost:5000").await.unwrap().is_some());
}

#[tokio::test]
async fn test_flow_is_one_shot() {
    let install_root = tempfile::tempdir().unwrap();
    let registry = ScriptedRegistry::new(&[200, 200]);
    let store = MemoryStore::new();
    let mut flow = LoginFlow::new(&registry, &store, install_root.path());

    flow.run(&alice_request("ghcr.io"), &mut PipedStdin("token"), pending())
        .await
        .unwrap();
    let err = flow
        .run(&alice_request("ghcr.io"), &mut PipedStdin("token"), pending())
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::InvalidArgument(_)));
    assert_eq!(flow.state(), LoginState::Done);
    assert_eq!(registry.pings(), 1);
}

#[tokio::test]
async fn test_relogin_replaces_acl() {
    let install_root = tempfile::tempdir().unwrap();
    let builder = install_plugin(install_root.path(), TRUSTED_PLUGINS[1]);
    let store = MemoryStore::new();

    let registry = ScriptedRegistry::new(&[200]);
    LoginFlow::new(&registry, &store, install_root.path())
        .run(&alice_request("ghcr.io"), &mut PipedStdin("token"), pending())
        .await
        .unwrap();
    assert_eq!(
        store.get("ghcr.io").await.unwrap().unwrap().trusted_paths,
        vec![builder.clone()]
    );

    std::fs::remove_file(&builder).unwrap();
    let registry = ScriptedRegistry::new(&[200]);
    LoginFlow::new(&registry, &store, install_root.path())
        .run(&alice_request("ghcr.io"), &mut PipedStdin("token"), pending())
        .await
        .unwrap();
    assert!(
        store
            .get("ghcr.io")
            .await
            .unwrap()
            .unwrap()
            .trusted_paths
            .is_empty()
    );
}

#[tokio::test]
async fn test_logout_removes_entry() {
    let store = MemoryStore::new();
    store
        .save("registry-1.docker.io", "alice", "pw", &[])
        .await
        .unwrap();

    let report = logout("docker.io", &store, &Logger::silent()).await.unwrap();
    assert_eq!(report.domain, "registry-1.docker.io");
    assert!(report.removed);

    let report = logout("docker.io", &store, &Logger::silent()).await.unwrap();
    assert!(!report.removed);
}
