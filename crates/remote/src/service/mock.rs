//! In-memory remote service for testing.

use crate::error::{ErrorKind, Result};
use crate::models::{Container, Credentials, Descriptor, Handle, StoreOptions};
use crate::path::{SEPARATOR, validate_name};
use crate::service::{RemoteService, Session};
use async_trait::async_trait;
use exn::OptionExt;
use ferry_extract::models::Annotations;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Every request the mock has received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Authenticate,
    GetProject(String),
    StoreFolder { parent: String, name: String },
    StoreFile { parent: String, name: String, force_version: bool },
}
impl Call {
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::StoreFolder { .. } | Self::StoreFile { .. })
    }
}

/// A file as the mock last stored it.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub handle: Handle,
    pub annotations: Annotations,
    pub content: Vec<u8>,
}

#[derive(Default)]
struct State {
    projects: HashMap<String, Container>,
    containers: HashSet<String>,
    folders: HashMap<(String, String), Handle>,
    files: HashMap<(String, String), StoredFile>,
    failures: HashMap<String, usize>,
    denied: HashSet<String>,
    reject_auth: bool,
    calls: Vec<Call>,
    store_times: HashMap<String, Vec<Instant>>,
    sessions: usize,
}

/// In-memory remote service for testing.
///
/// Clones share state, so a test can keep one handle for inspection while the
/// code under test owns another. Failures can be scripted per entity name.
///
/// # Examples
///
/// ```ignore
/// use ferry_remote::{Credentials, Descriptor, MockService, RemoteService, StoreOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let service = MockService::default().with_project("syn1", "Study");
/// let mut session = service.authenticate(&Credentials::default()).await?;
/// let project = session.get_project("syn1").await?;
/// session.store(Descriptor::folder("01"), &project, StoreOptions::default()).await?;
/// assert_eq!(service.mutating_calls().await.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MockService {
    state: Arc<Mutex<State>>,
    latency: Option<Duration>,
}

impl MockService {
    /// Register a project that sessions can resolve.
    ///
    /// Panics if the identifier is not a valid name; bad test setup should
    /// not produce a passing test.
    pub fn with_project(self, id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        if validate_name(&id).is_err() {
            panic!("MockService::with_project: invalid project id {id:?}");
        }
        {
            let mut state = self.state.try_lock().unwrap_or_else(|_| panic!("MockService is in use"));
            state.containers.insert(id.clone());
            state.projects.insert(id.clone(), Container::new(id, name));
        }
        self
    }

    /// Fail the first `times` stores of any entity called `name` with a
    /// retryable network error.
    pub fn fail_store(self, name: impl Into<String>, times: usize) -> Self {
        self.configure(|state| {
            state.failures.insert(name.into(), times);
        })
    }

    /// Permanently refuse to store any entity called `name`.
    pub fn deny_store(self, name: impl Into<String>) -> Self {
        self.configure(|state| {
            state.denied.insert(name.into());
        })
    }

    /// Reject every authentication attempt.
    pub fn reject_auth(self) -> Self {
        self.configure(|state| state.reject_auth = true)
    }

    /// Sleep this long inside every store.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn configure(self, f: impl FnOnce(&mut State)) -> Self {
        {
            let mut state = self.state.try_lock().unwrap_or_else(|_| panic!("MockService is in use"));
            f(&mut state);
        }
        self
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.state.lock().await.calls.clone()
    }

    pub async fn mutating_calls(&self) -> Vec<Call> {
        self.state.lock().await.calls.iter().filter(|call| call.is_mutating()).cloned().collect()
    }

    /// When each store of an entity called `name` was attempted.
    pub async fn store_times(&self, name: &str) -> Vec<Instant> {
        self.state.lock().await.store_times.get(name).cloned().unwrap_or_default()
    }

    /// Number of sessions handed out.
    pub async fn sessions(&self) -> usize {
        self.state.lock().await.sessions
    }

    /// The folder called `name` under the container `parent`, if it exists.
    pub async fn folder(&self, parent: &str, name: &str) -> Option<Handle> {
        self.state.lock().await.folders.get(&(parent.to_string(), name.to_string())).cloned()
    }

    /// The file called `name` under the container `parent`, if it exists.
    pub async fn file(&self, parent: &str, name: &str) -> Option<StoredFile> {
        self.state.lock().await.files.get(&(parent.to_string(), name.to_string())).cloned()
    }

    /// Every stored file as `(parent id, name)`, sorted.
    pub async fn file_keys(&self) -> Vec<(String, String)> {
        let mut keys: Vec<_> = self.state.lock().await.files.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl RemoteService for MockService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Box<dyn Session>> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::Authenticate);
        if state.reject_auth {
            exn::bail!(ErrorKind::Authentication(credentials.username.clone()));
        }
        state.sessions += 1;
        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
            latency: self.latency,
        }))
    }
}

struct MockSession {
    state: Arc<Mutex<State>>,
    latency: Option<Duration>,
}

#[async_trait]
impl Session for MockSession {
    async fn get_project(&mut self, id: &str) -> Result<Container> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::GetProject(id.to_string()));
        state.projects.get(id).cloned().ok_or_raise(|| ErrorKind::NotFound(id.to_string()))
    }

    async fn store(&mut self, entity: Descriptor, parent: &Container, options: StoreOptions) -> Result<Handle> {
        let name = validate_name(entity.name())?.to_string();
        {
            let mut state = self.state.lock().await;
            state.calls.push(match &entity {
                Descriptor::Folder { .. } => Call::StoreFolder { parent: parent.id.clone(), name: name.clone() },
                Descriptor::File { .. } => Call::StoreFile {
                    parent: parent.id.clone(),
                    name: name.clone(),
                    force_version: options.force_version,
                },
            });
            state.store_times.entry(name.clone()).or_default().push(Instant::now());
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().await;
        if state.denied.contains(&name) {
            exn::bail!(ErrorKind::PermissionDenied(name));
        }
        if let Some(remaining) = state.failures.get_mut(&name)
            && *remaining > 0
        {
            *remaining -= 1;
            exn::bail!(ErrorKind::Network(format!("scripted failure storing {name:?}")));
        }
        if !state.containers.contains(&parent.id) {
            exn::bail!(ErrorKind::NotFound(parent.id.clone()));
        }

        let key = (parent.id.clone(), name.clone());
        let id = format!("{}{SEPARATOR}{name}", parent.id);
        match entity {
            Descriptor::Folder { .. } => {
                let handle = state.folders.entry(key).or_insert_with(|| Handle { id: id.clone(), name, version: 1 });
                let handle = handle.clone();
                state.containers.insert(id);
                Ok(handle)
            },
            Descriptor::File { path, annotations, .. } => {
                let content = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.display().to_string()),
                    _ => ErrorKind::Io(e),
                })?;
                let version = match state.files.get(&key) {
                    Some(previous) if !options.force_version && previous.content == content => {
                        return Ok(previous.handle.clone());
                    },
                    Some(previous) => previous.handle.version + 1,
                    None => 1,
                };
                let handle = Handle { id, name, version };
                state.files.insert(key, StoredFile { handle: handle.clone(), annotations, content });
                Ok(handle)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn session(service: &MockService) -> Box<dyn Session> {
        service.authenticate(&Credentials::default()).await.unwrap()
    }

    #[tokio::test]
    async fn test_unknown_project() {
        let service = MockService::default();
        let err = session(&service).await.get_project("syn9").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_folders_are_create_or_get() {
        let service = MockService::default().with_project("syn1", "Study");
        let mut session = session(&service).await;
        let project = session.get_project("syn1").await.unwrap();
        let a = session.store(Descriptor::folder("a"), &project, StoreOptions::default()).await.unwrap();
        let again = session.store(Descriptor::folder("a"), &project, StoreOptions::default()).await.unwrap();
        assert_eq!(a, again);
        assert_eq!(service.folder("syn1", "a").await, Some(a.clone()));
        let b = session.store(Descriptor::folder("b"), &a.into(), StoreOptions::default()).await.unwrap();
        assert_eq!(b.id, "syn1/a/b");
        assert_eq!(service.mutating_calls().await.len(), 3);
    }

    #[tokio::test]
    async fn test_placeholder_parent_is_not_found() {
        let service = MockService::default().with_project("syn1", "Study");
        let mut session = session(&service).await;
        let err = session
            .store(Descriptor::folder("a"), &Container::placeholder("x"), StoreOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let service = MockService::default().with_project("syn1", "Study").fail_store("a", 2).deny_store("b");
        let mut session = session(&service).await;
        let project = session.get_project("syn1").await.unwrap();
        for _ in 0..2 {
            let err = session.store(Descriptor::folder("a"), &project, StoreOptions::default()).await.unwrap_err();
            assert!(err.is_retryable());
        }
        assert!(session.store(Descriptor::folder("a"), &project, StoreOptions::default()).await.is_ok());
        assert_eq!(service.store_times("a").await.len(), 3);

        let err = session.store(Descriptor::folder("b"), &project, StoreOptions::default()).await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_file_versions_follow_content() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("x.dcm");
        std::fs::write(&source, b"one").unwrap();
        let service = MockService::default().with_project("syn1", "Study");
        let mut session = session(&service).await;
        let project = session.get_project("syn1").await.unwrap();
        let descriptor = || Descriptor::File {
            path: source.clone(),
            name: "x.dcm".into(),
            annotations: Annotations::new(),
        };
        assert_eq!(session.store(descriptor(), &project, StoreOptions::default()).await.unwrap().version, 1);
        assert_eq!(session.store(descriptor(), &project, StoreOptions::default()).await.unwrap().version, 1);
        assert_eq!(session.store(descriptor(), &project, StoreOptions::FORCE).await.unwrap().version, 2);
        assert_eq!(service.file("syn1", "x.dcm").await.unwrap().content, b"one");
    }

    #[tokio::test]
    async fn test_rejected_auth() {
        let service = MockService::default().reject_auth();
        let err = service.authenticate(&Credentials::default()).await.err().unwrap();
        assert!(matches!(&*err, ErrorKind::Authentication(None)));
        assert_eq!(service.sessions().await, 0);
    }
}
