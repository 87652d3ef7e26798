//! Filesystem-backed remote service.
//!
//! Mirrors the remote hierarchy onto a local directory tree: every project is
//! a directory directly under the root, folders are directories, and files are
//! copied in alongside a hidden JSON sidecar that records their version,
//! content hash, and annotations. Container identifiers are paths relative to
//! the root.

use crate::error::{ErrorKind, Result};
use crate::models::{Container, Credentials, Descriptor, Handle, StoreOptions};
use crate::path::{SEPARATOR, validate_name};
use crate::service::{RemoteService, Session};
use async_trait::async_trait;
use exn::ResultExt;
use ferry_extract::models::Annotations;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

const SIDECAR_SUFFIX: &str = ".ferry.json";

#[derive(Serialize)]
struct Sidecar<'a> {
    version: u64,
    content_hash: String,
    annotations: &'a Annotations,
}

#[derive(Deserialize)]
struct SidecarHead {
    version: u64,
    content_hash: String,
}

/// A remote service rooted in a local directory.
///
/// # Examples
///
/// ```no_run
/// use ferry_remote::LocalService;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = LocalService::new("local", "/srv/ferry")?
///     .with_login("alice", "correct horse battery staple");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalService {
    name: String,
    root: PathBuf,
    login: Option<(String, String)>,
}
impl LocalService {
    /// Create a service rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists and is not a
    /// directory. A missing root is created.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::ServiceError(format!("root `{}` is not absolute", root.display())));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::ServiceError(format!("root `{}` is not a directory", root.display())));
            }
        } else {
            // Blocking, but only ever at start-up.
            std::fs::create_dir_all(&root).map_err(|e| map_io_error(e, &root.display().to_string()))?;
        }
        Ok(Self { name: name.into(), root, login: None })
    }

    /// Require these credentials on [`authenticate`](RemoteService::authenticate).
    ///
    /// Without a login, any credentials are accepted.
    pub fn with_login(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.login = Some((username.into(), password.into()));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl RemoteService for LocalService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Box<dyn Session>> {
        if let Some((username, password)) = &self.login {
            let accepted = credentials.username.as_deref() == Some(username.as_str())
                && credentials.password.as_deref() == Some(password.as_str());
            if !accepted {
                exn::bail!(ErrorKind::Authentication(credentials.username.clone()));
            }
        }
        tracing::debug!(service = %self.name, user = ?credentials.username, "Session opened");
        Ok(Box::new(LocalSession { root: self.root.clone() }))
    }
}

struct LocalSession {
    root: PathBuf,
}
impl LocalSession {
    /// Map a container identifier onto its directory.
    fn locate(&self, id: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for segment in id.split(SEPARATOR) {
            path.push(validate_name(segment)?);
        }
        Ok(path)
    }

    async fn parent_dir(&self, parent: &Container) -> Result<PathBuf> {
        let dir = self.locate(&parent.id)?;
        if !fs::metadata(&dir).await.map_err(|e| map_io_error(e, &parent.id))?.is_dir() {
            exn::bail!(ErrorKind::NotFound(parent.id.clone()));
        }
        Ok(dir)
    }

    async fn store_folder(&self, name: &str, parent: &Container) -> Result<Handle> {
        let dir = self.parent_dir(parent).await?.join(name);
        let id = child_id(parent, name);
        match fs::create_dir(&dir).await {
            Ok(()) => tracing::debug!(id = %id, "Folder created"),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let metadata = fs::metadata(&dir).await.map_err(|e| map_io_error(e, &id))?;
                if !metadata.is_dir() {
                    exn::bail!(ErrorKind::ServiceError(format!("`{id}` exists and is not a folder")));
                }
            },
            Err(e) => return Err(map_io_error(e, &id).into()),
        }
        Ok(Handle { id, name: name.to_string(), version: 1 })
    }

    async fn store_file(
        &self,
        source: &Path,
        name: &str,
        annotations: &Annotations,
        parent: &Container,
        options: StoreOptions,
    ) -> Result<Handle> {
        let parent_dir = self.parent_dir(parent).await?;
        let target = parent_dir.join(name);
        let sidecar = parent_dir.join(format!(".{name}{SIDECAR_SUFFIX}"));
        let id = child_id(parent, name);

        let content_hash = hash_file(source).await?;
        let previous = read_sidecar(&sidecar).await?;
        if let Some(previous) = &previous
            && !options.force_version
            && previous.content_hash == content_hash
        {
            tracing::debug!(id = %id, version = previous.version, "Content unchanged, keeping current version");
            return Ok(Handle { id, name: name.to_string(), version: previous.version });
        }

        fs::copy(source, &target).await.map_err(|e| map_io_error(e, &source.display().to_string()))?;
        let version = previous.map_or(1, |previous| previous.version + 1);
        let record = Sidecar { version, content_hash, annotations };
        let bytes = serde_json::to_vec_pretty(&record)
            .or_raise(|| ErrorKind::ServiceError(format!("could not serialize metadata of `{id}`")))?;
        fs::write(&sidecar, bytes).await.map_err(|e| map_io_error(e, &id))?;
        tracing::debug!(id = %id, version, "File stored");
        Ok(Handle { id, name: name.to_string(), version })
    }
}

#[async_trait]
impl Session for LocalSession {
    async fn get_project(&mut self, id: &str) -> Result<Container> {
        let dir = self.root.join(validate_name(id)?);
        match fs::metadata(&dir).await {
            Ok(metadata) if metadata.is_dir() => Ok(Container::new(id, id)),
            Ok(_) => exn::bail!(ErrorKind::NotFound(id.to_string())),
            Err(e) => Err(map_io_error(e, id).into()),
        }
    }

    async fn store(&mut self, entity: Descriptor, parent: &Container, options: StoreOptions) -> Result<Handle> {
        match entity {
            Descriptor::Folder { name } => self.store_folder(validate_name(&name)?, parent).await,
            Descriptor::File { path, name, annotations } => {
                self.store_file(&path, validate_name(&name)?, &annotations, parent, options).await
            },
        }
    }
}

fn child_id(parent: &Container, name: &str) -> String {
    format!("{}{SEPARATOR}{name}", parent.id)
}

fn map_io_error(e: std::io::Error, subject: &str) -> ErrorKind {
    match e.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::NotFound(subject.to_string()),
        std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(subject.to_string()),
        _ => ErrorKind::Io(e),
    }
}

async fn hash_file(path: &Path) -> Result<String> {
    let path = path.to_path_buf();
    let subject = path.display().to_string();
    let hashed = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
        let file = std::fs::File::open(&path)?;
        Ok(blake3::Hasher::new().update_reader(file)?.finalize().to_string())
    })
    .await
    .or_raise(|| ErrorKind::ServiceError(format!("hashing `{subject}` was interrupted")))?;
    hashed.map_err(|e| map_io_error(e, &subject).into())
}

async fn read_sidecar(path: &Path) -> Result<Option<SidecarHead>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(map_io_error(e, &path.display().to_string()).into()),
    };
    let head = serde_json::from_slice(&bytes)
        .or_raise(|| ErrorKind::ServiceError(format!("corrupt metadata in `{}`", path.display())))?;
    Ok(Some(head))
}
