use ferry_extract::models::Annotations;
use std::path::PathBuf;

/// Identifier used for containers that were never created (dry-run).
pub const PLACEHOLDER_ID: &str = "dry-run";

/// Login material presented to [`RemoteService::authenticate`](crate::RemoteService::authenticate).
///
/// Both fields are optional: a service may fall back to cached credentials
/// when they are absent.
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A remote entity that can hold folders and files (a project or folder).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Container {
    pub id: String,
    pub name: String,
}
impl Container {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }

    /// A stand-in for a container that has not been created.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self::new(PLACEHOLDER_ID, name)
    }

    pub fn is_placeholder(&self) -> bool {
        self.id == PLACEHOLDER_ID
    }
}

/// What a successful store returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    pub id: String,
    pub name: String,
    /// Starts at 1; only files are ever re-versioned.
    pub version: u64,
}
impl From<Handle> for Container {
    fn from(handle: Handle) -> Self {
        Self { id: handle.id, name: handle.name }
    }
}

/// An entity to store under a parent container.
#[derive(Debug, Clone)]
pub enum Descriptor {
    Folder {
        name: String,
    },
    File {
        /// Local content to upload.
        path: PathBuf,
        /// Display name on the remote side.
        name: String,
        annotations: Annotations,
    },
}
impl Descriptor {
    pub fn folder(name: impl Into<String>) -> Self {
        Self::Folder { name: name.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Folder { name } | Self::File { name, .. } => name,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Create a new file version even when content is unchanged.
    pub force_version: bool,
}
impl StoreOptions {
    pub const FORCE: Self = Self { force_version: true };
}
