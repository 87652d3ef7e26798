//! Remote service contract and implementations.
//!
//! A [`RemoteService`] hands out authenticated [`Session`]s. A session is the
//! only way to touch the remote hierarchy, and it takes `&mut self`
//! throughout: each upload worker owns exactly one session for its lifetime,
//! and a session is never shared between workers.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::local::LocalService;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::{Call, MockService, StoredFile};
use crate::error::Result;
use crate::models::{Container, Credentials, Descriptor, Handle, StoreOptions};
use async_trait::async_trait;

/// A hierarchical object store that can be logged into.
///
/// # Examples
///
/// ```no_run
/// use ferry_remote::{Credentials, Descriptor, RemoteService, StoreOptions};
/// # use ferry_remote::error::Result;
/// # async fn example(service: &dyn RemoteService) -> Result<()> {
/// let mut session = service.authenticate(&Credentials::default()).await?;
/// let project = session.get_project("syn123").await?;
/// let folder = session.store(Descriptor::folder("01"), &project, StoreOptions::default()).await?;
/// println!("created {} ({})", folder.name, folder.id);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Name of the service, for logging only.
    fn name(&self) -> &str;

    /// Open a new authenticated session.
    ///
    /// Returns [`Authentication`](crate::error::ErrorKind::Authentication) if
    /// the credentials are rejected.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Box<dyn Session>>;
}

/// An authenticated connection to a [`RemoteService`].
#[async_trait]
pub trait Session: Send {
    /// Resolve a project by its identifier.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if no such
    /// project exists.
    async fn get_project(&mut self, id: &str) -> Result<Container>;

    /// Store an entity under `parent`.
    ///
    /// Storing a folder is create-or-get: if a folder of that name already
    /// exists under `parent`, its handle is returned and nothing is created.
    ///
    /// Storing a file creates it, or adds a new version to an existing file
    /// of the same name. Without [`StoreOptions::force_version`], storing
    /// content identical to the current version returns the current version
    /// unchanged.
    async fn store(&mut self, entity: Descriptor, parent: &Container, options: StoreOptions) -> Result<Handle>;
}
