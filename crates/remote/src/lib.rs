//! The remote object store ferry uploads into.
//!
//! A [`RemoteService`] hands out [`Session`]s; a session resolves projects
//! and stores folders and files under a parent [`Container`].
//! [`LocalService`] is a filesystem-backed implementation.

pub mod error;
mod models;
pub mod path;
pub mod service;

pub use crate::models::{Container, Credentials, Descriptor, Handle, PLACEHOLDER_ID, StoreOptions};
pub use crate::path::RemotePath;
pub use crate::service::{LocalService, RemoteService, Session};
#[cfg(any(test, feature = "mock"))]
pub use crate::service::{Call, MockService, StoredFile};
