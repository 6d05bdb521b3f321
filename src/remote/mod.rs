//! Remote Resource Client seam.
//!
//! `EntityStore` talks to its backend only through [`RemoteResource`].
//! Implementations must be `Send + Sync`; every call resolves exactly once.

pub mod config;
pub mod http;
pub mod in_memory;

use crate::core::{Entity, RemoteResult};
use async_trait::async_trait;
use std::sync::Arc;

pub use config::HttpRemoteConfig;
pub use http::HttpRemote;
pub use in_memory::{InMemoryRemote, RemoteOp};

/// Network CRUD for one resource type.
#[async_trait]
pub trait RemoteResource<E: Entity>: Send + Sync {
    /// Fetches the whole collection.
    async fn fetch_all(&self) -> RemoteResult<Vec<E>>;

    /// Fetches one entity; a missing id is `RemoteError::NotFound`.
    async fn fetch_one(&self, id: &str) -> RemoteResult<E>;

    /// Persists a new entity and returns it with its server-assigned id.
    async fn create(&self, draft: &E::Draft) -> RemoteResult<E>;

    /// Applies a partial update and returns the authoritative entity.
    async fn update(&self, id: &str, patch: &E::Patch) -> RemoteResult<E>;

    /// Deletes an entity. `Ok(false)` means the server did not delete it.
    async fn delete(&self, id: &str) -> RemoteResult<bool>;
}

#[async_trait]
impl<E, R> RemoteResource<E> for Arc<R>
where
    E: Entity,
    R: RemoteResource<E> + ?Sized,
{
    async fn fetch_all(&self) -> RemoteResult<Vec<E>> {
        (**self).fetch_all().await
    }

    async fn fetch_one(&self, id: &str) -> RemoteResult<E> {
        (**self).fetch_one(id).await
    }

    async fn create(&self, draft: &E::Draft) -> RemoteResult<E> {
        (**self).create(draft).await
    }

    async fn update(&self, id: &str, patch: &E::Patch) -> RemoteResult<E> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &str) -> RemoteResult<bool> {
        (**self).delete(id).await
    }
}
