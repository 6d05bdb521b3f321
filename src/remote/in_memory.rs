use super::RemoteResource;
use crate::core::{Entity, RemoteError, RemoteResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Remote call kinds, used for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    FetchAll,
    FetchOne,
    Create,
    Update,
    Delete,
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FetchAll => "fetch_all",
            Self::FetchOne => "fetch_one",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{label}")
    }
}

struct InMemoryRemoteState<E> {
    items: Vec<E>,
    next_id: u64,
    id_prefix: String,
    latency: Option<Duration>,
    scheduled_failures: Vec<(RemoteOp, RemoteError)>,
    calls: HashMap<RemoteOp, usize>,
}

/// An in-process backend implementing `RemoteResource`.
///
/// Behaves like a well-mannered REST backend: assigns `server-<n>` ids, merges
/// patches, reports unknown ids as `NotFound`. Failures can be scheduled per
/// operation and an artificial latency can be set, which makes it suitable
/// for demos and tests.
pub struct InMemoryRemote<E> {
    state: Arc<Mutex<InMemoryRemoteState<E>>>,
}

impl<E> Clone for InMemoryRemote<E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<E: Entity> InMemoryRemote<E> {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    /// Creates a backend that already stores `items`.
    pub fn with_items(items: Vec<E>) -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryRemoteState {
                items,
                next_id: 1,
                id_prefix: "server-".to_string(),
                latency: None,
                scheduled_failures: Vec::new(),
                calls: HashMap::new(),
            })),
        }
    }

    /// Delays every call by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        self.state.lock().await.latency = Some(latency);
    }

    /// Makes the next call of kind `op` fail with `error`.
    ///
    /// Multiple scheduled failures for the same kind are consumed in order.
    pub async fn fail_next(&self, op: RemoteOp, error: RemoteError) {
        self.state.lock().await.scheduled_failures.push((op, error));
    }

    /// Number of calls of kind `op` received so far.
    pub async fn calls(&self, op: RemoteOp) -> usize {
        self.state
            .lock()
            .await
            .calls
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    /// Items as currently stored on the "server".
    pub async fn items(&self) -> Vec<E> {
        self.state.lock().await.items.clone()
    }

    async fn enter(&self, op: RemoteOp) -> RemoteResult<()> {
        let latency = {
            let mut state = self.state.lock().await;
            *state.calls.entry(op).or_insert(0) += 1;
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().await;
        match state
            .scheduled_failures
            .iter()
            .position(|(scheduled, _)| *scheduled == op)
        {
            Some(index) => Err(state.scheduled_failures.remove(index).1),
            None => Ok(()),
        }
    }
}

impl<E: Entity> Default for InMemoryRemote<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> RemoteResource<E> for InMemoryRemote<E> {
    async fn fetch_all(&self) -> RemoteResult<Vec<E>> {
        self.enter(RemoteOp::FetchAll).await?;
        Ok(self.state.lock().await.items.clone())
    }

    async fn fetch_one(&self, id: &str) -> RemoteResult<E> {
        self.enter(RemoteOp::FetchOne).await?;
        let state = self.state.lock().await;
        state
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    async fn create(&self, draft: &E::Draft) -> RemoteResult<E> {
        self.enter(RemoteOp::Create).await?;
        let mut state = self.state.lock().await;
        let id = format!("{}{}", state.id_prefix, state.next_id);
        state.next_id += 1;
        let created = E::provisional(id, draft);
        state.items.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: &E::Patch) -> RemoteResult<E> {
        self.enter(RemoteOp::Update).await?;
        let mut state = self.state.lock().await;
        let item = state
            .items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        item.apply_patch(patch);
        Ok(item.clone())
    }

    async fn delete(&self, id: &str) -> RemoteResult<bool> {
        self.enter(RemoteOp::Delete).await?;
        let mut state = self.state.lock().await;
        let index = state
            .items
            .iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        state.items.remove(index);
        Ok(true)
    }
}
