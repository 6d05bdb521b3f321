use crate::core::{
    Entity, HasStatus, RemoteError, RemoteResult, Result, Snapshot, StoreError, TempIdGenerator,
};
use crate::observable::{Observable, Publisher};
use crate::remote::RemoteResource;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

mod config;
mod pending;
mod state;

pub use config::StoreConfig;
pub use pending::Pending;

use state::{PendingOp, Settlement, StoreState};

/// Outcome of [`EntityStore::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The collection was replaced with `count` entities from the backend.
    Loaded { count: usize },
    /// Another load was still in flight; no request was made.
    AlreadyInFlight,
}

/// Observable snapshot of a collection.
pub type CollectionObservable<E> = Observable<Snapshot<E>>;

/// Observable derived from a collection snapshot.
pub type DerivedView<E, T> = Observable<Snapshot<E>, T>;

struct StoreShared<E: Entity> {
    config: StoreConfig,
    remote: Arc<dyn RemoteResource<E>>,
    temp_ids: TempIdGenerator,
    state: Mutex<StoreState<E>>,
    collection: Arc<Publisher<Snapshot<E>>>,
    loading: Arc<Publisher<bool>>,
    last_error: Arc<Publisher<Option<String>>>,
    /// Number of settled tickets; ticket `n` settles once this equals `n`.
    settled_tx: watch::Sender<u64>,
}

/// In-memory source of truth for one resource's collection.
///
/// Mutations apply optimistically: the new state is published before the
/// remote call starts, then reconciled with the server's answer or rolled
/// back when the call fails. Remote calls run concurrently but their
/// outcomes are applied strictly in the order the operations were started.
///
/// The store is a cheap handle; clones share the same state.
///
/// # Examples
///
/// ```
/// use taskstate::{EntityStore, InMemoryRemote, Task, TaskDraft, TaskStatus};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> taskstate::Result<()> {
/// let store = EntityStore::new(InMemoryRemote::<Task>::new());
/// store.load().await?;
///
/// let created = store.create(TaskDraft::new("Write report")).await?;
/// assert_eq!(created.id, "server-1");
/// assert_eq!(store.count_by_status(TaskStatus::Todo).get(), 1);
/// # Ok(())
/// # }
/// ```
pub struct EntityStore<E: Entity> {
    shared: Arc<StoreShared<E>>,
}

impl<E: Entity> Clone for EntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: Entity> EntityStore<E> {
    /// Creates a store with the default configuration.
    pub fn new<R>(remote: R) -> Self
    where
        R: RemoteResource<E> + 'static,
    {
        Self::build(Arc::new(remote), StoreConfig::default())
    }

    /// Creates a store with an explicit configuration.
    pub fn with_config<R>(remote: R, config: StoreConfig) -> Result<Self>
    where
        R: RemoteResource<E> + 'static,
    {
        config.validate().map_err(StoreError::Config)?;
        Ok(Self::build(Arc::new(remote), config))
    }

    fn build(remote: Arc<dyn RemoteResource<E>>, config: StoreConfig) -> Self {
        let (settled_tx, _) = watch::channel(0);
        let temp_ids = TempIdGenerator::new(config.temp_id_prefix.clone());

        Self {
            shared: Arc::new(StoreShared {
                config,
                remote,
                temp_ids,
                state: Mutex::new(StoreState::new()),
                collection: Publisher::new(Snapshot::empty()),
                loading: Publisher::new(false),
                last_error: Publisher::new(None),
                settled_tx,
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    /// Returns true if `id` is the placeholder of a create that has not
    /// settled yet.
    pub fn is_temp_id(&self, id: &str) -> bool {
        self.shared.lock().is_provisional(id)
    }
}

impl<E: Entity> StoreShared<E> {
    fn lock(&self) -> MutexGuard<'_, StoreState<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes `state`. Callers hold the state lock, so publishes can never
    /// overtake each other.
    fn publish(&self, state: &mut StoreState<E>) {
        let snapshot = state.next_snapshot();
        self.collection.publish(snapshot);
        self.publish_loading(state);
    }

    fn publish_loading(&self, state: &StoreState<E>) {
        self.loading.publish_if_changed(state.is_loading());
    }

    fn report(&self, error: &StoreError) {
        warn!(store = %self.config.collection_name, %error, "operation failed");
        self.last_error.publish(Some(error.to_string()));
    }

    /// Fails fast when no tokio runtime is available to run the remote call,
    /// before any state is touched.
    fn ensure_runtime(&self, operation: &str) -> Result<()> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Ok(());
        }
        let error = StoreError::Internal(format!(
            "{operation} on {} needs a running tokio runtime",
            self.config.collection_name
        ));
        self.report(&error);
        Err(error)
    }

    /// Waits until every ticket issued before `ticket` has settled.
    async fn wait_turn(&self, ticket: u64) {
        let mut settled = self.settled_tx.subscribe();
        // The sender lives in `self`, so this only returns once the turn comes.
        let _ = settled.wait_for(|count| *count >= ticket).await;
    }

    /// Applies the outcome of `ticket` and lets the next ticket proceed.
    fn settle(&self, ticket: u64, settlement: Settlement<E>) {
        let mut state = self.lock();
        state.settle(ticket, settlement);
        self.publish(&mut state);
        self.settled_tx.send_replace(ticket + 1);
    }

    fn fail(&self, ticket: u64, error: &StoreError) {
        self.settle(ticket, Settlement::Failed);
        self.report(error);
    }

    fn describe(&self, id: &str) -> String {
        format!("{} '{}'", self.config.resource_name, id)
    }
}

/// Runs a remote call, turning a panic inside the client into a transport error
/// so the ticket still settles.
async fn guarded<T, F>(call: F) -> RemoteResult<T>
where
    F: Future<Output = RemoteResult<T>>,
{
    AssertUnwindSafe(call)
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(RemoteError::Transport("the client crashed".to_string())))
}

// Operations are split by concern; all share this module's scope.
include!("store/load_and_reads.rs");
include!("store/mutations.rs");
include!("store/views.rs");
