impl<E: Entity> EntityStore<E> {
    /// Replaces the collection with the backend's.
    ///
    /// While a load is in flight, further calls return
    /// `LoadOutcome::AlreadyInFlight` without contacting the backend. On
    /// failure the collection is left as it was.
    ///
    /// Outside a tokio runtime this returns `StoreError::Internal` without
    /// touching the store.
    pub fn load(&self) -> Pending<LoadOutcome> {
        let ticket = {
            let mut state = self.shared.lock();
            if state.load_in_flight() {
                debug!(
                    store = %self.shared.config.collection_name,
                    "load already in flight, skipping"
                );
                return Pending::ready(Ok(LoadOutcome::AlreadyInFlight));
            }
            if let Err(error) = self.shared.ensure_runtime("load") {
                return Pending::ready(Err(error));
            }
            let ticket = state.begin_load();
            self.shared.last_error.publish(None);
            self.shared.publish_loading(&state);
            ticket
        };
        info!(store = %self.shared.config.collection_name, ticket, "loading collection");

        let shared = Arc::clone(&self.shared);
        Pending::spawn(async move {
            let outcome = guarded(shared.remote.fetch_all()).await;
            shared.wait_turn(ticket).await;

            match outcome {
                Ok(items) => {
                    let count = items.len();
                    shared.settle(ticket, Settlement::Loaded(items));
                    info!(store = %shared.config.collection_name, ticket, count, "collection loaded");
                    Ok(LoadOutcome::Loaded { count })
                }
                Err(err) => {
                    let error = StoreError::LoadFailed(format!(
                        "{}: {}",
                        shared.config.collection_name, err
                    ));
                    shared.fail(ticket, &error);
                    Err(error)
                }
            }
        })
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Snapshot<E> {
        self.shared.collection.borrow().clone()
    }

    /// Looks `id` up in the current snapshot without touching the network.
    pub fn get_by_id(&self, id: &str) -> Option<E> {
        self.shared.collection.borrow().get(id).cloned()
    }

    /// Returns the cached entity, falling back to a remote fetch on a miss.
    ///
    /// The fetched entity is returned as-is; the collection is not modified.
    pub async fn fetch_by_id(&self, id: &str) -> Result<E> {
        if let Some(entity) = self.get_by_id(id) {
            return Ok(entity);
        }

        debug!(store = %self.shared.config.collection_name, %id, "cache miss, fetching");
        match guarded(self.shared.remote.fetch_one(id)).await {
            Ok(entity) => Ok(entity),
            Err(err) => {
                let error = match err {
                    RemoteError::NotFound(_) => StoreError::NotFound(self.shared.describe(id)),
                    other => StoreError::LoadFailed(format!("{}: {}", self.shared.describe(id), other)),
                };
                self.shared.report(&error);
                Err(error)
            }
        }
    }

    /// Replay-latest stream of the collection.
    pub fn collection(&self) -> CollectionObservable<E> {
        Observable::new(&self.shared.collection)
    }

    /// True exactly while a load or a mutation's remote call is outstanding.
    pub fn is_loading(&self) -> Observable<bool> {
        Observable::new(&self.shared.loading)
    }

    /// Most recent error message, `None` when there is nothing to show.
    pub fn last_error(&self) -> Observable<Option<String>> {
        Observable::new(&self.shared.last_error)
    }

    /// Dismisses the current error.
    pub fn clear_error(&self) {
        self.shared.last_error.publish_if_changed(None);
    }

    /// Number of mutations whose remote call has not settled yet.
    pub fn pending_mutations(&self) -> usize {
        self.shared.lock().pending_mutations()
    }
}
