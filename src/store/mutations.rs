impl<E: Entity> EntityStore<E> {
    /// Creates an entity optimistically.
    ///
    /// A provisional entity with a placeholder id is appended and published
    /// before this returns. On success it is swapped in place for the
    /// server's entity, which is also the awaited result; on failure it is
    /// removed before the error is returned.
    ///
    /// Outside a tokio runtime this returns `StoreError::Internal` without
    /// touching the store.
    pub fn create(&self, draft: E::Draft) -> Pending<E> {
        if let Err(error) = self.shared.ensure_runtime("create") {
            return Pending::ready(Err(error));
        }
        let (ticket, temp_id) = {
            let mut state = self.shared.lock();
            let mut temp_id = self.shared.temp_ids.next_id();
            while state.contains(&temp_id) {
                temp_id = self.shared.temp_ids.next_id();
            }
            let provisional = E::provisional(temp_id.clone(), &draft);
            let op = PendingOp::Create {
                temp_id: temp_id.clone(),
                provisional,
            };
            let Some(ticket) = state.begin_mutation(op) else {
                return Pending::ready(Err(StoreError::Internal(
                    "create was rejected by the store".to_string(),
                )));
            };
            self.shared.publish(&mut state);
            (ticket, temp_id)
        };
        debug!(store = %self.shared.config.collection_name, ticket, %temp_id, "optimistic create");

        let shared = Arc::clone(&self.shared);
        Pending::spawn(async move {
            let outcome = guarded(shared.remote.create(&draft)).await;
            shared.wait_turn(ticket).await;

            match outcome {
                Ok(created) => {
                    debug!(ticket, %temp_id, id = %created.id(), "create confirmed");
                    shared.settle(ticket, Settlement::Created(created.clone()));
                    Ok(created)
                }
                Err(err) => {
                    let error = StoreError::CreateFailed(format!(
                        "{}: {}",
                        shared.config.resource_name, err
                    ));
                    shared.fail(ticket, &error);
                    Err(error)
                }
            }
        })
    }

    /// Updates an entity optimistically.
    ///
    /// `id` must be present in the current collection and must not be the
    /// placeholder of an unsettled create, otherwise the result is
    /// `StoreError::NotFound` and nothing changes.
    /// On failure only this entity is restored, at its position.
    ///
    /// Outside a tokio runtime this returns `StoreError::Internal` without
    /// touching the store.
    pub fn update(&self, id: &str, patch: E::Patch) -> Pending<E> {
        let op = PendingOp::Update {
            id: id.to_string(),
            patch: patch.clone(),
        };
        let ticket = match self.begin_targeted(id, op) {
            Ok(ticket) => ticket,
            Err(error) => return Pending::ready(Err(error)),
        };
        debug!(store = %self.shared.config.collection_name, ticket, %id, "optimistic update");

        let shared = Arc::clone(&self.shared);
        let id = id.to_string();
        Pending::spawn(async move {
            let outcome = guarded(shared.remote.update(&id, &patch)).await;
            shared.wait_turn(ticket).await;

            match outcome {
                Ok(updated) => {
                    shared.settle(ticket, Settlement::Updated(updated.clone()));
                    Ok(updated)
                }
                Err(err) => {
                    let error =
                        StoreError::UpdateFailed(format!("{}: {}", shared.describe(&id), err));
                    shared.fail(ticket, &error);
                    Err(error)
                }
            }
        })
    }

    /// Deletes an entity optimistically.
    ///
    /// The entity disappears from the published collection immediately. If
    /// the server fails or answers that it did not delete, the entity comes
    /// back at its original position.
    ///
    /// Outside a tokio runtime this returns `StoreError::Internal` without
    /// touching the store.
    pub fn delete(&self, id: &str) -> Pending<()> {
        let op = PendingOp::Delete { id: id.to_string() };
        let ticket = match self.begin_targeted(id, op) {
            Ok(ticket) => ticket,
            Err(error) => return Pending::ready(Err(error)),
        };
        debug!(store = %self.shared.config.collection_name, ticket, %id, "optimistic delete");

        let shared = Arc::clone(&self.shared);
        let id = id.to_string();
        Pending::spawn(async move {
            let outcome = match guarded(shared.remote.delete(&id)).await {
                Ok(true) => Ok(()),
                Ok(false) => Err(RemoteError::Rejected(
                    "the server did not confirm the deletion".to_string(),
                )),
                Err(err) => Err(err),
            };
            shared.wait_turn(ticket).await;

            match outcome {
                Ok(()) => {
                    shared.settle(ticket, Settlement::Deleted(id));
                    Ok(())
                }
                Err(err) => {
                    let error =
                        StoreError::DeleteFailed(format!("{}: {}", shared.describe(&id), err));
                    shared.fail(ticket, &error);
                    Err(error)
                }
            }
        })
    }

    /// Registers an update or delete of an existing, confirmed entity.
    fn begin_targeted(&self, id: &str, op: PendingOp<E>) -> Result<u64> {
        self.shared.ensure_runtime("mutation")?;
        let mut state = self.shared.lock();
        let ticket = if state.is_provisional(id) {
            None
        } else {
            state.begin_mutation(op)
        };

        match ticket {
            Some(ticket) => {
                self.shared.publish(&mut state);
                Ok(ticket)
            }
            None => {
                drop(state);
                let error = StoreError::NotFound(self.shared.describe(id));
                self.shared.report(&error);
                Err(error)
            }
        }
    }
}
