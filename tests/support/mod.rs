//! Test backends for store integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use taskstate::{
    Entity, RemoteError, RemoteOp, RemoteResource, Task, TaskDraft, TaskPatch, TaskStatus,
};
use tokio::sync::{Mutex, oneshot, watch};

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// How a held call should answer once released.
#[derive(Debug, Clone)]
pub enum Reply {
    Ok,
    Fail(RemoteError),
    /// Delete answers `Ok(false)`.
    Refuse,
}

struct HeldCall {
    op: RemoteOp,
    release: Option<oneshot::Sender<Reply>>,
}

struct Script {
    items: Vec<Task>,
    next_id: u64,
    held_ops: HashSet<RemoteOp>,
    calls: Vec<HeldCall>,
}

/// Backend whose answers can be held back and released one by one.
///
/// Creates and updates change server-side state as soon as the call
/// arrives; a held call only delays (or replaces, for `Reply::Fail`) the
/// answer. Listing reads the state when the answer is released and a delete
/// only removes the entity when it answers `Reply::Ok`.
#[derive(Clone)]
pub struct ScriptedRemote {
    script: Arc<Mutex<Script>>,
    arrived_tx: Arc<watch::Sender<usize>>,
}

impl ScriptedRemote {
    pub fn with_items(items: Vec<Task>) -> Self {
        let (arrived_tx, _) = watch::channel(0);
        Self {
            script: Arc::new(Mutex::new(Script {
                items,
                next_id: 1,
                held_ops: HashSet::new(),
                calls: Vec::new(),
            })),
            arrived_tx: Arc::new(arrived_tx),
        }
    }

    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    /// Calls of kind `op` wait for `release` from now on.
    pub async fn hold(&self, op: RemoteOp) {
        self.script.lock().await.held_ops.insert(op);
    }

    /// Waits until `count` calls of any kind have arrived.
    pub async fn wait_for_calls(&self, count: usize) {
        let mut arrived = self.arrived_tx.subscribe();
        let _ = arrived.wait_for(|seen| *seen >= count).await;
    }

    pub async fn calls(&self, op: RemoteOp) -> usize {
        let script = self.script.lock().await;
        script.calls.iter().filter(|call| call.op == op).count()
    }

    /// Releases the `index`-th call (in arrival order) with `reply`.
    pub async fn release(&self, index: usize, reply: Reply) {
        let mut script = self.script.lock().await;
        let sender = script.calls[index]
            .release
            .take()
            .expect("call was not held or already released");
        sender.send(reply).expect("caller went away");
    }

    async fn arrive(&self, op: RemoteOp) -> Reply {
        let receiver = {
            let mut script = self.script.lock().await;
            let receiver = if script.held_ops.contains(&op) {
                let (tx, rx) = oneshot::channel();
                script.calls.push(HeldCall {
                    op,
                    release: Some(tx),
                });
                Some(rx)
            } else {
                script.calls.push(HeldCall { op, release: None });
                None
            };
            self.arrived_tx.send_modify(|seen| *seen += 1);
            receiver
        };

        match receiver {
            Some(rx) => rx.await.unwrap_or(Reply::Fail(RemoteError::Transport(
                "test dropped the call".to_string(),
            ))),
            None => Reply::Ok,
        }
    }
}

#[async_trait]
impl RemoteResource<Task> for ScriptedRemote {
    async fn fetch_all(&self) -> RemoteResult<Vec<Task>> {
        match self.arrive(RemoteOp::FetchAll).await {
            Reply::Fail(err) => Err(err),
            _ => Ok(self.script.lock().await.items.clone()),
        }
    }

    async fn fetch_one(&self, id: &str) -> RemoteResult<Task> {
        let found = {
            let script = self.script.lock().await;
            script.items.iter().find(|task| task.id == id).cloned()
        };
        match self.arrive(RemoteOp::FetchOne).await {
            Reply::Fail(err) => Err(err),
            _ => found.ok_or_else(|| RemoteError::NotFound(id.to_string())),
        }
    }

    async fn create(&self, draft: &TaskDraft) -> RemoteResult<Task> {
        let created = {
            let mut script = self.script.lock().await;
            let created = Task::from_draft(format!("server-{}", script.next_id), draft);
            script.next_id += 1;
            script.items.push(created.clone());
            created
        };
        match self.arrive(RemoteOp::Create).await {
            Reply::Fail(err) => Err(err),
            _ => Ok(created),
        }
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> RemoteResult<Task> {
        let updated = {
            let mut script = self.script.lock().await;
            script.items.iter_mut().find(|task| task.id == id).map(|task| {
                task.apply_patch(patch);
                task.clone()
            })
        };
        match self.arrive(RemoteOp::Update).await {
            Reply::Fail(err) => Err(err),
            _ => updated.ok_or_else(|| RemoteError::NotFound(id.to_string())),
        }
    }

    async fn delete(&self, id: &str) -> RemoteResult<bool> {
        match self.arrive(RemoteOp::Delete).await {
            Reply::Fail(err) => Err(err),
            Reply::Refuse => Ok(false),
            Reply::Ok => {
                let mut script = self.script.lock().await;
                script.items.retain(|task| task.id != id);
                Ok(true)
            }
        }
    }
}

/// Backend whose every call panics.
pub struct CrashingRemote;

#[async_trait]
impl RemoteResource<Task> for CrashingRemote {
    async fn fetch_all(&self) -> RemoteResult<Vec<Task>> {
        panic!("fetch_all crashed")
    }

    async fn fetch_one(&self, _id: &str) -> RemoteResult<Task> {
        panic!("fetch_one crashed")
    }

    async fn create(&self, _draft: &TaskDraft) -> RemoteResult<Task> {
        panic!("create crashed")
    }

    async fn update(&self, _id: &str, _patch: &TaskPatch) -> RemoteResult<Task> {
        panic!("update crashed")
    }

    async fn delete(&self, _id: &str) -> RemoteResult<bool> {
        panic!("delete crashed")
    }
}

pub fn task(id: &str, title: &str, status: TaskStatus) -> Task {
    Task::from_draft(id, &TaskDraft::new(title).status(status))
}

pub fn ids(tasks: &[Task]) -> Vec<String> {
    tasks.iter().map(|task| task.id.clone()).collect()
}

pub fn offline() -> RemoteError {
    RemoteError::Transport("connection refused".to_string())
}

/// Asserts no two entities share an id.
pub fn assert_unique_ids(tasks: &[Task]) {
    let ids: HashSet<&str> = tasks.iter().map(|task| task.id.as_str()).collect();
    assert_eq!(ids.len(), tasks.len(), "duplicate ids in {tasks:?}");
}
