use crate::core::{Result, StoreError};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

/// Completion of a store operation that has already been started.
///
/// The optimistic part of an operation is applied before this value is
/// returned. Awaiting it yields the settled outcome; dropping it does not
/// cancel anything, reconciliation or rollback still run to completion.
#[must_use = "the operation runs regardless, but its error is only visible by awaiting"]
pub struct Pending<T> {
    inner: PendingInner<T>,
}

enum PendingInner<T> {
    Ready(Option<Result<T>>),
    Spawned(JoinHandle<Result<T>>),
}

impl<T: Send + 'static> Pending<T> {
    pub(crate) fn ready(result: Result<T>) -> Self {
        Self {
            inner: PendingInner::Ready(Some(result)),
        }
    }

    pub(crate) fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            inner: PendingInner::Spawned(tokio::spawn(future)),
        }
    }

    /// True when the outcome was decided without a remote call.
    pub fn is_immediate(&self) -> bool {
        matches!(self.inner, PendingInner::Ready(_))
    }
}

// `T` is never pinned: it only moves through `Option::take` and `JoinHandle`.
impl<T> Unpin for Pending<T> {}

impl<T> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            PendingInner::Ready(slot) => Poll::Ready(slot.take().unwrap_or_else(|| {
                Err(StoreError::Internal(
                    "operation result was already taken".to_string(),
                ))
            })),
            PendingInner::Spawned(handle) => Pin::new(handle).poll(cx).map(|joined| {
                joined.unwrap_or_else(|err| {
                    Err(StoreError::Internal(format!("operation task failed: {err}")))
                })
            }),
        }
    }
}
