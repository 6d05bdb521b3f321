//! Read-only, replay-latest handles onto values published by a store.

use futures::stream::{self, Stream};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::{mpsc, watch};

type Projection<S, T> = Arc<dyn Fn(&S) -> T + Send + Sync>;

/// Write side of an observable value.
///
/// The latest value lives in a `watch` channel for replay-latest reads.
/// Streams get their own unbounded queue, registered together with the value
/// they start from, so each stream receives every publish exactly once.
pub(crate) struct Publisher<S> {
    latest: watch::Sender<S>,
    streams: Mutex<Vec<mpsc::UnboundedSender<S>>>,
}

impl<S> Publisher<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(initial: S) -> Arc<Self> {
        let (latest, _) = watch::channel(initial);
        Arc::new(Self {
            latest,
            streams: Mutex::new(Vec::new()),
        })
    }

    fn streams(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<S>>> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn publish(&self, value: S) {
        let mut streams = self.streams();
        streams.retain(|stream| stream.send(value.clone()).is_ok());
        self.latest.send_replace(value);
    }

    /// Publishes `value` unless it equals the current one.
    pub(crate) fn publish_if_changed(&self, value: S)
    where
        S: PartialEq,
    {
        if *self.latest.borrow() != value {
            self.publish(value);
        }
    }

    pub(crate) fn borrow(&self) -> watch::Ref<'_, S> {
        self.latest.borrow()
    }

    /// Current value plus a queue of every later publish.
    fn subscribe_all(&self) -> (S, mpsc::UnboundedReceiver<S>) {
        let mut streams = self.streams();
        let (tx, rx) = mpsc::unbounded_channel();
        streams.push(tx);
        (self.latest.borrow().clone(), rx)
    }
}

/// A subscription to a published value `S`, viewed through a projection to `T`.
///
/// A fresh observable sees the current value immediately through [`get`].
/// [`changed`] waits for the next publish and yields the latest value, so a
/// slow reader may skip intermediate values but never goes backwards.
/// [`into_stream`] yields every publish, in order, from the moment it is
/// called.
///
/// Derived views are observables whose projection recomputes from the
/// source on every read, so they cannot drift from the value they came from.
///
/// [`get`]: Observable::get
/// [`changed`]: Observable::changed
/// [`into_stream`]: Observable::into_stream
pub struct Observable<S, T = S> {
    rx: watch::Receiver<S>,
    publisher: Weak<Publisher<S>>,
    project: Projection<S, T>,
}

impl<S> Observable<S, S>
where
    S: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(publisher: &Arc<Publisher<S>>) -> Self {
        Self::derived(publisher, |source: &S| source.clone())
    }
}

impl<S, T> Observable<S, T>
where
    S: Clone + Send + Sync + 'static,
    T: 'static,
{
    pub(crate) fn derived<F>(publisher: &Arc<Publisher<S>>, project: F) -> Self
    where
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        Self {
            rx: publisher.latest.subscribe(),
            publisher: Arc::downgrade(publisher),
            project: Arc::new(project),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        let source = self.rx.borrow();
        (self.project)(&source)
    }

    /// Current value, marking it as seen so `changed` waits for the next one.
    pub fn get_and_mark_seen(&mut self) -> T {
        let source = self.rx.borrow_and_update();
        (self.project)(&source)
    }

    /// Waits for the next publish and returns the latest value.
    ///
    /// Returns `None` once the publishing store has been dropped.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.get_and_mark_seen())
    }

    /// Applies a further projection, producing a new derived observable.
    pub fn map<U, F>(self, f: F) -> Observable<S, U>
    where
        F: Fn(T) -> U + Send + Sync + 'static,
        U: 'static,
    {
        let inner = self.project;
        Observable {
            rx: self.rx,
            publisher: self.publisher,
            project: Arc::new(move |source: &S| f(inner(source))),
        }
    }

    /// Stream of the current value followed by every later publish.
    ///
    /// Nothing is skipped: publishes are queued until the stream is polled.
    /// The stream ends once the publishing store has been dropped.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send + 'static
    where
        T: Send,
    {
        let (current, updates) = match self.publisher.upgrade() {
            Some(publisher) => {
                let (current, updates) = publisher.subscribe_all();
                (current, Some(updates))
            }
            None => (self.rx.borrow().clone(), None),
        };
        let project = self.project;
        let first = project(&current);

        stream::unfold(
            (Some(first), updates, project),
            |(pending, updates, project)| async move {
                if let Some(value) = pending {
                    return Some((value, (None, updates, project)));
                }
                let mut updates = updates?;
                let source = updates.recv().await?;
                let value = project(&source);
                Some((value, (None, Some(updates), project)))
            },
        )
    }
}

impl<S, T> Clone for Observable<S, T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            publisher: Weak::clone(&self.publisher),
            project: Arc::clone(&self.project),
        }
    }
}

impl<S, T> fmt::Debug for Observable<S, T>
where
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("source", &*self.rx.borrow())
            .finish()
    }
}
