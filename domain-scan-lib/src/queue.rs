//! Bounded-concurrency work queue.
//!
//! A [`WorkQueue`] accepts work items, runs at most `limit` of them at a time
//! in FIFO order and reports every lifecycle step to its observers. Starting
//! queued work is always deferred to a separate task, so a burst of
//! [`WorkQueue::enqueue`] calls is admitted completely before anything runs.
//!
//! Stopping a queue cancels only work that has not started yet; running work
//! is always allowed to finish.

use crate::error::DomainScanError;
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::task::{Context, Poll};
use tokio::sync::{oneshot, watch};

/// A unit of work the queue can run.
#[async_trait]
pub trait Work: Send + Sync + 'static {
    /// Value produced on success.
    type Output: Send + 'static;

    async fn run(&self) -> Result<Self::Output, DomainScanError>;
}

/// Lifecycle notifications emitted by a [`WorkQueue`].
pub enum QueueEvent<'a, W: Work> {
    /// Work was appended to the pending list
    Added(&'a W),

    /// Work left the pending list and began running
    Started(&'a W),

    /// Work completed successfully
    Done(&'a W, &'a W::Output),

    /// Work completed with an error
    Failed(&'a W, &'a DomainScanError),

    /// Work completed, either way (always follows `Done` or `Failed`)
    Finished(&'a W),

    /// The pending list became empty
    Empty,

    /// Nothing is pending and nothing is running
    Idle,
}

impl<W: Work> QueueEvent<'_, W> {
    /// Short event name, used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            QueueEvent::Added(_) => "added",
            QueueEvent::Started(_) => "started",
            QueueEvent::Done(..) => "done",
            QueueEvent::Failed(..) => "failed",
            QueueEvent::Finished(_) => "finished",
            QueueEvent::Empty => "empty",
            QueueEvent::Idle => "idle",
        }
    }
}

type Observer<W> = Arc<dyn Fn(&QueueEvent<'_, W>) + Send + Sync>;
type Reply<W> = oneshot::Sender<Result<<W as Work>::Output, DomainScanError>>;

struct Entry<W: Work> {
    work: Arc<W>,
    reply: Reply<W>,
}

struct QueueState<W: Work> {
    pending: VecDeque<Entry<W>>,
    running: usize,
}

struct Inner<W: Work> {
    name: String,
    limit: usize,
    state: Mutex<QueueState<W>>,
    observers: RwLock<Vec<Observer<W>>>,
    idle: watch::Sender<bool>,
}

/// Eventual outcome of an enqueued work item.
///
/// Resolves to the work's own result, or to [`DomainScanError::Canceled`]
/// when the queue was stopped before the work started.
pub struct Completion<T> {
    rx: oneshot::Receiver<Result<T, DomainScanError>>,
}

impl<T> Future for Completion<T> {
    type Output = Result<T, DomainScanError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(outcome) => outcome,
            Err(_) => Err(DomainScanError::Canceled),
        })
    }
}

/// FIFO queue running at most `limit` work items concurrently.
pub struct WorkQueue<W: Work> {
    inner: Arc<Inner<W>>,
}

impl<W: Work> Clone for WorkQueue<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Work> WorkQueue<W> {
    /// Create a queue. A limit of zero is treated as one.
    pub fn new<N: Into<String>>(name: N, limit: usize) -> Self {
        let (idle, _) = watch::channel(true);
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                limit: limit.max(1),
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    running: 0,
                }),
                observers: RwLock::new(Vec::new()),
                idle,
            }),
        }
    }

    /// Register an observer for lifecycle events.
    ///
    /// Observers are called synchronously from whichever task emits the
    /// event and must not block.
    pub fn on_event<F>(&self, observer: F)
    where
        F: Fn(&QueueEvent<'_, W>) + Send + Sync + 'static,
    {
        self.inner
            .observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Arc::new(observer));
    }

    /// Append work to the pending list.
    ///
    /// Dispatch happens on a separately spawned task, never inside this call.
    /// Must be called from within a Tokio runtime.
    pub fn enqueue(&self, work: W) -> Completion<W::Output> {
        let (reply, rx) = oneshot::channel();
        let work = Arc::new(work);

        {
            let mut state = self.inner.lock_state();
            state.pending.push_back(Entry {
                work: Arc::clone(&work),
                reply,
            });
            self.inner.idle.send_replace(false);
        }
        self.inner.emit(&QueueEvent::Added(&work));

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.dispatch() });

        Completion { rx }
    }

    /// True when nothing is pending and nothing is running.
    pub fn is_idle(&self) -> bool {
        let state = self.inner.lock_state();
        state.running == 0 && state.pending.is_empty()
    }

    /// Number of work items currently running.
    pub fn running(&self) -> usize {
        self.inner.lock_state().running
    }

    /// Number of work items waiting to start.
    pub fn pending_len(&self) -> usize {
        self.inner.lock_state().pending.len()
    }

    pub fn limit(&self) -> usize {
        self.inner.limit
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Cancel all pending work and wait for running work to finish.
    ///
    /// Every pending completion resolves to [`DomainScanError::Canceled`]
    /// without the work being started.
    pub async fn stop(&self) {
        let (canceled, running) = {
            let mut state = self.inner.lock_state();
            let canceled: Vec<Entry<W>> = state.pending.drain(..).collect();
            if state.running == 0 {
                self.inner.idle.send_replace(true);
            }
            (canceled, state.running)
        };

        tracing::debug!(
            queue = %self.inner.name,
            canceled = canceled.len(),
            running,
            "Stopping work queue"
        );

        for entry in canceled {
            let _ = entry.reply.send(Err(DomainScanError::Canceled));
        }

        if running == 0 {
            self.inner.emit_idle();
            return;
        }

        // The flag only changes under the state lock, so it agrees with it
        let mut idle = self.inner.idle.subscribe();
        let _ = idle.wait_for(|idle| *idle).await;
    }
}

impl<W: Work> Inner<W> {
    fn lock_state(&self) -> MutexGuard<'_, QueueState<W>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: &QueueEvent<'_, W>) {
        let observers: Vec<Observer<W>> = self
            .observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        for observer in observers {
            observer(event);
        }
    }

    /// Emit `Idle` unless work was enqueued since the queue drained.
    fn emit_idle(&self) {
        if *self.idle.borrow() {
            self.emit(&QueueEvent::Idle);
        }
    }

    /// Start pending work until the limit is reached.
    fn dispatch(self: &Arc<Self>) {
        loop {
            let (entry, drained) = {
                let mut state = self.lock_state();
                if state.running >= self.limit {
                    return;
                }
                match state.pending.pop_front() {
                    Some(entry) => {
                        state.running += 1;
                        (entry, state.pending.is_empty())
                    }
                    None => return,
                }
            };

            self.emit(&QueueEvent::Started(&entry.work));
            if drained {
                self.emit(&QueueEvent::Empty);
            }

            let inner = Arc::clone(self);
            tokio::spawn(async move { inner.execute(entry).await });
        }
    }

    async fn execute(self: Arc<Self>, entry: Entry<W>) {
        let Entry { work, reply } = entry;

        let outcome = match AssertUnwindSafe(work.run()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => Err(DomainScanError::internal(format!(
                "work in queue '{}' panicked",
                self.name
            ))),
        };

        match &outcome {
            Ok(output) => self.emit(&QueueEvent::Done(&work, output)),
            Err(error) => self.emit(&QueueEvent::Failed(&work, error)),
        }
        self.emit(&QueueEvent::Finished(&work));

        let idle = {
            let mut state = self.lock_state();
            state.running -= 1;
            let idle = state.running == 0 && state.pending.is_empty();
            if idle {
                self.idle.send_replace(true);
            }
            idle
        };
        if idle {
            self.emit_idle();
        }

        // The caller may have dropped its completion
        let _ = reply.send(outcome);

        self.dispatch();
    }
}
