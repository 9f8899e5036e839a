use std::collections::VecDeque;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;

use crate::BroadcastError;
use crate::Error;
use crate::Result;

type ReadFn<T> = Box<dyn FnOnce(&VecDeque<T>) + Send>;

enum CacheCommand<T> {
    Add(T),
    Read(ReadFn<T>),
}

/// Fixed capacity ring of the most recent items.
///
/// Adds and reads travel through the same queue, so a read always observes
/// every add issued before it by the same caller.
pub struct ReplayCache<T> {
    tx: mpsc::UnboundedSender<CacheCommand<T>>,
    capacity: usize,
}

impl<T> Clone for ReplayCache<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T> ReplayCache<T>
where
    T: Clone + Send + 'static,
{
    /// Spawns the owning actor. It stops when `token` is cancelled or every
    /// handle is dropped.
    pub fn new(
        capacity: usize,
        token: CancellationToken,
    ) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx, capacity, token));
        Self { tx, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Never waits; evicts the oldest item once full.
    pub fn add(
        &self,
        item: T,
    ) -> Result<()> {
        self.tx
            .send(CacheCommand::Add(item))
            .map_err(|_| BroadcastError::CacheClosed.into())
    }

    async fn read<R, F>(
        &self,
        f: F,
    ) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&VecDeque<T>) -> R + Send + 'static,
    {
        let (resp_tx, resp_rx) = oneshot::channel();
        let cmd = CacheCommand::Read(Box::new(move |items: &VecDeque<T>| {
            let _ = resp_tx.send(f(items));
        }));
        self.tx.send(cmd).map_err(|_| Error::from(BroadcastError::CacheClosed))?;
        resp_rx.await.map_err(|_| BroadcastError::CacheClosed.into())
    }

    pub async fn len(&self) -> Result<usize> {
        self.read(|items| items.len()).await
    }

    /// `0` is the oldest retained item; out of range yields `None`.
    pub async fn get(
        &self,
        index: usize,
    ) -> Result<Option<T>> {
        self.read(move |items| items.get(index).cloned()).await
    }

    /// Oldest to newest snapshot
    pub async fn slice(&self) -> Result<Vec<T>> {
        self.read(|items| items.iter().cloned().collect()).await
    }

    /// Visits items oldest first and stops at the first error, returning it.
    pub async fn range<F>(
        &self,
        mut f: F,
    ) -> Result<()>
    where
        F: FnMut(&T) -> Result<()> + Send + 'static,
    {
        self.read(move |items| items.iter().try_for_each(|item| f(item)))
            .await?
    }

    /// Pushes every retained item into `dst` without waiting.
    ///
    /// Fails as soon as `dst` can not take an item immediately.
    pub async fn read_into(
        &self,
        dst: mpsc::Sender<T>,
    ) -> Result<()> {
        self.range(move |item| {
            dst.try_send(item.clone()).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => Error::from(BroadcastError::SlowSubscriber),
                mpsc::error::TrySendError::Closed(_) => Error::from(BroadcastError::Terminated),
            })
        })
        .await
    }
}

async fn run<T>(
    mut rx: mpsc::UnboundedReceiver<CacheCommand<T>>,
    capacity: usize,
    token: CancellationToken,
) {
    let mut items: VecDeque<T> = VecDeque::with_capacity(capacity);
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("replay cache cancelled");
                break;
            }
            cmd = rx.recv() => match cmd {
                Some(CacheCommand::Add(item)) => {
                    if items.len() == capacity {
                        items.pop_front();
                    }
                    items.push_back(item);
                    trace!(len = items.len(), "replay cache add");
                }
                Some(CacheCommand::Read(f)) => f(&items),
                None => {
                    debug!("replay cache handles dropped");
                    break;
                }
            }
        }
    }
}
