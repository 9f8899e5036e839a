use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::ReplayCache;
use crate::access::RequestContext;
use crate::config::WatchConfig;
use crate::BroadcastError;
use crate::Error;
use crate::Result;
use crate::StorageMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcasterState {
    Uninitialized,
    Started,
    /// Terminal
    Terminated,
}

/// Receiving end handed to exactly one watcher.
///
/// The broadcaster owns the sending side and closes it on unsubscribe,
/// on slow consumption, or on termination.
#[derive(Debug)]
pub struct Subscription<T> {
    id: u64,
    receiver: mpsc::Receiver<T>,
}

impl<T> Subscription<T> {
    /// A subscription that was never registered. Its channel is closed and
    /// unsubscribing it is a no-op.
    pub fn detached() -> Self {
        let (_, receiver) = mpsc::channel(1);
        Self { id: 0, receiver }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// `None` once the broadcaster closed the channel
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    pub fn receiver_mut(&mut self) -> &mut mpsc::Receiver<T> {
        &mut self.receiver
    }
}

/// Subscriber bookkeeping shares one queue so the actor sees it in call order.
enum Control<T> {
    Subscribe(u64, mpsc::Sender<T>),
    Unsubscribe(u64),
}

struct Inner<T> {
    config: WatchConfig,
    token: CancellationToken,
    metrics: Arc<StorageMetrics>,
    state: watch::Sender<BroadcasterState>,
    control_tx: mpsc::UnboundedSender<Control<T>>,
    /// Taken by the actor on start
    control_rx: Mutex<Option<mpsc::UnboundedReceiver<Control<T>>>>,
    next_id: AtomicU64,
}

/// One to many fan-out of `T` with bounded replay for late subscribers.
pub struct Broadcaster<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Broadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Broadcaster<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(
        config: WatchConfig,
        token: CancellationToken,
        metrics: Arc<StorageMetrics>,
    ) -> Self {
        let (state, _) = watch::channel(BroadcasterState::Uninitialized);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                config,
                token,
                metrics,
                state,
                control_tx,
                control_rx: Mutex::new(Some(control_rx)),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Runs `connect` with the input side of the broadcaster and spawns the
    /// actor.
    ///
    /// `connect` performs its own setup and then feeds the sender from a
    /// task of its own; dropping the sender signals end of stream.
    pub async fn start<F, Fut>(
        &self,
        connect: F,
    ) -> Result<()>
    where
        F: FnOnce(mpsc::Sender<T>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let control = self
            .inner
            .control_rx
            .lock()
            .take()
            .ok_or(Error::Broadcast(BroadcastError::AlreadyStarted))?;

        let (input_tx, input_rx) = mpsc::channel(self.inner.config.subscriber_buffer_size);
        if let Err(e) = connect(input_tx).await {
            warn!("broadcaster connect failed: {:?}", e);
            self.inner.state.send_replace(BroadcasterState::Terminated);
            return Err(BroadcastError::Connect(e.to_string()).into());
        }

        let cache = ReplayCache::new(self.inner.config.replay_cache_size, self.inner.token.child_token());
        let actor = Actor {
            input: input_rx,
            control,
            subscribers: HashMap::new(),
            cache,
            token: self.inner.token.clone(),
            metrics: self.inner.metrics.clone(),
        };
        // published before the actor can terminate
        self.inner.state.send_replace(BroadcasterState::Started);
        let inner = self.inner.clone();
        tokio::spawn(async move {
            actor.run().await;
            inner.state.send_replace(BroadcasterState::Terminated);
            info!("broadcaster terminated");
        });
        debug!("broadcaster started");
        Ok(())
    }

    pub fn state(&self) -> BroadcasterState {
        *self.inner.state.borrow()
    }

    /// Stops the actor; every subscriber channel gets closed.
    pub fn shutdown(&self) {
        self.inner.token.cancel();
    }

    /// Waits for the broadcaster to start, then registers a new subscriber
    /// that first receives the replay history and then live items.
    pub async fn subscribe(
        &self,
        ctx: &RequestContext,
    ) -> Result<Subscription<T>> {
        let mut state = self.inner.state.subscribe();
        let current = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(BroadcastError::Cancelled.into()),
            s = state.wait_for(|s| *s != BroadcasterState::Uninitialized) => match s {
                Ok(s) => *s,
                Err(_) => BroadcasterState::Terminated,
            },
        };
        if current == BroadcasterState::Terminated {
            return Err(BroadcastError::Terminated.into());
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, receiver) = mpsc::channel(self.inner.config.subscriber_buffer_size);
        self.inner
            .control_tx
            .send(Control::Subscribe(id, tx))
            .map_err(|_| BroadcastError::Terminated)?;
        Ok(Subscription { id, receiver })
    }

    /// Safe for detached subscriptions and after termination.
    pub fn unsubscribe(
        &self,
        subscription: &Subscription<T>,
    ) {
        if subscription.id == 0 || self.state() != BroadcasterState::Started {
            return;
        }
        let _ = self.inner.control_tx.send(Control::Unsubscribe(subscription.id));
    }
}

struct Actor<T> {
    input: mpsc::Receiver<T>,
    control: mpsc::UnboundedReceiver<Control<T>>,
    subscribers: HashMap<u64, mpsc::Sender<T>>,
    cache: ReplayCache<T>,
    token: CancellationToken,
    metrics: Arc<StorageMetrics>,
}

impl<T> Actor<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn run(mut self) {
        loop {
            // control before data: a subscriber change issued before an item
            // was fed takes effect before that item is fanned out
            tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    debug!("broadcaster cancelled");
                    break;
                }
                Some(control) = self.control.recv() => match control {
                    Control::Subscribe(id, tx) => self.add_subscriber(id, tx).await,
                    Control::Unsubscribe(id) => {
                        // the channel closes when `_tx` drops, after the gauge moved
                        if let Some(_tx) = self.subscribers.remove(&id) {
                            self.metrics.watch_subscribers.dec();
                            debug!(subscriber_id = id, "subscriber removed");
                        }
                    }
                },
                item = self.input.recv() => match item {
                    Some(item) => self.fan_out(item),
                    None => {
                        info!("broadcaster input closed");
                        break;
                    }
                }
            }
        }

        self.metrics.watch_subscribers.sub(self.subscribers.len() as i64);
        // dropping the senders closes every subscriber channel
        self.subscribers.clear();
    }

    async fn add_subscriber(
        &mut self,
        id: u64,
        tx: mpsc::Sender<T>,
    ) {
        if let Err(e) = self.cache.read_into(tx.clone()).await {
            warn!(subscriber_id = id, "rejecting subscriber during replay: {}", e);
            return;
        }
        self.subscribers.insert(id, tx);
        self.metrics.watch_subscribers.inc();
        debug!(subscriber_id = id, total = self.subscribers.len(), "subscriber added");
    }

    fn fan_out(
        &mut self,
        item: T,
    ) {
        if let Err(e) = self.cache.add(item.clone()) {
            warn!("replay cache unavailable: {}", e);
        }

        let metrics = &self.metrics;
        self.subscribers.retain(|id, tx| match tx.try_send(item.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(subscriber_id = *id, "slow subscriber dropped");
                metrics.watch_slow_consumer_drops.inc();
                metrics.watch_subscribers.dec();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                trace!(subscriber_id = *id, "subscriber went away");
                metrics.watch_subscribers.dec();
                false
            }
        });
    }
}
