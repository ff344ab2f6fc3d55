//! Live query handles.
//!
//! A `LiveQuery` owns one subscription: a query function evaluated against a
//! context and a key, re-evaluated whenever the registry routes a matching
//! change set to it. Results are published through a `tokio::sync::watch`
//! channel, so a consumer always sees the latest state and never a backlog.

use crate::change_set::Dependency;
use crate::notify::{QueryRegistry, RegistryInner, Subscriber, SubscriptionId};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::trace;

/// Future returned by a live query function.
pub type QueryFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'static>>;

pub(crate) type QueryFn<C, K, T, E> = Arc<dyn Fn(C, K) -> QueryFuture<T, E> + Send + Sync>;
pub(crate) type DepsFn<K> = Arc<dyn Fn(&K) -> Vec<Dependency> + Send + Sync>;

/// The observable state of a live query.
#[derive(Debug, PartialEq)]
pub enum LiveState<T, E> {
    /// No result has been delivered yet.
    Pending,
    Ready(T),
    Failed(Arc<E>),
}

impl<T: Clone, E> Clone for LiveState<T, E> {
    fn clone(&self) -> Self {
        match self {
            LiveState::Pending => LiveState::Pending,
            LiveState::Ready(value) => LiveState::Ready(value.clone()),
            LiveState::Failed(err) => LiveState::Failed(err.clone()),
        }
    }
}

impl<T, E> LiveState<T, E> {
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, LiveState::Pending)
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, LiveState::Ready(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            LiveState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            LiveState::Failed(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            LiveState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// One evaluation context: a key, its dependencies and the published state.
pub(crate) struct Subscription<C, K, T, E> {
    ctx: C,
    key: K,
    dependencies: Vec<Dependency>,
    query: QueryFn<C, K, T, E>,
    handle: Handle,
    cancelled: AtomicBool,
    /// Generation of the most recently started evaluation.
    started: AtomicU64,
    /// Generation of the most recently published evaluation.
    published: Mutex<u64>,
    tx: watch::Sender<LiveState<T, E>>,
}

impl<C, K, T, E> Subscription<C, K, T, E>
where
    C: Clone + Send + Sync + 'static,
    K: Clone + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn evaluate(self: Arc<Self>) {
        if self.is_cancelled() {
            return;
        }
        let generation = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = self.handle.clone();
        handle.spawn(async move {
            let result = (self.query)(self.ctx.clone(), self.key.clone()).await;
            self.publish(generation, result);
        });
    }

    fn publish(&self, generation: u64, result: Result<T, E>) {
        // `cancel` takes the same lock, so no result lands after it returns.
        let mut published = self.published.lock();
        if self.is_cancelled() {
            trace!(generation, "dropping result of cancelled live query");
            return;
        }
        if generation < *published {
            trace!(generation, latest = *published, "dropping stale live query result");
            return;
        }
        *published = generation;

        match result {
            Ok(value) => {
                self.tx.send_if_modified(|state| match state {
                    LiveState::Ready(current) if *current == value => false,
                    _ => {
                        *state = LiveState::Ready(value);
                        true
                    }
                });
            }
            Err(err) => {
                self.tx.send_replace(LiveState::Failed(Arc::new(err)));
            }
        }
    }
}

impl<C, K, T, E> Subscription<C, K, T, E> {
    fn cancel(&self) {
        let _published = self.published.lock();
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl<C, K, T, E> Subscriber for Subscription<C, K, T, E>
where
    C: Clone + Send + Sync + 'static,
    K: Clone + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn refresh(self: Arc<Self>) {
        self.evaluate();
    }
}

/// Handle to a running live query.
///
/// Dropping the handle cancels the query.
pub struct LiveQuery<C, K, T, E> {
    registry: Weak<RegistryInner>,
    id: SubscriptionId,
    dependencies_of: DepsFn<K>,
    subscription: Arc<Subscription<C, K, T, E>>,
    rx: watch::Receiver<LiveState<T, E>>,
}

impl<C, K, T, E> LiveQuery<C, K, T, E>
where
    C: Clone + Send + Sync + 'static,
    K: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    pub(crate) fn start(
        registry: QueryRegistry,
        ctx: C,
        key: K,
        dependencies_of: DepsFn<K>,
        query: QueryFn<C, K, T, E>,
        handle: Handle,
    ) -> Self {
        let (subscription, rx) = Self::spawn_subscription(ctx, key, &dependencies_of, query, handle);
        let id = registry.register(&subscription);
        subscription.clone().evaluate();
        Self {
            registry: registry.downgrade(),
            id,
            dependencies_of,
            subscription,
            rx,
        }
    }

    fn spawn_subscription(
        ctx: C,
        key: K,
        dependencies_of: &DepsFn<K>,
        query: QueryFn<C, K, T, E>,
        handle: Handle,
    ) -> (Arc<Subscription<C, K, T, E>>, watch::Receiver<LiveState<T, E>>) {
        let (tx, rx) = watch::channel(LiveState::Pending);
        let subscription = Arc::new(Subscription {
            dependencies: dependencies_of(&key),
            ctx,
            key,
            query,
            handle,
            cancelled: AtomicBool::new(false),
            started: AtomicU64::new(0),
            published: Mutex::new(0),
            tx,
        });
        (subscription, rx)
    }

    /// Returns the registry id of the current subscription.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    #[inline]
    pub fn key(&self) -> &K {
        &self.subscription.key
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.subscription.dependencies
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> LiveState<T, E> {
        self.rx.borrow().clone()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.subscription.is_cancelled()
    }

    /// Waits for the next delivered state.
    ///
    /// Returns `None` once the query is cancelled.
    pub async fn changed(&mut self) -> Option<LiveState<T, E>> {
        if self.is_cancelled() {
            return None;
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Waits until the query has left `Pending` and returns that state.
    pub async fn ready(&mut self) -> LiveState<T, E> {
        match self.rx.wait_for(|state| !state.is_pending()).await {
            Ok(state) => state.clone(),
            Err(_) => LiveState::Pending,
        }
    }

    /// Switches the query to a new key.
    ///
    /// A different key tears down the current subscription and starts a fresh
    /// one from `Pending`. The same key is a no-op.
    pub fn set_key(&mut self, key: K) {
        if *self.key() == key || self.is_cancelled() {
            return;
        }
        let Some(inner) = self.registry.upgrade() else {
            return;
        };
        self.subscription.cancel();
        inner.unregister(self.id);

        let current = &self.subscription;
        let (subscription, rx) = Self::spawn_subscription(
            current.ctx.clone(),
            key,
            &self.dependencies_of,
            current.query.clone(),
            current.handle.clone(),
        );
        let registry = QueryRegistry::from_inner(inner);
        self.id = registry.register(&subscription);
        subscription.clone().evaluate();
        self.subscription = subscription;
        self.rx = rx;
    }

    /// Stops the query. No state is delivered afterwards.
    pub fn cancel(&mut self) {
        self.subscription.cancel();
        if let Some(inner) = self.registry.upgrade() {
            inner.unregister(self.id);
        }
    }
}

impl<C, K, T, E> Drop for LiveQuery<C, K, T, E> {
    fn drop(&mut self) {
        self.subscription.cancel();
        if let Some(inner) = self.registry.upgrade() {
            inner.unregister(self.id);
        }
    }
}

impl<C, K: fmt::Debug, T, E> fmt::Debug for LiveQuery<C, K, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveQuery")
            .field("id", &self.id)
            .field("key", &self.subscription.key)
            .field("cancelled", &self.subscription.cancelled.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChangeSet;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    struct Boom;

    /// Context shared by the test queries: a value per owner and a counter.
    #[derive(Clone, Default)]
    struct Ctx {
        values: Arc<Mutex<hashbrown::HashMap<String, i64>>>,
        evaluations: Arc<AtomicUsize>,
    }

    impl Ctx {
        fn set(&self, owner: &str, value: i64) {
            self.values.lock().insert(owner.to_owned(), value);
        }

        fn evaluations(&self) -> usize {
            self.evaluations.load(Ordering::SeqCst)
        }
    }

    fn live_value(registry: &QueryRegistry, ctx: &Ctx, owner: &str) -> LiveQuery<Ctx, String, i64, Boom> {
        registry.subscribe(
            ctx.clone(),
            owner.to_owned(),
            |owner: &String| vec![Dependency::owned("incidents", owner.clone())],
            |ctx: Ctx, owner: String| -> QueryFuture<i64, Boom> {
                Box::pin(async move {
                    ctx.evaluations.fetch_add(1, Ordering::SeqCst);
                    match ctx.values.lock().get(&owner) {
                        Some(v) if *v < 0 => Err(Boom),
                        Some(v) => Ok(*v),
                        None => Ok(0),
                    }
                })
            },
        )
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_pending_then_ready() {
        let registry = QueryRegistry::new();
        let ctx = Ctx::default();
        ctx.set("A", 3);

        let mut live = live_value(&registry, &ctx, "A");
        assert!(live.state().is_pending());
        assert_eq!(live.ready().await.into_value(), Some(3));
        assert_eq!(registry.query_count(), 1);
    }

    #[tokio::test]
    async fn test_redelivers_after_commit() {
        let registry = QueryRegistry::new();
        let ctx = Ctx::default();
        let mut live = live_value(&registry, &ctx, "A");
        live.ready().await;

        ctx.set("A", 7);
        registry.on_commit(ChangeSet::new().with("incidents", Some("A")));
        let state = live.changed().await.and_then(LiveState::into_value);
        assert_eq!(state, Some(7));
    }

    #[tokio::test]
    async fn test_unchanged_value_not_redelivered() {
        let registry = QueryRegistry::new();
        let ctx = Ctx::default();
        ctx.set("A", 1);
        let mut live = live_value(&registry, &ctx, "A");
        live.ready().await;
        live.rx.borrow_and_update();

        registry.on_commit(ChangeSet::new().with("incidents", Some("A")));
        settle().await;
        assert_eq!(ctx.evaluations(), 2);
        assert!(!live.rx.has_changed().unwrap_or(true));
    }

    #[tokio::test]
    async fn test_unrelated_owner_does_not_rerun() {
        let registry = QueryRegistry::new();
        let ctx = Ctx::default();
        let mut live = live_value(&registry, &ctx, "A");
        live.ready().await;

        registry.on_commit(ChangeSet::new().with("incidents", Some("B")));
        settle().await;
        assert_eq!(ctx.evaluations(), 1);
    }

    #[tokio::test]
    async fn test_burst_of_commits_reruns_once() {
        let registry = QueryRegistry::new();
        let ctx = Ctx::default();
        let mut live = live_value(&registry, &ctx, "A");
        live.ready().await;

        for v in 1..=5 {
            ctx.set("A", v);
            registry.on_commit(ChangeSet::new().with("incidents", Some("A")));
        }
        settle().await;
        assert_eq!(ctx.evaluations(), 2);
        assert_eq!(live.state().into_value(), Some(5));
    }

    #[tokio::test]
    async fn test_failure_is_published() {
        let registry = QueryRegistry::new();
        let ctx = Ctx::default();
        ctx.set("A", -1);
        let mut live = live_value(&registry, &ctx, "A");
        assert_eq!(live.ready().await.error(), Some(&Boom));
    }

    #[tokio::test]
    async fn test_cancel_stops_delivery() {
        let registry = QueryRegistry::new();
        let ctx = Ctx::default();
        let mut live = live_value(&registry, &ctx, "A");
        live.ready().await;

        live.cancel();
        assert!(live.is_cancelled());
        assert!(registry.is_empty());

        ctx.set("A", 9);
        registry.on_commit(ChangeSet::new().with("incidents", Some("A")));
        settle().await;
        assert_eq!(ctx.evaluations(), 1);
        assert_eq!(live.changed().await, None);
        assert_eq!(live.state().into_value(), Some(0));
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let registry = QueryRegistry::new();
        let ctx = Ctx::default();
        let live = live_value(&registry, &ctx, "A");
        assert_eq!(registry.query_count(), 1);
        drop(live);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_set_key_restarts_from_pending() {
        let registry = QueryRegistry::new();
        let ctx = Ctx::default();
        ctx.set("A", 1);
        ctx.set("B", 2);
        let mut live = live_value(&registry, &ctx, "A");
        live.ready().await;
        let first_id = live.id();

        live.set_key("A".to_owned());
        assert_eq!(live.id(), first_id);

        live.set_key("B".to_owned());
        assert_ne!(live.id(), first_id);
        assert!(live.state().is_pending());
        assert_eq!(live.key(), "B");
        assert_eq!(live.dependencies(), &[Dependency::owned("incidents", "B")]);
        assert_eq!(live.ready().await.into_value(), Some(2));
        assert_eq!(registry.query_count(), 1);

        ctx.set("A", 5);
        registry.on_commit(ChangeSet::new().with("incidents", Some("A")));
        settle().await;
        assert_eq!(live.state().into_value(), Some(2));
    }

    fn manual_subscription(
        rt: &tokio::runtime::Runtime,
    ) -> (Subscription<(), (), i64, Boom>, watch::Receiver<LiveState<i64, Boom>>) {
        let (tx, rx) = watch::channel(LiveState::Pending);
        let query: QueryFn<(), (), i64, Boom> =
            Arc::new(|_: (), _: ()| -> QueryFuture<i64, Boom> { Box::pin(async { Ok(0) }) });
        let sub = Subscription {
            ctx: (),
            key: (),
            dependencies: Vec::new(),
            query,
            handle: rt.handle().clone(),
            cancelled: AtomicBool::new(false),
            started: AtomicU64::new(2),
            published: Mutex::new(0),
            tx,
        };
        (sub, rx)
    }

    #[test]
    fn test_stale_generation_dropped() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let (sub, rx) = manual_subscription(&rt);

        sub.publish(2, Ok(20));
        sub.publish(1, Ok(10));
        assert_eq!(rx.borrow().value(), Some(&20));
    }

    #[test]
    fn test_in_flight_result_dropped_after_cancel() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let (sub, rx) = manual_subscription(&rt);
        sub.publish(1, Ok(1));

        sub.cancel();
        sub.publish(2, Ok(2));
        sub.publish(3, Err(Boom));
        assert_eq!(rx.borrow().value(), Some(&1));
    }

    #[test]
    fn test_cancel_races_with_publish() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        for _ in 0..200 {
            let (sub, rx) = manual_subscription(&rt);
            let sub = Arc::new(sub);
            let publisher = {
                let sub = Arc::clone(&sub);
                std::thread::spawn(move || {
                    for generation in 1..=50 {
                        sub.publish(generation, Ok(generation as i64));
                    }
                })
            };
            sub.cancel();
            let seen_at_cancel = rx.borrow().clone();
            publisher.join().unwrap();
            assert_eq!(*rx.borrow(), seen_at_cancel);
        }
    }
}
