//! Query registry and notification system.
//!
//! This module provides `QueryRegistry` which tracks live queries and routes
//! committed change sets to the ones that depend on the touched data.

use crate::change_set::{ChangeSet, Dependency};
use crate::observable::{LiveQuery, QueryFn, Subscription};
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tracing::trace;

/// Unique identifier for a registered live query.
pub type SubscriptionId = u64;

/// Something the registry can re-run.
pub(crate) trait Subscriber: Send + Sync {
    fn dependencies(&self) -> &[Dependency];
    fn is_cancelled(&self) -> bool;
    /// Schedules a re-evaluation.
    fn refresh(self: Arc<Self>);
}

#[derive(Default)]
struct PendingFlush {
    changes: ChangeSet,
    scheduled: bool,
}

#[derive(Default)]
pub(crate) struct RegistryInner {
    subscriptions: Mutex<HashMap<SubscriptionId, Weak<dyn Subscriber>>>,
    pending: Mutex<PendingFlush>,
    next_id: AtomicU64,
    runtime: Option<Handle>,
}

impl RegistryInner {
    pub(crate) fn unregister(&self, id: SubscriptionId) -> bool {
        self.subscriptions.lock().remove(&id).is_some()
    }

    fn flush(&self) -> usize {
        let changes = {
            let mut pending = self.pending.lock();
            pending.scheduled = false;
            std::mem::take(&mut pending.changes)
        };
        if changes.is_empty() {
            return 0;
        }

        let mut due = Vec::new();
        self.subscriptions.lock().retain(|_, weak| match weak.upgrade() {
            Some(sub) if !sub.is_cancelled() => {
                if changes.affects_any(sub.dependencies()) {
                    due.push(sub);
                }
                true
            }
            _ => false,
        });

        trace!(tables = changes.len(), rerun = due.len(), "reactive flush");
        let rerun = due.len();
        for sub in due {
            sub.refresh();
        }
        rerun
    }
}

/// A registry that tracks live queries and re-runs them after commits.
///
/// Commits are coalesced: every change set handed to `on_commit` before the
/// scheduled flush runs is merged, and each affected live query re-runs once.
///
/// # Example
///
/// ```rust
/// use pawtrack_reactive::{ChangeSet, Dependency, QueryFuture, QueryRegistry};
/// use std::convert::Infallible;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let registry = QueryRegistry::new();
/// let mut live = registry.subscribe(
///     (),
///     "dog-1".to_string(),
///     |owner: &String| vec![Dependency::owned("incidents", owner.clone())],
///     |_: (), owner: String| -> QueryFuture<usize, Infallible> {
///         Box::pin(async move { Ok(owner.len()) })
///     },
/// );
/// assert_eq!(live.ready().await.value(), Some(&5));
///
/// registry.on_commit(ChangeSet::new().with("incidents", Some("dog-1")));
/// # }
/// ```
#[derive(Clone, Default)]
pub struct QueryRegistry {
    inner: Arc<RegistryInner>,
}

impl QueryRegistry {
    /// Creates a new query registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry whose live queries and flushes run on `runtime`,
    /// so it can be used from threads outside that runtime.
    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                runtime: Some(runtime),
                ..RegistryInner::default()
            }),
        }
    }

    /// The runtime bound at construction, else the current one.
    fn runtime(&self) -> Option<Handle> {
        self.inner
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
    }

    /// Starts a live query and returns its handle.
    ///
    /// `dependencies` maps the key to the data the query reads; `query` runs
    /// against `ctx` and the key. The first evaluation starts immediately.
    ///
    /// # Panics
    ///
    /// Panics if the registry has no bound runtime and is called outside of a
    /// tokio runtime.
    pub fn subscribe<C, K, T, E, D, Q>(
        &self,
        ctx: C,
        key: K,
        dependencies: D,
        query: Q,
    ) -> LiveQuery<C, K, T, E>
    where
        C: Clone + Send + Sync + 'static,
        K: Clone + PartialEq + Send + Sync + 'static,
        T: Clone + PartialEq + Send + Sync + 'static,
        E: Send + Sync + 'static,
        D: Fn(&K) -> Vec<Dependency> + Send + Sync + 'static,
        Q: Fn(C, K) -> crate::QueryFuture<T, E> + Send + Sync + 'static,
    {
        LiveQuery::start(
            self.clone(),
            ctx,
            key,
            Arc::new(dependencies),
            Arc::new(query) as QueryFn<C, K, T, E>,
            self.runtime().unwrap_or_else(Handle::current),
        )
    }

    pub(crate) fn register<C, K, T, E>(&self, sub: &Arc<Subscription<C, K, T, E>>) -> SubscriptionId
    where
        C: Clone + Send + Sync + 'static,
        K: Clone + Send + Sync + 'static,
        T: Clone + PartialEq + Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let sub: Arc<dyn Subscriber> = sub.clone();
        self.inner
            .subscriptions
            .lock()
            .insert(id, Arc::downgrade(&sub));
        id
    }

    pub(crate) fn from_inner(inner: Arc<RegistryInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<RegistryInner> {
        Arc::downgrade(&self.inner)
    }

    /// Unregisters a live query by ID.
    ///
    /// Returns true if the query was found and removed.
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        self.inner.unregister(id)
    }

    /// Records a committed change set and schedules a flush.
    ///
    /// With a runtime (bound or current) the flush runs on a spawned task after
    /// yielding once, so commits issued back to back share one flush. Without
    /// one the flush runs before this returns.
    pub fn on_commit(&self, changes: ChangeSet) {
        if changes.is_empty() {
            return;
        }
        let schedule = {
            let mut pending = self.inner.pending.lock();
            pending.changes.merge(changes);
            !std::mem::replace(&mut pending.scheduled, true)
        };
        if !schedule {
            return;
        }

        match self.runtime() {
            Some(handle) => {
                let inner = self.inner.clone();
                handle.spawn(async move {
                    tokio::task::yield_now().await;
                    inner.flush();
                });
            }
            None => {
                self.inner.flush();
            }
        }
    }

    /// Drains pending changes now. Returns the number of live queries re-run.
    pub fn flush(&self) -> usize {
        self.inner.flush()
    }

    /// Returns true if changes are waiting for a flush.
    pub fn has_pending(&self) -> bool {
        !self.inner.pending.lock().changes.is_empty()
    }

    /// Returns the number of registered live queries.
    pub fn query_count(&self) -> usize {
        self.inner.subscriptions.lock().len()
    }

    /// Returns true if there are no registered live queries.
    pub fn is_empty(&self) -> bool {
        self.query_count() == 0
    }

    /// Returns the number of live queries depending on a table.
    pub fn queries_for_table(&self, table: &str) -> usize {
        self.inner
            .subscriptions
            .lock()
            .values()
            .filter_map(Weak::upgrade)
            .filter(|sub| !sub.is_cancelled() && sub.dependencies().iter().any(|d| d.table == table))
            .count()
    }

    /// Drops entries whose live query has gone away.
    pub fn cleanup(&self) {
        self.inner
            .subscriptions
            .lock()
            .retain(|_, weak| weak.upgrade().is_some_and(|sub| !sub.is_cancelled()));
    }

    /// Clears all registered live queries and pending changes.
    pub fn clear(&self) {
        self.inner.subscriptions.lock().clear();
        *self.inner.pending.lock() = PendingFlush::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;

    struct Watcher {
        deps: Vec<Dependency>,
        cancelled: AtomicBool,
        refreshes: AtomicUsize,
    }

    impl Watcher {
        fn new(deps: Vec<Dependency>) -> Arc<Self> {
            Arc::new(Self {
                deps,
                cancelled: AtomicBool::new(false),
                refreshes: AtomicUsize::new(0),
            })
        }

        fn refreshes(&self) -> usize {
            self.refreshes.load(Ordering::SeqCst)
        }
    }

    impl Subscriber for Watcher {
        fn dependencies(&self) -> &[Dependency] {
            &self.deps
        }

        fn is_cancelled(&self) -> bool {
            self.cancelled.load(Ordering::SeqCst)
        }

        fn refresh(self: Arc<Self>) {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn attach(registry: &QueryRegistry, watcher: &Arc<Watcher>) -> SubscriptionId {
        let id = registry.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let sub: Arc<dyn Subscriber> = watcher.clone();
        registry
            .inner
            .subscriptions
            .lock()
            .insert(id, Arc::downgrade(&sub));
        id
    }

    #[test]
    fn test_query_registry_new() {
        let registry = QueryRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.query_count(), 0);
        assert!(!registry.has_pending());
    }

    #[test]
    fn test_flush_inline_without_runtime() {
        let registry = QueryRegistry::new();
        let watcher = Watcher::new(vec![Dependency::owned("incidents", "A")]);
        attach(&registry, &watcher);

        registry.on_commit(ChangeSet::new().with("incidents", Some("A")));
        assert_eq!(watcher.refreshes(), 1);
        assert!(!registry.has_pending());
    }

    #[test]
    fn test_unrelated_owner_not_refreshed() {
        let registry = QueryRegistry::new();
        let a = Watcher::new(vec![Dependency::owned("incidents", "A")]);
        let all = Watcher::new(vec![Dependency::table("incidents")]);
        attach(&registry, &a);
        attach(&registry, &all);

        registry.on_commit(ChangeSet::new().with("incidents", Some("B")));
        assert_eq!(a.refreshes(), 0);
        assert_eq!(all.refreshes(), 1);
    }

    #[test]
    fn test_queries_for_table() {
        let registry = QueryRegistry::new();
        let p1 = Watcher::new(vec![Dependency::table("incidents")]);
        let p2 = Watcher::new(vec![Dependency::owned("incidents", "A")]);
        let p3 = Watcher::new(vec![Dependency::table("settings")]);
        for p in [&p1, &p2, &p3] {
            attach(&registry, p);
        }
        assert_eq!(registry.query_count(), 3);
        assert_eq!(registry.queries_for_table("incidents"), 2);
        assert_eq!(registry.queries_for_table("settings"), 1);
        assert_eq!(registry.queries_for_table("departures"), 0);
    }

    #[test]
    fn test_dropped_and_cancelled_are_removed() {
        let registry = QueryRegistry::new();
        let kept = Watcher::new(vec![Dependency::table("incidents")]);
        let dropped = Watcher::new(vec![Dependency::table("incidents")]);
        let cancelled = Watcher::new(vec![Dependency::table("incidents")]);
        attach(&registry, &kept);
        attach(&registry, &dropped);
        attach(&registry, &cancelled);

        drop(dropped);
        cancelled.cancelled.store(true, Ordering::SeqCst);
        registry.cleanup();
        assert_eq!(registry.query_count(), 1);

        registry.on_commit(ChangeSet::new().with("incidents", None));
        assert_eq!(kept.refreshes(), 1);
        assert_eq!(cancelled.refreshes(), 0);
    }

    #[test]
    fn test_unregister() {
        let registry = QueryRegistry::new();
        let watcher = Watcher::new(vec![Dependency::table("incidents")]);
        let id = attach(&registry, &watcher);
        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));

        registry.on_commit(ChangeSet::new().with("incidents", None));
        assert_eq!(watcher.refreshes(), 0);
    }

    #[tokio::test]
    async fn test_commits_in_one_tick_coalesce() {
        let registry = QueryRegistry::new();
        let watcher = Watcher::new(vec![Dependency::owned("incidents", "A")]);
        attach(&registry, &watcher);

        registry.on_commit(ChangeSet::new().with("incidents", Some("A")));
        registry.on_commit(ChangeSet::new().with("incidents", Some("A")));
        registry.on_commit(ChangeSet::new().with("departures", Some("A")));
        assert!(registry.has_pending());
        assert_eq!(watcher.refreshes(), 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(watcher.refreshes(), 1);
        assert!(!registry.has_pending());
    }

    fn doubled(registry: &QueryRegistry) -> crate::LiveQuery<(), u32, u32, std::convert::Infallible> {
        registry.subscribe(
            (),
            2,
            |_: &u32| vec![Dependency::table("incidents")],
            |_: (), n: u32| -> crate::QueryFuture<u32, std::convert::Infallible> {
                Box::pin(async move { Ok(n * 2) })
            },
        )
    }

    #[test]
    fn test_bound_runtime_serves_other_threads() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let registry = QueryRegistry::with_runtime(rt.handle().clone());

        let mut live = doubled(&registry);
        assert_eq!(rt.block_on(live.ready()).into_value(), Some(4));

        let watcher = Watcher::new(vec![Dependency::table("incidents")]);
        attach(&registry, &watcher);
        registry.on_commit(ChangeSet::new().with("incidents", None));
        for _ in 0..100 {
            if watcher.refreshes() == 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(watcher.refreshes(), 1);
    }

    #[test]
    #[should_panic]
    fn test_subscribe_without_runtime_panics() {
        let registry = QueryRegistry::new();
        let _live = doubled(&registry);
    }

    #[tokio::test]
    async fn test_explicit_flush() {
        let registry = QueryRegistry::new();
        let watcher = Watcher::new(vec![Dependency::table("settings")]);
        attach(&registry, &watcher);

        registry.on_commit(ChangeSet::new().with("settings", Some("A")));
        assert_eq!(registry.flush(), 1);
        assert_eq!(watcher.refreshes(), 1);

        // The spawned flush finds nothing left to do.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(watcher.refreshes(), 1);
    }
}
