//! Slot directory shared by every scope of one request cache.

use std::any::{TypeId, type_name};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::debug;

use super::{CacheKey, Memoized, MemoizedAsync};
use crate::context::{Context, SlotRef};

static NEXT_CACHE_ID: AtomicU64 = AtomicU64::new(1);

static GLOBAL: Lazy<RequestCache> = Lazy::new(RequestCache::new);

// A slot is identified by the call key and the type of value it stores, so two
// wrappers that happen to share a key but return different types never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SlotKey {
    key: CacheKey,
    value_type: TypeId,
}

/// Read-only description of one directory slot, as returned by
/// [`RequestCache::inspect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    /// Slot number, unique within its cache and increasing in allocation order.
    pub id: u64,
    /// Logical name the slot's wrapper was created with.
    pub name: Arc<str>,
    /// Encoded call key.
    pub key: CacheKey,
    /// Name of the cached value type.
    pub value_type: &'static str,
}

struct Directory {
    id: u64,
    slots: DashMap<SlotKey, SlotInfo>,
    next_slot: AtomicU64,
}

/// Request-scoped memoization cache.
///
/// The cache owns the key → slot directory; the values themselves live in
/// each [`Context`], so concurrent requests share slots but never values.
/// Cloning is cheap and shares the same directory.
///
/// The directory only grows: slots are never evicted, only their per-scope
/// values are reset.
///
/// ## Example
///
/// ```rust
/// use std::convert::Infallible;
/// use ctxconf::{Context, RequestCache};
///
/// let cache = RequestCache::new();
/// let double = cache.wrap("double", |n: u32| Ok::<_, Infallible>(n * 2));
///
/// let ctx = Context::new();
/// assert_eq!(double.call(&ctx, 21).unwrap(), 42);
/// assert_eq!(cache.len(), 1);
///
/// cache.reset(&ctx);
/// assert!(!cache.is_cached::<u32, _>(&ctx, "double", &21));
/// ```
#[derive(Clone)]
pub struct RequestCache {
    inner: Arc<Directory>,
}

impl RequestCache {
    /// Create a new cache with an empty directory.
    pub fn new() -> Self {
        let id = NEXT_CACHE_ID.fetch_add(1, Ordering::Relaxed);
        debug!(cache = id, "request cache created");
        return Self {
            inner: Arc::new(Directory {
                id,
                slots: DashMap::new(),
                next_slot: AtomicU64::new(1),
            }),
        };
    }

    /// The process-wide cache, created on first use.
    pub fn global() -> &'static RequestCache {
        &GLOBAL
    }

    /// Wrap a synchronous, fallible computation.
    ///
    /// See [`Memoized::call`] for the call semantics.
    pub fn wrap<F>(&self, name: impl Into<Arc<str>>, func: F) -> Memoized<F> {
        Memoized::new(self.clone(), name.into(), func)
    }

    /// Wrap an asynchronous, fallible computation.
    ///
    /// See [`MemoizedAsync::call`] for the call semantics.
    pub fn wrap_async<F>(&self, name: impl Into<Arc<str>>, func: F) -> MemoizedAsync<F> {
        MemoizedAsync::new(self.clone(), name.into(), func)
    }

    /// Drop every value this cache stored in `ctx`.
    ///
    /// The directory is left untouched and calling this again is a no-op.
    pub fn reset(&self, ctx: &Context) {
        let cleared = ctx.clear_cache(self.inner.id);
        debug!(cache = self.inner.id, scope = %ctx.id(), cleared, "request cache reset");
    }

    /// Snapshot of the directory, ordered by slot id.
    pub fn inspect(&self) -> Vec<SlotInfo> {
        let mut slots: Vec<SlotInfo> = self
            .inner
            .slots
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        slots.sort_by_key(|slot| slot.id);
        slots
    }

    /// Number of slots in the directory.
    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    /// Returns `true` if no slot has been allocated yet.
    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }

    /// Returns `true` if `ctx` currently holds a value of type `T` for the
    /// call `name(args)`. Never allocates a slot.
    pub fn is_cached<T, A>(&self, ctx: &Context, name: &str, args: &A) -> bool
    where
        T: Send + Sync + 'static,
        A: Serialize + ?Sized,
    {
        let Ok(key) = CacheKey::encode(name, args) else {
            return false;
        };
        let lookup = SlotKey {
            key,
            value_type: TypeId::of::<T>(),
        };
        let Some(slot) = self.inner.slots.get(&lookup).map(|info| info.id) else {
            return false;
        };

        ctx.existing_cell::<T>(self.slot_ref(slot))
            .is_some_and(|cell| cell.initialized())
    }

    // Find or allocate the slot for `key` holding values of type `T`.
    pub(crate) fn slot<T>(&self, name: &Arc<str>, key: CacheKey) -> SlotRef
    where
        T: 'static,
    {
        let lookup = SlotKey {
            key,
            value_type: TypeId::of::<T>(),
        };
        if let Some(info) = self.inner.slots.get(&lookup) {
            return self.slot_ref(info.id);
        }

        let info = self
            .inner
            .slots
            .entry(lookup.clone())
            .or_insert_with(|| {
                let id = self.inner.next_slot.fetch_add(1, Ordering::Relaxed);
                debug!(cache = self.inner.id, slot = id, name = %name, key = %lookup.key, "allocated request cache slot");
                SlotInfo {
                    id,
                    name: Arc::clone(name),
                    key: lookup.key.clone(),
                    value_type: type_name::<T>(),
                }
            });
        self.slot_ref(info.id)
    }

    fn slot_ref(&self, slot: u64) -> SlotRef {
        SlotRef {
            cache: self.inner.id,
            slot,
        }
    }
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCache")
            .field("id", &self.inner.id)
            .field("slots", &self.inner.slots.len())
            .finish()
    }
}
