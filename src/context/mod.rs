//! Per-request context — the scope that request-cached values live in.
//!
//! A [`Context`] is created once per logical request or task and handed
//! explicitly to every cached call made on its behalf. Cloning it is cheap and
//! yields another handle to the same scope, so sub-tasks spawned for the same
//! request can share it. Everything stored in the scope is dropped together
//! with the last handle; no cleanup hook is needed.
//!
//! Besides cached values, a scope carries typed request state (the caller's
//! identity, its permissions, whether the request is a broadcast, ...) as
//! [`Extensions`], reachable through [`Context::insert`] and [`Context::get`].

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, Mutex, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};
use tokio::sync::OnceCell;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

impl ScopeId {
    /// Returns the raw numeric id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// Address of one value cell inside a scope: the owning cache and the slot
/// number its directory handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotRef {
    pub(crate) cache: u64,
    pub(crate) slot: u64,
}

/// Type-erased map of value cells — each entry is an `Arc<OnceCell<T>>` for
/// the value type its slot was allocated with.
#[derive(Default)]
struct Cells {
    map: HashMap<SlotRef, Arc<dyn Any + Send + Sync>>,
}

impl Cells {
    fn get<T>(&self, slot: SlotRef) -> Option<Arc<OnceCell<T>>>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&slot)
            .and_then(|cell| Arc::clone(cell).downcast::<OnceCell<T>>().ok())
    }

    fn get_or_insert<T>(&mut self, slot: SlotRef) -> Arc<OnceCell<T>>
    where
        T: Send + Sync + 'static,
    {
        if let Some(cell) = self.get::<T>(slot) {
            return cell;
        }

        let cell = Arc::new(OnceCell::new());
        self.map
            .insert(slot, Arc::clone(&cell) as Arc<dyn Any + Send + Sync>);
        cell
    }

    fn remove_cache(&mut self, cache: u64) -> usize {
        let before = self.map.len();
        self.map.retain(|slot, _| slot.cache != cache);
        before - self.map.len()
    }
}

/// Type-erased map of request state, one value per type.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    /// Create a new empty extensions map
    pub fn new() -> Self {
        return Self {
            map: HashMap::new(),
        };
    }

    /// Insert a value, returning the previous value of the same type
    pub fn insert<T>(&mut self, value: T) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|previous| previous.downcast::<T>().ok())
            .map(|previous| *previous)
    }

    /// Get a value from the extensions map
    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Get a mutable reference to a value from the extensions map
    pub fn get_mut<T>(&mut self) -> Option<&mut T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|value| value.downcast_mut::<T>())
    }

    /// Remove a value from the extensions map
    pub fn remove<T>(&mut self) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

struct Scope {
    id: ScopeId,
    cells: Mutex<Cells>,
    extensions: RwLock<Extensions>,
}

/// Handle to the scope of one logical request or task.
///
/// # Examples
///
/// ```rust
/// use ctxconf::Context;
///
/// let ctx = Context::new();
/// let same = ctx.clone();
/// assert_eq!(ctx.id(), same.id());
/// assert_ne!(ctx.id(), Context::new().id());
/// ```
#[derive(Clone)]
pub struct Context {
    inner: Arc<Scope>,
}

impl Context {
    /// Opens a new, empty scope.
    pub fn new() -> Self {
        return Self {
            inner: Arc::new(Scope {
                id: ScopeId(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed)),
                cells: Mutex::new(Cells::default()),
                extensions: RwLock::new(Extensions::new()),
            }),
        };
    }

    /// Returns the identifier of this scope.
    pub fn id(&self) -> ScopeId {
        self.inner.id
    }

    /// Returns the number of value cells currently allocated in this scope.
    pub fn cell_count(&self) -> usize {
        self.inner.cells.lock().map.len()
    }

    /// Store request state of type `T`, returning the previous value.
    pub fn insert<T>(&self, value: T) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.inner.extensions.write().insert(value)
    }

    /// Borrow the request state of type `T`.
    ///
    /// The returned guard holds a read lock on this scope's extensions; drop
    /// it before calling [`insert`](Self::insert) or [`get_mut`](Self::get_mut).
    pub fn get<T>(&self) -> Option<MappedRwLockReadGuard<'_, T>>
    where
        T: Send + Sync + 'static,
    {
        RwLockReadGuard::try_map(self.inner.extensions.read(), |ext| ext.get::<T>()).ok()
    }

    /// Mutably borrow the request state of type `T`.
    pub fn get_mut<T>(&self) -> Option<MappedRwLockWriteGuard<'_, T>>
    where
        T: Send + Sync + 'static,
    {
        RwLockWriteGuard::try_map(self.inner.extensions.write(), |ext| ext.get_mut::<T>()).ok()
    }

    /// Remove and return the request state of type `T`.
    pub fn remove<T>(&self) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.inner.extensions.write().remove()
    }

    /// Returns `true` if request state of type `T` is present.
    pub fn contains<T>(&self) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.inner.extensions.read().get::<T>().is_some()
    }

    // The lock is only held for the map lookup, never while a value is computed.
    pub(crate) fn cell<T>(&self, slot: SlotRef) -> Arc<OnceCell<T>>
    where
        T: Send + Sync + 'static,
    {
        self.inner.cells.lock().get_or_insert(slot)
    }

    pub(crate) fn existing_cell<T>(&self, slot: SlotRef) -> Option<Arc<OnceCell<T>>>
    where
        T: Send + Sync + 'static,
    {
        self.inner.cells.lock().get(slot)
    }

    pub(crate) fn clear_cache(&self, cache: u64) -> usize {
        self.inner.cells.lock().remove_cache(cache)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .field("cells", &self.cell_count())
            .field("extensions", &self.inner.extensions.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(cache: u64, slot: u64) -> SlotRef {
        SlotRef { cache, slot }
    }

    #[test]
    fn new_contexts_have_distinct_ids() {
        let a = Context::new();
        let b = Context::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn clone_shares_scope() {
        let a = Context::new();
        let b = a.clone();
        assert_eq!(a.id(), b.id());

        let cell = a.cell::<u32>(slot(1, 1));
        cell.set(7).unwrap();
        assert_eq!(b.existing_cell::<u32>(slot(1, 1)).unwrap().get(), Some(&7));
    }

    #[test]
    fn cell_is_allocated_once() {
        let ctx = Context::new();
        let first = ctx.cell::<String>(slot(1, 1));
        let second = ctx.cell::<String>(slot(1, 1));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(ctx.cell_count(), 1);
    }

    #[test]
    fn existing_cell_does_not_allocate() {
        let ctx = Context::new();
        assert!(ctx.existing_cell::<u8>(slot(1, 1)).is_none());
        assert_eq!(ctx.cell_count(), 0);
    }

    #[test]
    fn type_mismatch_replaces_cell() {
        let ctx = Context::new();
        ctx.cell::<u32>(slot(1, 1)).set(1).unwrap();
        let other = ctx.cell::<String>(slot(1, 1));
        assert!(other.get().is_none());
        assert!(ctx.existing_cell::<u32>(slot(1, 1)).is_none());
    }

    #[test]
    fn clear_cache_only_touches_that_cache() {
        let ctx = Context::new();
        ctx.cell::<u32>(slot(1, 1));
        ctx.cell::<u32>(slot(1, 2));
        ctx.cell::<u32>(slot(2, 1));

        assert_eq!(ctx.clear_cache(1), 2);
        assert_eq!(ctx.cell_count(), 1);
        assert!(ctx.existing_cell::<u32>(slot(2, 1)).is_some());
        assert_eq!(ctx.clear_cache(1), 0);
    }

    // ── Extensions ────────────────────────────────────────────────────────────

    #[derive(Debug, Clone, PartialEq)]
    struct CurrentUser(String);

    #[derive(Debug, Clone, PartialEq)]
    struct Rbac {
        mode: &'static str,
        resources: Vec<String>,
    }

    #[test]
    fn extensions_insert_get_remove() {
        let mut ext = Extensions::new();
        assert!(ext.is_empty());
        assert_eq!(ext.insert(CurrentUser("wazuh".to_owned())), None);
        assert_eq!(ext.get::<CurrentUser>(), Some(&CurrentUser("wazuh".to_owned())));

        ext.get_mut::<CurrentUser>().unwrap().0.push_str("-wui");
        assert_eq!(ext.remove::<CurrentUser>(), Some(CurrentUser("wazuh-wui".to_owned())));
        assert!(ext.get::<CurrentUser>().is_none());
    }

    #[test]
    fn extensions_insert_replaces_same_type() {
        let mut ext = Extensions::new();
        ext.insert(7u32);
        assert_eq!(ext.insert(8u32), Some(7));
        ext.insert(true);
        assert_eq!(ext.len(), 2);
    }

    #[test]
    fn context_state_is_shared_by_clones() {
        let ctx = Context::new();
        let handle = ctx.clone();
        ctx.insert(CurrentUser("admin".to_owned()));

        assert_eq!(*handle.get::<CurrentUser>().unwrap(), CurrentUser("admin".to_owned()));
        assert!(handle.contains::<CurrentUser>());
        assert!(!handle.contains::<Rbac>());
    }

    #[test]
    fn context_state_is_per_scope() {
        let a = Context::new();
        let b = Context::new();
        a.insert(Rbac {
            mode: "white",
            resources: vec!["agent:id:001".to_owned()],
        });

        assert!(a.get::<Rbac>().is_some());
        assert!(b.get::<Rbac>().is_none());
    }

    #[test]
    fn context_state_get_mut_and_remove() {
        let ctx = Context::new();
        ctx.insert(Rbac {
            mode: "black",
            resources: Vec::new(),
        });

        ctx.get_mut::<Rbac>()
            .unwrap()
            .resources
            .push("group:id:default".to_owned());
        assert_eq!(ctx.get::<Rbac>().unwrap().resources.len(), 1);

        let removed = ctx.remove::<Rbac>().unwrap();
        assert_eq!(removed.mode, "black");
        assert!(!ctx.contains::<Rbac>());
        assert!(ctx.get_mut::<Rbac>().is_none());
    }

    #[test]
    fn state_and_cached_values_are_independent() {
        let ctx = Context::new();
        ctx.cell::<u32>(slot(1, 1)).set(3).unwrap();
        ctx.insert(5u32);

        ctx.clear_cache(1);
        assert_eq!(*ctx.get::<u32>().unwrap(), 5);
        assert_eq!(ctx.cell_count(), 0);
    }

    #[test]
    fn display_scope_id() {
        let ctx = Context::new();
        assert_eq!(ctx.id().to_string(), format!("scope-{}", ctx.id().as_u64()));
    }
}
