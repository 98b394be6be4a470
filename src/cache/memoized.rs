//! Memoizing wrappers returned by [`RequestCache::wrap`] and
//! [`RequestCache::wrap_async`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace, warn};

use super::{CacheKey, RequestCache};
use crate::context::Context;

/// A synchronous computation memoized per request scope.
///
/// Created with [`RequestCache::wrap`].
pub struct Memoized<F> {
    cache: RequestCache,
    name: Arc<str>,
    func: F,
}

impl<F> Memoized<F> {
    pub(super) fn new(cache: RequestCache, name: Arc<str>, func: F) -> Self {
        return Self { cache, name, func };
    }

    /// Logical name the wrapper was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the computation through the cache of `ctx`.
    ///
    /// The first call for a given `args` in a scope runs the computation and
    /// stores its `Ok` value; later calls return a clone of the stored value.
    /// An `Err` is returned unchanged and nothing is stored, so the next call
    /// runs the computation again.
    ///
    /// Two threads missing on the same key at the same time may both run the
    /// computation; the first value stored is kept and returned to both.
    ///
    /// Arguments that cannot be encoded into a [`CacheKey`] bypass the cache.
    ///
    /// # Errors
    ///
    /// Returns whatever error the wrapped computation returns.
    pub fn call<A, T, E>(&self, ctx: &Context, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Result<T, E>,
        A: Serialize,
        T: Clone + Send + Sync + 'static,
    {
        let key = match CacheKey::encode(&self.name, &args) {
            Ok(key) => key,
            Err(e) => {
                warn!(name = %self.name, error = %e, "uncacheable arguments, calling through");
                return (self.func)(args);
            }
        };

        let cell = ctx.cell::<T>(self.cache.slot::<T>(&self.name, key));
        if let Some(value) = cell.get() {
            trace!(name = %self.name, scope = %ctx.id(), "request cache hit");
            return Ok(value.clone());
        }

        debug!(name = %self.name, scope = %ctx.id(), "request cache miss");
        let value = (self.func)(args)?;
        if cell.set(value.clone()).is_err() {
            trace!(name = %self.name, scope = %ctx.id(), "value stored concurrently, keeping the first");
            if let Some(stored) = cell.get() {
                return Ok(stored.clone());
            }
        }
        Ok(value)
    }
}

impl<F> fmt::Debug for Memoized<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("name", &self.name)
            .field("cache", &self.cache)
            .finish()
    }
}

/// An asynchronous computation memoized per request scope.
///
/// Created with [`RequestCache::wrap_async`].
pub struct MemoizedAsync<F> {
    cache: RequestCache,
    name: Arc<str>,
    func: F,
}

impl<F> MemoizedAsync<F> {
    pub(super) fn new(cache: RequestCache, name: Arc<str>, func: F) -> Self {
        return Self { cache, name, func };
    }

    /// Logical name the wrapper was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the computation through the cache of `ctx`.
    ///
    /// Same contract as [`Memoized::call`], except that concurrent callers
    /// missing on the same key in the same scope are serialized: one runs the
    /// computation, the others wait and receive a clone of its value. If that
    /// computation fails, the next waiter runs it instead.
    ///
    /// A computation must not await a call of the same wrapper with the same
    /// arguments in the same scope; that call would wait on itself.
    ///
    /// # Errors
    ///
    /// Returns whatever error the wrapped computation returns.
    pub async fn call<A, T, E, Fut>(&self, ctx: &Context, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        A: Serialize,
        T: Clone + Send + Sync + 'static,
    {
        let key = match CacheKey::encode(&self.name, &args) {
            Ok(key) => key,
            Err(e) => {
                warn!(name = %self.name, error = %e, "uncacheable arguments, calling through");
                return (self.func)(args).await;
            }
        };

        let cell = ctx.cell::<T>(self.cache.slot::<T>(&self.name, key));
        if let Some(value) = cell.get() {
            trace!(name = %self.name, scope = %ctx.id(), "request cache hit");
            return Ok(value.clone());
        }

        let func = &self.func;
        let name = &self.name;
        let value = cell
            .get_or_try_init(|| async move {
                debug!(name = %name, scope = %ctx.id(), "request cache miss");
                func(args).await
            })
            .await?;
        Ok(value.clone())
    }
}

impl<F> fmt::Debug for MemoizedAsync<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizedAsync")
            .field("name", &self.name)
            .field("cache", &self.cache)
            .finish()
    }
}
