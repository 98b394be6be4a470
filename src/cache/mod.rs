//! Request cache — memoize computations for the lifetime of one request.
//!
//! This module deduplicates repeated work done on behalf of a single logical
//! request: the first call of a wrapped computation with some arguments runs
//! it, every later call with the same arguments in the same [`Context`]
//! returns a clone of that result.
//!
//! ## Core types
//!
//! - [`RequestCache`] — process-wide directory mapping call keys to slots.
//! - [`Memoized`] / [`MemoizedAsync`] — wrappers produced by
//!   [`RequestCache::wrap`] and [`RequestCache::wrap_async`].
//! - [`CacheKey`] — deterministic encoding of a logical name plus arguments.
//! - [`SlotInfo`] — read-only directory entry returned by
//!   [`RequestCache::inspect`].
//!
//! ## Usage
//!
//! ```rust
//! use std::convert::Infallible;
//! use ctxconf::{Context, RequestCache};
//!
//! # async fn example() {
//! let cache = RequestCache::new();
//! let groups = cache.wrap_async("agent_groups", |agent_id: String| async move {
//!     Ok::<_, Infallible>(vec![format!("group-of-{agent_id}")])
//! });
//!
//! let ctx = Context::new();
//! let first = groups.call(&ctx, "001".to_owned()).await.unwrap();
//! let second = groups.call(&ctx, "001".to_owned()).await.unwrap();
//! assert_eq!(first, second);
//! # }
//! ```
//!
//! Cached values are returned through [`Clone`], so a value type that shares
//! state internally (`Arc<Mutex<_>>`, `Rc<RefCell<_>>`) hands the same
//! underlying state to every caller. Prefer plain owned data.
//!
//! [`Context`]: crate::Context

mod key;
mod memoized;
mod registry;

pub use key::{CacheKey, KeyError};
pub use memoized::{Memoized, MemoizedAsync};
pub use registry::{RequestCache, SlotInfo};
