//! # ctxconf
//!
//! Two building blocks for async servers:
//!
//! - a **request cache** that memoizes computations for the lifetime of one
//!   request, keyed by a logical name and the call's arguments, and
//! - a **configuration singleton** that parses the server's configuration
//!   document once and serves typed sections of it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::convert::Infallible;
//! use ctxconf::{Context, RequestCache, config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = config::central().server()?;
//!     println!("node {} on port {}", server.node.name, server.port);
//!
//!     let nodes = RequestCache::global().wrap_async("cluster_nodes", |_: ()| async {
//!         Ok::<_, Infallible>(vec!["node01".to_owned()])
//!     });
//!
//!     // One context per incoming request.
//!     let ctx = Context::new();
//!     let first = nodes.call(&ctx, ()).await?;
//!     let again = nodes.call(&ctx, ()).await?; // served from the request cache
//!     assert_eq!(first, again);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod context;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{Memoized, MemoizedAsync, RequestCache};
pub use config::{ConfigError, ConfigSingleton};
pub use context::{Context, Extensions, ScopeId};
