//! Two concurrent "requests" sharing one request cache and one configuration
//! singleton.
//!
//! Run with `RUST_LOG=ctxconf=debug cargo run --example request_scope`.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use ctxconf::config::CentralConfig;
use ctxconf::{ConfigSingleton, Context, RequestCache};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DOCUMENT: &str = "\
server:
  node:
    name: node01
    role: master
  nodes: [node01, node02]
indexer:
  hosts:
    - host: 127.0.0.1
";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ctxconf=debug,info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("server.yml");
    std::fs::write(&path, DOCUMENT)?;
    let config = Arc::new(ConfigSingleton::<CentralConfig>::new(path));

    let server = config.server()?;
    info!(node = %server.node.name, port = server.port, "server section");

    let cache = RequestCache::new();
    let agent_groups = Arc::new(cache.wrap_async("agent_groups", |agent_id: String| async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, Infallible>(vec![format!("default-{agent_id}")])
    }));

    let mut requests = Vec::new();
    for request in 0..2 {
        let agent_groups = Arc::clone(&agent_groups);
        let config = Arc::clone(&config);
        requests.push(tokio::spawn(async move {
            let ctx = Context::new();
            let indexer = config.indexer()?;
            for _ in 0..3 {
                let groups = agent_groups.call(&ctx, "001".to_owned()).await?;
                info!(request, scope = %ctx.id(), ?groups, hosts = indexer.hosts.len(), "handled");
            }
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
        }));
    }
    for request in requests {
        request.await?.map_err(|e| e.to_string())?;
    }

    for slot in cache.inspect() {
        info!(slot = slot.id, name = %slot.name, key = %slot.key, value_type = slot.value_type, "slot");
    }
    Ok(())
}
