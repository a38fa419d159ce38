// demos/src/bin/cache_server.rs
//
// Serves a byte-valued sequential cache over gRPC until Ctrl-C.
//
// Run this demo with:
//   cargo run --bin cache_server [addr]
//   (from the demos directory, default addr 127.0.0.1:49971)

use ordered_cache_rs::prelude::*;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

const DEFAULT_ADDR: &str = "127.0.0.1:49971";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let config = CacheConfig::new()
        .with_l1_caching(true)
        .with_l1_capacity(256, 1024);
    let cache = match SequentialCache::<Vec<u8>>::sequential(config) {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            error!(error = %e, "invalid cache configuration");
            return;
        }
    };

    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "bind failed");
            return;
        }
    };

    let shutdown = CancellationToken::new();
    let server = CacheServer::new(cache, ServerConfig::default()).with_shutdown(shutdown.clone());

    let stopper = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received");
        }
        stopper.cancel();
    });

    if let Err(e) = server.serve(listener).await {
        error!(error = %e, "server failed");
    }
}
