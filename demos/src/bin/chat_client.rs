// demos/src/bin/chat_client.rs
//
// A chat room on top of a remote ordered cache: every line typed on stdin is
// posted as a message, and every message posted by anyone is printed as it
// arrives. Start `cache_server` first.
//
// Run this demo with:
//   cargo run --bin chat_client <name> [addr]
//   (from the demos directory, default addr 127.0.0.1:49971)

use futures_util::StreamExt;
use ordered_cache_rs::prelude::*;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

const DEFAULT_ADDR: &str = "127.0.0.1:49971";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    author: String,
    text: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let mut args = std::env::args().skip(1);
    let name = args.next().unwrap_or_else(|| "anonymous".to_string());
    let addr = args.next().unwrap_or_else(|| DEFAULT_ADDR.to_string());

    let room = match RemoteOrderedCache::connect(&addr, JsonCodec::<ChatMessage>::new()) {
        Ok(room) => room,
        Err(e) => {
            warn!(%addr, error = %e, "invalid server address");
            return;
        }
    };
    let stop = CancellationToken::new();

    // Replay the whole history, then follow new messages.
    let mut tail = room.tail(Some(0), stop.clone()).await;
    let printer = tokio::spawn(async move {
        while let Some(entry) = tail.next().await {
            let message = entry.value();
            println!("[{}] {}: {}", entry.id(), message.author, message.text);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(text)) if text.trim().is_empty() => continue,
            Ok(Some(text)) => {
                let message = ChatMessage {
                    author: name.clone(),
                    text,
                };
                if let Err(e) = room.add(message).await {
                    warn!(error = %e, "message not posted");
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin failed");
                break;
            }
        }
    }

    info!("leaving the room");
    stop.cancel();
    let _ = printer.await;
}
