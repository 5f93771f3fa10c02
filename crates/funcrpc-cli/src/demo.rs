//! Demo methods registered by `funcrpc serve`.

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use funcrpc_core::{Bytes, CallContext, MethodOption, MethodRegistry, RegistrationError, Transport};
use serde::Serialize;

/// Upper bound on events a single `subscribe` call may request.
pub const MAX_SUBSCRIBE_EVENTS: u32 = 100;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub transport: Transport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub size: usize,
    pub checksum: u32,
    pub tx: Bytes,
}

async fn health(ctx: CallContext) -> Result<Health, Infallible> {
    Ok(Health {
        status: "ok",
        transport: ctx.transport(),
    })
}

async fn echo(message: String) -> Result<String, Infallible> {
    Ok(message)
}

async fn add(a: i64, b: i64) -> Result<i64, String> {
    a.checked_add(b)
        .ok_or_else(|| format!("{} + {} overflows", a, b))
}

async fn broadcast_tx(tx: Bytes) -> Result<TxReceipt, String> {
    if tx.is_empty() {
        return Err("tx must not be empty".into());
    }
    // Adler-32
    let (mut a, mut b) = (1u32, 0u32);
    for byte in tx.iter() {
        a = (a + u32::from(*byte)) % 65521;
        b = (b + a) % 65521;
    }
    Ok(TxReceipt {
        size: tx.len(),
        checksum: (b << 16) | a,
        tx,
    })
}

/// Push `count` (default 3) `event` notifications for `query`, one every
/// `interval_ms` (default 500), then stop.
async fn subscribe(
    ctx: CallContext,
    query: String,
    count: Option<u32>,
    interval_ms: Option<u64>,
) -> Result<String, String> {
    let channel = ctx
        .channel()
        .cloned()
        .ok_or_else(|| "subscribe is only available on the duplex channel".to_string())?;
    let count = count.unwrap_or(3);
    if count > MAX_SUBSCRIBE_EVENTS {
        return Err(format!("count must be at most {}", MAX_SUBSCRIBE_EVENTS));
    }
    let period = Duration::from_millis(interval_ms.unwrap_or(500).max(1));

    let subscription = query.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        for height in 1..=count {
            ticker.tick().await;
            let event = serde_json::json!({ "query": subscription, "height": height });
            if channel.notify("event", event).await.is_err() {
                tracing::debug!(query = %subscription, "subscriber went away");
                return;
            }
        }
    });

    Ok(format!("subscribed to {}", query))
}

/// Build the demo registry. `counter` is read live by the cacheable
/// `counter` method and bumped by `increment`.
pub fn demo_registry(counter: Arc<AtomicU64>) -> Result<MethodRegistry, RegistrationError> {
    let mut registry = MethodRegistry::new();
    registry.register("health", health, "", &[])?;
    registry.register("echo", echo, "message", &[])?;
    registry.register("add", add, "a,b", &[])?;
    registry.register("broadcast_tx", broadcast_tx, "tx", &[])?;

    let read = counter.clone();
    registry.register(
        "counter",
        move || {
            let read = read.clone();
            async move { Ok::<_, Infallible>(read.load(Ordering::SeqCst)) }
        },
        "",
        &[MethodOption::Cacheable],
    )?;
    registry.register(
        "increment",
        move |by: Option<u64>| {
            let counter = counter.clone();
            async move {
                let by = by.unwrap_or(1);
                Ok::<_, Infallible>(counter.fetch_add(by, Ordering::SeqCst) + by)
            }
        },
        "by",
        &[],
    )?;

    registry.register_duplex("subscribe", subscribe, "query,count,interval_ms", &[])?;
    Ok(registry)
}
