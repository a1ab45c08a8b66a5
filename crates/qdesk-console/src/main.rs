//! qdesk-console - coordination runtime for the qdesk staff console.
//!
//! Starts one tab session against the configured queue server and logs
//! coordination events until Ctrl-C. The rendered UI (tables, forms,
//! charts) lives elsewhere; this binary is the headless heart of a tab.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use qdesk_client::HttpQueueService;
use qdesk_coord::transport::{detect_transport, ChannelTransport};
use qdesk_coord::{SessionConfig, TabSession};
use qdesk_core::{MemoryStore, Scope, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present; real env always wins.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let scope = resolve_scope()?;
    let config = SessionConfig::from_env();
    let service = Arc::new(HttpQueueService::from_env()?);

    // Single-process deployment: in-memory store and channel transport
    // stand in for the browser's origin-scoped storage and
    // BroadcastChannel. Every sibling session in this process shares them.
    let store = Arc::new(MemoryStore::new());
    let transport = detect_transport(Some(ChannelTransport::default()), store.clone());

    let session = TabSession::new(
        scope,
        config,
        Arc::new(SystemClock),
        service,
        store,
        transport,
        None,
    );
    let handle = session.start();
    info!(tab_id = %handle.tab_id(), scope = %handle.scope(), "console session running");

    let mut events = handle.events();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => info!(event_type = event.event_type(), ?event, "coordination event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    error!(missed, "event stream lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

/// Resolve this tab's scope from `QDESK_WINDOW_ID` or, as a manager
/// fallback, `QDESK_DEPARTMENT_ID`.
fn resolve_scope() -> Result<Scope> {
    if let Ok(raw) = std::env::var("QDESK_WINDOW_ID") {
        let id: Uuid = raw.parse().context("invalid QDESK_WINDOW_ID")?;
        return Ok(Scope::Window(id));
    }
    if let Ok(raw) = std::env::var("QDESK_DEPARTMENT_ID") {
        let id: Uuid = raw.parse().context("invalid QDESK_DEPARTMENT_ID")?;
        return Ok(Scope::Department(id));
    }
    anyhow::bail!("set QDESK_WINDOW_ID or QDESK_DEPARTMENT_ID to choose a scope")
}
