//! Server module
//!
//! Handles TCP connections and manages the event loop.
//! This module is responsible for accepting connections and delegating
//! command processing to the dispatcher.

mod connection;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::store::spawn_sweeper;
use anyhow::{bail, Context};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use connection::{Connection, ConnectionError, ConnectionState};

/// Run the server
///
/// Replays the AOF, starts active expiration, then serves on `config.bind`
/// until Ctrl-C or a failed AOF append.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                ctrl_c.cancel();
            }
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    let dispatcher = Dispatcher::with_aof(&config.aof_config())
        .with_context(|| format!("failed to load AOF {}", config.aof_path.display()))?;
    let dispatcher = Arc::new(dispatcher);
    info!("Store ready with {} keys", dispatcher.store().len());

    let sweeper = spawn_sweeper(
        dispatcher.store().clone(),
        config.sweep_interval(),
        shutdown.child_token(),
    );

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!("FerrumKV RESP server listening on {}", listener.local_addr()?);

    let result = serve(listener, dispatcher.clone(), shutdown.clone()).await;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!("Active expiration task ended abnormally: {}", e);
    }

    if result.is_ok() {
        if let Some(writer) = dispatcher.aof_writer() {
            writer.sync().context("final AOF fsync failed")?;
        }
    }

    result
}

/// Accept connections until `shutdown` is cancelled
///
/// Each connection runs in its own task against the shared dispatcher.
/// Returns an error once any connection reports a failed AOF append.
pub async fn serve(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let fatal = CancellationToken::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Server stopped accepting connections");
                return Ok(());
            }
            _ = fatal.cancelled() => {
                error!("Stopping server after AOF failure");
                bail!("AOF append failed, writes can no longer be persisted");
            }
            accepted = listener.accept() => {
                // Accept incoming connections
                let (socket, addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                };
                debug!("New RESP connection from {}", addr);

                let dispatcher = dispatcher.clone();
                let fatal = fatal.clone();

                // Spawn a new task to handle this connection
                tokio::spawn(async move {
                    let mut connection = Connection::new(socket);

                    match connection.handle(&dispatcher).await {
                        Ok(()) => {}
                        Err(ConnectionError::Persistence(_)) => fatal.cancel(),
                        Err(e) => warn!("Connection error from {}: {}", addr, e),
                    }

                    debug!("Connection closed: {}", addr);
                });
            }
        }
    }
}
