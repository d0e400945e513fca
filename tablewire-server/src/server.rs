//! HTTP/1 server accepting table requests.

use crate::config::{Config, NetworkConfig};
use crate::error::ServerError;
use crate::handler::{ServerStats, TableHandler};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tablewire_store::{MemoryStore, TableService};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// The table server.
pub struct Server {
    bind_addr: SocketAddr,
    handler: Arc<TableHandler>,
    shutdown: broadcast::Sender<()>,
    running: AtomicBool,
}

impl Server {
    pub fn new(config: &NetworkConfig, service: TableService) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            bind_addr: config.bind_addr,
            handler: Arc::new(TableHandler::new(config, service)),
            shutdown,
            running: AtomicBool::new(false),
        }
    }

    /// Builds a server from a full configuration: validates it, loads the
    /// table rows and applies the row id settings.
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        config.validate()?;

        let store = match &config.table.data_file {
            Some(path) => {
                tracing::info!("  Data file: {}", path.display());
                MemoryStore::open(path)?
            }
            None => {
                tracing::info!("  Data file: none (empty table)");
                MemoryStore::new()
            }
        };

        let mut service = TableService::new(Arc::new(store));
        if let Some(field) = &config.table.row_id_field {
            tracing::info!("  Row ids: {}<{}>", config.table.row_id_prefix, field);
            service = service.with_row_id(field.clone(), config.table.row_id_prefix.clone());
        }

        Ok(Self::new(&config.network, service))
    }

    /// Binds the configured address and runs until [`Server::shutdown`].
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.serve(listener).await
    }

    /// Runs on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        let mut shutdown_rx = self.shutdown.subscribe();
        self.running.store(true, Ordering::SeqCst);

        tracing::info!("Server listening on http://{}", local_addr);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            self.handler
                                .stats()
                                .connections_total
                                .fetch_add(1, Ordering::Relaxed);
                            tracing::debug!("Client connected: {}", addr);

                            let handler = self.handler.clone();
                            let mut conn_shutdown = self.shutdown.subscribe();

                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req| {
                                    let handler = handler.clone();
                                    async move { Ok::<_, Infallible>(handler.handle(req).await) }
                                });

                                let conn = http1::Builder::new().serve_connection(io, service);
                                tokio::pin!(conn);

                                let result = tokio::select! {
                                    result = conn.as_mut() => result,
                                    _ = conn_shutdown.recv() => {
                                        conn.as_mut().graceful_shutdown();
                                        conn.await
                                    }
                                };
                                if let Err(e) = result {
                                    tracing::debug!("Connection {} error: {}", addr, e);
                                }
                                tracing::debug!("Client disconnected: {}", addr);
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Server shutting down");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Initiates server shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Returns whether the server is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns server statistics.
    pub fn stats(&self) -> &ServerStats {
        self.handler.stats()
    }
}
