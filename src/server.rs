use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

use crate::config::{Config, StoreBackend};
use crate::services::audit::TracingAuditSink;
use crate::services::probe::ProbeDispatcher;
use crate::services::registry::{WatchdogGrpcService, WatchdogRegistry};
use crate::services::store::{MemoryStore, RecordStore, SqliteStore};
use crate::watchdog::FILE_DESCRIPTOR_SET;
use crate::watchdog::watchdog_service_server::WatchdogServiceServer;

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("failed to build reflection service: {0}")]
    Reflection(#[from] tonic_reflection::server::Error),
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

/// 根据配置打开存储
pub async fn open_store(config: &Config) -> Result<Arc<dyn RecordStore>, Box<dyn std::error::Error>> {
    let store: Arc<dyn RecordStore> = match config.database.backend {
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(&config.database.path).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory record store, registrations will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}

pub async fn build_registry(config: &Config) -> Result<WatchdogRegistry, Box<dyn std::error::Error>> {
    let store = open_store(config).await?;
    let prober = ProbeDispatcher::new(config.probe.to_probe_config())?;
    Ok(WatchdogRegistry::new(store, Arc::new(TracingAuditSink), prober))
}

pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let registry = build_registry(&config).await?;

    let listener = TcpListener::bind(config.listen_address()).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        backend = ?config.database.backend,
        database = %config.database.path.display(),
        probe_timeout_secs = config.probe.timeout_secs,
        "Watchdog gRPC server listening"
    );

    serve_with_listener(registry, listener, shutdown_signal()).await?;
    tracing::info!("Server stopped");
    Ok(())
}

/// 在给定的监听器上提供服务（含 gRPC 反射），`shutdown` 完成后优雅退出
pub async fn serve_with_listener<F>(
    registry: WatchdogRegistry,
    listener: TcpListener,
    shutdown: F,
) -> Result<(), ServeError>
where
    F: Future<Output = ()>,
{
    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    Server::builder()
        .add_service(reflection)
        .add_service(WatchdogServiceServer::new(WatchdogGrpcService::new(registry)))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, stopping gRPC server");
}
