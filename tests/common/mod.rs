#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use watchdog_registry::services::audit::{AuditError, AuditSink};
use watchdog_registry::services::probe::{ProbeConfig, ProbeDispatcher};
use watchdog_registry::services::registry::WatchdogRegistry;
use watchdog_registry::services::store::{MemoryStore, RecordStore};

/// 记录所有审计条目的测试用 sink
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    entries: Mutex<Vec<(String, usize)>>,
    fail: bool,
}

impl RecordingAuditSink {
    pub fn failing() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn entries(&self) -> Vec<(String, usize)> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record_health_check(
        &self,
        status: &str,
        service_count: usize,
    ) -> Result<(), AuditError> {
        if self.fail {
            return Err(AuditError::Rejected("audit backend offline".to_string()));
        }
        self.entries
            .lock()
            .unwrap()
            .push((status.to_string(), service_count));
        Ok(())
    }
}

pub fn test_probe_config() -> ProbeConfig {
    ProbeConfig {
        timeout: Duration::from_secs(2),
        ..ProbeConfig::default()
    }
}

pub fn registry_with(store: Arc<dyn RecordStore>, audit: Arc<dyn AuditSink>) -> WatchdogRegistry {
    let prober = ProbeDispatcher::new(test_probe_config()).expect("probe dispatcher");
    WatchdogRegistry::new(store, audit, prober)
}

/// 基于内存存储的注册中心，同时返回存储句柄以便直接检查记录
pub fn memory_registry() -> (WatchdogRegistry, MemoryStore, Arc<RecordingAuditSink>) {
    let store = MemoryStore::new();
    let audit = Arc::new(RecordingAuditSink::default());
    let registry = registry_with(Arc::new(store.clone()), audit.clone());
    (registry, store, audit)
}

/// 启动一个对任何请求都返回固定状态行的 HTTP 服务
pub async fn spawn_http_responder(status_line: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// 一个当前没有任何进程监听的本地地址
pub async fn unused_local_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
