use std::fmt::Debug;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink rejected entry: {0}")]
    Rejected(String),
}

/// 健康检查审计记录
///
/// 写入失败只会被记录日志，不影响健康检查本身的结果。
#[async_trait]
pub trait AuditSink: Send + Sync + Debug {
    async fn record_health_check(&self, status: &str, service_count: usize)
    -> Result<(), AuditError>;
}

/// 把审计记录写入 tracing 日志
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record_health_check(
        &self,
        status: &str,
        service_count: usize,
    ) -> Result<(), AuditError> {
        tracing::info!(status = %status, service_count, "Health check");
        Ok(())
    }
}
