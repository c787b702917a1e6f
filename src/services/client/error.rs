use tonic::{Code, Status};

/// Watchdog 客户端错误类型
#[derive(Debug, thiserror::Error)]
pub enum WatchdogClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
    #[error("gRPC error: {0}")]
    Grpc(#[from] Status),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl WatchdogClientError {
    /// 服务端返回的 gRPC 状态码
    pub fn code(&self) -> Option<Code> {
        match self {
            WatchdogClientError::Grpc(status) => Some(status.code()),
            _ => None,
        }
    }
}
