//! Health probe module
//!
//! 按服务类型选择探测方式：
//! - `http`: 对 endpoint 发起 GET 请求
//! - `systemd`: 通过 `systemctl is-active` 查询 unit 状态
//! - `grpc`: 建立 gRPC 连接
//!
//! 其余类型目前没有真实的探测实现，固定返回 healthy。

pub mod grpc;
pub mod http;
pub mod systemd;

pub use grpc::GrpcProbe;
pub use http::HttpProbe;
pub use systemd::SystemdProbe;

use std::time::Duration;

use crate::services::registry::types::{HealthState, ServiceRecord, ServiceType};

/// 探测超时的默认值
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// 探测配置
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// 单次探测的超时时间
    pub timeout: Duration,
    /// systemctl 可执行文件路径
    pub systemctl_path: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            systemctl_path: "systemctl".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported service type: {0}")]
pub struct UnsupportedServiceType(pub ServiceType);

/// 单次探测的结果，失败原因放在 `detail` 中
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub state: HealthState,
    pub detail: Option<String>,
}

impl ProbeOutcome {
    pub fn healthy() -> Self {
        Self {
            state: HealthState::Healthy,
            detail: None,
        }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            state: HealthState::Unhealthy,
            detail: Some(detail.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.state == HealthState::Healthy
    }
}

/// 按服务类型分发健康探测
#[derive(Debug, Clone)]
pub struct ProbeDispatcher {
    http: HttpProbe,
    systemd: SystemdProbe,
    grpc: GrpcProbe,
}

impl ProbeDispatcher {
    pub fn new(config: ProbeConfig) -> Result<Self, ProbeError> {
        Ok(Self {
            http: HttpProbe::new(config.timeout)?,
            systemd: SystemdProbe::new(config.systemctl_path, config.timeout),
            grpc: GrpcProbe::new(config.timeout),
        })
    }

    pub async fn probe(&self, record: &ServiceRecord) -> Result<ProbeOutcome, UnsupportedServiceType> {
        let outcome = match record.service_type {
            ServiceType::Http => self.http.check(&record.endpoint).await,
            ServiceType::Systemd => self.systemd.check(&record.endpoint).await,
            ServiceType::Grpc => self.grpc.check(&record.endpoint).await,
            ServiceType::Database
            | ServiceType::Cache
            | ServiceType::Queue
            | ServiceType::Storage
            | ServiceType::ExternalApi
            | ServiceType::Microservice
            | ServiceType::Other => ProbeOutcome::healthy(),
            ServiceType::Unspecified => return Err(UnsupportedServiceType(record.service_type)),
        };
        Ok(outcome)
    }
}
