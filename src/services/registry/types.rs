use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, SubsecRound, Utc};

use crate::watchdog;

/// 新注册服务的初始状态
pub const DEFAULT_STATUS: &str = "active";
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_ENDPOINT_LEN: usize = 500;
pub const MAX_STATUS_LEN: usize = 50;

/// 服务类型，决定健康检查使用的探测方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServiceType {
    #[default]
    Unspecified,
    Http,
    Grpc,
    Database,
    Cache,
    Queue,
    Storage,
    ExternalApi,
    Microservice,
    Other,
    Systemd,
}

impl ServiceType {
    pub const ALL: [ServiceType; 11] = [
        ServiceType::Unspecified,
        ServiceType::Http,
        ServiceType::Grpc,
        ServiceType::Database,
        ServiceType::Cache,
        ServiceType::Queue,
        ServiceType::Storage,
        ServiceType::ExternalApi,
        ServiceType::Microservice,
        ServiceType::Other,
        ServiceType::Systemd,
    ];

    /// 存储层使用的字符串名称
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Unspecified => "SERVICE_TYPE_UNSPECIFIED",
            ServiceType::Http => "SERVICE_TYPE_HTTP",
            ServiceType::Grpc => "SERVICE_TYPE_GRPC",
            ServiceType::Database => "SERVICE_TYPE_DATABASE",
            ServiceType::Cache => "SERVICE_TYPE_CACHE",
            ServiceType::Queue => "SERVICE_TYPE_QUEUE",
            ServiceType::Storage => "SERVICE_TYPE_STORAGE",
            ServiceType::ExternalApi => "SERVICE_TYPE_EXTERNAL_API",
            ServiceType::Microservice => "SERVICE_TYPE_MICROSERVICE",
            ServiceType::Other => "SERVICE_TYPE_OTHER",
            ServiceType::Systemd => "SERVICE_TYPE_SYSTEMD",
        }
    }

    /// 把线上的枚举值转换为领域类型，未知数值视为 Unspecified
    pub fn from_wire(value: i32) -> Self {
        watchdog::ServiceType::try_from(value)
            .map(Self::from)
            .unwrap_or_default()
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown service type: {0}")]
pub struct UnknownServiceType(pub String);

impl FromStr for ServiceType {
    type Err = UnknownServiceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownServiceType(s.to_string()))
    }
}

impl From<watchdog::ServiceType> for ServiceType {
    fn from(value: watchdog::ServiceType) -> Self {
        match value {
            watchdog::ServiceType::Unspecified => ServiceType::Unspecified,
            watchdog::ServiceType::Http => ServiceType::Http,
            watchdog::ServiceType::Grpc => ServiceType::Grpc,
            watchdog::ServiceType::Database => ServiceType::Database,
            watchdog::ServiceType::Cache => ServiceType::Cache,
            watchdog::ServiceType::Queue => ServiceType::Queue,
            watchdog::ServiceType::Storage => ServiceType::Storage,
            watchdog::ServiceType::ExternalApi => ServiceType::ExternalApi,
            watchdog::ServiceType::Microservice => ServiceType::Microservice,
            watchdog::ServiceType::Other => ServiceType::Other,
            watchdog::ServiceType::Systemd => ServiceType::Systemd,
        }
    }
}

impl From<ServiceType> for watchdog::ServiceType {
    fn from(value: ServiceType) -> Self {
        match value {
            ServiceType::Unspecified => watchdog::ServiceType::Unspecified,
            ServiceType::Http => watchdog::ServiceType::Http,
            ServiceType::Grpc => watchdog::ServiceType::Grpc,
            ServiceType::Database => watchdog::ServiceType::Database,
            ServiceType::Cache => watchdog::ServiceType::Cache,
            ServiceType::Queue => watchdog::ServiceType::Queue,
            ServiceType::Storage => watchdog::ServiceType::Storage,
            ServiceType::ExternalApi => watchdog::ServiceType::ExternalApi,
            ServiceType::Microservice => watchdog::ServiceType::Microservice,
            ServiceType::Other => watchdog::ServiceType::Other,
            ServiceType::Systemd => watchdog::ServiceType::Systemd,
        }
    }
}

// 存储中的服务记录
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRecord {
    pub id: i64,
    pub name: String,
    pub endpoint: String,
    pub service_type: ServiceType,
    pub status: String,
    pub last_heartbeat: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 创建记录时写入存储的字段，其余字段由存储生成
#[derive(Debug, Clone, PartialEq)]
pub struct NewServiceRecord {
    pub name: String,
    pub endpoint: String,
    pub service_type: ServiceType,
    pub status: String,
    pub last_heartbeat: DateTime<Utc>,
}

/// 一次完整更新写入的字段，心跳时间由存储推进
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceChanges {
    pub status: String,
    pub name: String,
    pub endpoint: String,
    pub service_type: ServiceType,
}

// 注册请求
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistration {
    pub name: String,
    pub endpoint: String,
    pub service_type: ServiceType,
}

/// 部分更新请求，`None` 表示保留当前值
#[derive(Debug, Clone, Default)]
pub struct ServiceUpdate {
    pub status: String,
    pub name: Option<String>,
    pub endpoint: Option<String>,
    pub service_type: Option<ServiceType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredService {
    pub id: i64,
    pub message: String,
}

/// 对调用方暴露的服务摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSummary {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    pub status: String,
    pub last_heartbeat: i64,
    pub service_type: ServiceType,
}

impl From<&ServiceRecord> for ServiceSummary {
    fn from(record: &ServiceRecord) -> Self {
        Self {
            id: record.id.to_string(),
            name: record.name.clone(),
            endpoint: record.endpoint.clone(),
            status: record.status.clone(),
            last_heartbeat: record.last_heartbeat.timestamp(),
            service_type: record.service_type,
        }
    }
}

impl From<ServiceSummary> for watchdog::ServiceInfo {
    fn from(summary: ServiceSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            endpoint: summary.endpoint,
            status: summary.status,
            last_heartbeat: summary.last_heartbeat,
            r#type: watchdog::ServiceType::from(summary.service_type) as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub state: HealthState,
    pub message: String,
}

impl HealthReport {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            state: HealthState::Healthy,
            message: message.into(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            state: HealthState::Unhealthy,
            message: message.into(),
        }
    }
}

impl From<HealthReport> for watchdog::HealthResponse {
    fn from(report: HealthReport) -> Self {
        Self {
            status: report.state.as_str().to_string(),
            message: report.message,
        }
    }
}

/// 当前时间，截断到微秒以便和持久化格式保持一致
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// 返回严格晚于 `previous` 的时间戳
pub fn advance_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let current = now();
    if current > previous {
        current
    } else {
        previous + Duration::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_type_names_round_trip_through_from_str() {
        for kind in ServiceType::ALL {
            assert_eq!(kind.as_str().parse::<ServiceType>().unwrap(), kind);
        }
        assert!("HTTP".parse::<ServiceType>().is_err());
    }

    #[test]
    fn unknown_wire_values_fall_back_to_unspecified() {
        assert_eq!(ServiceType::from_wire(1), ServiceType::Http);
        assert_eq!(ServiceType::from_wire(10), ServiceType::Systemd);
        assert_eq!(ServiceType::from_wire(42), ServiceType::Unspecified);
        assert_eq!(ServiceType::from_wire(-1), ServiceType::Unspecified);
    }

    #[test]
    fn summary_renders_id_and_heartbeat() {
        let stamp = DateTime::parse_from_rfc3339("2024-05-01T12:00:00.250Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = ServiceRecord {
            id: 7,
            name: "billing".into(),
            endpoint: "http://billing:8080/health".into(),
            service_type: ServiceType::Http,
            status: "active".into(),
            last_heartbeat: stamp,
            created_at: stamp,
            updated_at: stamp,
        };

        let summary = ServiceSummary::from(&record);
        assert_eq!(summary.id, "7");
        assert_eq!(summary.last_heartbeat, 1_714_564_800);

        let info = watchdog::ServiceInfo::from(summary);
        assert_eq!(info.r#type(), watchdog::ServiceType::Http);
    }

    #[test]
    fn advance_timestamp_is_strictly_later() {
        let future = now() + Duration::seconds(60);
        assert!(advance_timestamp(future) > future);

        let past = now() - Duration::seconds(60);
        assert!(advance_timestamp(past) > past);
    }
}
