//! Registry service module
//!
//! 服务注册中心，按职责拆分为：
//! - `types`: 数据结构与类型定义
//! - `error`: 对调用方暴露的错误
//! - `service`: 核心业务逻辑
//! - `grpc_impl`: gRPC trait 实现

pub mod error;
pub mod grpc_impl;
pub mod service;
pub mod types;

// 重新导出常用类型
pub use error::RegistryError;
pub use grpc_impl::WatchdogGrpcService;
pub use service::WatchdogRegistry;
pub use types::{
    HealthReport, HealthState, RegisteredService, ServiceRecord, ServiceRegistration,
    ServiceSummary, ServiceType, ServiceUpdate,
};
