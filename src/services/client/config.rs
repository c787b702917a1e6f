use std::time::Duration;

/// Watchdog 客户端配置
#[derive(Debug, Clone)]
pub struct WatchdogClientConfig {
    /// 服务端地址
    pub address: String,
    /// 默认请求超时时间
    pub default_timeout: Duration,
    /// 连接超时时间
    pub connect_timeout: Duration,
}

impl Default for WatchdogClientConfig {
    fn default() -> Self {
        Self {
            address: "http://localhost:50051".to_string(),
            default_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}
