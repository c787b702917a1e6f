use std::time::Duration;

use tonic::transport::Endpoint;

use super::ProbeOutcome;

/// gRPC 探测：只验证能否在超时内建立连接
#[derive(Debug, Clone)]
pub struct GrpcProbe {
    timeout: Duration,
}

impl GrpcProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn check(&self, target: &str) -> ProbeOutcome {
        // 允许省略协议前缀，例如 "localhost:50051"
        let address = if target.contains("://") {
            target.to_string()
        } else {
            format!("http://{target}")
        };

        let endpoint = match Endpoint::from_shared(address) {
            Ok(endpoint) => endpoint.connect_timeout(self.timeout),
            Err(e) => return ProbeOutcome::unhealthy(format!("invalid gRPC endpoint: {e}")),
        };

        match tokio::time::timeout(self.timeout, endpoint.connect()).await {
            Ok(Ok(_channel)) => ProbeOutcome::healthy(),
            Ok(Err(e)) => ProbeOutcome::unhealthy(format!("gRPC connection failed: {e}")),
            Err(_) => ProbeOutcome::unhealthy(format!(
                "gRPC connection timed out after {}s",
                self.timeout.as_secs()
            )),
        }
    }
}
