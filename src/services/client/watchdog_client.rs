use tonic::transport::{Channel, Endpoint};

use super::config::WatchdogClientConfig;
use super::error::WatchdogClientError;
use crate::watchdog::{
    CheckServiceHealthRequest, GetServiceRequest, HealthRequest, HealthResponse,
    ListServicesRequest, RegisterServiceRequest, RegisterServiceResponse, ServiceInfo,
    ServiceType, UnregisterServiceRequest, UpdateServiceRequest,
    watchdog_service_client::WatchdogServiceClient,
};

/// Watchdog 客户端
#[derive(Debug, Clone)]
pub struct WatchdogClient {
    client: WatchdogServiceClient<Channel>,
}

impl WatchdogClient {
    /// 创建新的客户端
    pub async fn new(config: WatchdogClientConfig) -> Result<Self, WatchdogClientError> {
        let endpoint = Endpoint::from_shared(config.address.clone())?
            .connect_timeout(config.connect_timeout)
            .timeout(config.default_timeout);

        let channel = endpoint.connect().await?;
        Ok(Self {
            client: WatchdogServiceClient::new(channel),
        })
    }

    /// 便捷的创建方法，使用默认配置
    pub async fn connect(address: &str) -> Result<Self, WatchdogClientError> {
        let config = WatchdogClientConfig {
            address: address.to_string(),
            ..Default::default()
        };
        Self::new(config).await
    }

    pub async fn get_health(&mut self) -> Result<HealthResponse, WatchdogClientError> {
        let response = self.client.get_health(HealthRequest {}).await?;
        Ok(response.into_inner())
    }

    pub async fn register_service(
        &mut self,
        name: &str,
        endpoint: &str,
        service_type: ServiceType,
    ) -> Result<RegisterServiceResponse, WatchdogClientError> {
        let request = RegisterServiceRequest {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            r#type: service_type as i32,
        };
        let response = self.client.register_service(request).await?;
        Ok(response.into_inner())
    }

    pub async fn get_service(&mut self, service_id: &str) -> Result<ServiceInfo, WatchdogClientError> {
        let request = GetServiceRequest {
            service_id: service_id.to_string(),
        };
        self.client
            .get_service(request)
            .await?
            .into_inner()
            .service
            .ok_or_else(|| WatchdogClientError::MalformedResponse("missing service".to_string()))
    }

    pub async fn unregister_service(&mut self, service_id: &str) -> Result<String, WatchdogClientError> {
        let request = UnregisterServiceRequest {
            service_id: service_id.to_string(),
        };
        let response = self.client.unregister_service(request).await?;
        Ok(response.into_inner().message)
    }

    pub async fn list_services(&mut self) -> Result<Vec<ServiceInfo>, WatchdogClientError> {
        let response = self.client.list_services(ListServicesRequest {}).await?;
        Ok(response.into_inner().services)
    }

    /// 更新服务，name/endpoint 为空或 type 为 UNSPECIFIED 时保留原值
    pub async fn update_service(
        &mut self,
        request: UpdateServiceRequest,
    ) -> Result<String, WatchdogClientError> {
        let response = self.client.update_service(request).await?;
        Ok(response.into_inner().message)
    }

    /// 只更新状态，相当于一次心跳
    pub async fn heartbeat(
        &mut self,
        service_id: &str,
        status: &str,
    ) -> Result<String, WatchdogClientError> {
        self.update_service(UpdateServiceRequest {
            service_id: service_id.to_string(),
            status: status.to_string(),
            ..Default::default()
        })
        .await
    }

    pub async fn check_service_health(
        &mut self,
        service_id: &str,
    ) -> Result<HealthResponse, WatchdogClientError> {
        let request = CheckServiceHealthRequest {
            service_id: service_id.to_string(),
        };
        let response = self.client.check_service_health(request).await?;
        Ok(response.into_inner())
    }
}
