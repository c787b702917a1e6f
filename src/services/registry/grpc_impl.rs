use tonic::{Request, Response, Status};

use super::service::WatchdogRegistry;
use super::types::{ServiceRegistration, ServiceType, ServiceUpdate};
use crate::watchdog::{
    CheckServiceHealthRequest, GetServiceRequest, GetServiceResponse, HealthRequest,
    HealthResponse, ListServicesRequest, ListServicesResponse, RegisterServiceRequest,
    RegisterServiceResponse, ServiceInfo, UnregisterServiceRequest, UnregisterServiceResponse,
    UpdateServiceRequest, UpdateServiceResponse, watchdog_service_server::WatchdogService,
};

/// gRPC 层，只负责请求/响应的转换
#[derive(Debug, Clone)]
pub struct WatchdogGrpcService {
    registry: WatchdogRegistry,
}

impl WatchdogGrpcService {
    pub fn new(registry: WatchdogRegistry) -> Self {
        Self { registry }
    }
}

// 空字符串视为未提供
fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

// UNSPECIFIED 与未提供无法区分，一律保留原值
fn specified(service_type: ServiceType) -> Option<ServiceType> {
    (service_type != ServiceType::Unspecified).then_some(service_type)
}

#[tonic::async_trait]
impl WatchdogService for WatchdogGrpcService {
    async fn get_health(
        &self,
        _request: Request<HealthRequest>,
    ) -> Result<Response<HealthResponse>, Status> {
        let report = self.registry.health().await;
        Ok(Response::new(report.into()))
    }

    async fn register_service(
        &self,
        request: Request<RegisterServiceRequest>,
    ) -> Result<Response<RegisterServiceResponse>, Status> {
        let req = request.into_inner();
        let registration = ServiceRegistration {
            service_type: ServiceType::from_wire(req.r#type),
            name: req.name,
            endpoint: req.endpoint,
        };

        let registered = self.registry.register_service(registration).await?;
        Ok(Response::new(RegisterServiceResponse {
            service_id: registered.id.to_string(),
            message: registered.message,
        }))
    }

    async fn get_service(
        &self,
        request: Request<GetServiceRequest>,
    ) -> Result<Response<GetServiceResponse>, Status> {
        let req = request.into_inner();
        let summary = self.registry.get_service(&req.service_id).await?;
        Ok(Response::new(GetServiceResponse {
            service: Some(summary.into()),
        }))
    }

    async fn unregister_service(
        &self,
        request: Request<UnregisterServiceRequest>,
    ) -> Result<Response<UnregisterServiceResponse>, Status> {
        let req = request.into_inner();
        let message = self.registry.unregister_service(&req.service_id).await?;
        Ok(Response::new(UnregisterServiceResponse { message }))
    }

    async fn list_services(
        &self,
        _request: Request<ListServicesRequest>,
    ) -> Result<Response<ListServicesResponse>, Status> {
        let services = self
            .registry
            .list_services()
            .await?
            .into_iter()
            .map(ServiceInfo::from)
            .collect();
        Ok(Response::new(ListServicesResponse { services }))
    }

    async fn update_service(
        &self,
        request: Request<UpdateServiceRequest>,
    ) -> Result<Response<UpdateServiceResponse>, Status> {
        let req = request.into_inner();
        let update = ServiceUpdate {
            service_type: specified(ServiceType::from_wire(req.r#type)),
            status: req.status,
            name: non_empty(req.name),
            endpoint: non_empty(req.endpoint),
        };

        let message = self.registry.update_service(&req.service_id, update).await?;
        Ok(Response::new(UpdateServiceResponse { message }))
    }

    async fn check_service_health(
        &self,
        request: Request<CheckServiceHealthRequest>,
    ) -> Result<Response<HealthResponse>, Status> {
        let req = request.into_inner();
        let report = self.registry.check_service_health(&req.service_id).await?;
        Ok(Response::new(report.into()))
    }
}
