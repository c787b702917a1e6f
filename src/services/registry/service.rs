use std::sync::Arc;

use super::error::RegistryError;
use super::types::{
    DEFAULT_STATUS, HealthReport, MAX_ENDPOINT_LEN, MAX_NAME_LEN, MAX_STATUS_LEN,
    NewServiceRecord, RegisteredService, ServiceChanges, ServiceRecord, ServiceRegistration,
    ServiceSummary, ServiceUpdate, now,
};
use crate::services::audit::AuditSink;
use crate::services::probe::ProbeDispatcher;
use crate::services::store::{RecordStore, StoreError};

/// 服务注册中心核心逻辑
///
/// 除了注入的存储和审计句柄外不持有任何共享可变状态，
/// 一致性（唯一性、单条更新的原子性）全部交给存储保证。
#[derive(Debug, Clone)]
pub struct WatchdogRegistry {
    store: Arc<dyn RecordStore>,
    audit: Arc<dyn AuditSink>,
    prober: ProbeDispatcher,
}

impl WatchdogRegistry {
    pub fn new(
        store: Arc<dyn RecordStore>,
        audit: Arc<dyn AuditSink>,
        prober: ProbeDispatcher,
    ) -> Self {
        Self {
            store,
            audit,
            prober,
        }
    }

    // 注册中心自身的健康状态，永远不会返回错误
    pub async fn health(&self) -> HealthReport {
        if let Err(e) = self.store.ping().await {
            tracing::error!(error = %e, "Record store health check failed");
            return HealthReport::unhealthy("Database connection failed");
        }

        let service_count = match self.store.count().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to count services");
                0
            }
        };

        let report = HealthReport::healthy(format!(
            "Watchdog service is running with {service_count} registered services"
        ));

        if let Err(e) = self
            .audit
            .record_health_check(report.state.as_str(), service_count)
            .await
        {
            tracing::warn!(error = %e, "Failed to record health check");
        }

        report
    }

    pub async fn register_service(
        &self,
        registration: ServiceRegistration,
    ) -> Result<RegisteredService, RegistryError> {
        if registration.name.is_empty() {
            return Err(RegistryError::invalid_argument(
                "service name cannot be empty",
            ));
        }
        if registration.endpoint.is_empty() {
            return Err(RegistryError::invalid_argument(
                "service endpoint cannot be empty",
            ));
        }
        check_length("service name", &registration.name, MAX_NAME_LEN)?;
        check_length("service endpoint", &registration.endpoint, MAX_ENDPOINT_LEN)?;

        let name = registration.name.clone();
        let record = NewServiceRecord {
            name: registration.name,
            endpoint: registration.endpoint,
            service_type: registration.service_type,
            status: DEFAULT_STATUS.to_string(),
            last_heartbeat: now(),
        };

        match self.store.create(record).await {
            Ok(id) => {
                tracing::info!(
                    service_id = id,
                    service_name = %name,
                    service_type = %registration.service_type,
                    "Registered service"
                );
                Ok(RegisteredService {
                    id,
                    message: format!("Service {name} registered successfully with ID {id}"),
                })
            }
            Err(e) => {
                // 对调用方不区分唯一性冲突和其他存储错误
                if e.is_conflict() {
                    tracing::warn!(service_name = %name, error = %e, "Duplicate service registration");
                } else {
                    tracing::error!(service_name = %name, error = %e, "Failed to create service");
                }
                Err(RegistryError::internal("failed to register service"))
            }
        }
    }

    pub async fn get_service(&self, service_id: &str) -> Result<ServiceSummary, RegistryError> {
        let id = parse_service_id(service_id)?;
        let record = self.fetch(id, "failed to get service").await?;
        Ok(ServiceSummary::from(&record))
    }

    pub async fn unregister_service(&self, service_id: &str) -> Result<String, RegistryError> {
        let id = parse_service_id(service_id)?;

        self.store.delete(id).await.map_err(|e| {
            classify_store_error(e, id, "failed to unregister service")
        })?;

        tracing::info!(service_id = id, "Unregistered service");
        Ok("Service unregistered successfully".to_string())
    }

    pub async fn list_services(&self) -> Result<Vec<ServiceSummary>, RegistryError> {
        let records = self.store.list().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to list services");
            RegistryError::internal("failed to list services")
        })?;

        Ok(records.iter().map(ServiceSummary::from).collect())
    }

    /// 部分更新：未提供的字段沿用当前值，同时刷新心跳时间
    pub async fn update_service(
        &self,
        service_id: &str,
        update: ServiceUpdate,
    ) -> Result<String, RegistryError> {
        let id = parse_service_id(service_id)?;
        if update.status.is_empty() {
            return Err(RegistryError::invalid_argument(
                "service status cannot be empty",
            ));
        }
        check_length("service status", &update.status, MAX_STATUS_LEN)?;
        if let Some(name) = &update.name {
            if name.is_empty() {
                return Err(RegistryError::invalid_argument("service name cannot be empty"));
            }
            check_length("service name", name, MAX_NAME_LEN)?;
        }
        if let Some(endpoint) = &update.endpoint {
            if endpoint.is_empty() {
                return Err(RegistryError::invalid_argument(
                    "service endpoint cannot be empty",
                ));
            }
            check_length("service endpoint", endpoint, MAX_ENDPOINT_LEN)?;
        }

        let current = self.fetch(id, "failed to update service").await?;
        let changes = ServiceChanges {
            status: update.status,
            name: update.name.unwrap_or(current.name),
            endpoint: update.endpoint.unwrap_or(current.endpoint),
            service_type: update.service_type.unwrap_or(current.service_type),
        };

        tracing::debug!(
            service_id = id,
            status = %changes.status,
            service_name = %changes.name,
            service_type = %changes.service_type,
            endpoint = %changes.endpoint,
            "Updating service"
        );

        self.store
            .update(id, changes)
            .await
            .map_err(|e| classify_store_error(e, id, "failed to update service"))?;

        Ok("Service updated successfully".to_string())
    }

    /// 按服务类型探测健康状态
    ///
    /// 探测失败作为数据返回；只有 ID 非法、记录不存在或类型不支持时才返回错误。
    pub async fn check_service_health(&self, service_id: &str) -> Result<HealthReport, RegistryError> {
        let id = parse_service_id(service_id)?;
        let record = self.fetch(id, "failed to check service health").await?;

        let outcome = self.prober.probe(&record).await.map_err(|e| {
            tracing::warn!(service_id = id, error = %e, "Health check dispatch rejected");
            RegistryError::invalid_argument("unsupported service type")
        })?;

        if outcome.is_healthy() {
            return Ok(HealthReport::healthy("Service health checked successfully"));
        }

        let cause = outcome.detail.unwrap_or_default();
        tracing::warn!(
            service_id = id,
            service_type = %record.service_type,
            endpoint = %record.endpoint,
            error = %cause,
            "Service health check failed"
        );
        Ok(HealthReport::unhealthy(format!(
            "Service is unreachable: {cause}"
        )))
    }

    async fn fetch(&self, id: i64, context: &str) -> Result<ServiceRecord, RegistryError> {
        self.store
            .get(id)
            .await
            .map_err(|e| classify_store_error(e, id, context))
    }
}

/// 解析服务 ID，只接受正整数
pub fn parse_service_id(raw: &str) -> Result<i64, RegistryError> {
    if raw.is_empty() {
        return Err(RegistryError::invalid_argument(
            "service ID cannot be empty",
        ));
    }
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(RegistryError::invalid_argument(
            "invalid service ID format",
        )),
    }
}

fn check_length(field: &str, value: &str, max: usize) -> Result<(), RegistryError> {
    if value.chars().count() > max {
        return Err(RegistryError::invalid_argument(format!(
            "{field} exceeds {max} characters"
        )));
    }
    Ok(())
}

// 存储错误分为 "不存在" 和其他两类
fn classify_store_error(error: StoreError, id: i64, context: &str) -> RegistryError {
    if error.is_not_found() {
        RegistryError::service_not_found()
    } else {
        tracing::error!(service_id = id, error = %error, "{}", context);
        RegistryError::internal(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_ids_only() {
        assert_eq!(parse_service_id("42").unwrap(), 42);
        assert_eq!(
            parse_service_id("").unwrap_err(),
            RegistryError::invalid_argument("service ID cannot be empty")
        );
        for raw in ["abc", "0", "-3", "4.5", " 7"] {
            assert!(
                matches!(parse_service_id(raw), Err(RegistryError::InvalidArgument(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn length_limits_count_characters() {
        let name = "é".repeat(MAX_NAME_LEN);
        assert!(check_length("service name", &name, MAX_NAME_LEN).is_ok());
        assert!(check_length("service name", &format!("{name}x"), MAX_NAME_LEN).is_err());
    }
}
