use tonic::Status;

/// 注册中心对调用方暴露的错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl RegistryError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn service_not_found() -> Self {
        Self::NotFound("service not found".to_string())
    }
}

impl From<RegistryError> for Status {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::InvalidArgument(message) => Status::invalid_argument(message),
            RegistryError::NotFound(message) => Status::not_found(message),
            RegistryError::Internal(message) => Status::internal(message),
        }
    }
}
