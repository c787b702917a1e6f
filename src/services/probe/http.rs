use std::time::Duration;

use reqwest::{Client, StatusCode};

use super::{ProbeError, ProbeOutcome};

/// HTTP 探测：GET endpoint，只有 200 视为健康
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub async fn check(&self, endpoint: &str) -> ProbeOutcome {
        match self.client.get(endpoint).send().await {
            Ok(response) if response.status() == StatusCode::OK => ProbeOutcome::healthy(),
            Ok(response) => {
                ProbeOutcome::unhealthy(format!("HTTP status code: {}", response.status().as_u16()))
            }
            Err(e) => ProbeOutcome::unhealthy(e.to_string()),
        }
    }
}
