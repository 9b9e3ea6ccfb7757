use std::time::Duration;

use async_trait::async_trait;

use crate::errors::WatchdogError;

/// Liveness checks run against the supervised server.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check_health(&self) -> Result<(), WatchdogError>;

    /// Confirms the server can actually serve data, not just answer pings.
    async fn check_data(&self) -> Result<(), WatchdogError>;
}

/// Probes `/api/health` and `/api/tasks?limit=1` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    base_url: String,
    health_timeout: Duration,
    data_timeout: Duration,
}

impl HttpProbe {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("lifesync-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            health_timeout: Duration::from_secs(5),
            data_timeout: Duration::from_secs(10),
        })
    }

    pub fn with_timeouts(mut self, health: Duration, data: Duration) -> Self {
        self.health_timeout = health;
        self.data_timeout = data;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str, timeout: Duration) -> Result<(), String> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| format!("{url}: {e}"))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("{url} returned {}", response.status()))
        }
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn check_health(&self) -> Result<(), WatchdogError> {
        self.get("/api/health", self.health_timeout)
            .await
            .map_err(WatchdogError::HealthCheck)
    }

    async fn check_data(&self) -> Result<(), WatchdogError> {
        self.get("/api/tasks?limit=1", self.data_timeout)
            .await
            .map_err(WatchdogError::DataCheck)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let probe = HttpProbe::new("http://localhost:3001/").unwrap();
        assert_eq!(probe.base_url(), "http://localhost:3001");
        assert_eq!(probe.health_timeout, Duration::from_secs(5));
        assert_eq!(probe.data_timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_health_check() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let probe = HttpProbe::new(format!("http://127.0.0.1:{port}")).unwrap();
        assert!(matches!(
            probe.check_health().await,
            Err(WatchdogError::HealthCheck(_))
        ));
        assert!(matches!(
            probe.check_data().await,
            Err(WatchdogError::DataCheck(_))
        ));
    }
}
