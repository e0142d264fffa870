//! Controller reachability probe.
//!
//! Independent of the persistent connection: the probe lets the controller
//! observe that the agent process is alive and keeps the device description
//! fresh. The resulting flag is telemetry only and never gates commands.

use std::{sync::Arc, time::Duration};

use remote_agent_core::{
    AgentConfig, CapabilityError, ConfigError, LivenessFlag, LivenessWatch,
    capability::DeviceInfo, liveness_flag,
};
use reqwest::StatusCode;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Reachability probe error.
#[derive(Debug, Error)]
pub enum ReachabilityError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Health check returned {status}: {body}")]
    Unhealthy { status: StatusCode, body: String },
    #[error("Device report rejected with status {0}")]
    Rejected(StatusCode),
    #[error("Device specs unavailable: {0}")]
    DeviceSpecs(#[from] CapabilityError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Periodically probes the controller and drives the `reachable` flag.
pub struct ReachabilityMonitor {
    http: reqwest::Client,
    health_url: Url,
    device_url: Url,
    client_id: String,
    device: Arc<dyn DeviceInfo>,
    interval: Duration,
    reachable: LivenessFlag,
}

impl ReachabilityMonitor {
    /// Create a monitor and a reader for its flag.
    ///
    /// # Errors
    /// Returns error if the probe endpoints cannot be derived from the config.
    pub fn new(
        config: &AgentConfig,
        device: Arc<dyn DeviceInfo>,
    ) -> Result<(Self, LivenessWatch), ReachabilityError> {
        let (reachable, watch) = liveness_flag(false);
        let monitor = Self {
            http: reqwest::Client::new(),
            health_url: config.endpoint("health")?,
            device_url: config.endpoint("device")?,
            client_id: config.client_id.clone(),
            device,
            interval: config.reachability_interval,
            reachable,
        };
        Ok((monitor, watch))
    }

    /// Use a preconfigured HTTP client (proxy, TLS roots, timeouts).
    #[must_use]
    pub fn with_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Probe health, then push the device description.
    ///
    /// # Errors
    /// Returns error if either request fails or is answered with a non-2xx status.
    pub async fn probe(&self) -> Result<(), ReachabilityError> {
        let response = self.http.get(self.health_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReachabilityError::Unhealthy { status, body });
        }

        let mut specs = self.device.device_specs().await?;
        specs.client_id.clone_from(&self.client_id);

        let response = self
            .http
            .post(self.device_url.clone())
            .json(&specs)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ReachabilityError::Rejected(response.status()));
        }
        Ok(())
    }

    /// Run until `shutdown` fires.
    ///
    /// While reachable the probe repeats every interval; while unreachable a
    /// failed probe is retried after one interval.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            if self.reachable.get() && !self.pause(&shutdown).await {
                break;
            }

            let outcome = tokio::select! {
                () = shutdown.cancelled() => break,
                outcome = self.probe() => outcome,
            };

            match outcome {
                Ok(()) => {
                    if !self.reachable.get() {
                        tracing::info!(url = %self.health_url, "Controller reachable");
                    }
                    self.reachable.set(true);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Error connecting with server");
                    self.reachable.set(false);
                    if !self.pause(&shutdown).await {
                        break;
                    }
                }
            }
        }
        tracing::debug!("Reachability monitor stopped");
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    #[must_use]
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Sleep one interval. Returns `false` if shut down meanwhile.
    async fn pause(&self, shutdown: &CancellationToken) -> bool {
        tokio::select! {
            () = shutdown.cancelled() => false,
            () = tokio::time::sleep(self.interval) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use remote_agent_core::DeviceSpecs;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, method, path},
    };

    use super::*;

    struct FixedDevice;

    #[async_trait]
    impl DeviceInfo for FixedDevice {
        async fn device_specs(&self) -> Result<DeviceSpecs, CapabilityError> {
            Ok(DeviceSpecs {
                hostname: "box".into(),
                os_name: "linux".into(),
                ..DeviceSpecs::default()
            })
        }
    }

    fn monitor_for(server: &MockServer) -> (ReachabilityMonitor, LivenessWatch) {
        let config = AgentConfig::parse(&server.uri(), "agent-7")
            .unwrap()
            .with_reachability_interval(Duration::from_millis(20));
        ReachabilityMonitor::new(&config, Arc::new(FixedDevice)).unwrap()
    }

    #[tokio::test]
    async fn test_probe_pushes_device_specs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/device"))
            .and(body_partial_json(serde_json::json!({
                "client_id": "agent-7",
                "hostname": "box"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let (monitor, _) = monitor_for(&server);
        monitor.probe().await.unwrap();
    }

    #[tokio::test]
    async fn test_unhealthy_controller() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let (monitor, _) = monitor_for(&server);
        match monitor.probe().await {
            Err(ReachabilityError::Unhealthy { status, body }) => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_device_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/device"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (monitor, _) = monitor_for(&server);
        assert!(matches!(
            monitor.probe().await,
            Err(ReachabilityError::Rejected(StatusCode::INTERNAL_SERVER_ERROR))
        ));
    }

    #[tokio::test]
    async fn test_run_marks_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/device"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let (monitor, mut reachable) = monitor_for(&server);
        let shutdown = CancellationToken::new();
        let handle = monitor.spawn(shutdown.clone());

        let became_reachable =
            tokio::time::timeout(Duration::from_secs(5), reachable.wait_for(true)).await;
        assert!(matches!(became_reachable, Ok(true)));

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_run_stays_unreachable_and_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (monitor, reachable) = monitor_for(&server);
        let shutdown = CancellationToken::new();
        let handle = monitor.spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!reachable.get());
        let probes = server.received_requests().await.unwrap().len();
        assert!(probes >= 2, "expected retries, saw {probes} probes");

        shutdown.cancel();
        handle.await.unwrap();
    }
}
