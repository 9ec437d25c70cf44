// ABOUTME: HTTP health verification with a bounded polling loop.
// ABOUTME: Any 2xx response is ready; connection errors and other statuses are "not yet".

use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("no successful probe of {url} within {timeout_secs}s ({probes} attempts)")]
    Timeout {
        url: String,
        timeout_secs: u64,
        probes: u32,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Polls a readiness endpoint until success or the hard timeout ceiling.
#[derive(Debug)]
pub struct HealthVerifier {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl HealthVerifier {
    pub fn new(
        url: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self, HealthError> {
        // A hung endpoint must not eat the whole deadline in one request.
        let request_timeout = poll_interval.min(Duration::from_secs(5)).max(Duration::from_millis(100));
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
            timeout,
            poll_interval,
        })
    }

    /// Probe once per poll interval until a 2xx response arrives. Returns the
    /// number of probes taken, or `HealthError::Timeout` once the cumulative
    /// elapsed time reaches the configured ceiling without a single success.
    pub async fn wait_ready(&self) -> Result<u32, HealthError> {
        let start = Instant::now();
        let mut probes: u32 = 0;

        // Probes fire on a fixed cadence. A request that burns its whole
        // per-request timeout must not stretch the gap to the next probe.
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            probes += 1;
            match self.client.get(&self.url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::info!(url = %self.url, probes, "health check passed");
                    return Ok(probes);
                }
                Ok(resp) => {
                    tracing::debug!(url = %self.url, status = %resp.status(), "endpoint not ready");
                }
                Err(e) => {
                    tracing::debug!(url = %self.url, error = %e, "health probe failed");
                }
            }

            if start.elapsed() >= self.timeout {
                return Err(HealthError::Timeout {
                    url: self.url.clone(),
                    timeout_secs: self.timeout.as_secs(),
                    probes,
                });
            }
        }
    }
}
