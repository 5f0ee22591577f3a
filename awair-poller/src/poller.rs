use awair_core::{Reading, ShutdownSignal};
use awair_observability::ClimateMetrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

use crate::client::{FetchError, SensorClient};

/// Fixed-interval device poller.
///
/// Polls run inline in the loop, so they never overlap: a poll that outlives
/// the period pushes the next tick back instead of queueing extra ticks.
pub struct Poller {
    client: SensorClient,
    metrics: Arc<ClimateMetrics>,
    period: Duration,
}

impl Poller {
    pub fn new(client: SensorClient, metrics: Arc<ClimateMetrics>, period: Duration) -> Self {
        Self {
            client,
            metrics,
            period,
        }
    }

    /// Fetch once and publish. On failure the gauges keep their last values.
    pub async fn poll_once(&self) -> Result<Reading, FetchError> {
        match self.client.fetch().await {
            Ok(reading) => {
                self.metrics.record(&reading);
                info!(metrics = ?reading, "Successfully recorded metrics from Awair");
                Ok(reading)
            }
            Err(e) => {
                self.metrics.record_failure();
                error!(
                    kind = e.kind(),
                    timeout = e.is_timeout(),
                    error = %e,
                    awair_address = %self.client.endpoint(),
                    "Error polling Awair device"
                );
                Err(e)
            }
        }
    }

    /// Run until `shutdown` fires. The first poll happens immediately.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        // First tick completes immediately, so the device is polled at start-up.
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            awair_address = %self.client.endpoint(),
            poll_frequency = ?self.period,
            "Poller started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        biased;
                        _ = shutdown.wait() => {
                            debug!("Abandoning in-flight poll");
                            break;
                        }
                        _ = self.poll_once() => {}
                    }
                }
            }
        }

        info!("Poller stopped");
    }
}
