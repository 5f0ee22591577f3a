use anyhow::Context;
use awair_core::config::{SENSOR_REQUEST_TIMEOUT, format_duration};
use awair_core::{ExporterConfig, shutdown};
use awair_http::{AppState, MetricsServer};
use awair_observability::ClimateMetrics;
use awair_poller::{Poller, SensorClient};
use std::future::Future;
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

type TaskExit = (&'static str, anyhow::Result<()>);

/// Fully wired exporter: registry, bound server, poller.
pub struct Exporter {
    config: ExporterConfig,
    metrics: Arc<ClimateMetrics>,
    server: MetricsServer,
    poller: Poller,
}

impl Exporter {
    /// Register gauges and bind the listener. Any error here is fatal.
    pub async fn build(config: ExporterConfig) -> anyhow::Result<Self> {
        let metrics = Arc::new(ClimateMetrics::new().context("failed to register metrics")?);

        let client = SensorClient::new(config.awair_address.clone(), SENSOR_REQUEST_TIMEOUT)?;
        let poller = Poller::new(client, Arc::clone(&metrics), config.poll_frequency);

        let state = AppState {
            metrics: Arc::clone(&metrics),
        };
        let server = MetricsServer::bind(&config.listen, config.port, state)
            .await
            .context("failed to start server")?;

        Ok(Self {
            config,
            metrics,
            server,
            poller,
        })
    }

    #[cfg(test)]
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.server.local_addr()
    }

    #[cfg(test)]
    pub fn metrics(&self) -> Arc<ClimateMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run poller and server until `stop` resolves or a task dies, then
    /// drain both.
    ///
    /// A task that fails before `stop` makes this return an error so an
    /// external supervisor can restart the process; failures while draining
    /// are only logged.
    pub async fn run_until(self, stop: impl Future<Output = ()>) -> anyhow::Result<()> {
        let Exporter {
            config,
            metrics,
            server,
            poller,
        } = self;
        let listen_address = server
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| config.listen_string());

        let (trigger, signal) = shutdown::channel();
        let mut tasks: JoinSet<TaskExit> = JoinSet::new();

        let poller_signal = signal.clone();
        tasks.spawn(async move {
            poller.run(poller_signal).await;
            ("poller", Ok(()))
        });
        tasks.spawn(async move { ("server", server.run(signal).await.map_err(Into::into)) });

        info!(
            listen_address = %listen_address,
            awair_address = %config.awair_address,
            poll_frequency = %format_duration(config.poll_frequency),
            "Awair Poller started"
        );

        tokio::pin!(stop);
        let mut early_exit = None;
        tokio::select! {
            _ = &mut stop => info!("Shutting down"),
            Some(joined) = tasks.join_next() => {
                let name = task_name(&joined);
                warn!(task = name, "Task exited before shutdown was requested");
                if log_task_exit(joined, "Task failed") {
                    early_exit = Some(name);
                }
            }
        }

        trigger.trigger();
        while let Some(joined) = tasks.join_next().await {
            log_task_exit(joined, "Error shutting down");
        }

        info!(
            polls_succeeded = metrics.polls_total.with_label_values(&["success"]).get(),
            polls_failed = metrics.polls_total.with_label_values(&["failure"]).get(),
            "Shutdown complete"
        );

        match early_exit {
            Some(name) => anyhow::bail!("{name} task failed"),
            None => Ok(()),
        }
    }
}

/// Wire everything up and run until SIGINT/SIGTERM.
pub async fn run(config: ExporterConfig) -> anyhow::Result<()> {
    Exporter::build(config)
        .await?
        .run_until(shutdown_signal())
        .await
}

fn task_name(joined: &Result<TaskExit, JoinError>) -> &'static str {
    match joined {
        Ok((name, _)) => *name,
        Err(_) => "unknown",
    }
}

/// Returns true if the task failed. `failure` is the message logged for an
/// error result.
fn log_task_exit(joined: Result<TaskExit, JoinError>, failure: &str) -> bool {
    match joined {
        Ok((name, Ok(()))) => {
            debug!(task = name, "Task finished");
            false
        }
        Ok((name, Err(e))) => {
            error!(task = name, error = %e, "{failure}");
            true
        }
        Err(e) => {
            error!(error = %e, "Task panicked");
            true
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
