pub mod commands;

use anyhow::Context;
use clap::{Args, ValueEnum};
use octo_config::DEFAULT_BASE_URL;
use octo_infra::OctoClient;
use std::future::Future;
use std::io;
use tokio_util::sync::CancellationToken;
use tracing::{warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Connection options shared by every tool.
#[derive(Args, Clone, Debug)]
pub struct ServerArgs {
    /// OctoPrint base URL
    #[arg(long, global = true, env = "OCTOPRINT_URL", default_value = DEFAULT_BASE_URL)]
    pub url: String,
    /// OctoPrint API key
    #[arg(
        long,
        global = true,
        env = "OCTOPRINT_TOKEN",
        default_value = "",
        hide_env_values = true
    )]
    pub token: String,
}

impl ServerArgs {
    pub fn client(&self) -> anyhow::Result<OctoClient> {
        OctoClient::new(&self.url, self.token.clone())
            .with_context(|| format!("Error creating octoprint client for {}", self.url))
    }
}

#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum StateFormat {
    #[default]
    Plain,
    Csv,
}

/// Install the global subscriber. `RUST_LOG` wins over `--verbose` when set.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let builder = FmtSubscriber::builder().with_writer(std::io::stderr);
    let installed = match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish())
        }
        Err(_) => {
            tracing::subscriber::set_global_default(builder.with_max_level(level).finish())
        }
    };
    installed.expect("default subscriber");
}

/// Waits on `next_interrupt`: the first interrupt cancels `cancel`, and the
/// function returns `true` once a second one arrives. Returns `false` if the
/// signal source fails.
pub async fn watch_interrupts<F, Fut>(
    mut next_interrupt: F,
    cancel: CancellationToken,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if next_interrupt().await.is_err() {
        return false;
    }
    warn!("Interrupted, cancelling remaining downloads (interrupt again to quit)");
    cancel.cancel();
    next_interrupt().await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn first_interrupt_cancels_second_forces_exit() {
        let signal = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let watcher = tokio::spawn({
            let signal = signal.clone();
            let cancel = cancel.clone();
            watch_interrupts(
                move || {
                    let signal = signal.clone();
                    async move {
                        signal.notified().await;
                        Ok(())
                    }
                },
                cancel,
            )
        });

        signal.notify_one();
        tokio::time::timeout(Duration::from_secs(5), cancel.cancelled())
            .await
            .unwrap();
        assert!(!watcher.is_finished());

        signal.notify_one();
        let forced = tokio::time::timeout(Duration::from_secs(5), watcher)
            .await
            .unwrap()
            .unwrap();
        assert!(forced);
    }

    #[tokio::test]
    async fn broken_signal_source_cancels_nothing() {
        let cancel = CancellationToken::new();
        let forced = watch_interrupts(
            || async { Err(io::Error::other("no handler")) },
            cancel.clone(),
        )
        .await;
        assert!(!forced);
        assert!(!cancel.is_cancelled());
    }
}
