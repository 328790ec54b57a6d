//! Daemon orchestration: startup, initial sync, change listening,
//! graceful shutdown.
//!
//! Lifecycle: `Created → Initializing → Listening → Stopping → Stopped`.
//! Change notifications arrive on source-owned tasks, flow through one
//! mpsc channel into the control loop, and are coalesced by the
//! [`Debouncer`]; the debounced action is the sole writer path for the
//! env file.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use flagsync_core::config::Config;
use flagsync_source::{Connection, FlagChange};
use flagsync_sync::{pipeline, WriteResult};

use crate::debounce::Debouncer;
use crate::error::DaemonError;

const READY_TIMEOUT: Duration = Duration::from_secs(10);
const READY_POLL: Duration = Duration::from_millis(500);

/// Daemon lifecycle states, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Created,
    Initializing,
    Listening,
    Stopping,
    Stopped,
}

/// Handle for requesting shutdown from another task or a signal
/// context. Only flips the stop signal; teardown runs on the control
/// loop. Safe to call any number of times.
#[derive(Debug, Clone)]
pub struct DaemonHandle {
    shutdown_tx: broadcast::Sender<()>,
}

impl DaemonHandle {
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// The sync daemon. Owns the connection handle for its whole lifetime;
/// there is no process-wide client singleton.
pub struct Daemon {
    config: Arc<Config>,
    connection: Arc<dyn Connection>,
    shutdown_tx: broadcast::Sender<()>,
    // Subscribed at construction so a stop requested before `run` is
    // not lost.
    shutdown_rx: broadcast::Receiver<()>,
    state: DaemonState,
}

impl Daemon {
    pub fn new(config: Config, connection: Arc<dyn Connection>) -> (Self, DaemonHandle) {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(16);
        let handle = DaemonHandle {
            shutdown_tx: shutdown_tx.clone(),
        };
        let daemon = Self {
            config: Arc::new(config),
            connection,
            shutdown_tx,
            shutdown_rx,
            state: DaemonState::Created,
        };
        (daemon, handle)
    }

    pub fn handle(&self) -> DaemonHandle {
        DaemonHandle {
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }

    pub fn state(&self) -> DaemonState {
        self.state
    }

    /// Run until a stop is requested, then tear down.
    pub async fn run(mut self) -> Result<(), DaemonError> {
        self.transition(DaemonState::Initializing);

        wait_for_ready(self.connection.as_ref(), READY_TIMEOUT, READY_POLL).await;

        // Initial full sync so the file is never left stale from a
        // prior run for longer than startup takes.
        tracing::info!("performing initial flag evaluation and env sync");
        run_cycle_task(self.config.clone(), self.connection.clone()).await;

        let debouncer = {
            let config = self.config.clone();
            let connection = self.connection.clone();
            Debouncer::spawn(self.config.debounce(), move || {
                run_cycle_task(config.clone(), connection.clone())
            })
        };

        let (change_tx, mut change_rx) = mpsc::unbounded_channel::<FlagChange>();
        self.register_watchers(&change_tx);

        self.transition(DaemonState::Listening);
        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => break,
                change = change_rx.recv() => {
                    // `change_tx` is still held here, so the channel
                    // cannot close under us.
                    let Some(change) = change else { break };
                    tracing::debug!(key = %change.key, "change notification; scheduling debounced sync");
                    debouncer.trigger();
                }
            }
        }
        drop(change_tx);

        self.transition(DaemonState::Stopping);
        debouncer.shutdown().await;
        self.connection.close();
        self.transition(DaemonState::Stopped);
        Ok(())
    }

    /// One change watch per tracked key; a per-key failure is logged
    /// and does not prevent registering the rest.
    fn register_watchers(&self, change_tx: &mpsc::UnboundedSender<FlagChange>) {
        for key in self.config.tracked_keys.iter() {
            match self
                .connection
                .watch(key, &self.config.context, change_tx.clone())
            {
                Ok(()) => tracing::info!(key = %key, "registered change watch"),
                Err(err) => tracing::error!(
                    key = %key,
                    error = %err,
                    "failed to register change watch; continuing without it",
                ),
            }
        }
    }

    fn transition(&mut self, next: DaemonState) {
        tracing::info!(from = ?self.state, to = ?next, "daemon state transition");
        self.state = next;
    }
}

/// Poll the source for readiness, up to `timeout`. Proceeding after the
/// timeout is safe: evaluation already tolerates an unready source.
async fn wait_for_ready(connection: &dyn Connection, timeout: Duration, poll: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if connection.is_ready() {
            tracing::info!("flag source ready");
            return;
        }
        tokio::time::sleep(poll).await;
    }
    tracing::warn!(
        timeout_secs = timeout.as_secs(),
        "flag source not ready after timeout; continuing with best-effort evaluation",
    );
}

/// One evaluation + persist cycle on the blocking pool. All failures
/// are logged, never fatal to the daemon.
async fn run_cycle_task(config: Arc<Config>, connection: Arc<dyn Connection>) {
    let result =
        tokio::task::spawn_blocking(move || pipeline::run_cycle(connection.as_ref(), &config))
            .await;
    match result {
        Ok(Ok(WriteResult::Written { path })) => {
            tracing::info!(path = %path.display(), "sync cycle wrote env file");
        }
        Ok(Ok(WriteResult::Unchanged { path })) => {
            tracing::debug!(path = %path.display(), "sync cycle found env file up to date");
        }
        Ok(Err(err)) => tracing::error!(error = %err, "sync cycle failed"),
        Err(err) => tracing::error!(error = %err, "sync cycle join failure"),
    }
}

/// Build the runtime and block the current thread until the daemon
/// exits.
pub fn start_blocking(config: Config, connection: Arc<dyn Connection>) -> Result<(), DaemonError> {
    init_tracing(&config.log_level);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| DaemonError::Runtime(format!("failed to build tokio runtime: {err}")))?;

    runtime.block_on(async move {
        let (daemon, handle) = Daemon::new(config, connection);

        // The signal path only forwards the stop request; teardown runs
        // on the control loop.
        tokio::spawn(async move {
            match wait_for_stop_signal().await {
                Ok(()) => {
                    tracing::info!("received stop signal; requesting shutdown");
                    handle.stop();
                }
                Err(err) => tracing::error!(error = %err, "signal handler failed"),
            }
        });

        daemon.run().await
    })
}

#[cfg(unix)]
async fn wait_for_stop_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = term.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_stop_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
