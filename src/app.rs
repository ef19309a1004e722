//! Main application logic and orchestration

use crate::config::Config;
use crate::dsp::CamillaClient;
use crate::error::{AppError, AppResult};
use crate::mixer::{AlsaMixer, MixerWatcher};
use crate::state::FallbackRecord;
use crate::sync::Synchronizer;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tracing::{debug, info};

/// Main application struct
pub struct App {
    watcher: MixerWatcher,
    synchronizer: Synchronizer<AlsaMixer, CamillaClient>,
}

/// Exit codes for the application
#[derive(Debug, Clone, Copy)]
pub enum ExitCode {
    Success = 0, // Stopped by SIGINT or SIGTERM
    Error = 2,   // Actual application error
}

/// Result type that includes user exit information
pub type AppRunResult = Result<(), AppError>;

/// Extended result that tracks exit reason
pub struct RunResult {
    pub result: AppRunResult,
    pub exit_code: ExitCode,
}

impl RunResult {
    fn failed(err: AppError) -> Self {
        RunResult {
            result: Err(err),
            exit_code: ExitCode::Error,
        }
    }
}

/// SIGINT and SIGTERM, registered once for the whole run
///
/// A signal delivered while a sync is in progress stays pending until the
/// next call to [`Shutdown::recv`].
pub struct Shutdown {
    interrupt: Signal,
    terminate: Signal,
}

impl Shutdown {
    pub fn register() -> AppResult<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for either signal
    pub async fn recv(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => {}
            _ = self.terminate.recv() => {}
        }
    }
}

impl App {
    /// Open the mixer and prepare an unconnected CamillaDSP client
    pub fn new_with_config(config: Config) -> AppResult<Self> {
        let mixer = AlsaMixer::open(&config.device, &config.control)?;
        let watcher = MixerWatcher::new(&mixer)?;
        let dsp = CamillaClient::new(&config.host, config.port).with_timeout(config.timeout);

        info!(
            device = %config.device,
            control = %config.control,
            camilladsp = dsp.url(),
            range_db = config.range_db,
            "forwarding mixer volume"
        );

        if let Ok(previous) = FallbackRecord::read(&config.state_file) {
            debug!(db = previous.db, mute = previous.mute, "last recorded state");
        }

        let synchronizer = Synchronizer::new(mixer, dsp, config.range_db, config.state_file);
        Ok(App {
            watcher,
            synchronizer,
        })
    }

    /// Sync once, then again on every mixer change until a signal arrives
    pub async fn run(mut self) -> RunResult {
        let mut shutdown = match Shutdown::register() {
            Ok(s) => s,
            Err(e) => return RunResult::failed(e),
        };

        loop {
            match self.synchronizer.sync().await {
                Ok(outcome) => debug!(
                    percent = outcome.percent,
                    db = outcome.db,
                    mute = outcome.mute,
                    state_written = outcome.state_written,
                    remote_applied = outcome.remote_applied,
                    "sync finished"
                ),
                Err(e) => return RunResult::failed(e),
            }

            tokio::select! {
                changed = self.watcher.changed(self.synchronizer.mixer()) => {
                    if let Err(e) = changed {
                        return RunResult::failed(e);
                    }
                }
                _ = shutdown.recv() => break,
            }
        }

        info!("shutting down");
        RunResult {
            result: Ok(()),
            exit_code: ExitCode::Success,
        }
    }
}
