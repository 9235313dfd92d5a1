//! Session driver: one tokio task per session.
//!
//! The task owns the `GameSession`. Callers talk to it through a cloneable
//! `DriverHandle`; every command carries a `oneshot` for its reply. Between
//! commands the task sleeps until the session's next deadline and polls.

use std::time::Duration;

use rnglab_core::clock::Clock;
use rnglab_core::error::StorageError;
use rnglab_engine::application::export::ExportSnapshot;
use rnglab_engine::application::session::GameSession;
use rnglab_engine::domain::config::SpinConfiguration;
use rnglab_engine::domain::events::SessionEvent;
use rnglab_engine::domain::seed::SeedState;
use rnglab_engine::domain::spin::{SpinPhase, SpinResult, SpinTicket};
use rnglab_engine::domain::stats::Stats;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::DriverError;

const COMMAND_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 256;

/// Point-in-time copy of a session's observable state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    /// Configuration the next trial will use.
    pub configuration: SpinConfiguration,
    /// Seed in effect.
    pub seed: SeedState,
    /// Engine phase.
    pub phase: SpinPhase,
    /// Ledger contents, newest first.
    pub history: Vec<SpinResult>,
    /// Statistics over `history`.
    pub stats: Stats,
    /// Interval of the running autoplay.
    pub autoplay_interval: Option<Duration>,
}

impl SessionView {
    fn capture(session: &GameSession) -> Self {
        Self {
            configuration: session.configuration(),
            seed: session.seed().clone(),
            phase: session.phase(),
            history: session.history().to_vec(),
            stats: session.stats(),
            autoplay_interval: session.autoplay_interval(),
        }
    }
}

enum Command {
    RequestSpin(oneshot::Sender<Option<SpinTicket>>),
    Configure(SpinConfiguration, oneshot::Sender<SpinConfiguration>),
    SetSeed(String, oneshot::Sender<()>),
    StartAutoplay(Duration, oneshot::Sender<bool>),
    StopAutoplay(oneshot::Sender<bool>),
    ToggleAutoplay(oneshot::Sender<bool>),
    ClearHistory(oneshot::Sender<usize>),
    Export(oneshot::Sender<Result<ExportSnapshot, StorageError>>),
    Flush(oneshot::Sender<Result<(), StorageError>>),
    View(oneshot::Sender<SessionView>),
    Shutdown(oneshot::Sender<()>),
}

/// Async front end to a running session.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<SessionEvent>,
}

/// Moves `session` onto a new task and returns a handle to it.
///
/// The task ends on `shutdown` or when every handle is dropped; either way
/// the session is torn down and handed back through the `JoinHandle`.
/// Must be called from within a tokio runtime.
pub fn spawn(mut session: GameSession) -> (DriverHandle, JoinHandle<GameSession>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

    let sink = event_tx.clone();
    session.subscribe(move |event: &SessionEvent| {
        // No subscribers is not an error.
        let _ = sink.send(event.clone());
    });

    let handle = tokio::spawn(run(session, command_rx));
    (
        DriverHandle {
            commands: command_tx,
            events: event_tx,
        },
        handle,
    )
}

async fn run(mut session: GameSession, mut commands: mpsc::Receiver<Command>) -> GameSession {
    let session_id = session.id();
    info!(%session_id, "session driver started");

    loop {
        let fired = session.poll();
        if fired > 0 {
            debug!(%session_id, fired, "timers fired");
        }
        let wake = session
            .next_deadline()
            .map(|deadline| Instant::now() + session.clock().until(deadline));

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    session.teardown();
                    break;
                };
                if !apply(&mut session, command) {
                    break;
                }
            }
            () = sleep_until(wake) => {}
        }
    }

    info!(%session_id, "session driver stopped");
    session
}

async fn sleep_until(wake: Option<Instant>) {
    match wake {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

// Returns false once the session has been torn down. A dropped reply
// receiver means the caller stopped waiting; the command still applied.
fn apply(session: &mut GameSession, command: Command) -> bool {
    match command {
        Command::RequestSpin(reply) => {
            let _ = reply.send(session.request_spin());
        }
        Command::Configure(config, reply) => {
            let _ = reply.send(session.configure(config));
        }
        Command::SetSeed(seed, reply) => {
            session.set_seed(seed);
            let _ = reply.send(());
        }
        Command::StartAutoplay(interval, reply) => {
            let _ = reply.send(session.start_autoplay(interval).is_some());
        }
        Command::StopAutoplay(reply) => {
            let _ = reply.send(session.stop_autoplay());
        }
        Command::ToggleAutoplay(reply) => {
            let _ = reply.send(session.toggle_autoplay());
        }
        Command::ClearHistory(reply) => {
            let _ = reply.send(session.clear_history());
        }
        Command::Export(reply) => {
            let _ = reply.send(session.export());
        }
        Command::Flush(reply) => {
            let _ = reply.send(session.flush());
        }
        Command::View(reply) => {
            let _ = reply.send(SessionView::capture(session));
        }
        Command::Shutdown(reply) => {
            session.teardown();
            let _ = reply.send(());
            return false;
        }
    }
    true
}

impl DriverHandle {
    /// Receives every event emitted after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn call<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, DriverError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| DriverError::Closed)?;
        response.await.map_err(|_| DriverError::Closed)
    }

    /// Requests a trial. `Ok(None)` means one was already pending.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Closed` if the driver has stopped.
    pub async fn request_spin(&self) -> Result<Option<SpinTicket>, DriverError> {
        self.call(Command::RequestSpin).await
    }

    /// Applies a configuration and returns what took effect.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Closed` if the driver has stopped.
    pub async fn configure(
        &self,
        config: SpinConfiguration,
    ) -> Result<SpinConfiguration, DriverError> {
        self.call(|reply| Command::Configure(config, reply)).await
    }

    /// Changes the seed.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Closed` if the driver has stopped.
    pub async fn set_seed(&self, seed: impl Into<String>) -> Result<(), DriverError> {
        let seed = seed.into();
        self.call(|reply| Command::SetSeed(seed, reply)).await
    }

    /// Starts autoplay; a zero interval stops it. Returns whether autoplay
    /// is now running.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Closed` if the driver has stopped.
    pub async fn start_autoplay(&self, interval: Duration) -> Result<bool, DriverError> {
        self.call(|reply| Command::StartAutoplay(interval, reply)).await
    }

    /// Stops autoplay. Returns whether it was running.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Closed` if the driver has stopped.
    pub async fn stop_autoplay(&self) -> Result<bool, DriverError> {
        self.call(Command::StopAutoplay).await
    }

    /// Toggles autoplay at the default interval. Returns whether it is now
    /// running.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Closed` if the driver has stopped.
    pub async fn toggle_autoplay(&self) -> Result<bool, DriverError> {
        self.call(Command::ToggleAutoplay).await
    }

    /// Empties the ledger. Returns how many entries were dropped.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Closed` if the driver has stopped.
    pub async fn clear_history(&self) -> Result<usize, DriverError> {
        self.call(Command::ClearHistory).await
    }

    /// Captures and stores an export snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Closed` if the driver has stopped, or
    /// `DriverError::Storage` if the write failed.
    pub async fn export(&self) -> Result<ExportSnapshot, DriverError> {
        self.call(Command::Export).await?.map_err(DriverError::from)
    }

    /// Writes pending history now.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Closed` if the driver has stopped, or
    /// `DriverError::Storage` if the write failed.
    pub async fn flush(&self) -> Result<(), DriverError> {
        self.call(Command::Flush).await?.map_err(DriverError::from)
    }

    /// Current observable state.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Closed` if the driver has stopped.
    pub async fn view(&self) -> Result<SessionView, DriverError> {
        self.call(Command::View).await
    }

    /// Tears the session down and stops the driver.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Closed` if the driver had already stopped.
    pub async fn shutdown(&self) -> Result<(), DriverError> {
        self.call(Command::Shutdown).await
    }
}
