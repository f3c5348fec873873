//! Session driver
//!
//! Serializes the two cadences that touch a session: the periodic context
//! refresh and per-turn dispatch, plus UI lifecycle commands. One task owns
//! the session and handles one command at a time, so a UI mutation can never
//! interleave with an in-flight dispatch or synthesis. A generated message is
//! dispatched and the context refreshed before the next command is taken.

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use super::SessionConfig;
use super::context::ContextInjector;
use super::control::{StateDetail, StateSummary};
use super::error::{DriverError, RegistryResult};
use super::session::Session;
use super::state::StateConfig;
use super::storage::SettingsStore;
use super::turn::TurnRecord;

const COMMAND_QUEUE_DEPTH: usize = 64;

/// Registry lifecycle operation queued from the UI
#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle {
    /// Add a state
    Create(StateConfig),
    /// Activate by name
    Activate(String),
    /// Deactivate by name
    Deactivate(String),
    /// Remove by name
    Remove(String),
    /// Restore the seed configuration
    Reset,
}

enum Command {
    Generated(String, oneshot::Sender<TurnRecord>),
    Lifecycle(Lifecycle, oneshot::Sender<RegistryResult<()>>),
    Select(String, oneshot::Sender<RegistryResult<StateDetail>>),
    List(oneshot::Sender<Vec<StateSummary>>),
    Refresh(oneshot::Sender<String>),
    Shutdown,
}

/// Cloneable handle for submitting work to a running [`SessionDriver`]
///
/// The driver stops once every handle has been dropped.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Dispatch one generated message and wait for its turn record.
    pub async fn dispatch(&self, text: impl Into<String>) -> Result<TurnRecord, DriverError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Generated(text.into(), reply)).await?;
        response.await.map_err(|_| DriverError::Stopped)
    }

    /// Apply a lifecycle operation at the next turn boundary.
    pub async fn apply(&self, op: Lifecycle) -> Result<(), DriverError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Lifecycle(op, reply)).await?;
        Ok(response.await.map_err(|_| DriverError::Stopped)??)
    }

    /// Select a state for the detail view.
    pub async fn select(&self, name: impl Into<String>) -> Result<StateDetail, DriverError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Select(name.into(), reply)).await?;
        Ok(response.await.map_err(|_| DriverError::Stopped)??)
    }

    /// Current list view.
    pub async fn list(&self) -> Result<Vec<StateSummary>, DriverError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::List(reply)).await?;
        response.await.map_err(|_| DriverError::Stopped)
    }

    /// Refresh the context immediately and return the installed text.
    pub async fn refresh(&self) -> Result<String, DriverError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Refresh(reply)).await?;
        response.await.map_err(|_| DriverError::Stopped)
    }

    /// Ask the driver to stop after the commands already queued.
    pub async fn shutdown(&self) -> Result<(), DriverError> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<(), DriverError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| DriverError::Stopped)
    }
}

/// Single-task owner of a session and its context injector
pub struct SessionDriver<S: SettingsStore, I: ContextInjector> {
    session: Session<S>,
    injector: I,
    config: SessionConfig,
    commands: mpsc::Receiver<Command>,
}

impl<S: SettingsStore, I: ContextInjector> SessionDriver<S, I> {
    /// Create a driver and the handle used to feed it.
    pub fn new(session: Session<S>, injector: I, config: SessionConfig) -> (Self, SessionHandle) {
        let (sender, receiver) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let driver = Self {
            session,
            injector,
            config,
            commands: receiver,
        };
        (driver, SessionHandle { commands: sender })
    }

    /// Run until every handle is dropped or a shutdown is requested, then
    /// hand the session back.
    ///
    /// The first refresh happens immediately; later ones follow the
    /// configured interval.
    pub async fn run(mut self) -> Session<S> {
        let mut ticker = time::interval(self.config.refresh_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(session = %self.session.id(), "session driver started");

        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                _ = ticker.tick() => {
                    self.refresh();
                }
            }
        }

        info!(session = %self.session.id(), "session driver stopped");
        self.session
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Generated(text, reply) => {
                let record = self.session.dispatch(&text);
                self.refresh();
                let _ = reply.send(record);
            }
            Command::Lifecycle(op, reply) => {
                let result = match op {
                    Lifecycle::Create(config) => self.session.create(config),
                    Lifecycle::Activate(name) => self.session.activate(&name),
                    Lifecycle::Deactivate(name) => self.session.deactivate(&name),
                    Lifecycle::Remove(name) => self.session.remove(&name),
                    Lifecycle::Reset => {
                        self.session.reset();
                        Ok(())
                    }
                };
                if result.is_ok() {
                    self.refresh();
                }
                let _ = reply.send(result);
            }
            Command::Select(name, reply) => {
                let _ = reply.send(self.session.select_for_editing(&name));
            }
            Command::List(reply) => {
                let _ = reply.send(self.session.list());
            }
            Command::Refresh(reply) => {
                let text = self.refresh();
                let _ = reply.send(text);
            }
            Command::Shutdown => {}
        }
    }

    fn refresh(&mut self) -> String {
        debug!(slot = %self.config.slot_id, "refreshing context");
        self.session.refresh(&mut self.injector, &self.config)
    }
}
