//! Rebuild-on-change loop.
//!
//! [`RebuildMachine`] holds the debounce and single-flight rules as a plain
//! state machine driven by explicit timestamps. [`RebuildLoop`] drives it
//! from watcher events and the tokio clock and runs builds one at a time on
//! a blocking thread.

use std::future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};

use malvolio_static::{BuildError, BuildReport, SiteBuilder};

use crate::livereload::{ReloadHub, ReloadMessage};
use crate::watcher::WatchEvent;

/// Anything that can rebuild the site.
pub trait Rebuild: Send + Sync + 'static {
    fn rebuild(&self) -> Result<BuildReport, BuildError>;
}

impl Rebuild for SiteBuilder {
    fn rebuild(&self) -> Result<BuildReport, BuildError> {
        self.build()
    }
}

/// State of the rebuild loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Nothing to do
    Idle,

    /// Waiting for changes to settle
    Debouncing { deadline: Instant },

    /// A build is running; `pending` records changes seen meanwhile
    Building { pending: bool },
}

/// Debounce and single-flight rules for rebuilds.
#[derive(Debug, Clone)]
pub struct RebuildMachine {
    state: LoopState,
    delay: Duration,
}

impl RebuildMachine {
    pub fn new(delay: Duration) -> Self {
        Self {
            state: LoopState::Idle,
            delay,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// A watched source changed.
    pub fn on_change(&mut self, now: Instant) {
        self.state = match self.state {
            LoopState::Idle | LoopState::Debouncing { .. } => LoopState::Debouncing {
                deadline: now + self.delay,
            },
            LoopState::Building { .. } => LoopState::Building { pending: true },
        };
    }

    /// Check the debounce timer. Returns `true` when a build must start now.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        match self.state {
            LoopState::Debouncing { deadline } if now >= deadline => {
                self.state = LoopState::Building { pending: false };
                true
            }
            _ => false,
        }
    }

    /// The running build completed, successfully or not.
    pub fn on_build_finished(&mut self, now: Instant) {
        self.state = match self.state {
            LoopState::Building { pending: true } => LoopState::Debouncing {
                deadline: now + self.delay,
            },
            LoopState::Building { pending: false } => LoopState::Idle,
            other => other,
        };
    }

    /// When the debounce timer fires, if it is armed.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            LoopState::Debouncing { deadline } => Some(deadline),
            _ => None,
        }
    }
}

/// Drives [`RebuildMachine`] from file watch events.
pub struct RebuildLoop<B: Rebuild> {
    builder: Arc<B>,
    machine: RebuildMachine,
    reload: Option<ReloadHub>,
}

impl<B: Rebuild> RebuildLoop<B> {
    pub fn new(builder: Arc<B>, delay: Duration) -> Self {
        Self {
            builder,
            machine: RebuildMachine::new(delay),
            reload: None,
        }
    }

    /// Notify live reload clients after each build.
    pub fn with_reload(mut self, hub: ReloadHub) -> Self {
        self.reload = Some(hub);
        self
    }

    /// Run until `shutdown` changes or the event channel closes.
    ///
    /// Returns the number of builds started. A build in progress when
    /// shutdown is requested runs to completion first.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<WatchEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> usize {
        let mut builds = 0;

        loop {
            let deadline = self.machine.deadline();

            tokio::select! {
                biased;

                _ = shutdown.changed() => break,

                event = events.recv() => match event {
                    Some(event) => {
                        tracing::debug!("Changed: {}", event.path().display());
                        self.machine.on_change(Instant::now());
                    }
                    None => break,
                },

                _ = wait_until(deadline) => {
                    if self.machine.on_tick(Instant::now()) {
                        builds += 1;
                        self.build(&mut events).await;
                    }
                }
            }
        }

        tracing::debug!("Rebuild loop stopped after {} build(s)", builds);
        builds
    }

    /// Run one build, recording changes that arrive while it runs.
    async fn build(&mut self, events: &mut mpsc::Receiver<WatchEvent>) {
        tracing::info!("Change detected, rebuilding...");

        let builder = Arc::clone(&self.builder);
        let mut task = tokio::task::spawn_blocking(move || builder.rebuild());
        let mut events_open = true;

        let result = loop {
            tokio::select! {
                result = &mut task => break result,

                event = events.recv(), if events_open => match event {
                    Some(event) => {
                        tracing::debug!("Changed during build: {}", event.path().display());
                        self.machine.on_change(Instant::now());
                    }
                    None => events_open = false,
                },
            }
        };

        let message = match result {
            Ok(Ok(report)) => {
                match &report.sync_error {
                    Some(e) => tracing::error!("Rebuild finished with output errors: {}", e),
                    None => tracing::info!(
                        "Rebuild finished in {}ms ({} page(s), {} skipped)",
                        report.duration_ms,
                        report.pages,
                        report.skipped.len()
                    ),
                }
                ReloadMessage::Reload
            }
            Ok(Err(e)) => {
                tracing::error!("Rebuild failed: {}", e);
                ReloadMessage::BuildFailed {
                    message: e.to_string(),
                }
            }
            Err(e) => {
                tracing::error!("Rebuild task failed: {}", e);
                ReloadMessage::BuildFailed {
                    message: e.to_string(),
                }
            }
        };

        if let Some(hub) = &self.reload {
            hub.send(message);
        }

        self.machine.on_build_finished(Instant::now());
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => future::pending().await,
    }
}
