//! Timer task and its handle.
//!
//! The countdown runs on its own Tokio task and is driven by commands sent
//! through a [`TimerHandle`]. A one-second interval exists only while the
//! countdown runs; stopping drops it, so a reset or restore never leaves a
//! second interval ticking alongside the new one.
//!
//! Every transition is reported on the event channel returned by
//! [`TimerHandle::spawn`]. Hosts should keep the latest
//! [`TimerEvent::Snapshot`] and pass it to [`TimerHandle::restore`] after a
//! suspension; ticks may be missed without affecting correctness.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, Interval};
use tracing::{debug, info, trace};

use crate::countdown::Countdown;
use crate::error::{Result, TimerError};
use crate::snapshot::SnapshotStore;
use crate::types::{Presets, TimerEvent, TimerMode, TimerSnapshot, TimerState};

/// Period of the countdown.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Capacity of the command channel.
const COMMAND_BUFFER: usize = 32;

/// Source of wall-clock time for snapshots and drift correction.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug)]
enum Command {
    Start,
    Pause,
    Reset(u64),
    SetMode(TimerMode),
    Restore(TimerSnapshot),
    State(oneshot::Sender<TimerState>),
    Snapshot(oneshot::Sender<TimerSnapshot>),
    Shutdown,
}

/// Cloneable handle to a running timer task.
///
/// The task stops after [`shutdown`](Self::shutdown) or once every handle
/// has been dropped.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    commands: mpsc::Sender<Command>,
}

impl TimerHandle {
    /// Spawns a stopped timer at `seconds` in `mode`, using the system clock.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn spawn(seconds: u64, mode: TimerMode) -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        Self::spawn_with_clock(seconds, mode, SystemClock)
    }

    /// Spawns a stopped timer armed with the focus preset.
    #[must_use]
    pub fn from_presets(presets: &Presets) -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        Self::spawn(presets.seconds(TimerMode::Focus), TimerMode::Focus)
    }

    /// Spawns a stopped timer reading wall-clock time from `clock`.
    #[must_use]
    pub fn spawn_with_clock<C: Clock>(
        seconds: u64,
        mode: TimerMode,
        clock: C,
    ) -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let actor = TimerActor {
            countdown: Countdown::new(seconds, mode, clock.now()),
            clock,
            commands: commands_rx,
            events: events_tx,
            interval: None,
        };
        tokio::spawn(actor.run());

        (
            Self {
                commands: commands_tx,
            },
            events_rx,
        )
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| TimerError::ChannelClosed)
    }

    /// Starts counting down. Ignored while running or at zero.
    pub async fn start(&self) -> Result<()> {
        self.send(Command::Start).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    /// Stops the countdown and sets it to `seconds`.
    pub async fn reset(&self, seconds: u64) -> Result<()> {
        self.send(Command::Reset(seconds)).await
    }

    /// Records the active mode. The remaining time is left as is.
    pub async fn set_mode(&self, mode: TimerMode) -> Result<()> {
        self.send(Command::SetMode(mode)).await
    }

    /// Switches to `mode` and resets to its preset length.
    pub async fn switch_mode(&self, mode: TimerMode, presets: &Presets) -> Result<()> {
        self.set_mode(mode).await?;
        self.reset(presets.seconds(mode)).await
    }

    /// Re-attaches to a saved snapshot, correcting for time spent suspended.
    pub async fn restore(&self, snapshot: TimerSnapshot) -> Result<()> {
        self.send(Command::Restore(snapshot)).await
    }

    /// Restores from `store` if it holds a snapshot. Returns whether one was found.
    pub async fn restore_from<S: SnapshotStore>(&self, store: &S) -> Result<bool> {
        match store.load().await? {
            Some(snapshot) => {
                self.restore(snapshot).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Current state of the countdown.
    pub async fn state(&self) -> Result<TimerState> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::State(reply_tx)).await?;
        reply_rx.await.map_err(|_| TimerError::ChannelClosed)
    }

    /// Latest snapshot of the countdown.
    pub async fn snapshot(&self) -> Result<TimerSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot(reply_tx)).await?;
        reply_rx.await.map_err(|_| TimerError::ChannelClosed)
    }

    /// Saves the latest snapshot to `store`.
    pub async fn save_to<S: SnapshotStore>(&self, store: &S) -> Result<()> {
        let snapshot = self.snapshot().await?;
        store.save(&snapshot).await?;
        Ok(())
    }

    /// Stops the timer task and waits for it to exit.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await?;
        self.commands.closed().await;
        Ok(())
    }
}

struct TimerActor<C> {
    countdown: Countdown,
    clock: C,
    commands: mpsc::Receiver<Command>,
    events: mpsc::UnboundedSender<TimerEvent>,
    /// Present only while the countdown is running.
    interval: Option<Interval>,
}

impl<C: Clock> TimerActor<C> {
    async fn run(mut self) {
        debug!(
            remaining = self.countdown.remaining(),
            "Timer task started"
        );

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    if !self.handle(command) {
                        break;
                    }
                }

                () = next_tick(&mut self.interval) => self.on_tick(),
            }
        }

        debug!("Timer task stopped");
    }

    /// Applies `command`. Returns `false` when the task should stop.
    fn handle(&mut self, command: Command) -> bool {
        let now = self.clock.now();
        let was_running = self.countdown.is_running();

        let (events, rearm) = match command {
            Command::Start => (self.countdown.start(now), false),
            Command::Pause => (self.countdown.pause(now), false),
            Command::Reset(seconds) => (self.countdown.reset(seconds, now), false),
            Command::SetMode(mode) => (self.countdown.set_mode(mode, now), false),
            Command::Restore(snapshot) => (self.countdown.restore(&snapshot, now), true),
            Command::State(reply) => {
                let _ = reply.send(self.countdown.state());
                return true;
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.countdown.snapshot());
                return true;
            }
            Command::Shutdown => return false,
        };

        self.emit(events);
        self.sync_interval(was_running, rearm);
        true
    }

    fn on_tick(&mut self) {
        let events = self.countdown.tick(self.clock.now());
        trace!(remaining = self.countdown.remaining(), "Tick");
        if !self.countdown.is_running() {
            self.interval = None;
        }
        self.emit(events);
    }

    fn sync_interval(&mut self, was_running: bool, rearm: bool) {
        if !self.countdown.is_running() {
            if self.interval.take().is_some() {
                debug!(remaining = self.countdown.remaining(), "Countdown stopped");
            }
        } else if !was_running || rearm {
            self.interval = Some(interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL));
            debug!(remaining = self.countdown.remaining(), "Countdown running");
        }
    }

    fn emit(&self, events: Vec<TimerEvent>) {
        for event in events {
            if let TimerEvent::Completed { mode } = &event {
                info!(mode = %mode, "Countdown completed");
            }
            // A dropped receiver only means nobody is listening.
            let _ = self.events.send(event);
        }
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
