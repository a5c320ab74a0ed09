use std::time::Duration;

use tokio::{sync::mpsc, task::JoinHandle, time::MissedTickBehavior};

/// One firing of the playback timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    /// Timer instance that produced the tick.
    pub generation: u64,
}

/// Repeating auto-advance timer. At most one task runs at a time.
///
/// Restarting aborts the previous task before spawning the next and bumps the generation,
/// so ticks already queued by the old task can be told apart and dropped.
pub struct PlaybackTimer {
    tx: mpsc::UnboundedSender<Tick>,
    task: Option<JoinHandle<()>>,
    generation: u64,
    interval: Option<Duration>,
}

impl PlaybackTimer {
    pub fn new(tx: mpsc::UnboundedSender<Tick>) -> Self {
        Self {
            tx,
            task: None,
            generation: 0,
            interval: None,
        }
    }

    /// (Re)start firing every `interval`. Must be called inside a Tokio runtime.
    pub fn start(&mut self, interval: Duration) {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let tx = self.tx.clone();
        self.task = Some(tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(Tick { generation }).is_err() {
                    break;
                }
            }
        }));
        self.interval = Some(interval);
        tracing::debug!(generation, interval_ms = interval.as_millis() as u64, "playback timer started");
    }

    /// Stop firing. Ticks already queued become stale.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(generation = self.generation, "playback timer cancelled");
        }
        self.interval = None;
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Period of the running timer.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True when `tick` came from the currently running timer.
    pub fn accepts(&self, tick: Tick) -> bool {
        self.is_active() && tick.generation == self.generation
    }
}

impl Drop for PlaybackTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
