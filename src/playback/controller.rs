use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    foundation::error::{PlaybackError, ViewerResult},
    playback::{
        state::{FrameRate, ViewerState},
        timer::{PlaybackTimer, Tick},
    },
    trace::model::{Frame, Trace},
};

/// Where a selected frame is shown. Called exactly once per successful seek or step.
pub trait FrameSink {
    /// Present frame `index` of `trace`; `index` also drives any position indicator.
    fn present(&mut self, trace: &Trace, index: usize, frame: &Frame) -> ViewerResult<()>;
}

/// Owns the viewer state and the playback timer; funnels every state change.
pub struct Controller<S> {
    trace: Arc<Trace>,
    state: ViewerState,
    timer: PlaybackTimer,
    sink: S,
    render_failures: u64,
}

impl<S: FrameSink> Controller<S> {
    /// Ticks from the playback timer are sent to `ticks`; feed them back via [`Self::on_tick`].
    pub fn new(trace: Arc<Trace>, sink: S, ticks: mpsc::UnboundedSender<Tick>) -> Self {
        let state = ViewerState::new(trace.frame_count());
        Self {
            trace,
            state,
            timer: PlaybackTimer::new(ticks),
            sink,
            render_failures: 0,
        }
    }

    /// Current frame index and play state.
    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    /// The loaded trace.
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Where frames are presented.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// The single playback timer.
    pub fn timer(&self) -> &PlaybackTimer {
        &self.timer
    }

    /// Renders that failed since construction. Failures never stop playback.
    pub fn render_failures(&self) -> u64 {
        self.render_failures
    }

    /// Jump to `index` (clamped) and present it.
    pub fn seek(&mut self, index: i64) -> Result<usize, PlaybackError> {
        let idx = self.state.seek(index)?;
        self.present(idx);
        Ok(idx)
    }

    /// Move by `delta` frames (clamped) and present the result.
    pub fn step(&mut self, delta: i64) -> Result<usize, PlaybackError> {
        let idx = self.state.step(delta)?;
        self.present(idx);
        Ok(idx)
    }

    /// Flip play/pause, starting or cancelling the timer. Returns the new playing flag.
    pub fn toggle_play(&mut self) -> bool {
        let playing = self.state.toggle_play();
        if playing {
            self.timer.start(self.state.fps().interval());
        } else {
            self.timer.cancel();
        }
        tracing::info!(playing, fps = self.state.fps().get(), "playback toggled");
        playing
    }

    /// Change the frame rate; a running timer is replaced at the new period.
    pub fn set_frame_rate(&mut self, fps: u32) -> Result<(), PlaybackError> {
        let fps = FrameRate::new(fps)?;
        self.state.set_fps(fps);
        if self.state.is_playing() {
            self.timer.start(fps.interval());
        }
        Ok(())
    }

    /// Advance one frame for a live timer tick; stale ticks are ignored.
    ///
    /// At the last frame this keeps presenting the final frame: playback stalls rather than
    /// wrapping or stopping.
    pub fn on_tick(&mut self, tick: Tick) -> Option<usize> {
        if !self.state.is_playing() || !self.timer.accepts(tick) {
            tracing::trace!(generation = tick.generation, "stale playback tick dropped");
            return None;
        }
        self.step(1).ok()
    }

    fn present(&mut self, idx: usize) {
        let Some(frame) = self.trace.frame(idx) else {
            return;
        };
        if let Err(e) = self.sink.present(&self.trace, idx, frame) {
            self.render_failures += 1;
            tracing::error!(frame = idx, error = %e, "frame render failed");
        }
    }
}

/// A user action from whatever input the player is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerCommand {
    TogglePlay,
    Step(i64),
    Seek(i64),
    SetFps(u32),
    Quit,
}

impl PlayerCommand {
    /// Parse a line: `p`, `n`, `b`, `s <index>`, `f <fps>`, `q`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let cmd = parts.next()?;
        let arg = parts.next();
        if parts.next().is_some() {
            return None;
        }
        match (cmd, arg) {
            ("p" | "play" | "pause", None) => Some(Self::TogglePlay),
            ("n" | "next", None) => Some(Self::Step(1)),
            ("b" | "prev", None) => Some(Self::Step(-1)),
            ("s" | "seek", Some(n)) => n.parse().ok().map(Self::Seek),
            ("f" | "fps", Some(n)) => n.parse().ok().map(Self::SetFps),
            ("q" | "quit", None) => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Present frame 0, then serve commands and timer ticks until `Quit` or the command
/// channel closes. Both sources are handled on this task, so index updates never race.
pub async fn run_player<S: FrameSink>(
    controller: &mut Controller<S>,
    ticks: &mut mpsc::UnboundedReceiver<Tick>,
    commands: &mut mpsc::Receiver<PlayerCommand>,
) -> ViewerResult<()> {
    controller.seek(0)?;

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                let Some(cmd) = cmd else { break };
                if cmd == PlayerCommand::Quit {
                    break;
                }
                apply_command(controller, cmd);
            }
            Some(tick) = ticks.recv() => {
                controller.on_tick(tick);
            }
        }
    }

    if controller.state().is_playing() {
        controller.toggle_play();
    }
    Ok(())
}

fn apply_command<S: FrameSink>(controller: &mut Controller<S>, cmd: PlayerCommand) {
    let result = match cmd {
        PlayerCommand::TogglePlay => {
            controller.toggle_play();
            Ok(())
        }
        PlayerCommand::Step(d) => controller.step(d).map(|_| ()),
        PlayerCommand::Seek(i) => controller.seek(i).map(|_| ()),
        PlayerCommand::SetFps(f) => controller.set_frame_rate(f),
        PlayerCommand::Quit => Ok(()),
    };
    if let Err(e) = result {
        tracing::warn!(error = %e, "player command rejected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_parsing() {
        assert_eq!(PlayerCommand::parse("p"), Some(PlayerCommand::TogglePlay));
        assert_eq!(PlayerCommand::parse(" n "), Some(PlayerCommand::Step(1)));
        assert_eq!(PlayerCommand::parse("b"), Some(PlayerCommand::Step(-1)));
        assert_eq!(PlayerCommand::parse("s -4"), Some(PlayerCommand::Seek(-4)));
        assert_eq!(PlayerCommand::parse("f 5"), Some(PlayerCommand::SetFps(5)));
        assert_eq!(PlayerCommand::parse("q"), Some(PlayerCommand::Quit));
        assert_eq!(PlayerCommand::parse("s"), None);
        assert_eq!(PlayerCommand::parse("f x"), None);
        assert_eq!(PlayerCommand::parse("n 2 3"), None);
        assert_eq!(PlayerCommand::parse(""), None);
    }
}
