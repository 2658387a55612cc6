//! Playback transport state coordination.
//!
//! The machine mirrors the shell's transport buttons: commands move it into
//! the transient `Starting`/`Pausing`/`Stopping` states and apply the matching
//! side effect on the active producer; the engine then reports the producer's
//! actual play state back through [`TransportMachine::source_state_changed`],
//! which settles the machine into `Playing`, `Paused` or `Stopped`.

use tracing::debug;

/// Describes one of the states of the audio transport. Exactly one is active
/// at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Starting,
    Playing,
    Pausing,
    Paused,
    Stopping,
}

/// Control surface the transport drives on the active producer.
pub trait PlaybackSource {
    fn start(&mut self);
    fn stop(&mut self);
    /// Rewinds the play position to the beginning of the stream.
    fn seek_to_start(&mut self);
    fn is_playing(&self) -> bool;
}

/// Transport state machine.
///
/// Side effects are applied exactly once per transition; asking for the state
/// the machine is already in is a no-op.
#[derive(Debug, Default)]
pub struct TransportMachine {
    state: TransportState,
}

impl TransportMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Play/pause command from the shell.
    pub fn play_pause(&mut self, source: &mut dyn PlaybackSource) {
        match self.state {
            TransportState::Stopped | TransportState::Paused => {
                self.transition(TransportState::Starting, source);
            }
            TransportState::Playing => {
                self.transition(TransportState::Pausing, source);
            }
            // Ignore the command while a previous transition is in flight.
            TransportState::Starting | TransportState::Pausing | TransportState::Stopping => {}
        }
    }

    /// Stop command from the shell. A paused transport returns to zero
    /// immediately; a playing one passes through `Stopping` first.
    pub fn stop(&mut self, source: &mut dyn PlaybackSource) {
        match self.state {
            TransportState::Paused => self.transition(TransportState::Stopped, source),
            TransportState::Playing | TransportState::Starting | TransportState::Pausing => {
                self.transition(TransportState::Stopping, source);
            }
            TransportState::Stopped | TransportState::Stopping => {}
        }
    }

    /// Confirmation from the engine that the producer started or stopped.
    pub fn source_state_changed(&mut self, is_playing: bool, source: &mut dyn PlaybackSource) {
        if is_playing {
            self.transition(TransportState::Playing, source);
        } else if matches!(self.state, TransportState::Stopping | TransportState::Playing) {
            self.transition(TransportState::Stopped, source);
        } else if self.state == TransportState::Pausing {
            self.transition(TransportState::Paused, source);
        }
    }

    fn transition(&mut self, new_state: TransportState, source: &mut dyn PlaybackSource) {
        if self.state == new_state {
            return;
        }

        debug!(from = ?self.state, to = ?new_state, "transport transition");
        self.state = new_state;

        match new_state {
            TransportState::Starting => source.start(),
            TransportState::Pausing | TransportState::Stopping => source.stop(),
            TransportState::Stopped => source.seek_to_start(),
            TransportState::Playing | TransportState::Paused => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MockSource {
        playing: bool,
        starts: usize,
        stops: usize,
        seeks: usize,
    }

    impl PlaybackSource for MockSource {
        fn start(&mut self) {
            self.playing = true;
            self.starts += 1;
        }

        fn stop(&mut self) {
            self.playing = false;
            self.stops += 1;
        }

        fn seek_to_start(&mut self) {
            self.seeks += 1;
        }

        fn is_playing(&self) -> bool {
            self.playing
        }
    }

    fn confirm(machine: &mut TransportMachine, source: &mut MockSource) {
        machine.source_state_changed(source.playing, source);
    }

    #[test]
    fn play_from_stopped_passes_through_starting() {
        let mut machine = TransportMachine::new();
        let mut source = MockSource::default();

        machine.play_pause(&mut source);
        assert_eq!(machine.state(), TransportState::Starting);
        assert_eq!(source.starts, 1);

        confirm(&mut machine, &mut source);
        assert_eq!(machine.state(), TransportState::Playing);
    }

    #[test]
    fn stop_from_playing_resets_position() {
        let mut machine = TransportMachine::new();
        let mut source = MockSource::default();

        machine.play_pause(&mut source);
        confirm(&mut machine, &mut source);

        machine.stop(&mut source);
        assert_eq!(machine.state(), TransportState::Stopping);
        assert_eq!(source.stops, 1);

        confirm(&mut machine, &mut source);
        assert_eq!(machine.state(), TransportState::Stopped);
        assert_eq!(source.seeks, 1);
    }

    #[test]
    fn pause_and_resume_do_not_reset_position() {
        let mut machine = TransportMachine::new();
        let mut source = MockSource::default();

        machine.play_pause(&mut source);
        confirm(&mut machine, &mut source);

        machine.play_pause(&mut source);
        assert_eq!(machine.state(), TransportState::Pausing);
        confirm(&mut machine, &mut source);
        assert_eq!(machine.state(), TransportState::Paused);
        assert_eq!(source.seeks, 0);

        machine.play_pause(&mut source);
        assert_eq!(machine.state(), TransportState::Starting);
        confirm(&mut machine, &mut source);
        assert_eq!(machine.state(), TransportState::Playing);
        assert_eq!(source.seeks, 0);
        assert_eq!(source.starts, 2);
    }

    #[test]
    fn stop_while_paused_returns_to_zero_immediately() {
        let mut machine = TransportMachine::new();
        let mut source = MockSource::default();

        machine.play_pause(&mut source);
        confirm(&mut machine, &mut source);
        machine.play_pause(&mut source);
        confirm(&mut machine, &mut source);
        assert_eq!(machine.state(), TransportState::Paused);

        machine.stop(&mut source);
        assert_eq!(machine.state(), TransportState::Stopped);
        assert_eq!(source.seeks, 1);
    }

    #[test]
    fn identical_state_applies_no_side_effects() {
        let mut machine = TransportMachine::new();
        let mut source = MockSource::default();

        machine.stop(&mut source);
        machine.stop(&mut source);
        assert_eq!(machine.state(), TransportState::Stopped);
        assert_eq!(source.stops, 0);
        assert_eq!(source.seeks, 0);
    }

    #[test]
    fn unexpected_stop_while_playing_settles_in_stopped() {
        let mut machine = TransportMachine::new();
        let mut source = MockSource::default();

        machine.play_pause(&mut source);
        confirm(&mut machine, &mut source);

        // Source ran out of samples on its own.
        source.playing = false;
        confirm(&mut machine, &mut source);
        assert_eq!(machine.state(), TransportState::Stopped);
        assert_eq!(source.seeks, 1);
    }
}
