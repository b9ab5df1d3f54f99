//! Playback contract and the play/export controller

use chordsmith_core::{Note, Pattern, midi_number};
use tracing::{debug, info, warn};

use crate::error::PlaybackError;
use crate::preferences::{MAX_BPM, MIN_BPM};

/// Anything that can schedule notes against a tempo.
///
/// `time` and `duration` are beats, `velocity` is 0.0 to 1.0.
pub trait PlaybackEngine {
    fn play(&mut self, notes: &[Note]) -> Result<(), PlaybackError>;
    fn stop(&mut self);
    fn set_bpm(&mut self, bpm: f64);
    fn bpm(&self) -> f64;
    fn is_playing(&self) -> bool;
}

/// A note placed on the wall clock
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledNote {
    pub pitch: String,
    /// MIDI number, if the pitch parses
    pub midi: Option<i32>,
    pub start_secs: f64,
    pub duration_secs: f64,
    pub velocity: f64,
}

/// Engine that computes the schedule and logs it without producing audio
#[derive(Debug, Clone)]
pub struct DryRunEngine {
    bpm: f64,
    playing: bool,
    schedule: Vec<ScheduledNote>,
}

impl Default for DryRunEngine {
    fn default() -> Self {
        Self::new(120.0)
    }
}

impl DryRunEngine {
    pub fn new(bpm: f64) -> Self {
        let mut engine = Self {
            bpm: 120.0,
            playing: false,
            schedule: Vec::new(),
        };
        engine.set_bpm(bpm);
        engine
    }

    /// Seconds per beat at the current tempo
    pub fn secs_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Notes scheduled by the last `play`, cleared on `stop`
    pub fn schedule(&self) -> &[ScheduledNote] {
        &self.schedule
    }
}

impl PlaybackEngine for DryRunEngine {
    fn play(&mut self, notes: &[Note]) -> Result<(), PlaybackError> {
        self.stop();

        let spb = self.secs_per_beat();
        self.schedule = notes
            .iter()
            .map(|n| ScheduledNote {
                pitch: n.pitch.clone(),
                midi: midi_number(&n.pitch),
                start_secs: n.time * spb,
                duration_secs: n.duration * spb,
                velocity: n.velocity,
            })
            .collect();

        for note in &self.schedule {
            debug!(
                pitch = %note.pitch,
                midi = ?note.midi,
                start = note.start_secs,
                duration = note.duration_secs,
                velocity = note.velocity,
                "Scheduled note"
            );
        }
        info!(notes = self.schedule.len(), bpm = self.bpm, "Playback started");
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        if self.playing {
            info!("Playback stopped");
        }
        self.playing = false;
        self.schedule.clear();
    }

    fn set_bpm(&mut self, bpm: f64) {
        if !bpm.is_finite() {
            warn!(bpm, "Ignoring non-finite BPM");
            return;
        }
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
    }

    fn bpm(&self) -> f64 {
        self.bpm
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

type PlayStateListener = Box<dyn FnMut(bool) + Send>;

/// Plays and exports patterns through a [`PlaybackEngine`]
pub struct PlayController<E: PlaybackEngine> {
    engine: E,
    on_play_state_change: Option<PlayStateListener>,
}

impl<E: PlaybackEngine> PlayController<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            on_play_state_change: None,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Called with `true` on play and `false` on stop
    pub fn set_play_state_listener(&mut self, listener: impl FnMut(bool) + Send + 'static) {
        self.on_play_state_change = Some(Box::new(listener));
    }

    /// Validate the pattern and hand its notes to the engine
    pub fn play(&mut self, pattern: &Pattern) -> Result<(), PlaybackError> {
        pattern.validate()?;
        self.engine.play(pattern.notes())?;
        self.notify(true);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.engine.stop();
        self.notify(false);
    }

    pub fn stop_all(&mut self) {
        self.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    pub fn export_json(&self, pattern: &Pattern) -> Result<String, PlaybackError> {
        Ok(pattern.to_json()?)
    }

    fn notify(&mut self, playing: bool) {
        if let Some(listener) = self.on_play_state_change.as_mut() {
            listener(playing);
        }
    }
}
