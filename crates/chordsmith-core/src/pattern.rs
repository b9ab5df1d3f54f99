//! Notes and generated patterns

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::pitch::split_pitch;

/// A single timed note, shaped for the playback contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Note name plus octave, e.g. "C4"
    pub pitch: String,
    /// Offset from pattern start, in beats
    pub time: f64,
    /// Length in beats
    pub duration: f64,
    /// 0.0 to 1.0
    pub velocity: f64,
}

impl Note {
    pub fn new(pitch: impl Into<String>, time: f64, duration: f64, velocity: f64) -> Self {
        Self {
            pitch: pitch.into(),
            time,
            duration,
            velocity,
        }
    }

    /// End time in beats (time + duration)
    pub fn end(&self) -> f64 {
        self.time + self.duration
    }
}

/// Which generator produced a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Chord,
    Melody,
    Bassline,
}

impl PatternKind {
    pub const ALL: [PatternKind; 3] = [Self::Chord, Self::Melody, Self::Bassline];

    /// Prefix used for pattern ids
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Chord => "chord",
            Self::Melody => "melody",
            Self::Bassline => "bass",
        }
    }

    /// Beats between successive steps
    pub fn step_length(&self) -> f64 {
        match self {
            Self::Chord | Self::Bassline => 0.5,
            Self::Melody => 0.25,
        }
    }

    /// Steps at full density
    pub fn max_steps(&self) -> usize {
        match self {
            Self::Chord | Self::Bassline => 8,
            Self::Melody => 16,
        }
    }

    /// Step count for a density in [0, 1]
    pub fn step_count(&self, density: f64) -> usize {
        (density * self.max_steps() as f64).floor().max(0.0) as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Chord => "chord",
            Self::Melody => "melody",
            Self::Bassline => "bassline",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PatternKind {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chord" | "chords" => Ok(Self::Chord),
            "melody" => Ok(Self::Melody),
            "bass" | "bassline" => Ok(Self::Bassline),
            _ => Err(CoreError::UnknownPatternKind(s.to_string())),
        }
    }
}

/// A finished, immutable phrase of notes.
///
/// Notes are in generation order with non-decreasing `time`; chord tones
/// of one step share the same `time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    id: String,
    notes: Vec<Note>,
    /// Total length in beats
    duration: f64,
}

impl Pattern {
    pub(crate) fn new(id: String, notes: Vec<Note>, duration: f64) -> Self {
        Self {
            id,
            notes,
            duration,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn into_notes(self) -> Vec<Note> {
        self.notes
    }

    /// Check the structural invariants a generated pattern always satisfies.
    ///
    /// Used wherever patterns cross a trust boundary (loaded from disk,
    /// handed to playback).
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(CoreError::InvalidPattern("empty id".into()));
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(CoreError::InvalidPattern(format!(
                "bad pattern duration {}",
                self.duration
            )));
        }

        let mut prev_time = 0.0;
        for (i, note) in self.notes.iter().enumerate() {
            if split_pitch(&note.pitch).is_none() {
                return Err(CoreError::InvalidPattern(format!(
                    "note {i}: bad pitch {:?}",
                    note.pitch
                )));
            }
            if !note.time.is_finite() || note.time < prev_time {
                return Err(CoreError::InvalidPattern(format!(
                    "note {i}: time {} out of order",
                    note.time
                )));
            }
            if !(note.duration.is_finite() && note.duration > 0.0) {
                return Err(CoreError::InvalidPattern(format!(
                    "note {i}: duration {} must be positive",
                    note.duration
                )));
            }
            if !(0.0..=1.0).contains(&note.velocity) {
                return Err(CoreError::InvalidPattern(format!(
                    "note {i}: velocity {} outside 0..1",
                    note.velocity
                )));
            }
            if note.end() > self.duration {
                return Err(CoreError::InvalidPattern(format!(
                    "note {i}: ends at {} past pattern end {}",
                    note.end(),
                    self.duration
                )));
            }
            prev_time = note.time;
        }
        Ok(())
    }

    /// Pretty-printed JSON export
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a JSON export
    pub fn from_json(json: &str) -> Result<Self> {
        let pattern: Self = serde_json::from_str(json)?;
        pattern.validate()?;
        Ok(pattern)
    }
}

static NEXT_PATTERN_SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique-per-session id: `<prefix>-<unix millis>-<sequence>-<random suffix>`.
///
/// The suffix comes from the thread-local `fastrand` generator so id creation
/// never consumes draws from a caller's seeded source.
pub fn unique_id(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let seq = NEXT_PATTERN_SEQ.fetch_add(1, Ordering::Relaxed);
    let suffix: String = std::iter::repeat_with(fastrand::alphanumeric)
        .take(6)
        .collect::<String>()
        .to_ascii_lowercase();
    format!("{prefix}-{millis}-{seq}-{suffix}")
}
