//! Pitch classes and note-name strings ("C4", "F#3")

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Canonical spellings, sharps preferred
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Flat spellings accepted on input. Naturals and sharps pass through.
const FLAT_TO_SHARP: [(&str, &str); 5] = [
    ("Db", "C#"),
    ("Eb", "D#"),
    ("Gb", "F#"),
    ("Ab", "G#"),
    ("Bb", "A#"),
];

/// Normalize a flat spelling to its sharp equivalent.
///
/// One-directional: `"Eb"` becomes `"D#"` and the flat spelling is gone.
/// Anything outside the five-entry table is returned unchanged, including
/// spellings like `"Cb"` that no pitch class answers to.
pub fn normalize_flat(name: &str) -> &str {
    FLAT_TO_SHARP
        .iter()
        .find(|&&(flat, _)| flat == name)
        .map_or(name, |&(_, sharp)| sharp)
}

/// One of the twelve pitch classes, 0 = C through 11 = B
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PitchClass(u8);

impl PitchClass {
    pub const C: Self = Self(0);

    /// Pitch class for a semitone index, wrapping modulo 12
    pub fn new(index: u8) -> Self {
        Self(index % 12)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        NOTE_NAMES[self.0 as usize]
    }

    /// Look up a canonical (sharp or natural) spelling
    pub fn from_name(name: &str) -> Option<Self> {
        NOTE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|i| Self(i as u8))
    }

    /// Look up a spelling, accepting the flat forms Db/Eb/Gb/Ab/Bb
    pub fn parse(name: &str) -> Option<Self> {
        Self::from_name(normalize_flat(name))
    }

    pub fn transpose(self, semitones: i32) -> Self {
        Self((self.0 as i32 + semitones).rem_euclid(12) as u8)
    }

    /// All twelve pitch classes in ascending order
    pub fn all() -> impl Iterator<Item = Self> {
        (0..12).map(Self)
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::UnknownPitchClass(s.to_string()))
    }
}

impl TryFrom<String> for PitchClass {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PitchClass> for String {
    fn from(pc: PitchClass) -> Self {
        pc.name().to_string()
    }
}

/// Format a pitch string such as `"G#5"`
pub fn pitch_name(pc: PitchClass, octave: i32) -> String {
    format!("{}{}", pc.name(), octave)
}

/// Octaves a pitch string may carry (MIDI C-1 through G9 and the rest of octave 9)
pub const PITCH_OCTAVES: std::ops::RangeInclusive<i32> = -1..=9;

/// Split a pitch string into pitch class and octave.
///
/// Format: `<letter A-G><optional # or b><octave>`, e.g. `"C4"`, `"Bb3"`, `"F#-1"`.
/// The octave is an optional `-` and digits with no leading zero, within [`PITCH_OCTAVES`].
/// Flat spellings are normalized like everywhere else.
pub fn split_pitch(pitch: &str) -> Option<(PitchClass, i32)> {
    let mut chars = pitch.char_indices();
    let (_, letter) = chars.next()?;
    if !('A'..='G').contains(&letter) {
        return None;
    }

    let root_len = match chars.next() {
        Some((_, '#' | 'b')) => 2,
        _ => 1,
    };
    let (root, octave) = pitch.split_at(root_len.min(pitch.len()));
    let octave = parse_octave(octave)?;

    Some((PitchClass::parse(root)?, octave))
}

fn parse_octave(text: &str) -> Option<i32> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text),
    };
    let canonical = match digits.as_bytes() {
        [] => false,
        [b'0'] => !negative,
        [first, ..] => *first != b'0' && digits.bytes().all(|b| b.is_ascii_digit()),
    };
    if !canonical {
        return None;
    }
    let octave: i32 = text.parse().ok()?;
    PITCH_OCTAVES.contains(&octave).then_some(octave)
}

/// MIDI note number for a pitch string (C-1 = 0, C4 = 60, A4 = 69)
pub fn midi_number(pitch: &str) -> Option<i32> {
    let (pc, octave) = split_pitch(pitch)?;
    octave
        .checked_add(1)?
        .checked_mul(12)?
        .checked_add(pc.index() as i32)
}
