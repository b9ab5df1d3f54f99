//! Chord theory (chord construction, symbol parsing, progressions, harmonic heuristics)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CoreError;
use crate::pitch::{PitchClass, pitch_name};
use crate::random::RandomSource;

// ============================================================================
// Chord Types
// ============================================================================

/// Chord quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChordType {
    #[default]
    Major,
    Minor,
    Diminished,
    Augmented,
    Major7,
    Minor7,
    Dominant7,
    Sus2,
    Sus4,
}

impl ChordType {
    pub const ALL: [ChordType; 9] = [
        Self::Major,
        Self::Minor,
        Self::Diminished,
        Self::Augmented,
        Self::Major7,
        Self::Minor7,
        Self::Dominant7,
        Self::Sus2,
        Self::Sus4,
    ];

    /// Get chord intervals from root, in semitones
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            Self::Major => &[0, 4, 7],
            Self::Minor => &[0, 3, 7],
            Self::Diminished => &[0, 3, 6],
            Self::Augmented => &[0, 4, 8],
            Self::Major7 => &[0, 4, 7, 11],
            Self::Minor7 => &[0, 3, 7, 10],
            Self::Dominant7 => &[0, 4, 7, 10],
            Self::Sus2 => &[0, 2, 7],
            Self::Sus4 => &[0, 5, 7],
        }
    }

    pub fn tone_count(&self) -> usize {
        self.intervals().len()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Diminished => "diminished",
            Self::Augmented => "augmented",
            Self::Major7 => "major7",
            Self::Minor7 => "minor7",
            Self::Dominant7 => "dominant7",
            Self::Sus2 => "sus2",
            Self::Sus4 => "sus4",
        }
    }

    pub fn is_minor_family(&self) -> bool {
        matches!(self, Self::Minor | Self::Minor7)
    }
}

impl fmt::Display for ChordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChordType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownChordType(s.to_string()))
    }
}

/// A chord: root plus quality. Intervals always come from the quality table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordDefinition {
    pub root: PitchClass,
    pub chord_type: ChordType,
}

impl ChordDefinition {
    pub fn new(root: PitchClass, chord_type: ChordType) -> Self {
        Self { root, chord_type }
    }

    pub fn intervals(&self) -> &'static [u8] {
        self.chord_type.intervals()
    }
}

impl fmt::Display for ChordDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.root, self.chord_type)
    }
}

// ============================================================================
// Progression Styles
// ============================================================================

/// Harmonic style, each bound to a catalogue of progressions in C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressionStyle {
    Classical,
    Jazz,
    #[default]
    Pop,
    Blues,
}

impl ProgressionStyle {
    pub const ALL: [ProgressionStyle; 4] = [Self::Classical, Self::Jazz, Self::Pop, Self::Blues];

    /// Progression templates, written in the key of C
    pub fn templates(&self) -> &'static [&'static [&'static str]] {
        match self {
            Self::Classical => &[
                &["C", "F", "G", "C"],
                &["C", "Am", "F", "G"],
                &["C", "G", "Am", "F"],
            ],
            Self::Jazz => &[
                &["Cmaj7", "Am7", "Dm7", "G7"],
                &["Cmaj7", "Dm7", "Em7", "Fmaj7"],
                &["Cm7", "Fm7", "Bb7", "Ebmaj7"],
            ],
            Self::Pop => &[
                &["C", "G", "Am", "F"],
                &["C", "Am", "Dm", "G"],
                &["C", "F", "Am", "G"],
            ],
            Self::Blues => &[
                &["C7", "C7", "C7", "C7"],
                &["F7", "F7", "C7", "C7"],
                &["G7", "F7", "C7", "G7"],
            ],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Classical => "classical",
            Self::Jazz => "jazz",
            Self::Pop => "pop",
            Self::Blues => "blues",
        }
    }
}

impl fmt::Display for ProgressionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProgressionStyle {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|style| style.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownProgressionStyle(s.to_string()))
    }
}

/// A concrete progression chosen from a style's catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progression {
    pub chords: Vec<ChordDefinition>,
    /// Display label only
    pub name: String,
}

impl Progression {
    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }
}

/// Result of parsing a chord symbol such as `"Bb7"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChord {
    /// Root spelling after flat normalization (`"Bb"` becomes `"A#"`)
    pub root: String,
    pub chord_type: ChordType,
}

impl ParsedChord {
    /// The root's pitch class, if the spelling names one (`"E#"` does not)
    pub fn pitch_class(&self) -> Option<PitchClass> {
        PitchClass::from_name(&self.root)
    }
}

// ============================================================================
// Theory Service
// ============================================================================

/// Stateless chord theory service.
///
/// All tables are static, so one value can be shared freely across threads.
/// Malformed input never fails: it degrades to root C, a major chord, or an
/// empty chord, and emits a warning through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MusicTheory;

impl MusicTheory {
    pub fn new() -> Self {
        Self
    }

    /// Build the pitches of a chord, e.g. A major7 at octave 4 gives
    /// `["A4", "C#5", "E5", "G#5"]`.
    ///
    /// Tones whose root + interval crosses 12 semitones move up an octave.
    /// Returns an empty chord (and warns) when that octave does not fit in an `i32`.
    pub fn build_chord(&self, root: PitchClass, chord_type: ChordType, octave: i32) -> Vec<String> {
        let chord: Option<Vec<String>> = chord_type
            .intervals()
            .iter()
            .map(|&interval| {
                let semitones = root.index() + interval;
                let octave_offset = (semitones / 12) as i32;
                let octave = octave.checked_add(octave_offset)?;
                Some(pitch_name(PitchClass::new(semitones), octave))
            })
            .collect();

        chord.unwrap_or_else(|| {
            warn!(octave, root = %root, %chord_type, "Octave out of range, building empty chord");
            Vec::new()
        })
    }

    /// [`build_chord`](Self::build_chord) for a root given by name.
    ///
    /// Returns an empty chord (and warns) when the name is not a pitch class.
    pub fn build_chord_named(&self, root: &str, chord_type: ChordType, octave: i32) -> Vec<String> {
        let Some(root) = PitchClass::parse(root) else {
            warn!(root, "Invalid root note, building empty chord");
            return Vec::new();
        };
        self.build_chord(root, chord_type, octave)
    }

    /// Parse a chord symbol (e.g. "Cmaj7", "Am", "G7") into root and type
    pub fn parse_chord_symbol(&self, symbol: &str) -> ParsedChord {
        let root_len = root_token_len(symbol);
        let (root, suffix) = if root_len == 0 {
            warn!(symbol, "Chord symbol has no root, assuming C");
            ("C", symbol)
        } else {
            symbol.split_at(root_len)
        };

        ParsedChord {
            root: crate::pitch::normalize_flat(root).to_string(),
            chord_type: chord_type_for_suffix(suffix),
        }
    }

    /// Pick one of the style's templates at random and transpose it to `key`
    pub fn progression<R: RandomSource + ?Sized>(
        &self,
        style: ProgressionStyle,
        key: PitchClass,
        rng: &mut R,
    ) -> Progression {
        let templates = style.templates();
        let template = templates[rng.choose_index(templates.len())];

        Progression {
            chords: self.resolve_symbols(template, key),
            name: format!("{style} progression in {key}"),
        }
    }

    /// Parse and transpose a sequence of symbols written in C.
    ///
    /// An unrecognized root is replaced by C for that chord only.
    pub fn resolve_symbols(&self, symbols: &[&str], key: PitchClass) -> Vec<ChordDefinition> {
        symbols
            .iter()
            .map(|symbol| {
                let parsed = self.parse_chord_symbol(symbol);
                let root = parsed.pitch_class().unwrap_or_else(|| {
                    warn!(symbol, root = %parsed.root, "Unrecognized chord root, substituting C");
                    PitchClass::C
                });
                ChordDefinition::new(root.transpose(key.index() as i32), parsed.chord_type)
            })
            .collect()
    }

    /// A chord of the given type on a uniformly random root
    pub fn random_chord<R: RandomSource + ?Sized>(
        &self,
        chord_type: ChordType,
        rng: &mut R,
    ) -> ChordDefinition {
        let root = PitchClass::new(rng.choose_index(12) as u8);
        ChordDefinition::new(root, chord_type)
    }

    /// Blend between triads (complexity < 0.3) and sevenths (complexity > 0.7).
    /// Exactly 0.3 and 0.7 pass through.
    pub fn adjust_complexity(&self, chord_type: ChordType, complexity: f64) -> ChordType {
        if complexity < 0.3 {
            match chord_type {
                ChordType::Major7 | ChordType::Dominant7 => ChordType::Major,
                ChordType::Minor7 => ChordType::Minor,
                other => other,
            }
        } else if complexity > 0.7 {
            match chord_type {
                ChordType::Major => ChordType::Major7,
                ChordType::Minor => ChordType::Minor7,
                other => other,
            }
        } else {
            chord_type
        }
    }

    /// Blend between consonance (tension < 0.3) and dissonance (tension > 0.7).
    ///
    /// The dissonant target depends only on the base type, never on chance:
    /// minor family goes diminished, major family goes augmented, anything
    /// else becomes a dominant seventh.
    pub fn adjust_tension(&self, chord_type: ChordType, tension: f64) -> ChordType {
        if tension < 0.3 {
            if chord_type.is_minor_family() {
                ChordType::Minor
            } else {
                ChordType::Major
            }
        } else if tension > 0.7 {
            match chord_type {
                ChordType::Minor | ChordType::Minor7 => ChordType::Diminished,
                ChordType::Major | ChordType::Major7 => ChordType::Augmented,
                _ => ChordType::Dominant7,
            }
        } else {
            chord_type
        }
    }
}

/// Byte length of the leading `[A-G][#b]?` root token, 0 if absent
fn root_token_len(symbol: &str) -> usize {
    match symbol.as_bytes() {
        [b'A'..=b'G', b'#' | b'b', ..] => 2,
        [b'A'..=b'G', ..] => 1,
        _ => 0,
    }
}

// Order matters: suffixes overlap ("min7" must not fall through to "min").
fn chord_type_for_suffix(suffix: &str) -> ChordType {
    let suffix = suffix.to_lowercase();
    if suffix.contains("maj7") {
        ChordType::Major7
    } else if suffix.contains("m7") || suffix.contains("min7") {
        ChordType::Minor7
    } else if suffix == "7" {
        ChordType::Dominant7
    } else if suffix.contains("dim") {
        ChordType::Diminished
    } else if suffix.contains("aug") {
        ChordType::Augmented
    } else if suffix.contains("sus2") {
        ChordType::Sus2
    } else if suffix.contains("sus4") {
        ChordType::Sus4
    } else if suffix == "m" || suffix == "min" {
        ChordType::Minor
    } else {
        ChordType::Major
    }
}
