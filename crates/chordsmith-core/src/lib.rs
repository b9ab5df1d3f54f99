//! chordsmith-core: Chord theory and pattern synthesis

mod error;
pub mod factory;
pub mod params;
pub mod pattern;
pub mod pitch;
pub mod random;
pub mod theory;

pub use error::{CoreError, Result};
pub use factory::PatternFactory;
pub use params::GenerationParams;
pub use pattern::{Note, Pattern, PatternKind};
pub use pitch::{PitchClass, midi_number, normalize_flat, split_pitch};
pub use random::{RandomSource, SequenceSource};
pub use theory::{
    ChordDefinition, ChordType, MusicTheory, ParsedChord, Progression, ProgressionStyle,
};
