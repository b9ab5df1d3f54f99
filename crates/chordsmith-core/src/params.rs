//! Generation parameters and range handling

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::theory::{ChordType, ProgressionStyle};

pub const MIN_OCTAVE: i32 = 1;
pub const MAX_OCTAVE: i32 = 7;

/// Inputs to the pattern factory, owned by the caller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationParams {
    /// 0.0 to 1.0, scales the number of steps
    pub density: f64,
    /// 1 to 7
    pub octave: i32,
    /// Carried with the request but not applied per step: chord qualities
    /// come from the progression plus complexity/tension.
    pub chord_type: ChordType,
    pub progression_style: ProgressionStyle,
    /// 0.0 = triads, 1.0 = sevenths
    pub complexity: f64,
    /// 0.0 = consonant, 1.0 = dissonant
    pub tension: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            density: 0.5,
            octave: 4,
            chord_type: ChordType::Major,
            progression_style: ProgressionStyle::Pop,
            complexity: 0.5,
            tension: 0.5,
        }
    }
}

impl GenerationParams {
    pub fn new(density: f64, octave: i32) -> Self {
        Self {
            density,
            octave,
            ..Default::default()
        }
    }

    pub fn with_progression_style(mut self, style: ProgressionStyle) -> Self {
        self.progression_style = style;
        self
    }

    pub fn with_chord_type(mut self, chord_type: ChordType) -> Self {
        self.chord_type = chord_type;
        self
    }

    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_tension(mut self, tension: f64) -> Self {
        self.tension = tension;
        self
    }

    /// Copy with every field forced into its documented range.
    ///
    /// Non-finite reals take the default value. Each adjustment is logged.
    pub fn clamped(&self) -> Self {
        let defaults = Self::default();
        Self {
            density: clamp_unit("density", self.density, defaults.density),
            octave: clamp_octave(self.octave),
            chord_type: self.chord_type,
            progression_style: self.progression_style,
            complexity: clamp_unit("complexity", self.complexity, defaults.complexity),
            tension: clamp_unit("tension", self.tension, defaults.tension),
        }
    }
}

/// Clamp a real parameter into [0, 1]
pub fn clamp_unit(name: &'static str, value: f64, fallback: f64) -> f64 {
    if !value.is_finite() {
        warn!(param = name, value, fallback, "Non-finite parameter, using default");
        return fallback;
    }
    let clamped = value.clamp(0.0, 1.0);
    if clamped != value {
        warn!(param = name, value, clamped, "Parameter out of range, clamping");
    }
    clamped
}

/// Clamp an octave into 1..=7
pub fn clamp_octave(octave: i32) -> i32 {
    let clamped = octave.clamp(MIN_OCTAVE, MAX_OCTAVE);
    if clamped != octave {
        warn!(octave, clamped, "Octave out of range, clamping");
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range_untouched() {
        let params = GenerationParams::new(0.25, 3)
            .with_complexity(0.0)
            .with_tension(1.0);
        assert_eq!(params.clamped(), params);
    }

    #[test]
    fn test_out_of_range_clamped() {
        let params = GenerationParams::new(1.7, 12)
            .with_complexity(-0.2)
            .with_tension(f64::NAN)
            .clamped();
        assert_eq!(params.density, 1.0);
        assert_eq!(params.octave, 7);
        assert_eq!(params.complexity, 0.0);
        assert_eq!(params.tension, 0.5);
        assert_eq!(clamp_octave(-3), 1);
    }

    #[test]
    fn test_serde_defaults_missing_fields() {
        let params: GenerationParams =
            serde_json::from_str(r#"{"density":0.75,"progressionStyle":"blues"}"#).unwrap();
        assert_eq!(params.density, 0.75);
        assert_eq!(params.octave, 4);
        assert_eq!(params.progression_style, ProgressionStyle::Blues);
    }
}
