//! User preferences (density, octave, tempo, quantize) persisted as TOML

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chordsmith_core::params::{clamp_octave, clamp_unit};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

pub const MIN_BPM: f64 = 40.0;
pub const MAX_BPM: f64 = 240.0;

/// Rhythmic grid used by playback, in Tone-style notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Quantize {
    #[serde(rename = "4n")]
    Quarter,
    #[default]
    #[serde(rename = "8n")]
    Eighth,
    #[serde(rename = "16n")]
    Sixteenth,
    #[serde(rename = "32n")]
    ThirtySecond,
}

impl Quantize {
    pub const ALL: [Quantize; 4] = [
        Self::Quarter,
        Self::Eighth,
        Self::Sixteenth,
        Self::ThirtySecond,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quarter => "4n",
            Self::Eighth => "8n",
            Self::Sixteenth => "16n",
            Self::ThirtySecond => "32n",
        }
    }

    /// Grid size in beats
    pub fn beats(&self) -> f64 {
        match self {
            Self::Quarter => 1.0,
            Self::Eighth => 0.5,
            Self::Sixteenth => 0.25,
            Self::ThirtySecond => 0.125,
        }
    }
}

impl fmt::Display for Quantize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quantize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| format!("unknown quantize '{s}' (expected 4n, 8n, 16n or 32n)"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub density: f64,
    pub octave: i32,
    pub bpm: f64,
    pub quantize: Quantize,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            density: 0.5,
            octave: 4,
            bpm: 120.0,
            quantize: Quantize::Eighth,
        }
    }
}

impl UserPreferences {
    /// Copy with every field forced into its documented range
    pub fn clamped(&self) -> Self {
        let defaults = Self::default();
        Self {
            density: clamp_unit("density", self.density, defaults.density),
            octave: clamp_octave(self.octave),
            bpm: clamp_bpm(self.bpm),
            quantize: self.quantize,
        }
    }
}

fn clamp_bpm(bpm: f64) -> f64 {
    if !bpm.is_finite() {
        warn!(bpm, "Non-finite BPM, using default");
        return UserPreferences::default().bpm;
    }
    let clamped = bpm.clamp(MIN_BPM, MAX_BPM);
    if clamped != bpm {
        warn!(bpm, clamped, "BPM out of range, clamping");
    }
    clamped
}

/// TOML-backed preferences. Every setter is a read-modify-write of the file.
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chordsmith")
            .join("preferences.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored preferences merged over the defaults.
    ///
    /// A missing file gives the defaults; an unreadable one does too, with a warning.
    pub fn load(&self) -> UserPreferences {
        let Ok(text) = std::fs::read_to_string(&self.path) else {
            return UserPreferences::default();
        };
        match toml::from_str::<UserPreferences>(&text) {
            Ok(prefs) => prefs.clamped(),
            Err(e) => {
                warn!(path = %self.path.display(), "Failed to parse preferences: {}", e);
                UserPreferences::default()
            }
        }
    }

    pub fn save(&self, prefs: &UserPreferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(&prefs.clamped())?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }

    /// Apply `f` to the stored preferences and save the result
    pub fn update(&self, f: impl FnOnce(&mut UserPreferences)) -> Result<UserPreferences> {
        let mut prefs = self.load();
        f(&mut prefs);
        let prefs = prefs.clamped();
        self.save(&prefs)?;
        Ok(prefs)
    }

    pub fn density(&self) -> f64 {
        self.load().density
    }

    pub fn set_density(&self, density: f64) -> Result<()> {
        self.update(|p| p.density = density).map(drop)
    }

    pub fn octave(&self) -> i32 {
        self.load().octave
    }

    pub fn set_octave(&self, octave: i32) -> Result<()> {
        self.update(|p| p.octave = octave).map(drop)
    }

    pub fn bpm(&self) -> f64 {
        self.load().bpm
    }

    pub fn set_bpm(&self, bpm: f64) -> Result<()> {
        self.update(|p| p.bpm = bpm).map(drop)
    }

    pub fn quantize(&self) -> Quantize {
        self.load().quantize
    }

    pub fn set_quantize(&self, quantize: Quantize) -> Result<()> {
        self.update(|p| p.quantize = quantize).map(drop)
    }
}
