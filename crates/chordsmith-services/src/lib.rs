//! chordsmith-services: Template persistence, preferences, and playback

mod error;
pub mod playback;
pub mod preferences;
pub mod template;

pub use error::{PlaybackError, Result, StoreError};
pub use playback::{DryRunEngine, PlayController, PlaybackEngine, ScheduledNote};
pub use preferences::{PreferencesStore, Quantize, UserPreferences};
pub use template::{NewTemplate, Template, TemplateScope, TemplateStore};
