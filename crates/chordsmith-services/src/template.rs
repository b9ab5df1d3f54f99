//! Named pattern templates persisted as a JSON document

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use chordsmith_core::pattern::unique_id;
use chordsmith_core::{Pattern, PatternKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::preferences::Quantize;

/// Which screen a template belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateScope {
    Chords,
    Melody,
    Bassline,
}

impl TemplateScope {
    pub const ALL: [TemplateScope; 3] = [Self::Chords, Self::Melody, Self::Bassline];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Chords => "chords",
            Self::Melody => "melody",
            Self::Bassline => "bassline",
        }
    }
}

impl From<PatternKind> for TemplateScope {
    fn from(kind: PatternKind) -> Self {
        match kind {
            PatternKind::Chord => Self::Chords,
            PatternKind::Melody => Self::Melody,
            PatternKind::Bassline => Self::Bassline,
        }
    }
}

impl fmt::Display for TemplateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for TemplateScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.parse::<PatternKind>() {
            Ok(kind) => Ok(kind.into()),
            Err(_) => Err(format!(
                "unknown template scope '{s}' (expected chords, melody or bassline)"
            )),
        }
    }
}

/// A stored pattern snapshot plus the settings it was made with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub scope: TemplateScope,
    pub pattern: Pattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub octave: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantize: Option<Quantize>,
    #[serde(default)]
    pub is_favorite: bool,
    /// Unix millis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Everything needed to save a template; the store fills in id, timestamps and favorite flag
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub name: String,
    pub scope: TemplateScope,
    pub pattern: Pattern,
    pub density: Option<f64>,
    pub octave: Option<i32>,
    pub bpm: Option<f64>,
    pub quantize: Option<Quantize>,
}

impl NewTemplate {
    pub fn new(name: impl Into<String>, scope: TemplateScope, pattern: Pattern) -> Self {
        Self {
            name: name.into(),
            scope,
            pattern,
            density: None,
            octave: None,
            bpm: None,
            quantize: None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateDocument {
    #[serde(default)]
    templates: Vec<Template>,
    /// scope name -> template id
    #[serde(default)]
    last_used: BTreeMap<String, String>,
}

impl TemplateDocument {
    fn find_mut(&mut self, id: &str) -> Option<&mut Template> {
        self.templates.iter_mut().find(|t| t.id == id)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Template CRUD over a single JSON file.
///
/// Every operation reads the file, applies its change and writes it back
/// through a temp file renamed over the original.
/// New patterns are validated on save. Stored patterns are validated when
/// handed out, so one bad entry only affects itself: listings skip it with a
/// warning, `load` reports it, and it can still be renamed or deleted.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    path: PathBuf,
}

impl TemplateStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chordsmith")
            .join("templates.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<TemplateDocument> {
        if !self.path.exists() {
            return Ok(TemplateDocument::default());
        }
        let text = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn write(&self, doc: &TemplateDocument) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, doc)?;
        file.flush()?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Store a new template and mark it last-used for its scope
    pub fn save(&self, new: NewTemplate) -> Result<Template> {
        let mut doc = self.read()?;
        let now = now_millis();
        let template = Template {
            id: unique_id("template"),
            name: new.name,
            scope: new.scope,
            pattern: new.pattern,
            density: new.density,
            octave: new.octave,
            bpm: new.bpm,
            quantize: new.quantize,
            is_favorite: false,
            last_used: None,
            created_at: now,
            updated_at: now,
        };
        validate(&template)?;

        doc.last_used
            .insert(template.scope.name().to_string(), template.id.clone());
        doc.templates.push(template.clone());
        self.write(&doc)?;
        info!(id = %template.id, name = %template.name, scope = %template.scope, "Saved template");
        Ok(template)
    }

    /// Fetch a template, stamping it as used
    pub fn load(&self, id: &str) -> Result<Option<Template>> {
        let mut doc = self.read()?;
        let now = now_millis();
        let Some(template) = doc.find_mut(id) else {
            return Ok(None);
        };
        validate(template)?;
        template.last_used = Some(now);
        template.updated_at = now;
        let template = template.clone();

        doc.last_used
            .insert(template.scope.name().to_string(), template.id.clone());
        self.write(&doc)?;
        debug!(id, "Loaded template");
        Ok(Some(template))
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut doc = self.read()?;
        let Some(index) = doc.templates.iter().position(|t| t.id == id) else {
            return Ok(false);
        };
        doc.templates.remove(index);
        self.write(&doc)?;
        info!(id, "Deleted template");
        Ok(true)
    }

    pub fn rename(&self, id: &str, name: impl Into<String>) -> Result<bool> {
        let mut doc = self.read()?;
        let Some(template) = doc.find_mut(id) else {
            return Ok(false);
        };
        template.name = name.into();
        template.updated_at = now_millis();
        self.write(&doc)?;
        Ok(true)
    }

    /// Copy a template under a fresh id, named "<name> (copy)"
    pub fn duplicate(&self, id: &str) -> Result<Option<Template>> {
        let mut doc = self.read()?;
        let Some(original) = doc.templates.iter().find(|t| t.id == id) else {
            return Ok(None);
        };
        validate(original)?;
        let now = now_millis();
        let copy = Template {
            id: unique_id("template"),
            name: format!("{} (copy)", original.name),
            created_at: now,
            updated_at: now,
            ..original.clone()
        };
        doc.templates.push(copy.clone());
        self.write(&doc)?;
        Ok(Some(copy))
    }

    /// Flip the favorite flag, returning the new state
    pub fn toggle_favorite(&self, id: &str) -> Result<bool> {
        let mut doc = self.read()?;
        let template = doc
            .find_mut(id)
            .ok_or_else(|| StoreError::TemplateNotFound(id.to_string()))?;
        template.is_favorite = !template.is_favorite;
        template.updated_at = now_millis();
        let state = template.is_favorite;
        self.write(&doc)?;
        Ok(state)
    }

    /// Every template with a valid pattern
    pub fn all(&self) -> Result<Vec<Template>> {
        Ok(self
            .read()?
            .templates
            .into_iter()
            .filter(|t| match validate(t) {
                Ok(()) => true,
                Err(err) => {
                    warn!(id = %t.id, error = %err, "Skipping invalid template");
                    false
                }
            })
            .collect())
    }

    pub fn by_scope(&self, scope: TemplateScope) -> Result<Vec<Template>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|t| t.scope == scope)
            .collect())
    }

    pub fn favorites(&self, scope: Option<TemplateScope>) -> Result<Vec<Template>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|t| t.is_favorite && scope.is_none_or(|s| t.scope == s))
            .collect())
    }

    /// The template last saved or loaded for `scope`, loaded again
    pub fn last_used(&self, scope: TemplateScope) -> Result<Option<Template>> {
        let doc = self.read()?;
        let Some(id) = doc.last_used.get(scope.name()) else {
            return Ok(None);
        };
        self.load(id)
    }
}

fn validate(template: &Template) -> Result<()> {
    template
        .pattern
        .validate()
        .map_err(|source| StoreError::InvalidPattern {
            id: template.id.clone(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chordsmith_core::{GenerationParams, PatternFactory, ProgressionStyle};

    fn store() -> (tempfile::TempDir, TemplateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::open(dir.path().join("templates.json"));
        (dir, store)
    }

    fn chord_template(name: &str) -> NewTemplate {
        let params = GenerationParams::new(1.0, 4).with_progression_style(ProgressionStyle::Jazz);
        let pattern = PatternFactory::with_seed(3).generate_chord_pattern(&params);
        NewTemplate {
            density: Some(1.0),
            octave: Some(4),
            ..NewTemplate::new(name, TemplateScope::Chords, pattern)
        }
    }

    #[test]
    fn test_empty_store() {
        let (_dir, store) = store();
        assert!(store.all().unwrap().is_empty());
        assert!(store.load("nope").unwrap().is_none());
        assert!(store.last_used(TemplateScope::Melody).unwrap().is_none());
        assert!(!store.delete("nope").unwrap());
    }

    #[test]
    fn test_pattern_round_trips_through_store() {
        let (_dir, store) = store();
        let mut factory = PatternFactory::with_seed(21);
        let params = GenerationParams::new(0.75, 3);

        for kind in PatternKind::ALL {
            let pattern = factory.generate(kind, &params);
            let saved = store
                .save(NewTemplate::new(kind.name(), kind.into(), pattern.clone()))
                .unwrap();

            let reopened = TemplateStore::open(store.path());
            let loaded = reopened.load(&saved.id).unwrap().unwrap();
            assert_eq!(loaded.pattern, pattern);
            assert_eq!(loaded.scope, TemplateScope::from(kind));
        }
    }

    #[test]
    fn test_save_sets_defaults_and_last_used() {
        let (_dir, store) = store();
        let saved = store.save(chord_template("Jazz loop")).unwrap();
        assert!(saved.id.starts_with("template-"));
        assert!(!saved.is_favorite);
        assert_eq!(saved.created_at, saved.updated_at);
        assert_eq!(saved.density, Some(1.0));

        let last = store.last_used(TemplateScope::Chords).unwrap().unwrap();
        assert_eq!(last.id, saved.id);
        assert!(last.last_used.is_some());
    }

    #[test]
    fn test_rename_duplicate_delete() {
        let (_dir, store) = store();
        let saved = store.save(chord_template("A")).unwrap();

        assert!(store.rename(&saved.id, "B").unwrap());
        assert!(!store.rename("missing", "C").unwrap());

        let copy = store.duplicate(&saved.id).unwrap().unwrap();
        assert_ne!(copy.id, saved.id);
        assert_eq!(copy.name, "B (copy)");
        assert_eq!(copy.pattern, saved.pattern);
        assert!(store.duplicate("missing").unwrap().is_none());
        assert_eq!(store.all().unwrap().len(), 2);

        assert!(store.delete(&saved.id).unwrap());
        let remaining = store.all().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, copy.id);
    }

    #[test]
    fn test_favorites_and_scopes() {
        let (_dir, store) = store();
        let chords = store.save(chord_template("chords")).unwrap();
        let bass = PatternFactory::new().generate_bassline_pattern(0.5, 2);
        let bass = store
            .save(NewTemplate::new("bass", TemplateScope::Bassline, bass))
            .unwrap();

        assert!(store.toggle_favorite(&bass.id).unwrap());
        assert!(store.toggle_favorite(&chords.id).unwrap());
        assert!(!store.toggle_favorite(&chords.id).unwrap());
        assert!(matches!(
            store.toggle_favorite("missing"),
            Err(StoreError::TemplateNotFound(_))
        ));

        let favorites = store.favorites(None).unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, bass.id);
        assert!(store.favorites(Some(TemplateScope::Chords)).unwrap().is_empty());

        assert_eq!(store.by_scope(TemplateScope::Chords).unwrap().len(), 1);
        assert_eq!(store.by_scope(TemplateScope::Melody).unwrap().len(), 0);
    }

    const MIXED_DOC: &str = r#"{"templates":[
        {"id":"bad","name":"bad","scope":"melody",
         "pattern":{"id":"p1","notes":[{"pitch":"Q9","time":0,"duration":0.2,"velocity":0.7}],"duration":0.25},
         "createdAt":0,"updatedAt":0},
        {"id":"good","name":"good","scope":"melody",
         "pattern":{"id":"p2","notes":[{"pitch":"C4","time":0,"duration":0.2,"velocity":0.7}],"duration":0.25},
         "createdAt":0,"updatedAt":0}
    ]}"#;

    #[test]
    fn test_invalid_template_is_isolated() {
        let (_dir, store) = store();
        std::fs::write(store.path(), MIXED_DOC).unwrap();

        let listed: Vec<_> = store.all().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(listed, vec!["good"]);
        assert_eq!(store.by_scope(TemplateScope::Melody).unwrap().len(), 1);
        assert!(matches!(
            store.load("bad"),
            Err(StoreError::InvalidPattern { id, .. }) if id == "bad"
        ));
        assert!(matches!(store.duplicate("bad"), Err(StoreError::InvalidPattern { .. })));
        assert_eq!(store.load("good").unwrap().unwrap().name, "good");

        assert!(store.rename("bad", "still bad").unwrap());
        assert!(store.toggle_favorite("bad").unwrap());
        assert!(store.delete("bad").unwrap());
        assert_eq!(store.load("good").unwrap().unwrap().pattern.len(), 1);

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(!text.contains("Q9"));
    }

    #[test]
    fn test_save_keeps_existing_entries_and_rejects_invalid() {
        let (_dir, store) = store();
        std::fs::write(store.path(), MIXED_DOC).unwrap();

        let saved = store.save(chord_template("new")).unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"bad\"") && text.contains("\"good\""));

        let bad: Pattern = serde_json::from_str(
            r#"{"id":"p","notes":[{"pitch":"C4","time":0,"duration":-1,"velocity":0.7}],"duration":1}"#,
        )
        .unwrap();
        assert!(matches!(
            store.save(NewTemplate::new("broken", TemplateScope::Melody, bad)),
            Err(StoreError::InvalidPattern { .. })
        ));
        let ids: Vec<_> = store.all().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["good".to_string(), saved.id]);
    }

    #[test]
    fn test_write_replaces_file_without_leftovers() {
        let (dir, store) = store();
        for name in ["one", "two", "three"] {
            store.save(chord_template(name)).unwrap();
        }
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("templates.json")]);
        assert_eq!(TemplateStore::open(store.path()).all().unwrap().len(), 3);
    }

    #[test]
    fn test_serialized_field_names() {
        let (_dir, store) = store();
        store.save(chord_template("names")).unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"isFavorite\": false"));
        assert!(text.contains("\"createdAt\""));
        assert!(text.contains("\"scope\": \"chords\""));
        assert!(text.contains("\"lastUsed\""));
    }
}
