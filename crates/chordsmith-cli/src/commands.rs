//! Subcommand implementations

use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use chordsmith_core::{ChordType, GenerationParams, PatternFactory, PatternKind, ProgressionStyle};
use chordsmith_services::{
    DryRunEngine, NewTemplate, PlayController, PreferencesStore, Template, TemplateStore,
};
use tracing::info;

use crate::{GenerateArgs, PrefsCommand, TemplateCommand};

/// Stores resolved from the global flags
pub struct Context {
    templates: TemplateStore,
    prefs: PreferencesStore,
}

impl Context {
    pub fn new(store: Option<PathBuf>, config: Option<PathBuf>) -> Self {
        Self {
            templates: TemplateStore::open(store.unwrap_or_else(TemplateStore::default_path)),
            prefs: PreferencesStore::open(config.unwrap_or_else(PreferencesStore::default_path)),
        }
    }
}

pub struct ChordOptions {
    pub style: ProgressionStyle,
    pub chord_type: ChordType,
    pub complexity: f64,
    pub tension: f64,
}

pub fn generate(
    ctx: &Context,
    kind: PatternKind,
    args: &GenerateArgs,
    chord: Option<ChordOptions>,
) -> Result<()> {
    let prefs = ctx.prefs.load();
    let mut params = GenerationParams::new(
        args.density.unwrap_or(prefs.density),
        args.octave.unwrap_or(prefs.octave),
    );
    if let Some(chord) = chord {
        params = params
            .with_progression_style(chord.style)
            .with_chord_type(chord.chord_type)
            .with_complexity(chord.complexity)
            .with_tension(chord.tension);
    }

    let mut factory = match args.seed {
        Some(seed) => PatternFactory::with_seed(seed),
        None => PatternFactory::new(),
    };
    let pattern = factory.generate(kind, &params);

    let mut controller = PlayController::new(DryRunEngine::new(prefs.bpm));
    if args.play {
        controller.play(&pattern)?;
        for note in controller.engine().schedule() {
            eprintln!(
                "{:>8.3}s  {:<4} {:>6.3}s  vel {:.2}",
                note.start_secs, note.pitch, note.duration_secs, note.velocity
            );
        }
        controller.stop();
    }

    if let Some(name) = &args.save {
        let params = params.clamped();
        let template = ctx
            .templates
            .save(NewTemplate {
                density: Some(params.density),
                octave: Some(params.octave),
                bpm: Some(prefs.bpm),
                quantize: Some(prefs.quantize),
                ..NewTemplate::new(name.as_str(), kind.into(), pattern.clone())
            })
            .with_context(|| format!("saving template to {}", ctx.templates.path().display()))?;
        info!(id = %template.id, "Template saved");
    }

    println!("{}", controller.export_json(&pattern)?);
    Ok(())
}

pub fn templates(ctx: &Context, cmd: TemplateCommand) -> Result<()> {
    let store = &ctx.templates;
    match cmd {
        TemplateCommand::List { scope, favorites } => {
            let list = match (scope, favorites) {
                (scope, true) => store.favorites(scope)?,
                (Some(scope), false) => store.by_scope(scope)?,
                (None, false) => store.all()?,
            };
            for t in &list {
                let star = if t.is_favorite { "*" } else { " " };
                println!(
                    "{star} {}  {:<8}  {:>3} notes  {}",
                    t.id,
                    t.scope,
                    t.pattern.len(),
                    t.name
                );
            }
        }
        TemplateCommand::Show { id } => match store.load(&id)? {
            Some(t) => print_template(&t)?,
            None => bail!("template not found: {id}"),
        },
        TemplateCommand::Last { scope } => match store.last_used(scope)? {
            Some(t) => print_template(&t)?,
            None => bail!("no template used yet for {scope}"),
        },
        TemplateCommand::Delete { id } => {
            if !store.delete(&id)? {
                bail!("template not found: {id}");
            }
        }
        TemplateCommand::Rename { id, name } => {
            if !store.rename(&id, name)? {
                bail!("template not found: {id}");
            }
        }
        TemplateCommand::Duplicate { id } => match store.duplicate(&id)? {
            Some(t) => println!("{}", t.id),
            None => bail!("template not found: {id}"),
        },
        TemplateCommand::Favorite { id } => {
            let favorite = store.toggle_favorite(&id)?;
            println!("{}", if favorite { "favorite" } else { "not favorite" });
        }
    }
    Ok(())
}

pub fn prefs(ctx: &Context, cmd: PrefsCommand) -> Result<()> {
    let prefs = match cmd {
        PrefsCommand::Show => ctx.prefs.load(),
        PrefsCommand::Set { density, octave, bpm, quantize } => ctx
            .prefs
            .update(|p| {
                if let Some(density) = density {
                    p.density = density;
                }
                if let Some(octave) = octave {
                    p.octave = octave;
                }
                if let Some(bpm) = bpm {
                    p.bpm = bpm;
                }
                if let Some(quantize) = quantize {
                    p.quantize = quantize;
                }
            })
            .with_context(|| format!("writing {}", ctx.prefs.path().display()))?,
    };
    println!("density  = {}", prefs.density);
    println!("octave   = {}", prefs.octave);
    println!("bpm      = {}", prefs.bpm);
    println!("quantize = {}", prefs.quantize);
    Ok(())
}

fn print_template(template: &Template) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(template)?);
    Ok(())
}
