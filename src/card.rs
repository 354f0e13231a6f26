use anyhow::{Context, Result, anyhow};
use image::{RgbaImage, imageops};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info, warn};

use crate::classes::{BoxSet, CardClass};
use crate::color::parse_color;
use crate::font::{FontCache, FontRef, FontSource};
use crate::layout::{DebugOverlay, LayoutError, RenderOptions};
use crate::record::{AbilityRecord, discover_records, load_record};
use crate::settings::Settings;

const ICON_SIZE: u32 = 64;
const ICON_MARGIN: u32 = 40;

/// Directories the builder reads from and writes to.
#[derive(Debug, Clone, PartialEq)]
pub struct CardPaths {
    pub classes_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub icons_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl From<&Settings> for CardPaths {
    fn from(settings: &Settings) -> Self {
        Self {
            classes_dir: settings.classes_dir.clone(),
            templates_dir: settings.templates_dir.clone(),
            icons_dir: settings.icons_dir.clone(),
            output_dir: settings.output_dir.clone(),
        }
    }
}

/// Which records of a class become cards.
#[derive(Debug, Clone, Default)]
pub struct CardFilter {
    pub minimum_level: i64,
    /// Globs over record file stems; empty keeps every record.
    pub include: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BuiltCard {
    pub class: CardClass,
    pub name: String,
    pub path: PathBuf,
    pub image: RgbaImage,
}

pub struct CardBuilder<F = FontCache> {
    fonts: F,
    boxes: BoxSet,
    options: RenderOptions,
    paths: CardPaths,
}

impl CardBuilder<FontCache> {
    pub fn from_settings(settings: &Settings, debug_boxes: bool) -> Result<Self> {
        let default_font = FontRef::parse(&settings.default_font);
        let small_font = FontRef::parse(&settings.small_font);
        let mut boxes = BoxSet::standard(&default_font, &small_font);
        boxes.apply_overrides(&settings.boxes)?;
        let options = render_options(settings, debug_boxes)?;
        Ok(Self::new(
            FontCache::new(&settings.fonts_dir),
            boxes,
            options,
            CardPaths::from(settings),
        ))
    }
}

impl<F: FontSource + Sync> CardBuilder<F> {
    pub fn new(fonts: F, boxes: BoxSet, options: RenderOptions, paths: CardPaths) -> Self {
        Self {
            fonts,
            boxes,
            options,
            paths,
        }
    }

    /// Draws every field of `record` onto `card`, then the class icon.
    pub fn render_card(
        &self,
        class: CardClass,
        record: &AbilityRecord,
        card: &mut RgbaImage,
        icon: Option<&RgbaImage>,
    ) -> Result<()> {
        for (field, text) in class.fields(record) {
            let layout = self
                .boxes
                .get(field)
                .ok_or_else(|| anyhow!("no layout box for field: {}", field.key()))?;
            let result = layout
                .render(card, &text, &self.fonts, &self.options)
                .with_context(|| format!("failed to render {} of {:?}", field.key(), record.name))?;
            debug!(
                field = field.key(),
                width = result.width,
                height = result.height,
                font_size = result.font_size,
                lines = result.line_count,
                "rendered field"
            );
        }
        if let Some(icon) = icon {
            add_class_icon(card, icon);
        }
        Ok(())
    }

    pub fn build_card(
        &self,
        class: CardClass,
        record: &AbilityRecord,
        icon: Option<&RgbaImage>,
    ) -> Result<RgbaImage> {
        let candidates = class.template_candidates(&self.paths.templates_dir, record);
        let mut card = load_template(&candidates)?;
        self.render_card(class, record, &mut card, icon)?;
        Ok(card)
    }

    /// Builds and saves every selected card of `class` on up to `jobs`
    /// threads. Cards come back in record file order.
    pub fn build_class(
        &self,
        class: CardClass,
        filter: &CardFilter,
        jobs: usize,
    ) -> Result<Vec<BuiltCard>> {
        let records = discover_records(&self.paths.classes_dir, class.name(), &filter.include)?;
        let icon = self.load_class_icon(class)?;
        let out_dir = self.paths.output_dir.join("cards").join(class.name());
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("failed to create {}", out_dir.display()))?;

        let jobs = jobs.max(1);
        let chunk_size = records.len().div_ceil(jobs).max(1);
        info!(class = class.name(), records = records.len(), jobs, "building cards");

        thread::scope(|scope| -> Result<Vec<BuiltCard>> {
            let workers: Vec<_> = records
                .chunks(chunk_size)
                .map(|chunk| {
                    let icon = icon.as_ref();
                    let out_dir = out_dir.as_path();
                    scope.spawn(move || -> Result<Vec<BuiltCard>> {
                        let mut built = Vec::new();
                        for path in chunk {
                            if let Some(card) = self.build_record(class, path, filter, icon, out_dir)? {
                                built.push(card);
                            }
                        }
                        Ok(built)
                    })
                })
                .collect();

            let mut cards = Vec::new();
            for worker in workers {
                let built = worker
                    .join()
                    .map_err(|_| anyhow!("card worker for {} panicked", class))??;
                cards.extend(built);
            }
            Ok(cards)
        })
    }

    fn build_record(
        &self,
        class: CardClass,
        path: &Path,
        filter: &CardFilter,
        icon: Option<&RgbaImage>,
        out_dir: &Path,
    ) -> Result<Option<BuiltCard>> {
        let record = load_record(path)?;
        if !record.is_selected(filter.minimum_level) {
            debug!(name = %record.name, level = %record.level, "skipping record");
            return Ok(None);
        }
        info!(class = class.name(), name = %record.name, "building card");

        let image = match self.build_card(class, &record, icon) {
            Ok(image) => image,
            Err(err) if is_text_overflow(&err) => {
                warn!(name = %record.name, "skipping card: {:#}", err);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let stem = path
            .file_stem()
            .and_then(|value| value.to_str())
            .ok_or_else(|| anyhow!("invalid record file name: {}", path.display()))?;
        let out_path = out_dir.join(format!("{}.png", stem));
        image
            .save(&out_path)
            .with_context(|| format!("failed to write card: {}", out_path.display()))?;
        Ok(Some(BuiltCard {
            class,
            name: record.name,
            path: out_path,
            image,
        }))
    }

    /// `<icons>/<class>.png`, or `None` with a warning when it is missing.
    pub fn load_class_icon(&self, class: CardClass) -> Result<Option<RgbaImage>> {
        let path = self.paths.icons_dir.join(format!("{}.png", class.name()));
        if !path.is_file() {
            warn!(path = %path.display(), "class icon not found");
            return Ok(None);
        }
        let icon = image::open(&path)
            .with_context(|| format!("failed to read icon: {}", path.display()))?
            .to_rgba8();
        Ok(Some(icon))
    }
}

/// Opens the first template that exists.
pub fn load_template(candidates: &[PathBuf]) -> Result<RgbaImage> {
    let path = candidates
        .iter()
        .find(|path| path.is_file())
        .ok_or_else(|| {
            let tried: Vec<String> = candidates
                .iter()
                .map(|path| path.display().to_string())
                .collect();
            anyhow!("template not found (tried {})", tried.join(", "))
        })?;
    debug!(path = %path.display(), "loading template");
    Ok(image::open(path)
        .with_context(|| format!("failed to read template: {}", path.display()))?
        .to_rgba8())
}

/// Blends `icon` into the top-right corner, shrinking it to the icon size
/// first when it is larger.
pub fn add_class_icon(card: &mut RgbaImage, icon: &RgbaImage) {
    let resized;
    let icon = if icon.width() > ICON_SIZE || icon.height() > ICON_SIZE {
        resized = imageops::thumbnail(icon, ICON_SIZE, ICON_SIZE);
        &resized
    } else {
        icon
    };
    let x = card.width() as i64 - (ICON_MARGIN + icon.width()) as i64;
    imageops::overlay(card, icon, x, ICON_MARGIN as i64);
}

pub fn render_options(settings: &Settings, debug_boxes: bool) -> Result<RenderOptions> {
    let color = parse_color(&settings.text_color).context("invalid [render] text_color")?;
    Ok(RenderOptions {
        color,
        leading_offset: settings.leading_offset,
        scale: settings.scale,
        debug: DebugOverlay {
            borders: debug_boxes || settings.debug_borders,
            anchors: debug_boxes || settings.debug_anchors,
        },
    })
}

fn is_text_overflow(err: &anyhow::Error) -> bool {
    err.downcast_ref::<LayoutError>()
        .is_some_and(LayoutError::is_overflow)
}
