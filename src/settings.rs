use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub classes_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub fonts_dir: PathBuf,
    pub icons_dir: PathBuf,
    pub output_dir: PathBuf,
    pub default_font: String,
    pub small_font: String,
    pub text_color: String,
    pub leading_offset: f32,
    pub scale: f32,
    pub debug_borders: bool,
    pub debug_anchors: bool,
    pub page_columns: u32,
    pub page_rows: u32,
    pub cut_line_width: u32,
    pub cut_line_color: String,
    pub boxes: HashMap<String, BoxOverride>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            classes_dir: PathBuf::from("classes"),
            templates_dir: PathBuf::from("templates"),
            fonts_dir: PathBuf::from("fonts"),
            icons_dir: PathBuf::from("icons"),
            output_dir: PathBuf::from("output"),
            default_font: "Chalfont_Medium.otf".to_string(),
            small_font: "Aktiv_Grotesque.otf".to_string(),
            text_color: "black".to_string(),
            leading_offset: 0.0,
            scale: 1.0,
            debug_borders: false,
            debug_anchors: false,
            page_columns: 3,
            page_rows: 3,
            cut_line_width: 10,
            cut_line_color: "#d0d0d0".to_string(),
            boxes: HashMap::new(),
        }
    }
}

/// Replacement geometry for one named card field. Unset keys keep the
/// built-in layout.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BoxOverride {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub h_align: Option<String>,
    pub v_align: Option<String>,
    pub font: Option<String>,
    pub font_size: Option<u32>,
    pub rotate: Option<i32>,
    pub wrap: Option<String>,
    pub shrink: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    paths: Option<PathSettings>,
    fonts: Option<FontSettings>,
    render: Option<RenderSettings>,
    pages: Option<PageSettings>,
    boxes: Option<HashMap<String, BoxOverride>>,
}

#[derive(Debug, Default, Deserialize)]
struct PathSettings {
    classes: Option<String>,
    templates: Option<String>,
    fonts: Option<String>,
    icons: Option<String>,
    output: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FontSettings {
    default: Option<String>,
    small: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RenderSettings {
    text_color: Option<String>,
    leading_offset: Option<f32>,
    scale: Option<f32>,
    debug_borders: Option<bool>,
    debug_anchors: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct PageSettings {
    columns: Option<u32>,
    rows: Option<u32>,
    cut_line_width: Option<u32>,
    cut_line_color: Option<String>,
}

/// Built-in defaults, then `settings.toml` and `settings.local.toml` from the
/// working directory, then `extra_path`, each overriding the previous.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }
    load_settings_from(&ordered_paths)
}

pub fn load_settings_from(paths: &[PathBuf]) -> Result<Settings> {
    let mut settings = Settings::default();
    for path in paths {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }
    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(paths) = incoming.paths {
            merge_path(&mut self.classes_dir, paths.classes);
            merge_path(&mut self.templates_dir, paths.templates);
            merge_path(&mut self.fonts_dir, paths.fonts);
            merge_path(&mut self.icons_dir, paths.icons);
            merge_path(&mut self.output_dir, paths.output);
        }
        if let Some(fonts) = incoming.fonts {
            merge_string(&mut self.default_font, fonts.default);
            merge_string(&mut self.small_font, fonts.small);
        }
        if let Some(render) = incoming.render {
            merge_string(&mut self.text_color, render.text_color);
            if let Some(offset) = render.leading_offset {
                self.leading_offset = offset;
            }
            if let Some(scale) = render.scale {
                if scale > 0.0 {
                    self.scale = scale;
                }
            }
            if let Some(borders) = render.debug_borders {
                self.debug_borders = borders;
            }
            if let Some(anchors) = render.debug_anchors {
                self.debug_anchors = anchors;
            }
        }
        if let Some(pages) = incoming.pages {
            if let Some(columns) = pages.columns.filter(|value| *value > 0) {
                self.page_columns = columns;
            }
            if let Some(rows) = pages.rows.filter(|value| *value > 0) {
                self.page_rows = rows;
            }
            if let Some(width) = pages.cut_line_width {
                self.cut_line_width = width;
            }
            merge_string(&mut self.cut_line_color, pages.cut_line_color);
        }
        if let Some(boxes) = incoming.boxes {
            for (field, layout) in boxes {
                self.boxes.insert(field, layout);
            }
        }
    }
}

fn merge_string(slot: &mut String, value: Option<String>) {
    if let Some(value) = value {
        if !value.trim().is_empty() {
            *slot = value;
        }
    }
}

fn merge_path(slot: &mut PathBuf, value: Option<String>) {
    if let Some(value) = value {
        if !value.trim().is_empty() {
            *slot = PathBuf::from(value.trim());
        }
    }
}
