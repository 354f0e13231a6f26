use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub mod card;
pub mod classes;
pub mod color;
pub mod font;
pub mod layout;
pub mod logging;
pub mod page;
pub mod record;
pub mod settings;

#[cfg(test)]
mod test_util;

pub use card::{BuiltCard, CardBuilder, CardFilter, CardPaths};
pub use classes::{BoxField, BoxSet, CardClass};
pub use font::{FontCache, FontRef, FontSource, ScaledFont, Typeface};
pub use layout::{HAlign, LayoutBox, LayoutError, RenderOptions, RenderResult, VAlign, WrapAxis};
pub use page::{CutLines, PageGrid};
pub use record::AbilityRecord;

#[derive(Debug, Clone)]
pub struct Config {
    /// Classes to build; empty builds every class.
    pub classes: Vec<CardClass>,
    pub minimum_level: i64,
    pub include: Vec<String>,
    /// Overrides the `[pages]` grid from settings.
    pub grid: Option<PageGrid>,
    pub pages_folder: String,
    pub settings_path: Option<String>,
    pub debug_boxes: bool,
    /// Worker threads; defaults to the CPU count.
    pub jobs: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            classes: Vec::new(),
            minimum_level: 1,
            include: Vec::new(),
            grid: None,
            pages_folder: "pages".to_string(),
            settings_path: None,
            debug_boxes: false,
            jobs: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub cards: Vec<PathBuf>,
    pub pages: Vec<PathBuf>,
}

pub fn run(config: Config) -> Result<RunSummary> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let builder = CardBuilder::from_settings(&settings, config.debug_boxes)?;

    let grid = match config.grid {
        Some(grid) => grid,
        None => PageGrid::new(settings.page_columns, settings.page_rows)?,
    };
    let cut = CutLines {
        width: settings.cut_line_width,
        color: color::parse_color(&settings.cut_line_color)
            .context("invalid [pages] cut_line_color")?,
    };
    let implicit_classes = config.classes.is_empty();
    let classes = if implicit_classes {
        CardClass::ALL.to_vec()
    } else {
        config.classes.clone()
    };
    let filter = CardFilter {
        minimum_level: config.minimum_level,
        include: config.include.clone(),
    };
    let jobs = config.jobs.unwrap_or_else(num_cpus::get);

    let mut built = Vec::new();
    for class in classes {
        // An explicitly named class without abilities is still an error.
        if implicit_classes
            && !settings
                .classes_dir
                .join(class.name())
                .join("abilities")
                .is_dir()
        {
            warn!(class = class.name(), "no abilities directory, skipping");
            continue;
        }
        built.extend(builder.build_class(class, &filter, jobs)?);
    }
    info!(cards = built.len(), grid = %grid, "cards built");

    let (cards, images): (Vec<_>, Vec<_>) =
        built.into_iter().map(|card| (card.path, card.image)).unzip();
    let folder = settings.output_dir.join(&config.pages_folder);
    let pages = page::save_pages(&images, grid, cut, &folder)?;

    Ok(RunSummary { cards, pages })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_settings(root: &Path) -> String {
        let path = root.join("run.toml");
        let content = format!(
            "[paths]\nclasses = {:?}\ntemplates = {:?}\nicons = {:?}\nfonts = {:?}\noutput = {:?}\n",
            root.join("classes").display().to_string(),
            root.join("templates").display().to_string(),
            root.join("icons").display().to_string(),
            root.join("fonts").display().to_string(),
            root.join("output").display().to_string(),
        );
        fs::write(&path, content).expect("settings");
        path.display().to_string()
    }

    #[test]
    fn run_skips_classes_without_abilities() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("classes/monk/abilities")).expect("monk");
        let config = Config {
            settings_path: Some(write_settings(dir.path())),
            jobs: Some(1),
            ..Config::default()
        };

        let summary = run(config).expect("run");
        assert!(summary.cards.is_empty());
        assert!(summary.pages.is_empty());
        assert!(dir.path().join("output/pages").is_dir());
    }

    #[test]
    fn run_rejects_a_named_class_without_abilities() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("classes/monk/abilities")).expect("monk");
        let config = Config {
            classes: vec![CardClass::Fighter],
            settings_path: Some(write_settings(dir.path())),
            jobs: Some(1),
            ..Config::default()
        };

        let err = run(config).expect_err("fighter is missing");
        assert!(
            format!("{:#}", err).contains("abilities directory not found"),
            "{:#}",
            err
        );
    }
}
