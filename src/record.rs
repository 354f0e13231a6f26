use anyhow::{Context, Result, anyhow};
use globset::{GlobBuilder, GlobMatcher};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// One ability card as written in `<classes>/<class>/abilities/*.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AbilityRecord {
    pub name: String,
    pub action: String,
    pub description: String,
    pub source: String,
    pub level: FieldValue,
    #[serde(default)]
    pub cost: Option<FieldValue>,
    #[serde(default)]
    pub footnote: Option<String>,
    #[serde(default)]
    pub skip: bool,
}

/// TOML values that may be written either as a number or as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
}

impl FieldValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(value) => Some(*value),
            FieldValue::Text(value) => value.trim().parse().ok(),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            FieldValue::Integer(value) => *value == 0,
            FieldValue::Text(value) => value.trim().is_empty(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(value) => write!(f, "{}", value),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

impl AbilityRecord {
    /// Cost text to print, or `None` when the card has no cost.
    pub fn cost_text(&self) -> Option<String> {
        self.cost
            .as_ref()
            .filter(|cost| !cost.is_blank())
            .map(ToString::to_string)
    }

    pub fn level_text(&self) -> String {
        self.level.to_string()
    }

    pub fn footnote_text(&self) -> Option<&str> {
        self.footnote
            .as_deref()
            .filter(|footnote| !footnote.trim().is_empty())
    }

    /// Skipped records and records below `minimum_level` are left out.
    /// Levels that are not numbers count as 0.
    pub fn is_selected(&self, minimum_level: i64) -> bool {
        !self.skip && self.level.as_integer().unwrap_or(0) >= minimum_level
    }
}

pub fn load_record(path: &Path) -> Result<AbilityRecord> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read record: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse record: {}", path.display()))
}

/// Record files for `class`, sorted by file name. Non-empty `include`
/// patterns keep only files whose stem matches one of them.
pub fn discover_records(classes_dir: &Path, class: &str, include: &[String]) -> Result<Vec<PathBuf>> {
    let abilities_dir = classes_dir.join(class).join("abilities");
    if !abilities_dir.is_dir() {
        return Err(anyhow!(
            "abilities directory not found: {}",
            abilities_dir.display()
        ));
    }
    let toml_files = compile("*.toml")?;
    let filters = include
        .iter()
        .map(|pattern| compile(pattern))
        .collect::<Result<Vec<_>>>()?;

    let entries = fs::read_dir(&abilities_dir)
        .with_context(|| format!("failed to list {}", abilities_dir.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list {}", abilities_dir.display()))?
            .path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|value| value.to_str()) else {
            continue;
        };
        if !toml_files.is_match(file_name) {
            continue;
        }
        let stem = path
            .file_stem()
            .and_then(|value| value.to_str())
            .unwrap_or("");
        if !filters.is_empty() && !filters.iter().any(|filter| filter.is_match(stem)) {
            continue;
        }
        paths.push(path);
    }
    paths.sort();
    Ok(paths)
}

fn compile(pattern: &str) -> Result<GlobMatcher> {
    Ok(GlobBuilder::new(pattern.trim())
        .literal_separator(true)
        .build()
        .map_err(|err| anyhow!("invalid include pattern '{}': {}", pattern, err))?
        .compile_matcher())
}
