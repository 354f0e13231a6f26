use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::font::FontRef;
use crate::layout::{HAlign, LayoutBox, VAlign, WrapAxis};
use crate::record::AbilityRecord;
use crate::settings::BoxOverride;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardClass {
    Fighter,
    Ranger,
    Wizard,
    Monk,
}

impl CardClass {
    pub const ALL: [CardClass; 4] = [
        CardClass::Fighter,
        CardClass::Ranger,
        CardClass::Wizard,
        CardClass::Monk,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CardClass::Fighter => "fighter",
            CardClass::Ranger => "ranger",
            CardClass::Wizard => "wizard",
            CardClass::Monk => "monk",
        }
    }

    /// Template files to try, most specific first.
    pub fn template_candidates(self, templates_dir: &Path, record: &AbilityRecord) -> Vec<PathBuf> {
        let action = record.action.trim().replace(' ', "_");
        let file_name = match self {
            CardClass::Monk if record.cost_text().is_some() => {
                format!("Template_Ki_{}.png", action)
            }
            _ => format!("Template_{}.png", action),
        };
        vec![
            templates_dir.join(self.name()).join(&file_name),
            templates_dir.join(file_name),
        ]
    }

    /// Fields drawn on a card for `record`, in drawing order.
    pub fn fields(self, record: &AbilityRecord) -> Vec<(BoxField, String)> {
        let mut fields = vec![(BoxField::Action, record.action.clone())];
        match record.cost_text() {
            Some(cost) if self == CardClass::Monk => {
                fields.push((BoxField::Cost, cost));
                fields.push((BoxField::NameWithCost, record.name.clone()));
            }
            _ => fields.push((BoxField::Name, record.name.clone())),
        }
        let description = if self == CardClass::Wizard && record.name == "Bladesong" {
            BoxField::SmallDescription
        } else {
            BoxField::Description
        };
        fields.push((description, record.description.clone()));
        if let Some(footnote) = record.footnote_text() {
            fields.push((BoxField::Footnote, footnote.to_string()));
        }
        fields.push((BoxField::Source, record.source.clone()));
        fields.push((BoxField::Level, record.level_text()));
        fields
    }
}

impl fmt::Display for CardClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CardClass {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim().to_ascii_lowercase();
        CardClass::ALL
            .into_iter()
            .find(|class| class.name() == value)
            .ok_or_else(|| anyhow!("unknown card class: {}", value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxField {
    Action,
    Name,
    NameWithCost,
    Cost,
    Description,
    SmallDescription,
    Footnote,
    Source,
    Level,
}

impl BoxField {
    pub const ALL: [BoxField; 9] = [
        BoxField::Action,
        BoxField::Name,
        BoxField::NameWithCost,
        BoxField::Cost,
        BoxField::Description,
        BoxField::SmallDescription,
        BoxField::Footnote,
        BoxField::Source,
        BoxField::Level,
    ];

    pub fn key(self) -> &'static str {
        match self {
            BoxField::Action => "action",
            BoxField::Name => "name",
            BoxField::NameWithCost => "name_with_cost",
            BoxField::Cost => "cost",
            BoxField::Description => "description",
            BoxField::SmallDescription => "small_description",
            BoxField::Footnote => "footnote",
            BoxField::Source => "source",
            BoxField::Level => "level",
        }
    }
}

impl FromStr for BoxField {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        BoxField::ALL
            .into_iter()
            .find(|field| field.key() == value)
            .ok_or_else(|| anyhow!("unknown box field: {}", value))
    }
}

/// Layout boxes for every card field.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSet {
    boxes: HashMap<BoxField, LayoutBox>,
}

impl BoxSet {
    /// Card layout for the 822x1122 templates.
    pub fn standard(default_font: &FontRef, small_font: &FontRef) -> Self {
        let text = |x, y, width, height| LayoutBox::new(x, y, width, height, default_font.clone());
        let boxes = HashMap::from([
            (BoxField::Action, text(98, 1030, 590, 50).with_font_size(36)),
            (
                BoxField::Name,
                text(98, 46, 625, 82).with_shrink_to_fit(true),
            ),
            (
                BoxField::NameWithCost,
                text(206, 46, 517, 82).with_shrink_to_fit(true),
            ),
            (BoxField::Cost, text(98, 46, 82, 82)),
            (
                BoxField::Description,
                text(105, 150, 610, 700)
                    .with_font_size(30)
                    .with_align(HAlign::Left, VAlign::Top)
                    .with_shrink_to_fit(true),
            ),
            (
                BoxField::SmallDescription,
                LayoutBox::new(105, 150, 610, 700, small_font.clone())
                    .with_font_size(23)
                    .with_align(HAlign::Left, VAlign::Top),
            ),
            (
                BoxField::Footnote,
                text(105, 860, 610, 80)
                    .with_font_size(22)
                    .with_shrink_to_fit(true),
            ),
            (
                BoxField::Source,
                text(40, 150, 40, 800)
                    .with_font_size(22)
                    .with_rotation(90)
                    .with_wrap_axis(WrapAxis::Height),
            ),
            (BoxField::Level, text(700, 1030, 90, 50).with_font_size(36)),
        ]);
        Self { boxes }
    }

    pub fn get(&self, field: BoxField) -> Option<&LayoutBox> {
        self.boxes.get(&field)
    }

    /// Applies `[boxes.<field>]` settings on top of the current layout.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, BoxOverride>) -> Result<()> {
        let mut keys: Vec<&String> = overrides.keys().collect();
        keys.sort();
        for key in keys {
            let field: BoxField = key.parse()?;
            let current = self
                .boxes
                .get(&field)
                .ok_or_else(|| anyhow!("no layout box for field: {}", key))?;
            let updated = apply_override(current.clone(), &overrides[key])
                .with_context(|| format!("invalid [boxes.{}] settings", key))?;
            self.boxes.insert(field, updated);
        }
        Ok(())
    }
}

fn apply_override(layout: LayoutBox, changes: &BoxOverride) -> Result<LayoutBox> {
    let (x, y) = layout.origin();
    let (width, height) = layout.size();
    let h_align = match changes.h_align.as_deref() {
        Some(value) => value.parse::<HAlign>()?,
        None => layout.h_align(),
    };
    let v_align = match changes.v_align.as_deref() {
        Some(value) => value.parse::<VAlign>()?,
        None => layout.v_align(),
    };
    let wrap_axis = match changes.wrap.as_deref() {
        Some(value) => value.parse::<WrapAxis>()?,
        None => layout.wrap_axis(),
    };
    let font = changes
        .font
        .as_deref()
        .map(FontRef::parse)
        .unwrap_or_else(|| layout.font().clone());
    let font_size = changes.font_size.unwrap_or(layout.font_size());
    let rotation = changes.rotate.unwrap_or(layout.rotation());
    let shrink = changes.shrink.unwrap_or(layout.shrinks_to_fit());

    Ok(layout
        .with_origin(changes.x.unwrap_or(x), changes.y.unwrap_or(y))
        .with_size(changes.width.unwrap_or(width), changes.height.unwrap_or(height))
        .with_align(h_align, v_align)
        .with_wrap_axis(wrap_axis)
        .with_font(font)
        .with_font_size(font_size)
        .with_rotation(rotation)
        .with_shrink_to_fit(shrink))
}
