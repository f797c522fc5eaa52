//! Formatting toggles and their resolution into renderer configurations.
//!
//! A [`ToggleSet`] holds the user's formatting choices. [`resolve`] projects
//! it into the two format-specific configurations; both projections are
//! derived from the same value so the shared fields always agree.

use crate::error::{Error, Result};
use crate::render::{DocumentConfig, HypertextConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Line spacing choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineSpacing {
    #[default]
    Single,
    Double,
}

/// Column count choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnCount {
    #[default]
    One,
    Two,
}

/// Text direction choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextDirection {
    #[default]
    LeftToRight,
    RightToLeft,
}

/// Text alignment choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAlignment {
    /// Aligned to the start edge of the text direction
    #[default]
    Default,
    Justified,
}

/// Font size override; at most one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontSize {
    Small,
    Medium,
    Large,
}

impl FontSize {
    /// Style class for hypertext output.
    pub fn class_name(self) -> &'static str {
        match self {
            FontSize::Small => "small-text",
            FontSize::Medium => "med-text",
            FontSize::Large => "large-text",
        }
    }
}

/// Hypertext style classes.
pub mod classes {
    pub const DOUBLE_SPACE: &str = "double-space";
    pub const TWO_COLUMN: &str = "two-column";
    pub const RTL_DIRECTION: &str = "rtl-direction";
    pub const JUSTIFIED: &str = "justified";
}

/// The full set of formatting choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ToggleSet {
    pub line_spacing: LineSpacing,
    pub column_count: ColumnCount,
    pub direction: TextDirection,
    pub alignment: TextAlignment,
    pub separate_chapters: bool,
    pub separate_verses: bool,
    pub font_size: Option<FontSize>,
}

impl Default for ToggleSet {
    fn default() -> Self {
        Self {
            line_spacing: LineSpacing::Single,
            column_count: ColumnCount::One,
            direction: TextDirection::LeftToRight,
            alignment: TextAlignment::Default,
            separate_chapters: true,
            separate_verses: false,
            font_size: None,
        }
    }
}

impl ToggleSet {
    /// Creates the default toggle set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one toggle change.
    pub fn set(&mut self, toggle: Toggle) {
        match toggle {
            Toggle::LineSpacing(v) => self.line_spacing = v,
            Toggle::ColumnCount(v) => self.column_count = v,
            Toggle::Direction(v) => self.direction = v,
            Toggle::Alignment(v) => self.alignment = v,
            Toggle::SeparateChapters(v) => self.separate_chapters = v,
            Toggle::SeparateVerses(v) => self.separate_verses = v,
            Toggle::FontSize(v) => self.font_size = v,
        }
    }

    /// Builder form of [`ToggleSet::set`].
    pub fn with(mut self, toggle: Toggle) -> Self {
        self.set(toggle);
        self
    }

    /// Label of the default alignment, which follows the text direction.
    pub fn default_alignment_label(&self) -> &'static str {
        match self.direction {
            TextDirection::LeftToRight => "Left Aligned",
            TextDirection::RightToLeft => "Right Aligned",
        }
    }

    /// Parses a toggle set from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Selection(format!("toggle file: {}", e)))
    }

    /// Loads a toggle set from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serializes the toggle set as pretty JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// One user toggle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    LineSpacing(LineSpacing),
    ColumnCount(ColumnCount),
    Direction(TextDirection),
    Alignment(TextAlignment),
    SeparateChapters(bool),
    SeparateVerses(bool),
    FontSize(Option<FontSize>),
}

impl Toggle {
    /// Builds a toggle from a name and a value, as sent by a UI.
    ///
    /// Names: `line-spacing` (single|double), `columns` (1|2),
    /// `direction` (ltr|rtl), `alignment` (default|justified),
    /// `chapters` / `verses` (separate|combined|on|off|true|false),
    /// `font-size` (small|medium|large|none).
    pub fn parse(name: &str, value: &str) -> Result<Self> {
        let value = value.trim().to_ascii_lowercase();
        let invalid = || Error::Selection(format!("invalid value '{}' for toggle '{}'", value, name));

        let toggle = match name.trim().to_ascii_lowercase().as_str() {
            "line-spacing" | "spacing" => Toggle::LineSpacing(match value.as_str() {
                "single" | "1" => LineSpacing::Single,
                "double" | "2" => LineSpacing::Double,
                _ => return Err(invalid()),
            }),
            "columns" | "column-count" => Toggle::ColumnCount(match value.as_str() {
                "one" | "1" => ColumnCount::One,
                "two" | "2" => ColumnCount::Two,
                _ => return Err(invalid()),
            }),
            "direction" => Toggle::Direction(match value.as_str() {
                "ltr" | "left-to-right" => TextDirection::LeftToRight,
                "rtl" | "right-to-left" => TextDirection::RightToLeft,
                _ => return Err(invalid()),
            }),
            "alignment" => Toggle::Alignment(match value.as_str() {
                "default" | "left" | "right" => TextAlignment::Default,
                "justified" | "justify" => TextAlignment::Justified,
                _ => return Err(invalid()),
            }),
            "chapters" | "separate-chapters" => {
                Toggle::SeparateChapters(parse_flag(&value).ok_or_else(invalid)?)
            }
            "verses" | "separate-verses" => {
                Toggle::SeparateVerses(parse_flag(&value).ok_or_else(invalid)?)
            }
            "font-size" => Toggle::FontSize(match value.as_str() {
                "small" => Some(FontSize::Small),
                "medium" | "med" => Some(FontSize::Medium),
                "large" => Some(FontSize::Large),
                "none" | "default" => None,
                _ => return Err(invalid()),
            }),
            other => return Err(Error::Selection(format!("unknown toggle '{}'", other))),
        };
        Ok(toggle)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "on" | "true" | "yes" | "separate" | "separated" => Some(true),
        "off" | "false" | "no" | "combined" | "combine" => Some(false),
        _ => None,
    }
}

impl FromStr for Toggle {
    type Err = Error;

    /// Parses `name=value`.
    fn from_str(s: &str) -> Result<Self> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| Error::Selection(format!("expected name=value, got '{}'", s)))?;
        Toggle::parse(name, value)
    }
}

/// Projects a toggle set into the hypertext and document configurations.
pub fn resolve(toggles: &ToggleSet) -> (HypertextConfig, DocumentConfig) {
    (resolve_hypertext(toggles), resolve_document(toggles))
}

/// Hypertext projection: style classes plus the separation flags.
pub fn resolve_hypertext(toggles: &ToggleSet) -> HypertextConfig {
    let mut config = HypertextConfig::default();

    if toggles.line_spacing == LineSpacing::Double {
        config.div_classes.push(classes::DOUBLE_SPACE.to_string());
    }
    if toggles.column_count == ColumnCount::Two {
        config.div_classes.push(classes::TWO_COLUMN.to_string());
    }
    if toggles.direction == TextDirection::RightToLeft {
        config.div_classes.push(classes::RTL_DIRECTION.to_string());
    }
    if toggles.alignment == TextAlignment::Justified {
        config.div_classes.push(classes::JUSTIFIED.to_string());
    }
    if let Some(size) = toggles.font_size {
        config.div_classes.push(size.class_name().to_string());
    }

    config.separate_chapters = toggles.separate_chapters;
    config.separate_verses = toggles.separate_verses;
    config
}

/// Document projection. Justification and font size have no field here.
pub fn resolve_document(toggles: &ToggleSet) -> DocumentConfig {
    DocumentConfig {
        line_spacing: match toggles.line_spacing {
            LineSpacing::Single => 1.0,
            LineSpacing::Double => 2.0,
        },
        column_count: match toggles.column_count {
            ColumnCount::One => 1,
            ColumnCount::Two => 2,
        },
        right_to_left: toggles.direction == TextDirection::RightToLeft,
        separate_chapters: toggles.separate_chapters,
        separate_verses: toggles.separate_verses,
    }
}
