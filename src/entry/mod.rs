use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};
use thiserror::Error;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::canvas::{CanvasState, CanvasView};
use crate::config::fonts::FontRegistry;
use crate::config::{CanvasOptions, StyleDefaults};

/// Title text renders at this multiple of the body font size.
pub const TITLE_SCALE: f32 = 1.5;

static FONT_SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(?:px)?\s*$").expect("valid font size regex"));
static COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid color regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
    #[error("font family `{0}` is not available")]
    UnknownFamily(String),
    #[error("font size `{0}` is not a pixel size")]
    InvalidSize(String),
    #[error("color `{0}` is not a #rrggbb value")]
    InvalidColor(String),
    #[error("`{value}` is not a valid {field}")]
    InvalidKeyword { field: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("a title is required")]
    MissingTitle,
    #[error("entry text is required")]
    MissingText,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// Pixel font size; rendered as `"<n>px"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSize(f32);

impl FontSize {
    pub fn px(px: f32) -> Self {
        Self(px)
    }

    pub fn as_px(self) -> f32 {
        self.0
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self(self.0 * factor)
    }
}

impl Default for FontSize {
    fn default() -> Self {
        Self(16.0)
    }
}

impl fmt::Display for FontSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px", self.0)
    }
}

impl FromStr for FontSize {
    type Err = StyleError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let px = FONT_SIZE_RE
            .captures(raw)
            .and_then(|caps| caps[1].parse::<f32>().ok())
            .filter(|px| *px > 0.0)
            .ok_or_else(|| StyleError::InvalidSize(raw.to_string()))?;
        Ok(Self(px))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Color(String);

impl Color {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Self("#000000".to_string())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Color {
    type Err = StyleError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if COLOR_RE.is_match(trimmed) {
            Ok(Self(trimmed.to_ascii_lowercase()))
        } else {
            Err(StyleError::InvalidColor(raw.to_string()))
        }
    }
}

/// Typography applied to the whole entry; the title uses the same style at
/// [`TITLE_SCALE`] times the body size.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryStyle {
    pub font_family: String,
    pub font_size: FontSize,
    pub font_style: FontStyle,
    pub font_weight: FontWeight,
    pub color: Color,
}

impl Default for EntryStyle {
    fn default() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
            font_size: FontSize::default(),
            font_style: FontStyle::default(),
            font_weight: FontWeight::default(),
            color: Color::default(),
        }
    }
}

impl EntryStyle {
    /// Builds a style from configured defaults, replacing anything unparsable
    /// with the built-in fallback.
    pub fn from_defaults(defaults: &StyleDefaults) -> Self {
        let fallback = Self::default();
        Self {
            font_family: if defaults.font_family.trim().is_empty() {
                fallback.font_family
            } else {
                defaults.font_family.clone()
            },
            font_size: lenient(&defaults.font_size, "font size", fallback.font_size),
            font_style: lenient(&defaults.font_style, "font style", fallback.font_style),
            font_weight: lenient(&defaults.font_weight, "font weight", fallback.font_weight),
            color: lenient(&defaults.color, "color", fallback.color),
        }
    }

    pub fn title_font_size(&self) -> FontSize {
        self.font_size.scaled(TITLE_SCALE)
    }

    pub fn set_font_family(&mut self, family: &str) -> Result<(), StyleError> {
        if !FontRegistry::default().contains_family(family) {
            return Err(StyleError::UnknownFamily(family.to_string()));
        }
        self.font_family = family.to_string();
        Ok(())
    }

    pub fn set_font_size(&mut self, size: &str) -> Result<(), StyleError> {
        self.font_size = size.parse()?;
        Ok(())
    }

    pub fn set_font_style(&mut self, style: &str) -> Result<(), StyleError> {
        self.font_style = style.parse().map_err(|_| StyleError::InvalidKeyword {
            field: "font style",
            value: style.to_string(),
        })?;
        Ok(())
    }

    pub fn set_font_weight(&mut self, weight: &str) -> Result<(), StyleError> {
        self.font_weight = weight.parse().map_err(|_| StyleError::InvalidKeyword {
            field: "font weight",
            value: weight.to_string(),
        })?;
        Ok(())
    }

    pub fn set_color(&mut self, color: &str) -> Result<(), StyleError> {
        self.color = color.parse()?;
        Ok(())
    }
}

pub(crate) fn lenient<T: FromStr>(raw: &str, field: &str, fallback: T) -> T {
    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(field, value = raw, "unrecognised style value, using fallback");
            fallback
        }
    }
}

/// An entry being composed: text fields, style and the image canvas.
#[derive(Debug, Clone)]
pub struct Draft {
    pub title: String,
    pub text: String,
    pub author: String,
    pub style: EntryStyle,
    pub canvas: CanvasState,
}

impl Draft {
    pub fn new(author: impl Into<String>, style: EntryStyle, canvas: CanvasOptions) -> Self {
        Self {
            title: String::new(),
            text: String::new(),
            author: author.into(),
            style,
            canvas: CanvasState::new(canvas),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if self.text.trim().is_empty() {
            return Err(ValidationError::MissingText);
        }
        Ok(())
    }
}

/// Server-assigned entry identifier; the API may send it as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for EntryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(id) => EntryId(id.to_string()),
            Raw::Text(id) => EntryId(id),
        })
    }
}

/// A stored entry decoded for read-only display.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryView {
    pub id: EntryId,
    pub title: String,
    pub text: String,
    pub author: String,
    pub created_at: Option<OffsetDateTime>,
    pub style: EntryStyle,
    pub canvas: CanvasView,
}

impl EntryView {
    pub fn title_font_size(&self) -> FontSize {
        self.style.title_font_size()
    }

    pub fn created_on(&self, offset: UtcOffset) -> Option<Date> {
        self.created_at.map(|at| at.to_offset(offset).date())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_one_and_a_half_times_body() {
        let mut style = EntryStyle::default();
        assert_eq!(style.title_font_size().to_string(), "24px");
        style.set_font_size("15px").unwrap();
        assert_eq!(style.title_font_size().to_string(), "22.5px");
    }

    #[test]
    fn font_size_parsing() {
        assert_eq!("18px".parse::<FontSize>().unwrap(), FontSize::px(18.0));
        assert_eq!(" 20 ".parse::<FontSize>().unwrap(), FontSize::px(20.0));
        assert!("1.2em".parse::<FontSize>().is_err());
        assert!("0px".parse::<FontSize>().is_err());
    }

    #[test]
    fn style_setters_validate() {
        let mut style = EntryStyle::default();
        assert_eq!(
            style.set_font_family("Papyrus"),
            Err(StyleError::UnknownFamily("Papyrus".into()))
        );
        style.set_font_family("Georgia").unwrap();
        style.set_font_style("Italic").unwrap();
        style.set_font_weight("bold").unwrap();
        style.set_color("#AA00ff").unwrap();
        assert!(style.set_color("red").is_err());
        assert!(style.set_font_weight("heavy").is_err());

        assert_eq!(style.font_family, "Georgia");
        assert_eq!(style.font_style, FontStyle::Italic);
        assert_eq!(style.font_weight, FontWeight::Bold);
        assert_eq!(style.color.as_str(), "#aa00ff");
    }

    #[test]
    fn defaults_fall_back_when_unparsable() {
        let defaults = StyleDefaults {
            font_family: "".into(),
            font_size: "large".into(),
            font_style: "oblique".into(),
            font_weight: "bold".into(),
            color: "#123456".into(),
        };
        let style = EntryStyle::from_defaults(&defaults);
        assert_eq!(style.font_family, "sans-serif");
        assert_eq!(style.font_size, FontSize::px(16.0));
        assert_eq!(style.font_style, FontStyle::Normal);
        assert_eq!(style.font_weight, FontWeight::Bold);
        assert_eq!(style.color.as_str(), "#123456");
    }

    #[test]
    fn draft_requires_title_and_text() {
        let mut draft = Draft::new("User", EntryStyle::default(), CanvasOptions::default());
        assert_eq!(draft.validate(), Err(ValidationError::MissingTitle));
        draft.title = "  ".into();
        assert_eq!(draft.validate(), Err(ValidationError::MissingTitle));
        draft.title = "Spring".into();
        assert_eq!(draft.validate(), Err(ValidationError::MissingText));
        draft.text = "Cherry blossoms".into();
        assert_eq!(draft.validate(), Ok(()));
    }

    #[test]
    fn entry_id_accepts_numbers_and_strings() {
        let numeric: EntryId = serde_json::from_str("17").unwrap();
        let text: EntryId = serde_json::from_str("\"64f1c0\"").unwrap();
        assert_eq!(numeric.as_str(), "17");
        assert_eq!(text.as_str(), "64f1c0");
    }
}
