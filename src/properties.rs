//! Named, externally adjustable strategy properties.
//!
//! Every visualization keeps its properties in a typed struct and exposes
//! them through the generic string-keyed view defined here, so external
//! controls can discover and edit them without knowing the concrete type.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Generic key → value view of a property set
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Property errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    #[error("property '{key}' expects a {expected} value, got {got}")]
    TypeMismatch {
        key: String,
        expected: PropertyKind,
        got: PropertyKind,
    },

    #[error("'{value}' is not a valid choice for '{key}' (expected one of {choices:?})")]
    InvalidChoice {
        key: String,
        value: String,
        choices: &'static [&'static str],
    },

    #[error("property '{key}' needs a finite number, got {value}")]
    NotFinite { key: String, value: f64 },

    #[error("invalid color '{0}' (expected #rrggbb or #rrggbbaa)")]
    InvalidColor(String),

    #[error("invalid property assignment '{0}' (expected key=value)")]
    InvalidAssignment(String),
}

/// RGBA color written as `#rrggbb` or `#rrggbbaa`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl HexColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Convert to a drawing color
    pub fn to_color(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }

    /// Convert to a drawing color with the alpha replaced by `opacity` (0-1)
    pub fn with_opacity(self, opacity: f32) -> tiny_skia::Color {
        let mut color = self.to_color();
        color.set_alpha(opacity.clamp(0.0, 1.0));
        color
    }
}

impl FromStr for HexColor {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PropertyError::InvalidColor(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(invalid());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: if hex.len() == 8 { channel(6)? } else { 255 },
        })
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl Serialize for HexColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Kind of value a property holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Number,
    Bool,
    Color,
    Choice,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyKind::Number => "number",
            PropertyKind::Bool => "boolean",
            PropertyKind::Color => "color",
            PropertyKind::Choice => "choice",
        };
        f.write_str(name)
    }
}

/// A single property value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Color(HexColor),
    Choice(String),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Bool(_) => PropertyKind::Bool,
            PropertyValue::Number(_) => PropertyKind::Number,
            PropertyValue::Color(_) => PropertyKind::Color,
            PropertyValue::Choice(_) => PropertyKind::Choice,
        }
    }

    fn mismatch(&self, key: &str, expected: PropertyKind) -> PropertyError {
        PropertyError::TypeMismatch {
            key: key.to_string(),
            expected,
            got: self.kind(),
        }
    }

    pub fn as_number(&self, key: &str) -> Result<f64, PropertyError> {
        match self {
            PropertyValue::Number(v) if v.is_finite() => Ok(*v),
            PropertyValue::Number(v) => Err(PropertyError::NotFinite {
                key: key.to_string(),
                value: *v,
            }),
            other => Err(other.mismatch(key, PropertyKind::Number)),
        }
    }

    pub fn as_bool(&self, key: &str) -> Result<bool, PropertyError> {
        match self {
            PropertyValue::Bool(v) => Ok(*v),
            other => Err(other.mismatch(key, PropertyKind::Bool)),
        }
    }

    pub fn as_color(&self, key: &str) -> Result<HexColor, PropertyError> {
        match self {
            PropertyValue::Color(v) => Ok(*v),
            other => Err(other.mismatch(key, PropertyKind::Color)),
        }
    }

    pub fn as_choice(&self, key: &str) -> Result<&str, PropertyError> {
        match self {
            PropertyValue::Choice(v) => Ok(v),
            other => Err(other.mismatch(key, PropertyKind::Choice)),
        }
    }
}

/// Parses command-line style values: `true`/`false`, numbers, `#hex` colors,
/// anything else as a choice
impl FromStr for PropertyValue {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(b) = s.parse::<bool>() {
            return Ok(PropertyValue::Bool(b));
        }
        if let Ok(n) = s.parse::<f64>() {
            return Ok(PropertyValue::Number(n));
        }
        if s.starts_with('#') {
            return s.parse().map(PropertyValue::Color);
        }
        Ok(PropertyValue::Choice(s.to_string()))
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Number(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<HexColor> for PropertyValue {
    fn from(v: HexColor) -> Self {
        PropertyValue::Color(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Choice(v.to_string())
    }
}

/// Split a `key=value` assignment
pub fn parse_assignment(s: &str) -> Result<(String, PropertyValue), PropertyError> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| PropertyError::InvalidAssignment(s.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(PropertyError::InvalidAssignment(s.to_string()));
    }
    Ok((key.to_string(), value.parse()?))
}

/// Suggested control range for a numeric property (advisory, never enforced)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// Describes one declared property for UI tooling
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PropertyDescriptor {
    pub key: &'static str,
    pub kind: PropertyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<NumericRange>,
    #[serde(skip_serializing_if = "no_choices")]
    pub choices: &'static [&'static str],
}

fn no_choices(choices: &&'static [&'static str]) -> bool {
    choices.is_empty()
}

impl PropertyDescriptor {
    pub const fn number(key: &'static str, min: f64, max: f64, step: f64) -> Self {
        Self {
            key,
            kind: PropertyKind::Number,
            range: Some(NumericRange { min, max, step }),
            choices: &[],
        }
    }

    pub const fn flag(key: &'static str) -> Self {
        Self {
            key,
            kind: PropertyKind::Bool,
            range: None,
            choices: &[],
        }
    }

    pub const fn color(key: &'static str) -> Self {
        Self {
            key,
            kind: PropertyKind::Color,
            range: None,
            choices: &[],
        }
    }

    pub const fn choice(key: &'static str, choices: &'static [&'static str]) -> Self {
        Self {
            key,
            kind: PropertyKind::Choice,
            range: None,
            choices,
        }
    }
}

/// Typed property struct with a generic string-keyed view
pub trait PropertySet {
    /// Declared properties in display order
    fn descriptors() -> &'static [PropertyDescriptor];

    /// Snapshot of all declared properties
    fn to_map(&self) -> PropertyMap;

    /// Assign `value` to `key`
    ///
    /// Returns `Ok(false)` for an undeclared key (nothing changes) and an
    /// error when the value has the wrong kind (nothing changes either).
    fn apply(&mut self, key: &str, value: &PropertyValue) -> Result<bool, PropertyError>;
}

/// Build a `PropertyMap` from `(key, value)` pairs
pub fn property_map<I, V>(entries: I) -> PropertyMap
where
    I: IntoIterator<Item = (&'static str, V)>,
    V: Into<PropertyValue>,
{
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.into()))
        .collect()
}
