//! Value Objects for the menu tree

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, stable identifier of a menu item.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuItemId(String);

impl MenuItemId {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
    pub fn generate() -> Self { Self(Uuid::now_v7().to_string()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<Uuid> for MenuItemId {
    fn from(value: Uuid) -> Self { Self(value.to_string()) }
}

impl From<&str> for MenuItemId {
    fn from(value: &str) -> Self { Self(value.to_string()) }
}

impl fmt::Display for MenuItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Display label of a menu item (Persian labels are common, so length is
/// counted in characters, not bytes).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label(String);

impl Label {
    pub const MAX_CHARS: usize = 120;

    pub fn new(value: impl Into<String>) -> Result<Self, LabelError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(LabelError::Empty); }
        if value.chars().count() > Self::MAX_CHARS { return Err(LabelError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for Label {
    type Error = LabelError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Label> for String {
    fn from(value: Label) -> Self { value.0 }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum LabelError { Empty, TooLong }
impl std::error::Error for LabelError {}
impl fmt::Display for LabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "Label empty"), Self::TooLong => write!(f, "Label too long") }
    }
}

/// What a menu entry links to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    #[default]
    Custom,
    Page,
    Category,
    Product,
    Tag,
    External,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Page => "page",
            Self::Category => "category",
            Self::Product => "product",
            Self::Tag => "tag",
            Self::External => "external",
        }
    }

    /// Whether the entry points at a catalog resource via `linked_resource_id`.
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Page | Self::Category | Self::Product | Self::Tag)
    }
}

impl FromStr for LinkKind {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "custom" => Ok(Self::Custom),
            "page" => Ok(Self::Page),
            "category" => Ok(Self::Category),
            "product" => Ok(Self::Product),
            "tag" => Ok(Self::Tag),
            "external" => Ok(Self::External),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Browsing context the link opens in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetWindow {
    #[default]
    #[serde(rename = "_self")]
    SameWindow,
    #[serde(rename = "_blank")]
    NewWindow,
}

impl TargetWindow {
    pub fn as_str(&self) -> &'static str {
        match self { Self::SameWindow => "_self", Self::NewWindow => "_blank" }
    }
}

impl FromStr for TargetWindow {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "_self" => Ok(Self::SameWindow),
            "_blank" => Ok(Self::NewWindow),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct UnknownVariant(pub String);
impl std::error::Error for UnknownVariant {}
impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Unknown variant: {}", self.0) }
}

/// Maximum number of nesting levels a menu may have. Root items sit on
/// level 1, so an item at zero-based depth `d` occupies level `d + 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLimit(usize);

impl DepthLimit {
    pub const DEFAULT_LEVELS: usize = 4;
    pub const MAX_LEVELS: usize = 32;

    pub fn new(levels: usize) -> Self { Self(levels.clamp(1, Self::MAX_LEVELS)) }
    pub fn levels(&self) -> usize { self.0 }
    /// Whether a subtree of `height` levels may hang at zero-based `depth`.
    pub fn allows(&self, depth: usize, height: usize) -> bool { depth + height <= self.0 }
}

impl Default for DepthLimit { fn default() -> Self { Self(Self::DEFAULT_LEVELS) } }
