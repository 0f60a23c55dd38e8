//! Domain types shared by the analyzer, the XPath engine and the retrieval engine.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Dialect of a page source.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutomationType {
    Web,
    MobileAndroid,
    MobileIos,
    #[default]
    Unknown,
}

impl AutomationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Web => "WEB",
            Self::MobileAndroid => "MOBILE_ANDROID",
            Self::MobileIos => "MOBILE_IOS",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn is_mobile(self) -> bool { matches!(self, Self::MobileAndroid | Self::MobileIos) }
}

impl fmt::Display for AutomationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for AutomationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "WEB" => Ok(Self::Web),
            "MOBILE_ANDROID" | "ANDROID" => Ok(Self::MobileAndroid),
            "MOBILE_IOS" | "IOS" => Ok(Self::MobileIos),
            "UNKNOWN" => Ok(Self::Unknown),
            _ => Err(Error::UnknownAutomationType(s.to_string())),
        }
    }
}

/// Canonical attributes decomposed from a locator string.
///
/// Every field is always present; nothing extracted means an empty set.
/// `resource_id_parts` and `package_names` are derived from `resource_ids`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorAttributes {
    pub ids: BTreeSet<String>,
    pub classes: BTreeSet<String>,
    pub resource_ids: BTreeSet<String>,
    pub resource_id_parts: BTreeSet<String>,
    pub package_names: BTreeSet<String>,
    pub text_content: BTreeSet<String>,
    pub tag_names: BTreeSet<String>,
    pub other_attributes: BTreeMap<String, String>,
}

impl LocatorAttributes {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
            && self.classes.is_empty()
            && self.resource_ids.is_empty()
            && self.text_content.is_empty()
            && self.tag_names.is_empty()
            && self.other_attributes.is_empty()
    }
}

/// Bounded structural inventory of a page source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub form_elements: Vec<String>,
    pub interactive_elements: Vec<String>,
    pub container_elements: Vec<String>,
    /// id value -> tag name
    pub elements_with_ids: BTreeMap<String, String>,
    /// tag name -> classes seen on that tag
    pub elements_with_classes: BTreeMap<String, BTreeSet<String>>,
    pub text_content: Vec<String>,
    pub automation_type: AutomationType,
}

impl PageAnalysis {
    pub fn summary(&self) -> String {
        format!(
            "PageAnalysis{{forms={}, interactive={}, containers={}, withIds={}, withClasses={}, texts={}, type={}}}",
            self.form_elements.len(),
            self.interactive_elements.len(),
            self.container_elements.len(),
            self.elements_with_ids.len(),
            self.elements_with_classes.len(),
            self.text_content.len(),
            self.automation_type
        )
    }
}

/// One contiguous segment of a page source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub ordinal_index: usize,
}

impl Chunk {
    pub fn new(content: impl Into<String>, ordinal_index: usize) -> Self {
        Self { content: content.into(), ordinal_index }
    }

    pub fn is_blank(&self) -> bool { self.content.trim().is_empty() }

    pub fn char_len(&self) -> usize { self.content.chars().count() }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f64,
}

/// Outcome of a local heal. `confidence` is always within `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealResult {
    pub original_locator: String,
    pub healed_xpath: String,
    pub confidence: f64,
}

impl HealResult {
    pub fn new(original_locator: impl Into<String>, healed_xpath: impl Into<String>, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
        Self { original_locator: original_locator.into(), healed_xpath: healed_xpath.into(), confidence }
    }

    /// No usable correction: the locator is handed back with zero confidence.
    pub fn unchanged(locator: &str) -> Self { Self::new(locator, locator, 0.0) }

    pub fn is_healed(&self) -> bool { self.confidence > 0.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextStats {
    pub original_length: usize,
    pub optimized_length: usize,
    pub compression_ratio_percent: f64,
}

impl ContextStats {
    pub fn new(original_length: usize, optimized_length: usize) -> Self {
        let compression_ratio_percent =
            if original_length > 0 { optimized_length as f64 / original_length as f64 * 100.0 } else { 0.0 };
        Self { original_length, optimized_length, compression_ratio_percent }
    }

    /// Share of the page source that was cut away, in percent.
    pub fn compression_achieved(&self) -> f64 { 100.0 - self.compression_ratio_percent }
}

impl fmt::Display for ContextStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContextStats{{original={}, optimized={}, compression={:.2}%}}",
            self.original_length, self.optimized_length, self.compression_ratio_percent
        )
    }
}

/// Owned view of a node returned by an XPath evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchedNode {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    /// Full string value (concatenated descendant text for elements).
    pub text: String,
}

impl MatchedNode {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }
}

/// How strictly a page source is parsed into a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Well-formed XML only.
    StrictXml,
    /// XML first, falling back to a forgiving HTML parse.
    Lenient,
}
