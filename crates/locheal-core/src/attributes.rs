//! Regex decomposition of locator strings.
//!
//! All locator parsing lives here: [`LocatorAttributes::extract`] feeds the
//! relevance scorer and [`HealTargets::extract`] feeds the local healer. Both
//! read from the same pattern table.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::LocatorAttributes;

/// Which slot of [`LocatorAttributes`] a rule writes into.
#[derive(Debug, Clone, Copy)]
enum Slot {
    ResourceIdLiteral,
    Id,
    Class,
    ResourceId,
    Text,
    Tag,
    AndroidClass,
    Other,
}

struct Rule {
    slot: Slot,
    pattern: Regex,
}

fn rule(slot: Slot, pattern: &str) -> Rule {
    // Patterns are compile-time constants covered by the tests below.
    let pattern = Regex::new(pattern).expect("valid extraction pattern");
    Rule { slot, pattern }
}

/// Attribute names that have a dedicated slot and are never "other".
const DEDICATED: [&str; 4] = ["id", "class", "resource-id", "text"];

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        rule(Slot::ResourceIdLiteral, r"^[a-zA-Z0-9._]+:[a-zA-Z0-9_]+/[a-zA-Z0-9_]+$"),
        rule(Slot::Id, r#"@id\s*=\s*['"]([^'"]+)['"]"#),
        rule(Slot::Class, r#"@class\s*=\s*['"]([^'"]+)['"]"#),
        rule(Slot::ResourceId, r#"@resource-id\s*=\s*['"]([^'"]+)['"]"#),
        rule(Slot::Text, r#"@text\s*=\s*['"]([^'"]+)['"]|text\(\)\s*=\s*['"]([^'"]+)['"]"#),
        rule(Slot::Tag, r"^\s*//([a-zA-Z][a-zA-Z0-9_-]*)(?:[\[/(]|$)"),
        rule(Slot::Tag, r"//([a-zA-Z]+)(?:\[|$)"),
        rule(Slot::AndroidClass, r"android\.(?:widget|view)\.([A-Za-z]+)"),
        rule(Slot::Other, r#"@([a-zA-Z-]+)\s*=\s*['"]([^'"]+)['"]"#),
    ]
});

// Single-value patterns used by the healer. `regex` has no backreferences, so
// each quote style gets its own alternative.
static HEAL_RESOURCE_ID: LazyLock<Regex> =
    LazyLock::new(|| quoted_value(r"@resource-id\s*=\s*"));
static HEAL_BARE_RESOURCE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\w.]+:id/[\w\-]+)").expect("valid resource-id pattern"));
static HEAL_ID: LazyLock<Regex> = LazyLock::new(|| quoted_value(r"@id\s*=\s*"));
static HEAL_TEXT_FN: LazyLock<Regex> = LazyLock::new(|| quoted_value(r"text\(\)\s*=\s*"));
static HEAL_TEXT_ATTR: LazyLock<Regex> = LazyLock::new(|| quoted_value(r"@text\s*=\s*"));
static QUOTED_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'([^'"]{2,})'|"([^'"]{2,})""#).expect("valid quoted-run pattern"));

fn quoted_value(prefix: &str) -> Regex {
    Regex::new(&format!(r#"{prefix}(?:'([^']*)'|"([^"]*)")"#)).expect("valid quoted-value pattern")
}

/// First non-empty capture group of the first match.
fn first_capture(re: &Regex, haystack: &str) -> Option<String> {
    let caps = re.captures(haystack)?;
    caps.iter()
        .skip(1)
        .flatten()
        .map(|m| m.as_str())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

impl LocatorAttributes {
    /// Decomposes any locator string. Never fails; unparseable input gives
    /// an empty attribute set.
    pub fn extract(locator: &str) -> Self {
        let mut attrs = Self::default();
        for rule in RULES.iter() {
            for caps in rule.pattern.captures_iter(locator) {
                let group = |i: usize| caps.get(i).map(|m| m.as_str());
                match rule.slot {
                    Slot::ResourceIdLiteral => {
                        attrs.resource_ids.insert(locator.to_string());
                    }
                    Slot::Id => {
                        if let Some(v) = group(1) { attrs.ids.insert(v.to_string()); }
                    }
                    Slot::Class => {
                        if let Some(v) = group(1) {
                            attrs.classes.extend(v.split_whitespace().map(str::to_string));
                        }
                    }
                    Slot::ResourceId => {
                        if let Some(v) = group(1) { attrs.resource_ids.insert(v.to_string()); }
                    }
                    Slot::Text => {
                        if let Some(v) = group(1).or_else(|| group(2)) { attrs.text_content.insert(v.to_string()); }
                    }
                    Slot::Tag | Slot::AndroidClass => {
                        if let Some(v) = group(1) { attrs.tag_names.insert(v.to_lowercase()); }
                    }
                    Slot::Other => {
                        if let (Some(name), Some(value)) = (group(1), group(2)) {
                            if !DEDICATED.contains(&name) {
                                attrs.other_attributes.insert(name.to_string(), value.to_string());
                            }
                        }
                    }
                }
            }
        }

        for resource_id in &attrs.resource_ids {
            if let Some(pos) = resource_id.rfind('/') {
                attrs.resource_id_parts.insert(resource_id[pos + 1..].to_string());
            }
            if let Some(pos) = resource_id.find(':') {
                attrs.package_names.insert(resource_id[..pos].to_string());
            }
        }
        attrs
    }
}

/// The three values the local healer keys on, each optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealTargets {
    pub resource_id: Option<String>,
    pub id_attr: Option<String>,
    pub text_value: Option<String>,
}

impl HealTargets {
    pub fn extract(locator: &str) -> Self {
        let resource_id = first_capture(&HEAL_RESOURCE_ID, locator)
            .or_else(|| first_capture(&HEAL_BARE_RESOURCE_ID, locator));
        let id_attr = first_capture(&HEAL_ID, locator);
        let text_value = first_capture(&HEAL_TEXT_FN, locator)
            .or_else(|| first_capture(&HEAL_TEXT_ATTR, locator))
            .or_else(|| first_capture(&QUOTED_RUN, locator));
        Self { resource_id, id_attr, text_value }
    }
}
