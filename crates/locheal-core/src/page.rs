//! Structural analysis of page sources.
//!
//! Everything here is regex-driven and works on malformed markup; each
//! extraction loop stops at its cap so huge page dumps stay cheap.

use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

use crate::types::{AutomationType, LocatorAttributes, PageAnalysis};

const MAX_STRUCTURAL: usize = 50;
const MAX_ATTRIBUTE_MAP: usize = 100;
const MAX_TEXT: usize = 50;
const MAX_SIMILAR: usize = 10;
const SIMILARITY_CUTOFF: f64 = 0.3;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($re).expect("valid page pattern"));
    };
}

pattern!(FORM_ELEMENTS, r"(?i)<(?:input|button|select|textarea|form)\b[^>]*>");
pattern!(INTERACTIVE_ELEMENTS, r"(?i)<(?:a|button|input|select|textarea)\b[^>]*>");
pattern!(CONTAINER_ELEMENTS, r"(?i)<(?:div|section|article|nav|header|footer|main|aside)\b[^>]*>");
pattern!(ID_ATTRIBUTE, r#"(?i)<([a-zA-Z]+)[^>]*\sid\s*=\s*['"]([^'"]+)['"][^>]*>"#);
pattern!(CLASS_ATTRIBUTE, r#"(?i)<([a-zA-Z]+)[^>]*\sclass\s*=\s*['"]([^'"]+)['"][^>]*>"#);
pattern!(TEXT_BETWEEN_TAGS, r">([^<]+)<");

/// Classifies the dialect of a page source by marker substrings.
pub fn detect_automation_type(page_source: &str) -> AutomationType {
    let lower = page_source.to_lowercase();
    if ["resource-id", "android.widget", "android.view"].iter().any(|m| lower.contains(m)) {
        return AutomationType::MobileAndroid;
    }
    if lower.contains("ios") || lower.contains("xcuielementtype") {
        return AutomationType::MobileIos;
    }
    if ["<html", "<body", "<!doctype"].iter().any(|m| lower.contains(m)) {
        return AutomationType::Web;
    }
    AutomationType::Unknown
}

/// Builds a bounded structural inventory of `page_source`.
pub fn analyze_page(page_source: &str) -> PageAnalysis {
    if page_source.trim().is_empty() {
        return PageAnalysis::default();
    }

    let mut analysis = PageAnalysis {
        form_elements: extract_elements(page_source, &FORM_ELEMENTS),
        interactive_elements: extract_elements(page_source, &INTERACTIVE_ELEMENTS),
        container_elements: extract_elements(page_source, &CONTAINER_ELEMENTS),
        automation_type: detect_automation_type(page_source),
        ..PageAnalysis::default()
    };

    for caps in ID_ATTRIBUTE.captures_iter(page_source) {
        if analysis.elements_with_ids.len() >= MAX_ATTRIBUTE_MAP { break; }
        analysis.elements_with_ids.insert(caps[2].to_string(), caps[1].to_string());
    }

    for caps in CLASS_ATTRIBUTE.captures_iter(page_source) {
        let tag = &caps[1];
        if analysis.elements_with_classes.len() >= MAX_ATTRIBUTE_MAP && !analysis.elements_with_classes.contains_key(tag) {
            break;
        }
        analysis
            .elements_with_classes
            .entry(tag.to_string())
            .or_default()
            .extend(caps[2].split_whitespace().map(str::to_string));
    }

    for caps in TEXT_BETWEEN_TAGS.captures_iter(page_source) {
        if analysis.text_content.len() >= MAX_TEXT { break; }
        let text = caps[1].trim();
        if text.chars().count() > 2 {
            analysis.text_content.push(text.to_string());
        }
    }

    tracing::debug!("Page analysis completed: {}", analysis.summary());
    analysis
}

fn extract_elements(page_source: &str, pattern: &Regex) -> Vec<String> {
    pattern
        .find_iter(page_source)
        .take(MAX_STRUCTURAL)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Raw element snippets that share the locator's tag and resemble it.
///
/// Ordered by descending similarity, at most ten entries.
pub fn find_similar_elements(locator: &str, page_source: &str) -> Vec<String> {
    let attrs = LocatorAttributes::extract(locator);
    let mut scored: Vec<(f64, String)> = Vec::new();

    for tag in &attrs.tag_names {
        let element_pattern = match Regex::new(&format!(r"(?i)<{}\b[^>]*>", regex::escape(tag))) {
            Ok(re) => re,
            Err(e) => {
                tracing::debug!("Skipping tag '{}': {}", tag, e);
                continue;
            }
        };
        for m in element_pattern.find_iter(page_source) {
            if scored.len() >= MAX_SIMILAR { break; }
            let element = m.as_str();
            let similarity = element_similarity(tag, &attrs, element);
            if similarity > SIMILARITY_CUTOFF {
                scored.push((similarity, element.to_string()));
            }
        }
    }

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.into_iter().map(|(_, element)| element).collect()
}

fn element_similarity(tag: &str, attrs: &LocatorAttributes, element: &str) -> f64 {
    let mut similarity = 0.0;
    if element.to_lowercase().contains(tag) { similarity += 0.3; }
    if attrs.ids.iter().any(|id| element.contains(id.as_str())) { similarity += 0.4; }
    similarity += 0.2 * attrs.classes.iter().filter(|c| element.contains(c.as_str())).count() as f64;
    if attrs.text_content.iter().any(|t| element.contains(t.as_str())) { similarity += 0.3; }
    f64::min(similarity, 1.0)
}
