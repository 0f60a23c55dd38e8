//! Turns an arbitrary locator into an XPath that resolves on the current page.

use regex::Regex;
use std::sync::LazyLock;

use locheal_core::traits::MarkupEngine;
use locheal_core::types::ParseMode;

use crate::engine::SxdEngine;
use crate::literal::{looks_xpath_like, lowercase_contains, xpath_string_literal};
use crate::tree::{absorb, PageTree};

static BARE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid tag pattern"));

const MOBILE_MARKER: &str = "//*[@resource-id]";

/// Candidate XPaths for `locator`, most specific first.
///
/// Mobile candidates lead when the page is an accessibility tree; the
/// universal ones follow in both cases. Candidates are not validated here and
/// may fail to compile.
pub fn candidates(locator: &str, mobile: bool) -> Vec<String> {
    let lit = xpath_string_literal(locator);
    let mut out = Vec::with_capacity(14);

    if mobile {
        out.push(format!("//*[@resource-id={}]", lit));
        out.push(format!("//*[contains(@resource-id, {})]", lit));
        out.push(format!("//*[@text={}]", lit));
        out.push(format!("//*[{}]", lowercase_contains("normalize-space(@text)", locator)));
        out.push(format!("//*[@content-desc={}]", lit));
        out.push(format!("//*[contains(@content-desc, {})]", lit));
        out.push(format!("//*[{}]", lowercase_contains("normalize-space(.)", locator)));
    }

    if BARE_TAG.is_match(locator) {
        out.push(format!("//{}", locator));
    }
    out.push(format!("//*[@id={}]", lit));
    out.push(format!("//*[@name={}]", lit));
    out.push(format!("//*[normalize-space(text())={}]", lit));
    out.push(format!("//*[{}]", lowercase_contains("normalize-space(.)", locator)));
    out.push(format!("//*[contains(concat(' ', normalize-space(@class), ' '), concat(' ', {}, ' '))]", lit));
    if looks_xpath_like(locator) {
        out.push(locator.to_string());
    }
    out
}

pub struct XPathCandidates<E: MarkupEngine = SxdEngine> {
    engine: E,
}

impl Default for XPathCandidates<SxdEngine> {
    fn default() -> Self { Self::new(SxdEngine) }
}

impl<E: MarkupEngine> XPathCandidates<E> {
    pub fn new(engine: E) -> Self { Self { engine } }

    /// Returns the locator itself when it already resolves, otherwise the
    /// first candidate that matches at least one node.
    pub fn ensure_xpath(&self, locator: &str, page_source: &str) -> Option<String> {
        let locator = locator.trim();
        if locator.is_empty() || page_source.trim().is_empty() {
            return None;
        }
        let tree = absorb(PageTree::parse(&self.engine, page_source, ParseMode::Lenient), "page source")?;
        if tree.resolves(locator) {
            return Some(locator.to_string());
        }

        let mobile = tree.resolves(MOBILE_MARKER);
        let found = candidates(locator, mobile).into_iter().find(|candidate| tree.resolves(candidate));
        match &found {
            Some(xpath) => tracing::debug!("Resolved '{}' as {}", locator, xpath),
            None => tracing::debug!("No candidate resolved for '{}' (mobile={})", locator, mobile),
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mobile_candidates_come_first() {
        let list = candidates("search", true);
        assert_eq!(list[0], "//*[@resource-id='search']");
        assert_eq!(list[7], "//search");
        assert_eq!(list.len(), 13);
        assert_eq!(candidates("search", false)[0], "//search");
    }

    #[test]
    fn xpath_like_locators_are_retried_last() {
        let list = candidates("//a[@id='x']", false);
        assert_eq!(list.last().map(String::as_str), Some("//a[@id='x']"));
        assert!(!candidates("Add to cart", false).contains(&"Add to cart".to_string()));
    }
}
