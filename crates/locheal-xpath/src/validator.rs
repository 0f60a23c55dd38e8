//! Presence checks for raw locators against a page source.

use scraper::{Html, Selector};

use locheal_core::error::{Error, Result};
use locheal_core::traits::MarkupEngine;
use locheal_core::types::{AutomationType, ParseMode};

use crate::engine::SxdEngine;
use crate::literal::xpath_string_literal;
use crate::tree::{absorb, PageTree};

/// Decides whether a locator resolves against a page. Never errors: anything
/// that cannot be parsed or evaluated counts as "not present".
pub struct LocatorValidator<E: MarkupEngine = SxdEngine> {
    engine: E,
}

impl Default for LocatorValidator<SxdEngine> {
    fn default() -> Self { Self::new(SxdEngine) }
}

impl<E: MarkupEngine> LocatorValidator<E> {
    pub fn new(engine: E) -> Self { Self { engine } }

    pub fn is_locator_present(&self, locator: &str, page_source: &str, automation_type: AutomationType) -> bool {
        if locator.trim().is_empty() || page_source.trim().is_empty() {
            return false;
        }

        let present = if locator.starts_with('/') || locator.starts_with("./") {
            self.xpath_present(locator, page_source)
        } else {
            match automation_type {
                AutomationType::Web => web_locator_present(locator, page_source),
                AutomationType::MobileAndroid | AutomationType::MobileIos => {
                    self.mobile_locator_present(locator, page_source)
                }
                AutomationType::Unknown => false,
            }
        };
        tracing::debug!("Locator '{}' present on {} page: {}", locator, automation_type, present);
        present
    }

    fn xpath_present(&self, locator: &str, page_source: &str) -> bool {
        absorb(PageTree::parse(&self.engine, page_source, ParseMode::StrictXml), "page source")
            .is_some_and(|tree| tree.resolves(locator))
    }

    /// Matches the locator against `@resource-id`, `@text` and `@content-desc` in turn.
    fn mobile_locator_present(&self, locator: &str, page_source: &str) -> bool {
        let literal = xpath_string_literal(locator);
        absorb(PageTree::parse(&self.engine, page_source, ParseMode::StrictXml), "page source").is_some_and(|tree| {
            ["resource-id", "text", "content-desc"]
                .iter()
                .any(|attr| tree.resolves(&format!("//*[@{}={}]", attr, literal)))
        })
    }
}

/// Tries the locator as an element id, a `name` attribute and a raw CSS selector.
fn web_locator_present(locator: &str, page_source: &str) -> bool {
    let document = Html::parse_document(page_source);
    [format!("#{}", locator), format!("[name={}]", locator), locator.to_string()]
        .iter()
        .any(|selector| absorb(css_matches(&document, selector), selector).unwrap_or(false))
}

fn css_matches(document: &Html, selector: &str) -> Result<bool> {
    let parsed = Selector::parse(selector)
        .map_err(|e| Error::Selector { selector: selector.to_string(), reason: format!("{:?}", e) })?;
    Ok(document.select(&parsed).next().is_some())
}
