//! XPath side of locator healing: presence validation, candidate generation
//! and the local healer, all behind [`MarkupEngine`].
//!
//! Every public operation here is total. Parse and evaluation failures are
//! logged at debug level and reported as "not present", `None` or a zero
//! confidence heal.

pub mod candidates;
pub mod engine;
pub mod healer;
pub mod literal;
pub mod similarity;
pub mod tree;
pub mod validator;

pub use candidates::XPathCandidates;
pub use engine::SxdEngine;
pub use healer::LocalHealer;
pub use locheal_core::traits::MarkupEngine;
pub use tree::PageTree;
pub use validator::LocatorValidator;

use locheal_core::page::detect_automation_type;
use locheal_core::types::{AutomationType, HealResult};

pub fn is_locator_present(locator: &str, page_source: &str, automation_type: AutomationType) -> bool {
    LocatorValidator::new(SxdEngine).is_locator_present(locator, page_source, automation_type)
}

/// Like [`is_locator_present`], classifying the page first.
pub fn is_locator_present_auto(locator: &str, page_source: &str) -> bool {
    is_locator_present(locator, page_source, detect_automation_type(page_source))
}

pub fn ensure_xpath(locator: &str, page_source: &str) -> Option<String> {
    XPathCandidates::new(SxdEngine).ensure_xpath(locator, page_source)
}

/// Heals with the default similarity threshold.
pub fn heal_locator(locator: &str, page_source: &str) -> HealResult {
    LocalHealer::new(SxdEngine, Default::default()).heal_locator(locator, page_source)
}
