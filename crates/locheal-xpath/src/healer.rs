//! Deterministic healing without a model round trip.

use locheal_core::attributes::HealTargets;
use locheal_core::config::HealerConfig;
use locheal_core::traits::MarkupEngine;
use locheal_core::types::{HealResult, MatchedNode, ParseMode};

use crate::engine::SxdEngine;
use crate::literal::{lowercase_contains, xpath_string_literal};
use crate::similarity::{normalize, similarity};
use crate::tree::{absorb, PageTree};

const TEXT_NODES: &str = "//*[normalize-space(@text) or normalize-space(text())]";

/// Heals broken locators by resource-id, id or fuzzy text match.
pub struct LocalHealer<E: MarkupEngine = SxdEngine> {
    engine: E,
    config: HealerConfig,
}

impl Default for LocalHealer<SxdEngine> {
    fn default() -> Self { Self::new(SxdEngine, HealerConfig::default()) }
}

impl<E: MarkupEngine> LocalHealer<E> {
    pub fn new(engine: E, config: HealerConfig) -> Self { Self { engine, config } }

    pub fn config(&self) -> &HealerConfig { &self.config }

    pub fn heal_locator(&self, locator: &str, page_source: &str) -> HealResult {
        if locator.trim().is_empty() || page_source.trim().is_empty() {
            return HealResult::unchanged(locator);
        }
        let Some(tree) = absorb(PageTree::parse(&self.engine, page_source, ParseMode::Lenient), "page source") else {
            return HealResult::unchanged(locator);
        };
        if tree.resolves(locator) {
            return HealResult::new(locator, locator, 1.0);
        }

        let targets = HealTargets::extract(locator);
        let healed = if let Some(resource_id) = &targets.resource_id {
            heal_by_resource_id(&tree, resource_id)
        } else if let Some(id) = &targets.id_attr {
            heal_by_id(&tree, id)
        } else if let Some(text) = &targets.text_value {
            self.heal_by_text(&tree, text)
        } else {
            None
        };

        match healed {
            Some((xpath, confidence)) => {
                tracing::debug!("Healed '{}' -> {} ({:.2})", locator, xpath, confidence);
                HealResult::new(locator, xpath, confidence)
            }
            None => HealResult::unchanged(locator),
        }
    }

    fn heal_by_text(&self, tree: &PageTree<'_, E>, target: &str) -> Option<(String, f64)> {
        let wanted = normalize(target);
        if wanted.is_empty() {
            return None;
        }
        let nodes = absorb(tree.select(TEXT_NODES), TEXT_NODES)?;

        let mut best: Option<(&MatchedNode, String, f64)> = None;
        for node in &nodes {
            let candidate = normalize(node.attribute("text").unwrap_or(&node.text));
            if candidate.is_empty() {
                continue;
            }
            let score = similarity(&wanted, &candidate);
            if best.as_ref().map_or(true, |(_, _, s)| score > *s) {
                best = Some((node, candidate, score));
            }
        }

        let (node, candidate, score) = best?;
        if score <= self.config.similarity_threshold {
            tracing::debug!("Best text match '{}' scored {:.2}, below threshold", candidate, score);
            return None;
        }
        let xpath = if let Some(resource_id) = node.attribute("resource-id") {
            format!("//*[@resource-id={}]", xpath_string_literal(resource_id))
        } else if let Some(id) = node.attribute("id") {
            format!("//*[@id={}]", xpath_string_literal(id))
        } else {
            let raw = node.attribute("text").unwrap_or(&node.text);
            let needle = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
            format!("//*[{}]", lowercase_contains("normalize-space(.)", &needle))
        };
        if !tree.resolves(&xpath) {
            tracing::debug!("Text match '{}' produced a non-resolving {}", candidate, xpath);
            return None;
        }
        Some((xpath, score))
    }
}

fn heal_by_resource_id<E: MarkupEngine>(tree: &PageTree<'_, E>, resource_id: &str) -> Option<(String, f64)> {
    let lit = xpath_string_literal(resource_id);
    let exact = format!("//*[@resource-id={}]", lit);
    if tree.resolves(&exact) {
        return Some((exact, 1.0));
    }
    let partial = format!("//*[contains(@resource-id, {})]", lit);
    tree.resolves(&partial).then_some((partial, 0.9))
}

fn heal_by_id<E: MarkupEngine>(tree: &PageTree<'_, E>, id: &str) -> Option<(String, f64)> {
    let exact = format!("//*[@id={}]", xpath_string_literal(id));
    tree.resolves(&exact).then_some((exact, 1.0))
}
