use locheal_core::error::Result;
use locheal_core::traits::MarkupEngine;
use locheal_core::types::{MatchedNode, ParseMode};

/// A parsed page bound to the engine that parsed it.
pub struct PageTree<'e, E: MarkupEngine> {
    engine: &'e E,
    tree: E::Tree,
}

impl<'e, E: MarkupEngine> PageTree<'e, E> {
    pub fn parse(engine: &'e E, source: &str, mode: ParseMode) -> Result<Self> {
        Ok(Self { engine, tree: engine.parse(source, mode)? })
    }

    pub fn select(&self, expr: &str) -> Result<Vec<MatchedNode>> {
        self.engine.select(&self.tree, expr)
    }

    /// True when `expr` matches at least one node. Invalid expressions do not match.
    pub fn resolves(&self, expr: &str) -> bool {
        absorb(self.select(expr), expr).is_some_and(|nodes| !nodes.is_empty())
    }
}

/// Turns a parse or evaluation failure into "no result".
///
/// The public validator, candidate and healer operations never surface these
/// errors; they all funnel through here so the failure is still logged.
pub(crate) fn absorb<T>(result: Result<T>, subject: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("Ignoring failure for '{}': {}", subject, e);
            None
        }
    }
}
