use crate::error::Result;
use crate::types::{MatchedNode, ParseMode};

/// A markup parser paired with an XPath evaluator.
///
/// Everything that needs a tree goes through this seam, so the concrete
/// XML/HTML stack can be swapped without touching the healing logic.
pub trait MarkupEngine: Send + Sync {
    type Tree;

    fn parse(&self, source: &str, mode: ParseMode) -> Result<Self::Tree>;

    /// Evaluates `expr` against `tree`. Expressions that do not produce a
    /// node-set yield an empty list.
    fn select(&self, tree: &Self::Tree, expr: &str) -> Result<Vec<MatchedNode>>;
}
