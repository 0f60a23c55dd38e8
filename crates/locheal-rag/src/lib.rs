//! Retrieval of compact, locator-relevant context from large page sources.

pub mod scorer;

use serde::{Deserialize, Serialize};
use std::time::Instant;

use locheal_core::chunker::{divide_into_chunks, sliding_chunks, truncate_at_tag_boundary};
use locheal_core::config::{Config, RetrievalConfig, RetrievalStrategy};
use locheal_core::page::detect_automation_type;
use locheal_core::types::{AutomationType, Chunk, ContextStats, LocatorAttributes};

pub use scorer::{assemble_context, find_most_relevant_chunk, score_fixed, score_weighted, CHUNK_SEPARATOR};

/// Summary of one retrieval run, suitable for logging or JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalReport {
    pub locator: String,
    pub automation_type: AutomationType,
    pub strategy: RetrievalStrategy,
    pub original_length: usize,
    pub optimized_length: usize,
    pub compression_ratio_percent: f64,
    pub chunks_analyzed: usize,
    pub relevant_chunks_found: usize,
    pub processing_time_ms: u64,
    pub success: bool,
}

pub struct RetrievalEngine {
    config: RetrievalConfig,
}

impl Default for RetrievalEngine {
    fn default() -> Self { Self::new(RetrievalConfig::default()) }
}

impl RetrievalEngine {
    pub fn new(config: RetrievalConfig) -> Self { Self { config } }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> { Ok(Self::new(config.retrieval()?)) }

    pub fn config(&self) -> &RetrievalConfig { &self.config }

    /// Context for `locator`, at most `max_context_length` chars and never
    /// blank when `page_source` is not blank.
    pub fn retrieve_relevant_context(&self, locator: &str, page_source: &str) -> String {
        if page_source.trim().is_empty() {
            return page_source.to_string();
        }
        let budget = self.config.max_context_length;
        if !self.config.enabled {
            return truncate_at_tag_boundary(page_source, budget);
        }

        let attrs = LocatorAttributes::extract(locator);
        tracing::debug!("Extracted attributes for '{}': {:?}", locator, attrs);
        let context = match self.config.strategy {
            RetrievalStrategy::SingleBest => {
                let chunks = divide_into_chunks(page_source, self.config.chunk_count);
                let best = find_most_relevant_chunk(&chunks, &attrs, locator);
                tracing::info!(
                    "Selected chunk {} of {} (score {:.2}, {} chars)",
                    best.chunk.ordinal_index,
                    chunks.len(),
                    best.score,
                    best.chunk.char_len()
                );
                truncate_at_tag_boundary(&best.chunk.content, budget)
            }
            RetrievalStrategy::Budgeted => {
                let chunks = self.sliding(page_source);
                assemble_context(&chunks, &attrs, &self.config, page_source)
            }
        };

        if context.trim().is_empty() {
            tracing::warn!("Retrieval produced an empty context for '{}', truncating the page source", locator);
            return truncate_at_tag_boundary(page_source, budget);
        }
        context
    }

    /// Lengths are measured on the context actually returned.
    pub fn get_context_stats(&self, locator: &str, page_source: &str) -> ContextStats {
        let context = self.retrieve_relevant_context(locator, page_source);
        ContextStats::new(page_source.chars().count(), context.chars().count())
    }

    pub fn validate_output(&self, locator: &str, page_source: &str) -> bool {
        let valid = !self.retrieve_relevant_context(locator, page_source).trim().is_empty();
        if !valid {
            tracing::warn!("Empty context returned for locator '{}'", locator);
        }
        valid
    }

    pub fn report(&self, locator: &str, page_source: &str) -> RetrievalReport {
        let started = Instant::now();
        let context = self.retrieve_relevant_context(locator, page_source);
        let processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let stats = ContextStats::new(page_source.chars().count(), context.chars().count());

        let (chunks_analyzed, relevant_chunks_found) = self.chunk_counts(locator, page_source);
        RetrievalReport {
            locator: locator.to_string(),
            automation_type: detect_automation_type(page_source),
            strategy: self.config.strategy,
            original_length: stats.original_length,
            optimized_length: stats.optimized_length,
            compression_ratio_percent: stats.compression_ratio_percent,
            chunks_analyzed,
            relevant_chunks_found,
            processing_time_ms,
            success: !context.trim().is_empty(),
        }
    }

    fn sliding(&self, page_source: &str) -> Vec<Chunk> {
        sliding_chunks(
            page_source,
            self.config.chunk_size,
            self.config.overlap_size,
            self.config.max_chunks_to_analyze,
        )
    }

    /// (chunks scored, chunks with a positive / above-threshold score)
    fn chunk_counts(&self, locator: &str, page_source: &str) -> (usize, usize) {
        if !self.config.enabled || page_source.trim().is_empty() {
            return (0, 0);
        }
        let attrs = LocatorAttributes::extract(locator);
        match self.config.strategy {
            RetrievalStrategy::SingleBest => {
                let chunks = divide_into_chunks(page_source, self.config.chunk_count);
                let relevant = chunks.iter().filter(|c| score_fixed(c, &attrs, locator) > 0.0).count();
                (chunks.len(), relevant)
            }
            RetrievalStrategy::Budgeted => {
                let chunks = self.sliding(page_source);
                let relevant = chunks
                    .iter()
                    .filter(|c| !c.is_blank() && score_weighted(c, &attrs, &self.config) >= self.config.relevance_threshold)
                    .count();
                (chunks.len(), relevant)
            }
        }
    }
}
