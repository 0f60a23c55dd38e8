//! Relevance scoring of page chunks against a locator's attributes.
//!
//! `score_fixed` and `find_most_relevant_chunk` drive the single-best
//! strategy with hard-coded weights; `score_weighted` and `assemble_context`
//! drive the budgeted strategy with weights from [`RetrievalConfig`].

use std::cmp::Ordering;
use std::collections::BTreeSet;

use locheal_core::chunker::truncate_at_tag_boundary;
use locheal_core::config::RetrievalConfig;
use locheal_core::types::{Chunk, LocatorAttributes, ScoredChunk};

pub const CHUNK_SEPARATOR: &str = "\n<!-- ... chunk separator ... -->\n";

const MOBILE_MARKERS: [&str; 4] = ["android.widget.", "resource-id=", "bounds=", "class="];
const MOBILE_MARKER_BONUS: f64 = 0.5;
const FALLBACK_CHUNKS: usize = 3;

const RAW_LOCATOR_WEIGHT: f64 = 10.0;
const RESOURCE_ID_WEIGHT: f64 = 8.0;
const RESOURCE_ID_PART_WEIGHT: f64 = 5.0;
const ID_WEIGHT: f64 = 6.0;
const TEXT_WEIGHT: f64 = 4.0;
const PACKAGE_WEIGHT: f64 = 3.0;
const CLASS_WEIGHT: f64 = 2.0;
const TAG_WEIGHT: f64 = 2.0;

/// Lowercased chunk content with case-insensitive lookups.
struct Haystack(String);

impl Haystack {
    fn new(content: &str) -> Self { Self(content.to_lowercase()) }

    fn contains(&self, needle: &str) -> bool { !needle.is_empty() && self.0.contains(&needle.to_lowercase()) }

    fn count(&self, values: &BTreeSet<String>) -> f64 { values.iter().filter(|v| self.contains(v)).count() as f64 }

    fn count_tags(&self, tags: &BTreeSet<String>) -> f64 {
        tags.iter()
            .filter(|tag| {
                self.contains(&format!("<{}", tag))
                    || self.contains(&format!("android.widget.{}", tag))
                    || self.contains(&format!("android.view.{}", tag))
            })
            .count() as f64
    }

    fn mobile_bonus(&self) -> f64 {
        if MOBILE_MARKERS.iter().any(|m| self.0.contains(m)) { MOBILE_MARKER_BONUS } else { 0.0 }
    }
}

pub fn score_fixed(chunk: &Chunk, attrs: &LocatorAttributes, raw_locator: &str) -> f64 {
    if chunk.is_blank() {
        return 0.0;
    }
    let hay = Haystack::new(&chunk.content);
    let mut score = 0.0;
    if !raw_locator.is_empty() && chunk.content.contains(raw_locator) {
        score += RAW_LOCATOR_WEIGHT;
    }
    score += RESOURCE_ID_WEIGHT * hay.count(&attrs.resource_ids);
    score += RESOURCE_ID_PART_WEIGHT * hay.count(&attrs.resource_id_parts);
    score += ID_WEIGHT * hay.count(&attrs.ids);
    score += TEXT_WEIGHT * hay.count(&attrs.text_content);
    score += PACKAGE_WEIGHT * hay.count(&attrs.package_names);
    score += CLASS_WEIGHT * hay.count(&attrs.classes);
    score += TAG_WEIGHT * hay.count_tags(&attrs.tag_names);
    score + hay.mobile_bonus()
}

/// Picks the best non-blank chunk. Ties go to the lower index; when nothing
/// scores, the middle chunk (or the first non-blank one) is returned with a
/// score of zero.
pub fn find_most_relevant_chunk(chunks: &[Chunk], attrs: &LocatorAttributes, raw_locator: &str) -> ScoredChunk {
    let mut best: Option<(usize, f64)> = None;
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.is_blank() {
            continue;
        }
        let score = score_fixed(chunk, attrs, raw_locator);
        tracing::debug!("Chunk {} scored {:.3} ({} chars)", i, score, chunk.char_len());
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((i, score));
        }
    }

    if let Some((i, score)) = best.filter(|(_, score)| *score > 0.0) {
        return ScoredChunk { chunk: chunks[i].clone(), score };
    }

    let middle = chunks.get(chunks.len() / 2).filter(|c| !c.is_blank());
    match middle.or_else(|| chunks.iter().find(|c| !c.is_blank())) {
        Some(chunk) => {
            tracing::debug!("No chunk scored above zero, falling back to chunk {}", chunk.ordinal_index);
            ScoredChunk { chunk: chunk.clone(), score: 0.0 }
        }
        None => ScoredChunk::default(),
    }
}

pub fn score_weighted(chunk: &Chunk, attrs: &LocatorAttributes, config: &RetrievalConfig) -> f64 {
    if chunk.is_blank() {
        return 0.0;
    }
    let hay = Haystack::new(&chunk.content);
    let mut score = 0.0;
    score += config.id_match_weight * hay.count(&attrs.ids);
    score += 2.0 * config.resource_id_match_weight * hay.count(&attrs.resource_ids);
    score += config.resource_id_match_weight * hay.count(&attrs.resource_id_parts);
    score += config.class_match_weight * hay.count(&attrs.package_names);
    score += config.class_match_weight * hay.count(&attrs.classes);
    score += config.text_match_weight * hay.count(&attrs.text_content);
    score += config.tag_match_weight * hay.count_tags(&attrs.tag_names);
    score += config.other_attribute_match_weight
        * attrs.other_attributes.values().filter(|v| hay.contains(v)).count() as f64;
    score + hay.mobile_bonus()
}

/// Joins chunks in ordinal order, separating chunks that are not neighbours.
pub fn render_chunks(chunks: &[&Chunk]) -> String {
    let mut ordered = chunks.to_vec();
    ordered.sort_by_key(|c| c.ordinal_index);
    let mut out = String::new();
    let mut previous: Option<usize> = None;
    for chunk in ordered {
        if previous.is_some_and(|p| chunk.ordinal_index != p + 1) {
            out.push_str(CHUNK_SEPARATOR);
        }
        out.push_str(&chunk.content);
        previous = Some(chunk.ordinal_index);
    }
    out
}

fn fits(selected: &[&Chunk], candidate: &Chunk, budget: usize) -> bool {
    let mut trial = selected.to_vec();
    trial.push(candidate);
    render_chunks(&trial).chars().count() <= budget
}

/// Builds a context of at most `max_context_length` chars out of the chunks
/// that clear `relevance_threshold`, best first.
pub fn assemble_context(
    chunks: &[Chunk],
    attrs: &LocatorAttributes,
    config: &RetrievalConfig,
    original: &str,
) -> String {
    let budget = config.max_context_length;

    let mut ranked: Vec<ScoredChunk> = chunks
        .iter()
        .filter(|c| !c.is_blank())
        .map(|c| ScoredChunk { chunk: c.clone(), score: score_weighted(c, attrs, config) })
        .filter(|s| s.score >= config.relevance_threshold)
        .collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    tracing::debug!("{} of {} chunks cleared threshold {}", ranked.len(), chunks.len(), config.relevance_threshold);

    let mut selected: Vec<&Chunk> = Vec::new();
    for scored in &ranked {
        if fits(&selected, &scored.chunk, budget) {
            selected.push(&scored.chunk);
        }
    }
    if !selected.is_empty() {
        return render_chunks(&selected);
    }

    tracing::warn!("No chunk met the relevance threshold, using the leading chunks");
    for chunk in chunks.iter().filter(|c| !c.is_blank()).take(FALLBACK_CHUNKS) {
        if !fits(&selected, chunk, budget) {
            break;
        }
        selected.push(chunk);
    }
    if !selected.is_empty() {
        return render_chunks(&selected);
    }

    if let Some(first) = chunks.iter().find(|c| !c.is_blank()) {
        let truncated = truncate_at_tag_boundary(&first.content, budget);
        if !truncated.trim().is_empty() {
            tracing::warn!("Using truncated first chunk as context");
            return truncated;
        }
    }
    tracing::warn!("All chunk fallbacks failed, truncating the page source");
    truncate_at_tag_boundary(original, budget)
}
