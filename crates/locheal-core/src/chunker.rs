//! Splitting page sources into structurally aligned chunks.
//!
//! Positions are counted in chars. Boundaries prefer the spot right after a
//! closing `>` so that a chunk rarely ends inside a tag.

use crate::types::Chunk;

pub const DEFAULT_CHUNK_COUNT: usize = 5;
pub const TRUNCATION_MARKER: &str = "\n<!-- ... truncated ... -->";

const SNAP_WINDOW: usize = 50;
/// A trailing `>` further than this from the window end is worth trimming to.
const TRIM_SLACK: usize = 100;
/// How far back from the budget the truncation looks for a `>`.
const TRUNCATE_SLACK: usize = 200;

/// Partitions `page_source` into exactly `n` contiguous chunks.
///
/// Blank input yields `n` empty chunks. `n == 0` is treated as 1.
pub fn divide_into_chunks(page_source: &str, n: usize) -> Vec<Chunk> {
    let n = n.max(1);
    if page_source.trim().is_empty() {
        return (0..n).map(|i| Chunk::new(String::new(), i)).collect();
    }

    let chars: Vec<char> = page_source.chars().collect();
    let total = chars.len();
    let base = total / n;
    tracing::debug!("Dividing {} chars into {} chunks of ~{} chars each", total, n, base);

    let mut chunks = Vec::with_capacity(n);
    let mut start = 0;
    for i in 0..n {
        let end = if i == n - 1 {
            total
        } else {
            snap_to_tag_boundary(&chars, ((i + 1) * base).min(total)).clamp(start, total)
        };
        chunks.push(Chunk::new(chars[start..end].iter().collect::<String>(), i));
        tracing::debug!("Chunk {}: {}-{} ({} chars)", i, start, end, end - start);
        start = end;
    }
    chunks
}

fn closes_tag(chars: &[char], i: usize) -> bool {
    chars[i] == '>' && chars.get(i + 1).is_some_and(|c| *c == '<' || c.is_whitespace())
}

/// Moves `target` to just after a nearby `>` when one is within reach.
fn snap_to_tag_boundary(chars: &[char], target: usize) -> usize {
    let len = chars.len();
    if target >= len {
        return len;
    }
    let lo = target.saturating_sub(SNAP_WINDOW);
    let hi = (target + SNAP_WINDOW).min(len);

    if let Some(i) = (lo..=target).rev().find(|&i| closes_tag(chars, i)) {
        return i + 1;
    }
    if let Some(i) = (target..hi).find(|&i| closes_tag(chars, i)) {
        return i + 1;
    }

    let back = (lo..=target).rev().find(|&i| chars[i] == '>');
    let ahead = (target..hi).find(|&i| chars[i] == '>');
    match (back, ahead) {
        (Some(b), Some(a)) if a - target < target - b => a + 1,
        (Some(b), _) => b + 1,
        (None, Some(a)) => a + 1,
        (None, None) => target,
    }
}

/// Overlapping fixed-size windows, each trimmed back to its last complete
/// tag when that tag closes well before the window end.
pub fn sliding_chunks(page_source: &str, chunk_size: usize, overlap: usize, max_chunks: usize) -> Vec<Chunk> {
    let chars: Vec<char> = page_source.chars().collect();
    let total = chars.len();
    let chunk_size = chunk_size.max(1);
    if total <= chunk_size {
        return vec![Chunk::new(page_source, 0)];
    }
    let step = chunk_size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < total && chunks.len() < max_chunks.max(1) {
        let end = (start + chunk_size).min(total);
        let window = &chars[start..end];
        let keep = match window.iter().rposition(|c| *c == '>') {
            Some(pos) if pos > 0 && pos + TRIM_SLACK < window.len() => pos + 1,
            _ => window.len(),
        };
        chunks.push(Chunk::new(window[..keep].iter().collect::<String>(), chunks.len()));
        if end == total {
            break;
        }
        start += step;
    }
    chunks
}

/// Cuts `page_source` down to at most `max_len` chars, marker included.
///
/// Prefers to stop right after a `>` close to the budget. Non-empty input
/// always yields non-empty output when `max_len >= 1`.
pub fn truncate_at_tag_boundary(page_source: &str, max_len: usize) -> String {
    let total = page_source.chars().count();
    if total <= max_len {
        return page_source.to_string();
    }
    let marker_len = TRUNCATION_MARKER.chars().count();
    if max_len <= marker_len {
        return page_source.chars().take(max_len.max(1)).collect();
    }

    let budget = max_len - marker_len;
    let head: Vec<char> = page_source.chars().take(budget).collect();
    let cut = match head.iter().rposition(|c| *c == '>') {
        Some(pos) if pos + TRUNCATE_SLACK > budget => pos + 1,
        _ => budget,
    };
    let mut out: String = head[..cut].iter().collect();
    out.push_str(TRUNCATION_MARKER);
    out
}
