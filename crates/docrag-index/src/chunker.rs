//! Token-aware text chunking.
//!
//! Text is normalized, cut into units at blank-line boundaries, and the units
//! are packed greedily into overlapping chunks bounded by a token target.
//! Offsets in [`TextChunk`] are character offsets into the normalized text.

use docrag_memory::estimate_tokens;
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

const FENCE: &str = "```";

/// Size bounds for [`chunk_text`], measured with [`estimate_tokens`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkOptions {
    pub target_tokens: usize,
    pub overlap_tokens: usize,
    pub min_chunk_tokens: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            target_tokens: 600,
            overlap_tokens: 80,
            min_chunk_tokens: 200,
        }
    }
}

impl ChunkOptions {
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidOptions`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.target_tokens == 0 {
            return Err(IndexError::InvalidOptions {
                field: "target_tokens",
                reason: "must be greater than zero",
            });
        }
        if self.min_chunk_tokens > self.target_tokens {
            return Err(IndexError::InvalidOptions {
                field: "min_chunk_tokens",
                reason: "must not exceed target_tokens",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub start_char: usize,
    pub end_char: usize,
    pub token_estimate: usize,
    pub chunk_index: usize,
}

/// Chunker bound to validated options.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    options: ChunkOptions,
}

impl TextChunker {
    /// # Errors
    ///
    /// Returns an error if `options` fail [`ChunkOptions::validate`].
    pub fn new(options: ChunkOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    #[must_use]
    pub fn options(&self) -> &ChunkOptions {
        &self.options
    }

    #[must_use]
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        chunk_text(text, &self.options)
    }
}

/// Unify line endings, cap blank-line runs at two outside fenced code blocks,
/// and trim the whole text.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<&str> = Vec::new();
    let mut in_fence = false;
    let mut blank_run = 0usize;

    for line in unified.split('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with(FENCE) {
            in_fence = !in_fence;
            blank_run = 0;
            lines.push(line);
            continue;
        }
        if !in_fence && trimmed.is_empty() {
            blank_run += 1;
            if blank_run <= 2 {
                lines.push("");
            }
            continue;
        }
        blank_run = 0;
        lines.push(line);
    }

    lines.join("\n").trim().to_owned()
}

/// Split `text` into overlapping chunks. Empty or whitespace-only input yields no chunks.
#[must_use]
pub fn chunk_text(text: &str, options: &ChunkOptions) -> Vec<TextChunk> {
    let normalized = normalize_text(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let units = build_units(&normalized, options.target_tokens);
    let mut chunks = Vec::new();
    let mut start_unit = 0usize;

    while start_unit < units.len() {
        // A chunk never starts on a whitespace-only unit.
        if units[start_unit].tokens == 0 {
            start_unit += 1;
            continue;
        }
        let mut end_unit = start_unit;
        let mut current = 0usize;

        while end_unit < units.len() {
            let next = current + units[end_unit].tokens;
            if current >= options.min_chunk_tokens && next > options.target_tokens {
                break;
            }
            current = next;
            end_unit += 1;
        }
        if end_unit == start_unit {
            end_unit += 1;
        }

        let first = units[start_unit];
        let last = units[end_unit - 1];
        let slice = &normalized[first.start..last.end];
        chunks.push(TextChunk {
            text: slice.to_owned(),
            start_char: first.char_start,
            end_char: last.char_end,
            token_estimate: estimate_tokens(slice),
            chunk_index: chunks.len(),
        });

        if end_unit >= units.len() {
            break;
        }

        let mut next_start = end_unit;
        let mut overlap = 0usize;
        while next_start > start_unit && overlap < options.overlap_tokens {
            next_start -= 1;
            overlap += units[next_start].tokens;
        }
        // Always advance past the current start unit.
        if next_start <= start_unit {
            next_start = start_unit + 1;
        }
        start_unit = next_start;
    }

    chunks
}

/// Contiguous span of the normalized text. Byte offsets slice the text;
/// char offsets are reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TextUnit {
    start: usize,
    end: usize,
    char_start: usize,
    char_end: usize,
    tokens: usize,
}

fn build_units(text: &str, target_tokens: usize) -> Vec<TextUnit> {
    let mut units = Vec::new();
    let mut char_pos = 0usize;

    for (start, end) in paragraph_spans(text) {
        let slice = &text[start..end];
        let chars = slice.chars().count();
        let tokens = estimate_tokens(slice);

        if slice.trim().is_empty() || tokens <= target_tokens {
            units.push(TextUnit {
                start,
                end,
                char_start: char_pos,
                char_end: char_pos + chars,
                tokens,
            });
        } else {
            split_long_unit(text, start, end, char_pos, target_tokens, &mut units);
        }
        char_pos += chars;
    }

    units
}

/// Byte spans alternating between content and runs of two or more newlines.
/// Concatenating the spans reproduces `text`.
fn paragraph_spans(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut last = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] != b'\n' {
            i += 1;
            continue;
        }
        let run_start = i;
        while i < bytes.len() && bytes[i] == b'\n' {
            i += 1;
        }
        if i - run_start >= 2 {
            if run_start > last {
                spans.push((last, run_start));
            }
            spans.push((run_start, i));
            last = i;
        }
    }
    if last < bytes.len() {
        spans.push((last, bytes.len()));
    }

    spans
}

fn split_long_unit(
    text: &str,
    start: usize,
    end: usize,
    char_start: usize,
    target_tokens: usize,
    out: &mut Vec<TextUnit>,
) {
    let slice = &text[start..end];
    let mut buf_start = 0usize;
    let mut buf_end = 0usize;
    let mut buf_char_start = char_start;
    let mut buf_chars = 0usize;

    let mut flush = |from: usize, to: usize, char_from: usize, chars: usize| {
        out.push(TextUnit {
            start: start + from,
            end: start + to,
            char_start: char_from,
            char_end: char_from + chars,
            tokens: estimate_tokens(&slice[from..to]),
        });
    };

    for line in slice.split_inclusive('\n') {
        let candidate = &slice[buf_start..buf_end + line.len()];
        if buf_end > buf_start && estimate_tokens(candidate) > target_tokens {
            flush(buf_start, buf_end, buf_char_start, buf_chars);
            buf_start = buf_end;
            buf_char_start += buf_chars;
            buf_chars = 0;
        }
        buf_end += line.len();
        buf_chars += line.chars().count();
    }
    if buf_end > buf_start {
        flush(buf_start, buf_end, buf_char_start, buf_chars);
    }
}
