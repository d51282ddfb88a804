//! Search normalization with a map back to page-text byte offsets

use piiscrub_core::PiiType;

/// Characters dropped entirely from structured identifiers
const STRUCTURED_SEPARATORS: &[char] = &['-', '.', '/', '(', ')'];

/// Normalization flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Lowercase, whitespace runs collapsed to one space
    Plain,
    /// Lowercase, whitespace and separators removed
    Structured,
}

impl Mode {
    pub fn for_type(pii_type: PiiType) -> Self {
        if pii_type.is_structured() {
            Self::Structured
        } else {
            Self::Plain
        }
    }
}

/// Normalized characters, each with the byte offset of the source character it came from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormText {
    pub chars: Vec<char>,
    pub origins: Vec<usize>,
}

impl NormText {
    pub fn new(text: &str, mode: Mode) -> Self {
        let mut chars = Vec::with_capacity(text.len());
        let mut origins = Vec::with_capacity(text.len());
        let mut pending_space: Option<usize> = None;

        for (offset, c) in text.char_indices() {
            if c.is_whitespace() {
                if mode == Mode::Plain && pending_space.is_none() && !chars.is_empty() {
                    pending_space = Some(offset);
                }
                continue;
            }
            if mode == Mode::Structured && STRUCTURED_SEPARATORS.contains(&c) {
                continue;
            }
            if let Some(space_at) = pending_space.take() {
                chars.push(' ');
                origins.push(space_at);
            }
            for lower in c.to_lowercase() {
                chars.push(lower);
                origins.push(offset);
            }
        }

        Self { chars, origins }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// First normalized index whose source offset is at or after `byte`
    pub fn index_at(&self, byte: usize) -> usize {
        self.origins.partition_point(|&o| o < byte)
    }

    /// Byte range in the source text covered by normalized chars `[start, end)`
    pub fn source_range(&self, source: &str, start: usize, end: usize) -> Option<(usize, usize)> {
        if start >= end || end > self.origins.len() {
            return None;
        }
        let first = self.origins[start];
        let last = self.origins[end - 1];
        let last_len = source.get(last..)?.chars().next()?.len_utf8();
        Some((first, last + last_len))
    }

    pub fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }
}

/// Normalize free text for comparison
pub fn normalize(text: &str, mode: Mode) -> String {
    NormText::new(text, mode).chars.into_iter().collect()
}
