//! Normalized page text with a fragment offset map
//!
//! A [`PageText`] concatenates a page's fragments in reading order. Every
//! byte of the concatenated string belongs to exactly one fragment slot and
//! the slot ranges tile the string without gaps or overlaps. When two
//! fragments are visually separated (new line, gap, or a jump back left) and
//! neither carries whitespace at the seam, a single space is appended to the
//! earlier fragment's slot so that word-boundary patterns behave; that space
//! is not part of the fragment's content and never contributes area.

use crate::report::PipelineWarning;
use crate::types::{BBox, PageLayout, Span, TextFragment};
use std::ops::Range;
use tracing::warn;

/// Horizontal gap, in average glyph widths, above which fragments are treated as separate words
const WORD_GAP_GLYPHS: f64 = 0.5;

/// One fragment's place inside the page text
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSlot {
    /// Index into [`PageText::fragments`]
    pub fragment: usize,

    /// Byte range owned by this fragment, including any trailing separator
    pub range: Range<usize>,

    /// End of the fragment's own content (excludes the separator)
    pub content_end: usize,

    /// Number of characters of content
    pub char_count: usize,

    /// Degenerate bounding box: text is searchable but cannot be placed
    pub malformed: bool,
}

impl FragmentSlot {
    pub fn content_range(&self) -> Range<usize> {
        self.range.start..self.content_end
    }
}

/// Normalized concatenation of a page's fragments
#[derive(Debug, Clone)]
pub struct PageText {
    page: u32,
    text: String,
    fragments: Vec<TextFragment>,
    slots: Vec<FragmentSlot>,
}

impl PageText {
    /// Build the page text for one page layout.
    ///
    /// Returns the warnings raised for malformed fragments alongside the text.
    pub fn build(layout: &PageLayout) -> (Self, Vec<PipelineWarning>) {
        let mut fragments: Vec<TextFragment> = layout
            .fragments
            .iter()
            .filter(|f| !f.content.is_empty())
            .cloned()
            .collect();
        fragments.sort_by(|a, b| {
            a.order_index
                .cmp(&b.order_index)
                .then(a.bbox.y0.total_cmp(&b.bbox.y0))
                .then(a.bbox.x0.total_cmp(&b.bbox.x0))
        });

        let mut warnings = Vec::new();
        for fragment in fragments.iter().filter(|f| f.bbox.is_degenerate()) {
            warn!(
                page = layout.page,
                order_index = fragment.order_index,
                "Skipping fragment with degenerate bounding box for location"
            );
            warnings.push(PipelineWarning::MalformedFragment {
                page: layout.page,
                order_index: fragment.order_index,
                reason: format!(
                    "degenerate bbox ({}, {}, {}, {})",
                    fragment.bbox.x0, fragment.bbox.y0, fragment.bbox.x1, fragment.bbox.y1
                ),
            });
        }

        (Self::assemble(layout.page, fragments), warnings)
    }

    /// The same fragments rearranged in visual order: lines top to bottom,
    /// left to right within a line.
    ///
    /// Returns `None` when the extraction order already is the visual order.
    pub fn visual_order(&self) -> Option<PageText> {
        let mut by_top: Vec<usize> = (0..self.fragments.len()).collect();
        by_top.sort_by(|&a, &b| {
            self.fragments[a]
                .bbox
                .y0
                .total_cmp(&self.fragments[b].bbox.y0)
                .then(a.cmp(&b))
        });

        // Each line is keyed by the box of its topmost fragment
        let mut lines: Vec<(BBox, Vec<usize>)> = Vec::new();
        for idx in by_top {
            let bbox = self.fragments[idx].bbox;
            match lines.iter_mut().find(|(first, _)| first.same_line(&bbox)) {
                Some((_, members)) => members.push(idx),
                None => lines.push((bbox, vec![idx])),
            }
        }

        let order: Vec<usize> = lines
            .into_iter()
            .flat_map(|(_, mut members)| {
                members.sort_by(|&a, &b| {
                    self.fragments[a]
                        .bbox
                        .x0
                        .total_cmp(&self.fragments[b].bbox.x0)
                        .then(a.cmp(&b))
                });
                members
            })
            .collect();

        if order.iter().enumerate().all(|(pos, &idx)| pos == idx) {
            return None;
        }

        let fragments = order.into_iter().map(|idx| self.fragments[idx].clone()).collect();
        Some(Self::assemble(self.page, fragments))
    }

    /// Concatenate fragments in the given order
    fn assemble(page: u32, fragments: Vec<TextFragment>) -> Self {
        let mut text = String::new();
        let mut slots: Vec<FragmentSlot> = Vec::with_capacity(fragments.len());

        for (idx, fragment) in fragments.iter().enumerate() {
            let content: String = fragment
                .content
                .chars()
                .map(|c| if c.is_whitespace() || c.is_control() { ' ' } else { c })
                .collect();

            if let Some(prev) = slots.last_mut() {
                let prev_fragment = &fragments[prev.fragment];
                let seam_has_space = text.ends_with(' ') || content.starts_with(' ');
                if !seam_has_space && needs_separator(prev_fragment, prev.char_count, fragment) {
                    text.push(' ');
                    prev.range.end += 1;
                }
            }

            let start = text.len();
            text.push_str(&content);
            slots.push(FragmentSlot {
                fragment: idx,
                range: start..text.len(),
                content_end: text.len(),
                char_count: content.chars().count(),
                malformed: fragment.bbox.is_degenerate(),
            });
        }

        Self {
            page,
            text,
            fragments,
            slots,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Fragments in reading order
    pub fn fragments(&self) -> &[TextFragment] {
        &self.fragments
    }

    pub fn slots(&self) -> &[FragmentSlot] {
        &self.slots
    }

    pub fn fragment_of(&self, slot: &FragmentSlot) -> &TextFragment {
        &self.fragments[slot.fragment]
    }

    /// Whether the page has no visible text
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Indices of the slots whose content intersects `span`
    pub fn slots_in(&self, span: Span) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| span.intersects(slot.range.start, slot.content_end))
            .map(|(i, _)| i)
            .collect()
    }

    /// Fraction `[from, to)` of a slot's content covered by the byte range `[start, end)`.
    ///
    /// Fractions are measured in characters so that multi-byte glyphs count once.
    pub fn covered_fraction(&self, slot_idx: usize, start: usize, end: usize) -> Option<(f64, f64)> {
        let slot = self.slots.get(slot_idx)?;
        let lo = start.max(slot.range.start);
        let hi = end.min(slot.content_end);
        if lo >= hi || slot.char_count == 0 {
            return None;
        }
        let chars_before = self.text.get(slot.range.start..lo)?.chars().count();
        let chars_covered = self.text.get(lo..hi)?.chars().count();
        let total = slot.char_count as f64;
        Some((
            chars_before as f64 / total,
            (chars_before + chars_covered) as f64 / total,
        ))
    }

    /// Sub-box of a slot's fragment covering the byte range `[start, end)`
    pub fn sub_bbox(&self, slot_idx: usize, start: usize, end: usize) -> Option<BBox> {
        let slot = self.slots.get(slot_idx)?;
        if slot.malformed {
            return None;
        }
        let (from, to) = self.covered_fraction(slot_idx, start, end)?;
        Some(self.fragments[slot.fragment].bbox.slice(from, to))
    }
}

/// Whether a space must be inserted between two consecutive fragments
fn needs_separator(prev: &TextFragment, prev_chars: usize, next: &TextFragment) -> bool {
    if prev.bbox.is_degenerate() || next.bbox.is_degenerate() {
        return true;
    }
    if !prev.bbox.same_line(&next.bbox) {
        return true;
    }
    if !(prev.bbox.is_horizontal() && next.bbox.is_horizontal()) {
        return false;
    }
    // Extraction jumped back to the left on the same line
    if next.bbox.x0 < prev.bbox.x0 {
        return true;
    }
    let glyph_width = prev.bbox.width() / prev_chars.max(1) as f64;
    prev.bbox.horizontal_gap(&next.bbox) > glyph_width * WORD_GAP_GLYPHS
}
