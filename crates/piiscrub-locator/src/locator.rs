//! Fragment locator: maps entity text back onto fragment bounding boxes
//!
//! Entities with a usable span hint are resolved through the page-text
//! offset map. Everything else goes through sliding-window reconstruction:
//! a window starting at each fragment and growing one fragment at a time is
//! compared against the entity with a semi-global edit distance, so the
//! entity may sit anywhere inside the window. When the extraction order
//! disagrees with the visual order the search is repeated over the page
//! rearranged line by line. Remaining misses fall back to separator parts,
//! same-line word proximity and, for short numbers, digit groups. Entities
//! that cannot be placed are reported, never dropped silently.

use crate::config::LocatorConfig;
use crate::normalize::{Mode, NormText};
use crate::region_set::merge_regions;
use piiscrub_core::{BBox, Entity, PageText, PiiType, Region, Span, UnlocatedEntity};
use std::cmp::Ordering;
use std::ops::Range;
use tracing::debug;

const INF: usize = usize::MAX / 2;

/// Separators for the part fallback
const PART_SEPARATORS: &[char] = &[',', ';', '\n', '.', '-', ':', '/'];

/// Entities longer than this never fall back to digit groups
const MAX_DIGIT_GROUP_TEXT: usize = 16;

const MIN_DIGIT_GROUP: usize = 3;

/// How an entity was placed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateMethod {
    /// Span hint resolved through the offset map
    Direct,
    /// Sliding-window search over the page
    Search,
    /// Sliding-window search over the page in visual order
    VisualOrder,
    /// Separator-delimited parts searched independently
    Parts,
    /// Two or more words found on the same visual line
    WordProximity,
    /// Digit groups of a short number searched independently
    DigitGroups,
}

/// Result of locating one entity
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Located {
        regions: Vec<Region>,
        method: LocateMethod,
        /// Parts of a split entity that were not found
        missing_parts: Vec<String>,
    },
    Unlocated {
        reason: String,
    },
}

/// Everything the locator produced for one page
#[derive(Debug, Clone, Default)]
pub struct PageLocation {
    pub page: u32,
    /// Merged, non-overlapping regions
    pub regions: Vec<Region>,
    /// Entities that produced at least one region
    pub located: Vec<Entity>,
    pub unlocated: Vec<UnlocatedEntity>,
}

/// Normalized views of one page, built once and reused for every entity
pub struct PageIndex<'a> {
    page_text: &'a PageText,
    views: Views,
    /// The page rearranged in visual order, when that differs from reading order
    visual: Option<(PageText, Views)>,
}

struct Views {
    plain: NormView,
    structured: NormView,
}

impl Views {
    fn new(page_text: &PageText) -> Self {
        Self {
            plain: NormView::new(page_text, Mode::Plain),
            structured: NormView::new(page_text, Mode::Structured),
        }
    }

    fn get(&self, mode: Mode) -> &NormView {
        match mode {
            Mode::Plain => &self.plain,
            Mode::Structured => &self.structured,
        }
    }
}

struct NormView {
    norm: NormText,
    /// Normalized index at which each slot starts
    slot_starts: Vec<usize>,
}

impl NormView {
    fn new(page_text: &PageText, mode: Mode) -> Self {
        let norm = NormText::new(page_text.text(), mode);
        let slot_starts = page_text
            .slots()
            .iter()
            .map(|slot| norm.index_at(slot.range.start))
            .collect();
        Self { norm, slot_starts }
    }

    fn slot_end(&self, slot: usize) -> usize {
        self.slot_starts
            .get(slot + 1)
            .copied()
            .unwrap_or(self.norm.len())
    }
}

impl<'a> PageIndex<'a> {
    pub fn new(page_text: &'a PageText) -> Self {
        let visual = page_text.visual_order().map(|visual| {
            let views = Views::new(&visual);
            (visual, views)
        });
        Self {
            page_text,
            views: Views::new(page_text),
            visual,
        }
    }

    pub fn page_text(&self) -> &PageText {
        self.page_text
    }

    /// Whether the visual order differs from the reading order
    pub fn has_visual_order(&self) -> bool {
        self.visual.is_some()
    }
}

/// An accepted approximate occurrence, in normalized indices
#[derive(Debug, Clone)]
struct Occurrence {
    start: usize,
    end: usize,
    cost: usize,
    similarity: f64,
}

/// Locates entities on a page
#[derive(Debug, Clone, Default)]
pub struct FragmentLocator {
    config: LocatorConfig,
}

impl FragmentLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Locate every entity on one page and merge the resulting regions
    pub fn locate_page(&self, page_text: &PageText, entities: &[Entity]) -> PageLocation {
        let index = PageIndex::new(page_text);
        let mut location = PageLocation {
            page: page_text.page(),
            ..PageLocation::default()
        };
        let mut regions = Vec::new();

        for entity in entities {
            match self.locate(&index, entity) {
                Location::Located {
                    regions: found,
                    method,
                    missing_parts,
                } => {
                    debug!(
                        page = entity.page,
                        entity_type = %entity.pii_type,
                        ?method,
                        regions = found.len(),
                        "Entity located"
                    );
                    for part in missing_parts {
                        location.unlocated.push(UnlocatedEntity {
                            page: entity.page,
                            entity_type: entity.pii_type,
                            text: part,
                            reason: "part of a split entity not found on page".to_string(),
                        });
                    }
                    regions.extend(found);
                    location.located.push(entity.clone());
                }
                Location::Unlocated { reason } => {
                    debug!(
                        page = entity.page,
                        entity_type = %entity.pii_type,
                        text = %entity.text,
                        %reason,
                        "Entity could not be located"
                    );
                    location.unlocated.push(UnlocatedEntity {
                        page: entity.page,
                        entity_type: entity.pii_type,
                        text: entity.text.clone(),
                        reason,
                    });
                }
            }
        }

        location.regions = merge_regions(regions, self.config.merge_tolerance);
        location
    }

    /// Locate a single entity
    pub fn locate(&self, index: &PageIndex<'_>, entity: &Entity) -> Location {
        let mode = Mode::for_type(entity.pii_type);
        let target = NormText::new(&entity.text, mode);
        if target.is_empty() {
            return Location::Unlocated {
                reason: "entity text is empty after normalization".to_string(),
            };
        }

        if let Some(span) = entity.span_hint {
            if self.hint_matches(index.page_text(), span, &target, mode) {
                let regions = self.direct_regions(index.page_text(), span, entity.pii_type);
                if !regions.is_empty() {
                    return Location::Located {
                        regions,
                        method: LocateMethod::Direct,
                        missing_parts: Vec::new(),
                    };
                }
            } else {
                debug!(page = entity.page, ?span, "Stale span hint, falling back to search");
            }
        }

        let regions = self.regions_in(index.page_text, &index.views, &entity.text, entity.pii_type);
        if !regions.is_empty() {
            return Location::Located {
                regions,
                method: LocateMethod::Search,
                missing_parts: Vec::new(),
            };
        }

        if let Some((visual, views)) = &index.visual {
            let regions = self.regions_in(visual, views, &entity.text, entity.pii_type);
            if !regions.is_empty() {
                return Location::Located {
                    regions,
                    method: LocateMethod::VisualOrder,
                    missing_parts: Vec::new(),
                };
            }
        }

        let parts = self.split_parts(&entity.text);
        if parts.len() > 1 {
            if let Some(location) = self.locate_pieces(index, parts, entity.pii_type, LocateMethod::Parts) {
                return location;
            }
        }

        let regions = self.proximity_regions(index.page_text, &entity.text, entity.pii_type);
        if !regions.is_empty() {
            return Location::Located {
                regions,
                method: LocateMethod::WordProximity,
                missing_parts: Vec::new(),
            };
        }

        let groups = digit_groups(&entity.text);
        if !groups.is_empty() {
            if let Some(location) = self.locate_pieces(index, groups, entity.pii_type, LocateMethod::DigitGroups) {
                return location;
            }
        }

        Location::Unlocated {
            reason: format!(
                "no window within edit threshold ({} of {} chars)",
                self.config.allowed_edits(entity.pii_type, target.len()),
                target.len()
            ),
        }
    }

    /// Regions for every occurrence of `text` on the page; empty when nothing matches.
    ///
    /// The visual order is searched only when the reading order yields nothing.
    pub fn search_regions(&self, index: &PageIndex<'_>, text: &str, pii_type: PiiType) -> Vec<Region> {
        let regions = self.regions_in(index.page_text, &index.views, text, pii_type);
        match &index.visual {
            Some((visual, views)) if regions.is_empty() => self.regions_in(visual, views, text, pii_type),
            _ => regions,
        }
    }

    /// Page-text spans of all non-overlapping approximate occurrences of `text`, in reading order
    pub fn search(&self, index: &PageIndex<'_>, text: &str, pii_type: PiiType) -> Vec<Span> {
        self.search_in(index.page_text, &index.views, text, pii_type)
    }

    fn regions_in(&self, page_text: &PageText, views: &Views, text: &str, pii_type: PiiType) -> Vec<Region> {
        self.search_in(page_text, views, text, pii_type)
            .into_iter()
            .flat_map(|span| self.direct_regions(page_text, span, pii_type))
            .collect()
    }

    fn search_in(&self, page_text: &PageText, views: &Views, text: &str, pii_type: PiiType) -> Vec<Span> {
        let mode = Mode::for_type(pii_type);
        let target = NormText::new(text, mode);
        if target.is_empty() {
            return Vec::new();
        }
        let view = views.get(mode);
        let page = page_text.text();
        let allowed = self.config.allowed_edits(pii_type, target.len());
        let target_str: String = target.chars.iter().collect();

        let mut occurrences: Vec<Occurrence> = Vec::new();
        for slot in 0..view.slot_starts.len() {
            let window_start = view.slot_starts[slot];
            let first_len = view.slot_end(slot) - window_start;
            if first_len == 0 {
                continue;
            }
            let needed = first_len + target.len() + self.config.window_slack;
            let window_end = view.slot_starts[slot + 1..]
                .iter()
                .copied()
                .find(|&s| s - window_start >= needed)
                .unwrap_or(view.norm.len());

            let window = &view.norm.chars[window_start..window_end];
            for (start, end, distance) in semi_global(&target.chars, window, first_len) {
                if distance > allowed {
                    continue;
                }
                let (abs_start, abs_end) = (window_start + start, window_start + end);
                let Some((byte_start, byte_end)) = view.norm.source_range(page, abs_start, abs_end)
                else {
                    continue;
                };
                let cost = distance + boundary_penalty(page, byte_start, byte_end);
                if cost > allowed {
                    continue;
                }
                occurrences.push(Occurrence {
                    start: abs_start,
                    end: abs_end,
                    cost,
                    similarity: strsim::normalized_levenshtein(
                        &target_str,
                        &view.norm.slice(abs_start, abs_end),
                    ),
                });
            }
        }

        occurrences.sort_by(|a, b| {
            a.cost
                .cmp(&b.cost)
                .then(b.similarity.partial_cmp(&a.similarity).unwrap_or(Ordering::Equal))
                .then(a.start.cmp(&b.start))
                .then(a.end.cmp(&b.end))
        });

        let mut chosen: Vec<&Occurrence> = Vec::new();
        for occurrence in &occurrences {
            if chosen
                .iter()
                .all(|c| occurrence.end <= c.start || c.end <= occurrence.start)
            {
                chosen.push(occurrence);
            }
        }
        chosen.sort_by_key(|o| o.start);

        chosen
            .into_iter()
            .filter_map(|o| view.norm.source_range(page, o.start, o.end))
            .map(|(start, end)| Span::new(start, end))
            .collect()
    }

    /// Direct path: sub-boxes of every fragment the span covers, one region per visual run.
    ///
    /// Runs break where covered fragments are not adjacent in reading order
    /// or where the text changes line.
    pub fn direct_regions(&self, page_text: &PageText, span: Span, pii_type: PiiType) -> Vec<Region> {
        let mut pieces: Vec<(usize, BBox)> = Vec::new();
        for slot_idx in page_text.slots_in(span) {
            let (start, end) = widen_to_whitespace(page_text, slot_idx, span);
            if let Some(bbox) = page_text.sub_bbox(slot_idx, start, end) {
                pieces.push((slot_idx, bbox));
            }
        }

        let mut regions: Vec<Region> = Vec::new();
        let mut previous: Option<(usize, BBox)> = None;
        for (slot_idx, bbox) in pieces {
            let continues_run = match previous {
                Some((prev_idx, prev_bbox)) => slot_idx == prev_idx + 1 && prev_bbox.same_line(&bbox),
                None => false,
            };
            match regions.last_mut() {
                Some(last) if continues_run => last.bbox = last.bbox.union(&bbox),
                _ => regions.push(Region::new(page_text.page(), bbox, pii_type)),
            }
            previous = Some((slot_idx, bbox));
        }
        regions
    }

    /// Whether the page text under `span` still reads as the entity
    fn hint_matches(&self, page_text: &PageText, span: Span, target: &NormText, mode: Mode) -> bool {
        page_text
            .text()
            .get(span.start..span.end)
            .map_or(false, |covered| NormText::new(covered, mode).chars == target.chars)
    }

    fn split_parts(&self, text: &str) -> Vec<String> {
        text.split(PART_SEPARATORS)
            .map(str::trim)
            .filter(|part| part.chars().count() >= self.config.min_part_chars)
            .map(str::to_string)
            .collect()
    }

    /// Search each piece independently; `None` when no piece is found
    fn locate_pieces(
        &self,
        index: &PageIndex<'_>,
        pieces: Vec<String>,
        pii_type: PiiType,
        method: LocateMethod,
    ) -> Option<Location> {
        let mut regions = Vec::new();
        let mut missing = Vec::new();
        for piece in pieces {
            let found = self.search_regions(index, &piece, pii_type);
            if found.is_empty() {
                missing.push(piece);
            } else {
                regions.extend(found);
            }
        }
        if regions.is_empty() {
            return None;
        }
        Some(Location::Located {
            regions,
            method,
            missing_parts: missing,
        })
    }

    /// One region per visual line holding at least two of the entity's words
    ///
    /// Only words longer than two characters count. The region spans every
    /// occurrence of those words on the line.
    fn proximity_regions(&self, page_text: &PageText, text: &str, pii_type: PiiType) -> Vec<Region> {
        let mut words: Vec<String> = text
            .split_whitespace()
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|word| word.chars().count() > 2)
            .collect();
        words.sort();
        words.dedup();
        if words.len() < 2 {
            return Vec::new();
        }

        let mut lines: Vec<(BBox, Vec<usize>)> = Vec::new();
        for (slot_idx, slot) in page_text.slots().iter().enumerate() {
            if slot.malformed {
                continue;
            }
            let bbox = page_text.fragment_of(slot).bbox;
            match lines.iter_mut().find(|(first, _)| first.same_line(&bbox)) {
                Some((_, members)) => members.push(slot_idx),
                None => lines.push((bbox, vec![slot_idx])),
            }
        }

        let mut regions = Vec::new();
        for (_, members) in &lines {
            let mut matched_words = 0;
            let mut covered: Option<BBox> = None;
            for word in &words {
                let mut hit = false;
                for &slot_idx in members {
                    let content = page_text.slots()[slot_idx].content_range();
                    for (start, end) in find_word(page_text.text(), content, word) {
                        if let Some(bbox) = page_text.sub_bbox(slot_idx, start, end) {
                            covered = Some(covered.map_or(bbox, |c| c.union(&bbox)));
                            hit = true;
                        }
                    }
                }
                matched_words += usize::from(hit);
            }
            if matched_words >= 2 {
                if let Some(bbox) = covered {
                    regions.push(Region::new(page_text.page(), bbox, pii_type));
                }
            }
        }
        regions
    }
}

/// Runs of at least three digits in a short, number-like entity
fn digit_groups(text: &str) -> Vec<String> {
    if text.chars().count() > MAX_DIGIT_GROUP_TEXT {
        return Vec::new();
    }
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|group| group.len() >= MIN_DIGIT_GROUP)
        .map(str::to_string)
        .collect()
}

/// Whole-word, case-insensitive occurrences of a lowercase `word` inside `range` of `text`
fn find_word(text: &str, range: Range<usize>, word: &str) -> Vec<(usize, usize)> {
    let Some(haystack) = text.get(range.clone()) else {
        return Vec::new();
    };
    let mut found = Vec::new();
    for (offset, _) in haystack.char_indices() {
        let mut rest = haystack[offset..].chars();
        let mut len = 0;
        let matches = word.chars().all(|w| match rest.next() {
            Some(c) => {
                len += c.len_utf8();
                c.to_lowercase().eq(w.to_lowercase())
            }
            None => false,
        });
        if matches {
            let start = range.start + offset;
            let end = start + len;
            if boundary_penalty(text, start, end) == 0 {
                found.push((start, end));
            }
        }
    }
    found
}

/// Extend the covered range over whitespace-only leftovers inside the slot,
/// so that a fragment whose only uncovered text is padding is covered whole.
fn widen_to_whitespace(page_text: &PageText, slot_idx: usize, span: Span) -> (usize, usize) {
    let text = page_text.text();
    let Some(slot) = page_text.slots().get(slot_idx) else {
        return (span.start, span.end);
    };
    let content = slot.content_range();
    let mut start = span.start.max(content.start);
    let mut end = span.end.min(content.end);
    if text
        .get(content.start..start)
        .map_or(false, |s| s.trim().is_empty())
    {
        start = content.start;
    }
    if text
        .get(end..content.end)
        .map_or(false, |s| s.trim().is_empty())
    {
        end = content.end;
    }
    (start, end)
}

/// 1 when the match starts or ends inside an alphanumeric run
fn boundary_penalty(text: &str, start: usize, end: usize) -> usize {
    let is_word = |c: Option<char>| c.map_or(false, char::is_alphanumeric);
    let cuts_start = is_word(text[..start].chars().next_back()) && is_word(text[start..].chars().next());
    let cuts_end = is_word(text[..end].chars().next_back()) && is_word(text[end..].chars().next());
    usize::from(cuts_start || cuts_end)
}

/// Approximate substring matching (Sellers' algorithm).
///
/// Returns `(start, end, distance)` for every end position in `window`,
/// where the match must begin within the first `start_limit` characters.
fn semi_global(pattern: &[char], window: &[char], start_limit: usize) -> Vec<(usize, usize, usize)> {
    let n = window.len();
    // (distance, start) per column
    let mut prev: Vec<(usize, usize)> = (0..=n)
        .map(|j| if j < start_limit { (0, j) } else { (INF, j) })
        .collect();
    let mut cur = vec![(INF, 0); n + 1];

    for &p in pattern {
        cur[0] = (prev[0].0.saturating_add(1).min(INF), prev[0].1);
        for j in 1..=n {
            let substitution = if window[j - 1] == p { 0 } else { 1 };
            let diagonal = (prev[j - 1].0.saturating_add(substitution), prev[j - 1].1);
            let skip_pattern = (prev[j].0.saturating_add(1), prev[j].1);
            let skip_text = (cur[j - 1].0.saturating_add(1), cur[j - 1].1);

            let mut best = diagonal;
            for candidate in [skip_pattern, skip_text] {
                if candidate.0 < best.0 || (candidate.0 == best.0 && candidate.1 > best.1) {
                    best = candidate;
                }
            }
            cur[j] = (best.0.min(INF), best.1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    (1..=n)
        .filter(|&j| prev[j].0 < INF && prev[j].1 < j)
        .map(|j| (prev[j].1, j, prev[j].0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use piiscrub_core::{PageLayout, TextFragment};

    /// Fragments laid out left to right on one line, 6pt per character
    fn line(page: u32, y: f64, pieces: &[&str]) -> Vec<TextFragment> {
        let mut x = 0.0;
        pieces
            .iter()
            .enumerate()
            .map(|(i, content)| {
                let width = content.chars().count() as f64 * 6.0;
                let fragment = TextFragment::new(*content, BBox::new(x, y, x + width, y + 12.0), page, i as u32);
                x += width;
                fragment
            })
            .collect()
    }

    fn page_text(fragments: Vec<TextFragment>) -> PageText {
        PageText::build(&PageLayout::new(1, fragments)).0
    }

    fn assert_close(actual: BBox, expected: BBox) {
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert!(
            close(actual.x0, expected.x0)
                && close(actual.y0, expected.y0)
                && close(actual.x1, expected.x1)
                && close(actual.y1, expected.y1),
            "{:?} != {:?}",
            actual,
            expected
        );
    }

    fn union_of(fragments: &[TextFragment]) -> BBox {
        fragments
            .iter()
            .skip(1)
            .fold(fragments[0].bbox, |acc, f| acc.union(&f.bbox))
    }

    #[test]
    fn test_semi_global_finds_substring() {
        let pattern: Vec<char> = "smith".chars().collect();
        let window: Vec<char> = "jane smith jr".chars().collect();
        let hits = semi_global(&pattern, &window, window.len());
        assert!(hits.contains(&(5, 10, 0)));
    }

    #[test]
    fn test_semi_global_respects_start_limit() {
        let pattern: Vec<char> = "smith".chars().collect();
        let window: Vec<char> = "jane smith".chars().collect();
        let hits = semi_global(&pattern, &window, 2);
        assert!(hits.iter().all(|&(start, _, _)| start < 2));
        assert!(hits.iter().all(|&(_, _, d)| d > 0));
    }

    #[test]
    fn test_email_split_across_adjacent_fragments() {
        let fragments = line(1, 0.0, &["john.doe", "@example.com"]);
        let expected = union_of(&fragments);
        let text = page_text(fragments);
        assert_eq!(text.text(), "john.doe@example.com");

        let locator = FragmentLocator::default();
        let entity = Entity::anchored(PiiType::Email, "john.doe@example.com", 1, Span::new(0, 20));
        let location = locator.locate_page(&text, &[entity]);
        assert_eq!(location.regions.len(), 1);
        assert_eq!(location.regions[0].bbox, expected);
        assert!(location.unlocated.is_empty());
    }

    #[test]
    fn test_discovered_name_found_by_sliding_window() {
        let fragments = line(1, 0.0, &["Contact: ", "Jane", " Smith", " for details"]);
        let expected = fragments[1].bbox.union(&fragments[2].bbox);
        let text = page_text(fragments);

        let locator = FragmentLocator::default();
        let entity = Entity::unanchored(PiiType::Name, "Jane Smith", 1);
        let location = locator.locate_page(&text, &[entity]);

        assert_eq!(location.regions.len(), 1);
        assert_eq!(location.regions[0].bbox, expected);
    }

    #[test]
    fn test_partial_fragment_uses_covered_fraction() {
        let fragments = line(1, 0.0, &["Phone: 555 123 4567 today"]);
        let text = page_text(fragments);
        let locator = FragmentLocator::default();
        let entity = Entity::anchored(PiiType::Phone, "555 123 4567", 1, Span::new(7, 19));

        let location = locator.locate_page(&text, &[entity]);
        assert_eq!(location.regions.len(), 1);
        assert_close(location.regions[0].bbox, BBox::new(42.0, 0.0, 114.0, 12.0));
    }

    #[test]
    fn test_line_wrap_yields_one_region_per_line() {
        let mut fragments = line(1, 0.0, &["Address: 221B Baker"]);
        let mut second = line(1, 14.0, &["Street, London"]);
        second[0].order_index = 1;
        fragments.extend(second);
        let text = page_text(fragments);
        assert_eq!(text.text(), "Address: 221B Baker Street, London");

        let locator = FragmentLocator::default();
        let entity = Entity::unanchored(PiiType::Address, "221B Baker Street", 1);
        let location = locator.locate_page(&text, &[entity]);

        assert_eq!(location.regions.len(), 2);
        assert_eq!(location.regions[0].bbox.y0, 0.0);
        assert_eq!(location.regions[1].bbox.y0, 14.0);
    }

    #[test]
    fn test_structured_search_ignores_separators() {
        let fragments = line(1, 0.0, &["Card: ", "4539-1488-", "0343-6467"]);
        let text = page_text(fragments);
        let locator = FragmentLocator::default();
        let entity = Entity::unanchored(PiiType::CreditCard, "4539 1488 0343 6467", 1);

        let location = locator.locate_page(&text, &[entity]);
        assert_eq!(location.regions.len(), 1);
        assert!(location.unlocated.is_empty());
    }

    #[test]
    fn test_tolerates_extraction_noise() {
        let fragments = line(1, 0.0, &["Patient: Jonathan  Smyth, ward 4"]);
        let text = page_text(fragments);
        let locator = FragmentLocator::default();
        let entity = Entity::unanchored(PiiType::Name, "Jonathan Smith", 1);

        let location = locator.locate_page(&text, &[entity]);
        assert_eq!(location.regions.len(), 1);
    }

    #[test]
    fn test_word_boundary_blocks_partial_word_match() {
        let fragments = line(1, 0.0, &["Janet and Bob"]);
        let text = page_text(fragments);
        let locator = FragmentLocator::default();
        let entity = Entity::unanchored(PiiType::Name, "Jane", 1);

        let location = locator.locate_page(&text, &[entity]);
        assert!(location.regions.is_empty());
        assert_eq!(location.unlocated.len(), 1);
    }

    #[test]
    fn test_all_occurrences_are_located() {
        let fragments = line(1, 0.0, &["Jane Smith wrote to ", "Jane Smith"]);
        let text = page_text(fragments);
        let locator = FragmentLocator::default();
        let index = PageIndex::new(&text);

        let spans = locator.search(&index, "Jane Smith", PiiType::Name);
        assert_eq!(spans, vec![Span::new(0, 10), Span::new(20, 30)]);
    }

    #[test]
    fn test_absent_entity_is_reported() {
        let fragments = line(1, 0.0, &["Nothing to see here"]);
        let text = page_text(fragments);
        let locator = FragmentLocator::default();
        let entity = Entity::unanchored(PiiType::Name, "Marie Curie", 1);

        let location = locator.locate_page(&text, &[entity]);
        assert!(location.regions.is_empty());
        assert_eq!(location.unlocated.len(), 1);
        assert_eq!(location.unlocated[0].text, "Marie Curie");
        assert!(location.located.is_empty());
    }

    #[test]
    fn test_stale_hint_falls_back_to_search() {
        let fragments = line(1, 0.0, &["Email: jane@example.com"]);
        let text = page_text(fragments);
        let locator = FragmentLocator::default();
        let entity = Entity::anchored(PiiType::Email, "jane@example.com", 1, Span::new(0, 16));

        let location = locator.locate_page(&text, &[entity]);
        assert_eq!(location.regions.len(), 1);
        assert_close(location.regions[0].bbox, BBox::new(42.0, 0.0, 138.0, 12.0));
    }

    #[test]
    fn test_part_fallback() {
        let fragments = line(1, 0.0, &["Ship to 12 Rose Lane", " then bill 75001 Paris"]);
        let text = page_text(fragments);
        let locator = FragmentLocator::default();
        let entity = Entity::unanchored(PiiType::Address, "12 Rose Lane, 75001 Paris, France", 1);

        let location = locator.locate_page(&text, &[entity]);
        assert_eq!(location.regions.len(), 2);
        assert_eq!(location.located.len(), 1);
        assert_eq!(location.unlocated.len(), 1);
        assert_eq!(location.unlocated[0].text, "France");
    }

    #[test]
    fn test_reordered_fragments_found_in_visual_order() {
        let fragments = vec![
            TextFragment::new("Name:", BBox::new(0.0, 0.0, 30.0, 10.0), 1, 0),
            TextFragment::new("Smith", BBox::new(70.0, 0.0, 100.0, 10.0), 1, 1),
            TextFragment::new("Jane", BBox::new(40.0, 0.0, 64.0, 10.0), 1, 2),
        ];
        let text = page_text(fragments);
        assert_eq!(text.text(), "Name: Smith Jane");

        let locator = FragmentLocator::default();
        let index = PageIndex::new(&text);
        assert!(index.has_visual_order());
        assert!(locator.search(&index, "Jane Smith", PiiType::Name).is_empty());

        let entity = Entity::unanchored(PiiType::Name, "Jane Smith", 1);
        match locator.locate(&index, &entity) {
            Location::Located { regions, method, .. } => {
                assert_eq!(method, LocateMethod::VisualOrder);
                assert_eq!(regions.len(), 1);
                assert_close(regions[0].bbox, BBox::new(40.0, 0.0, 100.0, 10.0));
            }
            other => panic!("expected a location, got {:?}", other),
        }

        let location = locator.locate_page(&text, &[entity]);
        assert_eq!(location.regions.len(), 1);
        assert!(location.unlocated.is_empty());
    }

    #[test]
    fn test_part_fallback_splits_on_slash() {
        let mut fragments = line(1, 0.0, &["Ship to Harbour Road today"]);
        let mut second = line(1, 14.0, &["deliver in Lisbon"]);
        second[0].order_index = 1;
        fragments.extend(second);
        let text = page_text(fragments);
        let locator = FragmentLocator::default();
        let index = PageIndex::new(&text);
        let entity = Entity::unanchored(PiiType::Address, "Harbour Road/Lisbon", 1);

        match locator.locate(&index, &entity) {
            Location::Located { regions, method, missing_parts } => {
                assert_eq!(method, LocateMethod::Parts);
                assert_eq!(regions.len(), 2);
                assert!(missing_parts.is_empty());
                assert_close(regions[0].bbox, BBox::new(48.0, 0.0, 120.0, 12.0));
                assert_close(regions[1].bbox, BBox::new(66.0, 14.0, 102.0, 26.0));
            }
            other => panic!("expected a location, got {:?}", other),
        }
    }

    #[test]
    fn test_words_on_one_line_located_by_proximity() {
        let fragments = line(1, 0.0, &["Patient: Turing (first name Alan) ward 4"]);
        let text = page_text(fragments);
        let locator = FragmentLocator::default();
        let index = PageIndex::new(&text);
        let entity = Entity::unanchored(PiiType::Name, "Alan Turing", 1);

        match locator.locate(&index, &entity) {
            Location::Located { regions, method, .. } => {
                assert_eq!(method, LocateMethod::WordProximity);
                assert_eq!(regions.len(), 1);
                assert_close(regions[0].bbox, BBox::new(54.0, 0.0, 192.0, 12.0));
            }
            other => panic!("expected a location, got {:?}", other),
        }
    }

    #[test]
    fn test_proximity_needs_words_on_the_same_line() {
        let mut fragments = line(1, 0.0, &["Turing signed"]);
        let mut second = line(1, 14.0, &["Alan left"]);
        second[0].order_index = 1;
        fragments.extend(second);
        let text = page_text(fragments);
        let locator = FragmentLocator::default();
        let entity = Entity::unanchored(PiiType::Name, "Alan Turing", 1);

        let location = locator.locate_page(&text, &[entity]);
        assert!(location.regions.is_empty());
        assert_eq!(location.unlocated.len(), 1);
    }

    #[test]
    fn test_short_number_located_by_digit_groups() {
        let fragments = line(1, 0.0, &["Call 555 0142 today, extension 881 on request"]);
        let text = page_text(fragments);
        let locator = FragmentLocator::default();
        let index = PageIndex::new(&text);
        let entity = Entity::unanchored(PiiType::Phone, "555-0142 ext 881", 1);

        match locator.locate(&index, &entity) {
            Location::Located { regions, method, missing_parts } => {
                assert_eq!(method, LocateMethod::DigitGroups);
                assert_eq!(regions.len(), 3);
                assert!(missing_parts.is_empty());
                assert_close(regions[2].bbox, BBox::new(186.0, 0.0, 204.0, 12.0));
            }
            other => panic!("expected a location, got {:?}", other),
        }
    }

    #[test]
    fn test_digit_groups_only_for_short_numbers() {
        assert_eq!(digit_groups("555-0142 ext 881"), vec!["555", "0142", "881"]);
        assert_eq!(digit_groups("ab 12 cd"), Vec::<String>::new());
        assert!(digit_groups("+44 20 7946 0958 / 0959").is_empty());
    }

    #[test]
    fn test_find_word_respects_boundaries_and_case() {
        let text = "Janet met JANE and jane";
        assert_eq!(find_word(text, 0..text.len(), "jane"), vec![(10, 14), (19, 23)]);
    }

    #[test]
    fn test_malformed_fragments_are_not_located() {
        let fragments = vec![TextFragment::new("Jane Smith", BBox::new(10.0, 0.0, 10.0, 12.0), 1, 0)];
        let text = page_text(fragments);
        let locator = FragmentLocator::default();
        let entity = Entity::unanchored(PiiType::Name, "Jane Smith", 1);

        let location = locator.locate_page(&text, &[entity]);
        assert!(location.regions.is_empty());
        assert_eq!(location.unlocated.len(), 1);
    }

    #[test]
    fn test_overlapping_entities_merge() {
        let fragments = line(1, 0.0, &["Contact jane.smith@example.com now"]);
        let text = page_text(fragments);
        let locator = FragmentLocator::default();
        let entities = vec![
            Entity::anchored(PiiType::Email, "jane.smith@example.com", 1, Span::new(8, 30)),
            Entity::unanchored(PiiType::Username, "jane.smith", 1),
        ];

        let location = locator.locate_page(&text, &entities);
        assert_eq!(location.regions.len(), 1);
        assert_eq!(location.regions[0].entity_types.len(), 2);
    }
}
