//! Cross-page propagation of located entity texts
//!
//! A name confirmed on page 1 is usually the same person on page 4, even
//! when nothing on page 4 triggered a detection. Propagated hits add
//! regions only; misses are not reported as unlocated.

use piiscrub_core::{PageText, PiiType};
use piiscrub_locator::{normalize, FragmentLocator, Mode, PageIndex, PageLocation, PageRegions};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Search every located entity text on the pages it was not found on
pub fn propagate(
    locator: &FragmentLocator,
    pages: &[Arc<PageText>],
    located: &[PageLocation],
) -> Vec<PageRegions> {
    let min_chars = locator.config().min_propagation_chars;

    // (type, normalized text) -> (original text, pages already covered)
    let mut sources: BTreeMap<(PiiType, String), (String, BTreeSet<u32>)> = BTreeMap::new();
    for location in located {
        for entity in &location.located {
            let key = normalize(&entity.text, Mode::for_type(entity.pii_type));
            if key.chars().count() < min_chars {
                continue;
            }
            sources
                .entry((entity.pii_type, key))
                .or_insert_with(|| (entity.text.clone(), BTreeSet::new()))
                .1
                .insert(location.page);
        }
    }

    if sources.is_empty() {
        return Vec::new();
    }

    let mut propagated = Vec::new();
    for page_text in pages.iter().filter(|p| !p.is_blank()) {
        let page = page_text.page();
        let index = PageIndex::new(page_text);
        let mut regions = Vec::new();
        for ((pii_type, _), (text, covered)) in &sources {
            if covered.contains(&page) {
                continue;
            }
            regions.extend(locator.search_regions(&index, text, *pii_type));
        }
        if !regions.is_empty() {
            debug!(page, regions = regions.len(), "Propagated entity texts onto page");
            propagated.push(PageRegions { page, regions });
        }
    }
    propagated
}
