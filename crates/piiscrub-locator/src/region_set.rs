//! Region union and the document-level redaction region set

use piiscrub_core::{BBox, PiiType, Region};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum overlap, in points, for two boxes to count as overlapping
const OVERLAP_EPSILON: f64 = 1e-6;

/// Merge a page's regions until no two of them overlap.
///
/// Regions merge when their boxes overlap with positive area, or when they
/// sit on the same line with a horizontal gap of at most `tolerance`. The
/// merged region covers the union box and carries every contributing type.
/// Regions on different pages are never merged. Output is sorted by page,
/// then top-left corner.
pub fn merge_regions(regions: Vec<Region>, tolerance: f64) -> Vec<Region> {
    let mut by_page: BTreeMap<u32, Vec<Region>> = BTreeMap::new();
    for region in regions {
        by_page.entry(region.page).or_default().push(region);
    }

    let mut merged = Vec::new();
    for (_, mut page_regions) in by_page {
        sort_regions(&mut page_regions);
        merge_page(&mut page_regions, tolerance);
        sort_regions(&mut page_regions);
        merged.extend(page_regions);
    }
    merged
}

fn merge_page(regions: &mut Vec<Region>, tolerance: f64) {
    loop {
        let mut changed = false;
        let mut i = 0;
        while i < regions.len() {
            let mut j = i + 1;
            while j < regions.len() {
                if should_merge(&regions[i].bbox, &regions[j].bbox, tolerance) {
                    let other = regions.remove(j);
                    regions[i].absorb(&other);
                    changed = true;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
        if !changed {
            break;
        }
    }
}

fn should_merge(a: &BBox, b: &BBox, tolerance: f64) -> bool {
    if overlaps(a, b) {
        return true;
    }
    let gap = if a.x0 <= b.x0 {
        a.horizontal_gap(b)
    } else {
        b.horizontal_gap(a)
    };
    a.same_line(b) && gap <= tolerance
}

/// Positive-area intersection
pub fn overlaps(a: &BBox, b: &BBox) -> bool {
    let x = a.x1.min(b.x1) - a.x0.max(b.x0);
    let y = a.y1.min(b.y1) - a.y0.max(b.y0);
    x > OVERLAP_EPSILON && y > OVERLAP_EPSILON
}

fn sort_regions(regions: &mut [Region]) {
    regions.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then(a.bbox.y0.total_cmp(&b.bbox.y0))
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
            .then(a.bbox.y1.total_cmp(&b.bbox.y1))
            .then(a.bbox.x1.total_cmp(&b.bbox.x1))
            .then(a.entity_types.cmp(&b.entity_types))
    });
}

/// Regions for one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRegions {
    pub page: u32,
    pub regions: Vec<Region>,
}

/// One flattened output row: `(page, bbox, types)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRow {
    pub page: u32,
    pub bbox: BBox,
    pub types: Vec<PiiType>,
}

/// The artifact handed to the redaction collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedactionRegionSet {
    pub pages: Vec<PageRegions>,
}

impl RedactionRegionSet {
    /// Assemble per-page region lists, ordered by page.
    ///
    /// Lists for the same page are merged together; pages without regions are omitted.
    pub fn from_pages(pages: impl IntoIterator<Item = PageRegions>, tolerance: f64) -> Self {
        let mut by_page: BTreeMap<u32, Vec<Region>> = BTreeMap::new();
        for page in pages {
            by_page.entry(page.page).or_default().extend(page.regions);
        }
        let pages = by_page
            .into_iter()
            .map(|(page, regions)| PageRegions {
                page,
                regions: merge_regions(regions, tolerance),
            })
            .filter(|p| !p.regions.is_empty())
            .collect();
        Self { pages }
    }

    pub fn regions_for(&self, page: u32) -> &[Region] {
        self.pages
            .iter()
            .find(|p| p.page == page)
            .map(|p| p.regions.as_slice())
            .unwrap_or(&[])
    }

    pub fn region_count(&self) -> usize {
        self.pages.iter().map(|p| p.regions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.region_count() == 0
    }

    /// `(page, bbox, types)` rows in page order
    pub fn flatten(&self) -> Vec<RegionRow> {
        self.pages
            .iter()
            .flat_map(|p| p.regions.iter())
            .map(|r| RegionRow {
                page: r.page,
                bbox: r.bbox,
                types: r.entity_types.iter().copied().collect(),
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
