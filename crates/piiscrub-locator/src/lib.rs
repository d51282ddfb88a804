//! piiscrub Locator
//!
//! Turns "PII text on page N" into bounding boxes. The locator tolerates
//! text split across fragments, whitespace and punctuation noise from
//! extraction, and fragments whose reading order differs from their
//! visual order. Region assembly guarantees that regions on a page never
//! partially overlap.

pub mod config;
pub mod locator;
pub mod normalize;
pub mod region_set;

pub use config::LocatorConfig;
pub use locator::{FragmentLocator, LocateMethod, Location, PageIndex, PageLocation};
pub use normalize::{normalize, Mode, NormText};
pub use region_set::{merge_regions, PageRegions, RedactionRegionSet, RegionRow};
