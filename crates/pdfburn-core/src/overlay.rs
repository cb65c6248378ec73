//! Overlay routing by filename
//!
//! Clients name each overlay `overlay_<index>.png`, where `<index>` is the
//! zero-based ordinal of the target page *after* pruning.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

lazy_static! {
    /// Overlay filename pattern, matched anywhere in the name
    static ref OVERLAY_NAME_PATTERN: Regex = Regex::new(r"overlay_(\d+)\.png").unwrap();
}

/// Extract the target page ordinal from an overlay filename
///
/// Returns `None` when the name does not follow the convention or the index
/// does not fit in a `u32`.
pub fn overlay_index(filename: &str) -> Option<u32> {
    OVERLAY_NAME_PATTERN
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
}

/// Overlay images keyed by post-pruning page ordinal
///
/// Inserting twice for the same ordinal replaces the earlier image.
#[derive(Debug, Clone, Default)]
pub struct OverlaySet {
    by_index: BTreeMap<u32, Vec<u8>>,
}

impl OverlaySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: u32, image: Vec<u8>) {
        self.by_index.insert(index, image);
    }

    /// Route an uploaded file by its name; returns false if the name was ignored
    pub fn insert_named(&mut self, filename: &str, image: Vec<u8>) -> bool {
        match overlay_index(filename) {
            Some(index) => {
                self.insert(index, image);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, index: u32) -> Option<&[u8]> {
        self.by_index.get(&index).map(Vec::as_slice)
    }

    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_index.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }
}
