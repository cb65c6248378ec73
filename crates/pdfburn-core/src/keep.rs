//! Keep-set parsing
//!
//! The keep-set is an allow-list of zero-based page ordinals, relative to the
//! document as uploaded. It arrives as a JSON array of integers.

use crate::error::BurnError;
use serde::Deserialize;
use std::collections::BTreeSet;

/// Page ordinals to retain
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<u64>")]
pub struct KeepSet {
    pages: BTreeSet<u32>,
}

impl KeepSet {
    /// Parse a JSON array like `[0, 2, 5]`
    ///
    /// Negative numbers, non-integers and anything that is not an array are
    /// rejected. Duplicates collapse. Indices too large to name a page are
    /// dropped, like any other out-of-range index.
    pub fn parse(input: &str) -> Result<Self, BurnError> {
        serde_json::from_str(input).map_err(|e| BurnError::InvalidKeep(e.to_string()))
    }

    /// Parse an optional form value; a missing or empty value means "keep all"
    ///
    /// Whitespace-only input is not empty and fails to parse.
    pub fn parse_optional(input: Option<&str>) -> Result<Option<Self>, BurnError> {
        match input {
            None | Some("") => Ok(None),
            Some(raw) => Self::parse(raw).map(Some),
        }
    }

    pub fn retains(&self, index: u32) -> bool {
        self.pages.contains(&index)
    }

    /// Number of kept pages that exist in a document of `page_count` pages
    pub fn count_within(&self, page_count: u32) -> usize {
        self.pages.range(..page_count).count()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl From<Vec<u64>> for KeepSet {
    fn from(pages: Vec<u64>) -> Self {
        pages
            .into_iter()
            .filter_map(|page| u32::try_from(page).ok())
            .collect()
    }
}

impl From<Vec<u32>> for KeepSet {
    fn from(pages: Vec<u32>) -> Self {
        Self {
            pages: pages.into_iter().collect(),
        }
    }
}

impl FromIterator<u32> for KeepSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_simple_list() {
        let keep = KeepSet::parse("[0, 2, 5]").unwrap();
        assert!(keep.retains(0));
        assert!(!keep.retains(1));
        assert!(keep.retains(2));
        assert!(keep.retains(5));
        assert_eq!(keep.len(), 3);
    }

    #[test]
    fn test_parse_deduplicates() {
        let keep = KeepSet::parse("[3, 3, 1, 3]").unwrap();
        assert_eq!(keep.len(), 2);
    }

    #[test]
    fn test_parse_empty_list() {
        let keep = KeepSet::parse("[]").unwrap();
        assert!(keep.is_empty());
    }

    #[test]
    fn test_parse_rejects_negative() {
        assert!(matches!(
            KeepSet::parse("[0, -1]"),
            Err(BurnError::InvalidKeep(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(KeepSet::parse("{\"pages\": [1]}").is_err());
        assert!(KeepSet::parse("1,2,3").is_err());
        assert!(KeepSet::parse("[1.5]").is_err());
    }

    #[test]
    fn test_optional_empty_means_keep_all() {
        assert_eq!(KeepSet::parse_optional(None).unwrap(), None);
        assert_eq!(KeepSet::parse_optional(Some("")).unwrap(), None);
    }

    #[test]
    fn test_optional_whitespace_is_invalid() {
        assert!(matches!(
            KeepSet::parse_optional(Some("  ")),
            Err(BurnError::InvalidKeep(_))
        ));
    }

    #[test]
    fn test_parse_drops_indices_beyond_u32() {
        let keep = KeepSet::parse("[0, 4294967296, 18446744073709551615]").unwrap();
        assert_eq!(keep.len(), 1);
        assert!(keep.retains(0));
        assert_eq!(keep.count_within(2), 1);
    }

    #[test]
    fn test_optional_empty_array_is_present() {
        let keep = KeepSet::parse_optional(Some("[]")).unwrap();
        assert_eq!(keep, Some(KeepSet::default()));
    }

    #[test]
    fn test_count_within_ignores_out_of_range() {
        let keep: KeepSet = [0, 2, 9, 40].into_iter().collect();
        assert_eq!(keep.count_within(5), 2);
        assert_eq!(keep.count_within(0), 0);
    }

    proptest! {
        /// Property: any list of non-negative integers parses and retains exactly its members
        #[test]
        fn parsed_list_retains_members(pages in prop::collection::vec(0u32..10_000, 0..50)) {
            let json = serde_json::to_string(&pages).unwrap();
            let keep = KeepSet::parse(&json).unwrap();
            for page in &pages {
                prop_assert!(keep.retains(*page));
            }
            let unique: BTreeSet<u32> = pages.iter().copied().collect();
            prop_assert_eq!(keep.len(), unique.len());
        }

        /// Property: arbitrary text never panics the parser
        #[test]
        fn parse_never_panics(input in ".{0,64}") {
            let _ = KeepSet::parse(&input);
        }
    }
}
