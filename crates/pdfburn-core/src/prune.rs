//! Page pruning
//!
//! Deletes every page whose original ordinal is not in the keep-set.

use crate::document::BurnDocument;
use crate::keep::KeepSet;
use tracing::debug;

/// Remove pages not named by `keep`; returns how many were deleted
///
/// Walks from the last page to the first so a deletion never shifts an
/// ordinal that has yet to be examined. Without a keep-set nothing changes.
pub fn prune_pages(doc: &mut BurnDocument, keep: Option<&KeepSet>) -> usize {
    let Some(keep) = keep else {
        return 0;
    };

    let page_count = doc.page_count();
    let mut deleted = 0;
    for index in (0..page_count).rev() {
        if !keep.retains(index) {
            doc.delete_page(index);
            deleted += 1;
        }
    }

    debug!(
        page_count,
        deleted,
        remaining = doc.page_count(),
        "pruned pages"
    );
    deleted
}
