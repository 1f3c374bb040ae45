//! Page windows over an ordered collection.
//!
//! Pure arithmetic over counts: the caller supplies an already-sorted
//! collection and fetches `limit` items starting at `offset`.

use serde::Serialize;

/// A window into an ordered collection plus the data a "page N of M"
/// control needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Index of the first item on this page.
    pub offset: u64,
    /// Number of items on this page, at most `per_page`.
    pub limit: u64,
    /// Page number actually served, 1-based.
    pub page: u64,
    pub per_page: u64,
    /// Size of the whole collection.
    pub total: u64,
    pub has_prev: bool,
    pub has_next: bool,
}

/// Compute the window for `requested_page`.
///
/// Pages below 1 clamp to 1 and a `page_size` of 0 is treated as 1. A page
/// past the end yields an empty window at `offset == total_count` instead of
/// an error.
pub fn paginate(total_count: u64, page_size: u64, requested_page: i64) -> Page {
    let per_page = page_size.max(1);
    let page = u64::try_from(requested_page).unwrap_or(0).max(1);

    let mut offset = (page - 1).saturating_mul(per_page);
    let limit = if offset > total_count {
        offset = total_count;
        0
    } else {
        per_page.min(total_count - offset)
    };

    Page {
        offset,
        limit,
        page,
        per_page,
        total: total_count,
        has_prev: page > 1,
        has_next: offset + limit < total_count,
    }
}

impl Page {
    /// Total number of pages; zero for an empty collection.
    pub fn pages(&self) -> u64 {
        self.total.div_ceil(self.per_page)
    }

    pub fn prev_num(&self) -> Option<u64> {
        self.has_prev.then(|| self.page - 1)
    }

    pub fn next_num(&self) -> Option<u64> {
        self.has_next.then(|| self.page + 1)
    }

    /// Page numbers for a navigation control, with `None` marking a gap
    /// to be shown as an ellipsis.
    ///
    /// Keeps the first `left_edge` and last `right_edge` pages, plus the
    /// pages from `left_current` before the current page to
    /// `right_current - 1` after it.
    pub fn iter_pages(
        &self,
        left_edge: u64,
        left_current: u64,
        right_current: u64,
        right_edge: u64,
    ) -> Vec<Option<u64>> {
        let pages = self.pages();
        let mut out = Vec::new();
        let mut last = 0;
        for num in 1..=pages {
            let near_current =
                num + left_current + 1 > self.page && num < self.page + right_current;
            if num <= left_edge || near_current || num + right_edge > pages {
                if last + 1 != num {
                    out.push(None);
                }
                out.push(Some(num));
                last = num;
            }
        }
        out
    }

    /// [`Page::iter_pages`] with the customary edges of 2, 2, 5 and 2.
    pub fn nav_pages(&self) -> Vec<Option<u64>> {
        self.iter_pages(2, 2, 5, 2)
    }
}
