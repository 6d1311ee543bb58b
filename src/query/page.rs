use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Requested page (1-based) and page size, both at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    page: usize,
    page_size: usize,
}

impl PaginationState {
    pub fn new(page: usize, page_size: usize) -> Self {
        PaginationState {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn first(page_size: usize) -> Self {
        PaginationState::new(1, page_size)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn with_page(self, page: usize) -> Self {
        PaginationState::new(page, self.page_size)
    }

    /// Clamp the page into `[1, total_pages]` for `row_count` rows
    pub fn clamped(self, row_count: usize) -> Self {
        self.with_page(self.page.min(total_pages(row_count, self.page_size)))
    }
}

impl Default for PaginationState {
    fn default() -> Self {
        PaginationState::first(25)
    }
}

/// Bounds of one page within an ordered row set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    /// Page actually shown, after clamping
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_count: usize,
    /// Half-open range into the ordered row set
    #[serde(skip)]
    pub range: Range<usize>,
}

impl PageWindow {
    /// Pagination controls are hidden for an empty result
    pub fn is_visible(&self) -> bool {
        self.total_count > 0
    }

    /// 1-based index of the first row on the page (0 when empty)
    pub fn start_row(&self) -> usize {
        if self.range.is_empty() {
            0
        } else {
            self.range.start + 1
        }
    }

    /// 1-based index of the last row on the page (0 when empty)
    pub fn end_row(&self) -> usize {
        self.range.end
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// `max(1, ceil(row_count / page_size))`
pub fn total_pages(row_count: usize, page_size: usize) -> usize {
    row_count.div_ceil(page_size.max(1)).max(1)
}

/// Compute the window for `state` over `row_count` rows
pub fn window(row_count: usize, state: &PaginationState) -> PageWindow {
    let clamped = state.clamped(row_count);
    let start = ((clamped.page - 1) * clamped.page_size).min(row_count);
    let end = (start + clamped.page_size).min(row_count);

    PageWindow {
        page: clamped.page,
        page_size: clamped.page_size,
        total_pages: total_pages(row_count, clamped.page_size),
        total_count: row_count,
        range: start..end,
    }
}

/// Slice `rows` to the requested page
pub fn slice<'a, T>(rows: &'a [T], state: &PaginationState) -> (&'a [T], PageWindow) {
    let window = window(rows.len(), state);
    (&rows[window.range.clone()], window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 25), 1);
        assert_eq!(total_pages(25, 25), 1);
        assert_eq!(total_pages(26, 25), 2);
        assert_eq!(total_pages(101, 10), 11);
    }

    #[test]
    fn test_state_minimums() {
        let state = PaginationState::new(0, 0);
        assert_eq!(state.page(), 1);
        assert_eq!(state.page_size(), 1);
    }

    #[test]
    fn test_slice_last_partial_page() {
        let rows: Vec<u32> = (0..23).collect();
        let (page, window) = slice(&rows, &PaginationState::new(3, 10));

        assert_eq!(page, &[20, 21, 22]);
        assert_eq!(window.total_pages, 3);
        assert_eq!(window.start_row(), 21);
        assert_eq!(window.end_row(), 23);
        assert!(!window.has_next());
        assert!(window.has_previous());
    }

    #[test]
    fn test_page_is_clamped() {
        let rows: Vec<u32> = (0..5).collect();
        let (page, window) = slice(&rows, &PaginationState::new(9, 2));

        assert_eq!(window.page, 3);
        assert_eq!(page, &[4]);
    }

    #[test]
    fn test_empty_rows_hide_pagination() {
        let rows: Vec<u32> = Vec::new();
        let (page, window) = slice(&rows, &PaginationState::new(4, 10));

        assert!(page.is_empty());
        assert!(!window.is_visible());
        assert_eq!(window.page, 1);
        assert_eq!(window.total_pages, 1);
        assert_eq!(window.start_row(), 0);
    }

    #[test]
    fn test_pages_concatenate_to_input() {
        let rows: Vec<u32> = (0..47).collect();
        for page_size in [1, 5, 10, 47, 100] {
            let pages = total_pages(rows.len(), page_size);
            let mut joined = Vec::new();
            for page in 1..=pages {
                let (chunk, _) = slice(&rows, &PaginationState::new(page, page_size));
                assert!(chunk.len() <= page_size);
                joined.extend_from_slice(chunk);
            }
            assert_eq!(joined, rows);
        }
    }
}
