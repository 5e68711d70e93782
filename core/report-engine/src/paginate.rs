//! FILENAME: core/report-engine/src/paginate.rs
//! Paginator - slices the flattened sequence and describes the pager.
//!
//! Group headers take page slots exactly like data rows. Pages are 1-based.

use serde::{Deserialize, Serialize};

/// The `page`-th slice of `page_size` items. Page 0, page size 0 or a page
/// past the end yield an empty slice.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// `ceil(total_items / page_size)`; 0 when there is nothing to show.
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        total_items.div_ceil(page_size)
    }
}

/// At most `max_buttons` consecutive page numbers around `current`, shifted
/// to stay inside `1..=total`. A stale `current` is clamped into range.
pub fn page_window(current: usize, total: usize, max_buttons: usize) -> Vec<usize> {
    if total == 0 || max_buttons == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total);
    let mut start = current.saturating_sub(max_buttons / 2).max(1);
    let end = start.saturating_add(max_buttons - 1).min(total);
    if end + 1 - start < max_buttons {
        start = (end + 1).saturating_sub(max_buttons).max(1);
    }
    (start..=end).collect()
}

// ============================================================================
// PAGE METADATA
// ============================================================================

/// Everything a pager needs to render itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: usize,
    pub page_size: usize,
    /// Length of the flattened sequence, headers included.
    pub total_items: usize,
    pub total_pages: usize,
    /// 1-based index of the first item on the page, 0 when there are no items.
    pub first_item_index: usize,
    pub last_item_index: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub page_numbers: Vec<usize>,
    /// Pages exist before the first numbered button.
    pub has_leading_gap: bool,
    /// Pages exist after the last numbered button.
    pub has_trailing_gap: bool,
}

impl PageInfo {
    pub fn new(current_page: usize, page_size: usize, total_items: usize, max_buttons: usize) -> Self {
        let total_pages = total_pages(total_items, page_size);
        let page_numbers = page_window(current_page, total_pages, max_buttons);

        let first_item_index = if total_items > 0 && current_page > 0 {
            (current_page - 1).saturating_mul(page_size).saturating_add(1)
        } else {
            0
        };
        let last_item_index = current_page.saturating_mul(page_size).min(total_items);
        let overflow = total_pages > max_buttons;

        PageInfo {
            current_page,
            page_size,
            total_items,
            total_pages,
            first_item_index,
            last_item_index,
            has_previous: current_page > 1,
            has_next: current_page < total_pages,
            has_leading_gap: overflow && page_numbers.first().map_or(false, |&p| p > 1),
            has_trailing_gap: overflow && page_numbers.last().map_or(false, |&p| p < total_pages),
            page_numbers,
        }
    }
}
