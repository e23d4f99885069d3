//! Pagination arithmetic and the derived pagination descriptor.

use serde::Deserialize;
use serde::Serialize;

use super::Command;
use super::TableState;

/// Default rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Number of pages needed for `total` rows (0 when there are no rows).
pub fn total_pages(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1))
}

/// Clamps a requested page into the valid range.
///
/// Pages are 1-based. With an unknown or zero total only the lower bound
/// applies.
pub fn clamp_page(page: usize, total: usize, page_size: usize) -> usize {
    let page = page.max(1);
    match total_pages(total, page_size) {
        0 => page,
        pages => page.min(pages),
    }
}

/// Page to show after a page-size change, keeping the first visible row
/// on screen.
pub fn page_after_size_change(current: usize, old_size: usize, new_size: usize) -> usize {
    let first_row = current.max(1).saturating_sub(1) * old_size.max(1);
    first_row / new_size.max(1) + 1
}

/// Pagination presentation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaginationConfig {
    pub default_page_size: usize,
    pub page_size_options: Vec<usize>,
    pub show_size_changer: bool,
    pub show_quick_jumper: bool,
    pub show_total: bool,
    /// Hide the pager when everything fits on one page.
    pub hide_on_single_page: bool,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            page_size_options: vec![10, 20, 50, 100],
            show_size_changer: true,
            show_quick_jumper: false,
            show_total: true,
            hide_on_single_page: false,
        }
    }
}

impl PaginationConfig {
    /// Sets the default page size.
    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size.max(1);
        self
    }

    /// Sets the page-size choices offered by the size changer.
    pub fn with_page_size_options(mut self, options: Vec<usize>) -> Self {
        self.page_size_options = options;
        self
    }

    /// Enables or disables the quick jumper.
    pub fn with_quick_jumper(mut self, enabled: bool) -> Self {
        self.show_quick_jumper = enabled;
        self
    }

    /// Hides the pager when there is at most one page.
    pub fn with_hide_on_single_page(mut self, hide: bool) -> Self {
        self.hide_on_single_page = hide;
        self
    }
}

/// Everything a renderer needs to draw a pager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDescriptor {
    pub current: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_prev: bool,
    pub has_next: bool,
    /// 1-based index of the first row on this page (0 when empty).
    pub range_start: usize,
    /// 1-based index of the last row on this page (0 when empty).
    pub range_end: usize,
    pub page_size_options: Vec<usize>,
    pub show_size_changer: bool,
    pub show_quick_jumper: bool,
    pub show_total: bool,
    pub hidden: bool,
}

impl PaginationDescriptor {
    /// Text like `"11-20 of 57"`.
    pub fn total_text(&self) -> String {
        format!("{}-{} of {}", self.range_start, self.range_end, self.total)
    }
}

/// Produces pagination descriptors and page-change commands.
#[derive(Debug, Clone, Default)]
pub struct PaginationStateManager {
    config: PaginationConfig,
}

impl PaginationStateManager {
    pub fn new(config: PaginationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Derives the descriptor for the current state.
    pub fn descriptor(&self, state: &TableState) -> PaginationDescriptor {
        let page_size = state.page_size();
        let total = state.total();
        let pages = total_pages(total, page_size);
        let current = clamp_page(state.current(), total, page_size);

        let (range_start, range_end) = if total == 0 {
            (0, 0)
        } else {
            let start = (current - 1) * page_size + 1;
            (start.min(total), (current * page_size).min(total))
        };

        PaginationDescriptor {
            current,
            page_size,
            total,
            total_pages: pages,
            has_prev: current > 1,
            has_next: current < pages,
            range_start,
            range_end,
            page_size_options: self.config.page_size_options.clone(),
            show_size_changer: self.config.show_size_changer,
            show_quick_jumper: self.config.show_quick_jumper,
            show_total: self.config.show_total,
            hidden: self.config.hide_on_single_page && pages <= 1,
        }
    }

    /// Commands for a pager change event `(page, page_size)`.
    ///
    /// A size change takes precedence; the page is then recomputed to keep
    /// the first visible row on screen.
    pub fn change(&self, state: &TableState, page: usize, page_size: usize) -> Vec<Command> {
        if page_size != state.page_size() {
            vec![Command::SetPageSize(page_size)]
        } else if page != state.current() {
            vec![Command::SetPage(page)]
        } else {
            Vec::new()
        }
    }

    /// Command to go to the next page, if there is one.
    pub fn next(&self, state: &TableState) -> Option<Command> {
        let descriptor = self.descriptor(state);
        descriptor
            .has_next
            .then(|| Command::SetPage(descriptor.current + 1))
    }

    /// Command to go to the previous page, if there is one.
    pub fn prev(&self, state: &TableState) -> Option<Command> {
        let descriptor = self.descriptor(state);
        descriptor
            .has_prev
            .then(|| Command::SetPage(descriptor.current - 1))
    }
}
