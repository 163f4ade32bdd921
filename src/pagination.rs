use serde::Serialize;

pub const PAGE_SIZE: u64 = 10;

/// Page cursor over an OMDb result set.
///
/// Bounds are only reflected in `has_next`/`has_previous`; `next` never clamps,
/// so paging past the end simply yields an empty search.
#[derive(Debug, Clone, PartialEq)]
pub struct Pagination {
    current_page: u32,
    total_results: u64,
    fetch_complete: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_results: 0,
            fetch_complete: false,
        }
    }
}

impl Pagination {
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_results(&self) -> u64 {
        self.total_results
    }

    pub fn total_pages(&self) -> u64 {
        total_pages(self.total_results)
    }

    pub fn has_previous(&self) -> bool {
        self.fetch_complete && self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.fetch_complete && u64::from(self.current_page) < self.total_pages()
    }

    pub fn next(&mut self) {
        self.current_page = self.current_page.saturating_add(1);
    }

    pub fn previous(&mut self) {
        self.current_page = self.current_page.saturating_sub(1).max(1);
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    pub fn set_total_results(&mut self, total: u64) {
        self.total_results = total;
    }

    pub fn mark_fetch_complete(&mut self) {
        self.fetch_complete = true;
    }

    pub fn view(&self) -> PageView {
        PageView {
            current_page: self.current_page,
            total_pages: self.total_pages(),
            total_results: self.total_results,
            has_previous: self.has_previous(),
            has_next: self.has_next(),
        }
    }
}

pub fn total_pages(total_results: u64) -> u64 {
    total_results.div_ceil(PAGE_SIZE)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_results: u64,
    pub has_previous: bool,
    pub has_next: bool,
}
