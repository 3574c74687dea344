//! Offset pagination.

use serde::{Deserialize, Serialize};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound applied to requested page sizes.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 2000;

/// A zero-based page index and a page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Create a page request, clamping `size` to `[1, DEFAULT_MAX_PAGE_SIZE]`.
    pub fn new(page: u32, size: u32) -> Self {
        Self::bounded(page, size, DEFAULT_MAX_PAGE_SIZE)
    }

    /// Create a page request, clamping `size` to `[1, max_size]`.
    pub fn bounded(page: u32, size: u32, max_size: u32) -> Self {
        Self {
            page,
            size: size.clamp(1, max_size.max(1)),
        }
    }

    /// Zero-based page index.
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Page size.
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page).saturating_mul(u64::from(self.size))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// One slice of a larger result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page.
    pub content: Vec<T>,
    /// Items across all pages.
    pub total_elements: u64,
    /// Number of pages at the requested size.
    pub total_pages: u64,
    /// Zero-based index of this page.
    pub number: u32,
    /// Requested page size.
    pub size: u32,
    /// `content.len()`.
    pub number_of_elements: u32,
    /// Whether this is the first page.
    pub first: bool,
    /// Whether no page follows this one.
    pub last: bool,
    /// Whether `content` is empty.
    pub empty: bool,
}

impl<T> Page<T> {
    /// Wrap one page of `content` out of `total_elements` matches.
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size());
        let total_pages = total_elements.div_ceil(size);
        let number_of_elements = u32::try_from(content.len()).unwrap_or(u32::MAX);
        Self {
            empty: content.is_empty(),
            content,
            total_elements,
            total_pages,
            number: request.page(),
            size: request.size(),
            number_of_elements,
            first: request.page() == 0,
            last: u64::from(request.page()) + 1 >= total_pages,
        }
    }

    /// An empty page for `request`.
    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), request, 0)
    }

    /// Map the page content, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            number: self.number,
            size: self.size,
            number_of_elements: self.number_of_elements,
            first: self.first,
            last: self.last,
            empty: self.empty,
        }
    }
}

/// Slice `items` according to `request`.
pub(crate) fn paginate<T: Clone>(items: &[T], request: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let start = usize::try_from(request.offset()).unwrap_or(usize::MAX);
    let content = items
        .iter()
        .skip(start)
        .take(request.size() as usize)
        .cloned()
        .collect();
    Page::new(content, request, total)
}
