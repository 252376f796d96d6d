use serde::Serialize;

/// One page of an id-ordered listing plus the metadata needed to walk it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub pages: u32,
    pub page: u32,
    pub per_page: u32,
    pub has_prev: bool,
    pub has_next: bool,
}

/// `ceil(total / per_page)`; zero items means zero pages.
pub fn page_count(total: u64, per_page: u32) -> u32 {
    let per_page = u64::from(per_page.max(1));
    total.div_ceil(per_page).try_into().unwrap_or(u32::MAX)
}

/// Row offset of the first item on `page` (1-based).
pub fn page_offset(page: u32, per_page: u32) -> u64 {
    u64::from(page.max(1) - 1) * u64::from(per_page)
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, per_page: u32) -> Self {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let pages = page_count(total, per_page);
        Self {
            items,
            total,
            pages,
            page,
            per_page,
            has_prev: page > 1,
            has_next: page < pages,
        }
    }

    /// Slice an already ordered, fully materialized listing.
    pub fn from_ordered(all: Vec<T>, page: u32, per_page: u32) -> Self {
        let total = all.len() as u64;
        let per_page = per_page.max(1);
        let offset = usize::try_from(page_offset(page, per_page)).unwrap_or(usize::MAX);
        let items = all
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .collect();
        Self::new(items, total, page, per_page)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            pages: self.pages,
            page: self.page,
            per_page: self.per_page,
            has_prev: self.has_prev,
            has_next: self.has_next,
        }
    }
}
