use serde::{Deserialize, Serialize};

use crate::services::{PanelContext, PanelError, PanelResult};

pub const DEFAULT_PAGE_SIZE: usize = 10;

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

// Every list view pages on the client after fetching the full collection,
// so the pager owns the records and slices them on demand.
pub struct Pager<T> {
    items: Vec<T>,
    filter: Option<Predicate<T>>,
    page: usize,
    page_size: usize,
}

#[derive(Debug)]
pub struct PageView<'a, T> {
    pub items: Vec<&'a T>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub page_size: usize,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PageMeta {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub page_size: usize,
}

impl<'a, T> PageView<'a, T> {
    pub fn meta(&self) -> PageMeta {
        PageMeta {
            current_page: self.current_page,
            total_pages: self.total_pages,
            total_items: self.total_items,
            page_size: self.page_size,
        }
    }
}

impl<T> Pager<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            filter: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(items: Vec<T>, page_size: usize) -> PanelResult<Self> {
        let mut pager = Self::new(items);
        pager.set_page_size(page_size)?;
        Ok(pager)
    }

    pub fn set_filter<F>(&mut self, predicate: F)
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self.page = 1;
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
        self.page = 1;
    }

    pub fn set_page_size(&mut self, page_size: usize) -> PanelResult<()> {
        if page_size == 0 {
            return Err(PanelError::InvalidPageSize(0));
        }
        self.page_size = page_size;
        self.page = self.page.clamp(1, self.total_pages());
        Ok(())
    }

    /// Out-of-range pages clamp to the nearest valid page instead of erroring.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages());
    }

    pub fn current_page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn filtered(&self) -> Vec<&T> {
        match &self.filter {
            Some(predicate) => self.items.iter().filter(|item| predicate(item)).collect(),
            None => self.items.iter().collect(),
        }
    }

    pub fn total_items(&self) -> usize {
        self.filtered().len()
    }

    // An empty list still renders as one empty page.
    pub fn total_pages(&self) -> usize {
        self.total_items().div_ceil(self.page_size).max(1)
    }

    pub fn page(&self) -> PageView<'_, T> {
        let filtered = self.filtered();
        let total_items = filtered.len();
        let total_pages = total_items.div_ceil(self.page_size).max(1);
        let current_page = self.page.clamp(1, total_pages);
        let start = (current_page - 1) * self.page_size;
        let items = filtered
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect();
        PageView {
            items,
            current_page,
            total_pages,
            total_items,
            page_size: self.page_size,
        }
    }
}

// page/per_page come from the query string, a per-view settings key supplies
// the fallback size before the global default applies.
pub fn list_controls(ctx: &PanelContext, settings_key: &str) -> PanelResult<(usize, usize)> {
    let page = ctx.request.int("page").unwrap_or(1).max(1) as usize;
    let per_page = match ctx.request.int("per_page") {
        Some(size) if size >= 1 => size as usize,
        Some(size) => return Err(PanelError::InvalidPageSize(size)),
        None => match ctx.settings.int(settings_key) {
            Some(size) if size >= 1 => size as usize,
            Some(size) => return Err(PanelError::InvalidPageSize(size)),
            None => DEFAULT_PAGE_SIZE,
        },
    };
    Ok((page, per_page))
}
