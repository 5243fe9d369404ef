//! Fixed-size pagination over a keyed, ordered collection.

use serde::{Deserialize, Serialize};

/// Navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageRequest {
    Number(usize),
    Step(PageStep),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStep {
    Next,
    Prev,
}

impl PageRequest {
    pub const NEXT: PageRequest = PageRequest::Step(PageStep::Next);
    pub const PREV: PageRequest = PageRequest::Step(PageStep::Prev);
}

/// Pages over the items of the collection identified by `K`.
///
/// `1 <= page_number() <= page_count()` holds at all times.
#[derive(Debug, Clone)]
pub struct Pager<K, T> {
    page_size: usize,
    key: Option<K>,
    items: Vec<T>,
    page_number: usize,
}

impl<K: PartialEq, T> Pager<K, T> {
    /// A `page_size` of zero is treated as one.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            key: None,
            items: Vec::new(),
            page_number: 1,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Replace the items. The same key keeps the current page (clamped),
    /// a different key starts over on page 1.
    pub fn set_items(&mut self, key: K, items: Vec<T>) {
        if self.key.as_ref() != Some(&key) {
            self.page_number = 1;
            self.key = Some(key);
        }
        self.items = items;
        self.page_number = self.page_number.min(self.page_count());
    }

    /// Move to another page, clamping out-of-range requests.
    pub fn goto(&mut self, request: PageRequest) -> usize {
        let target = match request {
            PageRequest::Number(n) => n,
            PageRequest::Step(PageStep::Next) => self.page_number.saturating_add(1),
            PageRequest::Step(PageStep::Prev) => self.page_number.saturating_sub(1),
        };
        self.page_number = target.clamp(1, self.page_count());
        self.page_number
    }

    pub fn current_page(&self) -> &[T] {
        let start = (self.page_number - 1) * self.page_size;
        let end = (start + self.page_size).min(self.items.len());
        self.items.get(start..end).unwrap_or(&[])
    }

    pub fn page_number(&self) -> usize {
        self.page_number
    }

    pub fn page_count(&self) -> usize {
        self.items.len().div_ceil(self.page_size).max(1)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_prev(&self) -> bool {
        self.page_number > 1
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.page_count()
    }

    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    /// Forget key and items.
    pub fn reset(&mut self) {
        self.key = None;
        self.items.clear();
        self.page_number = 1;
    }
}
