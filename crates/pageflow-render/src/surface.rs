use std::fmt;

use crate::render_ir::{page_snippets, Page};

type PageCountListener = Box<dyn FnMut(usize) + Send + 'static>;

/// Page list exposed to the host UI.
///
/// The list is only ever replaced wholesale through [`PageSurface::commit`].
pub struct PageSurface {
    pages: Vec<Page>,
    current: usize,
    snippet_chars: usize,
    listeners: Vec<PageCountListener>,
}

impl fmt::Debug for PageSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageSurface")
            .field("page_count", &self.pages.len())
            .field("current", &self.current)
            .field("snippet_chars", &self.snippet_chars)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for PageSurface {
    fn default() -> Self {
        Self::new(150)
    }
}

impl PageSurface {
    /// Create an empty surface with a snippet length for previews.
    pub fn new(snippet_chars: usize) -> Self {
        Self {
            pages: Vec::new(),
            current: 0,
            snippet_chars,
            listeners: Vec::new(),
        }
    }

    /// Register a listener notified with the new page count after each commit.
    pub fn on_page_count_changed<F>(&mut self, listener: F)
    where
        F: FnMut(usize) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Replace the page list.
    pub fn commit(&mut self, pages: Vec<Page>) {
        self.pages = pages;
        self.current = self.current.min(self.pages.len().saturating_sub(1));
        let count = self.pages.len();
        for listener in &mut self.listeners {
            listener(count);
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn snippets(&self) -> Vec<String> {
        page_snippets(&self.pages, self.snippet_chars)
    }

    /// Focus a page. Out-of-range indices leave the focus unchanged.
    pub fn go_to_page(&mut self, index: usize) -> Option<&Page> {
        if index >= self.pages.len() {
            return None;
        }
        self.current = index;
        self.pages.get(index)
    }

    pub fn current_page_index(&self) -> usize {
        self.current
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.pages.get(self.current)
    }
}
