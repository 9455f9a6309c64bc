//! Page/drawing lifecycle: surfaces in and out of the page model,
//! infinite-scroll pagination, and note-driven canvas growth.

use kurbo::Size;
use log::warn;

use crate::notebook::{Book, Page};
use crate::surface::{PAGE_HEIGHT, PAGE_WIDTH, Surface, SurfaceError};

/// Distance from the scroll end (in display pixels) at which a new page is
/// appended.
pub const SCROLL_APPEND_THRESHOLD: f64 = 200.0;

/// One page's live drawing state.
#[derive(Debug, Clone)]
pub struct PageCanvas {
    pub surface: Surface,
}

impl PageCanvas {
    /// Create a blank canvas at the default page dimensions.
    pub fn blank() -> Self {
        Self {
            surface: Surface::page(),
        }
    }

    /// Decode a page's stored snapshot onto a freshly sized surface.
    ///
    /// A missing or corrupt snapshot yields an empty page rather than an
    /// error; a snapshot taller than the default page keeps its recorded
    /// height (heights only grow).
    pub fn from_page(page: &Page) -> Self {
        let Some(uri) = page.raster_snapshot.as_deref() else {
            return Self::blank();
        };
        match Surface::from_data_uri(uri) {
            Ok(decoded) => {
                let mut surface = Surface::new(
                    decoded.width().max(PAGE_WIDTH),
                    decoded.height().max(PAGE_HEIGHT),
                );
                surface.blit(&decoded, 0, 0);
                Self { surface }
            }
            Err(e) => {
                warn!("discarding corrupt snapshot for page {}: {}", page.id, e);
                Self::blank()
            }
        }
    }

    /// Encode the surface and write it through into the page model.
    ///
    /// A blank surface stores `None`, keeping untouched pages blank for the
    /// infinite-scroll check.
    pub fn write_through(&self, page: &mut Page) -> Result<(), SurfaceError> {
        page.raster_snapshot = if self.surface.is_blank() {
            None
        } else {
            Some(self.surface.to_data_uri()?)
        };
        Ok(())
    }

    /// Grow the canvas so all of the page's notes fit vertically.
    ///
    /// Returns true if the surface grew. Never shrinks.
    pub fn ensure_note_space(&mut self, page: &Page) -> Result<bool, SurfaceError> {
        let required = page
            .notes
            .iter()
            .map(|n| n.bottom())
            .fold(0.0_f64, f64::max)
            .ceil() as u32;
        if required > self.surface.height() {
            self.surface.grow_height(required)?;
            return Ok(true);
        }
        Ok(false)
    }
}

/// Live view over one open book: a canvas per page plus scroll bookkeeping.
#[derive(Debug, Clone)]
pub struct BookView {
    pages: Vec<PageCanvas>,
    /// On-screen height of one page, used to derive the current page index.
    pub page_display_height: f64,
}

impl BookView {
    /// Decode every page of a book.
    pub fn open(book: &Book) -> Self {
        Self {
            pages: book.pages.iter().map(PageCanvas::from_page).collect(),
            page_display_height: f64::from(PAGE_HEIGHT),
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page(&self, index: usize) -> Option<&PageCanvas> {
        self.pages.get(index)
    }

    pub fn page_mut(&mut self, index: usize) -> Option<&mut PageCanvas> {
        self.pages.get_mut(index)
    }

    /// Index of the page under the given scroll offset.
    pub fn current_index(&self, scroll_top: f64) -> usize {
        if self.pages.is_empty() || self.page_display_height <= 0.0 {
            return 0;
        }
        let index = (scroll_top / self.page_display_height).floor().max(0.0) as usize;
        index.min(self.pages.len() - 1)
    }

    /// Display size of one page surface.
    pub fn page_size(&self, index: usize) -> Option<Size> {
        self.page(index).map(|p| p.surface.pixel_size())
    }

    /// Append a blank page if the trailing page has content.
    ///
    /// Idempotent: when the trailing page is already blank nothing is
    /// appended, so repeated calls cannot accumulate blank pages.
    pub fn append_page_if_needed(&mut self, book: &mut Book) -> bool {
        let Some(last) = book.pages.last() else {
            return false;
        };
        if last.is_blank() {
            return false;
        }
        book.pages.push(Page::blank());
        self.pages.push(PageCanvas::blank());
        true
    }

    /// React to a scroll position: append a page when the view nears the end.
    ///
    /// `scroll_bottom` is the remaining scrollable distance below the
    /// viewport, as reported by the scrolling collaborator.
    pub fn handle_scroll(&mut self, book: &mut Book, scroll_bottom: f64) -> bool {
        if scroll_bottom < SCROLL_APPEND_THRESHOLD {
            return self.append_page_if_needed(book);
        }
        false
    }
}
