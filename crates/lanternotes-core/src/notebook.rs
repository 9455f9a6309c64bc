//! Persistent notebook tree: workspace → notebook → book → page → note.
//!
//! Serde aliases accept the legacy field names of the folder→book→page
//! document variant, so both historical shapes deserialize into this one
//! model.

use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_true() -> bool {
    true
}

/// A positioned rich-text note, independent of the drawing layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    /// Rich-text content (HTML fragment).
    pub content: String,
    /// Top-left position on the page, in surface pixel coordinates.
    pub position: Point,
    pub size: Size,
}

impl Note {
    pub fn new(content: impl Into<String>, position: Point, size: Size) -> Self {
        Self {
            id: new_id(),
            content: content.into(),
            position,
            size,
        }
    }

    /// Lowest pixel row this note occupies.
    pub fn bottom(&self) -> f64 {
        self.position.y + self.size.height
    }
}

/// One page: a rich-text layer plus an optional rasterized ink snapshot.
///
/// The snapshot is the authoritative drawing state; it is rewritten on every
/// stroke completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    /// Rich-text page content (HTML fragment).
    #[serde(default)]
    pub content: String,
    /// Ink layer snapshot as a PNG data URI, or `None` for a blank layer.
    #[serde(default, alias = "drawingData")]
    pub raster_snapshot: Option<String>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl Page {
    /// Create a blank page.
    pub fn blank() -> Self {
        Self {
            id: new_id(),
            content: String::new(),
            raster_snapshot: None,
            notes: Vec::new(),
        }
    }

    /// A page is blank when it has no text, no ink and no notes.
    pub fn is_blank(&self) -> bool {
        self.content.is_empty() && self.raster_snapshot.is_none() && self.notes.is_empty()
    }
}

/// A book (legacy variant: "section") of sequential pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub name: String,
    pub pages: Vec<Page>,
}

impl Book {
    /// Create a book with one blank page.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            pages: vec![Page::blank()],
        }
    }
}

/// A notebook (legacy variant: "folder") grouping books in the sidebar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    pub id: String,
    pub name: String,
    /// Whether the sidebar entry is expanded.
    #[serde(default = "default_true")]
    pub expanded: bool,
    #[serde(alias = "sections")]
    pub books: Vec<Book>,
}

impl Notebook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            expanded: true,
            books: Vec::new(),
        }
    }
}

/// The whole persisted tree for one workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub id: String,
    #[serde(alias = "folders")]
    pub notebooks: Vec<Notebook>,
}

impl Workspace {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            notebooks: Vec::new(),
        }
    }

    /// Add a notebook, returning its id.
    pub fn create_notebook(&mut self, name: impl Into<String>) -> String {
        let notebook = Notebook::new(name);
        let id = notebook.id.clone();
        self.notebooks.push(notebook);
        id
    }

    /// Remove a notebook and everything under it. Returns true if it existed.
    pub fn delete_notebook(&mut self, notebook_id: &str) -> bool {
        let before = self.notebooks.len();
        self.notebooks.retain(|n| n.id != notebook_id);
        self.notebooks.len() != before
    }

    /// Toggle a notebook's expanded flag. Returns the new state.
    pub fn toggle_notebook(&mut self, notebook_id: &str) -> Option<bool> {
        let notebook = self.notebook_mut(notebook_id)?;
        notebook.expanded = !notebook.expanded;
        Some(notebook.expanded)
    }

    /// Add a book (with one blank page) to a notebook, returning its id.
    pub fn create_book(&mut self, notebook_id: &str, name: impl Into<String>) -> Option<String> {
        let notebook = self.notebook_mut(notebook_id)?;
        let book = Book::new(name);
        let id = book.id.clone();
        notebook.books.push(book);
        Some(id)
    }

    /// Remove a book from a notebook. Returns true if it existed.
    pub fn delete_book(&mut self, notebook_id: &str, book_id: &str) -> bool {
        let Some(notebook) = self.notebook_mut(notebook_id) else {
            return false;
        };
        let before = notebook.books.len();
        notebook.books.retain(|b| b.id != book_id);
        notebook.books.len() != before
    }

    pub fn notebook(&self, notebook_id: &str) -> Option<&Notebook> {
        self.notebooks.iter().find(|n| n.id == notebook_id)
    }

    pub fn notebook_mut(&mut self, notebook_id: &str) -> Option<&mut Notebook> {
        self.notebooks.iter_mut().find(|n| n.id == notebook_id)
    }

    pub fn book(&self, notebook_id: &str, book_id: &str) -> Option<&Book> {
        self.notebook(notebook_id)?
            .books
            .iter()
            .find(|b| b.id == book_id)
    }

    pub fn book_mut(&mut self, notebook_id: &str, book_id: &str) -> Option<&mut Book> {
        self.notebook_mut(notebook_id)?
            .books
            .iter_mut()
            .find(|b| b.id == book_id)
    }

    /// Serialize the whole tree to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a tree from JSON (either document variant).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
