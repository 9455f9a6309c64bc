//! Lantern Notes Core Library
//!
//! Platform-agnostic core logic for the Lantern Notes notebook: raster ink
//! surfaces, stroke and lasso-erase handling, the page lifecycle, and
//! whole-tree persistence. UI chrome, DOM rendering and the input event
//! sources are external collaborators.

pub mod coords;
pub mod editor;
pub mod input;
pub mod lasso;
pub mod notebook;
pub mod page;
pub mod storage;
pub mod stroke;
pub mod surface;

pub use coords::DisplayMetrics;
pub use editor::{DispatchOutcome, Editor, EditorError, EditorSession, Mode};
pub use input::{PointerEvent, PointerIntent, PointerType, classify_pointer_intent};
pub use lasso::{LassoEngine, LassoSelection};
pub use notebook::{Book, Note, Notebook, Page, Workspace};
pub use page::{BookView, PageCanvas};
pub use storage::{
    AutoSaveManager, FileStorage, MemoryStorage, Storage, StorageError, StorageResult,
    storage_key,
};
pub use stroke::{StrokeMode, StrokeSession};
pub use surface::{CompositeMode, Rgba, Surface, SurfaceError};
