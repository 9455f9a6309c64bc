//! Editor context: mode arbitration, gesture dispatch and persistence.
//!
//! All interaction state (current mode, active stroke, shown lasso, pan
//! bookkeeping) lives in an explicit [`EditorSession`] rather than globals,
//! so independent editors can coexist in one process.

use std::sync::Arc;

use kurbo::Point;
use log::warn;
use thiserror::Error;

use crate::coords::DisplayMetrics;
use crate::input::{PointerEvent, PointerIntent, PointerType, classify_pointer_intent};
use crate::lasso::LassoEngine;
use crate::notebook::{Note, Workspace};
use crate::page::BookView;
use crate::storage::{AutoSaveManager, Storage, StorageError, storage_key};
use crate::stroke::{StrokeMode, StrokeSession};
use crate::surface::{Surface, SurfaceError};

/// Default multiplier applied to pan drag deltas.
pub const DEFAULT_SCROLL_SENSITIVITY: f64 = 1.5;

/// Editor errors.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error("no book is open")]
    NoOpenBook,
}

/// Interaction modes. The lasso is a sub-state of `Erasing`, and panning is
/// an orthogonal flag that suspends stroke handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Rich-text editing; pointer events never reach the ink layer.
    #[default]
    Writing,
    /// Freehand ink.
    Drawing,
    /// Erase: touch erases directly, pen/mouse collect a lasso.
    Erasing,
}

impl Mode {
    /// Whether pointer gestures are dispatched to the drawing layer.
    pub fn is_drawing_capable(self) -> bool {
        matches!(self, Mode::Drawing | Mode::Erasing)
    }
}

/// Result of ending a pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing to do (no session was open).
    None,
    /// A stroke finished on this page; the page must be persisted.
    Completed { page_index: usize },
    /// A lasso loop closed on this page; a selection is now shown.
    LassoShown { page_index: usize },
}

/// Interaction state for one editor instance.
#[derive(Debug, Clone)]
pub struct EditorSession {
    pub mode: Mode,
    /// User-configurable pan speed multiplier.
    pub scroll_sensitivity: f64,
    pub lasso: LassoEngine,
    panning: bool,
    last_pan_y: f64,
    stroke: Option<(usize, StrokeSession)>,
    trail: Option<Surface>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    pub fn new() -> Self {
        Self {
            mode: Mode::default(),
            scroll_sensitivity: DEFAULT_SCROLL_SENSITIVITY,
            lasso: LassoEngine::new(),
            panning: false,
            last_pan_y: 0.0,
            stroke: None,
            trail: None,
        }
    }

    /// Whether a stroke or lasso gesture is currently in flight.
    pub fn is_session_active(&self) -> bool {
        self.stroke.is_some()
    }

    pub fn is_panning(&self) -> bool {
        self.panning
    }

    /// The lasso trail overlay for the in-flight gesture, if any.
    pub fn trail_overlay(&self) -> Option<&Surface> {
        self.trail.as_ref()
    }

    /// Switch modes. Returns true if the mode changed. Any in-flight gesture
    /// is dropped, and leaving `Erasing` clears the lasso sub-state.
    pub fn set_mode(&mut self, mode: Mode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        self.stroke = None;
        self.trail = None;
        if mode != Mode::Erasing {
            self.lasso.cancel();
        }
        true
    }

    /// Toggle the eraser. The eraser implies a drawing-capable mode, so
    /// toggling from `Writing` lands in `Erasing` directly and toggling off
    /// falls back to `Drawing`.
    pub fn toggle_eraser(&mut self) -> bool {
        let next = if self.mode == Mode::Erasing {
            Mode::Drawing
        } else {
            Mode::Erasing
        };
        self.set_mode(next);
        self.mode == Mode::Erasing
    }

    /// Handle pointer-down: pan-intent first, then stroke dispatch.
    pub fn pointer_down(
        &mut self,
        event: &PointerEvent,
        metrics: &DisplayMetrics,
        page_index: usize,
        view: &mut BookView,
    ) {
        if !self.mode.is_drawing_capable() {
            return;
        }
        // One stroke/pan session at a time.
        if self.stroke.is_some() || self.panning {
            return;
        }
        match classify_pointer_intent(event, self.mode == Mode::Erasing) {
            PointerIntent::Pan => {
                self.panning = true;
                self.last_pan_y = event.position.y;
            }
            intent => {
                let Some(page) = view.page_mut(page_index) else {
                    return;
                };
                let mode = match intent {
                    PointerIntent::Erase => {
                        // A new erase gesture cancels a shown selection.
                        self.lasso.cancel();
                        if event.pointer_type == PointerType::Touch {
                            StrokeMode::Erase
                        } else {
                            StrokeMode::Lasso
                        }
                    }
                    _ => StrokeMode::Ink,
                };
                let point = metrics.to_surface(event.position);
                let stroke = StrokeSession::begin(&mut page.surface, point, mode);
                if mode == StrokeMode::Lasso {
                    self.trail =
                        Some(Surface::new(page.surface.width(), page.surface.height()));
                }
                self.stroke = Some((page_index, stroke));
            }
        }
    }

    /// Handle pointer-move. Returns the scroll delta to apply when panning;
    /// while panning no surface is touched.
    pub fn pointer_move(
        &mut self,
        event: &PointerEvent,
        metrics: &DisplayMetrics,
        view: &mut BookView,
    ) -> f64 {
        if self.panning {
            let delta = (self.last_pan_y - event.position.y) * self.scroll_sensitivity;
            self.last_pan_y = event.position.y;
            return delta;
        }
        if let Some((page_index, stroke)) = self.stroke.as_mut() {
            if let Some(page) = view.page_mut(*page_index) {
                stroke.extend(&mut page.surface, metrics.to_surface(event.position));
                if stroke.mode() == StrokeMode::Lasso {
                    if let Some(trail) = self.trail.as_mut() {
                        LassoEngine::draw_trail(stroke.points(), trail);
                    }
                }
            }
        }
        0.0
    }

    /// End the active gesture (pointer-up or pointer-leave).
    pub fn pointer_up(&mut self) -> DispatchOutcome {
        self.trail = None;
        self.panning = false;
        let Some((page_index, stroke)) = self.stroke.take() else {
            return DispatchOutcome::None;
        };
        let mode = stroke.mode();
        let points = stroke.finish();
        if mode == StrokeMode::Lasso && self.lasso.complete(points, page_index).is_some() {
            return DispatchOutcome::LassoShown { page_index };
        }
        DispatchOutcome::Completed { page_index }
    }

    /// Two-finger touch begins a pan, unless a stroke is already in flight
    /// (pan and draw gestures are mutually exclusive).
    pub fn touch_pan_start(&mut self, touches: &[Point]) -> bool {
        if touches.len() != 2 || self.stroke.is_some() {
            return false;
        }
        self.panning = true;
        self.last_pan_y = (touches[0].y + touches[1].y) / 2.0;
        true
    }

    /// Two-finger move. Returns the scroll delta to apply.
    pub fn touch_pan_move(&mut self, touches: &[Point]) -> f64 {
        if !self.panning || touches.len() != 2 {
            return 0.0;
        }
        let mid_y = (touches[0].y + touches[1].y) / 2.0;
        let delta = (self.last_pan_y - mid_y) * self.scroll_sensitivity;
        self.last_pan_y = mid_y;
        delta
    }

    /// A finger lifted; the pan ends when fewer than two remain.
    pub fn touch_pan_end(&mut self, remaining_touches: usize) {
        if remaining_touches < 2 {
            self.panning = false;
        }
    }
}

struct OpenBook {
    notebook_id: String,
    book_id: String,
    view: BookView,
}

/// One editing context over a workspace tree.
///
/// Composes the session state machine with the page lifecycle and the
/// storage collaborator. Every completed stroke writes the page snapshot
/// through to the tree and rewrites the whole tree to storage.
pub struct Editor<S: Storage> {
    pub workspace: Workspace,
    pub session: EditorSession,
    autosave: AutoSaveManager<S>,
    open: Option<OpenBook>,
    scroll_top: f64,
}

impl<S: Storage> Editor<S> {
    /// Load (or start) the tree for a workspace id.
    ///
    /// A missing document starts an empty workspace; any other storage
    /// failure is reported upward.
    pub fn load(workspace_id: &str, storage: Arc<S>) -> Result<Self, EditorError> {
        let key = storage_key(workspace_id, "folders");
        let mut autosave = AutoSaveManager::new(storage);
        let workspace = match autosave.load(&key) {
            Ok(ws) => ws,
            Err(StorageError::NotFound(_)) => {
                autosave.set_workspace_key(Some(key));
                Workspace::new(workspace_id)
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            workspace,
            session: EditorSession::new(),
            autosave,
            open: None,
            scroll_top: 0.0,
        })
    }

    /// Persist the whole tree.
    pub fn save_tree(&mut self) -> Result<(), EditorError> {
        self.autosave.save(&self.workspace)?;
        Ok(())
    }

    /// Periodic tick: save if the tree is dirty and the interval elapsed.
    pub fn tick_autosave(&mut self) -> Result<bool, EditorError> {
        Ok(self.autosave.maybe_save(&self.workspace)?)
    }

    /// Note a direct mutation of [`Editor::workspace`] so the next due
    /// [`Editor::tick_autosave`] persists it.
    pub fn mark_dirty(&mut self) {
        self.autosave.mark_dirty();
    }

    /// Add a notebook, returning its id. Persisted by the next save.
    pub fn create_notebook(&mut self, name: impl Into<String>) -> String {
        let id = self.workspace.create_notebook(name);
        self.autosave.mark_dirty();
        id
    }

    /// Remove a notebook and everything under it, closing the open book if
    /// it lived there. Returns true if the notebook existed.
    pub fn delete_notebook(&mut self, notebook_id: &str) -> bool {
        if !self.workspace.delete_notebook(notebook_id) {
            return false;
        }
        if self
            .open
            .as_ref()
            .is_some_and(|o| o.notebook_id == notebook_id)
        {
            self.open = None;
        }
        self.autosave.mark_dirty();
        true
    }

    /// Toggle a notebook's sidebar expansion. Returns the new state.
    pub fn toggle_notebook(&mut self, notebook_id: &str) -> Option<bool> {
        let expanded = self.workspace.toggle_notebook(notebook_id)?;
        self.autosave.mark_dirty();
        Some(expanded)
    }

    /// Add a book to a notebook, returning its id. Persisted by the next
    /// save.
    pub fn create_book(&mut self, notebook_id: &str, name: impl Into<String>) -> Option<String> {
        let id = self.workspace.create_book(notebook_id, name)?;
        self.autosave.mark_dirty();
        Some(id)
    }

    /// Remove a book, closing it first if it is the open one. Returns true
    /// if the book existed.
    pub fn delete_book(&mut self, notebook_id: &str, book_id: &str) -> bool {
        if !self.workspace.delete_book(notebook_id, book_id) {
            return false;
        }
        if self.open.as_ref().is_some_and(|o| o.book_id == book_id) {
            self.open = None;
        }
        self.autosave.mark_dirty();
        true
    }

    /// Open a book, decoding all of its page snapshots.
    pub fn open_book(&mut self, notebook_id: &str, book_id: &str) -> Result<(), EditorError> {
        let book = self
            .workspace
            .book(notebook_id, book_id)
            .ok_or(EditorError::NoOpenBook)?;
        self.open = Some(OpenBook {
            notebook_id: notebook_id.to_string(),
            book_id: book_id.to_string(),
            view: BookView::open(book),
        });
        self.scroll_top = 0.0;
        Ok(())
    }

    pub fn view(&self) -> Option<&BookView> {
        self.open.as_ref().map(|o| &o.view)
    }

    pub fn view_mut(&mut self) -> Option<&mut BookView> {
        self.open.as_mut().map(|o| &mut o.view)
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn set_scroll_top(&mut self, scroll_top: f64) {
        self.scroll_top = scroll_top.max(0.0);
    }

    /// Index of the page currently under the viewport.
    pub fn current_page_index(&self) -> usize {
        match &self.open {
            Some(open) => open.view.current_index(self.scroll_top),
            None => 0,
        }
    }

    /// Switch interaction modes, saving the edited page first.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), EditorError> {
        if self.session.mode != mode {
            self.save_current_page()?;
        }
        self.session.set_mode(mode);
        Ok(())
    }

    /// Toggle the eraser tool. Returns whether erasing is now active.
    pub fn toggle_eraser(&mut self) -> Result<bool, EditorError> {
        self.save_current_page()?;
        Ok(self.session.toggle_eraser())
    }

    pub fn pointer_down(
        &mut self,
        event: &PointerEvent,
        metrics: &DisplayMetrics,
        page_index: usize,
    ) {
        if let Some(open) = self.open.as_mut() {
            self.session
                .pointer_down(event, metrics, page_index, &mut open.view);
        }
    }

    pub fn pointer_move(&mut self, event: &PointerEvent, metrics: &DisplayMetrics) {
        if let Some(open) = self.open.as_mut() {
            let delta = self.session.pointer_move(event, metrics, &mut open.view);
            if delta != 0.0 {
                self.scroll_top = (self.scroll_top + delta).max(0.0);
            }
        }
    }

    /// End the active gesture and persist its page.
    pub fn pointer_up(&mut self) -> Result<(), EditorError> {
        match self.session.pointer_up() {
            DispatchOutcome::None => Ok(()),
            // A closed lasso has not changed any pixels yet, but the
            // invisible stroke still ends a session: persist like any other.
            DispatchOutcome::Completed { page_index }
            | DispatchOutcome::LassoShown { page_index } => self.persist_page(page_index),
        }
    }

    /// Two-finger pan entry points; deltas scroll the view.
    pub fn touch_pan_start(&mut self, touches: &[Point]) -> bool {
        self.session.touch_pan_start(touches)
    }

    pub fn touch_pan_move(&mut self, touches: &[Point]) {
        let delta = self.session.touch_pan_move(touches);
        if delta != 0.0 {
            self.scroll_top = (self.scroll_top + delta).max(0.0);
        }
    }

    pub fn touch_pan_end(&mut self, remaining_touches: usize) {
        self.session.touch_pan_end(remaining_touches);
    }

    /// Apply the shown lasso selection, clearing the enclosed ink.
    pub fn confirm_lasso_delete(&mut self) -> Result<bool, EditorError> {
        let Some(page_index) = self.session.lasso.selection().map(|s| s.page_index) else {
            return Ok(false);
        };
        let open = self.open.as_mut().ok_or(EditorError::NoOpenBook)?;
        let Some(page) = open.view.page_mut(page_index) else {
            self.session.lasso.cancel();
            return Ok(false);
        };
        if !self.session.lasso.confirm_delete(&mut page.surface) {
            return Ok(false);
        }
        self.persist_page(page_index)?;
        Ok(true)
    }

    /// Discard the shown lasso selection without touching the bitmap.
    pub fn cancel_lasso(&mut self) -> bool {
        self.session.lasso.cancel()
    }

    /// React to a scroll position; appends a blank page near the end of a
    /// non-empty trailing page and persists the grown tree.
    pub fn handle_scroll(&mut self, scroll_bottom: f64) -> Result<bool, EditorError> {
        let Some(open) = self.open.as_mut() else {
            return Ok(false);
        };
        let book = self
            .workspace
            .book_mut(&open.notebook_id, &open.book_id)
            .ok_or(EditorError::NoOpenBook)?;
        if open.view.handle_scroll(book, scroll_bottom) {
            self.save_tree()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Replace a page's rich-text content and persist.
    pub fn set_page_content(
        &mut self,
        page_index: usize,
        content: impl Into<String>,
    ) -> Result<(), EditorError> {
        let open = self.open.as_ref().ok_or(EditorError::NoOpenBook)?;
        let book = self
            .workspace
            .book_mut(&open.notebook_id, &open.book_id)
            .ok_or(EditorError::NoOpenBook)?;
        let Some(page) = book.pages.get_mut(page_index) else {
            return Ok(());
        };
        page.content = content.into();
        self.save_tree()
    }

    /// Add a note to a page, growing the drawing surface if the note extends
    /// below it. Rejected while a stroke/lasso session is open.
    pub fn add_note(&mut self, page_index: usize, note: Note) -> Result<(), EditorError> {
        if self.session.is_session_active() {
            return Err(SurfaceError::SessionActive.into());
        }
        let open = self.open.as_mut().ok_or(EditorError::NoOpenBook)?;
        let book = self
            .workspace
            .book_mut(&open.notebook_id, &open.book_id)
            .ok_or(EditorError::NoOpenBook)?;
        let Some(page) = book.pages.get_mut(page_index) else {
            return Ok(());
        };
        page.notes.push(note);
        if let Some(canvas) = open.view.page_mut(page_index) {
            canvas.ensure_note_space(page)?;
        }
        self.save_tree()
    }

    /// Save the page currently under the viewport.
    pub fn save_current_page(&mut self) -> Result<(), EditorError> {
        if self.open.is_none() {
            return Ok(());
        }
        let index = self.current_page_index();
        self.persist_page(index)
    }

    /// Write one page's surface through to the tree and rewrite the tree.
    ///
    /// A storage failure is reported upward; the in-memory surface and tree
    /// stay valid.
    fn persist_page(&mut self, page_index: usize) -> Result<(), EditorError> {
        let open = self.open.as_ref().ok_or(EditorError::NoOpenBook)?;
        let Some(canvas) = open.view.page(page_index) else {
            warn!("persist requested for missing page index {page_index}");
            return Ok(());
        };
        let book = self
            .workspace
            .book_mut(&open.notebook_id, &open.book_id)
            .ok_or(EditorError::NoOpenBook)?;
        if let Some(page) = book.pages.get_mut(page_index) {
            canvas.write_through(page)?;
        }
        self.save_tree()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, StorageResult};
    use kurbo::Size;

    fn page_metrics() -> DisplayMetrics {
        // Displayed 1:1 with the backing store.
        DisplayMetrics::new(
            Point::ZERO,
            Size::new(1600.0, 2000.0),
            Size::new(1600.0, 2000.0),
        )
    }

    fn editor_with_book() -> (Editor<MemoryStorage>, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let mut editor = Editor::load("guest", storage.clone()).unwrap();
        let nb = editor.create_notebook("School");
        let book = editor.create_book(&nb, "Physics").unwrap();
        editor.open_book(&nb, &book).unwrap();
        editor.set_mode(Mode::Drawing).unwrap();
        (editor, storage)
    }

    fn draw_line(editor: &mut Editor<MemoryStorage>, from: Point, to: Point) {
        let m = page_metrics();
        editor.pointer_down(&PointerEvent::mouse(from, 0, 1), &m, 0);
        editor.pointer_move(&PointerEvent::mouse(to, -1, 1), &m);
        editor.pointer_up().unwrap();
    }

    fn circle(center: Point, radius: f64, n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| {
                let a = i as f64 / n as f64 * std::f64::consts::TAU;
                Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
            })
            .collect()
    }

    fn lasso_gesture(editor: &mut Editor<MemoryStorage>, path: &[Point], event_for: impl Fn(Point) -> PointerEvent) {
        let m = page_metrics();
        editor.pointer_down(&event_for(path[0]), &m, 0);
        for p in &path[1..] {
            editor.pointer_move(&event_for(*p), &m);
        }
        editor.pointer_up().unwrap();
    }

    #[test]
    fn test_writing_mode_ignores_pointer() {
        let (mut editor, _) = editor_with_book();
        editor.set_mode(Mode::Writing).unwrap();
        draw_line(&mut editor, Point::new(10.0, 10.0), Point::new(200.0, 10.0));
        assert!(editor.view().unwrap().page(0).unwrap().surface.is_blank());
    }

    #[test]
    fn test_ink_stroke_persists_snapshot() {
        let (mut editor, storage) = editor_with_book();
        draw_line(&mut editor, Point::new(10.0, 10.0), Point::new(200.0, 10.0));

        assert!(!editor.view().unwrap().page(0).unwrap().surface.is_blank());
        let saved = storage.load("guest-lantern-notes-folders").unwrap();
        let page = &saved.notebooks[0].books[0].pages[0];
        assert!(page.raster_snapshot.as_deref().unwrap().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_mode_switch_saves_current_page() {
        let (mut editor, storage) = editor_with_book();
        // Write text into the live tree without saving.
        editor.workspace.notebooks[0].books[0].pages[0].content = "<p>x</p>".to_string();
        editor.set_mode(Mode::Writing).unwrap();

        let saved = storage.load("guest-lantern-notes-folders").unwrap();
        assert_eq!(saved.notebooks[0].books[0].pages[0].content, "<p>x</p>");
    }

    #[test]
    fn test_pan_never_mutates_surface() {
        let (mut editor, _) = editor_with_book();
        let m = page_metrics();
        let before = editor.view().unwrap().page(0).unwrap().surface.clone();

        // Right-mouse drag pans.
        editor.pointer_down(&PointerEvent::mouse(Point::new(100.0, 500.0), 2, 2), &m, 0);
        assert!(editor.session.is_panning());
        editor.pointer_move(&PointerEvent::mouse(Point::new(100.0, 300.0), -1, 2), &m);
        editor.pointer_move(&PointerEvent::mouse(Point::new(100.0, 100.0), -1, 2), &m);
        editor.pointer_up().unwrap();

        assert_eq!(editor.view().unwrap().page(0).unwrap().surface, before);
        // 400px of upward drag at 1.5x sensitivity.
        assert!((editor.scroll_top() - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_finger_pan_excludes_drawing() {
        let (mut editor, _) = editor_with_book();
        let m = page_metrics();

        assert!(editor.touch_pan_start(&[Point::new(100.0, 400.0), Point::new(200.0, 400.0)]));
        editor.touch_pan_move(&[Point::new(100.0, 300.0), Point::new(200.0, 300.0)]);
        assert!(editor.scroll_top() > 0.0);

        // Moves while panning do not draw.
        editor.pointer_move(&PointerEvent::touch(Point::new(50.0, 50.0)), &m);
        assert!(editor.view().unwrap().page(0).unwrap().surface.is_blank());

        editor.touch_pan_end(0);
        assert!(!editor.session.is_panning());
    }

    #[test]
    fn test_pan_not_started_during_stroke() {
        let (mut editor, _) = editor_with_book();
        let m = page_metrics();
        editor.pointer_down(&PointerEvent::touch(Point::new(10.0, 10.0)), &m, 0);
        assert!(!editor.touch_pan_start(&[Point::new(0.0, 0.0), Point::new(10.0, 0.0)]));
        editor.pointer_up().unwrap();
    }

    #[test]
    fn test_one_session_at_a_time() {
        let (mut editor, _) = editor_with_book();
        let m = page_metrics();
        editor.pointer_down(&PointerEvent::mouse(Point::new(10.0, 10.0), 0, 1), &m, 0);
        // A second pointer-down is ignored while the first is open.
        editor.pointer_down(&PointerEvent::mouse(Point::new(500.0, 500.0), 0, 1), &m, 0);
        assert!(editor.session.is_session_active());
        editor.pointer_up().unwrap();
        assert!(!editor.session.is_session_active());
    }

    #[test]
    fn test_lasso_flow_confirm_clears_ink() {
        let (mut editor, storage) = editor_with_book();
        draw_line(&mut editor, Point::new(60.0, 100.0), Point::new(140.0, 100.0));

        editor.set_mode(Mode::Erasing).unwrap();
        let path = circle(Point::new(100.0, 100.0), 50.0, 32);
        lasso_gesture(&mut editor, &path, |p| PointerEvent::pen(p, 0, 1, 0.6));

        assert!(editor.session.lasso.is_active());
        // Trail overlay exists only during the gesture.
        assert!(editor.session.trail_overlay().is_none());

        assert!(editor.confirm_lasso_delete().unwrap());
        let surface = &editor.view().unwrap().page(0).unwrap().surface;
        assert_eq!(surface.pixel(100, 100).unwrap().a, 0);

        let saved = storage.load("guest-lantern-notes-folders").unwrap();
        assert!(saved.notebooks[0].books[0].pages[0].raster_snapshot.is_none());
    }

    #[test]
    fn test_lasso_cancel_keeps_ink() {
        let (mut editor, _) = editor_with_book();
        draw_line(&mut editor, Point::new(60.0, 100.0), Point::new(140.0, 100.0));
        let before = editor.view().unwrap().page(0).unwrap().surface.clone();

        editor.set_mode(Mode::Erasing).unwrap();
        lasso_gesture(
            &mut editor,
            &circle(Point::new(100.0, 100.0), 50.0, 32),
            |p| PointerEvent::pen(p, 0, 1, 0.6),
        );
        assert!(editor.cancel_lasso());
        assert_eq!(editor.view().unwrap().page(0).unwrap().surface, before);
    }

    #[test]
    fn test_open_lasso_gesture_leaves_no_ink() {
        let (mut editor, _) = editor_with_book();
        editor.set_mode(Mode::Erasing).unwrap();
        // Path wanders far from its start: not closed, nothing selected.
        let path: Vec<Point> = (0..30)
            .map(|i| Point::new(100.0 + i as f64 * 10.0, 100.0 + i as f64 * 7.0))
            .collect();
        lasso_gesture(&mut editor, &path, |p| PointerEvent::pen(p, 0, 1, 0.6));

        assert!(!editor.session.lasso.is_active());
        assert!(editor.view().unwrap().page(0).unwrap().surface.is_blank());
    }

    #[test]
    fn test_hardware_eraser_overrides_tool() {
        let (mut editor, _) = editor_with_book();
        assert_eq!(editor.session.mode, Mode::Drawing);
        // Eraser tip (button 5, buttons 32) in drawing mode starts a lasso,
        // not an ink stroke.
        lasso_gesture(
            &mut editor,
            &circle(Point::new(100.0, 100.0), 50.0, 32),
            |p| PointerEvent::pen(p, 5, 32, 0.6),
        );
        assert!(editor.session.lasso.is_active());
        assert!(editor.view().unwrap().page(0).unwrap().surface.is_blank());
    }

    #[test]
    fn test_touch_erase_is_direct() {
        let (mut editor, _) = editor_with_book();
        draw_line(&mut editor, Point::new(0.0, 100.0), Point::new(300.0, 100.0));
        editor.set_mode(Mode::Erasing).unwrap();

        let m = page_metrics();
        editor.pointer_down(&PointerEvent::touch(Point::new(100.0, 100.0)), &m, 0);
        editor.pointer_move(&PointerEvent::touch(Point::new(200.0, 100.0)), &m);
        editor.pointer_up().unwrap();

        let surface = &editor.view().unwrap().page(0).unwrap().surface;
        assert_eq!(surface.pixel(150, 100).unwrap().a, 0);
        assert!(surface.pixel(10, 100).unwrap().a > 0);
        // Direct erase shows no selection.
        assert!(!editor.session.lasso.is_active());
    }

    #[test]
    fn test_leaving_erasing_clears_lasso() {
        let (mut editor, _) = editor_with_book();
        editor.set_mode(Mode::Erasing).unwrap();
        lasso_gesture(
            &mut editor,
            &circle(Point::new(100.0, 100.0), 50.0, 32),
            |p| PointerEvent::pen(p, 0, 1, 0.6),
        );
        assert!(editor.session.lasso.is_active());

        editor.set_mode(Mode::Drawing).unwrap();
        assert!(!editor.session.lasso.is_active());
    }

    #[test]
    fn test_toggle_eraser_from_writing_enables_drawing() {
        let (mut editor, _) = editor_with_book();
        editor.set_mode(Mode::Writing).unwrap();
        assert!(editor.toggle_eraser().unwrap());
        assert!(editor.session.mode.is_drawing_capable());
        assert!(!editor.toggle_eraser().unwrap());
        assert_eq!(editor.session.mode, Mode::Drawing);
    }

    #[test]
    fn test_add_note_rejected_during_session() {
        let (mut editor, _) = editor_with_book();
        let m = page_metrics();
        editor.pointer_down(&PointerEvent::mouse(Point::new(10.0, 10.0), 0, 1), &m, 0);

        let note = Note::new("x", Point::new(0.0, 100.0), Size::new(300.0, 100.0));
        let err = editor.add_note(0, note).unwrap_err();
        assert!(matches!(
            err,
            EditorError::Surface(SurfaceError::SessionActive)
        ));
        editor.pointer_up().unwrap();
    }

    #[test]
    fn test_add_note_grows_surface() {
        let (mut editor, _) = editor_with_book();
        let note = Note::new("tall", Point::new(0.0, 2400.0), Size::new(300.0, 200.0));
        editor.add_note(0, note).unwrap();
        assert_eq!(editor.view().unwrap().page(0).unwrap().surface.height(), 2600);
    }

    #[test]
    fn test_scroll_appends_and_persists() {
        let (mut editor, storage) = editor_with_book();
        draw_line(&mut editor, Point::new(10.0, 10.0), Point::new(200.0, 10.0));

        assert!(editor.handle_scroll(150.0).unwrap());
        // Trailing page now blank: a second near-end scroll appends nothing.
        assert!(!editor.handle_scroll(150.0).unwrap());

        let saved = storage.load("guest-lantern-notes-folders").unwrap();
        assert_eq!(saved.notebooks[0].books[0].pages.len(), 2);
    }

    #[test]
    fn test_tree_edit_persisted_by_autosave_tick() {
        let storage = Arc::new(MemoryStorage::new());
        let mut editor = Editor::load("guest", storage.clone()).unwrap();
        // Clean tree: nothing to do.
        assert!(!editor.tick_autosave().unwrap());

        let nb = editor.create_notebook("School");
        assert!(editor.tick_autosave().unwrap());
        let saved = storage.load("guest-lantern-notes-folders").unwrap();
        assert_eq!(saved.notebooks[0].id, nb);

        // Saved and clean again.
        assert!(!editor.tick_autosave().unwrap());
    }

    #[test]
    fn test_mark_dirty_covers_direct_tree_edits() {
        let storage = Arc::new(MemoryStorage::new());
        let mut editor = Editor::load("guest", storage.clone()).unwrap();

        // Mutating the public tree directly bypasses the dirty tracking.
        editor.workspace.create_notebook("Scratch");
        assert!(!editor.tick_autosave().unwrap());

        editor.mark_dirty();
        assert!(editor.tick_autosave().unwrap());
        let saved = storage.load("guest-lantern-notes-folders").unwrap();
        assert_eq!(saved.notebooks[0].name, "Scratch");
    }

    #[test]
    fn test_delete_open_book_closes_view() {
        let (mut editor, _) = editor_with_book();
        let nb = editor.workspace.notebooks[0].id.clone();
        let book = editor.workspace.notebooks[0].books[0].id.clone();

        assert!(editor.delete_book(&nb, &book));
        assert!(editor.view().is_none());
        assert!(!editor.delete_book(&nb, &book));

        assert!(editor.delete_notebook(&nb));
        assert!(editor.workspace.notebooks.is_empty());
    }

    /// Storage that always fails on save.
    struct FailingStorage;

    impl Storage for FailingStorage {
        fn save(&self, _key: &str, _ws: &Workspace) -> StorageResult<()> {
            Err(StorageError::Io("disk full".to_string()))
        }
        fn load(&self, key: &str) -> StorageResult<Workspace> {
            Err(StorageError::NotFound(key.to_string()))
        }
        fn delete(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }
        fn list(&self) -> StorageResult<Vec<String>> {
            Ok(vec![])
        }
        fn exists(&self, _key: &str) -> StorageResult<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_storage_failure_keeps_bitmap_valid() {
        let mut editor = Editor::load("guest", Arc::new(FailingStorage)).unwrap();
        let nb = editor.create_notebook("School");
        let book = editor.create_book(&nb, "Physics").unwrap();
        editor.open_book(&nb, &book).unwrap();
        editor.session.set_mode(Mode::Drawing);

        let m = page_metrics();
        editor.pointer_down(&PointerEvent::mouse(Point::new(10.0, 10.0), 0, 1), &m, 0);
        editor.pointer_move(&PointerEvent::mouse(Point::new(200.0, 10.0), -1, 1), &m);
        let result = editor.pointer_up();

        assert!(matches!(
            result,
            Err(EditorError::Storage(StorageError::Io(_)))
        ));
        // The surface and tree survive the failed write.
        assert!(!editor.view().unwrap().page(0).unwrap().surface.is_blank());
        let page = &editor.workspace.notebooks[0].books[0].pages[0];
        assert!(page.raster_snapshot.is_some());
    }
}
