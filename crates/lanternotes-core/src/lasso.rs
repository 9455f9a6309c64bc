//! Lasso-based erase selection.
//!
//! While the eraser tool is active, a pen or mouse stroke collects a point
//! path instead of erasing directly. If the gesture comes back near its start
//! it is treated as a closed loop: the engine shows a selection that the user
//! confirms (clearing all ink inside the loop) or cancels.

use kurbo::{Point, Rect};
use log::debug;

use crate::surface::{CompositeMode, Rgba, Surface};

/// Minimum recorded points for a gesture to qualify as a lasso;
/// shorter gestures are treated as accidental taps.
pub const MIN_LASSO_POINTS: usize = 20;
/// Maximum start/end distance for a loop to count as closed.
pub const CLOSE_DISTANCE: f64 = 80.0;
/// Distance at which the trail shows a closing-guide line to the start.
pub const GUIDE_DISTANCE: f64 = 100.0;
/// Margin added around the selection bounds for the clearing scan. Widens
/// the scanned region only; cleared pixels are still gated by the polygon
/// test.
pub const CLEAR_MARGIN: f64 = 10.0;

const TRAIL_COLOR: Rgba = Rgba::new(0, 255, 136, 255);
const TRAIL_WIDTH: f64 = 3.0;
const TRAIL_DASH: (f64, f64) = (10.0, 5.0);
const GUIDE_DASH: (f64, f64) = (5.0, 5.0);
const START_MARKER_RADIUS: f64 = 8.0;

/// A closed lasso awaiting confirm or cancel.
#[derive(Debug, Clone)]
pub struct LassoSelection {
    /// The closed polygon path, in surface pixel coordinates.
    pub path: Vec<Point>,
    /// Axis-aligned bounding box of the path.
    pub bounds: Rect,
    /// Index of the page the lasso was drawn on.
    pub page_index: usize,
}

/// Holds the process-wide lasso state: at most one selection at a time.
#[derive(Debug, Clone, Default)]
pub struct LassoEngine {
    selection: Option<LassoSelection>,
}

impl LassoEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a completed gesture qualifies as a closed loop.
    ///
    /// Requires enough points to be deliberate, start and end near each
    /// other, and a non-degenerate bounding box (a zero-area path can never
    /// select anything).
    pub fn is_closed(points: &[Point]) -> bool {
        if points.len() < MIN_LASSO_POINTS {
            return false;
        }
        let start = points[0];
        let end = points[points.len() - 1];
        let distance = start.distance(end);
        debug!(
            "lasso closure check: {} points, start/end distance {:.1}",
            points.len(),
            distance
        );
        if distance >= CLOSE_DISTANCE {
            return false;
        }
        let bounds = path_bounds(points);
        bounds.width() > 0.0 && bounds.height() > 0.0
    }

    /// Finish a collecting gesture.
    ///
    /// A previously shown selection is cancelled first; if the new path is
    /// closed it becomes the active selection, otherwise the points are
    /// discarded. Returns the new selection, if any.
    pub fn complete(&mut self, points: Vec<Point>, page_index: usize) -> Option<&LassoSelection> {
        self.selection = None;
        if !Self::is_closed(&points) {
            return None;
        }
        let bounds = path_bounds(&points);
        self.selection = Some(LassoSelection {
            path: points,
            bounds,
            page_index,
        });
        self.selection.as_ref()
    }

    /// The currently shown selection, if any.
    pub fn selection(&self) -> Option<&LassoSelection> {
        self.selection.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.selection.is_some()
    }

    /// Discard the selection without modifying any surface.
    /// Returns true if there was one.
    pub fn cancel(&mut self) -> bool {
        self.selection.take().is_some()
    }

    /// Clear all ink inside the selection polygon on `surface`.
    ///
    /// Pixels are tested against the closed path with the even-odd fill
    /// rule, scanning the bounding box expanded by [`CLEAR_MARGIN`]. The
    /// margin affects the scanned region only; ink outside the polygon is
    /// never cleared, however close to the path. The even-odd rule makes
    /// self-intersecting paths deterministic: regions enclosed an even
    /// number of times are left alone. Returns true if a selection was
    /// applied; the caller persists the surface afterwards.
    pub fn confirm_delete(&mut self, surface: &mut Surface) -> bool {
        let Some(selection) = self.selection.take() else {
            return false;
        };
        let scan = selection
            .bounds
            .inflate(CLEAR_MARGIN, CLEAR_MARGIN)
            .intersect(surface.bounds());
        let x0 = scan.x0.floor() as i64;
        let x1 = scan.x1.ceil() as i64;
        let y0 = scan.y0.floor() as i64;
        let y1 = scan.y1.ceil() as i64;
        for y in y0..y1 {
            for x in x0..x1 {
                let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if point_in_polygon(center, &selection.path) {
                    surface.set_pixel(x, y, Rgba::transparent());
                }
            }
        }
        debug!(
            "lasso delete applied on page {} within {:?}",
            selection.page_index, selection.bounds
        );
        true
    }

    /// Redraw the collecting-phase trail onto an overlay surface.
    ///
    /// Dashed path, a disc marking the start point, and a fading guide line
    /// from the current end back to the start once the gesture is within
    /// [`GUIDE_DISTANCE`] of closing.
    pub fn draw_trail(points: &[Point], overlay: &mut Surface) {
        overlay.clear();
        if points.len() < 2 {
            return;
        }

        draw_dashed_polyline(overlay, points, TRAIL_WIDTH, TRAIL_COLOR, TRAIL_DASH);

        let start = points[0];
        overlay.fill_disc(
            start,
            START_MARKER_RADIUS,
            TRAIL_COLOR,
            CompositeMode::SourceOver,
        );

        let end = points[points.len() - 1];
        let distance = start.distance(end);
        if distance < GUIDE_DISTANCE {
            let fade = 1.0 - distance / GUIDE_DISTANCE;
            let guide = [end, start];
            draw_dashed_polyline(
                overlay,
                &guide,
                2.0,
                TRAIL_COLOR.with_alpha_scaled(fade),
                GUIDE_DASH,
            );
        }
    }
}

/// Axis-aligned bounding box of a point path.
pub fn path_bounds(points: &[Point]) -> Rect {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    if points.is_empty() {
        return Rect::ZERO;
    }
    Rect::new(min_x, min_y, max_x, max_y)
}

/// Even-odd point-in-polygon test against the implicitly closed path.
fn point_in_polygon(point: Point, path: &[Point]) -> bool {
    if path.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = path.len() - 1;
    for i in 0..path.len() {
        let pi = path[i];
        let pj = path[j];
        if (pi.y > point.y) != (pj.y > point.y)
            && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Stamp a dashed polyline by walking its arc length.
fn draw_dashed_polyline(
    surface: &mut Surface,
    points: &[Point],
    width: f64,
    color: Rgba,
    dash: (f64, f64),
) {
    let period = dash.0 + dash.1;
    let radius = width / 2.0;
    let mut arc = 0.0_f64;
    for w in points.windows(2) {
        let (from, to) = (w[0], w[1]);
        let dist = from.distance(to);
        if dist <= 0.0 {
            continue;
        }
        let steps = (dist / 0.5).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let s = arc + dist * t;
            if s % period < dash.0 {
                let p = Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t);
                surface.fill_disc(p, radius, color, CompositeMode::SourceOver);
            }
        }
        arc += dist;
    }
}
