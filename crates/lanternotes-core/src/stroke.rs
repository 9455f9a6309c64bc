//! Stroke sessions: the paint operations between pointer-down and pointer-up.

use kurbo::Point;

use crate::surface::{CompositeMode, Rgba, Surface};

/// Ink stroke width in surface pixels.
pub const INK_WIDTH: f64 = 2.0;
/// Touch-erase stroke width; wider than ink so a finger can cover it.
pub const TOUCH_ERASE_WIDTH: f64 = 20.0;

/// What a stroke session does to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeMode {
    /// Opaque ink, source-over.
    Ink,
    /// Destructive clear, destination-out.
    Erase,
    /// Invisible stroke that only collects points for the lasso engine.
    Lasso,
}

impl StrokeMode {
    pub fn is_erase(self) -> bool {
        matches!(self, StrokeMode::Erase | StrokeMode::Lasso)
    }
}

/// One in-progress stroke.
///
/// Created on pointer-down and consumed on pointer-up/leave. The mode is
/// latched at creation and held for the stroke's full duration: a hardware
/// eraser tip that glitches its button state mid-stroke cannot flip an erase
/// stroke back to ink. Segments are committed to the surface as they arrive,
/// so partial strokes are visible during the gesture.
#[derive(Debug, Clone)]
pub struct StrokeSession {
    mode: StrokeMode,
    points: Vec<Point>,
    last: Point,
}

impl StrokeSession {
    /// Open a stroke at `start` (surface pixel coordinates) and stamp its cap.
    pub fn begin(surface: &mut Surface, start: Point, mode: StrokeMode) -> Self {
        match mode {
            StrokeMode::Ink => {
                surface.fill_disc(
                    start,
                    INK_WIDTH / 2.0,
                    Rgba::black(),
                    CompositeMode::SourceOver,
                );
            }
            StrokeMode::Erase => {
                surface.fill_disc(
                    start,
                    TOUCH_ERASE_WIDTH / 2.0,
                    Rgba::black(),
                    CompositeMode::DestinationOut,
                );
            }
            // Lasso strokes leave no ink; the trail overlay provides feedback.
            StrokeMode::Lasso => {}
        }
        Self {
            mode,
            points: vec![start],
            last: start,
        }
    }

    /// Append a segment and commit it to the surface immediately.
    pub fn extend(&mut self, surface: &mut Surface, to: Point) {
        match self.mode {
            StrokeMode::Ink => {
                surface.stroke_segment(
                    self.last,
                    to,
                    INK_WIDTH,
                    Rgba::black(),
                    CompositeMode::SourceOver,
                );
            }
            StrokeMode::Erase => {
                surface.stroke_segment(
                    self.last,
                    to,
                    TOUCH_ERASE_WIDTH,
                    Rgba::black(),
                    CompositeMode::DestinationOut,
                );
            }
            StrokeMode::Lasso => {}
        }
        self.points.push(to);
        self.last = to;
    }

    /// Close the stroke, yielding the recorded path.
    ///
    /// Composite state is per-operation on [`Surface`], so there is nothing
    /// to reset here; the caller persists the surface next.
    pub fn finish(self) -> Vec<Point> {
        self.points
    }

    pub fn mode(&self) -> StrokeMode {
        self.mode
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
}
