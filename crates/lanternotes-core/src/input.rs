//! Normalized pointer events and drawing-intent classification.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Hardware source of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerType {
    Mouse,
    Pen,
    Touch,
}

/// A normalized pointer event as supplied by the input collaborator.
///
/// `button` and `buttons` carry the raw device encodings; the eraser-tip
/// heuristic below depends on their exact values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Position in client coordinates.
    pub position: Point,
    pub pointer_type: PointerType,
    /// Button that changed state (-1 for moves).
    pub button: i16,
    /// Bitmask of buttons currently held.
    pub buttons: u16,
    /// Stylus pressure, 0.0..=1.0.
    pub pressure: f64,
}

impl PointerEvent {
    pub fn mouse(position: Point, button: i16, buttons: u16) -> Self {
        Self {
            position,
            pointer_type: PointerType::Mouse,
            button,
            buttons,
            pressure: 0.5,
        }
    }

    pub fn pen(position: Point, button: i16, buttons: u16, pressure: f64) -> Self {
        Self {
            position,
            pointer_type: PointerType::Pen,
            button,
            buttons,
            pressure,
        }
    }

    pub fn touch(position: Point) -> Self {
        Self {
            position,
            pointer_type: PointerType::Touch,
            button: 0,
            buttons: 1,
            pressure: 1.0,
        }
    }
}

/// What a pointer-down gesture is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerIntent {
    Ink,
    Erase,
    Pan,
}

/// Detect a hardware stylus eraser tip.
///
/// Button/bitmask patterns observed on Asus Active Stylus hardware:
/// eraser reports button 5 with buttons 32 most commonly, some models
/// report button 2 + buttons 2 or button 0 + buttons 32. Inherently
/// device-specific, which is why it is isolated here.
pub fn is_hardware_eraser(event: &PointerEvent) -> bool {
    event.pointer_type == PointerType::Pen
        && (event.button == 5
            || event.buttons == 32
            || (event.button == 2 && event.buttons == 2)
            || (event.button == 0 && event.buttons == 32))
}

/// Classify a pointer-down event into a drawing intent.
///
/// Panning intent (right button on non-pen hardware) is checked before draw
/// dispatch; a hardware eraser tip forces erase regardless of the UI's
/// active tool, as does an active eraser toggle.
pub fn classify_pointer_intent(event: &PointerEvent, eraser_active: bool) -> PointerIntent {
    if event.button == 2 && event.pointer_type != PointerType::Pen {
        return PointerIntent::Pan;
    }
    if eraser_active || is_hardware_eraser(event) {
        return PointerIntent::Erase;
    }
    PointerIntent::Ink
}
