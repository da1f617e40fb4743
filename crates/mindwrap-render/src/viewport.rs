//! Pan/zoom math for the drawing surface.
//!
//! Screen `x` is the layout depth axis (`y`) and screen `y` the sibling axis (`x`).

use crate::geom::{Point, Size, point};
use crate::model::{Bounds, PositionedNode};
use serde::{Deserialize, Serialize};

/// Zoom transform with d3 semantics: `screen = layout * k + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomTransform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ZoomTransform {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        k: 1.0,
    };

    pub fn new(x: f64, y: f64, k: f64) -> Self {
        Self { x, y, k }
    }

    /// Translation expressed in layout units (scaled by `k`).
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + self.k * dx,
            y: self.y + self.k * dy,
            k: self.k,
        }
    }

    pub fn scale(self, factor: f64) -> Self {
        Self {
            k: self.k * factor,
            ..self
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        point(p.x * self.k + self.x, p.y * self.k + self.y)
    }
}

/// Edge padding for [`ensure_view_delta`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Padding {
    pub fn uniform(value: f64) -> Self {
        Self {
            left: value,
            right: value,
            top: value,
            bottom: value,
        }
    }
}

/// Scale and center `bounds` in `viewport`, filling at most `fit_ratio` of it, never above 2x.
pub fn fit_transform(bounds: &Bounds, viewport: Size, fit_ratio: f64) -> ZoomTransform {
    let natural_width = bounds.width();
    let natural_height = bounds.height();
    let mut scale: f64 = 2.0;
    if natural_width > 0.0 {
        scale = scale.min(viewport.width / natural_width * fit_ratio);
    }
    if natural_height > 0.0 {
        scale = scale.min(viewport.height / natural_height * fit_ratio);
    }
    if !scale.is_finite() || scale <= 0.0 {
        scale = 1.0;
    }
    ZoomTransform {
        x: (viewport.width - natural_width * scale) / 2.0 - bounds.min_y * scale,
        y: (viewport.height - natural_height * scale) / 2.0 - bounds.min_x * scale,
        k: scale,
    }
}

/// Pan (in layout units) that brings `node` fully into view, or `None` when no pan applies.
///
/// On each axis the smaller of the two edge corrections is used, and only when both corrections
/// point the same way: an already visible node needs none, and a node larger than the viewport
/// would be clipped on the other side.
pub fn ensure_view_delta(
    node: &PositionedNode,
    spacing_horizontal: f64,
    transform: ZoomTransform,
    viewport: Size,
    padding: Padding,
) -> Option<(f64, f64)> {
    let k = transform.k;
    let left = node.y * k + transform.x;
    let right = (node.y + node.y_size - spacing_horizontal + 2.0) * k + transform.x;
    let top = (node.x - node.x_size / 2.0) * k + transform.y;
    let bottom = (node.x + node.x_size / 2.0) * k + transform.y;

    let axis = |low: f64, high: f64| {
        if low * high > 0.0 {
            let min = if low.abs() <= high.abs() { low } else { high };
            min / k
        } else {
            0.0
        }
    };
    let dx = axis(padding.left - left, viewport.width - padding.right - right);
    let dy = axis(padding.top - top, viewport.height - padding.bottom - bottom);
    if dx == 0.0 && dy == 0.0 {
        None
    } else {
        Some((dx, dy))
    }
}

/// Zoom by `factor` around the viewport center.
pub fn rescale_transform(transform: ZoomTransform, viewport: Size, factor: f64) -> ZoomTransform {
    let ZoomTransform { x, y, k } = transform;
    transform
        .translate(
            (viewport.width / 2.0 - x) * (1.0 - factor) / k,
            (viewport.height / 2.0 - y) * (1.0 - factor) / k,
        )
        .scale(factor)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GestureKind {
    Wheel,
    Drag,
    Pinch,
    DoubleClick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureInput {
    pub kind: GestureKind,
    pub ctrl: bool,
    /// Pressed mouse button, `0` for the primary button or none.
    pub button: u8,
}

impl GestureInput {
    pub fn wheel(ctrl: bool) -> Self {
        Self {
            kind: GestureKind::Wheel,
            ctrl,
            button: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelEvent {
    pub delta_x: f64,
    pub delta_y: f64,
    pub ctrl: bool,
}

/// Which gestures reach the zoom behavior. With `scroll_for_pan`, a plain wheel pans instead and
/// only ctrl+wheel zooms.
pub fn zoom_filter(input: &GestureInput, scroll_for_pan: bool) -> bool {
    let wheel = input.kind == GestureKind::Wheel;
    if scroll_for_pan && wheel {
        input.ctrl && input.button == 0
    } else {
        (!input.ctrl || wheel) && input.button == 0
    }
}

/// Transform after a plain wheel pan.
pub fn wheel_pan(transform: ZoomTransform, event: &WheelEvent) -> ZoomTransform {
    transform.translate(-event.delta_x / transform.k, -event.delta_y / transform.k)
}
