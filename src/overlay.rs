use crate::types::{MarkerPosition, ViewportSize};

pub const DOT_RADIUS: f64 = 10.0;
pub const HALO_RADIUS: f64 = 18.0;

/// RGBA fill; channels 0-255, alpha 0..1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fill {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: f64,
}

pub const DOT_FILL: Fill = Fill { r: 255, g: 0, b: 0, alpha: 1.0 };
pub const HALO_FILL: Fill = Fill { r: 255, g: 0, b: 0, alpha: 0.25 };

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
    pub fill: Fill,
}

/// Drawable marker layer: spans exactly the rendered viewport, transparent
/// except for two concentric circles at the projected position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerOverlay {
    pub size: ViewportSize,
    pub dot: Circle,
    pub halo: Circle,
}

/// Pure derivation — no marker, no overlay. Mutates nothing.
pub fn render(marker: Option<MarkerPosition>, viewport: ViewportSize) -> Option<MarkerOverlay> {
    let marker = marker?;
    if !viewport.is_ready() {
        return None;
    }

    Some(MarkerOverlay {
        size: viewport,
        dot: Circle { cx: marker.x, cy: marker.y, radius: DOT_RADIUS, fill: DOT_FILL },
        halo: Circle { cx: marker.x, cy: marker.y, radius: HALO_RADIUS, fill: HALO_FILL },
    })
}
