use crate::types::{MarkerPosition, PositionAnswer, ViewportSize};

/// Which coordinate space the backend answers in.
///
/// This is fixed per deployment and documented at the backend contract
/// boundary — it is never inferred from the payload, because a mixed-up
/// convention produces proportionally wrong positions that are not
/// detectable as errors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CoordinateSpace {
    /// Answer coordinates are in [0,1] relative to the floor plan.
    /// Out-of-range values are clamped.
    Normalized,
    /// Answer coordinates are pixels in the floor plan's native (unscaled)
    /// resolution.
    NativePixels { width: f64, height: f64 },
}

/// Maps a backend answer into rendered-viewport pixels.
///
/// Returns `None` until the viewport has a non-zero laid-out size (and,
/// under the native-pixel convention, a usable native resolution).
pub fn project(
    answer: PositionAnswer,
    space: CoordinateSpace,
    viewport: ViewportSize,
) -> Option<MarkerPosition> {
    if !viewport.is_ready() {
        return None;
    }

    match space {
        CoordinateSpace::Normalized => {
            let x = answer.x.clamp(0.0, 1.0);
            let y = answer.y.clamp(0.0, 1.0);
            Some(MarkerPosition { x: x * viewport.width, y: y * viewport.height })
        }
        CoordinateSpace::NativePixels { width, height } => {
            if width <= 0.0 || height <= 0.0 {
                return None;
            }
            let scale_x = viewport.width / width;
            let scale_y = viewport.height / height;
            Some(MarkerPosition { x: answer.x * scale_x, y: answer.y * scale_y })
        }
    }
}
