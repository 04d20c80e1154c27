//! Sizing for replaced content (`img`, `canvas`).

use css::StyledNode;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IntrinsicSize {
    pub width: Option<f32>,
    pub height: Option<f32>,
    /// width / height
    pub ratio: Option<f32>,
}

impl IntrinsicSize {
    pub fn from_w_h(width: Option<f32>, height: Option<f32>) -> Self {
        let ratio = match (width, height) {
            (Some(w), Some(h)) if h > 0.0 => Some(w / h),
            _ => None,
        };
        Self {
            width,
            height,
            ratio,
        }
    }
}

fn clamp(v: f32, min: Option<f32>, max: Option<f32>) -> f32 {
    let mut out = v;
    if let Some(mx) = max {
        out = out.min(mx);
    }
    if let Some(mn) = min {
        out = out.max(mn);
    }
    out
}

/// Used `(width, height)` in px for a replaced box.
///
/// CSS `width`/`height` override the intrinsic size; a single specified
/// dimension scales the other by the intrinsic ratio. `min-width`/`max-width`
/// clamp the width and an auto height follows it. `available_w` shrinks boxes
/// that would overflow their line.
pub fn compute_replaced_size(
    style: &StyledNode,
    intrinsic: IntrinsicSize,
    containing_width: f32,
    available_w: Option<f32>,
) -> (f32, f32) {
    let w_spec = style.length_px("width", containing_width);
    // Percentage heights need a definite containing height, which we never have.
    let h_spec = match style.value("height") {
        Some(css::Value::Percentage(_)) => None,
        _ => style.length_px("height", 0.0),
    };
    let min_w = style.length_px("min-width", containing_width);
    let max_w = style.length_px("max-width", containing_width);

    let height_is_auto = h_spec.is_none();
    let ratio = intrinsic.ratio;

    let (mut w, mut h) = match (w_spec, h_spec, ratio) {
        (Some(w), Some(h), _) => (w, h),
        (Some(w), None, Some(r)) => (w, w / r),
        (Some(w), None, None) => (w, intrinsic.height.unwrap_or(0.0)),
        (None, Some(h), Some(r)) => (h * r, h),
        (None, Some(h), None) => (intrinsic.width.unwrap_or(0.0), h),
        (None, None, _) => (
            intrinsic.width.unwrap_or(0.0),
            intrinsic.height.unwrap_or(0.0),
        ),
    };

    let before = w;
    w = clamp(w, min_w, max_w);
    if let Some(avail) = available_w {
        if avail.is_finite() && avail > 0.0 && w > avail {
            w = avail;
        }
    }
    if (w - before).abs() > f32::EPSILON && height_is_auto {
        if let Some(r) = ratio {
            h = w / r;
        }
    }

    (w.max(0.0), h.max(0.0))
}
