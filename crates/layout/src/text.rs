use std::collections::HashMap;

use css::StyledNode;

use crate::replaced::IntrinsicSize;

/// Font metrics collaborator. Layout depends on this without knowing how the
/// host renders text.
pub trait TextMeasurer {
    /// Width of `text` in CSS px when rendered with `style`.
    fn measure(&self, text: &str, style: &StyledNode) -> f32;

    /// Line height in CSS px for `style`.
    fn line_height(&self, style: &StyledNode) -> f32;
}

/// Fixed advance per character; line height is 1.2 × font size.
#[derive(Clone, Copy, Debug)]
pub struct MonospaceMeasurer {
    pub char_width: f32,
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self { char_width: 10.0 }
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure(&self, text: &str, _style: &StyledNode) -> f32 {
        text.chars().count() as f32 * self.char_width
    }

    fn line_height(&self, style: &StyledNode) -> f32 {
        style.font_size() * 1.2
    }
}

/// Resources layout needs from the host for one render session: the text
/// measurer and the intrinsic sizes of loaded images, keyed by `src`.
pub struct RenderContext {
    measurer: Box<dyn TextMeasurer>,
    images: HashMap<String, (f32, f32)>,
}

impl RenderContext {
    pub fn new(measurer: impl TextMeasurer + 'static) -> Self {
        Self {
            measurer: Box::new(measurer),
            images: HashMap::new(),
        }
    }

    pub fn measurer(&self) -> &dyn TextMeasurer {
        self.measurer.as_ref()
    }

    pub fn set_image_size(&mut self, src: impl Into<String>, width: f32, height: f32) {
        self.images.insert(src.into(), (width, height));
    }

    /// Intrinsic size of an `img` or `canvas`. A missing image is empty
    /// (zero-sized) unless its attributes give a size; a canvas defaults to
    /// 300×150.
    pub fn intrinsic_size(&self, style: &StyledNode) -> IntrinsicSize {
        let attr_px = |name: &str| {
            style
                .attribute(name)
                .and_then(|v| v.trim().trim_end_matches("px").parse::<f32>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
        };
        match style.tag_name() {
            Some("canvas") => IntrinsicSize::from_w_h(
                Some(attr_px("width").unwrap_or(300.0)),
                Some(attr_px("height").unwrap_or(150.0)),
            ),
            Some("img") => {
                let loaded = style.attribute("src").and_then(|src| self.images.get(src));
                match loaded {
                    Some(&(w, h)) => IntrinsicSize::from_w_h(Some(w), Some(h)),
                    None => IntrinsicSize::from_w_h(
                        Some(attr_px("width").unwrap_or(0.0)),
                        Some(attr_px("height").unwrap_or(0.0)),
                    ),
                }
            }
            _ => IntrinsicSize::default(),
        }
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(MonospaceMeasurer::default())
    }
}
