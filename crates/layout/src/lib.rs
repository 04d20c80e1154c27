//! Box generation, block and inline layout, hit testing and the paint walk.
//!
//! The layout tree borrows the styled tree it was built from; rebuild it
//! after restyling. All coordinates are CSS px in document space.

mod block;
mod geometry;
mod hit_test;
mod inline;
mod paint;
mod replaced;
mod text;
mod tree;

pub use block::{MARKER_SIZE, layout_tree};
pub use geometry::{BoxModel, Edges, Rect};
pub use hit_test::{HitKind, HitResult, hit_test};
pub use inline::{FragmentContent, Line, LineFragment};
pub use paint::{PaintItem, display_list, walk};
pub use replaced::{IntrinsicSize, compute_replaced_size};
pub use text::{MonospaceMeasurer, RenderContext, TextMeasurer};
pub use tree::{LayoutKind, LayoutNode, build_layout_tree};
