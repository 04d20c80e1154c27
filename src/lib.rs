//! A small web rendering engine: markup and style parsing, block and inline
//! layout, and a bytecode script engine with DOM and canvas bindings.
//!
//! The pipeline crates are re-exported; [`Page`] drives them for one
//! document.
//!
//! ```
//! use render_engine::{Page, RenderContext};
//!
//! let mut page = Page::new(
//!     "<p id=greeting>hi</p><script>document.getElementById('greeting').setTextContent('hello');</script>",
//!     RenderContext::default(),
//! );
//! assert!(page.document().dump().contains("hello"));
//! assert!(page.take_alerts().is_empty());
//! ```

mod bindings;
mod canvas;
mod page;

pub use canvas::CanvasCommand;
pub use page::{DEFAULT_VIEWPORT_WIDTH, Page, PageError};

pub use css;
pub use html;
pub use js;
pub use layout;
pub use layout::RenderContext;
pub use net;
