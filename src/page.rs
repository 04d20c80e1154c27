use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use css::{StyledNode, Stylesheet, parse_stylesheet, resolve_styles};
use html::head::{HeadMetadata, extract_head_metadata};
use html::{Document, NodeId, traverse};
use js::{JsError, Value, Vm};
use layout::{LayoutNode, RenderContext, hit_test, layout_tree};
use net::{LoadConfig, LoadError};
use thiserror::Error;
use url::Url;

use crate::bindings::{self, DomState, SharedDom};
use crate::canvas::CanvasCommand;

pub const DEFAULT_VIEWPORT_WIDTH: f32 = 800.0;

#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// One loaded document with its styles, script engine and the host
/// resources layout needs.
///
/// Script mutations only flag the document; [`Page::restyle`] picks them up.
pub struct Page {
    dom: SharedDom,
    url: Option<Url>,
    head: HeadMetadata,
    linked: Vec<Stylesheet>,
    inline: Stylesheet,
    styled: StyledNode,
    render: RenderContext,
    vm: Vm,
    viewport_width: f32,
    script_errors: Vec<JsError>,
}

impl Page {
    pub fn new(markup: &str, render: RenderContext) -> Self {
        Self::from_document(html::parse(markup), None, Vec::new(), render)
    }

    /// Fetches `url` and the stylesheets and images it references. Failed
    /// subresources are skipped; only the document itself must load.
    pub fn load_url(url: &str, mut render: RenderContext) -> Result<Self, PageError> {
        let url = net::resolve(url, None)?;
        let config = LoadConfig::default();
        let mut body = Vec::new();
        net::load_url(&url, &config, |bytes| body.extend_from_slice(bytes))?;
        let document = html::parse(&String::from_utf8_lossy(&body));

        let head = extract_head_metadata(&document);
        let base = head
            .base_href
            .as_deref()
            .and_then(|href| net::resolve(href, Some(&url)).ok())
            .unwrap_or_else(|| url.clone());

        let mut linked = Vec::new();
        for href in head.stylesheet_hrefs() {
            if let Some(text) = fetch_text(href, &base, &config) {
                linked.push(parse_stylesheet(&text));
            }
        }

        let sources: Vec<String> = document
            .elements_by_tag_name("img")
            .filter_map(|id| document.element(id)?.attribute("src"))
            .map(str::to_string)
            .collect();
        for src in sources {
            if let Some((width, height)) = fetch_image_size(&src, &base, &config) {
                render.set_image_size(src, width as f32, height as f32);
            }
        }

        Ok(Self::from_document(document, Some(url), linked, render))
    }

    fn from_document(
        document: Document,
        url: Option<Url>,
        linked: Vec<Stylesheet>,
        render: RenderContext,
    ) -> Self {
        let head = extract_head_metadata(&document);
        let inline = parse_stylesheet(&traverse::style_text(&document));
        let mut sheets: Vec<&Stylesheet> = linked.iter().collect();
        sheets.push(&inline);
        let styled = resolve_styles(&document, &sheets);
        drop(sheets);

        let dom: SharedDom = Rc::new(RefCell::new(DomState {
            document,
            canvases: HashMap::new(),
            alerts: Vec::new(),
        }));
        dom.borrow_mut().document.mark_reflowed();
        let mut vm = Vm::new();
        bindings::install(&mut vm, &dom);

        let mut page = Self {
            dom,
            url,
            head,
            linked,
            inline,
            styled,
            render,
            vm,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            script_errors: Vec::new(),
        };
        page.run_inline_scripts();
        page.restyle();
        page
    }

    fn run_inline_scripts(&mut self) {
        let scripts = traverse::inline_scripts(&self.dom.borrow().document);
        log::debug!(target: "page", "running {} inline scripts", scripts.len());
        for source in scripts {
            // A failing script does not stop the ones after it.
            let _ = self.run_script(&source);
        }
    }

    /// Runs `source` as a top-level script against this page's globals.
    pub fn run_script(&mut self, source: &str) -> Result<Value, JsError> {
        self.vm.interpret(source).inspect_err(|err| {
            log::warn!(target: "page", "script error: {err}");
            self.script_errors.push(err.clone());
        })
    }

    /// Rebuilds the styled tree if the document changed since the last
    /// restyle. Returns whether it did.
    pub fn restyle(&mut self) -> bool {
        let mut state = self.dom.borrow_mut();
        if !state.document.needs_reflow() {
            return false;
        }
        self.inline = parse_stylesheet(&traverse::style_text(&state.document));
        let mut sheets: Vec<&Stylesheet> = self.linked.iter().collect();
        sheets.push(&self.inline);
        self.styled = resolve_styles(&state.document, &sheets);
        self.head = extract_head_metadata(&state.document);
        state.document.mark_reflowed();
        log::debug!(target: "page", "restyled {} nodes", state.document.len());
        true
    }

    /// A fresh layout of the current styled tree.
    pub fn layout(&self, viewport_width: f32) -> LayoutNode<'_> {
        layout_tree(&self.styled, viewport_width, &self.render)
    }

    /// Sets the width [`Page::click`] lays out against.
    pub fn resize(&mut self, viewport_width: f32) {
        if viewport_width != self.viewport_width {
            log::debug!(target: "page", "viewport {} -> {viewport_width}", self.viewport_width);
            self.viewport_width = viewport_width;
        }
    }

    pub fn viewport_width(&self) -> f32 {
        self.viewport_width
    }

    /// Dispatches a click at `(x, y)` in layout coordinates: runs the
    /// `onclick` script of the nearest element that has one, with `this` bound
    /// to that element, and returns the `href` when a link was hit.
    pub fn click(&mut self, x: f32, y: f32) -> Option<String> {
        self.restyle();
        let (node, href) = {
            let tree = self.layout(self.viewport_width);
            let hit = hit_test(&tree, (x, y))?;
            (hit.node_id, hit.href)
        };

        let handler = {
            let state = self.dom.borrow();
            traverse::closest_with_attribute(&state.document, node, "onclick")
                .map(|(target, source)| (target, source.to_string()))
        };
        if let Some((target, source)) = handler {
            log::debug!(target: "page", "onclick on {target}");
            let this = bindings::wrap_node(&mut self.vm, &self.dom, target);
            let result = Vm::compile(&source).and_then(|proto| self.vm.execute(proto, this));
            if let Err(err) = result {
                log::warn!(target: "page", "onclick error: {err}");
                self.script_errors.push(err);
            }
            self.restyle();
        }
        href
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn title(&self) -> Option<&str> {
        self.head.title.as_deref()
    }

    pub fn document(&self) -> Ref<'_, Document> {
        Ref::map(self.dom.borrow(), |state| &state.document)
    }

    pub fn styled(&self) -> &StyledNode {
        &self.styled
    }

    pub fn render_context(&self) -> &RenderContext {
        &self.render
    }

    pub fn vm_mut(&mut self) -> &mut Vm {
        &mut self.vm
    }

    /// Drawing commands recorded for the canvas element `canvas`, oldest
    /// first.
    pub fn canvas_commands(&self, canvas: NodeId) -> Vec<CanvasCommand> {
        self.dom
            .borrow()
            .canvases
            .get(&canvas)
            .cloned()
            .unwrap_or_default()
    }

    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.dom.borrow_mut().alerts)
    }

    pub fn take_console(&mut self) -> Vec<String> {
        self.vm.take_console()
    }

    /// Every error raised by page scripts so far, in order.
    pub fn script_errors(&self) -> &[JsError] {
        &self.script_errors
    }
}

fn fetch_text(href: &str, base: &Url, config: &LoadConfig) -> Option<String> {
    let url = net::resolve(href, Some(base)).ok()?;
    let mut text = None;
    net::load_url(&url, config, |bytes| {
        text = Some(String::from_utf8_lossy(bytes).into_owned())
    })
    .ok()?;
    text
}

/// Decoded size of the image at `src`; `None` leaves the box empty.
fn fetch_image_size(src: &str, base: &Url, config: &LoadConfig) -> Option<(u32, u32)> {
    let url = net::resolve(src, Some(base)).ok()?;
    let mut decoded = None;
    net::load_url(&url, config, |bytes| decoded = Some(image::load_from_memory(bytes)))
        .ok()?;
    match decoded? {
        Ok(img) => Some((img.width(), img.height())),
        Err(err) => {
            log::warn!(target: "page", "decoding {url}: {err}");
            None
        }
    }
}
