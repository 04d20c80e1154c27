use css::{Color, StyledNode, parse_stylesheet, resolve_styles};
use html::{Document, NodeId};
use layout::{
    FragmentContent, HitKind, LayoutKind, LayoutNode, MARKER_SIZE, PaintItem, Rect, RenderContext,
    display_list, hit_test, layout_tree,
};

const LINE: f32 = 16.0 * 1.2;

fn assert_close(a: f32, b: f32) {
    assert!((a - b).abs() <= 0.001, "expected {a} ~ {b}");
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Parses and styles `markup` with the body margin removed so content starts
/// at the origin.
fn styled(markup: &str) -> (Document, StyledNode) {
    init_logging();
    let doc = html::parse(markup);
    let sheet = parse_stylesheet("body { margin: 0px }");
    let root = resolve_styles(&doc, &[&sheet]);
    (doc, root)
}

fn element(doc: &Document, tag: &str) -> NodeId {
    doc.first_element(tag)
        .unwrap_or_else(|| panic!("missing <{tag}>"))
}

fn words(node: &LayoutNode<'_>) -> Vec<Vec<String>> {
    node.lines
        .iter()
        .map(|l| {
            l.fragments
                .iter()
                .filter_map(|f| f.text().map(str::to_string))
                .collect()
        })
        .collect()
}

#[test]
fn words_break_at_the_first_overflowing_word() {
    let (doc, root) = styled("<div style=\"width: 100px\">aaa bbb ccc dd</div>");
    let ctx = RenderContext::default();
    let tree = layout_tree(&root, 800.0, &ctx);
    let div = tree.find(element(&doc, "div")).expect("div box");

    assert_eq!(words(div), vec![vec!["aaa", "bbb"], vec!["ccc", "dd"]]);
    let fragments: usize = div.lines.iter().map(|l| l.fragments.len()).sum();
    assert_eq!(fragments, 4);

    let second = &div.lines[1].fragments;
    assert_eq!(second[0].rect.x, 0.0);
    assert_close(second[0].rect.y, LINE);
    assert_eq!(second[1].rect.x, 40.0);
    assert_close(div.dimensions.content.height, 2.0 * LINE);
}

#[test]
fn a_word_ending_exactly_at_the_edge_stays_on_the_line() {
    let (doc, root) = styled("<div style=\"width: 100px\">aaaa bbbbb c</div>");
    let ctx = RenderContext::default();
    let tree = layout_tree(&root, 800.0, &ctx);
    let div = tree.find(element(&doc, "div")).expect("div box");
    assert_eq!(words(div), vec![vec!["aaaa", "bbbbb"], vec!["c"]]);
}

#[test]
fn an_overlong_word_gets_its_own_line() {
    let (doc, root) = styled("<div style=\"width: 50px\">a abcdefghij b</div>");
    let ctx = RenderContext::default();
    let tree = layout_tree(&root, 800.0, &ctx);
    let div = tree.find(element(&doc, "div")).expect("div box");
    assert_eq!(words(div), vec![vec!["a"], vec!["abcdefghij"], vec!["b"]]);
    assert_eq!(div.lines[1].fragments[0].rect.width, 100.0);
}

#[test]
fn preformatted_text_breaks_only_at_newlines() {
    let (doc, root) = styled(
        "<pre style=\"width: 50px; margin-top: 0px\">first line\nsecond\n\nlast</pre>",
    );
    let ctx = RenderContext::default();
    let tree = layout_tree(&root, 800.0, &ctx);
    let pre = tree.find(element(&doc, "pre")).expect("pre box");

    assert_eq!(pre.lines.len(), 4);
    assert_eq!(
        pre.lines[0].fragments[0].content,
        FragmentContent::Text("first line".into())
    );
    assert_eq!(pre.lines[0].fragments[0].rect.width, 100.0);
    assert!(pre.lines[2].fragments.is_empty());
    assert_close(pre.lines[2].rect.height, LINE);
    assert_close(pre.lines[3].rect.y, 3.0 * LINE);
}

#[test]
fn centered_lines_split_the_leftover_width() {
    let (doc, root) = styled("<div style=\"width: 200px; text-align: center\">abc</div>");
    let ctx = RenderContext::default();
    let tree = layout_tree(&root, 800.0, &ctx);
    let div = tree.find(element(&doc, "div")).expect("div box");
    assert_eq!(div.lines[0].fragments[0].rect.x, 85.0);

    let (doc, root) = styled("<div style=\"width: 200px; text-align: right\">abc</div>");
    let tree = layout_tree(&root, 800.0, &ctx);
    let div = tree.find(element(&doc, "div")).expect("div box");
    assert_eq!(div.lines[0].fragments[0].rect.x, 170.0);
}

#[test]
fn blocks_stack_below_anonymous_line_boxes() {
    let (doc, root) = styled("<div>intro<p style=\"margin-top: 10px\">para</p>tail</div>");
    let ctx = RenderContext::default();
    let tree = layout_tree(&root, 800.0, &ctx);
    let div = tree.find(element(&doc, "div")).expect("div box");

    assert_eq!(div.children.len(), 3);
    assert!(div.children[0].anonymous && div.children[2].anonymous);
    let p = &div.children[1];
    assert_close(p.dimensions.content.y, LINE + 10.0);
    assert_eq!(p.dimensions.content.width, 800.0);
    assert_close(
        div.children[2].dimensions.content.y,
        p.dimensions.margin_box().bottom(),
    );
    assert_eq!(words(&div.children[2]), vec![vec!["tail"]]);
}

#[test]
fn auto_margins_center_a_fixed_width_block() {
    let (doc, root) =
        styled("<div style=\"width: 200px; margin-left: auto; margin-right: auto\">x</div>");
    let ctx = RenderContext::default();
    let tree = layout_tree(&root, 800.0, &ctx);
    let div = tree.find(element(&doc, "div")).expect("div box");
    assert_eq!(div.dimensions.content.x, 300.0);
    assert_eq!(div.dimensions.margin.right, 300.0);
}

#[test]
fn percentage_width_and_padding_use_the_containing_block() {
    let (doc, root) = styled("<div style=\"width: 50%; padding-left: 10%\">x</div>");
    let ctx = RenderContext::default();
    let tree = layout_tree(&root, 600.0, &ctx);
    let div = tree.find(element(&doc, "div")).expect("div box");
    assert_eq!(div.dimensions.content.width, 300.0);
    assert_eq!(div.dimensions.content.x, 60.0);
}

#[test]
fn max_width_clamps_auto_width() {
    let (doc, root) = styled("<div style=\"max-width: 120px\">x</div>");
    let ctx = RenderContext::default();
    let tree = layout_tree(&root, 800.0, &ctx);
    let div = tree.find(element(&doc, "div")).expect("div box");
    assert_eq!(div.dimensions.content.width, 120.0);
}

#[test]
fn explicit_height_overrides_content_height() {
    let (doc, root) = styled("<div style=\"height: 50px\">x</div><p style=\"margin-top: 0px\">y</p>");
    let ctx = RenderContext::default();
    let tree = layout_tree(&root, 800.0, &ctx);
    let p = tree.find(element(&doc, "p")).expect("p box");
    assert_eq!(p.dimensions.content.y, 50.0);
}

#[test]
fn list_marker_sits_left_of_the_item_and_is_centered() {
    let (doc, root) = styled("<ul style=\"margin-top: 0px\"><li>item</li></ul>");
    let ctx = RenderContext::default();
    let tree = layout_tree(&root, 800.0, &ctx);
    let li = tree.find(element(&doc, "li")).expect("li box");

    assert_eq!(li.dimensions.content.x, 40.0);
    let marker = &li.children[0];
    assert_eq!(marker.kind, LayoutKind::ListItemMarker);
    let rect = marker.dimensions.content;
    assert_eq!((rect.width, rect.height), (MARKER_SIZE, MARKER_SIZE));
    assert_eq!(rect.x, 24.0);
    assert_close(rect.y, (LINE - MARKER_SIZE) / 2.0);

    let markers = display_list(&tree)
        .into_iter()
        .filter(|item| matches!(item, PaintItem::Marker { .. }))
        .count();
    assert_eq!(markers, 1);
}

#[test]
fn images_use_loaded_size_and_canvas_defaults() {
    let (doc, root) = styled("<p style=\"margin-top: 0px\"><img src=\"a.png\"><canvas></canvas></p>");
    let mut ctx = RenderContext::default();
    ctx.set_image_size("a.png", 50.0, 20.0);
    let tree = layout_tree(&root, 800.0, &ctx);

    let img = tree.find(element(&doc, "img")).expect("img box");
    assert_eq!(img.dimensions.content, Rect::new(0.0, 0.0, 50.0, 20.0));
    let canvas = tree.find(element(&doc, "canvas")).expect("canvas box");
    assert_eq!(canvas.dimensions.content.width, 300.0);
    assert_eq!(canvas.dimensions.content.height, 150.0);

    let p = tree.find(element(&doc, "p")).expect("p box");
    assert_eq!(p.lines.len(), 1);
    assert_eq!(p.dimensions.content.height, 150.0);
}

#[test]
fn missing_images_collapse_to_nothing() {
    let (doc, root) = styled("<p><img src=\"gone.png\"></p>");
    let ctx = RenderContext::default();
    let tree = layout_tree(&root, 800.0, &ctx);
    let img = tree.find(element(&doc, "img")).expect("img box");
    assert_eq!(img.dimensions.content.width, 0.0);
    assert_eq!(img.dimensions.content.height, 0.0);
}

#[test]
fn hit_test_finds_link_text_and_its_href() {
    let (doc, root) = styled("<p style=\"margin-top: 0px\">go <a href=\"/next\">here</a></p>");
    let ctx = RenderContext::default();
    let tree = layout_tree(&root, 800.0, &ctx);

    let hit = hit_test(&tree, (35.0, 5.0)).expect("hit");
    assert_eq!(hit.kind, HitKind::Link);
    assert_eq!(hit.href.as_deref(), Some("/next"));
    assert_eq!(hit.local_pos, (5.0, 5.0));
    let a = element(&doc, "a");
    assert_eq!(doc.parent(hit.node_id), Some(a));

    let plain = hit_test(&tree, (5.0, 5.0)).expect("hit");
    assert_eq!(plain.kind, HitKind::Text);
    assert_eq!(plain.href, None);

    let blank = hit_test(&tree, (500.0, 5.0)).expect("hit");
    assert_eq!(blank.kind, HitKind::BlockBox);
    assert_eq!(blank.node_id, element(&doc, "p"));
}

#[test]
fn hit_test_outside_the_document_misses() {
    let (_, root) = styled("<p>x</p>");
    let ctx = RenderContext::default();
    let tree = layout_tree(&root, 800.0, &ctx);
    assert!(hit_test(&tree, (-1.0, 5.0)).is_none());
    assert!(hit_test(&tree, (10.0, 10_000.0)).is_none());
}

#[test]
fn paint_order_is_background_then_text() {
    let (_, root) = styled(
        "<div style=\"background-color: red\"><p style=\"margin-top: 0px; margin-bottom: 0px\">hi</p></div>",
    );
    let ctx = RenderContext::default();
    let tree = layout_tree(&root, 800.0, &ctx);
    let items = display_list(&tree);

    assert_eq!(items.len(), 2);
    match &items[0] {
        PaintItem::Rect { rect, color } => {
            assert_eq!(*color, Color::rgb(255, 0, 0));
            assert_eq!(rect.width, 800.0);
            assert_close(rect.height, LINE);
        }
        other => panic!("expected background, got {other:?}"),
    }
    match &items[1] {
        PaintItem::Text { text, link, .. } => {
            assert_eq!(text, "hi");
            assert!(!link);
        }
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn reflow_tracks_the_viewport_width() {
    let (doc, root) = styled("<div>aaa bbb ccc</div>");
    let ctx = RenderContext::default();
    let mut tree = layout_tree(&root, 800.0, &ctx);
    assert_eq!(tree.line_count(), 1);

    tree.reflow(70.0, &ctx);
    let div = tree.find(element(&doc, "div")).expect("div box");
    assert_eq!(words(div), vec![vec!["aaa", "bbb"], vec!["ccc"]]);
    assert_eq!(div.dimensions.content.width, 70.0);
}
