use css::{Color, Display, StyleResolver, parse_stylesheet};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn author_sheet_over_default_sheet() {
    init_logging();
    let doc = html::parse(
        r#"<html><head><style>
            * { color: black }
            .x { color: blue }
            h1 { font-size: 10px }
        </style></head>
        <body><h1 class="x">Title</h1><p>body <a href="/">link</a></p></body></html>"#,
    );
    let author = parse_stylesheet(&html::traverse::style_text(&doc));
    let mut resolver = StyleResolver::with_defaults();
    resolver.add_stylesheet(&author);
    let root = resolver.resolve(&doc);

    let h1 = root.find(doc.first_element("h1").expect("h1")).expect("styled h1");
    assert_eq!(h1.color("color"), Color::rgb(0, 0, 255));
    assert_eq!(h1.font_size(), 10.0);
    assert_eq!(h1.display(), Display::Block);

    // The author `*` rule and the default `a` rule: type outranks universal.
    let a = root.find(doc.first_element("a").expect("a")).expect("styled a");
    assert_eq!(a.color("color"), Color::rgb(0, 0, 255));
    assert_eq!(a.keyword("text-decoration"), Some("underline"));
}

#[test]
fn styled_tree_mirrors_rendered_document() {
    init_logging();
    let doc = html::parse("<div>a<span>b</span><script>x()</script></div>");
    let root = StyleResolver::with_defaults().resolve(&doc);
    let div = root.find(doc.first_element("div").expect("div")).expect("styled div");
    let kinds: Vec<Option<&str>> = div.children.iter().map(|c| c.tag_name()).collect();
    assert_eq!(kinds, vec![None, Some("span")]);
}

#[test]
fn restyle_after_mutation_sees_new_attributes() {
    let mut doc = html::parse("<p id=t>x</p>");
    let sheet = parse_stylesheet(".on { color: red }");
    let p = doc.get_element_by_id("t").expect("p");

    let mut resolver = StyleResolver::with_defaults();
    resolver.add_stylesheet(&sheet);
    assert_eq!(resolver.resolve(&doc).find(p).expect("p").color("color"), Color::BLACK);

    doc.set_attribute(p, "class", "on");
    assert!(doc.needs_reflow());
    assert_eq!(
        resolver.resolve(&doc).find(p).expect("p").color("color"),
        Color::rgb(255, 0, 0)
    );
}
