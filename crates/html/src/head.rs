use crate::dom::{Document, NodeId};

#[derive(Debug, Clone, Default)]
pub struct HeadMetadata {
    pub title: Option<String>,
    pub meta: Vec<MetaTag>,
    pub links: Vec<LinkTag>,
    pub base_href: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MetaTag {
    pub name: Option<String>,
    pub content: Option<String>,
    pub charset: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LinkTag {
    pub rel: Vec<String>,
    pub href: Option<String>,
}

impl HeadMetadata {
    /// `href`s of `<link rel="stylesheet">` elements.
    pub fn stylesheet_hrefs(&self) -> impl Iterator<Item = &str> {
        self.links
            .iter()
            .filter(|l| l.rel.iter().any(|r| r.eq_ignore_ascii_case("stylesheet")))
            .filter_map(|l| l.href.as_deref())
    }
}

pub fn extract_head_metadata(doc: &Document) -> HeadMetadata {
    let mut meta = HeadMetadata::default();
    if let Some(head) = doc.first_element("head") {
        fill_head_metadata_from(doc, head, &mut meta);
    }
    meta
}

fn fill_head_metadata_from(doc: &Document, head: NodeId, out: &mut HeadMetadata) {
    for &child in doc.children(head) {
        let Some(el) = doc.element(child) else {
            continue;
        };
        match el.name.as_str() {
            "title" if out.title.is_none() => {
                let text = doc.text_content(child);
                let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
                out.title = Some(collapsed);
            }
            "meta" => out.meta.push(MetaTag {
                name: el.attribute("name").map(str::to_string),
                content: el.attribute("content").map(str::to_string),
                charset: el.attribute("charset").map(str::to_string),
            }),
            "link" => out.links.push(LinkTag {
                rel: el
                    .attribute("rel")
                    .unwrap_or("")
                    .split_ascii_whitespace()
                    .map(str::to_string)
                    .collect(),
                href: el.attribute("href").map(str::to_string),
            }),
            "base" if out.base_href.is_none() => {
                out.base_href = el.attribute("href").map(str::to_string);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn collects_title_links_and_base() {
        let doc = parse(
            r#"<head><title>  My
  Page </title><meta charset="utf-8"><link rel="stylesheet" href="a.css"><link rel="icon" href="f.ico"><base href="http://x/"></head>"#,
        );
        let meta = extract_head_metadata(&doc);
        assert_eq!(meta.title.as_deref(), Some("My Page"));
        assert_eq!(meta.meta[0].charset.as_deref(), Some("utf-8"));
        assert_eq!(meta.stylesheet_hrefs().collect::<Vec<_>>(), vec!["a.css"]);
        assert_eq!(meta.base_href.as_deref(), Some("http://x/"));
    }
}
