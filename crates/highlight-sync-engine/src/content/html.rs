use super::{ContentTree, Element, NodeId, NodeKind};

const VOID_TAGS: &[&str] = &["br", "hr", "img", "input"];

/// Serialise a node and its subtree as markup.
pub fn to_html(tree: &ContentTree, id: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, id, &mut out);
    out
}

/// Serialise only the children of a node, as `innerHTML` would.
pub fn inner_html(tree: &ContentTree, id: NodeId) -> String {
    let mut out = String::new();
    for child in tree.children(id) {
        write_node(tree, *child, &mut out);
    }
    out
}

fn write_node(tree: &ContentTree, id: NodeId, out: &mut String) {
    match &tree.node(id).kind {
        NodeKind::Text(text) => {
            out.push_str(&html_escape::encode_text(text));
        }
        NodeKind::Element(element) => {
            write_open_tag(element, out);
            if VOID_TAGS.contains(&element.tag.as_str()) {
                return;
            }
            for child in tree.children(id) {
                write_node(tree, *child, out);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
    }
}

fn write_open_tag(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.tag);
    for (name, value) in &element.attrs {
        write_attr(name, value, out);
    }
    if let Some(marker) = &element.marker {
        write_attr("data-highlight-id", &marker.id.to_string(), out);
        write_attr("data-color", &marker.color, out);
        write_attr(
            "style",
            &format!("background-color: {}", marker.presentation),
            out,
        );
        if marker.pending {
            write_attr("data-pending", "true", out);
        }
    }
    out.push('>');
}

fn write_attr(name: &str, value: &str, out: &mut String) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&html_escape::encode_double_quoted_attribute(value));
    out.push('"');
}
