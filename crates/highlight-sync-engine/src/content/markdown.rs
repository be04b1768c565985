use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use super::{ContentTree, Element, NodeId};

impl ContentTree {
    /// Render a message's Markdown body into a content tree.
    ///
    /// Produces the element shapes a Markdown renderer would emit so that
    /// offsets computed here agree with the ones a browser would compute over
    /// the rendered message. Raw HTML is dropped.
    pub fn from_markdown(markdown: &str) -> Self {
        let mut tree = ContentTree::new();
        let mut builder = Builder {
            stack: vec![tree.root()],
            image: None,
        };

        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        for event in Parser::new_ext(markdown, options) {
            builder.handle(&mut tree, event);
        }
        tree
    }
}

struct Builder {
    stack: Vec<NodeId>,
    /// Open image element; its text events become the `alt` attribute.
    image: Option<NodeId>,
}

impl Builder {
    fn current(&self) -> NodeId {
        // The root is never popped, so the stack is never empty.
        self.stack[self.stack.len() - 1]
    }

    fn open(&mut self, tree: &mut ContentTree, element: Element) -> NodeId {
        let id = tree.append_element(self.current(), element);
        self.stack.push(id);
        id
    }

    fn close(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    fn text(&mut self, tree: &mut ContentTree, text: &str) {
        if let Some(image) = self.image {
            if let Some(element) = tree.element_mut(image) {
                let alt = format!("{}{}", element.attr("alt").unwrap_or_default(), text);
                element.set_attr("alt", alt);
            }
            return;
        }
        tree.append_text(self.current(), text);
    }

    fn handle(&mut self, tree: &mut ContentTree, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tree, tag),
            Event::End(TagEnd::CodeBlock) => {
                self.close();
                self.close();
            }
            Event::End(TagEnd::Image) => {
                self.image = None;
                self.close();
            }
            Event::End(_) => self.close(),
            Event::Text(text) => self.text(tree, &text),
            Event::Code(code) => {
                let id = tree.append_element(self.current(), Element::new("code"));
                tree.append_text(id, code.as_ref());
            }
            Event::SoftBreak => self.text(tree, "\n"),
            Event::HardBreak => {
                tree.append_element(self.current(), Element::new("br"));
            }
            Event::Rule => {
                tree.append_element(self.current(), Element::new("hr"));
            }
            _ => {}
        }
    }

    fn start(&mut self, tree: &mut ContentTree, tag: Tag<'_>) {
        match tag {
            Tag::CodeBlock(_) => {
                self.open(tree, Element::new("pre"));
                self.open(tree, Element::new("code"));
            }
            Tag::Link {
                dest_url, title, ..
            } => {
                let mut element = Element::new("a");
                element.set_attr("href", dest_url.as_ref());
                if !title.is_empty() {
                    element.set_attr("title", title.as_ref());
                }
                self.open(tree, element);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                let mut element = Element::new("img");
                element.set_attr("src", dest_url.as_ref());
                element.set_attr("alt", "");
                if !title.is_empty() {
                    element.set_attr("title", title.as_ref());
                }
                let id = self.open(tree, element);
                self.image = Some(id);
            }
            Tag::List(Some(start)) => {
                let mut element = Element::new("ol");
                if start != 1 {
                    element.set_attr("start", start.to_string());
                }
                self.open(tree, element);
            }
            other => {
                self.open(tree, Element::new(tag_name(&other)));
            }
        }
    }
}

fn tag_name(tag: &Tag<'_>) -> String {
    match tag {
        Tag::Paragraph => "p".to_string(),
        Tag::Heading { level, .. } => level.to_string(),
        Tag::BlockQuote(_) => "blockquote".to_string(),
        Tag::List(_) => "ul".to_string(),
        Tag::Item => "li".to_string(),
        Tag::Emphasis => "em".to_string(),
        Tag::Strong => "strong".to_string(),
        Tag::Strikethrough => "del".to_string(),
        Tag::Table(_) => "table".to_string(),
        Tag::TableHead => "thead".to_string(),
        Tag::TableRow => "tr".to_string(),
        Tag::TableCell => "td".to_string(),
        _ => "span".to_string(),
    }
}
