//! Markdown parsing: pulldown-cmark event stream into a typed document tree.

use std::collections::BTreeMap;
use std::sync::Arc;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use smol_str::SmolStr;
use vellum_model::{attrs, AttrValue, Attrs, Mark, Node, Schema};

use crate::error::EditorError;
use crate::options::EmbedDescriptor;

/// An open block during parsing.
struct Frame {
    type_name: SmolStr,
    attrs: Attrs,
    children: Vec<Node>,
    /// Discard children instead of building a node (unsupported blocks).
    ignore: bool,
}

impl Frame {
    fn node(type_name: SmolStr, attrs: Attrs) -> Self {
        Self {
            type_name,
            attrs,
            children: Vec::new(),
            ignore: false,
        }
    }

    fn ignore() -> Self {
        Self {
            type_name: SmolStr::default(),
            attrs: Attrs::new(),
            children: Vec::new(),
            ignore: true,
        }
    }
}

/// A composed markdown parser. Token names map to schema types through the
/// rules extensions declared; embed descriptors turn matching bare links
/// into embed nodes.
pub struct MarkdownParser {
    schema: Arc<Schema>,
    /// Parse-token name to schema type name.
    tokens: BTreeMap<SmolStr, SmolStr>,
    embeds: Vec<EmbedDescriptor>,
    options: Options,
}

impl MarkdownParser {
    pub fn new(
        schema: Arc<Schema>,
        tokens: BTreeMap<SmolStr, SmolStr>,
        embeds: Vec<EmbedDescriptor>,
    ) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        Self {
            schema,
            tokens,
            embeds,
            options,
        }
    }

    fn ty(&self, token: &str) -> SmolStr {
        self.tokens
            .get(token)
            .cloned()
            .unwrap_or_else(|| SmolStr::new(token))
    }

    pub fn parse(&self, text: &str) -> Result<Node, EditorError> {
        let mut frames: Vec<Frame> = vec![Frame::node(SmolStr::new("doc"), Attrs::new())];
        let mut marks: Vec<Mark> = Vec::new();

        for event in Parser::new_ext(text, self.options) {
            match event {
                Event::Start(tag) => self.start_tag(&mut frames, &mut marks, tag)?,
                Event::End(tag) => self.end_tag(&mut frames, &mut marks, tag)?,
                Event::Text(t) => self.push_text(&mut frames, &marks, &t),
                Event::Code(t) => {
                    let mut code_marks = marks.clone();
                    code_marks.push(Mark::new(self.ty("code"), Attrs::new()));
                    push_child(&mut frames, Node::text_node(t.as_ref(), code_marks));
                }
                Event::SoftBreak => self.push_text(&mut frames, &marks, " "),
                Event::HardBreak => {
                    let node =
                        self.schema
                            .node(self.ty("hard_break").as_str(), Attrs::new(), Vec::new())?;
                    push_child(&mut frames, node);
                }
                Event::Rule => {
                    let node = self.schema.node(
                        self.ty("horizontal_rule").as_str(),
                        Attrs::new(),
                        Vec::new(),
                    )?;
                    push_child(&mut frames, node);
                }
                Event::TaskListMarker(checked) => {
                    let item_ty = self.ty("list_item");
                    if let Some(frame) = frames
                        .iter_mut()
                        .rev()
                        .find(|f| !f.ignore && f.type_name == item_ty)
                    {
                        frame.type_name = self.ty("checkbox_item");
                        frame.attrs = attrs([("checked", checked.into())]);
                    }
                }
                Event::InlineHtml(t) => self.push_text(&mut frames, &marks, &t),
                Event::Html(_) => {}
                _ => {}
            }
        }

        let mut doc_frame = frames.pop().unwrap_or_else(|| {
            Frame::node(SmolStr::new("doc"), Attrs::new())
        });
        if doc_frame.children.is_empty() {
            doc_frame.children.push(self.schema.node(
                self.ty("paragraph").as_str(),
                Attrs::new(),
                Vec::new(),
            )?);
        }
        Ok(self
            .schema
            .node("doc", doc_frame.attrs, doc_frame.children)?)
    }

    fn start_tag(
        &self,
        frames: &mut Vec<Frame>,
        marks: &mut Vec<Mark>,
        tag: Tag<'_>,
    ) -> Result<(), EditorError> {
        match tag {
            Tag::Paragraph => frames.push(Frame::node(self.ty("paragraph"), Attrs::new())),
            Tag::Heading { level, .. } => frames.push(Frame::node(
                self.ty("heading"),
                attrs([("level", heading_level(level).into())]),
            )),
            Tag::BlockQuote(_) => frames.push(Frame::node(self.ty("blockquote"), Attrs::new())),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        match info.split_whitespace().next() {
                            Some(lang) => AttrValue::from(lang),
                            None => AttrValue::Null,
                        }
                    }
                    CodeBlockKind::Indented => AttrValue::Null,
                };
                frames.push(Frame::node(
                    self.ty("code_block"),
                    attrs([("language", language)]),
                ));
            }
            Tag::List(Some(start)) => frames.push(Frame::node(
                self.ty("ordered_list"),
                attrs([("start", (start as i64).into())]),
            )),
            Tag::List(None) => frames.push(Frame::node(self.ty("bullet_list"), Attrs::new())),
            Tag::Item => frames.push(Frame::node(self.ty("list_item"), Attrs::new())),
            Tag::Image {
                dest_url, title, ..
            } => frames.push(Frame::node(
                self.ty("image"),
                attrs([
                    ("src", dest_url.as_ref().into()),
                    ("title", title_attr(title.as_ref())),
                ]),
            )),
            Tag::Emphasis => marks.push(Mark::new(self.ty("em"), Attrs::new())),
            Tag::Strong => marks.push(Mark::new(self.ty("strong"), Attrs::new())),
            Tag::Strikethrough => marks.push(Mark::new(self.ty("strikethrough"), Attrs::new())),
            Tag::Link {
                dest_url, title, ..
            } => marks.push(Mark::new(
                self.ty("link"),
                attrs([
                    ("href", dest_url.as_ref().into()),
                    ("title", title_attr(title.as_ref())),
                ]),
            )),
            _ => frames.push(Frame::ignore()),
        }
        Ok(())
    }

    fn end_tag(
        &self,
        frames: &mut Vec<Frame>,
        marks: &mut Vec<Mark>,
        tag: TagEnd,
    ) -> Result<(), EditorError> {
        match tag {
            TagEnd::Emphasis => pop_mark(marks, self.ty("em").as_str()),
            TagEnd::Strong => pop_mark(marks, self.ty("strong").as_str()),
            TagEnd::Strikethrough => pop_mark(marks, self.ty("strikethrough").as_str()),
            TagEnd::Link => pop_mark(marks, self.ty("link").as_str()),
            TagEnd::Paragraph => self.close_paragraph(frames)?,
            TagEnd::Item => self.close_item(frames)?,
            TagEnd::List(_) => self.close_list(frames)?,
            TagEnd::Image => self.close_image(frames)?,
            _ => self.close_generic(frames)?,
        }
        Ok(())
    }

    fn close_paragraph(&self, frames: &mut Vec<Frame>) -> Result<(), EditorError> {
        let Some(frame) = frames.pop() else {
            return Ok(());
        };
        if frame.ignore {
            return Ok(());
        }
        if let Some(embed) = self.detect_embed(&frame) {
            push_child(frames, embed?);
            return Ok(());
        }
        let node = self
            .schema
            .node(frame.type_name.as_str(), frame.attrs, frame.children)?;
        push_child(frames, node);
        Ok(())
    }

    /// A paragraph holding exactly one bare link whose text equals its URL
    /// and whose URL matches a configured embed becomes an embed node.
    fn detect_embed(&self, frame: &Frame) -> Option<Result<Node, EditorError>> {
        if frame.children.len() != 1 {
            return None;
        }
        let child = frame.children.first()?;
        let text = child.text.as_ref()?;
        let link_ty = self.ty("link");
        let [mark] = child.marks.as_slice() else {
            return None;
        };
        if mark.type_name != link_ty {
            return None;
        }
        let href = mark.attrs.get("href")?.as_str()?;
        if href != text.as_str() {
            return None;
        }
        if !self.embeds.iter().any(|e| (e.matcher)(href)) {
            return None;
        }
        Some(
            self.schema
                .node(
                    self.ty("embed").as_str(),
                    attrs([("href", href.into())]),
                    Vec::new(),
                )
                .map_err(EditorError::from),
        )
    }

    fn close_item(&self, frames: &mut Vec<Frame>) -> Result<(), EditorError> {
        let Some(frame) = frames.pop() else {
            return Ok(());
        };
        if frame.ignore {
            return Ok(());
        }
        // Tight list items carry bare inline content; wrap runs of it in
        // paragraphs so item content is always block-shaped.
        let children = self.wrap_inline_runs(frame.children)?;
        let node = self
            .schema
            .node(frame.type_name.as_str(), frame.attrs, children)?;
        push_child(frames, node);
        Ok(())
    }

    fn close_list(&self, frames: &mut Vec<Frame>) -> Result<(), EditorError> {
        let Some(frame) = frames.pop() else {
            return Ok(());
        };
        if frame.ignore {
            return Ok(());
        }
        let checkbox_item = self.ty("checkbox_item");
        let has_checkbox = frame
            .children
            .iter()
            .any(|c| c.type_name == checkbox_item);
        let (type_name, children) = if has_checkbox {
            // A list with any task marker becomes a checkbox list; plain
            // items in it are retagged unchecked.
            let mut children = Vec::with_capacity(frame.children.len());
            for child in frame.children {
                if child.type_name == checkbox_item {
                    children.push(child);
                } else {
                    children.push(self.schema.node(
                        checkbox_item.as_str(),
                        attrs([("checked", false.into())]),
                        child.content,
                    )?);
                }
            }
            (self.ty("checkbox_list"), children)
        } else {
            (frame.type_name, frame.children)
        };
        let node = self
            .schema
            .node(type_name.as_str(), frame.attrs, children)?;
        push_child(frames, node);
        Ok(())
    }

    fn close_image(&self, frames: &mut Vec<Frame>) -> Result<(), EditorError> {
        let Some(frame) = frames.pop() else {
            return Ok(());
        };
        if frame.ignore {
            return Ok(());
        }
        let alt: String = frame.children.iter().map(Node::text_content).collect();
        let mut image_attrs = frame.attrs;
        if !alt.is_empty() {
            image_attrs.insert(SmolStr::new("alt"), alt.into());
        }
        // the markdown title slot doubles as the layout slot
        let layout = image_attrs
            .get("title")
            .and_then(AttrValue::as_str)
            .filter(|t| crate::extensions::media::IMAGE_LAYOUTS.contains(t))
            .map(SmolStr::new);
        if let Some(layout) = layout {
            image_attrs.insert(SmolStr::new("layout_class"), layout.into());
            image_attrs.insert(SmolStr::new("title"), AttrValue::Null);
        }
        let node = self
            .schema
            .node(frame.type_name.as_str(), image_attrs, Vec::new())?;
        push_child(frames, node);
        Ok(())
    }

    fn close_generic(&self, frames: &mut Vec<Frame>) -> Result<(), EditorError> {
        let Some(mut frame) = frames.pop() else {
            return Ok(());
        };
        if frame.ignore {
            return Ok(());
        }
        if frame.type_name == self.ty("code_block") {
            // pulldown emits the terminating newline as part of the text
            if let Some(last) = frame.children.last_mut() {
                if let Some(text) = &last.text {
                    if let Some(stripped) = text.as_str().strip_suffix('\n') {
                        last.text = Some(SmolStr::new(stripped));
                    }
                }
            }
            frame.children.retain(|c| {
                c.text.as_ref().map(|t| !t.is_empty()).unwrap_or(true)
            });
        }
        let node = self
            .schema
            .node(frame.type_name.as_str(), frame.attrs, frame.children)?;
        push_child(frames, node);
        Ok(())
    }

    fn push_text(&self, frames: &mut Vec<Frame>, marks: &[Mark], text: &str) {
        let in_code_block = frames
            .last()
            .map(|f| !f.ignore && f.type_name == self.ty("code_block"))
            .unwrap_or(false);
        let node = if in_code_block {
            Node::text_node(text, Vec::new())
        } else {
            Node::text_node(text, marks.to_vec())
        };
        push_child(frames, node);
    }

    fn wrap_inline_runs(&self, children: Vec<Node>) -> Result<Vec<Node>, EditorError> {
        let mut out = Vec::with_capacity(children.len());
        let mut run: Vec<Node> = Vec::new();
        for child in children {
            if child.inline {
                run.push(child);
            } else {
                if !run.is_empty() {
                    out.push(self.schema.node(
                        self.ty("paragraph").as_str(),
                        Attrs::new(),
                        std::mem::take(&mut run),
                    )?);
                }
                out.push(child);
            }
        }
        if !run.is_empty() {
            out.push(
                self.schema
                    .node(self.ty("paragraph").as_str(), Attrs::new(), run)?,
            );
        }
        Ok(out)
    }
}

/// Append a child to the open frame, merging adjacent text nodes carrying
/// identical marks. pulldown splits text around escapes and entities, so
/// segmentation would otherwise depend on the source spelling.
fn push_child(frames: &mut Vec<Frame>, node: Node) {
    let Some(frame) = frames.last_mut() else {
        return;
    };
    if frame.ignore {
        return;
    }
    if let Some(text) = &node.text {
        if let Some(prev) = frame.children.last_mut() {
            if let Some(prev_text) = &prev.text {
                if prev.marks == node.marks {
                    prev.text = Some(SmolStr::new(format!("{prev_text}{text}")));
                    return;
                }
            }
        }
    }
    frame.children.push(node);
}

fn pop_mark(marks: &mut Vec<Mark>, type_name: &str) {
    if let Some(i) = marks.iter().rposition(|m| m.type_name == type_name) {
        marks.remove(i);
    }
}

fn heading_level(level: HeadingLevel) -> i64 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn title_attr(title: &str) -> AttrValue {
    if title.is_empty() {
        AttrValue::Null
    } else {
        AttrValue::from(title)
    }
}
