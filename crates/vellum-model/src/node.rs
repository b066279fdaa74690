//! Document tree nodes and positions.
//!
//! Positions follow the token convention used by tree editors: a text node
//! occupies one position per character, a non-text leaf occupies one
//! position, and an interior node occupies its content size plus two (one
//! token for each side boundary). Position 0 is the start of the document
//! root's content.

use smol_str::SmolStr;

use crate::attrs::Attrs;
use crate::error::ModelError;
use crate::step::Slice;

/// An inline formatting mark attached to a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Mark {
    pub type_name: SmolStr,
    pub attrs: Attrs,
}

impl Mark {
    pub fn new(type_name: impl Into<SmolStr>, attrs: Attrs) -> Self {
        Self {
            type_name: type_name.into(),
            attrs,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.type_name == name
    }
}

/// A node in the document tree.
///
/// The `leaf`/`inline`/`textblock` flags are derived from the node's
/// compiled type when the node is built through a [`crate::Schema`]; they are
/// carried on the node so tree algorithms need no schema lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub type_name: SmolStr,
    pub attrs: Attrs,
    pub marks: Vec<Mark>,
    /// Literal text; `Some` only for text nodes.
    pub text: Option<SmolStr>,
    pub content: Vec<Node>,
    pub leaf: bool,
    pub inline: bool,
    pub textblock: bool,
}

impl Node {
    /// Build a text node.
    pub fn text_node(text: impl Into<SmolStr>, marks: Vec<Mark>) -> Self {
        Self {
            type_name: SmolStr::new("text"),
            attrs: Attrs::new(),
            marks,
            text: Some(text.into()),
            content: Vec::new(),
            leaf: true,
            inline: true,
            textblock: false,
        }
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    /// Size of this node in positions.
    pub fn node_size(&self) -> usize {
        if let Some(text) = &self.text {
            text.chars().count()
        } else if self.leaf {
            1
        } else {
            self.content_size() + 2
        }
    }

    /// Combined size of this node's children.
    pub fn content_size(&self) -> usize {
        self.content.iter().map(Node::node_size).sum()
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    /// Concatenated text of this node and all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.content {
            child.push_text(out);
        }
    }

    /// Visit every descendant with its absolute position. Called on the
    /// document root; children of the root start at position 0.
    pub fn descendants<'a>(&'a self, f: &mut impl FnMut(usize, &'a Node)) {
        self.walk(0, f);
    }

    fn walk<'a>(&'a self, base: usize, f: &mut impl FnMut(usize, &'a Node)) {
        let mut off = base;
        for child in &self.content {
            f(off, child);
            if !child.leaf {
                child.walk(off + 1, f);
            }
            off += child.node_size();
        }
    }

    /// The node starting exactly at `pos`, if any.
    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        let mut found = None;
        self.descendants(&mut |p, node| {
            if p == pos && found.is_none() {
                found = Some(node);
            }
        });
        found
    }

    /// First valid cursor position (start of the first textblock).
    pub fn first_cursor_pos(&self) -> usize {
        fn first(node: &Node, base: usize) -> Option<usize> {
            let mut off = base;
            for child in &node.content {
                if child.textblock {
                    return Some(off + 1);
                }
                if !child.leaf {
                    if let Some(p) = first(child, off + 1) {
                        return Some(p);
                    }
                }
                off += child.node_size();
            }
            None
        }
        first(self, 0).unwrap_or(0)
    }

    /// Last valid cursor position (end of the last textblock).
    pub fn last_cursor_pos(&self) -> usize {
        fn last(node: &Node, base: usize) -> Option<usize> {
            let mut off = base + node.content_size();
            for child in node.content.iter().rev() {
                off -= child.node_size();
                if child.textblock {
                    return Some(off + 1 + child.content_size());
                }
                if !child.leaf {
                    if let Some(p) = last(child, off + 1) {
                        return Some(p);
                    }
                }
            }
            None
        }
        last(self, 0).unwrap_or(0)
    }

    /// Text between two document positions, with `block_sep` between the
    /// textblocks the range spans. Non-text inline leaves count as one
    /// position and contribute a space.
    pub fn text_between(&self, from: usize, to: usize, block_sep: &str) -> String {
        let mut parts: Vec<String> = Vec::new();
        self.descendants(&mut |pos, node| {
            if !node.textblock {
                return;
            }
            let start = pos + 1;
            let end = start + node.content_size();
            if end <= from || start >= to {
                return;
            }
            let mut chars: Vec<char> = Vec::new();
            for child in &node.content {
                if let Some(text) = &child.text {
                    chars.extend(text.chars());
                } else {
                    chars.push(' ');
                }
            }
            let lo = from.saturating_sub(start);
            let hi = (to - start).min(chars.len());
            if lo < hi {
                parts.push(chars[lo..hi].iter().collect());
            }
        });
        parts.join(block_sep)
    }

    /// The innermost textblock whose content spans `from..to`, with its
    /// position.
    pub fn textblock_containing(&self, from: usize, to: usize) -> Option<(usize, &Node)> {
        let mut found: Option<(usize, &Node)> = None;
        self.descendants(&mut |pos, node| {
            if node.textblock {
                let start = pos + 1;
                let end = start + node.content_size();
                if from >= start && to <= end {
                    found = Some((pos, node));
                }
            }
        });
        found
    }

    /// Inline nodes covering `from..to` of this textblock's content.
    pub fn inline_range(&self, from: usize, to: usize) -> Option<Vec<Node>> {
        if !self.textblock || to < from || to > self.content_size() {
            return None;
        }
        let (_, tail) = split_inline(&self.content, from);
        let (mid, _) = split_inline(&tail, to - from);
        Some(mid)
    }

    /// Replace `from..to` of this node's content with a slice.
    ///
    /// Supported shapes: inline splice within one textblock, block-range
    /// replace at one parent, textblock split (open 1/1 slice with two
    /// children at a caret), and adjacent textblock join (open 1/1 empty
    /// slice). Anything else is rejected.
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> Result<Node, ModelError> {
        let size = self.content_size();
        if from > to || to > size {
            return Err(ModelError::PositionOutOfRange { pos: to, size });
        }
        self.replace_inner(from, to, slice)
    }

    fn replace_inner(&self, from: usize, to: usize, slice: &Slice) -> Result<Node, ModelError> {
        if self.textblock {
            return self.splice_inline(from, to, slice);
        }

        let open = slice.open_start == 1 && slice.open_end == 1;
        let mut off = 0usize;
        let mut from_child: Option<(usize, usize)> = None;
        let mut to_child: Option<(usize, usize)> = None;
        let mut from_boundary: Option<usize> = None;
        let mut to_boundary: Option<usize> = None;
        for (i, child) in self.content.iter().enumerate() {
            let sz = child.node_size();
            if from == off {
                from_boundary = Some(i);
            }
            if to == off {
                to_boundary = Some(i);
            }
            if from > off && from < off + sz {
                from_child = Some((i, off));
            }
            if to > off && to < off + sz {
                to_child = Some((i, off));
            }
            off += sz;
        }
        if from == off {
            from_boundary = Some(self.content.len());
        }
        if to == off {
            to_boundary = Some(self.content.len());
        }

        if let (Some((fi, fo)), Some((ti, to_off))) = (from_child, to_child) {
            if fi == ti {
                let child = &self.content[fi];
                if open && slice.content.len() == 2 && from == to && child.textblock {
                    return self.split_child(fi, fo, from, slice);
                }
                if child.leaf || child.is_text() {
                    return Err(ModelError::UnsupportedReplace { from, to });
                }
                let replaced = child.replace_inner(from - fo - 1, to - fo - 1, slice)?;
                return Ok(self.with_child_range(fi, fi + 1, vec![replaced]));
            }
            if open && slice.content.is_empty() && ti == fi + 1 {
                return self.join_children(fi, fo, to_off, from, to);
            }
            return Err(ModelError::UnsupportedReplace { from, to });
        }

        if let (Some(fb), Some(tb)) = (from_boundary, to_boundary) {
            if slice.open_start != 0 || slice.open_end != 0 {
                return Err(ModelError::UnsupportedReplace { from, to });
            }
            return Ok(self.with_child_range(fb, tb, slice.content.clone()));
        }

        Err(ModelError::UnsupportedReplace { from, to })
    }

    fn split_child(
        &self,
        index: usize,
        child_off: usize,
        at: usize,
        slice: &Slice,
    ) -> Result<Node, ModelError> {
        let child = &self.content[index];
        let inner_at = at - child_off - 1;
        let (before, after) = split_inline(&child.content, inner_at);

        let mut left = slice.content[0].clone();
        let mut left_content = before;
        left_content.extend(left.content);
        merge_adjacent_text(&mut left_content);
        left.content = left_content;

        let mut right = slice.content[1].clone();
        let mut right_content = right.content;
        right_content.extend(after);
        merge_adjacent_text(&mut right_content);
        right.content = right_content;

        Ok(self.with_child_range(index, index + 1, vec![left, right]))
    }

    fn join_children(
        &self,
        left_index: usize,
        left_off: usize,
        right_off: usize,
        from: usize,
        to: usize,
    ) -> Result<Node, ModelError> {
        let a = &self.content[left_index];
        let b = &self.content[left_index + 1];
        if !a.textblock || !b.textblock {
            return Err(ModelError::UnsupportedReplace { from, to });
        }
        // The step must address exactly the shared boundary.
        if from != left_off + 1 + a.content_size() || to != right_off + 1 {
            return Err(ModelError::UnsupportedReplace { from, to });
        }
        let mut joined = a.clone();
        joined.content.extend(b.content.iter().cloned());
        merge_adjacent_text(&mut joined.content);
        Ok(self.with_child_range(left_index, left_index + 2, vec![joined]))
    }

    fn splice_inline(&self, from: usize, to: usize, slice: &Slice) -> Result<Node, ModelError> {
        if slice.open_start != 0 || slice.open_end != 0 {
            return Err(ModelError::UnsupportedReplace { from, to });
        }
        if slice.content.iter().any(|n| !n.inline) {
            return Err(ModelError::UnsupportedReplace { from, to });
        }
        let (head, _) = split_inline(&self.content, from);
        let (_, tail) = split_inline(&self.content, to);
        let mut content = head;
        content.extend(slice.content.iter().cloned());
        content.extend(tail);
        merge_adjacent_text(&mut content);
        let mut node = self.clone();
        node.content = content;
        Ok(node)
    }

    fn with_child_range(&self, from: usize, to: usize, replacement: Vec<Node>) -> Node {
        let mut node = self.clone();
        let mut content = Vec::with_capacity(self.content.len());
        content.extend(self.content[..from].iter().cloned());
        content.extend(replacement);
        content.extend(self.content[to..].iter().cloned());
        node.content = content;
        node
    }
}

/// Split a sequence of inline nodes at a character offset, cutting text
/// nodes in two where needed.
pub fn split_inline(children: &[Node], at: usize) -> (Vec<Node>, Vec<Node>) {
    let mut before = Vec::new();
    let mut after = Vec::new();
    let mut off = 0usize;
    for child in children {
        let sz = child.node_size();
        if off + sz <= at {
            before.push(child.clone());
        } else if off >= at {
            after.push(child.clone());
        } else if let Some(text) = &child.text {
            let cut = at - off;
            let head: String = text.chars().take(cut).collect();
            let tail: String = text.chars().skip(cut).collect();
            if !head.is_empty() {
                before.push(Node::text_node(head, child.marks.clone()));
            }
            if !tail.is_empty() {
                after.push(Node::text_node(tail, child.marks.clone()));
            }
        } else {
            // Non-text leaves have size 1 and can only fall on a boundary.
            after.push(child.clone());
        }
        off += sz;
    }
    (before, after)
}

/// Merge consecutive text nodes carrying identical marks, dropping empties.
pub fn merge_adjacent_text(content: &mut Vec<Node>) {
    let mut merged: Vec<Node> = Vec::with_capacity(content.len());
    for node in content.drain(..) {
        if let Some(text) = &node.text {
            if text.is_empty() {
                continue;
            }
            if let Some(prev) = merged.last_mut() {
                if let Some(prev_text) = &prev.text {
                    if prev.marks == node.marks {
                        let combined = format!("{prev_text}{text}");
                        prev.text = Some(SmolStr::new(combined));
                        continue;
                    }
                }
            }
        }
        merged.push(node);
    }
    *content = merged;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Slice;

    fn para(children: Vec<Node>) -> Node {
        Node {
            type_name: SmolStr::new("paragraph"),
            attrs: Attrs::new(),
            marks: vec![],
            text: None,
            content: children,
            leaf: false,
            inline: false,
            textblock: true,
        }
    }

    fn doc(children: Vec<Node>) -> Node {
        Node {
            type_name: SmolStr::new("doc"),
            attrs: Attrs::new(),
            marks: vec![],
            text: None,
            content: children,
            leaf: false,
            inline: false,
            textblock: false,
        }
    }

    #[test]
    fn test_sizes() {
        let d = doc(vec![para(vec![Node::text_node("hello", vec![])])]);
        // paragraph: 5 chars + 2 boundary tokens
        assert_eq!(d.content[0].node_size(), 7);
        assert_eq!(d.content_size(), 7);
    }

    #[test]
    fn test_inline_splice() {
        let d = doc(vec![para(vec![Node::text_node("hello", vec![])])]);
        let slice = Slice::inline(vec![Node::text_node("XY", vec![])]);
        // replace "ell" (positions 2..5 inside the doc)
        let next = d.replace(2, 5, &slice).unwrap();
        assert_eq!(next.content[0].text_content(), "hXYo");
        // merged back into a single text node
        assert_eq!(next.content[0].child_count(), 1);
    }

    #[test]
    fn test_split_textblock() {
        let d = doc(vec![para(vec![Node::text_node("ab", vec![])])]);
        let slice = Slice {
            content: vec![para(vec![]), para(vec![])],
            open_start: 1,
            open_end: 1,
        };
        let next = d.replace(2, 2, &slice).unwrap();
        assert_eq!(next.child_count(), 2);
        assert_eq!(next.content[0].text_content(), "a");
        assert_eq!(next.content[1].text_content(), "b");
    }

    #[test]
    fn test_join_textblocks() {
        let d = doc(vec![
            para(vec![Node::text_node("a", vec![])]),
            para(vec![Node::text_node("b", vec![])]),
        ]);
        // boundary between blocks is at position 3
        let next = d.replace(2, 4, &Slice::open_empty()).unwrap();
        assert_eq!(next.child_count(), 1);
        assert_eq!(next.content[0].text_content(), "ab");
    }

    #[test]
    fn test_block_replace() {
        let d = doc(vec![
            para(vec![Node::text_node("a", vec![])]),
            para(vec![Node::text_node("b", vec![])]),
        ]);
        let slice = Slice::blocks(vec![para(vec![Node::text_node("z", vec![])])]);
        let next = d.replace(0, 3, &slice).unwrap();
        assert_eq!(next.child_count(), 2);
        assert_eq!(next.content[0].text_content(), "z");
        assert_eq!(next.content[1].text_content(), "b");
    }

    #[test]
    fn test_unsupported_replace_rejected() {
        let d = doc(vec![
            para(vec![Node::text_node("abc", vec![])]),
            para(vec![Node::text_node("def", vec![])]),
        ]);
        // Range spanning two textblocks with a closed inline slice.
        let slice = Slice::inline(vec![Node::text_node("x", vec![])]);
        assert!(d.replace(2, 7, &slice).is_err());
    }

    #[test]
    fn test_cursor_positions() {
        let d = doc(vec![
            para(vec![Node::text_node("ab", vec![])]),
            para(vec![Node::text_node("cd", vec![])]),
        ]);
        assert_eq!(d.first_cursor_pos(), 1);
        assert_eq!(d.last_cursor_pos(), 7);
    }

    #[test]
    fn test_text_between() {
        let d = doc(vec![
            para(vec![Node::text_node("hello", vec![])]),
            para(vec![Node::text_node("world", vec![])]),
        ]);
        assert_eq!(d.text_between(1, 6, "\n"), "hello");
        assert_eq!(d.text_between(3, 10, "\n"), "llo\nwo");
    }
}
