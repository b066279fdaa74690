//! Markdown serialization: depth-first walk through per-type writer
//! functions over a shared output state.

use std::collections::BTreeMap;
use std::rc::Rc;

use smol_str::SmolStr;
use vellum_model::{Mark, Node};

/// Writer function for a node type.
pub type NodeSerializeFn = Rc<dyn Fn(&MarkdownSerializer, &mut SerializerState, &Node)>;

/// Open/close strings for a mark type.
#[derive(Clone)]
pub struct MarkRule {
    pub open: Rc<dyn Fn(&Mark) -> String>,
    pub close: Rc<dyn Fn(&Mark) -> String>,
    /// Text inside this mark is emitted verbatim with backtick fencing.
    pub raw: bool,
}

impl MarkRule {
    /// Symmetric fixed-delimiter rule, e.g. `**` for strong.
    pub fn fixed(delim: &'static str) -> Self {
        Self {
            open: Rc::new(move |_| delim.to_string()),
            close: Rc::new(move |_| delim.to_string()),
            raw: false,
        }
    }
}

/// Output accumulator with a per-line delimiter stack (blockquote markers,
/// list indentation).
pub struct SerializerState {
    out: String,
    delim: String,
    at_line_start: bool,
}

impl SerializerState {
    fn new() -> Self {
        Self {
            out: String::new(),
            delim: String::new(),
            at_line_start: true,
        }
    }

    /// Write text, prefixing the current delimiter at each line start.
    pub fn write(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.out.push('\n');
                self.at_line_start = true;
            } else {
                if self.at_line_start {
                    self.out.push_str(&self.delim);
                    self.at_line_start = false;
                }
                self.out.push(ch);
            }
        }
    }

    /// End the current line.
    pub fn newline(&mut self) {
        self.out.push('\n');
        self.at_line_start = true;
    }

    /// Blank separator line between blocks, carrying a trimmed delimiter.
    pub fn blank_line(&mut self) {
        self.newline();
        self.out.push_str(self.delim.trim_end());
        self.newline();
    }

    fn finish(self) -> String {
        self.out
    }
}

/// A composed markdown serializer: writer functions keyed by node type and
/// mark rules keyed by mark type.
pub struct MarkdownSerializer {
    node_rules: BTreeMap<SmolStr, NodeSerializeFn>,
    mark_rules: BTreeMap<SmolStr, MarkRule>,
}

impl MarkdownSerializer {
    pub fn new(
        node_rules: BTreeMap<SmolStr, NodeSerializeFn>,
        mark_rules: BTreeMap<SmolStr, MarkRule>,
    ) -> Self {
        Self {
            node_rules,
            mark_rules,
        }
    }

    /// Serialize a document. Trailing empty blocks (the editing affordance
    /// paragraph at the end of the document) leave no markdown behind.
    pub fn serialize(&self, doc: &Node) -> String {
        let mut state = SerializerState::new();
        self.render_blocks(&mut state, doc);
        let out = state.finish();
        out.trim().to_string()
    }

    /// Render a parent's block children with blank-line separation.
    pub fn render_blocks(&self, state: &mut SerializerState, parent: &Node) {
        for (i, child) in parent.content.iter().enumerate() {
            if i > 0 {
                state.blank_line();
            }
            self.render_node(state, child);
        }
    }

    /// Render a parent's block children tightly (single newline apart).
    pub fn render_blocks_tight(&self, state: &mut SerializerState, parent: &Node) {
        for (i, child) in parent.content.iter().enumerate() {
            if i > 0 {
                state.newline();
            }
            self.render_node(state, child);
        }
    }

    pub fn render_node(&self, state: &mut SerializerState, node: &Node) {
        if let Some(rule) = self.node_rules.get(node.type_name.as_str()) {
            let rule = Rc::clone(rule);
            rule(self, state, node);
        } else {
            tracing::warn!(
                target: "vellum::markdown",
                type_name = %node.type_name,
                "no serializer rule for node type, skipping"
            );
        }
    }

    /// Render a block with an extra per-line delimiter, e.g. `"> "`.
    pub fn wrapped(
        &self,
        state: &mut SerializerState,
        delim: &str,
        f: impl FnOnce(&Self, &mut SerializerState),
    ) {
        let prev_len = state.delim.len();
        state.delim.push_str(delim);
        f(self, state);
        state.delim.truncate(prev_len);
    }

    /// Render list items: `marker` produces the item prefix, continuation
    /// lines are indented to the marker width.
    pub fn render_list(
        &self,
        state: &mut SerializerState,
        list: &Node,
        marker: impl Fn(usize, &Node) -> String,
    ) {
        for (i, item) in list.content.iter().enumerate() {
            if i > 0 {
                state.newline();
            }
            let prefix = marker(i, item);
            state.write(&prefix);
            let indent = " ".repeat(prefix.chars().count());
            self.wrapped(state, &indent, |s, st| {
                s.render_blocks_tight(st, item);
            });
        }
    }

    /// Render a textblock's inline content, tracking open marks so shared
    /// marks across adjacent nodes emit one delimiter pair.
    pub fn render_inline(&self, state: &mut SerializerState, parent: &Node) {
        let mut active: Vec<Mark> = Vec::new();
        let mut block_start = true;
        for child in &parent.content {
            let mut raw = false;
            let mut wanted: Vec<Mark> = Vec::new();
            for mark in &child.marks {
                match self.mark_rules.get(mark.type_name.as_str()) {
                    Some(rule) if rule.raw => raw = true,
                    _ => wanted.push(mark.clone()),
                }
            }

            let keep = common_prefix(&active, &wanted);
            while active.len() > keep {
                if let Some(mark) = active.pop() {
                    if let Some(rule) = self.mark_rules.get(mark.type_name.as_str()) {
                        let close = (rule.close)(&mark);
                        state.write(&close);
                    }
                }
            }
            for mark in &wanted[keep..] {
                if let Some(rule) = self.mark_rules.get(mark.type_name.as_str()) {
                    let open = (rule.open)(mark);
                    state.write(&open);
                }
                active.push(mark.clone());
            }

            if let Some(text) = &child.text {
                if raw {
                    state.write(&fence_inline_code(text));
                } else {
                    state.write(&escape_markdown(text, block_start));
                }
            } else {
                self.render_node(state, child);
            }
            block_start = false;
        }
        for mark in active.iter().rev() {
            if let Some(rule) = self.mark_rules.get(mark.type_name.as_str()) {
                let close = (rule.close)(mark);
                state.write(&close);
            }
        }
    }
}

fn common_prefix(a: &[Mark], b: &[Mark]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Fence inline code with one more backtick than the longest run inside.
fn fence_inline_code(text: &str) -> String {
    let mut longest = 0usize;
    let mut run = 0usize;
    for ch in text.chars() {
        if ch == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    let fence = "`".repeat(longest + 1);
    let pad = if text.starts_with('`') || text.ends_with('`') {
        " "
    } else {
        ""
    };
    format!("{fence}{pad}{text}{pad}{fence}")
}

/// Escape every character the parser would re-interpret. Line-leading block
/// markers are only escaped when the text opens its block.
pub fn escape_markdown(text: &str, block_start: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    for (i, &ch) in chars.iter().enumerate() {
        match ch {
            '\\' | '`' | '*' | '_' | '[' | ']' | '~' => {
                out.push('\\');
                out.push(ch);
            }
            '!' if chars.get(i + 1) == Some(&'[') => {
                out.push('\\');
                out.push(ch);
            }
            '#' | '>' | '-' | '+' if block_start && i == 0 => {
                out.push('\\');
                out.push(ch);
            }
            '.' if block_start && chars[..i].iter().all(|c| c.is_ascii_digit()) && i > 0 => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Escape a link or image destination for the `(...)` slot. Destinations
/// containing whitespace use the pointy-bracket form.
pub fn escape_link_url(url: &str) -> String {
    if url.chars().any(|c| c.is_whitespace() || c.is_ascii_control()) {
        let mut out = String::from("<");
        for ch in url.chars() {
            if matches!(ch, '\\' | '<' | '>') {
                out.push('\\');
            }
            out.push(ch);
        }
        out.push('>');
        return out;
    }
    let mut out = String::with_capacity(url.len());
    for ch in url.chars() {
        if matches!(ch, '\\' | '(' | ')') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Escape a link or image title for its double-quoted slot.
pub fn escape_link_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for ch in title.chars() {
        if matches!(ch, '\\' | '"') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_inline_characters() {
        assert_eq!(escape_markdown("a*b_c", false), "a\\*b\\_c");
        assert_eq!(escape_markdown("x[y]z", false), "x\\[y\\]z");
        assert_eq!(escape_markdown("a!b", false), "a!b");
        assert_eq!(escape_markdown("a![b", false), "a\\!\\[b");
    }

    #[test]
    fn test_escape_block_markers_only_at_start() {
        assert_eq!(escape_markdown("# heading", true), "\\# heading");
        assert_eq!(escape_markdown("# heading", false), "# heading");
        assert_eq!(escape_markdown("1. item", true), "1\\. item");
        assert_eq!(escape_markdown("12. item", true), "12\\. item");
        assert_eq!(escape_markdown("1.5 things", true), "1\\.5 things");
    }

    #[test]
    fn test_escape_url_slot() {
        assert_eq!(escape_link_url("https://a.test/x"), "https://a.test/x");
        assert_eq!(escape_link_url("https://a.test/(1)"), "https://a.test/\\(1\\)");
        assert_eq!(escape_link_url("https://a.test/a b"), "<https://a.test/a b>");
    }

    #[test]
    fn test_escape_title_slot() {
        assert_eq!(escape_link_title("plain"), "plain");
        assert_eq!(escape_link_title("say \"hi\""), "say \\\"hi\\\"");
    }

    #[test]
    fn test_inline_code_fencing() {
        assert_eq!(fence_inline_code("x"), "`x`");
        assert_eq!(fence_inline_code("a`b"), "``a`b``");
        assert_eq!(fence_inline_code("`lead"), "`` `lead ``");
    }
}
