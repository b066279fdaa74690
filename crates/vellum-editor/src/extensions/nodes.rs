//! Built-in block node extensions.

use std::rc::Rc;

use regex::Regex;
use smol_str::SmolStr;
use vellum_model::{
    attrs, AttrSpec, AttrValue, Attrs, Node, NodeSpec, Selection, Slice, Transaction,
    TypeContribution,
};

use crate::extension::{Extension, InputRule, MarkdownRules};
use crate::markdown::serializer::SerializerState;
use crate::markdown::MarkdownSerializer;

fn block_spec(content: &str) -> NodeSpec {
    NodeSpec {
        content: Some(content.to_string()),
        group: Some(SmolStr::new("block")),
        inline: false,
        attrs: Vec::new(),
    }
}

fn token(name: &str) -> MarkdownRules {
    MarkdownRules {
        token: Some(SmolStr::new(name)),
        ..Default::default()
    }
}

/// Convert the textblock containing an input-rule match into another block.
/// The match must open the block; `build` receives the remaining inline
/// content.
pub(crate) fn convert_block(
    state: &vellum_model::EditorState,
    match_start: usize,
    match_end: usize,
    build: impl FnOnce(Vec<Node>) -> Option<Node>,
) -> Option<Transaction> {
    let (pos, block) = state.doc.textblock_containing(match_start, match_end)?;
    if match_start != pos + 1 {
        return None;
    }
    let rest = block.inline_range(match_end - (pos + 1), block.content_size())?;
    let node = build(rest)?;
    let caret = if node.textblock {
        pos + 1
    } else {
        pos + 1 + node.first_cursor_pos()
    };
    Some(
        Transaction::new()
            .replace(pos, pos + block.node_size(), Slice::blocks(vec![node]))
            .set_selection(Selection::caret(caret)),
    )
}

pub fn doc() -> Extension {
    Extension::new("doc").with_type(
        "doc",
        TypeContribution::Node(NodeSpec {
            content: Some("block+".to_string()),
            ..Default::default()
        }),
    )
}

pub fn text() -> Extension {
    Extension::new("text").with_type(
        "text",
        TypeContribution::Node(NodeSpec {
            inline: true,
            ..Default::default()
        }),
    )
}

pub fn hard_break() -> Extension {
    Extension::new("hard_break")
        .with_type(
            "hard_break",
            TypeContribution::Node(NodeSpec {
                inline: true,
                ..Default::default()
            }),
        )
        .with_markdown(
            "hard_break",
            MarkdownRules {
                serialize_node: Some(Rc::new(|_, st, _| st.write("\\\n"))),
                ..token("hard_break")
            },
        )
}

pub fn paragraph() -> Extension {
    Extension::new("paragraph")
        .with_type("paragraph", TypeContribution::Node(block_spec("inline*")))
        .with_markdown(
            "paragraph",
            MarkdownRules {
                serialize_node: Some(Rc::new(|s, st, node| s.render_inline(st, node))),
                ..token("paragraph")
            },
        )
}

pub fn blockquote() -> Extension {
    let rule = InputRule::new(
        Regex::new(r"^>\s$").expect("valid pattern"),
        Rc::new(|state, _caps, start, end| {
            let schema = std::sync::Arc::clone(&state.schema);
            convert_block(state, start, end, |rest| {
                let para = schema.node("paragraph", Attrs::new(), rest).ok()?;
                schema.node("blockquote", Attrs::new(), vec![para]).ok()
            })
        }),
    );
    Extension::new("blockquote")
        .with_type("blockquote", TypeContribution::Node(block_spec("block+")))
        .with_markdown(
            "blockquote",
            MarkdownRules {
                serialize_node: Some(Rc::new(|s, st, node| {
                    s.wrapped(st, "> ", |s, st| s.render_blocks(st, node));
                })),
                ..token("blockquote")
            },
        )
        .with_input_rule(rule)
}

pub fn code_block() -> Extension {
    let rule = InputRule::new(
        Regex::new(r"^```$").expect("valid pattern"),
        Rc::new(|state, _caps, start, end| {
            let schema = std::sync::Arc::clone(&state.schema);
            convert_block(state, start, end, |rest| {
                // code blocks hold plain text only
                let text: String = rest.iter().map(Node::text_content).collect();
                let content = if text.is_empty() {
                    Vec::new()
                } else {
                    vec![schema.text(text)]
                };
                schema.node("code_block", Attrs::new(), content).ok()
            })
        }),
    );
    Extension::new("code_block")
        .with_type(
            "code_block",
            TypeContribution::Node(NodeSpec {
                content: Some("text*".to_string()),
                group: Some(SmolStr::new("block")),
                inline: false,
                attrs: vec![AttrSpec::new("language", AttrValue::Null)],
            }),
        )
        .with_markdown(
            "code_block",
            MarkdownRules {
                serialize_node: Some(Rc::new(serialize_code_block)),
                ..token("code_block")
            },
        )
        .with_input_rule(rule)
}

fn serialize_code_block(_s: &MarkdownSerializer, st: &mut SerializerState, node: &Node) {
    let text = node.text_content();
    let mut longest = 2usize;
    let mut run = 0usize;
    for ch in text.chars() {
        if ch == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    let fence = "`".repeat(longest.max(2) + 1);
    st.write(&fence);
    if let Some(language) = node.attrs.get("language").and_then(AttrValue::as_str) {
        st.write(language);
    }
    st.newline();
    st.write(&text);
    st.newline();
    st.write(&fence);
}

pub fn checkbox_item() -> Extension {
    Extension::new("checkbox_item")
        .with_type(
            "checkbox_item",
            TypeContribution::Node(NodeSpec {
                content: Some("block+".to_string()),
                group: None,
                inline: false,
                attrs: vec![AttrSpec::new("checked", AttrValue::Bool(false))],
            }),
        )
        .with_markdown(
            "checkbox_item",
            MarkdownRules {
                serialize_node: Some(Rc::new(|s, st, node| s.render_blocks_tight(st, node))),
                ..token("checkbox_item")
            },
        )
}

pub fn checkbox_list() -> Extension {
    Extension::new("checkbox_list")
        .with_type(
            "checkbox_list",
            TypeContribution::Node(block_spec("checkbox_item+")),
        )
        .with_markdown(
            "checkbox_list",
            MarkdownRules {
                serialize_node: Some(Rc::new(|s, st, node| {
                    s.render_list(st, node, |_, item| {
                        let checked = item
                            .attrs
                            .get("checked")
                            .and_then(AttrValue::as_bool)
                            .unwrap_or(false);
                        if checked { "- [x] ".to_string() } else { "- [ ] ".to_string() }
                    });
                })),
                ..token("checkbox_list")
            },
        )
}

pub fn list_item() -> Extension {
    Extension::new("list_item")
        .with_type(
            "list_item",
            TypeContribution::Node(NodeSpec {
                content: Some("block+".to_string()),
                ..Default::default()
            }),
        )
        .with_markdown(
            "list_item",
            MarkdownRules {
                serialize_node: Some(Rc::new(|s, st, node| s.render_blocks_tight(st, node))),
                ..token("list_item")
            },
        )
}

pub fn bullet_list() -> Extension {
    let rule = InputRule::new(
        Regex::new(r"^[-+*]\s$").expect("valid pattern"),
        Rc::new(|state, _caps, start, end| {
            let schema = std::sync::Arc::clone(&state.schema);
            convert_block(state, start, end, |rest| {
                let para = schema.node("paragraph", Attrs::new(), rest).ok()?;
                let item = schema.node("list_item", Attrs::new(), vec![para]).ok()?;
                schema.node("bullet_list", Attrs::new(), vec![item]).ok()
            })
        }),
    );
    Extension::new("bullet_list")
        .with_type("bullet_list", TypeContribution::Node(block_spec("list_item+")))
        .with_markdown(
            "bullet_list",
            MarkdownRules {
                serialize_node: Some(Rc::new(|s, st, node| {
                    s.render_list(st, node, |_, _| "- ".to_string());
                })),
                ..token("bullet_list")
            },
        )
        .with_input_rule(rule)
}

pub fn ordered_list() -> Extension {
    let rule = InputRule::new(
        Regex::new(r"^(\d+)\.\s$").expect("valid pattern"),
        Rc::new(|state, caps, start, end| {
            let first: i64 = caps.get(1)?.as_str().parse().ok()?;
            let schema = std::sync::Arc::clone(&state.schema);
            convert_block(state, start, end, |rest| {
                let para = schema.node("paragraph", Attrs::new(), rest).ok()?;
                let item = schema.node("list_item", Attrs::new(), vec![para]).ok()?;
                schema
                    .node("ordered_list", attrs([("start", first.into())]), vec![item])
                    .ok()
            })
        }),
    );
    Extension::new("ordered_list")
        .with_type(
            "ordered_list",
            TypeContribution::Node(NodeSpec {
                content: Some("list_item+".to_string()),
                group: Some(SmolStr::new("block")),
                inline: false,
                attrs: vec![AttrSpec::new("start", AttrValue::Int(1))],
            }),
        )
        .with_markdown(
            "ordered_list",
            MarkdownRules {
                serialize_node: Some(Rc::new(|s, st, node| {
                    let start = node
                        .attrs
                        .get("start")
                        .and_then(AttrValue::as_int)
                        .unwrap_or(1);
                    s.render_list(st, node, move |i, _| format!("{}. ", start + i as i64));
                })),
                ..token("ordered_list")
            },
        )
        .with_input_rule(rule)
}

pub fn heading() -> Extension {
    let rule = InputRule::new(
        Regex::new(r"^(#{1,6})\s$").expect("valid pattern"),
        Rc::new(|state, caps, start, end| {
            let level = caps.get(1)?.as_str().chars().count() as i64;
            let schema = std::sync::Arc::clone(&state.schema);
            convert_block(state, start, end, |rest| {
                schema
                    .node("heading", attrs([("level", level.into())]), rest)
                    .ok()
            })
        }),
    );
    Extension::new("heading")
        .with_type(
            "heading",
            TypeContribution::Node(NodeSpec {
                content: Some("inline*".to_string()),
                group: Some(SmolStr::new("block")),
                inline: false,
                attrs: vec![AttrSpec::new("level", AttrValue::Int(1))],
            }),
        )
        .with_markdown(
            "heading",
            MarkdownRules {
                serialize_node: Some(Rc::new(|s, st, node| {
                    let level = node
                        .attrs
                        .get("level")
                        .and_then(AttrValue::as_int)
                        .unwrap_or(1)
                        .clamp(1, 6) as usize;
                    st.write(&"#".repeat(level));
                    st.write(" ");
                    s.render_inline(st, node);
                })),
                ..token("heading")
            },
        )
        .with_input_rule(rule)
}

pub fn horizontal_rule() -> Extension {
    Extension::new("horizontal_rule")
        .with_type(
            "horizontal_rule",
            TypeContribution::Node(NodeSpec {
                content: None,
                group: Some(SmolStr::new("block")),
                ..Default::default()
            }),
        )
        .with_markdown(
            "horizontal_rule",
            MarkdownRules {
                serialize_node: Some(Rc::new(|_, st, _| st.write("---"))),
                ..token("horizontal_rule")
            },
        )
}
