//! Built-in mark extensions: toggles, shortcuts, and typed-delimiter rules.

use std::rc::Rc;

use regex::Regex;
use smol_str::SmolStr;
use vellum_model::{
    AttrSpec, AttrValue, Attrs, EditorState, MarkSpec, Node, Selection, Slice, Transaction,
    TypeContribution,
};

use crate::extension::{
    CommandFn, CommandOutcome, Extension, InputRule, KeyBinding, MarkdownRules,
};
use crate::input::{Key, KeyCombo};
use crate::markdown::serializer::{escape_link_title, escape_link_url, MarkRule};

/// Toggle a mark across the selected inline range. Applies when the whole
/// range lives in one textblock; adds the mark unless every text node in
/// the range already carries it.
fn toggle_mark(mark_name: &'static str) -> CommandFn {
    Rc::new(move |state: &EditorState| {
        let sel = state.selection;
        if sel.is_collapsed() {
            return CommandOutcome::None;
        }
        let Some((pos, block)) = state.doc.textblock_containing(sel.from(), sel.to()) else {
            return CommandOutcome::None;
        };
        let start = pos + 1;
        let Some(range) = block.inline_range(sel.from() - start, sel.to() - start) else {
            return CommandOutcome::None;
        };
        let has_text = range.iter().any(Node::is_text);
        if !has_text {
            return CommandOutcome::None;
        }
        let all_marked = range
            .iter()
            .filter(|n| n.is_text())
            .all(|n| n.marks.iter().any(|m| m.type_name == mark_name));
        let Ok(mark) = state.schema.mark(mark_name, Attrs::new()) else {
            return CommandOutcome::None;
        };
        let replaced: Vec<Node> = range
            .into_iter()
            .map(|mut node| {
                if !node.is_text() {
                    return node;
                }
                if all_marked {
                    node.marks.retain(|m| m.type_name != mark_name);
                } else if !node.marks.iter().any(|m| m.type_name == mark_name) {
                    node.marks.push(mark.clone());
                }
                node
            })
            .collect();
        CommandOutcome::Transaction(
            Transaction::new()
                .replace(sel.from(), sel.to(), Slice::inline(replaced))
                .set_selection(sel),
        )
    })
}

/// Replace a typed delimiter match with marked text.
fn mark_input_rule(pattern: &str, mark_name: &'static str) -> InputRule {
    InputRule::new(
        Regex::new(pattern).expect("valid pattern"),
        Rc::new(move |state, caps, start, end| {
            let inner = caps.get(1)?.as_str();
            let mark = state.schema.mark(mark_name, Attrs::new()).ok()?;
            let node = state.schema.text_with_marks(inner, vec![mark]);
            let caret = start + inner.chars().count();
            Some(
                Transaction::new()
                    .replace(start, end, Slice::inline(vec![node]))
                    .set_selection(Selection::caret(caret)),
            )
        }),
    )
}

pub fn strong(is_mac: bool) -> Extension {
    Extension::new("strong")
        .with_type("strong", TypeContribution::Mark(MarkSpec::default()))
        .with_markdown(
            "strong",
            MarkdownRules {
                token: Some(SmolStr::new("strong")),
                serialize_mark: Some(MarkRule::fixed("**")),
                ..Default::default()
            },
        )
        .with_command("toggle_strong", toggle_mark("strong"))
        .with_key(KeyBinding::new(
            KeyCombo::primary(Key::character('b'), is_mac),
            "toggle_strong",
        ))
        .with_input_rule(mark_input_rule(r"\*\*([^*\s][^*]*)\*\*$", "strong"))
}

pub fn em(is_mac: bool) -> Extension {
    Extension::new("em")
        .with_type("em", TypeContribution::Mark(MarkSpec::default()))
        .with_markdown(
            "em",
            MarkdownRules {
                token: Some(SmolStr::new("em")),
                serialize_mark: Some(MarkRule::fixed("*")),
                ..Default::default()
            },
        )
        .with_command("toggle_em", toggle_mark("em"))
        .with_key(KeyBinding::new(
            KeyCombo::primary(Key::character('i'), is_mac),
            "toggle_em",
        ))
        .with_input_rule(mark_input_rule(r"\*([^*\s][^*]*)\*$", "em"))
}

pub fn code(is_mac: bool) -> Extension {
    Extension::new("code")
        .with_type("code", TypeContribution::Mark(MarkSpec::default()))
        .with_markdown(
            "code",
            MarkdownRules {
                token: Some(SmolStr::new("code")),
                serialize_mark: Some(MarkRule {
                    open: Rc::new(|_| "`".to_string()),
                    close: Rc::new(|_| "`".to_string()),
                    raw: true,
                }),
                ..Default::default()
            },
        )
        .with_command("toggle_code", toggle_mark("code"))
        .with_key(KeyBinding::new(
            KeyCombo::primary(Key::character('e'), is_mac),
            "toggle_code",
        ))
        .with_input_rule(mark_input_rule(r"`([^`]+)`$", "code"))
}

pub fn strikethrough(is_mac: bool) -> Extension {
    Extension::new("strikethrough")
        .with_type("strikethrough", TypeContribution::Mark(MarkSpec::default()))
        .with_markdown(
            "strikethrough",
            MarkdownRules {
                token: Some(SmolStr::new("strikethrough")),
                serialize_mark: Some(MarkRule::fixed("~~")),
                ..Default::default()
            },
        )
        .with_command("toggle_strikethrough", toggle_mark("strikethrough"))
        .with_key(KeyBinding::new(
            KeyCombo::primary(Key::character('d'), is_mac),
            "toggle_strikethrough",
        ))
        .with_input_rule(mark_input_rule(r"~~([^~\s][^~]*)~~$", "strikethrough"))
}

pub fn link() -> Extension {
    Extension::new("link")
        .with_type(
            "link",
            TypeContribution::Mark(MarkSpec {
                attrs: vec![
                    AttrSpec::new("href", AttrValue::Null),
                    AttrSpec::new("title", AttrValue::Null),
                ],
            }),
        )
        .with_markdown(
            "link",
            MarkdownRules {
                token: Some(SmolStr::new("link")),
                serialize_mark: Some(MarkRule {
                    open: Rc::new(|_| "[".to_string()),
                    close: Rc::new(|mark| {
                        let href = mark
                            .attrs
                            .get("href")
                            .and_then(AttrValue::as_str)
                            .unwrap_or("");
                        let href = escape_link_url(href);
                        match mark.attrs.get("title").and_then(AttrValue::as_str) {
                            Some(title) => {
                                format!("]({href} \"{}\")", escape_link_title(title))
                            }
                            None => format!("]({href})"),
                        }
                    }),
                    raw: false,
                }),
                ..Default::default()
            },
        )
}
