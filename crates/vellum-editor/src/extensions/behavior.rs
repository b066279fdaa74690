//! Behavior extensions: history, host key signals, smart text, markdown
//! paste.

use std::rc::Rc;

use regex::Regex;
use vellum_model::{Selection, Slice, Transaction};

use crate::extension::{CommandOutcome, Extension, HostSignal, InputRule, KeyBinding};
use crate::input::{Key, KeyCombo, Modifiers};
use crate::plugin::{EditorPlugin, PluginContext};

pub fn history(is_mac: bool) -> Extension {
    Extension::new("history")
        .with_command("undo", Rc::new(|_| CommandOutcome::Undo))
        .with_command("redo", Rc::new(|_| CommandOutcome::Redo))
        .with_key(KeyBinding::new(
            KeyCombo::primary(Key::character('z'), is_mac),
            "undo",
        ))
        .with_key(KeyBinding::new(
            KeyCombo::primary_shift(Key::character('z'), is_mac),
            "redo",
        ))
}

/// Host signal bindings: save, save-and-exit, cancel.
pub fn keys(is_mac: bool) -> Extension {
    Extension::new("keys")
        .with_command(
            "save",
            Rc::new(|_| CommandOutcome::Host(HostSignal::Save { done: false })),
        )
        .with_command(
            "save_and_exit",
            Rc::new(|_| CommandOutcome::Host(HostSignal::Save { done: true })),
        )
        .with_command("cancel", Rc::new(|_| CommandOutcome::Host(HostSignal::Cancel)))
        .with_key(KeyBinding::new(
            KeyCombo::primary(Key::Enter, is_mac),
            "save_and_exit",
        ))
        .with_key(KeyBinding::new(
            KeyCombo::primary(Key::character('s'), is_mac),
            "save",
        ))
        .with_key(KeyBinding::new(
            KeyCombo::with_modifiers(Key::Escape, Modifiers::NONE),
            "cancel",
        ))
}

fn replacement_rule(pattern: &str, replacement: &'static str) -> InputRule {
    InputRule::new(
        Regex::new(pattern).expect("valid pattern"),
        Rc::new(move |state, _caps, start, end| {
            let node = state.schema.text(replacement);
            let caret = start + replacement.chars().count();
            Some(
                Transaction::new()
                    .replace(start, end, Slice::inline(vec![node]))
                    .set_selection(Selection::caret(caret)),
            )
        }),
    )
}

/// Typographic replacements as text is typed.
pub fn smart_text() -> Extension {
    Extension::new("smart_text")
        .with_input_rule(replacement_rule(r"\.\.\.$", "\u{2026}"))
        .with_input_rule(replacement_rule(r"--$", "\u{2014}"))
}

/// Paste handler: markdown-looking text is parsed and spliced as rich
/// content; an embed-matching URL becomes an embed node.
pub struct MarkdownPastePlugin;

impl MarkdownPastePlugin {
    fn looks_like_markdown(text: &str) -> bool {
        let patterns = [
            "\n#", "**", "~~", "```", "\n- ", "\n* ", "\n> ", "](", "\n1. ",
        ];
        text.starts_with('#')
            || text.starts_with("- ")
            || text.starts_with("> ")
            || text.starts_with("1. ")
            || patterns.iter().any(|p| text.contains(p))
    }
}

impl EditorPlugin for MarkdownPastePlugin {
    fn name(&self) -> &str {
        "markdown_paste"
    }

    fn handle_paste(&self, ctx: &PluginContext<'_>, text: &str) -> Option<Transaction> {
        let trimmed = text.trim();
        let sel = ctx.state.selection;

        let is_embed_url = !trimmed.contains(char::is_whitespace)
            && ctx.embeds.iter().any(|e| (e.matcher)(trimmed));
        let source = if is_embed_url {
            format!("[{trimmed}]({trimmed})")
        } else if Self::looks_like_markdown(trimmed) {
            trimmed.to_string()
        } else {
            return None;
        };

        let parsed = match ctx.parser.parse(&source) {
            Ok(doc) => doc,
            Err(error) => {
                tracing::debug!(target: "vellum::paste", %error, "paste parse failed");
                return None;
            }
        };

        // A single paragraph splices inline at the selection; anything
        // block-shaped is inserted after the current block.
        if parsed.child_count() == 1 {
            let only = parsed.child(0)?;
            if only.type_name == "paragraph" {
                return Some(
                    Transaction::new()
                        .replace(sel.from(), sel.to(), Slice::inline(only.content.clone()))
                        .scroll_into_view(),
                );
            }
        }
        let (pos, block) = ctx.state.doc.textblock_containing(sel.from(), sel.from())?;
        let boundary = pos + block.node_size();
        Some(
            Transaction::new()
                .replace(boundary, boundary, Slice::blocks(parsed.content.clone()))
                .scroll_into_view(),
        )
    }
}

/// Markdown paste support, registered as a plugin so host extensions can
/// intercept paste before it.
pub fn markdown_paste() -> Extension {
    Extension::new("markdown_paste").with_plugin(Rc::new(MarkdownPastePlugin))
}
