//! Editor plugins: hooks that observe state and propose transactions.

use smol_str::SmolStr;
use vellum_model::{EditorState, Transaction};

use crate::markdown::parser::MarkdownParser;
use crate::options::EmbedDescriptor;

/// A widget or styling hint attached to a document range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub from: usize,
    pub to: usize,
    pub class: SmolStr,
    /// Text rendered by the host inside the range, if any.
    pub text: Option<SmolStr>,
}

/// Context handed to plugin hooks.
pub struct PluginContext<'a> {
    pub state: &'a EditorState,
    pub parser: &'a MarkdownParser,
    pub embeds: &'a [EmbedDescriptor],
}

/// A plugin participating in the editor lifecycle.
///
/// All hooks are optional. `append_transaction` runs after every applied
/// transaction and may propose a follow-up; follow-ups pass through the
/// same dispatch pipeline but do not re-notify the host.
pub trait EditorPlugin {
    fn name(&self) -> &str;

    fn handle_paste(&self, _ctx: &PluginContext<'_>, _text: &str) -> Option<Transaction> {
        None
    }

    fn decorations(&self, _state: &EditorState) -> Vec<Decoration> {
        Vec::new()
    }

    fn append_transaction(&self, _state: &EditorState) -> Option<Transaction> {
        None
    }
}
