//! Structural plugins appended by the controller after all extension
//! plugins.

use smol_str::SmolStr;
use vellum_model::{Attrs, EditorState, Slice, Transaction};

use crate::plugin::{Decoration, EditorPlugin};

/// Keeps a trailing empty paragraph after block content so there is always
/// somewhere to put the caret below the last block.
pub struct TrailingNodePlugin;

impl EditorPlugin for TrailingNodePlugin {
    fn name(&self) -> &str {
        "trailing_node"
    }

    fn append_transaction(&self, state: &EditorState) -> Option<Transaction> {
        let last = state.doc.content.last()?;
        if last.textblock {
            return None;
        }
        let para = state.schema.node("paragraph", Attrs::new(), Vec::new()).ok()?;
        let end = state.doc.content_size();
        Some(Transaction::new().replace(end, end, Slice::blocks(vec![para])))
    }
}

/// Shows placeholder text while the document is empty.
pub struct PlaceholderPlugin {
    pub text: SmolStr,
}

impl EditorPlugin for PlaceholderPlugin {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn decorations(&self, state: &EditorState) -> Vec<Decoration> {
        let is_empty = state.doc.child_count() == 1
            && state
                .doc
                .child(0)
                .is_some_and(|c| c.type_name == "paragraph" && c.content.is_empty());
        if !is_empty {
            return Vec::new();
        }
        vec![Decoration {
            from: 0,
            to: 2,
            class: SmolStr::new("placeholder"),
            text: Some(self.text.clone()),
        }]
    }
}
