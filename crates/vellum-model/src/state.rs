//! Editor state and transactions.

use std::sync::Arc;

use crate::error::ModelError;
use crate::node::Node;
use crate::schema::Schema;
use crate::selection::Selection;
use crate::step::{Slice, Step};

/// A proposed batch of steps, with an optional selection update.
#[derive(Clone, Debug, Default)]
pub struct Transaction {
    pub steps: Vec<Step>,
    pub selection: Option<Selection>,
    pub scroll_into_view: bool,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn replace(self, from: usize, to: usize, slice: Slice) -> Self {
        self.step(Step::replace(from, to, slice))
    }

    pub fn delete(self, from: usize, to: usize) -> Self {
        self.step(Step::delete(from, to))
    }

    pub fn set_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn scroll_into_view(mut self) -> Self {
        self.scroll_into_view = true;
        self
    }

    /// Whether applying this transaction changes the document.
    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }
}

/// Immutable editor state: a document, a selection, and a revision counter
/// bumped on every document change.
#[derive(Clone, Debug)]
pub struct EditorState {
    pub schema: Arc<Schema>,
    pub doc: Node,
    pub selection: Selection,
    pub revision: u64,
}

impl EditorState {
    pub fn new(schema: Arc<Schema>, doc: Node) -> Self {
        let selection = Selection::at_start(&doc);
        Self {
            schema,
            doc,
            selection,
            revision: 0,
        }
    }

    /// Apply a transaction, producing the next state and the steps that
    /// were applied. The current state is left untouched on error.
    pub fn apply(&self, tr: &Transaction) -> Result<(EditorState, Vec<Step>), ModelError> {
        let mut doc = self.doc.clone();
        let mut selection = self.selection;
        for step in &tr.steps {
            match step {
                Step::Replace { from, to, slice } => {
                    doc = doc.replace(*from, *to, slice)?;
                }
            }
            selection = selection.map(step);
        }
        if let Some(sel) = tr.selection {
            selection = sel;
        }
        let revision = if tr.steps.is_empty() {
            self.revision
        } else {
            self.revision + 1
        };
        Ok((
            EditorState {
                schema: Arc::clone(&self.schema),
                doc,
                selection,
                revision,
            },
            tr.steps.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::Attrs;
    use crate::schema::{NodeSpec, TypeContribution};
    use smol_str::SmolStr;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::compile(vec![
                (
                    SmolStr::new("doc"),
                    TypeContribution::Node(NodeSpec {
                        content: Some("block+".into()),
                        ..Default::default()
                    }),
                ),
                (
                    SmolStr::new("text"),
                    TypeContribution::Node(NodeSpec {
                        inline: true,
                        ..Default::default()
                    }),
                ),
                (
                    SmolStr::new("paragraph"),
                    TypeContribution::Node(NodeSpec {
                        content: Some("inline*".into()),
                        group: Some(SmolStr::new("block")),
                        ..Default::default()
                    }),
                ),
            ])
            .unwrap(),
        )
    }

    fn state_with(text: &str) -> EditorState {
        let schema = schema();
        let para = schema
            .node("paragraph", Attrs::new(), vec![schema.text(text)])
            .unwrap();
        let doc = schema.node("doc", Attrs::new(), vec![para]).unwrap();
        EditorState::new(schema, doc)
    }

    #[test]
    fn test_apply_bumps_revision_and_maps_selection() {
        let state = state_with("hello");
        let tr = Transaction::new().replace(
            1,
            1,
            Slice::inline(vec![state.schema.text("> ")]),
        );
        let (next, steps) = state.apply(&tr).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(next.revision, state.revision + 1);
        assert_eq!(next.doc.text_content(), "> hello");
        // caret at 1 stays put; positions after the insertion shift
        assert_eq!(next.selection, Selection::caret(1));
    }

    #[test]
    fn test_selection_only_transaction_keeps_revision() {
        let state = state_with("hello");
        let tr = Transaction::new().set_selection(Selection::new(1, 4));
        let (next, steps) = state.apply(&tr).unwrap();
        assert!(steps.is_empty());
        assert_eq!(next.revision, state.revision);
        assert_eq!(next.selection, Selection::new(1, 4));
    }

    #[test]
    fn test_failed_apply_leaves_state_usable() {
        let state = state_with("hello");
        let tr = Transaction::new().delete(0, 999);
        assert!(state.apply(&tr).is_err());
        assert_eq!(state.doc.text_content(), "hello");
    }
}
