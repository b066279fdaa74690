//! Bounded snapshot-based undo history.

use crate::node::Node;
use crate::selection::Selection;

#[derive(Clone, Debug)]
pub struct Snapshot {
    pub doc: Node,
    pub selection: Selection,
}

/// Undo/redo stacks holding document snapshots. Pushing a new snapshot
/// clears the redo stack; the undo stack is capped at `max_depth` with the
/// oldest entries dropped first.
#[derive(Debug)]
pub struct UndoStack {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
    max_depth: usize,
}

impl UndoStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Record the state as it was before a document-changing transaction.
    pub fn push(&mut self, doc: Node, selection: Selection) {
        self.redo.clear();
        if self.undo.len() == self.max_depth {
            self.undo.remove(0);
        }
        self.undo.push(Snapshot { doc, selection });
    }

    /// Pop the most recent snapshot, recording the current state for redo.
    pub fn undo(&mut self, current_doc: &Node, current_selection: Selection) -> Option<Snapshot> {
        let snapshot = self.undo.pop()?;
        self.redo.push(Snapshot {
            doc: current_doc.clone(),
            selection: current_selection,
        });
        Some(snapshot)
    }

    /// Re-apply the most recently undone snapshot.
    pub fn redo(&mut self, current_doc: &Node, current_selection: Selection) -> Option<Snapshot> {
        let snapshot = self.redo.pop()?;
        self.undo.push(Snapshot {
            doc: current_doc.clone(),
            selection: current_selection,
        });
        Some(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Node {
        Node::text_node(text, vec![])
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut stack = UndoStack::new(10);
        stack.push(doc("v1"), Selection::caret(1));

        let restored = stack.undo(&doc("v2"), Selection::caret(2)).unwrap();
        assert_eq!(restored.doc.text_content(), "v1");
        assert!(stack.can_redo());

        let redone = stack.redo(&doc("v1"), Selection::caret(1)).unwrap();
        assert_eq!(redone.doc.text_content(), "v2");
        assert!(stack.can_undo());
    }

    #[test]
    fn test_push_clears_redo() {
        let mut stack = UndoStack::new(10);
        stack.push(doc("v1"), Selection::caret(1));
        stack.undo(&doc("v2"), Selection::caret(1));
        assert!(stack.can_redo());
        stack.push(doc("v3"), Selection::caret(1));
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_depth_cap_drops_oldest() {
        let mut stack = UndoStack::new(2);
        stack.push(doc("a"), Selection::caret(1));
        stack.push(doc("b"), Selection::caret(1));
        stack.push(doc("c"), Selection::caret(1));
        assert_eq!(
            stack
                .undo(&doc("d"), Selection::caret(1))
                .unwrap()
                .doc
                .text_content(),
            "c"
        );
        assert_eq!(
            stack
                .undo(&doc("c"), Selection::caret(1))
                .unwrap()
                .doc
                .text_content(),
            "b"
        );
        assert!(!stack.can_undo());
    }
}
