//! The transaction bridge: every mutation funnels through here.
//!
//! Dispatch is two-state (idle/applying). A transaction dispatched while
//! another is being applied is queued and run after the current apply
//! completes; applies never interleave. Each dispatched transaction is
//! classified, gated against the read-only rules, applied, followed by
//! plugin append passes, notified at most once, and finished with an
//! unconditional binding resync and repaint.

use std::sync::Arc;

use vellum_model::{EditorState, Step, Transaction};

use crate::controller::Editor;
use crate::error::EditorError;
use crate::plugin::Decoration;

/// Cap on chained `append_transaction` passes per dispatch.
const MAX_APPEND_PASSES: usize = 8;

impl Editor {
    pub fn dispatch(&mut self, tr: Transaction) -> Result<(), EditorError> {
        self.queue.push_back(tr);
        if self.applying {
            return Ok(());
        }
        self.applying = true;
        let result = self.drain_queue();
        self.applying = false;
        result
    }

    fn drain_queue(&mut self) -> Result<(), EditorError> {
        while let Some(tr) = self.queue.pop_front() {
            if let Err(err) = self.apply_transaction(tr) {
                // transactions queued behind a failed apply were built
                // against a document that never materialized
                self.queue.clear();
                return Err(err);
            }
        }
        Ok(())
    }

    fn apply_transaction(&mut self, tr: Transaction) -> Result<(), EditorError> {
        let doc_changed = tr.doc_changed();
        if doc_changed && !self.permits_write(&tr) {
            tracing::debug!(target: "vellum::bridge", "read-only, dropping transaction");
            return Ok(());
        }

        let snapshot = doc_changed.then(|| (self.state.doc.clone(), self.state.selection));
        let (next, steps) = self.state.apply(&tr)?;
        self.state = next;
        if let Some((doc, selection)) = snapshot {
            self.undo.push(doc, selection);
        }
        let mut all_steps = steps.clone();
        self.run_append_passes(&mut all_steps)?;

        if !steps.is_empty() {
            self.notify_change();
        }
        self.sync_view(&all_steps);
        Ok(())
    }

    /// Read-only gate. With checkbox writes enabled, a transaction passes
    /// when some step's slice leads with a checkbox item.
    fn permits_write(&self, tr: &Transaction) -> bool {
        if !self.session.read_only {
            return true;
        }
        if !self.session.read_only_write_checkboxes {
            return false;
        }
        tr.steps.iter().any(|step| match step {
            Step::Replace { slice, .. } => slice.first_type() == Some("checkbox_item"),
        })
    }

    /// Let plugins normalize the new state. Their transactions skip the
    /// gate and never notify; their steps still feed binding resolution.
    fn run_append_passes(&mut self, all_steps: &mut Vec<Step>) -> Result<(), EditorError> {
        let plugins = self.plugins.clone();
        for _ in 0..MAX_APPEND_PASSES {
            let mut appended: Option<Transaction> = None;
            for plugin in &plugins {
                if let Some(tr) = plugin.append_transaction(&self.state) {
                    appended = Some(tr);
                    break;
                }
            }
            let Some(tr) = appended else {
                return Ok(());
            };
            let (next, steps) = self.state.apply(&tr)?;
            self.state = next;
            all_steps.extend(steps);
        }
        tracing::warn!(target: "vellum::bridge", "append pass limit reached");
        Ok(())
    }

    /// Invoke `on_change` with a lazy serializer; the document is only
    /// serialized if the host asks for it.
    fn notify_change(&mut self) {
        let Some(on_change) = self.hooks.on_change.as_mut() else {
            return;
        };
        let serializer = std::rc::Rc::clone(&self.serializer);
        let doc = self.state.doc.clone();
        let mut cached: Option<String> = None;
        let mut accessor = move || {
            cached
                .get_or_insert_with(|| serializer.serialize(&doc))
                .clone()
        };
        on_change(&mut accessor);
    }

    pub(crate) fn sync_view(&mut self, steps: &[Step]) {
        let decorations: Vec<Decoration> = self
            .plugins
            .iter()
            .flat_map(|p| p.decorations(&self.state))
            .collect();
        self.view.sync(&self.state, &decorations, steps);
        self.view.repaint();
    }

    pub(crate) fn apply_undo(&mut self) -> bool {
        if !self.permits_restore() {
            return false;
        }
        let Some(snapshot) = self.undo.undo(&self.state.doc, self.state.selection) else {
            return false;
        };
        self.restore(snapshot.doc, snapshot.selection);
        true
    }

    pub(crate) fn apply_redo(&mut self) -> bool {
        if !self.permits_restore() {
            return false;
        }
        let Some(snapshot) = self.undo.redo(&self.state.doc, self.state.selection) else {
            return false;
        };
        self.restore(snapshot.doc, snapshot.selection);
        true
    }

    /// History restores are whole-document writes; the read-only gate
    /// covers them with no checkbox exception.
    fn permits_restore(&self) -> bool {
        if self.session.read_only {
            tracing::debug!(target: "vellum::bridge", "read-only, ignoring history restore");
            return false;
        }
        true
    }

    fn restore(&mut self, doc: vellum_model::Node, selection: vellum_model::Selection) {
        self.state = EditorState {
            schema: Arc::clone(&self.state.schema),
            doc,
            selection,
            revision: self.state.revision + 1,
        };
        self.notify_change();
        self.sync_view(&[]);
    }
}

#[cfg(test)]
mod tests {
    use vellum_model::{Attrs, Node, Selection, Slice, Transaction};

    use crate::controller::Editor;
    use crate::node_views::NoopAdapter;
    use crate::options::EditorOptions;

    fn editor() -> Editor {
        Editor::new(EditorOptions::default(), Box::new(NoopAdapter)).unwrap()
    }

    fn insert(at: usize, text: &str) -> Transaction {
        Transaction::new()
            .replace(at, at, Slice::inline(vec![Node::text_node(text, vec![])]))
            .set_selection(Selection::caret(at + text.chars().count()))
    }

    #[test]
    fn test_reentrant_dispatch_queues_in_order() {
        let mut editor = editor();
        editor.applying = true;
        editor.dispatch(insert(1, "a")).unwrap();
        editor.dispatch(insert(2, "b")).unwrap();
        // nothing applies while a dispatch is in flight
        assert_eq!(editor.value(), "");
        assert_eq!(editor.queue.len(), 2);

        editor.applying = false;
        editor.dispatch(insert(3, "c")).unwrap();
        assert_eq!(editor.value(), "abc");
        assert!(editor.queue.is_empty());
        assert!(!editor.applying);
    }

    #[test]
    fn test_append_pass_restores_trailing_paragraph() {
        let mut editor = editor();
        let rule = editor
            .state
            .schema
            .node("horizontal_rule", Attrs::new(), Vec::new())
            .unwrap();
        editor
            .dispatch(Transaction::new().replace(0, 2, Slice::blocks(vec![rule])))
            .unwrap();
        assert_eq!(editor.state.doc.child_count(), 2);
        assert_eq!(
            editor.state.doc.child(1).unwrap().type_name,
            "paragraph"
        );
        assert_eq!(editor.value(), "---");
    }

    #[test]
    fn test_failed_transaction_bubbles_and_preserves_state() {
        let mut editor = editor();
        let err = editor.dispatch(Transaction::new().delete(0, 99));
        assert!(err.is_err());
        assert!(!editor.applying);
        assert_eq!(editor.value(), "");
    }

    #[test]
    fn test_failed_apply_pushes_no_undo_entry() {
        let mut editor = editor();
        assert!(editor.dispatch(Transaction::new().delete(0, 99)).is_err());
        assert!(!editor.apply_undo());
        assert!(editor.queue.is_empty());
    }

    #[test]
    fn test_failed_apply_discards_queued_transactions() {
        let mut editor = editor();
        editor.applying = true;
        editor.dispatch(Transaction::new().delete(0, 99)).unwrap();
        editor.dispatch(insert(1, "a")).unwrap();
        editor.applying = false;
        assert!(editor.dispatch(insert(1, "b")).is_err());
        assert!(editor.queue.is_empty());
        // the discarded edits never surface on a later dispatch
        editor.dispatch(insert(1, "c")).unwrap();
        assert_eq!(editor.value(), "c");
    }

    #[test]
    fn test_read_only_blocks_history_restore() {
        let mut editor = editor();
        editor.dispatch(insert(1, "a")).unwrap();
        editor.set_read_only(true);
        assert!(!editor.apply_undo());
        assert_eq!(editor.value(), "a");
        editor.set_read_only(false);
        assert!(editor.apply_undo());
        assert_eq!(editor.value(), "");
    }
}
