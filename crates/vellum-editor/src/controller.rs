//! The editor controller: construction, the public API surface, and the
//! session state mutated through it.

use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use serde::Serialize;
use smol_str::SmolStr;
use vellum_model::{
    attrs, AttrValue, Attrs, EditorState, Node, Selection, Slice, Transaction, UndoStack,
};

use crate::dictionary::Dictionary;
use crate::error::EditorError;
use crate::extension::{
    CommandFn, CommandOutcome, Extension, HostSignal, InputRule, KeyBinding,
};
use crate::extensions::built_ins;
use crate::input::{Key, KeyCombo, KeydownResult, Modifiers};
use crate::manager::ExtensionManager;
use crate::markdown::{MarkdownParser, MarkdownSerializer};
use crate::node_views::RendererAdapter;
use crate::options::{AutoFocus, EditorOptions, EmbedDescriptor, Hooks, ToastKind};
use crate::plugin::EditorPlugin;
use crate::plugins::{PlaceholderPlugin, TrailingNodePlugin};
use crate::slug::Slugger;
use crate::tasks::{HostTasks, LinkSearchResult, LinkTicket, SearchSeq, UploadTicket};
use crate::view::EditorView;

/// A heading visible in the document outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub title: String,
    pub level: i64,
    pub id: String,
}

/// Mutable per-session flags and search state; only controller handlers
/// touch this.
#[derive(Debug, Default)]
pub struct SessionState {
    pub read_only: bool,
    pub read_only_write_checkboxes: bool,
    pub link_search_query: Option<String>,
    pub link_search_results: Vec<LinkSearchResult>,
}

pub struct Editor {
    pub(crate) state: EditorState,
    pub(crate) parser: MarkdownParser,
    pub(crate) serializer: Rc<MarkdownSerializer>,
    pub(crate) commands: BTreeMap<SmolStr, CommandFn>,
    pub(crate) keymap: Vec<KeyBinding>,
    pub(crate) input_rules: Vec<InputRule>,
    pub(crate) plugins: Vec<Rc<dyn EditorPlugin>>,
    pub(crate) view: EditorView,
    pub(crate) undo: UndoStack,
    pub(crate) dictionary: Dictionary,
    pub(crate) embeds: Vec<EmbedDescriptor>,
    pub(crate) session: SessionState,
    pub(crate) hooks: Hooks,
    pub(crate) tasks: HostTasks,
    pub(crate) queue: VecDeque<Transaction>,
    pub(crate) applying: bool,
}

impl Editor {
    /// Compose an editor. Construction is staged: extensions, then the
    /// schema, then everything built against the frozen schema, then the
    /// view, then command wiring. Any composition error fails fast here.
    pub fn new(
        mut options: EditorOptions,
        adapter: Box<dyn RendererAdapter>,
    ) -> Result<Editor, EditorError> {
        let dictionary = Dictionary::merged(std::mem::take(&mut options.dictionary));

        let mut extensions = built_ins(options.is_mac);
        extensions.append(&mut options.extensions);
        // the base keymap goes last so every extension binding wins over it
        extensions.push(base_keymap());
        let manager = ExtensionManager::new(extensions);

        let schema = manager.schema()?;
        let commands = manager.commands();
        manager.validate_keymap(&commands)?;
        let keymap = manager.keymap();
        let input_rules = manager.input_rules();
        let (parser, serializer) = manager.codec(&schema, options.embeds.clone())?;

        let source = options.value.as_deref().unwrap_or(&options.default_value);
        let doc = parser.parse(source)?;
        let state = EditorState::new(schema, doc);

        let mut plugins = manager.plugins();
        plugins.push(Rc::new(TrailingNodePlugin));
        plugins.push(Rc::new(PlaceholderPlugin {
            text: dictionary.placeholder.clone(),
        }));

        let view = EditorView::new(adapter, manager.rendered_types());

        let mut editor = Editor {
            state,
            parser,
            serializer: Rc::new(serializer),
            commands,
            keymap,
            input_rules,
            plugins,
            view,
            undo: UndoStack::new(options.max_history),
            dictionary,
            embeds: options.embeds,
            session: SessionState {
                read_only: options.read_only,
                read_only_write_checkboxes: options.read_only_write_checkboxes,
                ..Default::default()
            },
            hooks: options.hooks,
            tasks: HostTasks::default(),
            queue: VecDeque::new(),
            applying: false,
        };

        editor.sync_view(&[]);
        match options.auto_focus {
            Some(AutoFocus::Start) => editor.focus_at_start()?,
            Some(AutoFocus::End) => editor.focus_at_end()?,
            None => {}
        }
        if let Some(anchor) = &options.scroll_to {
            editor.scroll_to_anchor(anchor.as_str());
        }
        Ok(editor)
    }

    /// The current document as markdown.
    pub fn value(&self) -> String {
        self.serializer.serialize(&self.state.doc)
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn view(&self) -> &EditorView {
        &self.view
    }

    pub fn focus_at_start(&mut self) -> Result<(), EditorError> {
        let selection = Selection::at_start(&self.state.doc);
        self.view.focused = true;
        self.dispatch(Transaction::new().set_selection(selection))
    }

    pub fn focus_at_end(&mut self) -> Result<(), EditorError> {
        let selection = Selection::at_end(&self.state.doc);
        self.view.focused = true;
        self.dispatch(Transaction::new().set_selection(selection))
    }

    /// Top-level headings in document order, with duplicate slugs
    /// disambiguated (`intro`, `intro-1`, `intro-2`, ...).
    pub fn headings(&self) -> Vec<Heading> {
        let mut slugger = Slugger::new();
        self.state
            .doc
            .content
            .iter()
            .filter(|node| node.type_name == "heading")
            .map(|node| {
                let title = node.text_content();
                Heading {
                    id: slugger.slug(&title),
                    level: node
                        .attrs
                        .get("level")
                        .and_then(AttrValue::as_int)
                        .unwrap_or(1),
                    title,
                }
            })
            .collect()
    }

    /// Selected text and the full document as markdown.
    pub fn selection(&self) -> (String, String) {
        let sel = self.state.selection;
        let selected = self.state.doc.text_between(sel.from(), sel.to(), "\n");
        (selected, self.value())
    }

    /// Replace the document wholesale from an external value. Resyncs
    /// bindings and repaints but never echoes `on_change`.
    pub fn set_value(&mut self, value: &str) -> Result<(), EditorError> {
        let doc = self.parser.parse(value)?;
        let selection = Selection::at_start(&doc);
        self.state = EditorState {
            schema: std::sync::Arc::clone(&self.state.schema),
            doc,
            selection,
            revision: self.state.revision + 1,
        };
        self.undo.clear();
        self.sync_view(&[]);
        Ok(())
    }

    /// Flip the editability predicate. Nothing is rebuilt.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.session.read_only = read_only;
    }

    /// Best-effort scroll: true if the anchor names a known heading.
    pub fn scroll_to_anchor(&mut self, anchor: &str) -> bool {
        let anchor = anchor.trim_start_matches('#');
        if self.headings().iter().any(|h| h.id == anchor) {
            true
        } else {
            tracing::warn!(target: "vellum::controller", anchor, "unknown scroll anchor");
            false
        }
    }

    /// Run a registered command by name. Returns whether it applied.
    pub fn apply_command(&mut self, name: &str) -> Result<bool, EditorError> {
        let Some(command) = self.commands.get(name).map(Rc::clone) else {
            return Err(EditorError::UnknownCommand {
                name: SmolStr::new(name),
            });
        };
        match command(&self.state) {
            CommandOutcome::Transaction(tr) => {
                self.dispatch(tr)?;
                Ok(true)
            }
            CommandOutcome::Host(signal) => {
                self.emit_host_signal(signal);
                Ok(true)
            }
            CommandOutcome::Undo => Ok(self.apply_undo()),
            CommandOutcome::Redo => Ok(self.apply_redo()),
            CommandOutcome::None => Ok(false),
        }
    }

    pub fn handle_key(&mut self, combo: KeyCombo) -> Result<KeydownResult, EditorError> {
        let command = self
            .keymap
            .iter()
            .find(|binding| binding.combo == combo)
            .map(|binding| binding.command.clone());
        match command {
            Some(name) => {
                self.apply_command(name.as_str())?;
                Ok(KeydownResult::Handled)
            }
            None => Ok(KeydownResult::NotHandled),
        }
    }

    /// Insert typed text at the selection, then try input rules against
    /// the text leading up to the caret. A selection spanning textblocks is
    /// collapsed into one block before the insertion.
    pub fn handle_text_input(&mut self, text: &str) -> Result<(), EditorError> {
        if text.is_empty() {
            return Ok(());
        }
        let sel = self.state.selection;
        let node = self.state.schema.text(text);
        let caret = sel.from() + text.chars().count();
        let tr = if self
            .state
            .doc
            .textblock_containing(sel.from(), sel.to())
            .is_some()
        {
            Transaction::new().replace(sel.from(), sel.to(), Slice::inline(vec![node]))
        } else {
            let Some(tr) = cross_block_delete(&self.state, sel.from(), sel.to()) else {
                tracing::debug!(
                    target: "vellum::controller",
                    "selection spans unjoinable blocks, ignoring input"
                );
                return Ok(());
            };
            tr.replace(sel.from(), sel.from(), Slice::inline(vec![node]))
        };
        self.dispatch(tr.set_selection(Selection::caret(caret)))?;
        self.run_input_rules()
    }

    fn run_input_rules(&mut self) -> Result<(), EditorError> {
        let caret = self.state.selection.head;
        let Some((pos, block)) = self.state.doc.textblock_containing(caret, caret) else {
            return Ok(());
        };
        let start = pos + 1;
        let mut before = String::new();
        let mut off = start;
        for child in &block.content {
            let size = child.node_size();
            if off >= caret {
                break;
            }
            if let Some(text) = &child.text {
                let take = (caret - off).min(size);
                before.extend(text.chars().take(take));
            } else {
                before.push('\u{fffc}');
            }
            off += size;
        }

        let rules = self.input_rules.clone();
        for rule in &rules {
            if let Some(caps) = rule.pattern.captures(&before) {
                let Some(whole) = caps.get(0) else { continue };
                let match_chars = before[..whole.start()].chars().count();
                let match_start = start + match_chars;
                if let Some(tr) = (rule.handler)(&self.state, &caps, match_start, caret) {
                    self.dispatch(tr)?;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Offer pasted text to plugins in order; the first transaction wins.
    /// Plain text falls back to an inline insertion.
    pub fn handle_paste(&mut self, text: &str) -> Result<(), EditorError> {
        let plugins = self.plugins.clone();
        for plugin in &plugins {
            let ctx = crate::plugin::PluginContext {
                state: &self.state,
                parser: &self.parser,
                embeds: &self.embeds,
            };
            if let Some(tr) = plugin.handle_paste(&ctx, text) {
                return self.dispatch(tr);
            }
        }
        self.handle_text_input(text)
    }

    /// Toggle the checkbox item starting at `pos`. Permitted in read-only
    /// mode when checkbox writes are enabled.
    pub fn toggle_checkbox(&mut self, pos: usize) -> Result<bool, EditorError> {
        let Some(node) = self.state.doc.node_at(pos) else {
            return Ok(false);
        };
        if node.type_name != "checkbox_item" {
            return Ok(false);
        }
        let checked = node
            .attrs
            .get("checked")
            .and_then(AttrValue::as_bool)
            .unwrap_or(false);
        let mut toggled = node.clone();
        toggled
            .attrs
            .insert(SmolStr::new("checked"), AttrValue::Bool(!checked));
        let size = node.node_size();
        self.dispatch(
            Transaction::new().replace(pos, pos + size, Slice::blocks(vec![toggled])),
        )?;
        Ok(true)
    }

    /// Insert an upload placeholder at the selection and hand back a ticket
    /// for the host to resolve.
    pub fn begin_upload(&mut self) -> Result<UploadTicket, EditorError> {
        let ticket = self.tasks.next_upload();
        let node = self.state.schema.node(
            "image",
            attrs([("upload", (ticket.id as i64).into())]),
            Vec::new(),
        )?;
        let sel = self.state.selection;
        self.dispatch(
            Transaction::new().replace(sel.from(), sel.to(), Slice::inline(vec![node])),
        )?;
        Ok(ticket)
    }

    /// Resolve an upload. If the placeholder has been deleted meanwhile the
    /// result is dropped silently.
    pub fn resolve_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<String, String>,
    ) -> Result<(), EditorError> {
        let wanted = AttrValue::Int(ticket.id as i64);
        let mut found: Option<(usize, Node)> = None;
        self.state.doc.descendants(&mut |pos, node| {
            if found.is_none() && node.attrs.get("upload") == Some(&wanted) {
                found = Some((pos, node.clone()));
            }
        });
        let Some((pos, node)) = found else {
            tracing::debug!(
                target: "vellum::tasks",
                ticket = ticket.id,
                "upload placeholder gone, dropping result"
            );
            return Ok(());
        };
        match result {
            Ok(url) => {
                let mut resolved = node;
                resolved.attrs.insert(SmolStr::new("src"), url.into());
                resolved.attrs.insert(SmolStr::new("upload"), AttrValue::Null);
                self.dispatch(
                    Transaction::new().replace(pos, pos + 1, Slice::inline(vec![resolved])),
                )
            }
            Err(error) => {
                tracing::debug!(target: "vellum::tasks", ticket = ticket.id, %error, "upload failed");
                self.dispatch(Transaction::new().delete(pos, pos + 1))?;
                let message = self.dictionary.image_upload_error.clone();
                if let Some(on_show_toast) = self.hooks.on_show_toast.as_mut() {
                    on_show_toast(message.as_str(), ToastKind::Error);
                }
                Ok(())
            }
        }
    }

    /// Record a link-creation request against the current selection and
    /// revision, and signal the host.
    pub fn create_link(&mut self, title: &str) -> LinkTicket {
        let ticket = self
            .tasks
            .record_link(self.state.selection, self.state.revision);
        if let Some(on_create_link) = self.hooks.on_create_link.as_mut() {
            on_create_link(title, ticket);
        }
        ticket
    }

    /// Apply a resolved link. Dropped when the document has changed since
    /// the request.
    pub fn resolve_link(&mut self, ticket: LinkTicket, href: &str) -> Result<(), EditorError> {
        let Some(pending) = self.tasks.take_link(ticket) else {
            tracing::debug!(target: "vellum::tasks", ticket = ticket.id, "unknown link ticket");
            return Ok(());
        };
        if pending.revision != self.state.revision {
            tracing::debug!(
                target: "vellum::tasks",
                ticket = ticket.id,
                "document changed since link request, dropping"
            );
            return Ok(());
        }
        let sel = pending.selection;
        if sel.is_collapsed() {
            return Ok(());
        }
        let Some((pos, block)) = self.state.doc.textblock_containing(sel.from(), sel.to()) else {
            return Ok(());
        };
        let start = pos + 1;
        let Some(range) = block.inline_range(sel.from() - start, sel.to() - start) else {
            return Ok(());
        };
        let mark = self
            .state
            .schema
            .mark("link", attrs([("href", href.into())]))?;
        let linked: Vec<Node> = range
            .into_iter()
            .map(|mut node| {
                if node.is_text() && !node.marks.iter().any(|m| m.type_name == "link") {
                    node.marks.push(mark.clone());
                }
                node
            })
            .collect();
        self.dispatch(
            Transaction::new()
                .replace(sel.from(), sel.to(), Slice::inline(linked))
                .set_selection(sel),
        )
    }

    /// Issue a link search; only the latest sequence's results are kept.
    pub fn search_links(&mut self, query: &str) -> SearchSeq {
        let seq = self.tasks.next_search();
        self.session.link_search_query = Some(query.to_string());
        if let Some(on_search_link) = self.hooks.on_search_link.as_mut() {
            on_search_link(query, seq);
        }
        seq
    }

    pub fn deliver_search_results(&mut self, seq: SearchSeq, results: Vec<LinkSearchResult>) {
        if !self.tasks.is_latest_search(seq) {
            tracing::debug!(target: "vellum::tasks", seq = seq.0, "superseded search results dropped");
            return;
        }
        self.session.link_search_results = results;
    }

    pub fn link_search_results(&self) -> &[LinkSearchResult] {
        &self.session.link_search_results
    }

    pub(crate) fn emit_host_signal(&mut self, signal: HostSignal) {
        match signal {
            HostSignal::Save { done } => {
                if let Some(on_save) = self.hooks.on_save.as_mut() {
                    on_save(done);
                }
            }
            HostSignal::Cancel => {
                if let Some(on_cancel) = self.hooks.on_cancel.as_mut() {
                    on_cancel();
                }
            }
        }
    }
}

/// Fallback bindings for structural editing; appended after all extensions
/// so anything can shadow them.
fn base_keymap() -> Extension {
    Extension::new("base_keymap")
        .with_command("split_block", Rc::new(split_block))
        .with_command("delete_backward", Rc::new(delete_backward))
        .with_key(KeyBinding::new(
            KeyCombo::with_modifiers(Key::Enter, Modifiers::NONE),
            "split_block",
        ))
        .with_key(KeyBinding::new(
            KeyCombo::with_modifiers(Key::Backspace, Modifiers::NONE),
            "delete_backward",
        ))
}

/// Split the current textblock at the caret; the right half is always a
/// paragraph.
fn split_block(state: &EditorState) -> CommandOutcome {
    let sel = state.selection;
    let Some((_, block)) = state.doc.textblock_containing(sel.from(), sel.from()) else {
        return CommandOutcome::None;
    };
    let Ok(left) = state
        .schema
        .node(block.type_name.as_str(), block.attrs.clone(), Vec::new())
    else {
        return CommandOutcome::None;
    };
    let Ok(right) = state.schema.node("paragraph", Attrs::new(), Vec::new()) else {
        return CommandOutcome::None;
    };
    let slice = Slice {
        content: vec![left, right],
        open_start: 1,
        open_end: 1,
    };
    let mut tr = Transaction::new();
    if !sel.is_collapsed() {
        if state.doc.textblock_containing(sel.from(), sel.to()).is_some() {
            tr = tr.delete(sel.from(), sel.to());
        } else {
            match cross_block_delete(state, sel.from(), sel.to()) {
                Some(t) => tr = t,
                None => return CommandOutcome::None,
            }
        }
    }
    CommandOutcome::Transaction(
        tr.replace(sel.from(), sel.from(), slice)
            .set_selection(Selection::caret(sel.from() + 2)),
    )
}

/// Delete the selection, the previous character, or join with the previous
/// textblock at a block start.
fn delete_backward(state: &EditorState) -> CommandOutcome {
    let sel = state.selection;
    if !sel.is_collapsed() {
        if state.doc.textblock_containing(sel.from(), sel.to()).is_some() {
            return CommandOutcome::Transaction(
                Transaction::new()
                    .delete(sel.from(), sel.to())
                    .set_selection(Selection::caret(sel.from())),
            );
        }
        return match cross_block_delete(state, sel.from(), sel.to()) {
            Some(tr) => {
                CommandOutcome::Transaction(tr.set_selection(Selection::caret(sel.from())))
            }
            None => CommandOutcome::None,
        };
    }
    let caret = sel.head;
    let Some((pos, _)) = state.doc.textblock_containing(caret, caret) else {
        return CommandOutcome::None;
    };
    if caret > pos + 1 {
        return CommandOutcome::Transaction(
            Transaction::new()
                .delete(caret - 1, caret)
                .set_selection(Selection::caret(caret - 1)),
        );
    }
    if pos == 0 {
        return CommandOutcome::None;
    }
    CommandOutcome::Transaction(
        Transaction::new()
            .replace(pos - 1, pos + 1, Slice::open_empty())
            .set_selection(Selection::caret(pos - 1)),
    )
}

/// Decompose a deletion spanning sibling textblocks into a head delete, a
/// whole-block delete of anything in between, a tail delete, and a join of
/// the two remaining blocks. `None` when the range does not start and end
/// inside textblocks sharing a parent.
fn cross_block_delete(state: &EditorState, from: usize, to: usize) -> Option<Transaction> {
    let (left_end, right_pos) = spanning_siblings(&state.doc, 0, from, to)?;
    let right_start = right_pos + 1;
    let mut tr = Transaction::new();
    if to > right_start {
        tr = tr.delete(right_start, to);
    }
    if right_pos > left_end + 1 {
        tr = tr.delete(left_end + 1, right_pos);
    }
    if left_end > from {
        tr = tr.delete(from, left_end);
    }
    Some(tr.replace(from, from + 2, Slice::open_empty()))
}

/// Locate the sibling textblocks a range spans: the interior end of the
/// block holding `from` and the offset of the block holding `to`, when
/// both are children of the same parent.
fn spanning_siblings(
    parent: &Node,
    first_child_at: usize,
    from: usize,
    to: usize,
) -> Option<(usize, usize)> {
    let mut off = first_child_at;
    let mut left: Option<(usize, &Node)> = None;
    let mut right: Option<(usize, &Node)> = None;
    for child in &parent.content {
        let size = child.node_size();
        if from >= off && from < off + size {
            left = Some((off, child));
        }
        if to > off && to < off + size {
            right = Some((off, child));
        }
        off += size;
    }
    let (left_off, left_child) = left?;
    let (right_off, right_child) = right?;
    if left_off == right_off {
        if left_child.textblock || left_child.leaf {
            return None;
        }
        return spanning_siblings(left_child, left_off + 1, from, to);
    }
    if !left_child.textblock || !right_child.textblock || from <= left_off {
        return None;
    }
    Some((left_off + 1 + left_child.content_size(), right_off))
}
