//! Construction-time options supplied by the host.

use std::rc::Rc;

use smol_str::SmolStr;

use crate::dictionary::DictionaryOverlay;
use crate::extension::Extension;
use crate::tasks::{LinkTicket, SearchSeq};

/// Severity of a host toast raised by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Error,
}

/// Where to place the caret on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoFocus {
    Start,
    End,
}

/// A host-registered embed: bare links matching `matcher` are parsed into
/// embed nodes rendered by the named component.
#[derive(Clone)]
pub struct EmbedDescriptor {
    pub name: SmolStr,
    pub matcher: Rc<dyn Fn(&str) -> bool>,
    pub component: SmolStr,
}

/// Host callbacks. All optional; a missing hook is a no-op.
#[derive(Default)]
pub struct Hooks {
    /// Called at most once per dispatched change with a lazy serializer;
    /// call the accessor to get the document as markdown.
    pub on_change: Option<Box<dyn FnMut(&mut dyn FnMut() -> String)>>,
    /// `done` distinguishes save-and-exit from plain save.
    pub on_save: Option<Box<dyn FnMut(bool)>>,
    pub on_cancel: Option<Box<dyn FnMut()>>,
    pub on_show_toast: Option<Box<dyn FnMut(&str, ToastKind)>>,
    /// The host resolves the ticket through `Editor::resolve_link`.
    pub on_create_link: Option<Box<dyn FnMut(&str, LinkTicket)>>,
    /// The host answers through `Editor::deliver_search_results`.
    pub on_search_link: Option<Box<dyn FnMut(&str, SearchSeq)>>,
}

/// Options for [`crate::Editor::new`].
pub struct EditorOptions {
    /// Initial document when `value` is absent.
    pub default_value: String,
    /// Controlled document value; wins over `default_value`.
    pub value: Option<String>,
    pub read_only: bool,
    /// Allow checkbox toggles while read-only.
    pub read_only_write_checkboxes: bool,
    pub auto_focus: Option<AutoFocus>,
    pub dictionary: DictionaryOverlay,
    pub embeds: Vec<EmbedDescriptor>,
    /// Host extensions, appended after the built-in set.
    pub extensions: Vec<Extension>,
    /// Anchor to scroll to once mounted.
    pub scroll_to: Option<SmolStr>,
    pub max_history: usize,
    /// Selects the primary shortcut modifier (Cmd vs Ctrl).
    pub is_mac: bool,
    pub hooks: Hooks,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            default_value: String::new(),
            value: None,
            read_only: false,
            read_only_write_checkboxes: false,
            auto_focus: None,
            dictionary: DictionaryOverlay::default(),
            embeds: Vec::new(),
            extensions: Vec::new(),
            scroll_to: None,
            max_history: 100,
            is_mac: false,
            hooks: Hooks::default(),
        }
    }
}
