//! vellum-editor: an extensible rich-document editing core.
//!
//! Hosts construct an [`Editor`] from an ordered extension list and a
//! renderer adapter. The editor composes a schema, a markdown codec, key
//! bindings, input rules, and a command registry from the extensions, and
//! funnels every mutation through a transaction bridge that classifies
//! changes, enforces read-only gating, notifies the host lazily, and keeps
//! renderer bindings in sync.
//!
//! The document model itself lives in `vellum-model`; this crate never
//! mutates trees directly.

pub mod bridge;
pub mod controller;
pub mod dictionary;
pub mod error;
pub mod extension;
pub mod extensions;
pub mod input;
pub mod manager;
pub mod markdown;
pub mod node_views;
pub mod options;
pub mod plugin;
pub mod plugins;
pub mod slug;
pub mod tasks;
pub mod view;

pub use controller::{Editor, Heading, SessionState};
pub use dictionary::{Dictionary, DictionaryOverlay};
pub use error::EditorError;
pub use extension::{
    CommandFn, CommandOutcome, Extension, HostSignal, InputRule, KeyBinding, MarkdownRules,
};
pub use input::{Key, KeyCombo, KeydownResult, Modifiers};
pub use manager::ExtensionManager;
pub use markdown::{MarkdownParser, MarkdownSerializer};
pub use node_views::{NoopAdapter, RendererAdapter, RendererBinding};
pub use options::{AutoFocus, EditorOptions, EmbedDescriptor, Hooks, ToastKind};
pub use plugin::{Decoration, EditorPlugin, PluginContext};
pub use tasks::{LinkSearchResult, LinkTicket, SearchSeq, UploadTicket};
pub use view::EditorView;
