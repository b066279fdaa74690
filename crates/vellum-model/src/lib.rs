//! vellum-model: typed document trees and transaction primitives.
//!
//! This crate is the mutation-engine boundary of the vellum editor. It
//! provides:
//! - `AttrValue`/`Attrs` - typed node attributes
//! - `Node`/`Mark` - the document tree
//! - `Schema` - ordered compilation of node/mark type contributions
//! - `Step`/`Slice`/`Transaction` - proposed atomic mutations
//! - `EditorState` - apply a transaction, get the next state plus steps
//! - `UndoStack` - bounded snapshot history
//!
//! The editor core never mutates a tree directly; it builds transactions and
//! applies them through `EditorState::apply`.

pub mod attrs;
pub mod error;
pub mod node;
pub mod schema;
pub mod selection;
pub mod state;
pub mod step;
pub mod undo;

pub use attrs::{AttrValue, Attrs, attrs};
pub use error::{ModelError, SchemaError};
pub use node::{Mark, Node};
pub use schema::{AttrSpec, MarkSpec, MarkType, NodeSpec, NodeType, Schema, TypeContribution};
pub use selection::Selection;
pub use state::{EditorState, Transaction};
pub use step::{Slice, Step};
pub use undo::UndoStack;
