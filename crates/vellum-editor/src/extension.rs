//! The extension record: the unit of editor composition.
//!
//! An extension bundles everything one feature needs: schema type
//! contributions, markdown parse/serialize rules, named commands, key
//! bindings, input rules, plugins, and the names of node types it expects
//! the host to render. The manager composes a full editor from an ordered
//! list of these records.

use std::collections::BTreeMap;
use std::rc::Rc;

use regex::{Captures, Regex};
use smol_str::SmolStr;
use vellum_model::{EditorState, Transaction, TypeContribution};

use crate::input::KeyCombo;
use crate::markdown::serializer::{MarkRule, NodeSerializeFn};
use crate::plugin::EditorPlugin;

/// Outcome of running a command against the current state.
pub enum CommandOutcome {
    /// Apply this transaction.
    Transaction(Transaction),
    /// Forward a signal to the host without touching the document.
    Host(HostSignal),
    Undo,
    Redo,
    /// The command did not apply in this state.
    None,
}

/// Signals a command can send to the host shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    Save { done: bool },
    Cancel,
}

/// A named command implementation.
pub type CommandFn = Rc<dyn Fn(&EditorState) -> CommandOutcome>;

/// A key combination bound to a named command.
#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub combo: KeyCombo,
    pub command: SmolStr,
}

impl KeyBinding {
    pub fn new(combo: KeyCombo, command: impl Into<SmolStr>) -> Self {
        Self {
            combo,
            command: command.into(),
        }
    }
}

/// Handler for an input rule match. Receives the state, the regex captures,
/// and the document positions of the matched text (start to caret).
pub type InputRuleFn = Rc<dyn Fn(&EditorState, &Captures<'_>, usize, usize) -> Option<Transaction>>;

/// A pattern that rewrites text as it is typed.
#[derive(Clone)]
pub struct InputRule {
    pub pattern: Regex,
    pub handler: InputRuleFn,
}

impl InputRule {
    pub fn new(pattern: Regex, handler: InputRuleFn) -> Self {
        Self { pattern, handler }
    }
}

/// Markdown support declared by an extension for one of its types.
///
/// `token` names the parse token the markdown parser emits for this type;
/// the serialize side is a closure for nodes or an open/close pair for
/// marks. A type missing either direction fails codec composition.
#[derive(Clone, Default)]
pub struct MarkdownRules {
    pub token: Option<SmolStr>,
    pub serialize_node: Option<NodeSerializeFn>,
    pub serialize_mark: Option<MarkRule>,
}

/// A composable editor feature.
#[derive(Default)]
pub struct Extension {
    pub name: SmolStr,
    /// Schema types in contribution order.
    pub types: Vec<(SmolStr, TypeContribution)>,
    /// Markdown rules keyed by type name.
    pub markdown: BTreeMap<SmolStr, MarkdownRules>,
    pub commands: Vec<(SmolStr, CommandFn)>,
    pub keymap: Vec<KeyBinding>,
    pub input_rules: Vec<InputRule>,
    pub plugins: Vec<Rc<dyn EditorPlugin>>,
    /// Node types the host renders through an adapter.
    pub rendered_types: Vec<SmolStr>,
}

impl Extension {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, name: impl Into<SmolStr>, contribution: TypeContribution) -> Self {
        self.types.push((name.into(), contribution));
        self
    }

    pub fn with_markdown(mut self, type_name: impl Into<SmolStr>, rules: MarkdownRules) -> Self {
        self.markdown.insert(type_name.into(), rules);
        self
    }

    pub fn with_command(mut self, name: impl Into<SmolStr>, command: CommandFn) -> Self {
        self.commands.push((name.into(), command));
        self
    }

    pub fn with_key(mut self, binding: KeyBinding) -> Self {
        self.keymap.push(binding);
        self
    }

    pub fn with_input_rule(mut self, rule: InputRule) -> Self {
        self.input_rules.push(rule);
        self
    }

    pub fn with_plugin(mut self, plugin: Rc<dyn EditorPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn with_rendered_type(mut self, type_name: impl Into<SmolStr>) -> Self {
        self.rendered_types.push(type_name.into());
        self
    }
}
