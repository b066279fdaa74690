//! Extension composition.
//!
//! The manager owns the ordered extension list and derives every composed
//! artifact from it: the schema, the plugin list, keymaps, input rules, the
//! command registry, the markdown codec, and the set of host-rendered
//! types. Order is part of the contract throughout; see the schema module
//! for the forward-reference rule.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use smol_str::SmolStr;
use vellum_model::Schema;

use crate::error::EditorError;
use crate::extension::{CommandFn, Extension, InputRule, KeyBinding};
use crate::markdown::serializer::{MarkRule, NodeSerializeFn};
use crate::markdown::{MarkdownParser, MarkdownSerializer};
use crate::options::EmbedDescriptor;
use crate::plugin::EditorPlugin;

pub struct ExtensionManager {
    extensions: Vec<Extension>,
}

impl ExtensionManager {
    pub fn new(extensions: Vec<Extension>) -> Self {
        Self { extensions }
    }

    /// Compile the unified schema from all contributions in extension order.
    pub fn schema(&self) -> Result<Arc<Schema>, EditorError> {
        let mut contributions = Vec::new();
        for extension in &self.extensions {
            for (name, contribution) in &extension.types {
                contributions.push((name.clone(), contribution.clone()));
            }
        }
        Ok(Arc::new(Schema::compile(contributions)?))
    }

    /// Extension plugins in extension order. Structural plugins are appended
    /// by the controller after these.
    pub fn plugins(&self) -> Vec<Rc<dyn EditorPlugin>> {
        self.extensions
            .iter()
            .flat_map(|e| e.plugins.iter().cloned())
            .collect()
    }

    /// Key bindings in extension order; dispatch takes the first match, so
    /// earlier extensions win and the base keymap goes last.
    pub fn keymap(&self) -> Vec<KeyBinding> {
        self.extensions
            .iter()
            .flat_map(|e| e.keymap.iter().cloned())
            .collect()
    }

    pub fn input_rules(&self) -> Vec<InputRule> {
        self.extensions
            .iter()
            .flat_map(|e| e.input_rules.iter().cloned())
            .collect()
    }

    /// Flat command registry; on a name collision the last extension wins.
    pub fn commands(&self) -> BTreeMap<SmolStr, CommandFn> {
        let mut registry = BTreeMap::new();
        for extension in &self.extensions {
            for (name, command) in &extension.commands {
                registry.insert(name.clone(), Rc::clone(command));
            }
        }
        registry
    }

    /// Every key binding must name a registered command.
    pub fn validate_keymap(
        &self,
        commands: &BTreeMap<SmolStr, CommandFn>,
    ) -> Result<(), EditorError> {
        for binding in self.keymap() {
            if !commands.contains_key(&binding.command) {
                return Err(EditorError::UnknownCommand {
                    name: binding.command,
                });
            }
        }
        Ok(())
    }

    /// Node types whose extension declares a host renderer.
    pub fn rendered_types(&self) -> Vec<SmolStr> {
        self.extensions
            .iter()
            .flat_map(|e| e.rendered_types.iter().cloned())
            .collect()
    }

    /// Assemble the markdown codec against the frozen schema. Every schema
    /// type other than the structural `doc`/`text` must have both a parse
    /// token and a serialize rule.
    pub fn codec(
        &self,
        schema: &Arc<Schema>,
        embeds: Vec<EmbedDescriptor>,
    ) -> Result<(MarkdownParser, MarkdownSerializer), EditorError> {
        let mut tokens: BTreeMap<SmolStr, SmolStr> = BTreeMap::new();
        let mut node_rules: BTreeMap<SmolStr, NodeSerializeFn> = BTreeMap::new();
        let mut mark_rules: BTreeMap<SmolStr, MarkRule> = BTreeMap::new();

        for extension in &self.extensions {
            for (type_name, rules) in &extension.markdown {
                if let Some(token) = &rules.token {
                    tokens.insert(token.clone(), type_name.clone());
                }
                if let Some(serialize) = &rules.serialize_node {
                    node_rules.insert(type_name.clone(), Rc::clone(serialize));
                }
                if let Some(mark) = &rules.serialize_mark {
                    mark_rules.insert(type_name.clone(), mark.clone());
                }
            }
        }

        for name in schema.node_names() {
            if name == "doc" || name == "text" {
                continue;
            }
            if !tokens.values().any(|t| t == name) {
                return Err(EditorError::ParserConfig {
                    type_name: name.clone(),
                    direction: "parse",
                });
            }
            if !node_rules.contains_key(name) {
                return Err(EditorError::ParserConfig {
                    type_name: name.clone(),
                    direction: "serialize",
                });
            }
        }
        for name in schema.mark_names() {
            if !tokens.values().any(|t| t == name) {
                return Err(EditorError::ParserConfig {
                    type_name: name.clone(),
                    direction: "parse",
                });
            }
            if !mark_rules.contains_key(name) {
                return Err(EditorError::ParserConfig {
                    type_name: name.clone(),
                    direction: "serialize",
                });
            }
        }

        let parser = MarkdownParser::new(Arc::clone(schema), tokens, embeds);
        let serializer = MarkdownSerializer::new(node_rules, mark_rules);
        Ok((parser, serializer))
    }
}
