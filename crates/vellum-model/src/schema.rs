//! Schema compilation from ordered type contributions.
//!
//! Extensions contribute node and mark specs in a fixed order; compilation
//! resolves content models against that order. A named term in a content
//! expression must refer to a type declared earlier in the sequence, while
//! group terms resolve against the whole compiled set. Declaration order is
//! therefore part of the schema's contract.

use std::collections::{BTreeMap, BTreeSet};

use smol_str::SmolStr;

use crate::attrs::{AttrValue, Attrs};
use crate::error::SchemaError;
use crate::node::{Mark, Node};

/// An attribute declaration with its default value.
#[derive(Clone, Debug)]
pub struct AttrSpec {
    pub name: SmolStr,
    pub default: AttrValue,
}

impl AttrSpec {
    pub fn new(name: impl Into<SmolStr>, default: AttrValue) -> Self {
        Self {
            name: name.into(),
            default,
        }
    }
}

/// Specification of a node type.
#[derive(Clone, Debug, Default)]
pub struct NodeSpec {
    /// Content expression, e.g. `"block+"` or `"inline*"`. `None` for leaves.
    pub content: Option<String>,
    /// Group this type belongs to, e.g. `"block"`.
    pub group: Option<SmolStr>,
    pub inline: bool,
    pub attrs: Vec<AttrSpec>,
}

/// Specification of a mark type.
#[derive(Clone, Debug, Default)]
pub struct MarkSpec {
    pub attrs: Vec<AttrSpec>,
}

/// A node or mark contributed by an extension.
#[derive(Clone, Debug)]
pub enum TypeContribution {
    Node(NodeSpec),
    Mark(MarkSpec),
}

/// A compiled node type.
#[derive(Clone, Debug)]
pub struct NodeType {
    pub name: SmolStr,
    pub spec: NodeSpec,
    /// Concrete type names this node accepts as children. `None` for leaves.
    pub allowed: Option<BTreeSet<SmolStr>>,
    pub leaf: bool,
    pub textblock: bool,
}

/// A compiled mark type.
#[derive(Clone, Debug)]
pub struct MarkType {
    pub name: SmolStr,
    pub spec: MarkSpec,
}

/// A compiled schema: the full set of node and mark types, with content
/// models resolved to concrete child sets.
#[derive(Debug)]
pub struct Schema {
    nodes: BTreeMap<SmolStr, NodeType>,
    marks: BTreeMap<SmolStr, MarkType>,
    /// Node type names in contribution order.
    node_order: Vec<SmolStr>,
}

impl Schema {
    /// Compile an ordered sequence of contributions.
    pub fn compile(
        contributions: Vec<(SmolStr, TypeContribution)>,
    ) -> Result<Schema, SchemaError> {
        let mut node_specs: Vec<(SmolStr, NodeSpec)> = Vec::new();
        let mut mark_specs: Vec<(SmolStr, MarkSpec)> = Vec::new();
        let mut seen: BTreeSet<SmolStr> = BTreeSet::new();

        for (name, contribution) in contributions {
            if !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicateType { name });
            }
            match contribution {
                TypeContribution::Node(spec) => node_specs.push((name, spec)),
                TypeContribution::Mark(spec) => mark_specs.push((name, spec)),
            }
        }

        // Index of each node name in contribution order, and the members of
        // each group over the whole set.
        let mut index_of: BTreeMap<SmolStr, usize> = BTreeMap::new();
        let mut groups: BTreeMap<SmolStr, Vec<SmolStr>> = BTreeMap::new();
        for (i, (name, spec)) in node_specs.iter().enumerate() {
            index_of.insert(name.clone(), i);
            if let Some(group) = &spec.group {
                groups.entry(group.clone()).or_default().push(name.clone());
            }
            if spec.inline {
                groups
                    .entry(SmolStr::new("inline"))
                    .or_default()
                    .push(name.clone());
            }
        }

        let mut nodes = BTreeMap::new();
        let mut node_order = Vec::with_capacity(node_specs.len());
        for (i, (name, spec)) in node_specs.iter().enumerate() {
            let allowed = match &spec.content {
                None => None,
                Some(expr) => {
                    let mut set = BTreeSet::new();
                    for term in content_terms(expr) {
                        if let Some(members) = groups.get(term.as_str()) {
                            set.extend(members.iter().cloned());
                        } else if let Some(&target) = index_of.get(term.as_str()) {
                            if target >= i {
                                return Err(SchemaError::UnresolvedReference {
                                    referrer: name.clone(),
                                    missing: term,
                                });
                            }
                            set.insert(term);
                        } else {
                            return Err(SchemaError::UnresolvedReference {
                                referrer: name.clone(),
                                missing: term,
                            });
                        }
                    }
                    Some(set)
                }
            };

            let textblock = match &allowed {
                Some(set) if !set.is_empty() => set.iter().all(|child| {
                    node_specs
                        .iter()
                        .any(|(n, s)| n == child && s.inline)
                }),
                _ => false,
            };

            node_order.push(name.clone());
            nodes.insert(
                name.clone(),
                NodeType {
                    name: name.clone(),
                    spec: spec.clone(),
                    leaf: allowed.is_none(),
                    textblock,
                    allowed,
                },
            );
        }

        let mut marks = BTreeMap::new();
        for (name, spec) in mark_specs {
            marks.insert(
                name.clone(),
                MarkType {
                    name: name.clone(),
                    spec,
                },
            );
        }

        Ok(Schema {
            nodes,
            marks,
            node_order,
        })
    }

    pub fn node_type(&self, name: &str) -> Option<&NodeType> {
        self.nodes.get(name)
    }

    pub fn mark_type(&self, name: &str) -> Option<&MarkType> {
        self.marks.get(name)
    }

    /// Node type names in contribution order.
    pub fn node_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.node_order.iter()
    }

    pub fn mark_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.marks.keys()
    }

    /// Build a node of the given type, filling attribute defaults and
    /// checking that every child is allowed by the content model.
    pub fn node(
        &self,
        name: &str,
        attrs: Attrs,
        content: Vec<Node>,
    ) -> Result<Node, SchemaError> {
        let node_type = self
            .nodes
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType {
                name: SmolStr::new(name),
            })?;

        if let Some(allowed) = &node_type.allowed {
            for child in &content {
                if !allowed.contains(child.type_name.as_str()) {
                    return Err(SchemaError::DisallowedChild {
                        parent: node_type.name.clone(),
                        child: child.type_name.clone(),
                    });
                }
            }
        }

        let mut full_attrs = attrs;
        for attr in &node_type.spec.attrs {
            full_attrs
                .entry(attr.name.clone())
                .or_insert_with(|| attr.default.clone());
        }

        Ok(Node {
            type_name: node_type.name.clone(),
            attrs: full_attrs,
            marks: Vec::new(),
            text: None,
            content,
            leaf: node_type.leaf,
            inline: node_type.spec.inline,
            textblock: node_type.textblock,
        })
    }

    pub fn text(&self, text: impl Into<SmolStr>) -> Node {
        Node::text_node(text, Vec::new())
    }

    pub fn text_with_marks(&self, text: impl Into<SmolStr>, marks: Vec<Mark>) -> Node {
        Node::text_node(text, marks)
    }

    /// Build a mark of the given type, filling attribute defaults.
    pub fn mark(&self, name: &str, attrs: Attrs) -> Result<Mark, SchemaError> {
        let mark_type = self
            .marks
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType {
                name: SmolStr::new(name),
            })?;
        let mut full_attrs = attrs;
        for attr in &mark_type.spec.attrs {
            full_attrs
                .entry(attr.name.clone())
                .or_insert_with(|| attr.default.clone());
        }
        Ok(Mark {
            type_name: mark_type.name.clone(),
            attrs: full_attrs,
        })
    }
}

/// Split a content expression into type/group terms, stripping repetition
/// suffixes (`?`, `*`, `+`).
fn content_terms(expr: &str) -> Vec<SmolStr> {
    expr.split_whitespace()
        .map(|term| SmolStr::new(term.trim_end_matches(['?', '*', '+'])))
        .filter(|term| !term.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::attrs;

    fn contributions() -> Vec<(SmolStr, TypeContribution)> {
        vec![
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
            (
                SmolStr::new("heading"),
                TypeContribution::Node(NodeSpec {
                    content: Some("inline*".into()),
                    group: Some(SmolStr::new("block")),
                    attrs: vec![AttrSpec::new("level", AttrValue::Int(1))],
                    ..Default::default()
                }),
            ),
            (
                SmolStr::new("strong"),
                TypeContribution::Mark(MarkSpec::default()),
            ),
        ]
    }

    #[test]
    fn test_compile_resolves_groups_and_flags() {
        let schema = Schema::compile(contributions()).unwrap();
        let doc = schema.node_type("doc").unwrap();
        let allowed = doc.allowed.as_ref().unwrap();
        assert!(allowed.contains("paragraph"));
        assert!(allowed.contains("heading"));
        assert!(!allowed.contains("text"));

        let para = schema.node_type("paragraph").unwrap();
        assert!(para.textblock);
        assert!(!para.leaf);
        assert!(schema.node_type("text").unwrap().leaf);
        assert!(schema.mark_type("strong").is_some());
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let mut c = contributions();
        c.push((
            SmolStr::new("paragraph"),
            TypeContribution::Node(NodeSpec::default()),
        ));
        assert!(matches!(
            Schema::compile(c),
            Err(SchemaError::DuplicateType { .. })
        ));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let c = vec![
            (
                SmolStr::new("doc"),
                TypeContribution::Node(NodeSpec {
                    content: Some("paragraph+".into()),
                    ..Default::default()
                }),
            ),
            (
                SmolStr::new("paragraph"),
                TypeContribution::Node(NodeSpec {
                    content: None,
                    ..Default::default()
                }),
            ),
        ];
        assert!(matches!(
            Schema::compile(c),
            Err(SchemaError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_node_fills_defaults_and_checks_children() {
        let schema = Schema::compile(contributions()).unwrap();
        let text = schema.text("hi");
        let heading = schema.node("heading", Attrs::new(), vec![text]).unwrap();
        assert_eq!(heading.attrs.get("level"), Some(&AttrValue::Int(1)));

        let para = schema
            .node("paragraph", Attrs::new(), vec![schema.text("x")])
            .unwrap();
        let err = schema.node("paragraph", Attrs::new(), vec![para]);
        assert!(matches!(err, Err(SchemaError::DisallowedChild { .. })));
    }

    #[test]
    fn test_explicit_attrs_override_defaults() {
        let schema = Schema::compile(contributions()).unwrap();
        let heading = schema
            .node("heading", attrs([("level", 3.into())]), vec![])
            .unwrap();
        assert_eq!(heading.attrs.get("level"), Some(&AttrValue::Int(3)));
    }
}
