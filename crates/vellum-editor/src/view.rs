//! The editor view: renderer binding lifecycle and repaint generation.

use smol_str::SmolStr;
use vellum_model::{EditorState, Step};

use crate::node_views::{RendererAdapter, RendererBinding};
use crate::plugin::Decoration;

/// Tracks host-rendered nodes across state changes. Each binding's position
/// is mapped through the applied steps; a node keeps its binding exactly
/// when its mapped position still holds a node of the same type.
pub struct EditorView {
    adapter: Box<dyn RendererAdapter>,
    rendered_types: Vec<SmolStr>,
    bindings: Vec<RendererBinding>,
    next_id: u64,
    repaint_gen: u64,
    pub focused: bool,
}

impl EditorView {
    pub fn new(adapter: Box<dyn RendererAdapter>, rendered_types: Vec<SmolStr>) -> Self {
        Self {
            adapter,
            rendered_types,
            bindings: Vec::new(),
            next_id: 0,
            repaint_gen: 0,
            focused: false,
        }
    }

    pub fn bindings(&self) -> &[RendererBinding] {
        &self.bindings
    }

    pub fn repaint_gen(&self) -> u64 {
        self.repaint_gen
    }

    pub fn repaint(&mut self) {
        self.repaint_gen += 1;
    }

    /// Re-resolve bindings against the document, mounting, updating, and
    /// unmounting through the adapter. `steps` are the steps that produced
    /// this state since the last sync; an empty list means a wholesale
    /// document swap.
    pub fn sync(&mut self, state: &EditorState, decorations: &[Decoration], steps: &[Step]) {
        let mut found: Vec<(usize, SmolStr, vellum_model::Attrs)> = Vec::new();
        state.doc.descendants(&mut |pos, node| {
            if self.rendered_types.contains(&node.type_name) {
                found.push((pos, node.type_name.clone(), node.attrs.clone()));
            }
        });

        let old = std::mem::take(&mut self.bindings);
        let mut remaining: Vec<(usize, RendererBinding)> = old
            .into_iter()
            .map(|binding| {
                let mapped = steps.iter().fold(binding.pos, |pos, step| step.map_pos(pos));
                (mapped, binding)
            })
            .collect();
        let mut next: Vec<RendererBinding> = Vec::with_capacity(found.len());

        for (pos, type_name, attrs) in found {
            let node_decorations: Vec<Decoration> = decorations
                .iter()
                .filter(|d| d.from <= pos && pos < d.to)
                .cloned()
                .collect();
            // positional pairing: a node that persisted keeps its binding
            // even when an earlier sibling of the same type vanished
            let paired = remaining
                .iter()
                .position(|(mapped, b)| *mapped == pos && b.type_name == type_name)
                .map(|i| remaining.remove(i).1);
            match paired {
                Some(mut binding) => {
                    binding.pos = pos;
                    binding.attrs = attrs;
                    binding.decorations = node_decorations;
                    self.adapter.update(&binding);
                    next.push(binding);
                }
                None => {
                    self.next_id += 1;
                    let binding = RendererBinding {
                        id: self.next_id,
                        type_name,
                        pos,
                        attrs,
                        decorations: node_decorations,
                    };
                    self.adapter.mount(&binding);
                    next.push(binding);
                }
            }
        }

        for (_, stale) in remaining {
            self.adapter.unmount(stale.id);
        }
        self.bindings = next;
    }
}
