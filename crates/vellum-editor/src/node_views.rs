//! Renderer bindings: how host-rendered nodes reach the host.

use smol_str::SmolStr;
use vellum_model::Attrs;

use crate::plugin::Decoration;

/// One host-rendered node instance. The id is stable for as long as the
/// node persists, so renderer-local state survives unrelated edits.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererBinding {
    pub id: u64,
    pub type_name: SmolStr,
    pub pos: usize,
    pub attrs: Attrs,
    pub decorations: Vec<Decoration>,
}

/// Implemented by the host rendering layer.
pub trait RendererAdapter {
    fn mount(&mut self, binding: &RendererBinding);
    fn update(&mut self, binding: &RendererBinding);
    fn unmount(&mut self, id: u64);
}

/// Adapter for hosts without custom renderers.
pub struct NoopAdapter;

impl RendererAdapter for NoopAdapter {
    fn mount(&mut self, _binding: &RendererBinding) {}
    fn update(&mut self, _binding: &RendererBinding) {}
    fn unmount(&mut self, _id: u64) {}
}
