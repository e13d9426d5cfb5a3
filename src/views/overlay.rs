//! Layering a context's views over the shared ones

use std::sync::Arc;

use super::loader::ViewSource;
use crate::template::TemplateRegistry;

/// Which source answered a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Context,
    Shared,
}

/// Lookups for one render context.
///
/// Components and pages a context defines shadow the shared source. Base
/// layouts only come from the shared source and context layouts only from the
/// context.
#[derive(Debug, Clone, Copy)]
pub struct Overlay<'v> {
    shared: &'v ViewSource,
    context: Option<&'v ViewSource>,
}

impl<'v> Overlay<'v> {
    pub fn new(shared: &'v ViewSource, context: Option<&'v ViewSource>) -> Self {
        Self { shared, context }
    }

    /// Component registries in lookup order
    pub fn component_layers(&self) -> Vec<Arc<TemplateRegistry>> {
        self.context
            .into_iter()
            .chain(std::iter::once(self.shared))
            .map(|source| source.components().clone())
            .collect()
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.context
            .into_iter()
            .chain(std::iter::once(self.shared))
            .any(|source| source.components().contains(name))
    }

    pub fn page(&self, name: &str) -> Option<(Layer, &'v str)> {
        self.context
            .and_then(|source| source.page(name))
            .map(|body| (Layer::Context, body))
            .or_else(|| self.shared.page(name).map(|body| (Layer::Shared, body)))
    }

    /// A context layout; the shared source holds none
    pub fn layout(&self, name: &str) -> Option<&'v str> {
        self.context.and_then(|source| source.layout(name))
    }

    pub fn base_layout(&self, name: &str) -> Option<&'v str> {
        self.shared.layout(name)
    }

    pub fn default_context_layout(&self) -> Option<&'v str> {
        self.context.and_then(ViewSource::default_layout)
    }
}
