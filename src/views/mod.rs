//! View sources and the snapshot of all registered contexts
//!
//! Every context has its own directory tree:
//!
//! ```text
//! components/*.html    reusable components, parsed at load
//! pages/*.html         page bodies
//! *.base.html          base layouts (shared views only)
//! *.layout.html        context layouts (context views only)
//! ```

mod fs;
mod loader;
mod overlay;

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

pub use fs::{DirFs, MemoryFs, ViewFs};
pub use loader::{
    LoadError, SourceKind, ViewSource, BASE_LAYOUT_EXT, COMPONENTS_DIR, CONTEXT_LAYOUT_EXT,
    DEFAULT_LAYOUT, PAGES_DIR,
};
pub use overlay::{Layer, Overlay};

use crate::template::FuncMap;

/// A source failed to load during a reload
#[derive(Error, Debug)]
#[error("reloading {origin} views: {source}")]
pub struct ReloadError {
    /// `shared` or the context name
    pub origin: String,
    #[source]
    pub source: LoadError,
}

/// Immutable snapshot of the shared views and every registered context
#[derive(Debug, Clone)]
pub struct Views {
    shared: Arc<ViewSource>,
    contexts: BTreeMap<String, Arc<ViewSource>>,
}

impl Views {
    pub fn new(shared: ViewSource) -> Self {
        Self {
            shared: Arc::new(shared),
            contexts: BTreeMap::new(),
        }
    }

    pub fn shared(&self) -> &ViewSource {
        &self.shared
    }

    pub fn context(&self, name: &str) -> Option<&ViewSource> {
        self.contexts.get(name).map(Arc::as_ref)
    }

    pub fn has_context(&self, name: &str) -> bool {
        self.contexts.contains_key(name)
    }

    /// A new snapshot with `source` registered as context `name`
    pub fn with_context(&self, name: &str, source: ViewSource) -> Self {
        let mut contexts = self.contexts.clone();
        contexts.insert(name.to_string(), Arc::new(source));
        Self {
            shared: self.shared.clone(),
            contexts,
        }
    }

    /// Lookups for context `name`, or the shared views for `None`
    pub fn overlay(&self, name: Option<&str>) -> Option<Overlay<'_>> {
        match name {
            None => Some(Overlay::new(&self.shared, None)),
            Some(name) => self
                .context(name)
                .map(|context| Overlay::new(&self.shared, Some(context))),
        }
    }

    /// Reload every source from its origin into a new snapshot
    pub fn reload(&self, funcs: &FuncMap) -> Result<Self, ReloadError> {
        let shared = self.shared.reload(funcs).map_err(|source| ReloadError {
            origin: "shared".to_string(),
            source,
        })?;

        let mut contexts = BTreeMap::new();
        for (name, source) in &self.contexts {
            let reloaded = source.reload(funcs).map_err(|source| ReloadError {
                origin: format!("context {:?}", name),
                source,
            })?;
            contexts.insert(name.clone(), Arc::new(reloaded));
        }

        Ok(Self {
            shared: Arc::new(shared),
            contexts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(files: &[(&str, &str)]) -> Arc<MemoryFs> {
        Arc::new(MemoryFs::from_files(files.iter().copied()))
    }

    #[test]
    fn test_with_context_leaves_original_untouched() {
        let funcs = FuncMap::new();
        let shared = ViewSource::load(memory(&[]), SourceKind::Shared, &funcs).expect("load");
        let blog = ViewSource::load(memory(&[]), SourceKind::Context, &funcs).expect("load");

        let views = Views::new(shared);
        let with_blog = views.with_context("blog", blog);
        assert!(!views.has_context("blog"));
        assert!(with_blog.has_context("blog"));
        assert!(with_blog.overlay(Some("blog")).is_some());
        assert!(with_blog.overlay(Some("shop")).is_none());
    }

    #[test]
    fn test_reload_failure_names_the_context() {
        let funcs = FuncMap::new();
        let blog_fs = memory(&[]);
        let shared = ViewSource::load(memory(&[]), SourceKind::Shared, &funcs).expect("load");
        let blog = ViewSource::load(blog_fs.clone(), SourceKind::Context, &funcs).expect("load");
        let views = Views::new(shared).with_context("blog", blog);

        blog_fs.insert("components/broken.html", "{{ end }}");
        let err = views.reload(&funcs).expect_err("Should fail");
        assert_eq!(err.origin, "context \"blog\"");
    }
}
