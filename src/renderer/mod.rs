//! Rendering template references to HTML
//!
//! A [`Renderer`] owns the shared views, every registered context and a cache
//! of compiled templates. Renders are safe from many threads at once.

mod assemble;
mod cache;
mod config;
mod data;
mod error;
mod resolve;

use std::io::Write;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::address::TemplateAddress;
use crate::template::{Executor, FuncMap, TemplateLookup};
use crate::views::{SourceKind, ViewFs, ViewSource, Views};

pub use assemble::{CompiledTemplate, CONTENT_BLOCK, LAYOUT_BLOCK, SYNTHETIC_ROOT};
pub use config::{ConfigError, RendererConfig, DEFAULT_ADMIN_CONTEXT};
pub use data::{DataProvider, DATA_KEY};
pub use error::{BoxError, ContextError, CreateError, Error, RenderError};

use cache::{CacheState, Request, TemplateCache};
use data::Providers;
use resolve::{has_reserved, RenderContext};

/// Composes and renders layered views
pub struct Renderer {
    config: RendererConfig,
    funcs: FuncMap,
    state: CacheState,
    strategy: Box<dyn TemplateCache>,
    providers: RwLock<Providers>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.config)
            .field("cached", &self.state.cache.len())
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Create a renderer over the shared views with the built-in functions
    pub fn new(views: Arc<dyn ViewFs>, config: RendererConfig) -> Result<Self, CreateError> {
        Self::with_funcs(views, config, FuncMap::new())
    }

    /// Create a renderer with a custom function map
    pub fn with_funcs(
        views: Arc<dyn ViewFs>,
        config: RendererConfig,
        funcs: FuncMap,
    ) -> Result<Self, CreateError> {
        views.check().map_err(CreateError::MissingViews)?;
        let shared = ViewSource::load(views, SourceKind::Shared, &funcs)?;

        tracing::info!(
            hot_reload = config.hot_reload,
            default_layout = shared.default_layout().unwrap_or(""),
            "renderer created"
        );

        Ok(Self {
            strategy: cache::strategy(config.hot_reload),
            state: CacheState::new(Views::new(shared)),
            providers: RwLock::new(Providers::default()),
            config,
            funcs,
        })
    }

    /// Register the views of a context
    pub fn add_context(&self, name: &str, views: Arc<dyn ViewFs>) -> Result<(), ContextError> {
        if name.is_empty() {
            return Err(ContextError::EmptyName);
        }
        if has_reserved(name) {
            return Err(ContextError::InvalidName(name.to_string()));
        }
        views.check().map_err(|source| ContextError::MissingViews {
            name: name.to_string(),
            source,
        })?;

        let _guard = self.state.lock.lock();
        let current = self.state.views.load_full();
        if current.has_context(name) {
            return Err(ContextError::AlreadyAdded(name.to_string()));
        }
        let source = ViewSource::load(views, SourceKind::Context, &self.funcs).map_err(
            |source| ContextError::Load {
                name: name.to_string(),
                source,
            },
        )?;
        let default_layout = source.default_layout().unwrap_or("").to_string();
        self.state
            .views
            .store(Arc::new(current.with_context(name, source)));

        tracing::info!(context = name, default_layout = %default_layout, "context added");
        Ok(())
    }

    /// Attach a data provider to a base layout; `""` means the shared default
    pub fn add_base_data<F>(&self, layout: &str, provider: F) -> Result<(), CreateError>
    where
        F: Fn() -> Result<Map<String, Value>, BoxError> + Send + Sync + 'static,
    {
        let views = self.state.views.load();
        let shared = views.shared();
        let name = match layout {
            "" => shared.default_layout(),
            name => Some(name).filter(|name| shared.has_layout(name)),
        };
        let name = name.ok_or_else(|| CreateError::UnknownLayout(layout.to_string()))?;

        self.providers
            .write()
            .add_base(name.to_string(), Arc::new(provider));
        Ok(())
    }

    /// Attach a data provider to a context layout; `""` means the context's default
    pub fn add_layout_data<F>(
        &self,
        context: &str,
        layout: &str,
        provider: F,
    ) -> Result<(), CreateError>
    where
        F: Fn() -> Result<Map<String, Value>, BoxError> + Send + Sync + 'static,
    {
        let views = self.state.views.load();
        let overlay = views
            .overlay(Some(context))
            .ok_or_else(|| CreateError::UnknownContext(context.to_string()))?;
        let name = match layout {
            "" => overlay.default_context_layout(),
            name => Some(name).filter(|name| overlay.layout(name).is_some()),
        };
        let name = name.ok_or_else(|| CreateError::UnknownLayout(layout.to_string()))?;

        self.providers.write().add_layout(
            context.to_string(),
            name.to_string(),
            Arc::new(provider),
        );
        Ok(())
    }

    /// Render `reference` in `context` with `data`, writing HTML to `out`.
    ///
    /// Nothing is written unless the whole render succeeds.
    #[instrument(name = "render", skip(self, out, data))]
    pub fn render<W, T>(
        &self,
        out: &mut W,
        context: &str,
        reference: &str,
        data: &T,
    ) -> Result<(), RenderError>
    where
        W: Write + ?Sized,
        T: Serialize + ?Sized,
    {
        let html = self.render_to_string(context, reference, data)?;
        out.write_all(html.as_bytes())?;
        Ok(())
    }

    /// Render to a new string
    pub fn render_to_string<T>(
        &self,
        context: &str,
        reference: &str,
        data: &T,
    ) -> Result<String, RenderError>
    where
        T: Serialize + ?Sized,
    {
        let address =
            TemplateAddress::parse(reference).map_err(|source| RenderError::InvalidReference {
                reference: reference.to_string(),
                source,
            })?;
        let context = RenderContext::parse(context, &self.config.admin_context);
        let request = Request {
            context: &context,
            address: &address,
            admin_context: &self.config.admin_context,
        };

        let (resolved, compiled) = self.strategy.fetch(&self.state, &request, &self.funcs)?;
        tracing::debug!(reference, key = %resolved.key, "render template");

        let data = serde_json::to_value(data).map_err(RenderError::Serialize)?;
        let data = self.providers.read().merge(&resolved, data)?;

        let entry = match &resolved.fragment {
            Some(fragment) => {
                if compiled.lookup(fragment).is_none() {
                    return Err(RenderError::FragmentNotFound {
                        key: resolved.key.clone(),
                        fragment: fragment.clone(),
                    });
                }
                fragment.as_str()
            }
            None => compiled.entry(),
        };

        let mut html = String::new();
        Executor::new(compiled.as_ref(), &self.funcs)
            .execute(entry, &data, &mut html)
            .map_err(|source| RenderError::Execute {
                key: resolved.key.clone(),
                source,
            })?;
        Ok(html)
    }

    /// Number of compiled templates currently cached
    pub fn cached_templates(&self) -> usize {
        self.state.cache.len()
    }
}
