//! Compiled template cache and the two caching strategies

use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::address::TemplateAddress;
use crate::template::FuncMap;
use crate::views::Views;

use super::assemble::{assemble, CompiledTemplate};
use super::error::RenderError;
use super::resolve::{resolve, RenderContext, Resolved};

/// Views snapshot and compiled templates shared by all renders
pub(crate) struct CacheState {
    pub views: ArcSwap<Views>,
    /// Serialises cache inserts and snapshot swaps
    pub lock: Mutex<()>,
    pub cache: DashMap<String, Arc<CompiledTemplate>>,
}

impl CacheState {
    pub fn new(views: Views) -> Self {
        Self {
            views: ArcSwap::from_pointee(views),
            lock: Mutex::new(()),
            cache: DashMap::new(),
        }
    }

    fn get(&self, key: &str) -> Option<Arc<CompiledTemplate>> {
        self.cache.get(key).map(|entry| entry.value().clone())
    }

    /// Assemble and insert. Callers hold `lock`.
    fn build(
        &self,
        views: &Views,
        resolved: &Resolved,
        funcs: &FuncMap,
    ) -> Result<Arc<CompiledTemplate>, RenderError> {
        let compiled = Arc::new(assemble(views, resolved, funcs)?);
        self.cache.insert(resolved.key.clone(), compiled.clone());
        tracing::info!(key = %resolved.key, "template cached");
        Ok(compiled)
    }
}

/// What a strategy is asked to produce a template for
pub(crate) struct Request<'a> {
    pub context: &'a RenderContext,
    pub address: &'a TemplateAddress,
    pub admin_context: &'a str,
}

impl Request<'_> {
    fn resolve(&self, views: &Views) -> Result<Resolved, RenderError> {
        resolve(views, self.context, self.address, self.admin_context)
    }
}

/// How compiled templates are obtained for a render
pub(crate) trait TemplateCache: Send + Sync {
    fn fetch(
        &self,
        state: &CacheState,
        request: &Request<'_>,
        funcs: &FuncMap,
    ) -> Result<(Resolved, Arc<CompiledTemplate>), RenderError>;
}

/// Build each template once and keep it for the renderer's lifetime
pub(crate) struct Cached;

impl TemplateCache for Cached {
    fn fetch(
        &self,
        state: &CacheState,
        request: &Request<'_>,
        funcs: &FuncMap,
    ) -> Result<(Resolved, Arc<CompiledTemplate>), RenderError> {
        let resolved = request.resolve(&state.views.load())?;
        if let Some(hit) = state.get(&resolved.key) {
            tracing::debug!(key = %resolved.key, "cache hit");
            return Ok((resolved, hit));
        }

        let _guard = state.lock.lock();
        // The snapshot may have been swapped while waiting for the lock
        let views = state.views.load_full();
        let resolved = request.resolve(&views)?;
        if let Some(hit) = state.get(&resolved.key) {
            return Ok((resolved, hit));
        }
        let compiled = state.build(&views, &resolved, funcs)?;
        Ok((resolved, compiled))
    }
}

/// Reload every view source before each render
pub(crate) struct Reloading;

impl TemplateCache for Reloading {
    fn fetch(
        &self,
        state: &CacheState,
        request: &Request<'_>,
        funcs: &FuncMap,
    ) -> Result<(Resolved, Arc<CompiledTemplate>), RenderError> {
        let _guard = state.lock.lock();

        let fresh = match state.views.load().reload(funcs) {
            Ok(fresh) => Arc::new(fresh),
            Err(err) => {
                tracing::warn!(error = %err, "hot reload failed, keeping previous views");
                return Err(err.into());
            }
        };
        state.views.store(fresh.clone());
        state.cache.clear();

        let resolved = request.resolve(&fresh)?;
        let compiled = state.build(&fresh, &resolved, funcs)?;
        Ok((resolved, compiled))
    }
}

/// Pick the strategy for a renderer
pub(crate) fn strategy(hot_reload: bool) -> Box<dyn TemplateCache> {
    if hot_reload {
        Box::new(Reloading)
    } else {
        Box::new(Cached)
    }
}
