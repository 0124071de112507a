//! Cached content rendering
//!
//! [`ContentRenderer`] is the entry point used by the surrounding
//! application: it renders pages and cards through the caches, serves
//! chart artifacts, and invalidates on content events.

use crate::chart::ChartPipeline;
use crate::config::RenderConfig;
use crate::context::RenderEnv;
use crate::directive::Document;
use crate::error::ProcessingError;
use crate::execute::{render_parsed, ChartRef};
use crate::macros::builtin_registry;
use crate::registry::MacroRegistry;
use crate::services::{ChartBackend, ContentStore, LookupError, Services};
use std::sync::Arc;
use wm_cache::{ChartArtifact, ContentEvent, RenderCaches, RenderableId};

/// Document-level render failure
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Renderable not in the content store
    #[error("{0} does not exist")]
    NoSuchRenderable(RenderableId),

    /// Owning project could not be resolved
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Extraction or generation failure
    #[error(transparent)]
    Processing(#[from] ProcessingError),
}

/// Where rendered content came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    /// Raw content cache
    RawCache,
    /// Expanded content cache
    ExpandedCache,
    /// Rendered now
    Rendered,
}

/// Rendered page or card
#[derive(Debug, Clone)]
pub struct RenderedContent {
    /// Macro-expanded text
    pub content: Arc<str>,
    /// Cache tier hit, or fresh render
    pub source: ContentSource,
    /// Chart links (fresh renders only)
    pub charts: Vec<ChartRef>,
    /// Per-directive failures (fresh renders only)
    pub errors: Vec<ProcessingError>,
}

impl RenderedContent {
    fn cached(content: Arc<str>, source: ContentSource) -> Self {
        Self {
            content,
            source,
            charts: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Renders pages and cards through the caches
pub struct ContentRenderer {
    env: RenderEnv,
    store: Arc<dyn ContentStore>,
    caches: Arc<RenderCaches>,
    charts: ChartPipeline,
}

impl ContentRenderer {
    /// Create renderer with the built-in macros
    ///
    /// Macros listed in `render.disabled_macros` are unbound.
    #[must_use]
    pub fn new(
        config: &RenderConfig,
        services: Services,
        store: Arc<dyn ContentStore>,
        backend: Arc<dyn ChartBackend>,
    ) -> Self {
        Self::with_registry(config, builtin_registry(), services, store, backend)
    }

    /// Create renderer with a custom registry
    #[must_use]
    pub fn with_registry(
        config: &RenderConfig,
        registry: MacroRegistry,
        services: Services,
        store: Arc<dyn ContentStore>,
        backend: Arc<dyn ChartBackend>,
    ) -> Self {
        let registry = registry.sandboxed(&config.render.disabled_macros);
        let env = RenderEnv::new(registry, services).with_url_prefix(config.render.url_prefix.clone());
        let caches = Arc::new(RenderCaches::new(&config.cache));
        let charts = ChartPipeline::new(
            env.clone(),
            Arc::clone(&store),
            backend,
            Arc::clone(&caches),
        );
        tracing::info!(
            macros = ?env.registry.names(),
            caching = config.cache.enabled,
            "content renderer ready"
        );
        Self {
            env,
            store,
            caches,
            charts,
        }
    }

    /// Shared caches
    #[inline]
    #[must_use]
    pub fn caches(&self) -> &Arc<RenderCaches> {
        &self.caches
    }

    /// Active registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &MacroRegistry {
        &self.env.registry
    }

    /// Switch caching on or off
    pub fn set_caching_enabled(&self, enabled: bool) {
        self.caches.set_enabled(enabled);
    }

    /// Render a page or card
    ///
    /// Content without directives goes to the raw content cache. Expanded
    /// content is cached only when it holds no charts and no macro read
    /// from another project.
    ///
    /// # Errors
    /// [`RenderError`] when the renderable or its project is unknown, or
    /// its content cannot be read.
    #[tracing::instrument(skip(self), fields(renderable = %id))]
    pub async fn render(&self, id: &RenderableId) -> Result<RenderedContent, RenderError> {
        if let Some(hit) = self.caches.expanded_content(id).await {
            return Ok(RenderedContent::cached(hit, ContentSource::ExpandedCache));
        }
        if let Some(hit) = self.caches.raw_content(id).await {
            return Ok(RenderedContent::cached(hit, ContentSource::RawCache));
        }

        let read_at = self.caches.generation(id.project());
        let stored = self
            .store
            .renderable(id)
            .ok_or_else(|| RenderError::NoSuchRenderable(id.clone()))?;
        let text = stored
            .content
            .as_deref()
            .ok_or_else(|| ProcessingError::missing_document("content", id))?;

        let document = Document::parse(text);
        if !document.has_directives() {
            let content: Arc<str> = Arc::from(text);
            self.caches
                .store_raw_content(id, read_at, Arc::clone(&content))
                .await;
            return Ok(RenderedContent::cached(content, ContentSource::Rendered));
        }

        let ctx = self.env.context_for(&stored)?;
        let expanded = render_parsed(&document, &ctx);
        let content: Arc<str> = Arc::from(expanded.content.as_str());
        if expanded.charts.is_empty() && !expanded.cross_project {
            self.caches
                .store_expanded_content(id, read_at, Arc::clone(&content))
                .await;
        } else {
            tracing::debug!(
                charts = expanded.charts.len(),
                cross_project = expanded.cross_project,
                "expanded content not cached"
            );
        }

        Ok(RenderedContent {
            content,
            source: ContentSource::Rendered,
            charts: expanded.charts,
            errors: expanded.errors,
        })
    }

    /// Chart artifact at `position` among the `chart_type` charts of `id`
    ///
    /// # Errors
    /// See [`ChartPipeline::generate`].
    pub async fn chart(
        &self,
        id: &RenderableId,
        chart_type: &str,
        position: usize,
    ) -> Result<ChartArtifact, RenderError> {
        self.charts.generate(id, chart_type, position).await
    }

    /// Invalidate the caches of the event's project
    pub fn on_content_event(&self, event: &ContentEvent) {
        self.caches.on_content_event(event);
    }
}

impl std::fmt::Debug for ContentRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentRenderer")
            .field("env", &self.env)
            .field("caches", &self.caches)
            .finish_non_exhaustive()
    }
}
