//! Render context
//!
//! Everything a macro may consult while rendering, passed explicitly so
//! concurrent renders never observe each other's registry overlays or
//! card scopes.

use crate::model::{CardContext, CardScope, Project, Renderable};
use crate::registry::MacroRegistry;
use crate::services::{LookupError, Services};
use wm_cache::{RenderableId, RenderableKind};

/// Per-render context
#[derive(Debug, Clone)]
pub struct RenderContext {
    host: Project,
    renderable: RenderableId,
    card: Option<CardScope>,
    registry: MacroRegistry,
    services: Services,
    url_prefix: String,
}

impl RenderContext {
    /// Create context for rendering `renderable` in `host`
    #[must_use]
    pub fn new(
        host: Project,
        renderable: RenderableId,
        registry: MacroRegistry,
        services: Services,
    ) -> Self {
        Self {
            host,
            renderable,
            card: None,
            registry,
            services,
            url_prefix: String::new(),
        }
    }

    /// With `THIS CARD` pointing at an existing card
    #[must_use]
    pub fn with_card(mut self, card: CardContext) -> Self {
        self.card = Some(CardScope::Card(card));
        self
    }

    /// Rendering card defaults: `THIS CARD` macros are deferred
    #[must_use]
    pub fn with_card_defaults(mut self) -> Self {
        self.card = Some(CardScope::Defaults {
            project: self.host.identifier.clone(),
        });
        self
    }

    /// With prefix for chart URLs
    #[must_use]
    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    /// With a different registry (e.g. overlaid for a test)
    #[must_use]
    pub fn with_registry(mut self, registry: MacroRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Project issuing the render
    #[inline]
    #[must_use]
    pub fn host(&self) -> &Project {
        &self.host
    }

    /// Renderable being rendered
    #[inline]
    #[must_use]
    pub fn renderable(&self) -> &RenderableId {
        &self.renderable
    }

    /// `THIS CARD` scope
    #[inline]
    #[must_use]
    pub fn card_scope(&self) -> Option<&CardScope> {
        self.card.as_ref()
    }

    /// Active registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &MacroRegistry {
        &self.registry
    }

    /// Lookup services
    #[inline]
    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// URL of the artifact for the chart at `position` of this renderable
    #[must_use]
    pub fn chart_url(&self, chart_type: &str, position: usize) -> String {
        let id = &self.renderable;
        let section = match id.kind() {
            RenderableKind::Page => "wiki",
            RenderableKind::Card => "cards",
        };
        format!(
            "{}/projects/{}/{section}/{}/charts/{}/{position}",
            self.url_prefix.trim_end_matches('/'),
            urlencoding::encode(id.project().as_str()),
            urlencoding::encode(id.key()),
            urlencoding::encode(chart_type),
        )
    }
}

/// Shared pieces from which per-render contexts are built
#[derive(Debug, Clone)]
pub struct RenderEnv {
    /// Macro registry, already sandboxed
    pub registry: MacroRegistry,
    /// Lookup services
    pub services: Services,
    /// Prefix for chart URLs
    pub url_prefix: String,
}

impl RenderEnv {
    /// Create environment
    #[must_use]
    pub fn new(registry: MacroRegistry, services: Services) -> Self {
        Self {
            registry,
            services,
            url_prefix: String::new(),
        }
    }

    /// With prefix for chart URLs
    #[must_use]
    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    /// Context for rendering a stored renderable
    ///
    /// # Errors
    /// [`LookupError`] when the owning project cannot be resolved.
    pub fn context_for(&self, renderable: &Renderable) -> Result<RenderContext, LookupError> {
        let host = self
            .services
            .projects
            .resolve_project(renderable.id.project().as_str())?;
        let ctx = RenderContext::new(
            host,
            renderable.id.clone(),
            self.registry.clone(),
            self.services.clone(),
        )
        .with_url_prefix(self.url_prefix.clone());
        Ok(match &renderable.card {
            Some(card) => ctx.with_card(card.clone()),
            None => ctx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::builtin_registry;
    use crate::memory::MemoryWorld;
    use std::sync::Arc;
    use wm_query::SelectParser;

    fn context(renderable: RenderableId) -> RenderContext {
        let world = Arc::new(MemoryWorld::new());
        let services = Services::new(world.clone(), world, Arc::new(SelectParser));
        RenderContext::new(Project::new("demo", "Demo"), renderable, builtin_registry(), services)
    }

    #[test]
    fn segments_are_encoded() {
        let ctx = context(RenderableId::page("demo", "Release Notes/Draft"));
        assert_eq!(
            ctx.chart_url("pie-chart", 2),
            "/projects/demo/wiki/Release%20Notes%2FDraft/charts/pie-chart/2"
        );
    }

    #[test]
    fn card_urls_use_the_number() {
        let ctx = context(RenderableId::card("demo", 12)).with_url_prefix("/app/");
        assert_eq!(
            ctx.chart_url("ratio-bar-chart", 1),
            "/app/projects/demo/cards/12/charts/ratio-bar-chart/1"
        );
    }
}
