//! Testing utilities for the wiki macro workspace
//!
//! Shared fixtures: a small world of projects, a renderer wired to it,
//! and a chart backend that records every call.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wm_cache::{ChartArtifact, ProjectId, RenderableId};
use wm_query::SelectParser;
use wm_render::{
    builtin_registry, BackendError, CardContext, ChartBackend, ChartSpecification,
    ContentRenderer, MacroRegistry, MemoryWorld, RenderConfig, RenderContext, Services,
};

/// Two readable projects and one denied project
pub const WORLD: &str = r#"
projects:
  - identifier: demo
    name: Demo
    variables:
      current release: { text: R1 }
      owner: { user: alice }
      sprint end: { date: 2024-03-01 }
    pages:
      Home: "Welcome to {{ project }}"
    cards:
      - number: 1
        name: Checkout
        properties: { Status: Open, Owner: bob }
  - identifier: other
    name: Other
    variables:
      current release: { text: R9 }
  - identifier: secret
    name: Secret
    denied: true
"#;

pub fn demo() -> ProjectId {
    ProjectId::new("demo")
}

pub fn world() -> Arc<MemoryWorld> {
    Arc::new(MemoryWorld::from_yaml_str(WORLD).unwrap())
}

pub fn services(world: &Arc<MemoryWorld>) -> Services {
    Services::new(world.clone(), world.clone(), Arc::new(SelectParser))
}

/// Context for rendering a page of `demo`
pub fn page_context(world: &Arc<MemoryWorld>, page: &str) -> RenderContext {
    RenderContext::new(
        world_project(world, "demo"),
        RenderableId::page("demo", page),
        builtin_registry(),
        services(world),
    )
}

/// Context for rendering card #1 of `demo`
pub fn card_context(world: &Arc<MemoryWorld>) -> RenderContext {
    RenderContext::new(
        world_project(world, "demo"),
        RenderableId::card("demo", 1),
        builtin_registry(),
        services(world),
    )
    .with_card(checkout_card())
}

pub fn checkout_card() -> CardContext {
    CardContext::new("demo", 1, "Checkout")
        .with_property("Status", "Open")
        .with_property("Owner", "bob")
}

fn world_project(world: &Arc<MemoryWorld>, identifier: &str) -> wm_render::Project {
    use wm_render::ProjectLookup;
    world.resolve_project(identifier).unwrap()
}

/// Renderer over `world` with a recording backend
pub struct TestRenderer {
    pub world: Arc<MemoryWorld>,
    pub backend: Arc<RecordingBackend>,
    pub renderer: ContentRenderer,
}

impl TestRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self::with_registry(config, builtin_registry())
    }

    pub fn with_registry(config: &RenderConfig, registry: MacroRegistry) -> Self {
        let world = world();
        let backend = Arc::new(RecordingBackend::default());
        let renderer = ContentRenderer::with_registry(
            config,
            registry,
            services(&world),
            world.clone(),
            backend.clone(),
        );
        Self {
            world,
            backend,
            renderer,
        }
    }

    /// Store a page in `demo` and forward the content event
    pub fn put_page(&self, name: &str, content: &str) -> RenderableId {
        let event = self
            .world
            .put_page(&demo(), name, Some(content.to_string()));
        self.renderer.on_content_event(&event);
        event.renderable
    }
}

/// Chart backend recording every request
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<ChartSpecification>>,
    failing: AtomicBool,
}

impl RecordingBackend {
    pub fn calls(&self) -> Vec<ChartSpecification> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChartBackend for RecordingBackend {
    async fn render(
        &self,
        chart_type: &str,
        spec: &ChartSpecification,
    ) -> Result<ChartArtifact, BackendError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::new("backend unavailable"));
        }
        let mut calls = self.calls.lock();
        calls.push(spec.clone());
        let body = format!("{chart_type}#{}:{}", spec.position, calls.len());
        Ok(ChartArtifact::new("text/plain", body.into_bytes()))
    }
}
