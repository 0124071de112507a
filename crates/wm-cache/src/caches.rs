//! Three-tier render cache using moka
//!
//! Provides concurrent, lock-free (for callers) memoization of rendered
//! content. Entries are immutable once written; invalidation is a coarse
//! per-project bulk delete, so callers never need read-modify-write.

use crate::config::CacheConfig;
use crate::key::{ChartSlot, ContentEvent, ProjectId, RenderableId};
use dashmap::DashMap;
use moka::future::Cache;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Rendered chart output
///
/// Cloning is cheap: the bytes are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArtifact {
    content_type: String,
    bytes: Arc<[u8]>,
}

impl ChartArtifact {
    /// Create artifact
    #[must_use]
    pub fn new(content_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// MIME type, e.g. `image/png`
    #[inline]
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Raw bytes
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries in the raw content tier
    pub raw_entries: u64,
    /// Entries in the expanded content tier
    pub expanded_entries: u64,
    /// Entries in the chart artifact tier
    pub chart_entries: u64,
}

/// Generation of a project's content at the time it was read
///
/// Taken with [`RenderCaches::generation`] before reading the content a
/// cache entry is computed from, and handed back on store. A content
/// event in between makes the token stale and the store is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    /// Numeric value, starting at 0 for a project never invalidated
    #[inline]
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key of one entry in any tier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    renderable: RenderableId,
    generation: u64,
    slot: Option<ChartSlot>,
}

/// One cache tier
#[derive(Debug)]
struct Tier<V: Clone + Send + Sync + 'static> {
    name: &'static str,
    inner: Cache<EntryKey, V>,
}

impl<V: Clone + Send + Sync + 'static> Tier<V> {
    fn new(name: &'static str, max_capacity: u64, ttl: Option<Duration>) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(max_capacity)
            .support_invalidation_closures();
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }
        Self {
            name,
            inner: builder.build(),
        }
    }

    async fn get(&self, key: &EntryKey) -> Option<V> {
        let hit = self.inner.get(key).await;
        tracing::debug!(
            tier = self.name,
            renderable = %key.renderable,
            hit = hit.is_some(),
            "cache lookup"
        );
        hit
    }

    async fn insert(&self, key: EntryKey, value: V) {
        tracing::debug!(tier = self.name, renderable = %key.renderable, "cache write");
        self.inner.insert(key, value).await;
    }

    /// Drop every entry of `project` written under an older generation
    fn purge(&self, project: &ProjectId, current_generation: u64) {
        let project = project.clone();
        let result = self.inner.invalidate_entries_if(move |key, _| {
            key.renderable.project() == &project && key.generation < current_generation
        });
        if let Err(e) = result {
            // Stale entries stay unreachable through the generation key
            tracing::warn!(tier = self.name, error = %e, "bulk invalidation unavailable");
        }
    }
}

/// Raw content, expanded content and chart artifact caches
///
/// Shared between concurrent renders (wrap in `Arc`). Disabling turns
/// every read into a miss and every write into a no-op.
#[derive(Debug)]
pub struct RenderCaches {
    raw: Tier<Arc<str>>,
    expanded: Tier<Arc<str>>,
    charts: Tier<ChartArtifact>,
    generations: DashMap<ProjectId, u64>,
    enabled: AtomicBool,
}

impl RenderCaches {
    /// Create caches from configuration
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let ttl = config.ttl();
        Self {
            raw: Tier::new("raw_content", config.raw_capacity, ttl),
            expanded: Tier::new("expanded_content", config.expanded_capacity, ttl),
            charts: Tier::new("chart_artifact", config.chart_capacity, ttl),
            generations: DashMap::new(),
            enabled: AtomicBool::new(config.enabled),
        }
    }

    /// Switch caching on or off for all subsequent reads and writes
    ///
    /// Entries written while enabled survive a disable/enable cycle.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        tracing::info!(enabled, "render caching toggled");
    }

    /// Whether caching is on
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Current generation of a project
    #[must_use]
    pub fn generation(&self, project: &ProjectId) -> Generation {
        Generation(self.generations.get(project).map_or(0, |g| *g))
    }

    fn key(&self, renderable: &RenderableId, slot: Option<ChartSlot>) -> EntryKey {
        EntryKey {
            renderable: renderable.clone(),
            generation: self.generation(renderable.project()).value(),
            slot,
        }
    }

    /// Key for a write of content read at `read_at`, or `None` when the
    /// project has been invalidated since
    fn write_key(
        &self,
        renderable: &RenderableId,
        read_at: Generation,
        slot: Option<ChartSlot>,
    ) -> Option<EntryKey> {
        if !self.is_enabled() {
            return None;
        }
        let current = self.generation(renderable.project());
        if current != read_at {
            tracing::debug!(
                renderable = %renderable,
                %read_at,
                %current,
                "stale cache write skipped"
            );
            return None;
        }
        Some(EntryKey {
            renderable: renderable.clone(),
            generation: read_at.value(),
            slot,
        })
    }

    /// Cached raw text of a renderable
    pub async fn raw_content(&self, renderable: &RenderableId) -> Option<Arc<str>> {
        if !self.is_enabled() {
            return None;
        }
        self.raw.get(&self.key(renderable, None)).await
    }

    /// Store raw text of a renderable read at `read_at`
    pub async fn store_raw_content(
        &self,
        renderable: &RenderableId,
        read_at: Generation,
        content: impl Into<Arc<str>>,
    ) {
        if let Some(key) = self.write_key(renderable, read_at, None) {
            self.raw.insert(key, content.into()).await;
        }
    }

    /// Cached macro-expanded text of a renderable
    pub async fn expanded_content(&self, renderable: &RenderableId) -> Option<Arc<str>> {
        if !self.is_enabled() {
            return None;
        }
        self.expanded.get(&self.key(renderable, None)).await
    }

    /// Store macro-expanded text of a renderable read at `read_at`
    pub async fn store_expanded_content(
        &self,
        renderable: &RenderableId,
        read_at: Generation,
        content: impl Into<Arc<str>>,
    ) {
        if let Some(key) = self.write_key(renderable, read_at, None) {
            self.expanded.insert(key, content.into()).await;
        }
    }

    /// Cached chart artifact
    pub async fn chart(
        &self,
        renderable: &RenderableId,
        chart_type: &str,
        position: usize,
    ) -> Option<ChartArtifact> {
        if !self.is_enabled() {
            return None;
        }
        let key = self.key(renderable, Some(ChartSlot::new(chart_type, position)));
        self.charts.get(&key).await
    }

    /// Store chart artifact generated from content read at `read_at`
    pub async fn store_chart(
        &self,
        renderable: &RenderableId,
        chart_type: &str,
        position: usize,
        read_at: Generation,
        artifact: ChartArtifact,
    ) {
        let slot = Some(ChartSlot::new(chart_type, position));
        if let Some(key) = self.write_key(renderable, read_at, slot) {
            self.charts.insert(key, artifact).await;
        }
    }

    /// Invalidate every entry of a project in all tiers
    ///
    /// Returns the new generation.
    pub fn invalidate_project(&self, project: &ProjectId) -> Generation {
        let generation = {
            let mut entry = self.generations.entry(project.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        self.raw.purge(project, generation);
        self.expanded.purge(project, generation);
        self.charts.purge(project, generation);
        tracing::info!(%project, generation, "render caches invalidated");
        Generation(generation)
    }

    /// React to a content mutation
    pub fn on_content_event(&self, event: &ContentEvent) -> Generation {
        tracing::debug!(renderable = %event.renderable, kind = ?event.kind, "content event");
        self.invalidate_project(event.project())
    }

    /// Invalidate all entries of all projects
    pub fn invalidate_all(&self) {
        self.raw.inner.invalidate_all();
        self.expanded.inner.invalidate_all();
        self.charts.inner.invalidate_all();
    }

    /// Apply pending evictions so counts are exact
    pub async fn run_pending_tasks(&self) {
        self.raw.inner.run_pending_tasks().await;
        self.expanded.inner.run_pending_tasks().await;
        self.charts.inner.run_pending_tasks().await;
    }

    /// Approximate per-tier entry counts
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            raw_entries: self.raw.inner.entry_count(),
            expanded_entries: self.expanded.inner.entry_count(),
            chart_entries: self.charts.inner.entry_count(),
        }
    }
}

impl Default for RenderCaches {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(bytes: &[u8]) -> ChartArtifact {
        ChartArtifact::new("image/png", bytes.to_vec())
    }

    #[tokio::test]
    async fn raw_content_roundtrip() {
        let caches = RenderCaches::default();
        let page = RenderableId::page("demo", "Home");

        assert!(caches.raw_content(&page).await.is_none());
        let read_at = caches.generation(page.project());
        caches.store_raw_content(&page, read_at, "h1. Welcome").await;
        assert_eq!(caches.raw_content(&page).await.as_deref(), Some("h1. Welcome"));
    }

    #[tokio::test]
    async fn tiers_do_not_share_entries() {
        let caches = RenderCaches::default();
        let page = RenderableId::page("demo", "Home");

        caches
            .store_raw_content(&page, caches.generation(page.project()), "raw")
            .await;
        assert!(caches.expanded_content(&page).await.is_none());
    }

    #[tokio::test]
    async fn chart_slots_are_distinct() {
        let caches = RenderCaches::default();
        let card = RenderableId::card("demo", 7);

        let read_at = caches.generation(card.project());
        caches.store_chart(&card, "pie-chart", 1, read_at, png(b"one")).await;
        assert!(caches.chart(&card, "pie-chart", 2).await.is_none());
        assert!(caches.chart(&card, "bar-chart", 1).await.is_none());
        assert_eq!(caches.chart(&card, "pie-chart", 1).await.unwrap().bytes(), b"one");
    }

    #[tokio::test]
    async fn generation_bumps_on_invalidate() {
        let caches = RenderCaches::default();
        let project = ProjectId::new("demo");
        assert_eq!(caches.generation(&project).value(), 0);
        assert_eq!(caches.invalidate_project(&project).value(), 1);
        assert_eq!(caches.invalidate_project(&project).value(), 2);
        assert_eq!(caches.generation(&ProjectId::new("other")).value(), 0);
    }

    #[tokio::test]
    async fn stale_writes_are_skipped() {
        let caches = RenderCaches::default();
        let page = RenderableId::page("demo", "Home");
        let read_at = caches.generation(page.project());

        caches.invalidate_project(page.project());
        caches.store_raw_content(&page, read_at, "old text").await;
        caches.store_expanded_content(&page, read_at, "old text").await;
        caches.store_chart(&page, "pie-chart", 1, read_at, png(b"old")).await;

        assert!(caches.raw_content(&page).await.is_none());
        assert!(caches.expanded_content(&page).await.is_none());
        assert!(caches.chart(&page, "pie-chart", 1).await.is_none());
        caches.run_pending_tasks().await;
        assert_eq!(caches.stats(), CacheStats::default());
    }

    #[tokio::test]
    async fn stats_count_entries() {
        let caches = RenderCaches::default();
        let read_at = caches.generation(&ProjectId::new("demo"));
        for i in 0..3 {
            caches
                .store_raw_content(&RenderableId::card("demo", i), read_at, format!("card {i}"))
                .await;
        }
        caches.run_pending_tasks().await;
        assert_eq!(caches.stats().raw_entries, 3);
    }

    #[tokio::test]
    async fn disabled_at_construction() {
        let caches = RenderCaches::new(&CacheConfig::new().with_enabled(false));
        let page = RenderableId::page("demo", "Home");
        caches
            .store_raw_content(&page, caches.generation(page.project()), "text")
            .await;
        caches.set_enabled(true);
        assert!(caches.raw_content(&page).await.is_none());
    }
}
