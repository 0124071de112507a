//! Renderer configuration
//!
//! Loaded from TOML; every field has a default, so an empty file is a
//! valid configuration.
//!
//! ```toml
//! [cache]
//! enabled = true
//! chart_capacity = 2000
//! ttl_secs = 3600
//!
//! [render]
//! url_prefix = "/app"
//! disabled_macros = ["project-variable"]
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use wm_cache::CacheConfig;

/// Rendering options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Prefix for chart artifact URLs
    pub url_prefix: String,
    /// Macros unbound for every render (safe mode)
    pub disabled_macros: Vec<String>,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Cache capacities, expiry and global switch
    pub cache: CacheConfig,
    /// Rendering options
    pub render: RenderSettings,
}

impl RenderConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on malformed TOML or mistyped fields.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Parse`]
    /// if it is not valid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "loaded render config");
        Ok(config)
    }

    /// With cache configuration
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// With caching switched on or off
    #[inline]
    #[must_use]
    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.cache.enabled = enabled;
        self
    }

    /// With chart URL prefix
    #[inline]
    #[must_use]
    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.render.url_prefix = prefix.into();
        self
    }

    /// With macros disabled
    #[must_use]
    pub fn with_disabled_macros<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.render.disabled_macros = names.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_text_is_default() {
        assert_eq!(RenderConfig::from_toml_str("").unwrap(), RenderConfig::default());
    }

    #[test]
    fn partial_sections() {
        let config = RenderConfig::from_toml_str(
            "[cache]\nenabled = false\nttl_secs = 60\n\n[render]\ndisabled_macros = [\"panel\"]\n",
        )
        .unwrap();
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.ttl_secs, Some(60));
        assert_eq!(config.cache.chart_capacity, CacheConfig::default().chart_capacity);
        assert_eq!(config.render.disabled_macros, ["panel"]);
        assert_eq!(config.render.url_prefix, "");
    }

    #[test]
    fn mistyped_field_is_rejected() {
        let err = RenderConfig::from_toml_str("[cache]\nenabled = \"yes\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[render]\nurl_prefix = \"/wiki\"").unwrap();
        let config = RenderConfig::from_path(file.path()).unwrap();
        assert_eq!(config.render.url_prefix, "/wiki");
    }

    #[test]
    fn missing_file() {
        let err = RenderConfig::from_path("/nonexistent/wm-render.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
