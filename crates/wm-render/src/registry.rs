//! Macro registry
//!
//! Maps directive names to handlers. A registry is a plain value carried
//! by the render context:
//! - the base mapping is built once and shared (`Arc`)
//! - tests and sandboxes stack [`Overlay`]s on a clone, which bind or
//!   unbind names without touching the base
//! - dropping the overlaid clone restores the previous bindings
//!
//! # Example
//!
//! ```rust
//! use wm_render::{builtin_registry, Overlay};
//!
//! let base = builtin_registry();
//! let sandboxed = base.with_overlay(Overlay::new().unbind("project-variable"));
//!
//! assert!(sandboxed.lookup("project-variable").is_err());
//! assert!(base.lookup("project-variable").is_ok());
//! ```

use crate::error::ProcessingError;
use crate::handler::MacroHandler;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
enum Binding {
    Bound(Arc<dyn MacroHandler>),
    Unbound,
}

/// One layer of temporary bindings
#[derive(Clone, Default)]
pub struct Overlay {
    bindings: HashMap<String, Binding>,
}

impl Overlay {
    /// Create empty overlay
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler under its own name
    #[must_use]
    pub fn bind(mut self, handler: impl MacroHandler + 'static) -> Self {
        self.bindings
            .insert(handler.name().to_string(), Binding::Bound(Arc::new(handler)));
        self
    }

    /// Hide a name
    #[must_use]
    pub fn unbind(mut self, name: impl Into<String>) -> Self {
        self.bindings.insert(name.into(), Binding::Unbound);
        self
    }
}

impl std::fmt::Debug for Overlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.bindings.keys().collect();
        names.sort();
        f.debug_struct("Overlay").field("names", &names).finish()
    }
}

/// Directive name → handler mapping
#[derive(Clone, Default)]
pub struct MacroRegistry {
    base: Arc<HashMap<String, Arc<dyn MacroHandler>>>,
    overlays: Vec<Arc<Overlay>>,
}

impl MacroRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler in the base mapping, replacing any previous one
    pub fn register(&mut self, handler: impl MacroHandler + 'static) {
        let name = handler.name().to_string();
        tracing::debug!(%name, "registering macro");
        Arc::make_mut(&mut self.base).insert(name, Arc::new(handler));
    }

    /// Remove a handler from the base mapping
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn MacroHandler>> {
        Arc::make_mut(&mut self.base).remove(name)
    }

    /// Copy of this registry with an overlay on top
    #[must_use]
    pub fn with_overlay(&self, overlay: Overlay) -> Self {
        let mut registry = self.clone();
        registry.overlays.push(Arc::new(overlay));
        registry
    }

    /// Copy of this registry with the given names unbound
    #[must_use]
    pub fn sandboxed<S: AsRef<str>>(&self, disabled: &[S]) -> Self {
        if disabled.is_empty() {
            return self.clone();
        }
        let overlay = disabled
            .iter()
            .fold(Overlay::new(), |o, name| o.unbind(name.as_ref()));
        self.with_overlay(overlay)
    }

    /// Handler bound to `name`, if any
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn MacroHandler>> {
        for overlay in self.overlays.iter().rev() {
            match overlay.bindings.get(name) {
                Some(Binding::Bound(handler)) => return Some(Arc::clone(handler)),
                Some(Binding::Unbound) => return None,
                None => {}
            }
        }
        self.base.get(name).cloned()
    }

    /// Handler bound to `name`
    ///
    /// # Errors
    /// `NotFound` [`ProcessingError`] naming the directive.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn MacroHandler>, ProcessingError> {
        self.get(name)
            .ok_or_else(|| ProcessingError::unknown_macro(name))
    }

    /// Every bound name, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .base
            .keys()
            .chain(self.overlays.iter().flat_map(|o| o.bindings.keys()))
            .filter(|name| self.get(name).is_some())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

impl std::fmt::Debug for MacroRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacroRegistry")
            .field("names", &self.names())
            .field("overlays", &self.overlays.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RenderContext;
    use crate::error::ErrorKind;
    use crate::handler::MacroOutput;
    use crate::invocation::MacroInvocation;
    use wm_params::ParamDefinitionSection;

    struct Fixed {
        name: &'static str,
        output: &'static str,
        schema: ParamDefinitionSection,
    }

    impl Fixed {
        fn new(name: &'static str, output: &'static str) -> Self {
            Self {
                name,
                output,
                schema: ParamDefinitionSection::new(),
            }
        }
    }

    impl MacroHandler for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn schema(&self) -> &ParamDefinitionSection {
            &self.schema
        }

        fn render(
            &self,
            _: &MacroInvocation,
            _: &RenderContext,
        ) -> Result<MacroOutput, ProcessingError> {
            Ok(MacroOutput::Text(self.output.to_string()))
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = MacroRegistry::new();
        registry.register(Fixed::new("hello", "hi"));
        assert_eq!(registry.lookup("hello").unwrap().name(), "hello");
        assert_eq!(registry.names(), ["hello"]);
    }

    #[test]
    fn unknown_name_is_not_found() {
        let err = MacroRegistry::new().lookup("nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_html(), "Error in nope macro: No such macro: <b>nope</b>.");
    }

    #[test]
    fn overlay_shadows_without_mutating_base() {
        let mut base = MacroRegistry::new();
        base.register(Fixed::new("hello", "hi"));

        let overlaid = base.with_overlay(Overlay::new().bind(Fixed::new("hello", "stub")));
        let stacked = overlaid.with_overlay(Overlay::new().unbind("hello"));

        assert!(stacked.get("hello").is_none());
        assert!(overlaid.get("hello").is_some());
        drop(stacked);
        drop(overlaid);
        assert!(base.get("hello").is_some());
        assert_eq!(base.names(), ["hello"]);
    }

    #[test]
    fn register_on_clone_leaves_original() {
        let mut base = MacroRegistry::new();
        base.register(Fixed::new("a", "a"));
        let mut copy = base.clone();
        copy.register(Fixed::new("b", "b"));
        copy.unregister("a");

        assert_eq!(base.names(), ["a"]);
        assert_eq!(copy.names(), ["b"]);
    }

    #[test]
    fn sandbox_unbinds_names() {
        let mut base = MacroRegistry::new();
        base.register(Fixed::new("a", "a"));
        base.register(Fixed::new("b", "b"));
        let sandboxed = base.sandboxed(&["a"]);
        assert_eq!(sandboxed.names(), ["b"]);
    }
}
