//! Macro registry
//!
//! Provides [`MacroRegistry`], the case-insensitive name → macro table.
//! Definition macros register into it while a batch is running, so it is
//! shared behind an `Arc` and mutated through `&self`.

use crate::invocation::Macro;
use crate::macros;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// Registry of executable macros keyed by lowercase name
#[derive(Default)]
pub struct MacroRegistry {
    macros: DashMap<String, Arc<dyn Macro>>,
}

impl MacroRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            macros: DashMap::new(),
        }
    }

    /// Create registry with the built-in macros
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        macros::register_builtins(&registry);
        registry
    }

    /// Register a macro, replacing any previous one with the same name
    ///
    /// Returns the replaced macro.
    pub fn register(&self, name: &str, macro_impl: Arc<dyn Macro>) -> Option<Arc<dyn Macro>> {
        let key = name.to_lowercase();
        tracing::info!(macro_name = %key, "registered macro");
        self.macros.insert(key, macro_impl)
    }

    /// Case-insensitive lookup
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Macro>> {
        self.macros
            .get(&name.to_lowercase())
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Check if a macro exists
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(&name.to_lowercase())
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.macros.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

impl fmt::Debug for MacroRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacroRegistry").field("names", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::macro_fn;
    use galaxy_scene::MacroOutput;

    fn constant(text: &'static str) -> Arc<dyn Macro> {
        macro_fn(move |_| async move { Ok(MacroOutput::from(text)) })
    }

    #[test]
    fn lookup_ignores_case() {
        let registry = MacroRegistry::new();
        registry.register("Deno", constant("d"));
        assert!(registry.contains("deno"));
        assert!(registry.contains("DENO"));
        assert!(registry.get("dEnO").is_some());
        assert_eq!(registry.names(), vec!["deno".to_string()]);
    }

    #[test]
    fn reregistering_replaces() {
        let registry = MacroRegistry::new();
        assert!(registry.register("x", constant("a")).is_none());
        assert!(registry.register("X", constant("b")).is_some());
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
    }

    #[test]
    fn defaults_include_builtins_but_not_draw() {
        let registry = MacroRegistry::with_defaults();
        for name in [
            "js", "deno", "python", "save", "open", "publish", "fetch", "cat", "ls", "complete",
            "prompt", "jump",
        ] {
            assert!(registry.contains(name), "missing builtin {name}");
        }
        assert!(!registry.contains("draw"));
    }
}
