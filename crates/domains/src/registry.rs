//! Domain registry.

use crate::svg::SvgDomain;
use crate::{DomainError, DomainPlugin};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Registry of domain plugins, keyed by name.
pub struct DomainRegistry {
    plugins: HashMap<String, Arc<dyn DomainPlugin>>,
}

impl DomainRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Registry with the built-in domains, reading their configs from
    /// `<configs_root>/<domain>/`.
    pub fn with_builtins(configs_root: impl AsRef<Path>) -> Self {
        let root = configs_root.as_ref();
        let mut registry = Self::new();
        registry.register(Arc::new(SvgDomain::new(root.join("svg"))));
        registry
    }

    /// Register a plugin, replacing any plugin with the same name.
    pub fn register(&mut self, plugin: Arc<dyn DomainPlugin>) {
        self.plugins.insert(plugin.name().to_string(), plugin);
    }

    /// Look a plugin up by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn DomainPlugin>, DomainError> {
        self.plugins
            .get(name)
            .cloned()
            .ok_or_else(|| DomainError::UnknownDomain {
                name: name.to_string(),
                available: self.list(),
            })
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<_> = self.plugins.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let registry = DomainRegistry::with_builtins("configs");
        assert_eq!(registry.list(), vec!["svg"]);
        assert_eq!(registry.get("svg").unwrap().name(), "svg");
    }

    #[test]
    fn test_unknown_domain() {
        let registry = DomainRegistry::with_builtins("configs");
        let err = registry.get("poetry").err().unwrap();
        assert_eq!(err.to_string(), "Unknown domain 'poetry'. Available: [\"svg\"]");
    }

    #[test]
    fn test_empty_registry() {
        let registry = DomainRegistry::default();
        assert!(registry.list().is_empty());
        assert!(registry.get("svg").is_err());
    }
}
