use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use super::backend::ClassifierBackend;

/// Registry of classifier backends.
///
/// Different screens run different models (the pan alignment screen and
/// the ingredient guide screen do not share one), so backends are
/// registered by name and each screen profile selects its own.
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn ClassifierBackend>>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: ClassifierBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(backend));
    }

    /// Set the default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Get a backend by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ClassifierBackend>> {
        self.backends.get(name).cloned()
    }

    /// Get the default backend.
    pub fn default_backend(&self) -> Option<Arc<dyn ClassifierBackend>> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// Resolve a name, falling back to the default when unknown.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ClassifierBackend>> {
        self.get(name)
            .or_else(|| self.default_backend())
            .ok_or_else(|| anyhow!("no backend registered for '{}' and no default", name))
    }

    /// List registered backend names.
    pub fn list(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Prediction, ScriptedBackend, StubBackend};

    #[test]
    fn first_registered_backend_is_default() {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());
        registry.register(ScriptedBackend::new(vec![Prediction::default()]));

        let default = registry.default_backend().expect("default");
        assert_eq!(default.name(), "stub");
        assert_eq!(registry.list().len(), 2);
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());

        assert_eq!(registry.resolve("missing").expect("fallback").name(), "stub");
        assert!(registry.set_default("missing").is_err());

        let empty = BackendRegistry::new();
        assert!(empty.resolve("anything").is_err());
    }
}
