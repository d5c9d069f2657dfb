use std::sync::Arc;

use crate::core::config::EnsembleConfig;
use crate::core::error::ConfigError;
use crate::engine::{BackendAdapter, CommandAdapter};

/// Caller-owned set of engines handed to the coordinator. Adapters live as
/// long as the registry; dropping it releases every engine.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn BackendAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EnsembleConfig) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for spec in config.enabled_engines() {
            registry.register(CommandAdapter::from_spec(spec))?;
        }
        registry.ensure_not_empty()?;
        Ok(registry)
    }

    pub fn register<A>(&mut self, adapter: A) -> Result<(), ConfigError>
    where
        A: BackendAdapter + 'static,
    {
        self.register_shared(Arc::new(adapter))
    }

    pub fn register_shared(&mut self, adapter: Arc<dyn BackendAdapter>) -> Result<(), ConfigError> {
        if self.adapters.iter().any(|a| a.engine() == adapter.engine()) {
            return Err(ConfigError::DuplicateEngine(adapter.engine().to_string()));
        }
        self.adapters.push(adapter);
        Ok(())
    }

    pub fn ensure_not_empty(&self) -> Result<(), ConfigError> {
        if self.adapters.is_empty() {
            Err(ConfigError::NoEngines)
        } else {
            Ok(())
        }
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn BackendAdapter>> {
        self.adapters.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.engine()).collect()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("engines", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineSpec;
    use crate::engine::StaticAdapter;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn spec(name: &str, enabled: bool) -> EngineSpec {
        EngineSpec {
            name: name.to_string(),
            program: PathBuf::from("python3"),
            args: vec![format!("bridges/{name}.py")],
            relative_coords: false,
            enabled,
        }
    }

    #[test]
    fn builds_enabled_engines_in_config_order() {
        let config = EnsembleConfig {
            engines: vec![spec("doctr", true), spec("easyocr", false), spec("paddle", true)],
            ..Default::default()
        };
        let registry = AdapterRegistry::from_config(&config).unwrap();
        assert_eq!(registry.names(), vec!["doctr", "paddle"]);
    }

    #[test]
    fn rejects_empty_and_duplicate_registries() {
        let config = EnsembleConfig {
            engines: vec![spec("doctr", false)],
            ..Default::default()
        };
        assert!(matches!(
            AdapterRegistry::from_config(&config),
            Err(ConfigError::NoEngines)
        ));

        let mut registry = AdapterRegistry::new();
        registry.register(StaticAdapter::new("A", vec![])).unwrap();
        assert!(matches!(
            registry.register(StaticAdapter::new("A", vec![])),
            Err(ConfigError::DuplicateEngine(name)) if name == "A"
        ));
        assert_eq!(registry.len(), 1);
    }
}
