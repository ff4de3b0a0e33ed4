//! Transform registry for looking up transforms by name.
//!
//! Pipelines name their steps in the project file; the registry maps those
//! names onto [`Transform`] implementations.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::css::{AutoprefixTransform, BeautifyCssTransform, MinifyCssTransform};
use crate::html::MinifyHtmlTransform;
use crate::include::IncludePartialsTransform;
use crate::optimize::OptimizeImageTransform;
use crate::sass::SassTransform;
use crate::traits::Transform;

/// A registry of named transforms.
#[derive(Default, Clone)]
pub struct TransformRegistry {
    transforms: BTreeMap<String, Arc<dyn Transform>>,
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transforms", &self.transforms.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TransformRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in transform.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(SassTransform);
        registry.register(AutoprefixTransform);
        registry.register(MinifyCssTransform);
        registry.register(BeautifyCssTransform);
        registry.register(MinifyHtmlTransform);
        registry.register(IncludePartialsTransform);
        registry.register(OptimizeImageTransform);
        registry
    }

    /// Register a transform under its own name, replacing any previous one.
    pub fn register<T: Transform + 'static>(&mut self, transform: T) -> &mut Self {
        self.register_arc(Arc::new(transform))
    }

    /// Register an already shared transform.
    pub fn register_arc(&mut self, transform: Arc<dyn Transform>) -> &mut Self {
        let name = transform.name().to_string();
        if self.transforms.insert(name.clone(), transform).is_some() {
            tracing::debug!("replaced transform '{}'", name);
        }
        self
    }

    /// Look up a transform by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Transform>> {
        self.transforms.get(name).cloned()
    }

    /// Check if a transform exists.
    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.transforms.keys().map(|k| k.as_str())
    }
}
