//! Schema registry.

use pitchpulse_core::{FeatureName, FeatureSchema, GatewayError, GatewayResult};
use std::collections::HashMap;

/// Output schemas keyed by feature name.
///
/// Written only while the catalog is being built; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<FeatureName, FeatureSchema>,
}

impl SchemaRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema under its feature name
    ///
    /// # Errors
    /// Returns `DuplicateFeature` if the feature is already registered, or a
    /// configuration error if the schema declares a field twice
    pub fn register(&mut self, schema: FeatureSchema) -> GatewayResult<()> {
        let feature = schema.feature().clone();
        if self.schemas.contains_key(&feature) {
            return Err(GatewayError::DuplicateFeature {
                feature: feature.to_string(),
            });
        }

        let duplicates = schema.duplicate_fields();
        if !duplicates.is_empty() {
            return Err(GatewayError::configuration(format!(
                "Schema for '{feature}' declares fields more than once: {}",
                duplicates.join(", ")
            )));
        }

        self.schemas.insert(feature, schema);
        Ok(())
    }

    /// Look up the schema of a feature
    ///
    /// # Errors
    /// Returns `UnknownFeature` if nothing is registered under the name
    pub fn lookup(&self, feature: &str) -> GatewayResult<&FeatureSchema> {
        self.schemas
            .get(feature)
            .ok_or_else(|| GatewayError::unknown_feature(feature))
    }

    /// Whether a feature is registered
    #[must_use]
    pub fn contains(&self, feature: &str) -> bool {
        self.schemas.contains_key(feature)
    }

    /// Registered feature names, sorted
    #[must_use]
    pub fn features(&self) -> Vec<&FeatureName> {
        let mut names: Vec<&FeatureName> = self.schemas.keys().collect();
        names.sort();
        names
    }

    /// Number of registered features
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&FeatureName, &FeatureSchema)> {
        self.schemas.iter()
    }
}
