//! Frozen catalog of schemas and fallbacks.

use crate::fallback::FallbackPolicy;
use crate::registry::SchemaRegistry;
use pitchpulse_core::{
    FeatureName, FeatureSchema, GatewayError, GatewayResult, GenerationRequest,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Builder for a [`GenerationCatalog`]
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    registry: SchemaRegistry,
    fallbacks: FallbackPolicy,
}

impl CatalogBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema together with its static fallback
    ///
    /// # Errors
    /// Returns `DuplicateFeature` if the feature is already registered
    pub fn feature(self, schema: FeatureSchema, fallback: Value) -> GatewayResult<Self> {
        let feature = schema.feature().clone();
        self.schema(schema)?.fallback(feature, fallback)
    }

    /// Register a schema only
    ///
    /// # Errors
    /// Returns `DuplicateFeature` if the feature is already registered
    pub fn schema(mut self, schema: FeatureSchema) -> GatewayResult<Self> {
        self.registry.register(schema)?;
        Ok(self)
    }

    /// Register a static fallback only
    ///
    /// # Errors
    /// Returns `DuplicateFeature` if the feature already has one
    pub fn fallback(mut self, feature: impl Into<FeatureName>, value: Value) -> GatewayResult<Self> {
        self.fallbacks.register_static(feature, value)?;
        Ok(self)
    }

    /// Register a context-derived fallback
    ///
    /// # Errors
    /// Returns `DuplicateFeature` if the feature already has one
    pub fn derived_fallback<F>(mut self, feature: impl Into<FeatureName>, derive: F) -> GatewayResult<Self>
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.fallbacks.register_derived(feature, derive)?;
        Ok(self)
    }

    /// Validate and freeze
    ///
    /// # Errors
    /// Returns a configuration error if the catalog is empty, a feature lacks
    /// a fallback, or a static fallback breaks its schema
    pub fn build(self) -> GatewayResult<Arc<GenerationCatalog>> {
        if self.registry.is_empty() {
            return Err(GatewayError::configuration("No features registered"));
        }
        self.fallbacks.validate_completeness(&self.registry)?;

        let response_schemas = self
            .registry
            .iter()
            .filter_map(|(feature, schema)| {
                schema
                    .to_response_schema()
                    .map(|hint| (feature.clone(), hint))
            })
            .collect();

        info!(features = self.registry.len(), "Generation catalog built");

        Ok(Arc::new(GenerationCatalog {
            registry: self.registry,
            fallbacks: self.fallbacks,
            response_schemas,
        }))
    }
}

/// Immutable, validated schemas and fallbacks shared by every gateway
#[derive(Debug)]
pub struct GenerationCatalog {
    registry: SchemaRegistry,
    fallbacks: FallbackPolicy,
    response_schemas: HashMap<FeatureName, Value>,
}

impl GenerationCatalog {
    /// Create a builder
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Schema of a feature
    ///
    /// # Errors
    /// Returns `UnknownFeature` for unregistered features
    pub fn schema(&self, feature: &str) -> GatewayResult<&FeatureSchema> {
        self.registry.lookup(feature)
    }

    /// Static fallback of a feature (always schema-conformant)
    ///
    /// # Errors
    /// Returns `UnknownFeature` for unregistered features
    pub fn fallback_for(&self, feature: &str) -> GatewayResult<&Value> {
        self.fallbacks.fallback_for(feature)
    }

    /// Fallback for a specific request, derived from its context when possible
    ///
    /// # Errors
    /// Returns `UnknownFeature` for unregistered features
    pub fn fallback_for_request(&self, request: &GenerationRequest) -> GatewayResult<Value> {
        let schema = self.schema(request.feature().as_str())?;
        self.fallbacks.fallback_for_context(schema, request.context())
    }

    /// Upstream `responseSchema` hint, if the schema can be expressed
    #[must_use]
    pub fn response_schema(&self, feature: &str) -> Option<&Value> {
        self.response_schemas.get(feature)
    }

    /// Whether a feature has a context-derived fallback
    #[must_use]
    pub fn has_derived_fallback(&self, feature: &str) -> bool {
        self.fallbacks.has_derived(feature)
    }

    /// Registered features, sorted
    #[must_use]
    pub fn features(&self) -> Vec<&FeatureName> {
        self.registry.features()
    }

    /// The schema registry
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchpulse_core::{FieldSpec, FieldType};
    use serde_json::json;

    fn lineup_schema() -> FeatureSchema {
        FeatureSchema::new("suggested_xi")
            .field(FieldSpec::required("tactical_analysis", FieldType::String))
            .field(FieldSpec::required("player_rationales", FieldType::StringMap))
    }

    fn report_schema() -> FeatureSchema {
        FeatureSchema::new("match_report")
            .field(FieldSpec::required("match_summary", FieldType::String))
            .field(FieldSpec::required("critical_flags", FieldType::string_list()))
    }

    #[test]
    fn test_build_catalog() {
        let catalog = CatalogBuilder::new()
            .feature(report_schema(), json!({"match_summary": "n/a", "critical_flags": []}))
            .unwrap()
            .build()
            .unwrap();

        assert!(catalog.schema("match_report").is_ok());
        assert_eq!(catalog.fallback_for("match_report").unwrap()["match_summary"], "n/a");
        assert!(catalog.response_schema("match_report").is_some());
        assert_eq!(catalog.features().len(), 1);
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(CatalogBuilder::new().build().unwrap_err().is_configuration_error());
    }

    #[test]
    fn test_missing_fallback_fails_build() {
        let err = CatalogBuilder::new()
            .schema(report_schema())
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, GatewayError::MissingFallback { .. }));
    }

    #[test]
    fn test_map_fields_are_left_out_of_response_schema() {
        let catalog = CatalogBuilder::new()
            .feature(
                lineup_schema(),
                json!({"tactical_analysis": "manual", "player_rationales": {}}),
            )
            .unwrap()
            .build()
            .unwrap();

        let hint = catalog.response_schema("suggested_xi").unwrap();
        assert!(hint["properties"].get("tactical_analysis").is_some());
        assert!(hint["properties"].get("player_rationales").is_none());
    }

    #[test]
    fn test_fallback_for_request_uses_context() {
        let catalog = CatalogBuilder::new()
            .feature(
                lineup_schema(),
                json!({"tactical_analysis": "manual", "player_rationales": {}}),
            )
            .unwrap()
            .derived_fallback("suggested_xi", |context| {
                let name = context.get("captain")?.as_str()?;
                Some(json!({"tactical_analysis": "derived", "player_rationales": {"p1": name}}))
            })
            .unwrap()
            .build()
            .unwrap();

        let request = GenerationRequest::builder("suggested_xi")
            .context(json!({"captain": "Rice"}))
            .build();
        let value = catalog.fallback_for_request(&request).unwrap();
        assert_eq!(value["tactical_analysis"], "derived");
        assert!(catalog.has_derived_fallback("suggested_xi"));

        let bare = GenerationRequest::builder("suggested_xi").build();
        assert_eq!(
            catalog.fallback_for_request(&bare).unwrap()["tactical_analysis"],
            "manual"
        );
    }
}
