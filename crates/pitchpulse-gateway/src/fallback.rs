//! Fallback policy.
//!
//! Every registered feature has a static fallback that is checked against its
//! schema before any traffic flows. A feature may additionally carry a
//! context-derived fallback: a pure function of the request context that
//! produces a better substitute when the context allows it. Derived values
//! are validated at fallback time; anything missing or non-conformant falls
//! through to the static value.

use crate::registry::SchemaRegistry;
use pitchpulse_core::schema::render_violations;
use pitchpulse_core::{FeatureName, FeatureSchema, GatewayError, GatewayResult};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Context-derived fallback function
pub type DerivedFallback = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Fallback values keyed by feature name
#[derive(Clone, Default)]
pub struct FallbackPolicy {
    statics: HashMap<FeatureName, Value>,
    derived: HashMap<FeatureName, DerivedFallback>,
}

impl FallbackPolicy {
    /// Create an empty policy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the static fallback of a feature
    ///
    /// # Errors
    /// Returns `DuplicateFeature` if the feature already has one
    pub fn register_static(
        &mut self,
        feature: impl Into<FeatureName>,
        value: Value,
    ) -> GatewayResult<()> {
        let feature = feature.into();
        if self.statics.contains_key(&feature) {
            return Err(GatewayError::DuplicateFeature {
                feature: feature.to_string(),
            });
        }
        self.statics.insert(feature, value);
        Ok(())
    }

    /// Register a context-derived fallback
    ///
    /// # Errors
    /// Returns `DuplicateFeature` if the feature already has one
    pub fn register_derived<F>(&mut self, feature: impl Into<FeatureName>, derive: F) -> GatewayResult<()>
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        let feature = feature.into();
        if self.derived.contains_key(&feature) {
            return Err(GatewayError::DuplicateFeature {
                feature: feature.to_string(),
            });
        }
        self.derived.insert(feature, Arc::new(derive));
        Ok(())
    }

    /// The static fallback of a feature
    ///
    /// # Errors
    /// Returns `UnknownFeature` if the feature has no fallback
    pub fn fallback_for(&self, feature: &str) -> GatewayResult<&Value> {
        self.statics
            .get(feature)
            .ok_or_else(|| GatewayError::unknown_feature(feature))
    }

    /// The best fallback for a request: the derived value when it can be
    /// computed from `context` and passes `schema`, the static one otherwise
    ///
    /// # Errors
    /// Returns `UnknownFeature` if the feature has no static fallback
    pub fn fallback_for_context(
        &self,
        schema: &FeatureSchema,
        context: Option<&Value>,
    ) -> GatewayResult<Value> {
        let feature = schema.feature();
        let fallback = self.fallback_for(feature.as_str())?;

        let (Some(derive), Some(context)) = (self.derived.get(feature), context) else {
            return Ok(fallback.clone());
        };

        match derive(context) {
            Some(value) => match schema.validate(&value) {
                Ok(()) => {
                    debug!(feature = %feature, "Using context-derived fallback");
                    Ok(value)
                }
                Err(violations) => {
                    warn!(
                        feature = %feature,
                        violations = %render_violations(&violations),
                        "Derived fallback is not conformant, using static fallback"
                    );
                    Ok(fallback.clone())
                }
            },
            None => {
                debug!(feature = %feature, "Context insufficient for derived fallback");
                Ok(fallback.clone())
            }
        }
    }

    /// Whether a feature has a derived fallback
    #[must_use]
    pub fn has_derived(&self, feature: &str) -> bool {
        self.derived.contains_key(feature)
    }

    /// Check the policy against the registry.
    ///
    /// Run once while building the catalog.
    ///
    /// # Errors
    /// - `MissingFallback` listing every registered feature without a static
    ///   fallback
    /// - `UnknownFeature` for a fallback registered for no schema
    /// - `NonConformantFallback` for a static fallback failing its schema
    pub fn validate_completeness(&self, registry: &SchemaRegistry) -> GatewayResult<()> {
        let mut missing: Vec<String> = registry
            .features()
            .into_iter()
            .filter(|feature| !self.statics.contains_key(*feature))
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(GatewayError::MissingFallback { features: missing });
        }

        if let Some(orphan) = self
            .statics
            .keys()
            .chain(self.derived.keys())
            .find(|feature| !registry.contains(feature.as_str()))
        {
            return Err(GatewayError::unknown_feature(orphan.as_str()));
        }

        for (feature, schema) in registry.iter() {
            if let Some(value) = self.statics.get(feature) {
                schema
                    .validate(value)
                    .map_err(|violations| GatewayError::NonConformantFallback {
                        feature: feature.to_string(),
                        details: render_violations(&violations),
                    })?;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut derived: Vec<&str> = self.derived.keys().map(FeatureName::as_str).collect();
        derived.sort_unstable();
        f.debug_struct("FallbackPolicy")
            .field("statics", &self.statics)
            .field("derived", &derived)
            .finish()
    }
}
