//! Schemas command - show the output contract of each feature.

use anyhow::Result;
use clap::Args;
use pitchpulse_core::FieldSpec;
use pitchpulse_features::{standard_catalog, Feature};
use serde::Serialize;
use serde_json::Value;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the schemas command.
#[derive(Args, Debug)]
pub struct SchemasArgs {
    /// Only show this feature
    pub feature: Option<Feature>,

    /// Include the response schema sent to the model
    #[arg(long)]
    pub response_schema: bool,
}

/// Schema of one feature.
#[derive(Debug, Serialize)]
pub struct SchemaOutput {
    pub feature: String,
    pub fields: Vec<FieldSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

/// Execute the schemas command.
pub fn execute(args: &SchemasArgs, json: bool) -> Result<()> {
    let catalog = standard_catalog()?;
    let features: Vec<Feature> = match args.feature {
        Some(feature) => vec![feature],
        None => Feature::ALL.to_vec(),
    };

    let mut schemas = Vec::with_capacity(features.len());
    for feature in features {
        let schema = catalog.schema(feature.as_str())?;
        schemas.push(SchemaOutput {
            feature: feature.to_string(),
            fields: schema.fields().to_vec(),
            response_schema: if args.response_schema {
                catalog.response_schema(feature.as_str()).cloned()
            } else {
                None
            },
        });
    }

    match OutputFormat::from_json_flag(json) {
        OutputFormat::Json => CommandResult::success(schemas).print_json(),
        OutputFormat::Text => {
            for schema in &schemas {
                output::section(&schema.feature);
                for field in &schema.fields {
                    let presence = if field.required { "required" } else { "optional" };
                    output::key_value(
                        &field.name,
                        &format!("{} ({presence})", field.field_type.type_name()),
                    );
                }
                if let Some(ref response_schema) = schema.response_schema {
                    output::document(response_schema)?;
                }
            }
            Ok(())
        }
    }
}
