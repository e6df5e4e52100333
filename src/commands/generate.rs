//! Generate command - run one feature against the configured model.

use anyhow::{bail, Result};
use clap::Args;
use pitchpulse_config::GatewayConfig;
use pitchpulse_core::GenerationResult;
use pitchpulse_features::{movement, Feature};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::bootstrap;
use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the generate command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Feature name
    pub feature: Feature,

    /// Request context (JSON file)
    #[arg(short = 'x', long)]
    pub context: Option<PathBuf>,

    /// Local clip to upload for movement_analysis; fills `clip_uri` and
    /// `mime_type` in the context
    #[arg(long)]
    pub clip: Option<PathBuf>,

    /// Print the Prometheus metrics after the call
    #[arg(long)]
    pub metrics: bool,
}

/// Generation output.
#[derive(Debug, Serialize)]
pub struct GenerateOutput {
    pub feature: String,
    pub request_id: String,
    #[serde(flatten)]
    pub result: GenerationResult,
}

/// Execute the generate command.
pub async fn execute(args: GenerateArgs, config: GatewayConfig, json: bool) -> Result<()> {
    let mut context = match &args.context {
        Some(path) => super::read_json(path).await?,
        None => Value::Object(serde_json::Map::new()),
    };
    if let Some(ref clip) = args.clip {
        if args.feature != Feature::MovementAnalysis {
            bail!("--clip only applies to {}", Feature::MovementAnalysis);
        }
        let file = bootstrap::upload_clip(&config, clip).await?;
        context = movement::with_uploaded_clip(context, &file.uri, &file.mime_type);
    }

    let request = args
        .feature
        .request_from_context(&context, &config.model.video_model)?;
    let gateway = bootstrap::build_gateway(&config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling generation");
            on_interrupt.cancel();
        }
    });

    let result = gateway.generate_with_cancel(&request, &cancel).await?;
    let generated = GenerateOutput {
        feature: args.feature.to_string(),
        request_id: request.id().to_string(),
        result,
    };

    match OutputFormat::from_json_flag(json) {
        OutputFormat::Json => CommandResult::success(&generated).print_json()?,
        OutputFormat::Text => {
            output::generation_outcome(&generated.feature, &generated.result);
            output::key_value("Request", &generated.request_id);
            output::document(generated.result.value())?;
        }
    }

    if args.metrics {
        print!("{}", gateway.metrics().gather_text()?);
    }
    Ok(())
}
