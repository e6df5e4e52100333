//! Cases command - similar-case and playbook search over the bundled knowledge base.

use anyhow::Result;
use clap::Args;
use pitchpulse_config::GatewayConfig;
use pitchpulse_retrieval::{KnowledgeBase, KnowledgeSeed, SimilarCase};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::bootstrap;
use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the cases command.
#[derive(Args, Debug)]
pub struct CasesArgs {
    /// Free-text description of the situation
    pub query: String,

    /// Number of cases to return
    #[arg(short = 'k', long, default_value_t = 3)]
    pub top_k: usize,

    /// Only return documents with this source label
    #[arg(long)]
    pub source: Option<String>,

    /// Also return the most relevant playbook rules
    #[arg(long)]
    pub playbook: bool,
}

/// Search output.
#[derive(Debug, Serialize)]
pub struct CasesOutput {
    pub cases: Vec<SimilarCase>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub playbook: Vec<String>,
}

/// Execute the cases command.
pub async fn execute(args: CasesArgs, config: GatewayConfig, json: bool) -> Result<()> {
    let embedder = bootstrap::build_embedder(&config)?;
    let knowledge = KnowledgeBase::new(Arc::new(embedder));
    let seeded = knowledge.seed(&KnowledgeSeed::bundled()?).await?;
    info!(documents = seeded, "Knowledge base seeded");

    let cases = knowledge
        .search_similar_cases(&args.query, args.top_k, args.source.as_deref())
        .await?;
    let playbook = if args.playbook {
        knowledge.search_playbook(&args.query, args.top_k).await?
    } else {
        Vec::new()
    };
    let found = CasesOutput { cases, playbook };

    match OutputFormat::from_json_flag(json) {
        OutputFormat::Json => CommandResult::success(found).print_json(),
        OutputFormat::Text => {
            output::section("Similar cases");
            for case in &found.cases {
                output::key_value(
                    &format!("{} ({})", case.player_name, case.similarity_score),
                    &case.summary,
                );
            }
            if !found.playbook.is_empty() {
                output::section("Playbook");
                for rule in &found.playbook {
                    println!("  {rule}");
                }
            }
            Ok(())
        }
    }
}
