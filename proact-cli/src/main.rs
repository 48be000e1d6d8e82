//! proact: generate personalised environmental missions from the command line
//!
//! Loads the agent configuration and a users file, then either previews the
//! prompt for a user or runs the full generation pipeline against Gemini and
//! prints the resulting missions as JSON.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mission::{MissionNode, MissionPeriodType};
use proact_agent::{
    AgentConfig, InMemoryMissionStore, MissionGenerator, MissionPrompter, MissionRequest,
    UserProfile,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "proact")]
#[command(about = "Personalised environmental mission generation")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "proact.yaml", env = "PROACT_CONFIG")]
    config: String,

    /// Path to the users file (YAML map of user id to profile)
    #[arg(short, long, default_value = "users.yaml", env = "PROACT_USERS")]
    users: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate new missions for a user
    Generate {
        /// User id
        #[arg(long)]
        user: String,

        /// Period type (weekly, ongoing)
        #[arg(long, default_value = "weekly")]
        period: MissionPeriodType,

        /// Number of missions (configured default when omitted)
        #[arg(long)]
        count: Option<usize>,

        /// Attempt bound (configured default when omitted)
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Store the generated missions
        #[arg(long)]
        persist: bool,

        /// Assign ids without storing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the prompt that would be sent for a user
    Prompt {
        /// User id
        #[arg(long)]
        user: String,

        /// Period type (weekly, ongoing)
        #[arg(long, default_value = "weekly")]
        period: MissionPeriodType,

        /// Number of missions
        #[arg(long)]
        count: Option<usize>,
    },

    /// Print the default configuration
    DefaultConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("Failed to load .env");
        }
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("proact=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::DefaultConfig => {
            print!("{}", AgentConfig::default().to_yaml()?);
        }
        Command::Prompt {
            user,
            period,
            count,
        } => {
            let config = load_config(&cli.config)?;
            let store = Arc::new(load_users(&cli.users)?);
            let count = count.unwrap_or(config.generation.default_count);
            let prompt = MissionPrompter::new(store)
                .with_config(config.generation)
                .build(&user, period, count)
                .await?;
            println!("{prompt}");
        }
        Command::Generate {
            user,
            period,
            count,
            max_attempts,
            persist,
            dry_run,
        } => {
            let config = load_config(&cli.config)?.with_env_overrides();
            let store = Arc::new(load_users(&cli.users)?);
            let generator = MissionGenerator::from_config(&config, store)?;

            let mut request = MissionRequest::new(user, period);
            request.count = count;
            request.max_attempts = max_attempts;
            if dry_run {
                request = request.dry_run();
            } else if persist {
                request = request.persisted();
            }

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling generation");
                    on_signal.cancel();
                }
            });

            let missions = generator.generate_missions(&request, &cancel).await?;
            let summary: Vec<Value> = missions.iter().map(mission_summary).collect();
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

fn load_config(path: &str) -> anyhow::Result<AgentConfig> {
    if !Path::new(path).exists() {
        info!(path, "Config file not found, using defaults");
        return Ok(AgentConfig::default());
    }

    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    AgentConfig::from_yaml(&content).with_context(|| format!("Invalid config in {path}"))
}

fn load_users(path: &str) -> anyhow::Result<InMemoryMissionStore> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read users file {path}"))?;
    let users: HashMap<String, UserProfile> =
        serde_yaml::from_str(&content).with_context(|| format!("Invalid users file {path}"))?;

    info!(path, count = users.len(), "Users loaded");
    Ok(InMemoryMissionStore::with_users(users))
}

fn mission_summary(mission: &MissionNode) -> Value {
    json!({
        "id": mission.id,
        "title": mission.title,
        "description": mission.description,
        "type": mission.period_type().map(|p| p.as_str()),
        "status": mission.status.as_str(),
        "regenerationLeft": mission.regeneration_left(),
        "steps": mission
            .step_nodes()
            .map(|step| json!({ "id": step.id, "title": step.title }))
            .collect::<Vec<_>>(),
    })
}
