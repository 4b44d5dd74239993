//! # Raffle aggregator CLI
use crate::{
    aggregator::{FetchOptions, RaffleAggregator},
    config::AggregatorConfig,
    platform::PlatformHint,
};
use alloy::primitives::Address;
use alloy_chains::Chain;
use clap::{Parser, Subcommand};
use eyre::Context;
use serde::Serialize;
use std::{path::PathBuf, time::Duration};
use tracing::debug;

/// Lists the raffles deployed through a registry contract.
#[derive(Debug, Parser)]
#[command(author, about = "Raffle aggregator", long_about = None)]
pub struct Args {
    /// The configuration file.
    #[arg(long, value_name = "CONFIG", env = "RAFFLES_CONFIG", default_value = "raffles.yaml")]
    pub config: PathBuf,
    /// The chain to read, by name or id.
    #[arg(long, value_name = "CHAIN", env = "RAFFLES_CHAIN", default_value = "base")]
    pub chain: Chain,
    /// Overrides the cache TTL of the config file.
    #[arg(long, value_name = "SECONDS", value_parser = parse_duration_secs)]
    pub cache_ttl: Option<Duration>,
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Commands of the CLI.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the raffles of the chain as JSON, newest first
    List {
        /// The client platform to tune the fetch for.
        #[command(flatten)]
        platform: PlatformArgs,
        /// Skip the cache.
        #[arg(long)]
        no_cache: bool,
    },
    /// Print a single raffle as JSON
    Show {
        /// The raffle contract.
        address: Address,
        /// The client platform to tune the fetch for.
        #[command(flatten)]
        platform: PlatformArgs,
    },
    /// Print the current block number of the chain
    Head,
}

/// Client platform arguments.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PlatformArgs {
    /// Use the constrained (mobile) profile.
    #[arg(long)]
    pub constrained: bool,
    /// The client's user agent.
    #[arg(long, value_name = "USER_AGENT")]
    pub user_agent: Option<String>,
    /// The client's viewport width in CSS pixels.
    #[arg(long, value_name = "PIXELS")]
    pub viewport: Option<u32>,
}

impl PlatformArgs {
    /// The platform hint described by the arguments.
    pub fn hint(&self) -> PlatformHint {
        let mut hint =
            if self.constrained { PlatformHint::constrained() } else { PlatformHint::default() };
        if let Some(user_agent) = &self.user_agent {
            hint = hint.with_user_agent(user_agent);
        }
        if let Some(width) = self.viewport {
            hint = hint.with_viewport_width(width);
        }
        hint
    }
}

impl Args {
    /// Run the command.
    pub async fn run(self) -> eyre::Result<()> {
        let mut config = AggregatorConfig::load_from_file(&self.config)?;
        if let Some(ttl) = self.cache_ttl {
            config = config.with_cache_ttl(ttl);
        }

        let chain_id = self.chain.id();
        let aggregator = RaffleAggregator::from_config(&config);

        match self.command {
            Command::List { platform, no_cache } => {
                let mut options = FetchOptions::default()
                    .with_progress(|done, total| debug!(done, total, "Fetch progress"));
                if no_cache {
                    options = options.no_cache();
                }
                let records = aggregator
                    .fetch_raffles(chain_id, &platform.hint(), options)
                    .await
                    .wrap_err_with(|| format!("raffles are unavailable on {}", self.chain))?;
                print_json(&records)?;
            }
            Command::Show { address, platform } => {
                let record = aggregator.fetch_raffle(chain_id, address, &platform.hint()).await?;
                print_json(&record)?;
            }
            Command::Head => {
                println!("{}", aggregator.block_number(chain_id).await?);
            }
        }

        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parses a string representing seconds to a [`Duration`].
fn parse_duration_secs(arg: &str) -> Result<Duration, std::num::ParseIntError> {
    let seconds = arg.parse()?;
    Ok(Duration::from_secs(seconds))
}
