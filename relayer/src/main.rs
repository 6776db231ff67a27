//! Tron Relayer CLI
//!
//! Runs one controller operation per invocation.
//!
//! ## Usage
//!
//! ```bash
//! TRON_RELAYER_PRIVATE_KEY=... cargo run --bin tron-relayer -- --config config/tron-relayer.toml tip
//! cargo run --bin tron-relayer -- pull --token T... --salt 0x... --salt 0x...
//! cargo run --bin tron-relayer -- rebalance --rebalancer T... --amount 1000000
//! cargo run --bin tron-relayer -- assert-tip
//! ```

use anyhow::{Context, Result};
use chain_clients_tron::TronAddress;
use clap::{Parser, Subcommand};
use ethereum_types::U256;
use tracing::info;
use tron_relayer::config::Config;
use tron_relayer::ControllerClient;

#[derive(Parser, Debug)]
#[command(name = "tron-relayer")]
#[command(about = "Checkpointed multicall relayer for the Tron bridge controller")]
struct Args {
    /// Path to configuration file (default: TRON_RELAYER_CONFIG_PATH or config/tron-relayer.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the relayer address in every encoding
    Address,
    /// Read the controller's event-chain tip
    Tip,
    /// Read the controller's USDT token
    Usdt,
    /// Read the total USDT pulled from receivers
    PulledUsdt,
    /// Read the LP exchange rate of a token
    LpRate {
        #[arg(long)]
        token: String,
    },
    /// Sweep a token from receivers
    Pull {
        #[arg(long)]
        token: String,
        /// Receiver salt (bytes32 hex), repeatable
        #[arg(long = "salt", required = true)]
        salts: Vec<String>,
    },
    /// Rebalance USDT through a rebalancer
    Rebalance {
        #[arg(long)]
        rebalancer: String,
        /// Amount in the token's base units (decimal)
        #[arg(long)]
        amount: String,
    },
    /// Re-assert the current event-chain tip on chain
    AssertTip,
}

fn parse_salt(value: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(value.trim_start_matches("0x"))
        .with_context(|| format!("Invalid salt hex: {}", value))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("Salt must be 32 bytes, got {}", b.len()))
}

fn parse_address(value: &str) -> Result<TronAddress> {
    value
        .parse::<TronAddress>()
        .with_context(|| format!("Invalid Tron address: {}", value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt::init();

    let config = Config::load_from_path(args.config.as_deref())?;
    let client = ControllerClient::from_config(&config)?;

    match args.command {
        Command::Address => {
            let address = client.relayer_address();
            println!("base58: {}", address.to_base58());
            println!("hex:    {}", address.to_hex());
            println!("evm:    {}", address.to_evm_hex());
        }
        Command::Tip => {
            println!("0x{}", hex::encode(client.event_chain_tip().await?));
        }
        Command::Usdt => {
            println!("{}", client.usdt().await?);
        }
        Command::PulledUsdt => {
            println!("{}", client.pulled_usdt().await?);
        }
        Command::LpRate { token } => {
            let token = parse_address(&token)?;
            println!("{}", client.lp_exchange_rate_for(&token).await?);
        }
        Command::Pull { token, salts } => {
            let token = parse_address(&token)?;
            let salts = salts
                .iter()
                .map(|s| parse_salt(s))
                .collect::<Result<Vec<_>>>()?;
            let txid = client.pull_from_receivers(token, salts).await?;
            info!("pullFromReceivers committed");
            println!("{}", txid);
        }
        Command::Rebalance { rebalancer, amount } => {
            let rebalancer = parse_address(&rebalancer)?;
            let amount = U256::from_dec_str(&amount)
                .map_err(|e| anyhow::anyhow!("Invalid amount '{}': {:?}", amount, e))?;
            let txid = client.rebalance_usdt(rebalancer, amount).await?;
            info!("rebalanceUsdt committed");
            println!("{}", txid);
        }
        Command::AssertTip => {
            let txid = client.assert_event_chain_tip().await?;
            info!("isEventChainTip committed");
            println!("{}", txid);
        }
    }

    Ok(())
}
