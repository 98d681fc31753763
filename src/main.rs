//! # Sharecoin CLI
//!
//! Command-line tooling around the shared-coin covenant library: derive the
//! joint deposit address and committed tree for a stakeholder list, inspect
//! leaf scripts, recover a stakeholder's spending leaf with its control
//! block, and fund a coin on a local regtest.
//!
//! Stakeholder lists are JSON files of the form
//!
//! ```json
//! [
//!   { "scripts": ["<tapscript hex>"], "amount": 100000000 },
//!   { "scripts": ["<tapscript hex>"], "amount": 50000000 }
//! ]
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use elements::script::Script;
use elements::secp256k1_zkp::Secp256k1;
use elements::AddressParams;
use std::{fmt, fs, str::FromStr};

use liquid_sharecoin::{
    control_block, find_leaf_including_script, leaf_hash, p2tr_address, shared_coin_tree,
    taproot_witness_program, unspendable_internal_key, OutputConstraint, EsploraClient,
    Stakeholder,
};

/// Target Liquid network
#[derive(Clone, Debug)]
pub enum Network {
    Liquid,
    LiquidTestnet,
    ElementsRegtest,
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "liquid" => Ok(Network::Liquid),
            "liquidtestnet" | "testnet" => Ok(Network::LiquidTestnet),
            "elementsregtest" | "regtest" => Ok(Network::ElementsRegtest),
            _ => Err(format!("Invalid network: {}", s)),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Liquid => write!(f, "liquid"),
            Network::LiquidTestnet => write!(f, "liquidtestnet"),
            Network::ElementsRegtest => write!(f, "regtest"),
        }
    }
}

impl Network {
    fn address_params(&self) -> &'static AddressParams {
        match self {
            Network::Liquid => &AddressParams::LIQUID,
            Network::LiquidTestnet => &AddressParams::LIQUID_TESTNET,
            Network::ElementsRegtest => &AddressParams::ELEMENTS,
        }
    }
}

#[derive(Parser)]
#[command(name = "sharecoin")]
#[command(about = "Shared-custody UTXO covenants on Liquid")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the joint deposit address for a stakeholder list
    Address {
        /// Stakeholder list JSON file
        #[arg(short, long)]
        stakeholders: String,
        /// Target network
        #[arg(long, default_value = "regtest")]
        network: Network,
    },
    /// Print the committed tree: root and every leaf script
    Tree {
        /// Stakeholder list JSON file
        #[arg(short, long)]
        stakeholders: String,
    },
    /// Decode the output constraint embedded in a leaf script
    Inspect {
        /// Leaf script hex
        script: String,
    },
    /// Recover the committed leaf and control block for a plain tapscript
    Locate {
        /// Stakeholder list JSON file
        #[arg(short, long)]
        stakeholders: String,
        /// The stakeholder's plain tapscript hex
        script: String,
    },
    /// Fund the shared coin from the regtest faucet
    Fund {
        /// Stakeholder list JSON file
        #[arg(short, long)]
        stakeholders: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Address {
            stakeholders,
            network,
        } => {
            address(&stakeholders, network)?;
        }
        Commands::Tree { stakeholders } => {
            tree(&stakeholders)?;
        }
        Commands::Inspect { script } => {
            inspect(&script)?;
        }
        Commands::Locate {
            stakeholders,
            script,
        } => {
            locate(&stakeholders, &script)?;
        }
        Commands::Fund { stakeholders } => {
            fund(&stakeholders).await?;
        }
    }

    Ok(())
}

fn load_stakeholders(path: &str) -> Result<Vec<Stakeholder>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read stakeholder file {}", path))?;
    let stakeholders: Vec<Stakeholder> =
        serde_json::from_str(&json).context("failed to parse stakeholder list")?;
    Ok(stakeholders)
}

fn parse_script(hex_script: &str) -> Result<Script> {
    let bytes = hex::decode(hex_script).context("script is not valid hex")?;
    Ok(Script::from(bytes))
}

fn address(stakeholder_file: &str, network: Network) -> Result<()> {
    let secp = Secp256k1::new();
    let stakeholders = load_stakeholders(stakeholder_file)?;
    let internal_key = unspendable_internal_key()?;

    let tree = shared_coin_tree(&secp, &stakeholders)?;
    let program = taproot_witness_program(&secp, &internal_key, tree.hash())?;
    let deposit = p2tr_address(&secp, &internal_key, &tree, network.address_params())?;

    let total: u64 = stakeholders.iter().map(|s| s.amount).sum();
    println!("network:         {}", network);
    println!("stakeholders:    {}", stakeholders.len());
    println!("total amount:    {} sats", total);
    println!("merkle root:     {}", tree.hash());
    println!("witness program: {}", program);
    println!("address:         {}", deposit);
    Ok(())
}

fn tree(stakeholder_file: &str) -> Result<()> {
    let secp = Secp256k1::new();
    let stakeholders = load_stakeholders(stakeholder_file)?;

    let tree = shared_coin_tree(&secp, &stakeholders)?;
    println!("merkle root: {}", tree.hash());
    for (index, leaf) in tree.leaves().iter().enumerate() {
        println!("leaf {}: {}", index, hex::encode(leaf.as_bytes()));
    }
    Ok(())
}

fn inspect(script_hex: &str) -> Result<()> {
    let script = parse_script(script_hex)?;
    match OutputConstraint::from_script(&script)? {
        Some(constraint) => {
            println!("output index:    {}", constraint.output_index);
            println!("witness program: {}", constraint.witness_program);
            println!("amount:          {} sats", constraint.amount);
        }
        None => println!("not a shared-coin leaf"),
    }
    Ok(())
}

fn locate(stakeholder_file: &str, script_hex: &str) -> Result<()> {
    let secp = Secp256k1::new();
    let stakeholders = load_stakeholders(stakeholder_file)?;
    let script = parse_script(script_hex)?;
    let internal_key = unspendable_internal_key()?;

    let tree = shared_coin_tree(&secp, &stakeholders)?;
    let Some(leaf) = find_leaf_including_script(&tree, &script) else {
        bail!("script is not committed in this shared coin");
    };
    let control = control_block(&secp, &internal_key, &tree, leaf)?;

    println!("leaf script:   {}", hex::encode(leaf.as_bytes()));
    println!("leaf hash:     {}", leaf_hash(leaf));
    println!("control block: {}", hex::encode(&control));
    Ok(())
}

async fn fund(stakeholder_file: &str) -> Result<()> {
    let secp = Secp256k1::new();
    let stakeholders = load_stakeholders(stakeholder_file)?;
    let internal_key = unspendable_internal_key()?;

    let tree = shared_coin_tree(&secp, &stakeholders)?;
    let deposit = p2tr_address(&secp, &internal_key, &tree, &AddressParams::ELEMENTS)?;

    let client = EsploraClient::new()?;
    println!("funding {}", deposit);
    let utxo = client.faucet(&deposit.to_string()).await?;
    println!("shared coin: {}:{}", utxo.txid, utxo.vout);
    Ok(())
}
