use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use contrak_core::{ContractRecord, ContrakClient, ContrakConfig, chain_name, logging};
use contrak_sdk::{ConnectConfig, ConnectOptions, SigningKeys, Submission};
use tracing::{debug, error};

/// Record smart-contract deployments with Contrak.
#[derive(Debug, Parser)]
#[command(name = "contrak", version)]
struct Cli {
    /// Log debug output and the API response.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign a deployment attestation, write it to disk and submit it.
    Connect(ConnectArgs),

    /// Recover the address that signed a message.
    Verify {
        #[arg(long)]
        message: String,
        #[arg(long)]
        signature: String,
    },

    /// List contracts stored by the backend.
    Contracts,
}

#[derive(Debug, clap::Args)]
struct ConnectArgs {
    /// Contract name.
    #[arg(long)]
    name: String,

    /// Identifier grouping successive deployments of the same contract.
    #[arg(long)]
    history_id: String,

    #[arg(long)]
    chain_id: String,

    /// Deployed contract address.
    #[arg(long)]
    address: String,

    /// Address of the account that deployed the contract.
    #[arg(long)]
    deployer: String,

    /// Hash of the deployment transaction.
    #[arg(long)]
    tx_hash: String,

    #[arg(long)]
    org_public_key: Option<String>,

    /// Where to write the signed artifact.
    #[arg(long, default_value = "output.json")]
    output: PathBuf,

    /// Repository used for the commit link and author name.
    #[arg(long, default_value = ".")]
    repo_dir: PathBuf,

    /// Only write the artifact; do not contact the API.
    #[arg(long)]
    no_submit: bool,
}

impl ConnectArgs {
    fn options(&self) -> ConnectOptions {
        ConnectOptions {
            contract_name: self.name.clone(),
            contract_history_id: self.history_id.clone(),
            chain_id: self.chain_id.clone(),
            contract_address: self.address.clone(),
            deployer_address: self.deployer.clone(),
            contract_deployment_transaction_hash: self.tx_hash.clone(),
            org_public_key: self.org_public_key.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let filter = if cli.verbose {
        "info,contrak_sdk=debug,contrak_core=debug"
    } else {
        "warn,contrak_sdk=info"
    };
    if let Err(e) = logging::init_logging(filter) {
        eprintln!("{e}");
    }

    if let Err(e) = run(cli).await {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ContrakConfig::from_env()?;
    debug!(?config, "loaded configuration");

    match cli.command {
        Command::Connect(args) => connect(&config, args, cli.verbose).await,
        Command::Verify { message, signature } => {
            let report = contrak_sdk::verify(&message, &signature)?;
            println!("Signer: {}", report.signer);
            if let Some(msg) = report.message {
                println!(
                    "Attests: {} on {} ({})",
                    msg.contract_address,
                    chain_name(&msg.chain_id),
                    msg.chain_id
                );
            }
            Ok(())
        }
        Command::Contracts => {
            let client = ContrakClient::new(config.require_api_url()?)?;
            let records = client
                .get_all_contracts()
                .await
                .context("failed to fetch contracts")?;
            print!("{}", format_table(&records));
            Ok(())
        }
    }
}

async fn connect(config: &ContrakConfig, args: ConnectArgs, verbose: bool) -> Result<()> {
    let keys = SigningKeys::from_config(config)?;
    let mut connect_config = ConnectConfig::from_config(config, !args.no_submit)?;
    connect_config.verbose = verbose;
    connect_config.output_path = args.output.clone();
    connect_config.repo_dir = args.repo_dir.clone();

    let report = contrak_sdk::connect(args.options(), &keys, &connect_config).await?;

    println!("Contrak: Contract Connected");
    println!("Artifact: {}", report.artifact_path.display());
    match &report.submission {
        Submission::Sent { .. } => println!("Submitted to API"),
        Submission::Skipped => println!("Not submitted (no API URL configured)"),
        Submission::Failed { error } => println!("Submission failed: {error}"),
    }
    if let Some(count) = report.notified {
        println!("Notified {count} subscriber(s)");
    }
    Ok(())
}

fn format_table(records: &[ContractRecord]) -> String {
    if records.is_empty() {
        return "No contracts stored.\n".to_string();
    }

    let rows: Vec<[String; 5]> = records
        .iter()
        .map(|r| {
            [
                r.id.to_string(),
                r.name.clone(),
                chain_name(&r.chain_id),
                r.contract_address.clone(),
                r.created_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();
    let header = ["ID", "NAME", "CHAIN", "ADDRESS", "DEPLOYED"].map(String::from);

    let mut widths = [0usize; 5];
    for row in std::iter::once(&header).chain(rows.iter()) {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in std::iter::once(&header).chain(rows.iter()) {
        let line: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}
