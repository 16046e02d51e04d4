use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use vendpay::chain::{parse_application_id, Address, AlgodClient};
use vendpay::config::Config;
use vendpay::machines::{HttpMachineDirectory, MachineDirectory, StaticCatalog};
use vendpay::payment::{Checkout, PaymentSettings, PaymentWorkflow, SubmissionResult};
use vendpay::wallet::{LocalSigner, TransactionSigner, WalletSession};

#[derive(Parser)]
#[command(name = "vendpay", version, about = "Pay vending machines on-chain")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the machine directory API
    Serve,
    /// Pay a machine with the wallet from WALLET_SEED
    Pay {
        machine_id: String,
        /// Amount typed on the keypad; fixed-price machines charge their price regardless
        #[arg(long)]
        amount: Option<String>,
    },
    /// Print the escrow address of an application id
    Address { app_id: String },
    /// Generate a new wallet seed
    Keygen,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vendpay::utils::init_logger();

    let cli = Cli::parse();
    match cli.command {
        Command::Address { app_id } => {
            let app_id = parse_application_id(&app_id)?;
            println!("{}", Address::for_application(app_id));
            Ok(())
        }
        Command::Keygen => {
            let signer = LocalSigner::generate();
            println!("address: {}", signer.address());
            println!("WALLET_SEED={}", signer.seed_hex());
            Ok(())
        }
        Command::Serve => serve(Config::from_env()?).await,
        Command::Pay { machine_id, amount } => pay(Config::from_env()?, &machine_id, amount).await,
    }
}

async fn load_catalog(config: &Config) -> anyhow::Result<StaticCatalog> {
    match &config.directory.catalog_path {
        Some(path) => StaticCatalog::from_file(path)
            .await
            .with_context(|| format!("loading machine catalog from {}", path)),
        None => {
            info!("MACHINE_CATALOG_PATH not set, serving the demo catalog");
            Ok(StaticCatalog::demo())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!("Configuration loaded: {:?}", config.server);

    let catalog = load_catalog(&config).await?;
    let state = vendpay::AppState {
        config: config.clone(),
        catalog: Arc::new(catalog),
    };
    let app = vendpay::create_router(state);

    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn pay(config: Config, machine_id: &str, amount: Option<String>) -> anyhow::Result<()> {
    let seed = config
        .wallet
        .seed
        .as_deref()
        .ok_or_else(|| anyhow!("WALLET_SEED must be set to pay (see `vendpay keygen`)"))?;
    let wallet = Arc::new(WalletSession::connected(Arc::new(LocalSigner::from_seed_str(seed)?)));

    let directory: Box<dyn MachineDirectory> = match &config.directory.catalog_path {
        Some(_) => Box::new(load_catalog(&config).await?),
        None => Box::new(HttpMachineDirectory::new(&config.directory)?),
    };

    let settings = PaymentSettings::from_config(&config.payment)?;
    let chain = Arc::new(AlgodClient::new(&config.chain));
    let workflow = Arc::new(PaymentWorkflow::new(chain, settings));

    let checkout = Checkout::load(workflow, wallet, directory.as_ref(), machine_id).await?;
    if let Some(amount) = amount {
        checkout.edit(|editor| {
            editor.clear();
            amount.chars().for_each(|key| editor.press(key));
        });
    }

    match checkout.submit().await {
        SubmissionResult::Success { tx_id, .. } => {
            println!("Paid machine {}: {}", machine_id, tx_id);
            Ok(())
        }
        SubmissionResult::Failure { kind, message } => {
            bail!("payment failed ({}): {}", kind, message)
        }
    }
}
