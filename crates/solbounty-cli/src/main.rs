/*
[INPUT]:  CLI arguments, YAML configuration file, OS shutdown signals
[OUTPUT]: Wallet-linked authentication commands with cancellable flows
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, subcommands, or shutdown handling
*/

mod cli;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use solbounty_auth::{Intent, VerificationRequest};
use solbounty_cli::AppConfig;
use solbounty_cli::config::default_config_path;

#[derive(Parser, Debug)]
#[command(name = "solbounty", version, about = "SolBounty wallet-linked authentication client")]
struct Cli {
    /// YAML configuration file (defaults to the user config directory)
    #[arg(long = "config", value_name = "PATH", global = true)]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info", global = true)]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a configuration file interactively
    Init {
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Print the challenge a wallet would sign
    Compose {
        #[arg(long = "pub-key", value_name = "BASE58")]
        pub_key: String,
        #[arg(long)]
        origin: Option<String>,
    },
    /// Check a (pubKey, signature, message) triple offline
    Verify {
        #[arg(long = "pub-key", value_name = "BASE58")]
        pub_key: String,
        #[arg(long, value_name = "BASE64")]
        signature: String,
        #[arg(long)]
        message: String,
        #[arg(long)]
        origin: Option<String>,
    },
    /// Print the GitHub login entry URL
    GithubUrl,
    /// Sign in with a local wallet
    Login {
        #[arg(long, value_name = "LABEL")]
        wallet: Option<String>,
    },
    /// Bind a local wallet to the signed-in account
    UpdateWallet {
        #[arg(long, value_name = "LABEL")]
        wallet: Option<String>,
    },
    /// Show the signed-in profile
    Profile,
    /// Forget the stored session
    Logout,
    /// Manage local wallets
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },
    /// Run the full flow against an in-process verifier
    Simulate {
        /// Start from a GitHub session with this login
        #[arg(long, value_name = "LOGIN")]
        github: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum KeysAction {
    /// List stored wallets
    List,
    /// Create a wallet (or show it if it exists)
    New { label: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    if let Command::Init { output } = &args.command {
        let output = match output {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        return cli::init::run_init(output);
    }

    let config = AppConfig::load(args.config_path.as_deref()).context("load config")?;
    debug!(api_url = %config.api_url, origin = %config.origin, "configuration loaded");

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    match args.command {
        Command::Init { .. } => Ok(()),
        Command::Compose { pub_key, origin } => {
            cli::commands::compose_challenge(&config, origin.as_deref(), &pub_key)
        }
        Command::Verify {
            pub_key,
            signature,
            message,
            origin,
        } => {
            let request = VerificationRequest {
                pub_key,
                signature,
                message,
            };
            cli::commands::verify_triple(&config, origin.as_deref(), &request)
        }
        Command::GithubUrl => cli::commands::github_url(&config).await,
        Command::Login { wallet } => {
            let label = wallet.unwrap_or_else(|| config.wallet.clone());
            info!(wallet = %label, "starting login");
            cli::commands::authenticate(&config, Intent::Register, &label, shutdown).await
        }
        Command::UpdateWallet { wallet } => {
            let label = wallet.unwrap_or_else(|| config.wallet.clone());
            info!(wallet = %label, "starting wallet update");
            cli::commands::authenticate(&config, Intent::UpdateWallet, &label, shutdown).await
        }
        Command::Profile => cli::commands::profile(&config).await,
        Command::Logout => cli::commands::logout(&config).await,
        Command::Keys { action } => match action {
            KeysAction::List => cli::commands::list_keys(&config),
            KeysAction::New { label } => cli::commands::new_key(&config, &label),
        },
        Command::Simulate { github } => {
            cli::commands::run_simulation(&config, github.as_deref(), shutdown).await
        }
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown_clone.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
