/*
[INPUT]:  Loaded configuration and subcommand arguments
[OUTPUT]: Human-readable command results on stdout
[POS]:    CLI layer - one-shot command handlers
[UPDATE]: When subcommand behaviour or output changes
*/

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use console::style;
use solbounty_auth::{
    AuthError,
    FlowOutcome,
    IdentityProfile,
    IdentityRegistry,
    Intent,
    ReferenceVerifier,
    VerificationRequest,
    WalletKeyStore,
    compose,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use solbounty_cli::{AppConfig, SessionStore};
use solbounty_cli::flow::{local_wallet, restored_client, run_remote, simulate};

pub fn compose_challenge(config: &AppConfig, origin: Option<&str>, pub_key: &str) -> Result<()> {
    let origin = origin.unwrap_or(&config.origin);
    let message = compose(origin, pub_key)?;
    println!("{message}");
    Ok(())
}

/// Offline check of a triple, as the server would run it
pub fn verify_triple(
    config: &AppConfig,
    origin: Option<&str>,
    request: &VerificationRequest,
) -> Result<()> {
    let origin = origin.unwrap_or(&config.origin);
    let verifier = ReferenceVerifier::new(Arc::new(IdentityRegistry::default()));

    match verifier.verify(origin, request) {
        Ok(()) => {
            println!("{} signature verified", style("OK").bold().green());
            Ok(())
        }
        Err(err) => {
            println!("{} {}", style("REJECTED").bold().red(), err);
            Err(err).context("verification failed")
        }
    }
}

pub async fn github_url(config: &AppConfig) -> Result<()> {
    let (client, _) = restored_client(config).await?;
    println!("{}", client.github_login_url()?);
    Ok(())
}

pub async fn authenticate(
    config: &AppConfig,
    intent: Intent,
    wallet_label: &str,
    shutdown: CancellationToken,
) -> Result<()> {
    let outcome = run_remote(config, intent, wallet_label, shutdown)
        .await
        .inspect_err(|err| report_failure(err))?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn profile(config: &AppConfig) -> Result<()> {
    let (client, store) = restored_client(config).await?;
    if !client.has_session() {
        bail!(
            "no session stored at {}; run `login` first",
            store.path().display()
        );
    }

    let profile = client.profile().await.inspect_err(|err| {
        if matches!(err, AuthError::SessionRequired) {
            println!("{}", style("session expired, run `login` again").yellow());
        }
    })?;
    print_profile(&profile);
    Ok(())
}

pub async fn logout(config: &AppConfig) -> Result<()> {
    let store = SessionStore::new(config.session_file()?);
    if store.clear().await? {
        println!("session removed from {}", store.path().display());
    } else {
        println!("no stored session");
    }
    Ok(())
}

pub fn list_keys(config: &AppConfig) -> Result<()> {
    let store = WalletKeyStore::new(config.key_dir()?);
    let labels = store.list_labels();
    if labels.is_empty() {
        println!("no wallets in {}", store.key_dir().display());
        return Ok(());
    }

    for label in labels {
        match store.load_wallet(&label) {
            Ok(Some(wallet)) => println!("{:<16} {}", style(&label).bold(), wallet.address()),
            Ok(None) => {}
            Err(err) => println!("{:<16} {}", style(&label).bold(), style(err).red()),
        }
    }
    Ok(())
}

pub fn new_key(config: &AppConfig, label: &str) -> Result<()> {
    let wallet = local_wallet(config, label)?;
    info!(label, address = %wallet.address(), "wallet ready");
    println!("{:<16} {}", style(label).bold(), wallet.address());
    Ok(())
}

pub async fn run_simulation(
    config: &AppConfig,
    github_login: Option<&str>,
    shutdown: CancellationToken,
) -> Result<()> {
    let report = simulate(config, github_login, shutdown)
        .await
        .inspect_err(|err| report_failure(err))?;

    println!("{}", style("--- Login ---").bold());
    print_outcome(&report.login);
    if github_login.is_some() {
        println!("linked to GitHub account: {}", report.linked_to_github);
    }
    if let Some(update) = &report.update {
        println!("\n{}", style("--- Wallet update ---").bold());
        print_outcome(update);
    }
    println!(
        "\nfinal state: {}  identities: {}",
        serde_json::to_string(&report.final_state)?,
        report.identities
    );
    Ok(())
}

fn report_failure(err: &anyhow::Error) {
    if let Some(auth) = err.downcast_ref::<AuthError>() {
        println!("{} {}", style("ERROR").bold().red(), auth.notice());
    }
}

fn print_outcome(outcome: &FlowOutcome) {
    println!("{} {}", style("SUCCESS!").bold().green(), outcome.intent.endpoint());
    println!("wallet: {}", style(&outcome.public_key).cyan());
    if let Some(identity) = &outcome.identity {
        print_profile(identity);
    }
    if let Some(redirect) = outcome.redirect {
        println!("next: {redirect}");
    }
}

fn print_profile(profile: &IdentityProfile) {
    println!("account: {} ({})", style(profile.display_name()).bold(), profile.id);
    if let Some(login) = &profile.login {
        println!("github:  {login}");
    }
    match &profile.wallet_address {
        Some(address) => println!("wallet:  {address}"),
        None => println!("wallet:  {}", style("not linked").dim()),
    }
}
