/*
[INPUT]:  Interactive user input via CLI
[OUTPUT]: Generated YAML configuration file
[POS]:    CLI initialization layer
[UPDATE]: When AppConfig schema changes
*/

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use std::path::PathBuf;

use solbounty_auth::auth::canonical_origin;
use solbounty_cli::config::{AppConfig, TimeoutConfig};

pub fn run_init(output: PathBuf) -> Result<()> {
    println!("{}", style("Welcome to SolBounty CLI Init").bold().cyan());
    println!(
        "{}",
        style("This will guide you through creating a new CLI configuration.").dim()
    );

    let theme = ColorfulTheme::default();
    let defaults = AppConfig::default();

    println!("\n{}", style("--- Endpoints ---").bold());
    let api_url: String = Input::with_theme(&theme)
        .with_prompt("Identity API URL")
        .default(defaults.api_url.clone())
        .interact_text()?;

    let origin: String = Input::with_theme(&theme)
        .with_prompt("Client origin (scheme://host[:port])")
        .default(defaults.origin.clone())
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            canonical_origin(input).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()?;

    println!("\n{}", style("--- Wallet ---").bold());
    let wallet: String = Input::with_theme(&theme)
        .with_prompt("Default wallet label")
        .default(defaults.wallet.clone())
        .interact_text()?;

    let customize = Confirm::with_theme(&theme)
        .with_prompt("Customize timeouts?")
        .default(false)
        .interact()?;
    let timeouts = if customize {
        println!("\n{}", style("--- Timeouts (seconds) ---").bold());
        TimeoutConfig {
            connect_secs: Input::with_theme(&theme)
                .with_prompt("Wallet connect")
                .default(defaults.timeouts.connect_secs)
                .interact_text()?,
            sign_secs: Input::with_theme(&theme)
                .with_prompt("Signature approval")
                .default(defaults.timeouts.sign_secs)
                .interact_text()?,
            verify_secs: Input::with_theme(&theme)
                .with_prompt("Server verification")
                .default(defaults.timeouts.verify_secs)
                .interact_text()?,
            http_secs: Input::with_theme(&theme)
                .with_prompt("HTTP request")
                .default(defaults.timeouts.http_secs)
                .interact_text()?,
        }
    } else {
        defaults.timeouts.clone()
    };

    let config = AppConfig {
        api_url,
        origin: canonical_origin(&origin)?,
        wallet,
        timeouts,
        ..defaults
    };

    let yaml = serde_yaml::to_string(&config).context("failed to serialize config to YAML")?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&output, yaml)
        .context(format!("failed to write config to {}", output.display()))?;

    println!("\n{}", style("SUCCESS!").bold().green());
    println!(
        "Configuration written to: {}",
        style(output.display()).cyan()
    );

    Ok(())
}
