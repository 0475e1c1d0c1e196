use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use fleet_console::config::get_configuration;
use fleet_console::models::ProfileForm;
use fleet_console::Console;
use fleet_core::observability::init_tracing;
use secrecy::Secret;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

#[derive(Parser)]
#[command(name = "fleet-console", about = "Fleet operations console: profile validation gate")]
struct Cli {
    /// Username or email address to sign in with.
    #[arg(long, global = true, env = "FLEET_USERNAME")]
    username: Option<String>,

    #[arg(long, global = true, env = "FLEET_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and report whether the profile gate blocks the session.
    Check,
    /// Sign in, submit corrected profile values from a JSON file and follow
    /// the forced logout.
    Update {
        #[arg(long)]
        profile: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenv().ok();
    let cli = Cli::parse();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        &configuration.telemetry.service_name,
        &configuration.telemetry.log_level,
        configuration.telemetry.otlp_endpoint.as_deref(),
    )?;

    let username = cli.username.context("--username or FLEET_USERNAME is required")?;
    let password = Secret::new(
        cli.password
            .context("--password or FLEET_PASSWORD is required")?,
    );

    let console = Console::build(&configuration)?;
    info!(api = %console.api.base_url(), "Starting fleet-console");

    console
        .session
        .login(&username, password)
        .await
        .context("Login failed")?;
    console.gate.evaluate().await;

    let state = console.gate.state();
    println!("{}", serde_json::to_string_pretty(&state)?);

    match cli.command {
        Command::Check => Ok(if state.open {
            ExitCode::from(2)
        } else {
            ExitCode::SUCCESS
        }),
        Command::Update { profile } => {
            let form = load_form(&profile, state.current_data.unwrap_or_default())?;
            let outcome = console.gate.handle_update(form).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);

            console.gate.wait_for_logout().await;
            if let Some(location) = console.navigator.visited().last() {
                println!("redirect: {}", location);
            }

            Ok(if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
    }
}

/// Overlay the fields present in `path` onto the prefilled form values.
fn load_form(path: &Path, prefilled: ProfileForm) -> anyhow::Result<ProfileForm> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile file {}", path.display()))?;
    let overrides: serde_json::Value =
        serde_json::from_str(&raw).context("Profile file is not valid JSON")?;

    let mut merged = serde_json::to_value(prefilled)?;
    if let (Some(target), Some(source)) = (merged.as_object_mut(), overrides.as_object()) {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }

    Ok(serde_json::from_value(merged)?)
}
