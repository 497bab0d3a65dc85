//! nova - scripted Audacity sessions for the NOVA installation.
//!
//! Parses the command line, sets up logging, makes sure Audacity is running
//! and drives it through its scripting pipes.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nova::cli::{Cli, CliCommand};
use nova::editor::AudioEditor;
use nova::launcher::Launcher;
use nova::pipe::{PipeClient, PipeProfile};
use nova::scenario::Scenario;

fn main() -> Result<()> {
    let cli = match Cli::parse(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_filter().into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    tracing::info!("Starting nova v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Operating system name: {}", std::env::consts::OS);

    let profile = PipeProfile::detect()?;

    if let Err(e) = run(&cli, profile) {
        tracing::error!("Command failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}

fn run(cli: &Cli, profile: PipeProfile) -> Result<()> {
    Launcher::new(profile.launch().clone())
        .ensure_running()
        .context("Failed to start Audacity")?;

    let mut client = PipeClient::new(profile);
    tracing::info!(
        "Using pipes {} / {}",
        client.profile().write_path().display(),
        client.profile().read_path().display()
    );

    match &cli.command {
        CliCommand::Start => client.session(|client| -> Result<()> {
            AudioEditor::new(client).stop()?;
            Ok(())
        }),
        CliCommand::Render { scenario } => {
            let scenario = Scenario::resolve(scenario)?;
            client.session(|client| {
                AudioEditor::new(client)
                    .render_scenario(&scenario)
                    .with_context(|| format!("Scenario '{}' aborted", scenario.name))
            })
        }
        CliCommand::Send { command } => {
            let response = client.session(|client| {
                client
                    .do_command(command)
                    .with_context(|| format!("Command failed: {}", command))
            })?;
            println!("{}", response);
            Ok(())
        }
    }
}
