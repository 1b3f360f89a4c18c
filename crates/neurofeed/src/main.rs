//! # neurofeed
//!
//! Command-line entry point: run the reference feed server, watch a user's
//! live feed, or trigger a simulated event.

#![deny(unsafe_code)]

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use neurofeed_client::{ClientConfig, NeurofeedbackClient};
use neurofeed_server::{NeurofeedServer, ServerConfig};
use neurofeed_settings::NeurofeedSettings;

/// Neurofeedback feed tools.
#[derive(Parser, Debug)]
#[command(name = "neurofeed", version, about = "Neurofeedback feed server and client")]
struct Cli {
    /// Feed server base URL (overrides settings).
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// User to register as (overrides settings).
    #[arg(long, global = true)]
    user_id: Option<i64>,

    /// Log filter when `RUST_LOG` is unset (overrides settings).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the reference feed server until Ctrl-C.
    Serve {
        /// Host to bind.
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (0 for auto-assign).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Connect as a user and log every event until Ctrl-C.
    Watch,
    /// Trigger one simulated event and print it as JSON.
    Simulate {
        /// Brain region to attribute the event to.
        #[arg(long)]
        region: String,
        /// Intensity; the server picks one when omitted.
        #[arg(long)]
        intensity: Option<f64>,
    },
}

impl Cli {
    /// Layer command-line flags over loaded settings.
    fn apply(&self, settings: &mut NeurofeedSettings) -> Result<()> {
        if let Some(url) = &self.base_url {
            settings.client.base_url.clone_from(url);
        }
        if let Some(user_id) = self.user_id {
            settings.client.user_id = Some(user_id);
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if let Command::Serve { host, port } = &self.command {
            if let Some(host) = host {
                settings.server.host.clone_from(host);
            }
            if let Some(port) = port {
                settings.server.port = *port;
            }
        }
        settings.validate().context("invalid configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut settings = neurofeed_settings::load_settings().unwrap_or_else(|e| {
        eprintln!("warning: failed to load settings ({e}), using defaults");
        NeurofeedSettings::default()
    });
    args.apply(&mut settings)?;
    neurofeed_core::logging::init_subscriber(&settings.logging.level);

    match args.command {
        Command::Serve { .. } => serve(&settings).await,
        Command::Watch => watch(&settings).await,
        Command::Simulate { region, intensity } => simulate(&settings, &region, intensity).await,
    }
}

async fn serve(settings: &NeurofeedSettings) -> Result<()> {
    let server = NeurofeedServer::new(ServerConfig::from(&settings.server));
    let (addr, handle) = server.listen().await.context("failed to bind server")?;
    tracing::info!("neurofeed server listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    tracing::info!("shutting down");
    server.shutdown().graceful_shutdown(vec![handle], None).await;
    Ok(())
}

async fn watch(settings: &NeurofeedSettings) -> Result<()> {
    let config = client_config(settings)?;
    let client = NeurofeedbackClient::with_callback(config, |event| {
        tracing::info!(
            id = event.id,
            region = %event.brain_region_id,
            intensity = ?event.intensity,
            timestamp = %event.timestamp,
            "event"
        );
    });
    client.connect().await.context("failed to connect")?;

    let mut state = client.watch_state();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                break;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.borrow_and_update().clone();
                if let Some(error) = &snapshot.error {
                    tracing::warn!(%error, "feed error");
                }
                if !snapshot.is_connected {
                    bail!("connection to feed server lost");
                }
                if snapshot.is_registered {
                    tracing::info!("registered, waiting for events");
                }
            }
        }
    }

    client.disconnect().await;
    Ok(())
}

async fn simulate(
    settings: &NeurofeedSettings,
    region: &str,
    intensity: Option<f64>,
) -> Result<()> {
    let client = NeurofeedbackClient::new(client_config(settings)?);
    let event = client
        .simulate_event(region, intensity)
        .await
        .context("simulation failed")?;
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}

fn client_config(settings: &NeurofeedSettings) -> Result<ClientConfig> {
    if settings.client.user_id.is_none() {
        bail!("a user ID is required (--user-id or NEUROFEED_USER_ID)");
    }
    Ok(ClientConfig::from(&settings.client))
}
