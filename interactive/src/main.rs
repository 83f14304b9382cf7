use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use eframe::egui::Visuals;
use tracing::{info, Level};

mod app;
mod bridge;
mod canvas;
mod config;
mod gui;

use bridge::{mqtt::MqttBridge, offline::OfflineBridge, Bridge};
use config::DashboardConfig;

/// Robot patrol dashboard: live map, mini-map and patrol route editor.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// MQTT broker URI, overriding the config file.
    #[arg(long)]
    broker: Option<String>,
    /// Use the built-in demo map instead of connecting to a broker.
    #[arg(long)]
    offline: bool,
    /// Route file to load at startup and save to.
    #[arg(long)]
    route: Option<PathBuf>,
    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config.as_ref() {
        Some(path) => DashboardConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DashboardConfig::default(),
    };
    if let Some(broker) = cli.broker {
        config.bridge.broker_uri = broker;
    }
    if cli.offline {
        config.bridge.offline = true;
    }
    if let Some(route) = cli.route {
        config.route_path = route;
    }

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        config.log_level()?
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let bridge: Box<dyn Bridge> = if config.bridge.offline {
        Box::new(OfflineBridge::new())
    } else {
        Box::new(
            MqttBridge::connect(&config.bridge)
                .with_context(|| format!("connecting to {}", config.bridge.broker_uri))?,
        )
    };

    let mut app = app::DashboardApp::new(config, bridge).context("subscribing to map topics")?;

    let route_path = app.config.route_path.clone();
    if app
        .load_saved_route()
        .with_context(|| format!("loading route {}", route_path.display()))?
    {
        info!(path = %route_path.display(), "route restored");
    }

    info!("starting dashboard");
    eframe::run_native(
        "patrol dashboard",
        eframe::NativeOptions::default(),
        Box::new(|ctx| {
            ctx.egui_ctx.set_visuals(Visuals::dark());
            Box::new(app)
        }),
    )
    .map_err(|err| anyhow::anyhow!("eframe: {err}"))?;
    Ok(())
}
