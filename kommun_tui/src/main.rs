use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use kommun_core::{load_dashboard_config, DataSource, GeoRegistry, HttpDataSource};
use tracing::info;

mod app;
mod ui;

use app::DashboardApp;

#[derive(Clone)]
struct ChannelWriter {
    sender: Sender<String>,
}

impl std::io::Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.sender.send(String::from_utf8_lossy(buf).into_owned());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Municipal KPI choropleth in the terminal", long_about = None)]
struct Cli {
    /// Base URL of the KPI data API (overrides the config file).
    #[arg(long)]
    api: Option<String>,
    /// Municipality boundary GeoJSON (overrides the config file).
    #[arg(long)]
    geojson: Option<PathBuf>,
    /// Dashboard config JSON; falls back to KOMMUN_DASHBOARD_CONFIG, then the builtin config.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let (log_tx, log_rx) = mpsc::channel::<String>();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .with_writer(move || ChannelWriter {
            sender: log_tx.clone(),
        })
        .init();

    let cli = Cli::parse();
    let (config, metadata) = load_dashboard_config(cli.config.as_deref());
    let mut config = (*config).clone();
    if let Some(api) = cli.api {
        config.api.base_url = api;
    }
    if let Some(geojson) = cli.geojson {
        config.geo.geojson_path = geojson;
    }
    info!(
        api = %config.api.base_url,
        config = ?metadata.path(),
        "Starting KPI dashboard"
    );

    let registry = GeoRegistry::from_file(&config.geo.geojson_path).wrap_err_with(|| {
        format!(
            "loading municipality boundaries from {}",
            config.geo.geojson_path.display()
        )
    })?;
    let source: Arc<dyn DataSource> =
        Arc::new(HttpDataSource::new(&config.api).wrap_err("building HTTP client")?);

    let runtime = tokio::runtime::Handle::current();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let ui_handle = std::thread::spawn(move || -> Result<()> {
        let app = DashboardApp::new(&config, source, Arc::new(registry), runtime, log_rx)?;
        let outcome = app.run();
        let _ = shutdown_tx.send(());
        outcome
    });

    let _ = shutdown_rx.await;
    info!("Dashboard closed");
    match ui_handle.join() {
        Ok(outcome) => outcome,
        Err(_) => Err(eyre!("dashboard UI thread panicked")),
    }
}
