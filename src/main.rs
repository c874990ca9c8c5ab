mod api;
mod app;
mod cache;
mod commands;
mod config;
mod documents;
mod event;
mod incidents;
mod logging;
mod query;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "inc9s")]
#[command(about = "A terminal console for incidents and documents, inspired by k9s")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./inc9s.yaml or $XDG_CONFIG_HOME/inc9s/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Backend base URL, overrides config and INC9S_API_URL
  #[arg(long)]
  api_url: Option<String>,

  /// Tenant sent with document requests
  #[arg(short, long)]
  tenant: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Command line wins over file and environment
  if let Some(url) = args.api_url {
    config.api.base_url = url;
  }
  if let Some(tenant) = args.tenant {
    config.api.tenant_id = tenant;
  }
  config.validate()?;

  let _log_guard = logging::init(&config.log.level)?;
  info!(base_url = %config.api.base_url, tenant = %config.api.tenant_id, "starting");

  let gateway = api::Gateway::connect(config.base_url()?)?;
  let ctx = app::AppContext::new(config, gateway);

  let mut app = app::App::new(ctx);
  app.run().await?;

  Ok(())
}
