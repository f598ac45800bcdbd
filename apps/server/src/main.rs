#![warn(clippy::all, clippy::pedantic)]

use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use clap::Parser;
use tracing::info;
use vigil::config::{self, Config};
use vigil::monitoring::FileTargets;
use vigil::LibsqlStore;

mod error;
mod routes;
mod state;

use error::AppError;
use state::AppState;

/// Read-only HTTP view over the monitor's stored results.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file shared with vigil-service
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `[server] bind`
    #[arg(long)]
    bind: Option<String>,

    /// Override `[server] port`
    #[arg(long)]
    port: Option<u16>,
}

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    logger::init();

    let cli = Cli::parse();
    let config_path = config::resolve_config_path(cli.config.as_deref())?;
    let config = Config::from_config(Some(&config_path))?;

    let store = LibsqlStore::from_config(&config.database).await?;
    let state = web::Data::new(AppState::new(
        Arc::new(store),
        Arc::new(FileTargets::new(&config_path)),
        config.monitoring.clone(),
    ));

    let bind = cli.bind.unwrap_or(config.server.bind);
    let port = cli.port.unwrap_or(config.server.port);
    run_server(state, (bind, port)).await
}

async fn run_server(state: web::Data<AppState>, addr: (String, u16)) -> Result<(), AppError> {
    info!(bind = %addr.0, port = addr.1, "starting display server");

    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes::routes))
        .bind(addr)?
        .run()
        .await?;

    Ok(())
}
