use std::path::PathBuf;

use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::Parser;
use log::info;
use tab_finder::{
    config::Config,
    fetch::Fetcher,
    search::DuckDuckGo,
    server::{routes, AppState},
};

#[derive(Parser)]
struct Opts {
    /// TOML file overriding the defaults
    #[arg(long)]
    config_path: Option<PathBuf>,
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();
    let mut config = Config::load(opts.config_path.as_deref())?;
    if let Some(port) = opts.port {
        config.port = port;
    }

    let state = web::Data::new(AppState {
        finder: config.tab_finder()?,
        songsterr: config.songsterr()?,
        recommended_searches: config.recommended_searches.clone(),
    });
    info!(
        "Serving tabs from {:?} on http://{}:{}/",
        config.data_dir, config.bind_address, config.port
    );
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(routes::<DuckDuckGo, Fetcher>)
            .wrap(Logger::default())
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await?)
}
