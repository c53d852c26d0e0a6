use std::path::PathBuf;

use clap::Parser;
use itertools::Itertools;
use tab_finder::config::Config;

#[derive(Parser)]
struct Opts {
    /// Song title, optionally followed by the artist.
    #[arg(required = true)]
    pattern: Vec<String>,
    #[arg(long)]
    config_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();
    let config = Config::load(opts.config_path.as_deref())?;
    match config.songsterr()?.find(&opts.pattern.iter().join(" ")).await? {
        Some(song) => {
            println!("Found: {} by {}", song.title, song.artist.name);
            println!("{}", song.embed_url());
        }
        None => println!("No tab found for that song."),
    }
    Ok(())
}
