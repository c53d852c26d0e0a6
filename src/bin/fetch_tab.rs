use std::path::PathBuf;

use clap::Parser;
use inquire::{InquireError, Text};
use tab_finder::{
    config::Config,
    pipeline::{TabStatus, VideoStatus},
    song::SongRequest,
};

#[derive(Parser)]
struct Opts {
    /// Asked interactively when omitted.
    title: Option<String>,
    artist: Option<String>,
    #[arg(long)]
    config_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();
    let config = Config::load(opts.config_path.as_deref())?;

    let (title, artist) = match opts.title {
        Some(title) => (title, opts.artist),
        None => {
            let title = match Text::new("Song title").prompt() {
                Err(InquireError::OperationInterrupted | InquireError::OperationCanceled) => {
                    return Ok(())
                }
                res => res?,
            };
            let artist = Text::new("Artist (optional)").prompt_skippable()?;
            (title, artist)
        }
    };
    let song = SongRequest::new(title, artist);
    if song.slug().as_str().is_empty() {
        anyhow::bail!("The song title is empty");
    }

    let finder = config.tab_finder()?;
    let report = finder.lookup(&song).await?;
    match &report.tab {
        TabStatus::Cached => println!("{} is already cached.", song.display_title()),
        TabStatus::Fetched { source } => println!("Saved the tab from {source}"),
        TabStatus::NotFound => {
            println!("❌ Could not find tab.");
            return Ok(());
        }
    }
    match &report.video {
        VideoStatus::Saved(url) => println!("Saved the video link {url}"),
        VideoStatus::NotFound => println!("No video found."),
        VideoStatus::Failed(e) => println!("Video lookup failed: {e}"),
        VideoStatus::Cached | VideoStatus::Skipped => {}
    }
    println!("{}", finder.cache().tab_path(&report.slug).display());
    Ok(())
}
