//! Playlist download example
//!
//! Resolves a playlist URL through the configured resolver service and
//! downloads every track as one paced batch, printing events as they arrive.
//!
//! ```text
//! cargo run --example playlist_download -- https://soundcloud.com/artist/sets/mix [format]
//! ```
//!
//! Set `RUST_LOG=playlist_dl=debug` for detailed logs.

use playlist_dl::config::{BatchConfig, Config, FetchConfig};
use playlist_dl::{AudioFormat, BatchDownloader, Event};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("playlist_dl=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(playlist_url) = args.next() else {
        eprintln!("usage: playlist_download <playlist-url> [mp3|m4a|opus|wav]");
        std::process::exit(2);
    };
    let format: AudioFormat = match args.next() {
        Some(raw) => raw.parse()?,
        None => AudioFormat::Mp3,
    };

    let config = Config {
        batch: BatchConfig {
            output_dir: "downloads".into(),
            pacing_delay: Duration::from_secs(1),
            default_format: format,
            ..Default::default()
        },
        fetch: FetchConfig {
            base_url: std::env::var("PLAYLIST_DL_SERVICE")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    let downloader = BatchDownloader::new(config).await?;

    let mut events = downloader.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::BatchStarted { batch_id, total } => {
                    println!("Batch #{} started: {} tracks", batch_id, total);
                }
                Event::TaskStarted {
                    label,
                    completed,
                    total,
                    ..
                } => {
                    println!("[{}/{}] {}", completed, total, label);
                }
                Event::TaskSucceeded {
                    byte_size, path, ..
                } => {
                    println!("  saved {} ({} bytes)", path.display(), byte_size);
                }
                Event::TaskFailed { task_id, error, .. } => {
                    println!("  failed {}: {}", task_id, error);
                }
                _ => {}
            }
        }
    });

    let summary = downloader.download_playlist(&playlist_url, format).await?;

    println!(
        "Batch #{} {:?}: {} saved, {} failed",
        summary.batch_id, summary.state, summary.succeeded, summary.failed
    );
    for outcome in summary.outcomes.iter().filter(|o| !o.succeeded) {
        println!(
            "  {} - {}",
            outcome.task.display_name,
            outcome.error_detail.as_deref().unwrap_or("unknown error")
        );
    }

    downloader.shutdown().await?;
    Ok(())
}
