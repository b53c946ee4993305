//! External collaborators of the batch loop
//!
//! The loop itself only orchestrates; the I/O it drives sits behind three
//! traits so that transports and storage can be swapped or mocked:
//!
//! - [`PayloadFetcher`]: download one item's bytes
//! - [`FileSink`]: persist a fetched payload under a file name
//! - [`PlaylistResolver`]: turn a playlist URL into an ordered track list
//!
//! Production implementations:
//!
//! - [`HttpPayloadFetcher`] / [`HttpPlaylistResolver`]: JSON POSTs against the
//!   resolver service configured in [`FetchConfig`](crate::config::FetchConfig)
//! - [`DirectorySink`]: writes into the configured output directory
//!
//! ## Usage
//!
//! ```no_run
//! use playlist_dl::config::FetchConfig;
//! use playlist_dl::transfer::{HttpPayloadFetcher, PayloadFetcher};
//! use playlist_dl::AudioFormat;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = HttpPayloadFetcher::new(&FetchConfig::default())?;
//!     let payload = fetcher
//!         .fetch_payload("https://soundcloud.com/artist/track", AudioFormat::Mp3)
//!         .await?;
//!     println!("fetched {} bytes", payload.len());
//!     Ok(())
//! }
//! ```

mod http;
mod sink;
mod traits;

pub use http::{HttpPayloadFetcher, HttpPlaylistResolver};
pub use sink::DirectorySink;
pub use traits::{FileSink, PayloadFetcher, PlaylistResolver};
