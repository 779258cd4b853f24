//! Scraper controller engine: worker gateway, progress feeds, artifact resolution
//! and the background runtime that executes core effects.
mod feed;
mod gateway;
mod resolver;
mod runner;
mod types;

pub use feed::{
    channel_feed, parse_worker_line, ChannelFeed, EventLogFeed, EventLogSource, FeedSource,
    LineFeed, ProgressFeed, WirePhase, WorkerEvent,
};
pub use gateway::{GatewaySettings, HttpGateway, LaunchGateway};
pub use resolver::ArtifactResolver;
pub use runner::EngineHandle;
pub use types::{EngineEvent, FeedError, Launched};
