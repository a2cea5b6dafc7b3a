//! Playback progress synchronization for a streaming video player.
//!
//! A [`PlayerSession`](client::PlayerSession) ties a media element to the
//! [`PlaybackStateMachine`](player::PlaybackStateMachine), which in turn
//! drives the [`ProgressSyncEngine`](client::ProgressSyncEngine): while the
//! media plays, the engine periodically saves the playhead through a
//! [`ProgressGateway`](network::ProgressGateway), never with more than one
//! save outstanding.

pub mod client;
pub mod config;
pub mod error;
pub mod network;
pub mod player;

pub use error::{GatewayError, PlayerError, PlayerResult};
