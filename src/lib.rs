//! Client for the live playback dashboard of a music bot.
//!
//! The client connects to the dashboard WebSocket, identifies for one guild
//! and folds the pushed playback events into a [`player::Snapshot`] that a
//! [`view::View`] can render.
//!
//! ```no_run
//! use livedash::{config::Config, identity::Identity, remote::Client};
//!
//! # async fn example() -> livedash::error::Result<()> {
//! let page = url::Url::parse("https://dashboard.example/servers/1234").unwrap();
//! let identity = Identity::from_page("identifier=...", &page);
//! let mut client = Client::new(Config::new(page)?, identity);
//! let snapshots = client.subscribe();
//! client.run().await
//! # }
//! ```
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

#[macro_use]
extern crate log;

pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod format;
pub mod identity;
pub mod player;
pub mod protocol;
pub mod remote;
pub mod signal;
pub mod view;
