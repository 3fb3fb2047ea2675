//! Wire protocol of the dashboard WebSocket.
//!
//! Every message is a JSON object with an integer opcode and an optional
//! `data` payload:
//!
//! ```json
//! {"op": 0}
//! {"op": 1, "data": {"guild_id": "1234", "identifier": "..."}}
//! {"op": 2, "data": {"type": "PLAYER_UPDATE", "track": null, "position": null}}
//! ```
//!
//! # Submodules
//!
//! * [`frame`] - Envelopes, opcodes and close codes
//! * [`dispatch`] - Typed dispatch events and track metadata

pub mod dispatch;
pub mod frame;

pub use dispatch::{Dispatch, PlayerUpdate, PositionUpdate, Track};
pub use frame::{CloseCode, Frame, Identify, Opcode, Outbound};

use crate::error::Result;
use serde::Deserialize;
use std::fmt::Debug;

/// Parses and logs a JSON payload received from the server.
///
/// # Logging
///
/// * Success: Logs parsed structure at TRACE level
/// * Parse Error: Logs raw JSON at TRACE level if valid JSON
/// * Invalid JSON: Logs error and raw text at ERROR level
pub fn json<T>(body: &str, origin: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Debug,
{
    match serde_json::from_str(body) {
        Ok(result) => {
            trace!("{origin}: {result:?}");
            Ok(result)
        }
        Err(e) => {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
                trace!("{origin}: {json:#?}");
            } else {
                error!("{origin}: failed parsing frame ({e})");
                trace!("{body}");
            }
            Err(e.into())
        }
    }
}
