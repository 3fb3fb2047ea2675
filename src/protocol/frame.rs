//! Envelopes exchanged on the dashboard WebSocket.
//!
//! Inbound frames are classified by their opcode only; the payload of a
//! dispatch frame stays opaque until the dispatcher decodes it. Opcodes that
//! this client does not know are kept as [`Frame::Other`] so that the
//! connection can ignore them instead of failing.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_repr::Serialize_repr;
use veil::Redact;

use crate::{
    error::{Error, Result},
    identity::Identity,
};

/// Opcode of an envelope.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize_repr)]
#[repr(u8)]
pub enum Opcode {
    /// Server is ready to receive an identify.
    Hello = 0,
    /// Client identifies with a guild and login identifier.
    Identify = 1,
    /// Server pushes a typed event.
    Dispatch = 2,
}

impl TryFrom<u64> for Opcode {
    type Error = u64;

    fn try_from(value: u64) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Hello),
            1 => Ok(Self::Identify),
            2 => Ok(Self::Dispatch),
            other => Err(other),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hello => write!(f, "HELLO"),
            Self::Identify => write!(f, "IDENTIFY"),
            Self::Dispatch => write!(f, "DISPATCH"),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
struct RawFrame {
    op: u64,
    #[serde(default)]
    data: serde_json::Value,
}

/// Inbound frame after opcode classification.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Hello,
    /// Payload of a dispatch frame, decoded later by the dispatcher.
    Dispatch(serde_json::Value),
    /// Opcode that servers do not send or that is not known yet.
    Other(u64),
}

impl FromStr for Frame {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw: RawFrame = super::json(s, "frame")?;
        let frame = match Opcode::try_from(raw.op) {
            Ok(Opcode::Hello) => Self::Hello,
            Ok(Opcode::Dispatch) => Self::Dispatch(raw.data),
            Ok(Opcode::Identify) | Err(_) => Self::Other(raw.op),
        };
        Ok(frame)
    }
}

/// Outbound envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Outbound<T> {
    pub op: Opcode,
    pub data: T,
}

impl<T> Outbound<T>
where
    T: Serialize,
{
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Into::into)
    }
}

/// Body of the identify request.
#[derive(Clone, PartialEq, Eq, Serialize, Redact)]
pub struct Identify {
    pub guild_id: String,
    #[redact]
    pub identifier: String,
}

impl Outbound<Identify> {
    #[must_use]
    pub fn identify(identity: &Identity) -> Self {
        Self {
            op: Opcode::Identify,
            data: Identify {
                guild_id: identity.session_id.clone(),
                identifier: identity.identifier.clone(),
            },
        }
    }
}

/// Application close codes sent by the dashboard server.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum CloseCode {
    InvalidJson = 4001,
    UnknownOpcode = 4002,
    ServerOnlyOpcode = 4003,
    AlreadyAuthenticated = 4004,
    MissingField = 4005,
    GuildNotFound = 4006,
    NotLoggedIn = 4007,
}

impl TryFrom<u16> for CloseCode {
    type Error = u16;

    fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
        match value {
            4001 => Ok(Self::InvalidJson),
            4002 => Ok(Self::UnknownOpcode),
            4003 => Ok(Self::ServerOnlyOpcode),
            4004 => Ok(Self::AlreadyAuthenticated),
            4005 => Ok(Self::MissingField),
            4006 => Ok(Self::GuildNotFound),
            4007 => Ok(Self::NotLoggedIn),
            other => Err(other),
        }
    }
}

impl CloseCode {
    /// Converts the close code and reason into an error.
    ///
    /// Codes that reject the identity itself map to fatal error kinds.
    /// Protocol violations are transient: a fresh connection starts over.
    #[must_use]
    pub fn into_error(self, reason: &str) -> Error {
        let message = format!("server closed connection with {} ({reason})", self as u16);
        match self {
            Self::MissingField => Error::invalid_argument(message),
            Self::GuildNotFound => Error::not_found(message),
            Self::NotLoggedIn => Error::unauthenticated(message),
            Self::InvalidJson
            | Self::UnknownOpcode
            | Self::ServerOnlyOpcode
            | Self::AlreadyAuthenticated => Error::failed_precondition(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_ignores_payload() {
        let frame: Frame = r#"{"op": 0, "data": {"message": "Waiting for op: <IDENTIFY: 1>"}}"#
            .parse()
            .unwrap();
        assert_eq!(frame, Frame::Hello);
        assert_eq!("{\"op\":0}".parse::<Frame>().unwrap(), Frame::Hello);
    }

    #[test]
    fn dispatch_keeps_payload_opaque() {
        let frame: Frame = r#"{"op": 2, "data": {"type": "TRACK_END"}}"#.parse().unwrap();
        assert_eq!(
            frame,
            Frame::Dispatch(serde_json::json!({"type": "TRACK_END"}))
        );
    }

    #[test]
    fn unknown_and_client_opcodes_are_other() {
        assert_eq!("{\"op\":9}".parse::<Frame>().unwrap(), Frame::Other(9));
        assert_eq!("{\"op\":1}".parse::<Frame>().unwrap(), Frame::Other(1));
    }

    #[test]
    fn malformed_frames_fail_to_parse() {
        assert!("not json".parse::<Frame>().is_err());
        assert!("{\"data\":{}}".parse::<Frame>().is_err());
        assert!("{\"op\":\"zero\"}".parse::<Frame>().is_err());
    }

    #[test]
    fn identify_wire_format() {
        let identify = Outbound::identify(&Identity::new("abc", "1234"));
        let json: serde_json::Value = serde_json::from_str(&identify.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"op": 1, "data": {"guild_id": "1234", "identifier": "abc"}})
        );
    }

    #[test]
    fn identity_rejections_are_fatal() {
        assert!(CloseCode::NotLoggedIn.into_error("").is_fatal());
        assert!(CloseCode::GuildNotFound.into_error("").is_fatal());
        assert!(CloseCode::MissingField.into_error("").is_fatal());
        assert!(!CloseCode::AlreadyAuthenticated.into_error("").is_fatal());
        assert_eq!(CloseCode::try_from(1000), Err(1000));
    }
}
