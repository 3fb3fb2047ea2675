//! Client configuration.
//!
//! The only required input is the URL of the dashboard page. Everything else
//! has defaults that can be overridden from a TOML file:
//!
//! ```toml
//! websocket_path = "/websocket"
//! connect_timeout_ms = 10000
//! hello_timeout_ms = 10000
//! identify_timeout_ms = 10000
//! reconnect_min_delay_ms = 500
//! reconnect_max_delay_ms = 30000
//! max_reconnect_attempts = 20
//! max_message_size = 65536
//! placeholder_artwork = "/static/images/placeholder.png"
//! ```

use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds};
use url::Url;

use crate::{
    error::{Error, Result},
    view::View,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Config {
    /// URL of the dashboard page; scheme and host locate the WebSocket.
    pub page_url: Url,

    /// Fixed path of the WebSocket endpoint.
    pub websocket_path: String,

    pub connect_timeout: Duration,

    /// Maximum wait for Hello after the transport opened.
    pub hello_timeout: Duration,

    /// Maximum wait for the first dispatch after sending Identify.
    pub identify_timeout: Duration,

    pub reconnect_min_delay: Duration,
    pub reconnect_max_delay: Duration,

    /// `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,

    /// Text frames above this many bytes are dropped unparsed.
    pub max_message_size: usize,

    pub placeholder_artwork: String,
}

/// Optional overrides as read from a configuration file.
#[serde_as]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Overrides {
    websocket_path: Option<String>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    connect_timeout_ms: Option<Duration>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    hello_timeout_ms: Option<Duration>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    identify_timeout_ms: Option<Duration>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    reconnect_min_delay_ms: Option<Duration>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    reconnect_max_delay_ms: Option<Duration>,
    max_reconnect_attempts: Option<u32>,
    max_message_size: Option<usize>,
    placeholder_artwork: Option<String>,
}

impl Config {
    pub const WEBSOCKET_PATH: &'static str = "/websocket";

    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    const DEFAULT_RECONNECT_MIN_DELAY: Duration = Duration::from_millis(500);
    const DEFAULT_RECONNECT_MAX_DELAY: Duration = Duration::from_secs(30);
    const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

    /// Configuration files are small; anything larger is a mistake.
    const MAX_FILE_SIZE: u64 = 16 * 1024;

    /// Creates a configuration with defaults for the given dashboard page.
    ///
    /// # Errors
    ///
    /// Returns an error if the page URL has no host.
    pub fn new(page_url: Url) -> Result<Self> {
        if !page_url.has_host() {
            return Err(Error::invalid_argument(format!(
                "page url {page_url} has no host"
            )));
        }

        Ok(Self {
            page_url,
            websocket_path: Self::WEBSOCKET_PATH.to_owned(),
            connect_timeout: Self::DEFAULT_TIMEOUT,
            hello_timeout: Self::DEFAULT_TIMEOUT,
            identify_timeout: Self::DEFAULT_TIMEOUT,
            reconnect_min_delay: Self::DEFAULT_RECONNECT_MIN_DELAY,
            reconnect_max_delay: Self::DEFAULT_RECONNECT_MAX_DELAY,
            max_reconnect_attempts: None,
            max_message_size: Self::DEFAULT_MAX_MESSAGE_SIZE,
            placeholder_artwork: View::PLACEHOLDER_ARTWORK.to_owned(),
        })
    }

    /// Creates a configuration and applies the overrides in `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is too large or is not
    /// valid TOML with known keys.
    pub fn from_file<P: AsRef<Path>>(page_url: Url, path: P) -> Result<Self> {
        let path = path.as_ref();

        // Prevent out-of-memory condition: configuration should be small.
        let file_size = fs::metadata(path)?.len();
        if file_size > Self::MAX_FILE_SIZE {
            return Err(Error::out_of_range(format!(
                "{} is too large ({file_size} bytes)",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        Self::new(page_url)?.with_overrides(&contents)
    }

    /// Applies overrides from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML with known keys, or if
    /// the resulting reconnect delays are inconsistent.
    pub fn with_overrides(mut self, toml: &str) -> Result<Self> {
        let overrides: Overrides = toml::from_str(toml)?;
        trace!("config overrides: {overrides:?}");

        if let Some(path) = overrides.websocket_path {
            self.websocket_path = path;
        }
        if let Some(timeout) = overrides.connect_timeout_ms {
            self.connect_timeout = timeout;
        }
        if let Some(timeout) = overrides.hello_timeout_ms {
            self.hello_timeout = timeout;
        }
        if let Some(timeout) = overrides.identify_timeout_ms {
            self.identify_timeout = timeout;
        }
        if let Some(delay) = overrides.reconnect_min_delay_ms {
            self.reconnect_min_delay = delay;
        }
        if let Some(delay) = overrides.reconnect_max_delay_ms {
            self.reconnect_max_delay = delay;
        }
        if let Some(attempts) = overrides.max_reconnect_attempts {
            self.max_reconnect_attempts = Some(attempts);
        }
        if let Some(size) = overrides.max_message_size {
            self.max_message_size = size;
        }
        if let Some(artwork) = overrides.placeholder_artwork {
            self.placeholder_artwork = artwork;
        }

        if self.reconnect_min_delay > self.reconnect_max_delay {
            return Err(Error::invalid_argument(format!(
                "reconnect delay minimum {:?} exceeds maximum {:?}",
                self.reconnect_min_delay, self.reconnect_max_delay
            )));
        }

        Ok(self)
    }

    /// Derives the WebSocket URL from the page URL.
    ///
    /// The scheme maps `http` to `ws` and `https` to `wss`; host and port are
    /// kept and the path is replaced by [`websocket_path`](Self::websocket_path).
    ///
    /// # Errors
    ///
    /// Returns an error if the page scheme is not HTTP(S) or WS(S).
    pub fn websocket_url(&self) -> Result<Url> {
        let scheme = match self.page_url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(Error::invalid_argument(format!(
                    "unsupported page scheme {other}"
                )))
            }
        };

        let mut url = self.page_url.clone();
        url.set_scheme(scheme)
            .map_err(|()| Error::internal(format!("cannot set scheme {scheme} on {url}")))?;
        url.set_path(&self.websocket_path);
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }
}
