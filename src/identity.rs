//! Session identity read from ambient dashboard context.
//!
//! A browser visiting `/servers/<guild id>` carries an `identifier` cookie
//! that was issued when the user logged in. Both values are needed to
//! identify on the WebSocket. Missing or malformed context degrades to empty
//! strings: the server rejects those, and the client does not second-guess it.

use percent_encoding::percent_decode_str;
use url::Url;
use veil::Redact;

/// Identity presented in the identify handshake.
///
/// The identifier is a signed login token and is redacted from debug output.
#[derive(Clone, Default, PartialEq, Eq, Hash, Redact)]
pub struct Identity {
    #[redact]
    pub identifier: String,
    pub session_id: String,
}

impl Identity {
    /// Name of the cookie holding the login identifier.
    pub const COOKIE_NAME: &'static str = "identifier";

    /// Route prefix of the per-guild dashboard page.
    pub const PATH_PREFIX: &'static str = "/servers/";

    #[must_use]
    pub fn new(identifier: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            session_id: session_id.into(),
        }
    }

    /// Reads the identity from a `Cookie` header value and a page path.
    #[must_use]
    pub fn from_context(cookie_header: &str, path: &str) -> Self {
        let identifier = cookie(cookie_header, Self::COOKIE_NAME).unwrap_or_else(|| {
            warn!("no {} cookie present", Self::COOKIE_NAME);
            String::new()
        });

        let session_id = session_id(path).unwrap_or_else(|| {
            warn!("no session id in path {path}");
            String::new()
        });

        Self::new(identifier, session_id)
    }

    /// Reads the identity from a cookie header and the dashboard page URL.
    #[must_use]
    pub fn from_page(cookie_header: &str, page: &Url) -> Self {
        Self::from_context(cookie_header, page.path())
    }
}

/// Returns the percent-decoded value of the first cookie named `name`.
///
/// A value that does not decode to UTF-8 is returned as-is.
#[must_use]
pub fn cookie(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key.trim() != name {
            return None;
        }

        let value = value.trim();
        Some(
            percent_decode_str(value)
                .decode_utf8()
                .map_or_else(|_| value.to_owned(), |decoded| decoded.into_owned()),
        )
    })
}

/// Returns the guild id from a `/servers/<id>` path.
///
/// Trailing path segments are ignored. Returns `None` when the prefix is
/// missing or the id segment is empty.
#[must_use]
pub fn session_id(path: &str) -> Option<String> {
    let rest = path.strip_prefix(Identity::PATH_PREFIX)?;
    let id = rest.split('/').next().unwrap_or_default();
    if id.is_empty() {
        None
    } else {
        Some(id.to_owned())
    }
}
