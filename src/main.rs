use std::{error::Error, process};

use clap::{command, Parser, ValueHint};
use log::{debug, error, info, LevelFilter};
use tokio::sync::{mpsc, watch};
use url::Url;
use veil::Redact;

use livedash::{
    config::Config,
    events::Event,
    format::format_friendly,
    identity::{self, Identity},
    player::Snapshot,
    remote,
    signal,
    view::View,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Hash, PartialEq, Eq, Parser, Redact)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Dashboard page of the server to follow
    ///
    /// For example `https://dashboard.example/servers/123456789`. The session
    /// id is taken from the path and the WebSocket endpoint from the scheme
    /// and host.
    #[arg(value_name = "URL", value_hint = ValueHint::Url)]
    page_url: Url,

    /// Cookie header as sent by the browser
    ///
    /// The `identifier` cookie is taken from it. Keep this value private: it
    /// grants access to your dashboard session.
    #[arg(short, long, env = "LIVEDASH_COOKIE", hide_env_values = true)]
    #[redact]
    cookie: Option<String>,

    /// Login identifier, overriding the one in the cookie
    #[arg(short, long, env = "LIVEDASH_IDENTIFIER", hide_env_values = true)]
    #[redact]
    identifier: Option<String>,

    /// Session id, overriding the one in the page URL
    #[arg(short, long)]
    session_id: Option<String>,

    /// Configuration file with connection overrides
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    config: Option<String>,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(args: &Args) {
    let mut logger = env_logger::Builder::from_env(
        // Note: if you change the default logging level here, then you should
        // probably also change the verbosity levels below.
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if args.quiet || args.verbose > 0 {
        let level = match args.verbose {
            // Quiet and verbose are mutually exclusive.
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module(module_path!(), level);
    }

    logger.init();
}

/// Builds the identity from the page context, then applies overrides.
fn build_identity(args: &Args) -> Identity {
    let cookie = args.cookie.as_deref().unwrap_or_default();
    let mut identity = Identity::from_page(cookie, &args.page_url);

    if let Some(identifier) = &args.identifier {
        identity.identifier.clone_from(identifier);
    }
    if let Some(session_id) = &args.session_id {
        identity.session_id.clone_from(session_id);
    }

    if identity.session_id.is_empty() {
        info!(
            "page url should look like https://host{}<id>",
            Identity::PATH_PREFIX
        );
    } else if identity::session_id(args.page_url.path()).is_none() {
        debug!("using session id {} from the command line", identity.session_id);
    }

    identity
}

/// Prints the player card every time the snapshot changes.
async fn render(mut snapshots: watch::Receiver<Snapshot>, placeholder_artwork: String) {
    let mut last_track = None;

    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();

        let track = snapshot.track.as_ref();
        let key = track.map(|track| (track.identifier.clone(), track.title.clone()));
        if key != last_track {
            if let Some(track) = track {
                let length = u64::try_from(track.duration.as_millis()).unwrap_or(u64::MAX);
                info!("now playing {} ({})", track.title, format_friendly(length));
            }
            last_track = key;
        }

        println!("{}\n", View::with_placeholder(&snapshot, &placeholder_artwork));
    }
}

/// Logs connection notifications.
async fn log_events(mut events: mpsc::UnboundedReceiver<Event>) {
    while let Some(event) = events.recv().await {
        match event {
            Event::Identified => info!("receiving live updates"),
            Event::PlayerDisconnected => info!("player left the voice channel"),
            Event::Reconnecting => info!("connection lost"),
            event => debug!("event: {event:?}"),
        }
    }
}

/// Main application loop.
///
/// # Errors
///
/// Returns an error when the configuration is invalid, the server rejects
/// the identity, or the client gave up reconnecting.
async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let identity = build_identity(&args);

    let config = match &args.config {
        Some(path) => Config::from_file(args.page_url.clone(), path)?,
        None => Config::new(args.page_url.clone())?,
    };
    debug!("{config:#?}");

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let mut client = remote::Client::new(config.clone(), identity).with_events(event_tx);

    tokio::spawn(render(client.subscribe(), config.placeholder_artwork));
    tokio::spawn(log_events(event_rx));

    let mut signals = signal::Handler::new()?;

    // Main application loop. The client reconnects on its own; this loop
    // only restarts it when asked to by a signal.
    loop {
        tokio::select! {
            // Prioritize signals.
            biased;

            signal = signals.recv() => {
                client.stop().await;
                if signal.is_shutdown() {
                    info!("received {signal}, shutting down gracefully");
                    break Ok(());
                }
                info!("received {signal}, reconnecting");
            }

            result = client.run() => {
                break result.map_err(Into::into);
            }
        }
    }
}

/// Main entry point of the application.
///
/// This function initializes the logger facade, parses the command line
/// arguments, and starts the main application loop.
#[tokio::main]
async fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {:#?}", args);

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    info!("starting {name}/{version}; {BUILD_PROFILE}");

    if let Err(e) = run(args).await {
        error!("{e}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_overrides_page_identity() {
        let args = Args::parse_from([
            "livedash",
            "https://dash.example/servers/42",
            "--cookie",
            "theme=dark; identifier=abc",
            "--session-id",
            "7",
        ]);

        let identity = build_identity(&args);
        assert_eq!(identity.identifier, "abc");
        assert_eq!(identity.session_id, "7");
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Args::try_parse_from(["livedash", "http://localhost/servers/1", "-q", "-v"]).is_err());
    }

    #[test]
    fn cookie_is_redacted_from_debug_output() {
        let args = Args::parse_from([
            "livedash",
            "https://dash.example/servers/42",
            "--cookie",
            "identifier=secret",
        ]);
        assert!(!format!("{args:?}").contains("secret"));
    }
}
