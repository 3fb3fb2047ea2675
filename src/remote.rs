//! Connection to the dashboard WebSocket.
//!
//! The connection goes through the following states:
//!
//! ```text
//! Connecting -> Identifying -> Active -> Reconnecting -> Connecting ...
//!                                     \-> Closed
//! ```
//!
//! * `Connecting`: the transport is opening or waiting for Hello. Nothing is
//!   sent in this state.
//! * `Identifying`: Hello was received and Identify sent, exactly once.
//! * `Active`: dispatch frames flow into the playback state reducer.
//! * `Reconnecting`: the transport closed and the client waits out a backoff
//!   delay. The next connection identifies again.
//! * `Closed`: the client stopped, gave up, or the server rejected the
//!   identity.
//!
//! The transition rules live in [`Handshake`], which performs no I/O.
//! [`Client`] drives it with a real WebSocket.

use std::{fmt, ops::ControlFlow};

use exponential_backoff::Backoff;
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    sync::{mpsc, watch},
    time::Instant,
};
use tokio_tungstenite::{
    tungstenite::Message as WebsocketMessage, MaybeTlsStream, WebSocketStream,
};

use crate::{
    config::Config,
    dispatch::dispatch,
    error::{Error, Result},
    events::Event,
    identity::Identity,
    player::{Player, Snapshot},
    protocol::{CloseCode, Dispatch, Frame, Outbound},
};

type WebsocketSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WebsocketMessage>;

/// Connection state.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum State {
    #[default]
    Connecting,
    Identifying,
    Active,
    Reconnecting,
    Closed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Connecting => write!(f, "connecting"),
            State::Identifying => write!(f, "identifying"),
            State::Active => write!(f, "active"),
            State::Reconnecting => write!(f, "reconnecting"),
            State::Closed => write!(f, "closed"),
        }
    }
}

/// What the connection must do in response to an inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Send the identify request now.
    Identify,
    /// Forward the payload to the dispatcher.
    Dispatch(serde_json::Value),
    Ignore,
}

/// Handshake state machine of a single connection.
///
/// A handshake only moves forward: once it left `Connecting` it never asks
/// for another Identify, so each connection identifies at most once and
/// never before Hello.
#[derive(Clone, Debug, Default)]
pub struct Handshake {
    state: State,
}

impl Handshake {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    pub fn handle(&mut self, frame: Frame) -> Step {
        match (self.state, frame) {
            (State::Connecting, Frame::Hello) => {
                self.state = State::Identifying;
                Step::Identify
            }
            (state, Frame::Hello) => {
                warn!("ignoring hello while {state}");
                Step::Ignore
            }
            (State::Identifying | State::Active, Frame::Dispatch(data)) => {
                self.state = State::Active;
                Step::Dispatch(data)
            }
            (state, Frame::Dispatch(_)) => {
                warn!("ignoring dispatch while {state}");
                Step::Ignore
            }
            (_, Frame::Other(op)) => {
                trace!("ignoring opcode {op}");
                Step::Ignore
            }
        }
    }

    pub fn close(&mut self) {
        self.state = State::Closed;
    }
}

/// Dashboard client owning the WebSocket and the playback state.
pub struct Client {
    config: Config,
    identity: Identity,
    state: State,

    player: Player,
    snapshot_tx: watch::Sender<Snapshot>,
    event_tx: Option<mpsc::UnboundedSender<Event>>,

    ws_tx: Option<WebsocketSink>,
}

impl Client {
    #[must_use]
    pub fn new(config: Config, identity: Identity) -> Self {
        let (snapshot_tx, _) = watch::channel(Snapshot::default());

        Self {
            config,
            identity,
            state: State::default(),
            player: Player::new(),
            snapshot_tx,
            event_tx: None,
            ws_tx: None,
        }
    }

    /// Sends notifications to `event_tx` from now on.
    #[must_use]
    pub fn with_events(mut self, event_tx: mpsc::UnboundedSender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Returns a receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        self.player.snapshot()
    }

    /// Keeps the dashboard connected until the identity is rejected or the
    /// reconnect attempts run out.
    ///
    /// Every new connection waits for Hello and identifies again. The backoff
    /// schedule starts over once a connection became active.
    ///
    /// # Errors
    ///
    /// Returns the fatal error that closed the client, or an `Unavailable`
    /// error when no more reconnects are allowed.
    pub async fn run(&mut self) -> Result<()> {
        // The last item of a backoff schedule signals to give up, so allow
        // one more item than there are reconnects.
        let attempts = self.config.max_reconnect_attempts.unwrap_or(u32::MAX);
        let backoff = Backoff::new(
            attempts.saturating_add(1),
            self.config.reconnect_min_delay,
            self.config.reconnect_max_delay,
        );
        let mut delays = IntoIterator::into_iter(&backoff);

        loop {
            let result = self.start().await;
            let was_active = self.state == State::Active;
            self.disconnect();

            match result {
                Ok(()) => info!("connection closed by server"),
                Err(e) if e.is_fatal() => {
                    error!("{e}");
                    self.set_state(State::Closed);
                    return Err(e);
                }
                Err(e) => warn!("{e}"),
            }

            if was_active {
                delays = IntoIterator::into_iter(&backoff);
            }

            match delays.next() {
                Some(Some(delay)) => {
                    self.set_state(State::Reconnecting);
                    self.emit(Event::Reconnecting);
                    info!("reconnecting in {:.1}s", delay.as_secs_f32());
                    tokio::time::sleep(delay).await;
                }
                _ => {
                    self.set_state(State::Closed);
                    return Err(Error::unavailable(format!(
                        "giving up after {attempts} reconnect attempts"
                    )));
                }
            }
        }
    }

    /// Runs a single connection until it closes.
    ///
    /// Returns `Ok` when the server closed the connection without an
    /// application close code.
    ///
    /// # Errors
    ///
    /// Returns an error when connecting fails, a handshake deadline passes,
    /// the transport fails, or the server closes with an application code.
    pub async fn start(&mut self) -> Result<()> {
        let url = self.config.websocket_url()?;
        self.set_state(State::Connecting);

        info!("connecting to {url}");
        let (ws_stream, _) = tokio::time::timeout(
            self.config.connect_timeout,
            tokio_tungstenite::connect_async(url.as_str()),
        )
        .await??;

        let (ws_tx, mut ws_rx) = ws_stream.split();
        self.ws_tx = Some(ws_tx);
        self.emit(Event::Connected);

        let mut handshake = Handshake::new();
        let deadline = tokio::time::sleep(self.config.hello_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                () = &mut deadline, if handshake.state() != State::Active => {
                    let error = match handshake.state() {
                        State::Connecting => format!("no hello within {:?}", self.config.hello_timeout),
                        state => format!("still {state} after {:?}", self.config.identify_timeout),
                    };
                    return Err(Error::deadline_exceeded(error));
                }

                message = ws_rx.next() => {
                    let Some(message) = message else {
                        return Ok(());
                    };

                    let before = handshake.state();
                    if let ControlFlow::Break(result) = self.handle_message(message?, &mut handshake).await {
                        return result;
                    }

                    let after = handshake.state();
                    self.set_state(after);
                    if before == State::Connecting && after == State::Identifying {
                        deadline
                            .as_mut()
                            .reset(Instant::now() + self.config.identify_timeout);
                    }
                }
            }
        }
    }

    /// Closes the WebSocket, if any, and moves to `Closed`.
    pub async fn stop(&mut self) {
        if let Some(ws_tx) = &mut self.ws_tx {
            debug!("closing websocket");
            if let Err(e) = ws_tx.send(WebsocketMessage::Close(None)).await {
                debug!("error closing websocket: {e}");
            }
        }

        self.disconnect();
        self.set_state(State::Closed);
    }

    async fn handle_message(
        &mut self,
        message: WebsocketMessage,
        handshake: &mut Handshake,
    ) -> ControlFlow<Result<()>, ()> {
        match message {
            WebsocketMessage::Text(text) => {
                // Do not parse exceedingly large messages to prevent out of
                // memory conditions.
                let message_size = text.len();
                if message_size > self.config.max_message_size {
                    error!("ignoring oversized message with {message_size} bytes");
                    return ControlFlow::Continue(());
                }

                let frame = match text.parse::<Frame>() {
                    Ok(frame) => frame,
                    Err(e) => {
                        error!("dropping malformed frame: {e}");
                        return ControlFlow::Continue(());
                    }
                };

                match handshake.handle(frame) {
                    Step::Identify => {
                        if let Err(e) = self.identify().await {
                            return ControlFlow::Break(Err(e));
                        }
                    }
                    Step::Dispatch(data) => self.handle_dispatch(data),
                    Step::Ignore => {}
                }

                ControlFlow::Continue(())
            }

            WebsocketMessage::Close(payload) => {
                handshake.close();

                // Write the close reply that the transport queued.
                if let Some(ws_tx) = &mut self.ws_tx {
                    if let Err(e) = ws_tx.flush().await {
                        debug!("error acknowledging close: {e}");
                    }
                }

                let result = match payload {
                    Some(frame) => match CloseCode::try_from(u16::from(frame.code)) {
                        Ok(code) => Err(code.into_error(&frame.reason)),
                        Err(code) => {
                            debug!("connection closed with {code} ({})", &*frame.reason);
                            Ok(())
                        }
                    },
                    None => Ok(()),
                };
                ControlFlow::Break(result)
            }

            // Pongs are queued by the transport itself.
            WebsocketMessage::Ping(_) => {
                trace!("ping -> pong");
                ControlFlow::Continue(())
            }

            _ => {
                trace!("message type unimplemented");
                ControlFlow::Continue(())
            }
        }
    }

    async fn identify(&mut self) -> Result<()> {
        let identify = Outbound::identify(&self.identity);
        debug!("identifying: {:?}", identify.data);

        let text = identify.to_json()?;
        self.send_message(WebsocketMessage::text(text)).await
    }

    fn handle_dispatch(&mut self, data: serde_json::Value) {
        let event = match Dispatch::from_value(data) {
            Ok(event) => event,
            Err(e) => {
                error!("dropping malformed dispatch: {e}");
                return;
            }
        };

        if let Some(notification) = dispatch(&mut self.player, event) {
            self.snapshot_tx.send_replace(self.player.snapshot().clone());
            self.emit(notification);
        }
    }

    async fn send_message(&mut self, message: WebsocketMessage) -> Result<()> {
        match &mut self.ws_tx {
            Some(tx) => tx.send(message).await.map_err(Into::into),
            None => Err(Error::unavailable("websocket stream unavailable")),
        }
    }

    fn disconnect(&mut self) {
        if self.ws_tx.take().is_some() {
            self.emit(Event::Disconnected);
        }

        // A position without a live feed is stale.
        if self.player.snapshot().position.is_some() {
            self.player.on_connection_lost();
            self.snapshot_tx.send_replace(self.player.snapshot().clone());
        }
    }

    fn set_state(&mut self, state: State) {
        if self.state != state {
            debug!("connection state: {} -> {state}", self.state);
            self.state = state;
        }
    }

    fn emit(&self, event: Event) {
        if let Some(event_tx) = &self.event_tx {
            if event_tx.send(event).is_err() {
                trace!("no receiver for {event:?}");
            }
        }
    }
}
