use m3u_parser::Channel;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::watch;
use universal_player::DefaultEngineFactory;
use universal_player::EngineKind;
use universal_player::MediaSink;
use universal_player::PlayRequestError;
use universal_player::PlayStateListener;
use universal_player::Player;
use universal_player::SelectError;
use universal_player::Selection;
use universal_player::SinkCapabilities;

/// A directive for the browser-side video element.
///
/// The remote sink queues these on the session event stream and the
/// browser applies them to its video element in order.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SinkDirective {
    /// Set the element source for native playback
    SetSource { url: String },

    /// Clear the element source and reload it
    ClearSource,

    /// Start the named demuxing engine against the element
    AttachMediaSource { engine: EngineKind, url: String },

    /// Tear the named demuxing engine down
    DetachMediaSource { engine: EngineKind },

    /// Ask the element to start playback
    RequestPlay,

    /// Ask the element to pause
    RequestPause,
}

/// The browser video element, proxied over the API.
///
/// Capabilities arrive from the client's feature-detection handshake and
/// default to none until it happens;
/// directives flow back out over the session event stream.
#[derive(Debug)]
pub struct RemoteSink {
    capabilities: std::sync::Mutex<SinkCapabilities>,
    listener: std::sync::Mutex<Option<PlayStateListener>>,
    directives: broadcast::Sender<SinkDirective>,
}

impl RemoteSink {
    fn new() -> Self {
        let (directives, _) = broadcast::channel(32);

        Self {
            capabilities: std::sync::Mutex::new(SinkCapabilities::default()),
            listener: std::sync::Mutex::new(None),
            directives,
        }
    }

    /// Record the client's feature detection results.
    pub fn set_capabilities(&self, capabilities: SinkCapabilities) {
        *self
            .capabilities
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = capabilities;
    }

    /// Subscribe to the directive stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SinkDirective> {
        self.directives.subscribe()
    }

    /// Forward a native play or pause event reported by the client.
    ///
    /// Events that arrive while no engine is attached are dropped.
    pub fn native_event(&self, playing: bool) {
        let listener = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(listener) = listener.as_ref() {
            listener.set_playing(playing);
        }
    }

    fn send(&self, directive: SinkDirective) {
        // No connected client is fine; directives are ephemeral.
        let _ = self.directives.send(directive).is_ok();
    }
}

impl MediaSink for RemoteSink {
    fn capabilities(&self) -> SinkCapabilities {
        *self.capabilities.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_source(&self, url: &str) {
        self.send(SinkDirective::SetSource {
            url: url.to_string(),
        });
    }

    fn clear_source(&self) {
        self.send(SinkDirective::ClearSource);
    }

    fn attach_media_source(&self, engine: EngineKind, url: &str) {
        self.send(SinkDirective::AttachMediaSource {
            engine,
            url: url.to_string(),
        });
    }

    fn detach_media_source(&self, engine: EngineKind) {
        self.send(SinkDirective::DetachMediaSource { engine });
    }

    fn set_play_state_listener(&self, listener: PlayStateListener) {
        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = Some(listener);
    }

    fn clear_play_state_listener(&self) {
        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn request_play(&self) -> Result<(), PlayRequestError> {
        // The element decides; a blocked autoplay simply never reports a
        // play event back.
        self.send(SinkDirective::RequestPlay);
        Ok(())
    }

    fn request_pause(&self) {
        self.send(SinkDirective::RequestPause);
    }
}

/// A snapshot of the playback session.
#[derive(Debug, serde::Serialize)]
pub struct PlayerView {
    /// The channel whose engine owns the sink, if any
    pub channel: Option<Channel>,

    /// The attached engine kind, if any
    pub engine: Option<EngineKind>,

    /// The normalized play state
    pub playing: bool,
}

/// The playback session: one player driving one remote sink.
#[derive(Debug)]
pub struct PlayerSession {
    player: Player<RemoteSink>,
    current: std::sync::Mutex<Option<Channel>>,
}

impl PlayerSession {
    pub fn new(autoplay: bool) -> Self {
        Self {
            player: Player::new(
                RemoteSink::new(),
                Arc::new(DefaultEngineFactory::new()),
                autoplay,
            ),
            current: std::sync::Mutex::new(None),
        }
    }

    /// The remote sink this session drives.
    pub fn sink(&self) -> &RemoteSink {
        self.player.sink()
    }

    /// Subscribe to the normalized play state.
    pub fn play_state(&self) -> watch::Receiver<bool> {
        self.player.play_state()
    }

    /// Select a channel for playback.
    ///
    /// The session only records the channel as current once its engine
    /// actually owns the sink,
    /// so a superseded selection never clobbers the winner.
    pub async fn select(&self, channel: Channel) -> Result<Selection, SelectError> {
        let selection = self.player.select(&channel.url).await?;
        if matches!(selection, Selection::Attached { .. }) {
            *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(channel);
        }

        Ok(selection)
    }

    /// Stop playback and release the attached engine.
    pub async fn stop(&self) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.player.stop().await;
    }

    /// A snapshot of the session for the UI.
    pub async fn view(&self) -> PlayerView {
        let channel = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        PlayerView {
            channel,
            engine: self.player.engine_kind().await,
            playing: *self.player.play_state().borrow(),
        }
    }
}
