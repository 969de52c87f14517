use crate::EngineKind;
use std::sync::Arc;
use tokio::sync::watch;

/// Runtime capabilities of a media sink.
///
/// Engines are only attached to a sink after checking the capability they
/// rely on; nothing about the runtime environment is assumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SinkCapabilities {
    /// The sink supports engines that demux into a media source buffer.
    #[serde(rename = "media-source", default)]
    pub media_source: bool,

    /// The sink supports live MPEG-TS demuxing into a media source buffer.
    #[serde(rename = "live-ts", default)]
    pub live_ts: bool,

    /// The sink can natively decode the HLS container format.
    #[serde(rename = "native-hls", default)]
    pub native_hls: bool,

    /// The sink supports FLV demuxing.
    #[serde(default)]
    pub flv: bool,
}

/// The play-state signal handed to an engine at attach time.
///
/// Engines surface play and pause changes differently,
/// some through the sink's native events and some through their own
/// callbacks;
/// whatever the source, every engine reports through this one handle so
/// collaborators see a single two-state signal.
#[derive(Debug, Clone)]
pub struct PlayStateListener {
    tx: Arc<watch::Sender<bool>>,
}

impl PlayStateListener {
    pub(crate) fn new(tx: Arc<watch::Sender<bool>>) -> Self {
        Self { tx }
    }

    /// Report whether the sink is currently playing.
    pub fn set_playing(&self, playing: bool) {
        self.tx.send_replace(playing);
    }
}

/// An error that may occur while requesting playback.
#[derive(Debug, thiserror::Error)]
pub enum PlayRequestError {
    /// The sink's policy blocked an unsolicited playback start.
    #[error("the playback request was blocked")]
    Blocked,

    /// The sink has no source to play.
    #[error("the sink has no source")]
    NoSource,
}

/// A video output surface that playback engines attach to.
///
/// A sink is owned exclusively by one lifecycle manager;
/// no other component may mutate its source or its attached engine.
pub trait MediaSink: Send + Sync {
    /// Report the sink's runtime capabilities.
    fn capabilities(&self) -> SinkCapabilities;

    /// Set the source URL for native playback.
    fn set_source(&self, url: &str);

    /// Clear a natively playing source, releasing its resources.
    fn clear_source(&self);

    /// Attach a demuxing engine's media source for the given URL.
    fn attach_media_source(&self, engine: EngineKind, url: &str);

    /// Detach a previously attached media source.
    fn detach_media_source(&self, engine: EngineKind);

    /// Route the sink's native play and pause events to the listener.
    fn set_play_state_listener(&self, listener: PlayStateListener);

    /// Drop the current play state listener, if any.
    fn clear_play_state_listener(&self);

    /// Request playback to start.
    fn request_play(&self) -> Result<(), PlayRequestError>;

    /// Request playback to pause.
    fn request_pause(&self);
}
