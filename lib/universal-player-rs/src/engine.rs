use crate::sink::MediaSink;
use crate::sink::PlayStateListener;
use std::future::Future;
use std::pin::Pin;

/// The playback engine variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    /// Adaptive HLS demuxing into a media source buffer
    Hls,

    /// Live MPEG-TS demuxing into a media source buffer
    Mpegts,

    /// MPEG-DASH playback
    Dash,

    /// FLV demuxing into a media source buffer
    Flv,

    /// Native playback, the sink decodes the source itself
    Native,
}

impl EngineKind {
    /// The name of this engine kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hls => "hls",
            Self::Mpegts => "mpegts",
            Self::Dash => "dash",
            Self::Flv => "flv",
            Self::Native => "native",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error that may occur while attaching an engine.
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    /// The engine was already attached to a sink
    #[error("the engine is already attached")]
    AlreadyAttached,

    /// The sink does not support this engine
    #[error("the sink does not support the \"{engine}\" engine")]
    Unsupported {
        /// The engine kind that was rejected
        engine: EngineKind,
    },
}

/// An error that may occur while loading an engine module.
#[derive(Debug, thiserror::Error)]
#[error("the \"{engine}\" engine module failed to load")]
pub struct LoadEngineError {
    /// The engine kind that failed to load
    pub engine: EngineKind,

    /// The underlying error, if any
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// One playback engine instance.
///
/// An attached engine binds one media sink to one URL and owns whatever
/// demuxer resources it allocates.
/// `destroy` must be idempotent and must never fail;
/// teardown is never allowed to block the next attachment.
pub trait Engine: Send {
    /// The engine variant.
    fn kind(&self) -> EngineKind;

    /// Bind this engine to a sink and URL and wire its play-state source.
    fn attach(
        &mut self,
        sink: &dyn MediaSink,
        url: &str,
        play_state: PlayStateListener,
    ) -> Result<(), AttachError>;

    /// Release every resource this engine holds against the sink.
    fn destroy(&mut self, sink: &dyn MediaSink);
}

/// A boxed future resolving to a loaded engine.
pub type BoxEngineFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Box<dyn Engine>, LoadEngineError>> + Send + 'a>>;

/// An asynchronous source of playback engines.
///
/// Loading is asynchronous so implementations may defer expensive engine
/// module initialization until a stream actually needs it.
pub trait EngineFactory: Send + Sync {
    /// Load the module for an engine kind and return a fresh engine.
    fn load(&self, kind: EngineKind) -> BoxEngineFuture<'_>;
}

/// The factory for the built-in engines.
#[derive(Debug, Default)]
pub struct DefaultEngineFactory {}

impl DefaultEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EngineFactory for DefaultEngineFactory {
    fn load(&self, kind: EngineKind) -> BoxEngineFuture<'_> {
        Box::pin(async move {
            let engine: Box<dyn Engine> = match kind {
                EngineKind::Hls => Box::new(HlsEngine::new()),
                EngineKind::Mpegts => Box::new(MpegtsEngine::new()),
                EngineKind::Dash => Box::new(DashEngine::new()),
                EngineKind::Flv => Box::new(FlvEngine::new()),
                EngineKind::Native => Box::new(NativeEngine::new()),
            };
            Ok(engine)
        })
    }
}

/// Adaptive HLS playback through the sink's media source buffer.
#[derive(Debug, Default)]
pub struct HlsEngine {
    attached: bool,
}

impl HlsEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for HlsEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Hls
    }

    fn attach(
        &mut self,
        sink: &dyn MediaSink,
        url: &str,
        play_state: PlayStateListener,
    ) -> Result<(), AttachError> {
        if self.attached {
            return Err(AttachError::AlreadyAttached);
        }
        if !sink.capabilities().media_source {
            return Err(AttachError::Unsupported {
                engine: self.kind(),
            });
        }

        sink.attach_media_source(EngineKind::Hls, url);
        sink.set_play_state_listener(play_state);
        self.attached = true;

        Ok(())
    }

    fn destroy(&mut self, sink: &dyn MediaSink) {
        if !self.attached {
            return;
        }
        self.attached = false;

        sink.clear_play_state_listener();
        sink.detach_media_source(EngineKind::Hls);
    }
}

/// Live MPEG-TS playback through the sink's media source buffer.
#[derive(Debug, Default)]
pub struct MpegtsEngine {
    attached: bool,
}

impl MpegtsEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for MpegtsEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Mpegts
    }

    fn attach(
        &mut self,
        sink: &dyn MediaSink,
        url: &str,
        play_state: PlayStateListener,
    ) -> Result<(), AttachError> {
        if self.attached {
            return Err(AttachError::AlreadyAttached);
        }
        if !sink.capabilities().live_ts {
            return Err(AttachError::Unsupported {
                engine: self.kind(),
            });
        }

        sink.attach_media_source(EngineKind::Mpegts, url);
        sink.set_play_state_listener(play_state);
        self.attached = true;

        Ok(())
    }

    fn destroy(&mut self, sink: &dyn MediaSink) {
        if !self.attached {
            return;
        }
        self.attached = false;

        sink.clear_play_state_listener();
        sink.detach_media_source(EngineKind::Mpegts);
    }
}

/// MPEG-DASH playback.
///
/// Attached unconditionally;
/// the DASH player manages its own buffering against the sink.
#[derive(Debug, Default)]
pub struct DashEngine {
    attached: bool,
}

impl DashEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for DashEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Dash
    }

    fn attach(
        &mut self,
        sink: &dyn MediaSink,
        url: &str,
        play_state: PlayStateListener,
    ) -> Result<(), AttachError> {
        if self.attached {
            return Err(AttachError::AlreadyAttached);
        }

        sink.attach_media_source(EngineKind::Dash, url);
        // The DASH player reports state through its own callbacks,
        // starting from paused.
        play_state.set_playing(false);
        sink.set_play_state_listener(play_state);
        self.attached = true;

        Ok(())
    }

    fn destroy(&mut self, sink: &dyn MediaSink) {
        if !self.attached {
            return;
        }
        self.attached = false;

        sink.clear_play_state_listener();
        sink.detach_media_source(EngineKind::Dash);
    }
}

/// FLV playback through the sink's media source buffer.
#[derive(Debug, Default)]
pub struct FlvEngine {
    attached: bool,
}

impl FlvEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for FlvEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Flv
    }

    fn attach(
        &mut self,
        sink: &dyn MediaSink,
        url: &str,
        play_state: PlayStateListener,
    ) -> Result<(), AttachError> {
        if self.attached {
            return Err(AttachError::AlreadyAttached);
        }
        if !sink.capabilities().flv {
            return Err(AttachError::Unsupported {
                engine: self.kind(),
            });
        }

        sink.attach_media_source(EngineKind::Flv, url);
        // The FLV player reports state through its own callbacks,
        // starting from paused.
        play_state.set_playing(false);
        sink.set_play_state_listener(play_state);
        self.attached = true;

        Ok(())
    }

    fn destroy(&mut self, sink: &dyn MediaSink) {
        if !self.attached {
            return;
        }
        self.attached = false;

        sink.clear_play_state_listener();
        sink.detach_media_source(EngineKind::Flv);
    }
}

/// Native playback, assigning the source to the sink directly.
#[derive(Debug, Default)]
pub struct NativeEngine {
    attached: bool,
}

impl NativeEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for NativeEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Native
    }

    fn attach(
        &mut self,
        sink: &dyn MediaSink,
        url: &str,
        play_state: PlayStateListener,
    ) -> Result<(), AttachError> {
        if self.attached {
            return Err(AttachError::AlreadyAttached);
        }

        sink.set_source(url);
        sink.set_play_state_listener(play_state);
        self.attached = true;

        Ok(())
    }

    fn destroy(&mut self, sink: &dyn MediaSink) {
        if !self.attached {
            return;
        }
        self.attached = false;

        sink.clear_play_state_listener();
        sink.clear_source();
    }
}
