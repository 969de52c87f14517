use crate::engine::AttachError;
use crate::engine::BoxEngineFuture;
use crate::engine::Engine;
use crate::engine::EngineFactory;
use crate::engine::EngineKind;
use crate::sink::MediaSink;
use crate::sink::PlayRequestError;
use crate::sink::PlayStateListener;
use crate::sink::SinkCapabilities;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use tokio::sync::Notify;

/// A sink operation observed by a mock sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SinkOp {
    SetSource(String),
    ClearSource,
    AttachMediaSource(EngineKind, String),
    DetachMediaSource(EngineKind),
    Play,
    Pause,
}

/// A media sink that records everything done to it.
#[derive(Debug, Default)]
pub(crate) struct MockSink {
    capabilities: SinkCapabilities,
    reject_play: bool,
    ops: Mutex<Vec<SinkOp>>,
    listener: Mutex<Option<PlayStateListener>>,
}

impl MockSink {
    pub(crate) fn with_capabilities(capabilities: SinkCapabilities) -> Self {
        Self {
            capabilities,
            ..Default::default()
        }
    }

    /// A sink that supports every engine.
    pub(crate) fn everything() -> Self {
        Self::with_capabilities(SinkCapabilities {
            media_source: true,
            live_ts: true,
            native_hls: true,
            flv: true,
        })
    }

    /// A sink that supports nothing beyond native playback.
    pub(crate) fn nothing() -> Self {
        Self::with_capabilities(SinkCapabilities::default())
    }

    /// Reject playback requests, like a browser blocking autoplay.
    pub(crate) fn reject_play(mut self) -> Self {
        self.reject_play = true;
        self
    }

    pub(crate) fn ops(&self) -> Vec<SinkOp> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, op: SinkOp) {
        self.ops.lock().unwrap().push(op);
    }

    /// Fire the sink's native play state event at the wired listener.
    ///
    /// Returns `None` when no engine has wired one.
    pub(crate) fn emit_play_state(&self, playing: bool) -> Option<()> {
        let listener = self.listener.lock().unwrap();
        listener.as_ref()?.set_playing(playing);
        Some(())
    }
}

impl MediaSink for MockSink {
    fn capabilities(&self) -> SinkCapabilities {
        self.capabilities
    }

    fn set_source(&self, url: &str) {
        self.record(SinkOp::SetSource(url.to_string()));
    }

    fn clear_source(&self) {
        self.record(SinkOp::ClearSource);
    }

    fn attach_media_source(&self, engine: EngineKind, url: &str) {
        self.record(SinkOp::AttachMediaSource(engine, url.to_string()));
    }

    fn detach_media_source(&self, engine: EngineKind) {
        self.record(SinkOp::DetachMediaSource(engine));
    }

    fn set_play_state_listener(&self, listener: PlayStateListener) {
        *self.listener.lock().unwrap() = Some(listener);
    }

    fn clear_play_state_listener(&self) {
        *self.listener.lock().unwrap() = None;
    }

    fn request_play(&self) -> Result<(), PlayRequestError> {
        if self.reject_play {
            return Err(PlayRequestError::Blocked);
        }
        self.record(SinkOp::Play);
        Ok(())
    }

    fn request_pause(&self) {
        self.record(SinkOp::Pause);
    }
}

/// Observations of one probe engine's lifecycle.
#[derive(Debug, Default)]
pub(crate) struct EngineProbe {
    destroys: AtomicUsize,
    attached_urls: Mutex<Vec<String>>,
}

impl EngineProbe {
    pub(crate) fn destroy_count(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }

    pub(crate) fn attached_urls(&self) -> Vec<String> {
        self.attached_urls.lock().unwrap().clone()
    }
}

/// An engine that reports its lifecycle to a probe.
///
/// Attach insists on media source support so tests can trigger attach
/// failures by rescinding the capability.
#[derive(Debug)]
struct ProbeEngine {
    kind: EngineKind,
    probe: Arc<EngineProbe>,
}

impl Engine for ProbeEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn attach(
        &mut self,
        sink: &dyn MediaSink,
        url: &str,
        play_state: PlayStateListener,
    ) -> Result<(), AttachError> {
        if !sink.capabilities().media_source {
            return Err(AttachError::Unsupported { engine: self.kind });
        }

        self.probe.attached_urls.lock().unwrap().push(url.to_string());
        sink.set_play_state_listener(play_state);
        Ok(())
    }

    fn destroy(&mut self, sink: &dyn MediaSink) {
        self.probe.destroys.fetch_add(1, Ordering::SeqCst);
        sink.clear_play_state_listener();
    }
}

/// A factory producing probe engines, one probe per load.
#[derive(Debug, Default)]
pub(crate) struct ProbeFactory {
    probes: Mutex<Vec<Arc<EngineProbe>>>,
}

impl ProbeFactory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn probes(&self) -> Vec<Arc<EngineProbe>> {
        self.probes.lock().unwrap().clone()
    }

    fn create(&self, kind: EngineKind) -> Box<dyn Engine> {
        let probe = Arc::new(EngineProbe::default());
        self.probes.lock().unwrap().push(probe.clone());
        Box::new(ProbeEngine { kind, probe })
    }
}

impl EngineFactory for ProbeFactory {
    fn load(&self, kind: EngineKind) -> BoxEngineFuture<'_> {
        Box::pin(async move { Ok(self.create(kind)) })
    }
}

/// A probe factory whose first load parks until the gate opens.
///
/// Models a slow engine module load racing a fast channel switch.
#[derive(Debug, Default)]
pub(crate) struct GatedFactory {
    inner: ProbeFactory,
    gated: AtomicBool,
    gate: Notify,
}

impl GatedFactory {
    pub(crate) fn new() -> Self {
        Self {
            inner: ProbeFactory::new(),
            gated: AtomicBool::new(true),
            gate: Notify::new(),
        }
    }

    pub(crate) fn probes(&self) -> Vec<Arc<EngineProbe>> {
        self.inner.probes()
    }

    pub(crate) fn open_gate(&self) {
        self.gate.notify_one();
    }
}

impl EngineFactory for GatedFactory {
    fn load(&self, kind: EngineKind) -> BoxEngineFuture<'_> {
        Box::pin(async move {
            let engine = self.inner.create(kind);
            if self.gated.swap(false, Ordering::SeqCst) {
                self.gate.notified().await;
            }
            Ok(engine)
        })
    }
}
