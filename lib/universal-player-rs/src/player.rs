use crate::classify;
use crate::engine::AttachError;
use crate::engine::Engine;
use crate::engine::EngineFactory;
use crate::engine::EngineKind;
use crate::engine::LoadEngineError;
use crate::sink::MediaSink;
use crate::sink::PlayStateListener;
use crate::StreamKind;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;
use tracing::warn;

/// The outcome of selecting a stream for playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Selection {
    /// An engine was attached and owns the sink.
    Attached {
        /// The attached engine kind
        engine: EngineKind,
    },

    /// No engine in this runtime supports the stream.
    Unsupported {
        /// The classified stream kind
        stream: StreamKind,
    },

    /// A newer selection or a stop took over before this one attached.
    Superseded,
}

/// An error that may occur while selecting a stream.
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    /// An engine module failed to load
    #[error(transparent)]
    Load {
        #[from]
        error: LoadEngineError,
    },

    /// The engine failed to attach to the sink
    #[error("failed to attach the \"{engine}\" engine")]
    Attach {
        /// The engine kind that failed
        engine: EngineKind,

        /// The inner error
        #[source]
        error: AttachError,
    },
}

/// The playback lifecycle manager for one media sink.
///
/// The player owns its sink exclusively and holds at most one attached
/// engine at a time.
/// Selecting a new stream always destroys the previous engine before the
/// replacement attaches,
/// and a selection overtaken by a newer one is discarded rather than
/// attached stale.
pub struct Player<S> {
    sink: S,
    factory: Arc<dyn EngineFactory>,
    attached: tokio::sync::Mutex<Option<Box<dyn Engine>>>,

    /// Bumped by every select and stop.
    ///
    /// A selection may only touch the sink while it still matches.
    generation: AtomicU64,

    play_state: Arc<watch::Sender<bool>>,
    autoplay: bool,
}

impl<S> Player<S>
where
    S: MediaSink,
{
    /// Create a player around a sink.
    pub fn new(sink: S, factory: Arc<dyn EngineFactory>, autoplay: bool) -> Self {
        let (play_state, _) = watch::channel(false);

        Self {
            sink,
            factory,
            attached: tokio::sync::Mutex::new(None),
            generation: AtomicU64::new(0),
            play_state: Arc::new(play_state),
            autoplay,
        }
    }

    /// The sink this player drives.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Subscribe to the normalized play state.
    pub fn play_state(&self) -> watch::Receiver<bool> {
        self.play_state.subscribe()
    }

    /// The kind of the currently attached engine, if any.
    pub async fn engine_kind(&self) -> Option<EngineKind> {
        self.attached.lock().await.as_ref().map(|engine| engine.kind())
    }

    /// Select a stream URL for playback.
    ///
    /// Classifies the URL,
    /// resolves an engine against the sink's capabilities,
    /// destroys the previous engine and attaches the new one.
    /// After a successful attach a best-effort playback request is made;
    /// sinks routinely reject unsolicited playback and that is not an
    /// error.
    pub async fn select(&self, url: &str) -> Result<Selection, SelectError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut attached = self.attached.lock().await;
            if self.generation.load(Ordering::SeqCst) != generation {
                return Ok(Selection::Superseded);
            }
            destroy_engine(&mut attached, &self.sink);
        }

        let stream = classify(url);
        let engine = match self.resolve(stream).await? {
            Some(engine) => engine,
            None => {
                warn!("no engine in this runtime supports \"{url}\" ({stream})");
                return Ok(Selection::Unsupported { stream });
            }
        };

        let mut attached = self.attached.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            // Overtaken while the engine module was loading.
            let mut engine = engine;
            engine.destroy(&self.sink);
            debug!("discarding stale \"{}\" engine for \"{url}\"", engine.kind());
            return Ok(Selection::Superseded);
        }

        let mut engine = engine;
        let kind = engine.kind();
        let listener = PlayStateListener::new(self.play_state.clone());
        if let Err(error) = engine.attach(&self.sink, url, listener) {
            engine.destroy(&self.sink);
            return Err(SelectError::Attach { engine: kind, error });
        }
        *attached = Some(engine);
        drop(attached);

        debug!("attached \"{kind}\" engine for \"{url}\"");

        if self.autoplay {
            if let Err(error) = self.sink.request_play() {
                debug!("autoplay did not start: {error}");
            }
        }

        Ok(Selection::Attached { engine: kind })
    }

    /// Stop playback and release the attached engine.
    ///
    /// Also cancels interest in any selection still resolving its engine.
    pub async fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let mut attached = self.attached.lock().await;
        destroy_engine(&mut attached, &self.sink);
        drop(attached);

        self.play_state.send_replace(false);
    }

    /// Resolve an engine for a stream kind against the sink's capabilities.
    ///
    /// Returns `None` when no engine in this runtime supports the stream.
    async fn resolve(&self, stream: StreamKind) -> Result<Option<Box<dyn Engine>>, LoadEngineError> {
        let capabilities = self.sink.capabilities();
        let kind = match stream {
            StreamKind::Ts if capabilities.live_ts => EngineKind::Mpegts,
            StreamKind::Hls | StreamKind::Ts | StreamKind::Unknown => {
                if capabilities.media_source {
                    EngineKind::Hls
                } else if capabilities.native_hls {
                    EngineKind::Native
                } else {
                    // The stream may be mislabeled; DASH is the last resort.
                    EngineKind::Dash
                }
            }
            StreamKind::Dash => EngineKind::Dash,
            StreamKind::Flv => {
                if !capabilities.flv {
                    return Ok(None);
                }
                EngineKind::Flv
            }
            StreamKind::Mp4 => EngineKind::Native,
        };

        self.factory.load(kind).await.map(Some)
    }
}

impl<S> std::fmt::Debug for Player<S>
where
    S: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("sink", &self.sink)
            .field("generation", &self.generation)
            .field("autoplay", &self.autoplay)
            .finish()
    }
}

/// Destroy the attached engine, if any.
///
/// Destruction cannot fail and must never block teardown.
fn destroy_engine(attached: &mut Option<Box<dyn Engine>>, sink: &dyn MediaSink) {
    if let Some(mut engine) = attached.take() {
        let kind = engine.kind();
        engine.destroy(sink);
        debug!("destroyed \"{kind}\" engine");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::DefaultEngineFactory;
    use crate::test_util::GatedFactory;
    use crate::test_util::MockSink;
    use crate::test_util::ProbeFactory;
    use crate::test_util::SinkOp;

    fn player_with_probes(capabilities: crate::SinkCapabilities) -> (Arc<Player<MockSink>>, Arc<ProbeFactory>) {
        let factory = Arc::new(ProbeFactory::new());
        let player = Arc::new(Player::new(
            MockSink::with_capabilities(capabilities),
            factory.clone(),
            true,
        ));
        (player, factory)
    }

    fn default_player(capabilities: crate::SinkCapabilities) -> Player<MockSink> {
        Player::new(
            MockSink::with_capabilities(capabilities),
            Arc::new(DefaultEngineFactory::new()),
            true,
        )
    }

    #[tokio::test]
    async fn switching_destroys_the_previous_engine() {
        let (player, factory) = player_with_probes(crate::SinkCapabilities {
            media_source: true,
            live_ts: true,
            native_hls: false,
            flv: true,
        });

        let selection = player
            .select("http://example.com/a.m3u8")
            .await
            .expect("failed to select a");
        assert!(matches!(
            selection,
            Selection::Attached {
                engine: EngineKind::Hls
            }
        ));

        let selection = player
            .select("http://example.com/b.mpd")
            .await
            .expect("failed to select b");
        assert!(matches!(
            selection,
            Selection::Attached {
                engine: EngineKind::Dash
            }
        ));

        let probes = factory.probes();
        assert!(probes.len() == 2);
        assert!(probes[0].destroy_count() == 1);
        assert!(probes[1].destroy_count() == 0);
        assert!(player.engine_kind().await == Some(EngineKind::Dash));
    }

    #[tokio::test]
    async fn stale_engine_is_never_attached() {
        let factory = Arc::new(GatedFactory::new());
        let player = Arc::new(Player::new(
            MockSink::with_capabilities(crate::SinkCapabilities {
                media_source: true,
                ..Default::default()
            }),
            factory.clone(),
            true,
        ));

        // Slow path: the first engine module load stalls at the gate.
        let slow_player = player.clone();
        let slow = tokio::spawn(async move { slow_player.select("http://example.com/slow.m3u8").await });

        // Wait until the slow selection has created its engine and is
        // parked at the gate.
        while factory.probes().len() < 1 {
            tokio::task::yield_now().await;
        }

        // Fast path: a second selection wins the sink.
        let selection = player
            .select("http://example.com/fast.m3u8")
            .await
            .expect("failed to select fast");
        assert!(matches!(
            selection,
            Selection::Attached {
                engine: EngineKind::Hls
            }
        ));

        factory.open_gate();
        let selection = slow
            .await
            .expect("slow select panicked")
            .expect("slow select failed");
        assert!(matches!(selection, Selection::Superseded));

        let probes = factory.probes();
        assert!(probes.len() == 2);
        // The stale engine was destroyed without ever touching the sink.
        assert!(probes[0].destroy_count() == 1);
        assert!(probes[0].attached_urls().is_empty());
        assert!(probes[1].attached_urls() == ["http://example.com/fast.m3u8"]);
        assert!(player.engine_kind().await == Some(EngineKind::Hls));
    }

    #[tokio::test]
    async fn unsupported_flv_attaches_nothing() {
        let player = default_player(crate::SinkCapabilities {
            media_source: true,
            flv: false,
            ..Default::default()
        });

        let selection = player
            .select("http://example.com/live.flv")
            .await
            .expect("select failed");
        assert!(matches!(
            selection,
            Selection::Unsupported {
                stream: StreamKind::Flv
            }
        ));
        assert!(player.engine_kind().await.is_none());
        assert!(player.sink().ops().is_empty());
    }

    #[tokio::test]
    async fn selection_policy_follows_capabilities() {
        // Media source demuxing available: HLS engine.
        let player = default_player(crate::SinkCapabilities {
            media_source: true,
            ..Default::default()
        });
        player.select("http://example.com/live.m3u8").await.expect("select failed");
        assert!(player.engine_kind().await == Some(EngineKind::Hls));

        // No demuxing, but native HLS decoding: native playback.
        let player = default_player(crate::SinkCapabilities {
            native_hls: true,
            ..Default::default()
        });
        player.select("http://example.com/live.m3u8").await.expect("select failed");
        assert!(player.engine_kind().await == Some(EngineKind::Native));

        // Neither: DASH as the last resort for a mislabeled stream.
        let player = default_player(crate::SinkCapabilities::default());
        player.select("http://example.com/live.m3u8").await.expect("select failed");
        assert!(player.engine_kind().await == Some(EngineKind::Dash));

        // Live TS demuxing preferred for raw MPEG-TS streams.
        let player = default_player(crate::SinkCapabilities {
            media_source: true,
            live_ts: true,
            ..Default::default()
        });
        player.select("http://example.com/live.ts").await.expect("select failed");
        assert!(player.engine_kind().await == Some(EngineKind::Mpegts));

        // Without it, raw TS rides the adaptive ladder.
        let player = default_player(crate::SinkCapabilities {
            media_source: true,
            ..Default::default()
        });
        player.select("http://example.com/live.ts").await.expect("select failed");
        assert!(player.engine_kind().await == Some(EngineKind::Hls));

        // DASH manifests attach the DASH engine unconditionally.
        let player = default_player(crate::SinkCapabilities::default());
        player.select("http://example.com/live.mpd").await.expect("select failed");
        assert!(player.engine_kind().await == Some(EngineKind::Dash));

        // Plain MP4 plays natively.
        let player = default_player(crate::SinkCapabilities::default());
        player.select("http://example.com/movie.mp4").await.expect("select failed");
        assert!(player.engine_kind().await == Some(EngineKind::Native));
    }

    #[tokio::test]
    async fn rejected_autoplay_is_not_fatal() {
        let sink = MockSink::with_capabilities(crate::SinkCapabilities {
            media_source: true,
            ..Default::default()
        })
        .reject_play();
        let player = Player::new(sink, Arc::new(DefaultEngineFactory::new()), true);

        let selection = player
            .select("http://example.com/live.m3u8")
            .await
            .expect("select failed");
        assert!(matches!(
            selection,
            Selection::Attached {
                engine: EngineKind::Hls
            }
        ));
        assert!(player.engine_kind().await == Some(EngineKind::Hls));
    }

    #[tokio::test]
    async fn stop_releases_the_engine_and_resets_play_state() {
        let (player, factory) = player_with_probes(crate::SinkCapabilities {
            media_source: true,
            ..Default::default()
        });
        let mut play_state = player.play_state();

        player
            .select("http://example.com/live.m3u8")
            .await
            .expect("select failed");

        // The attached engine wired the sink's play events.
        player
            .sink()
            .emit_play_state(true)
            .expect("listener should be wired");
        play_state.changed().await.expect("play state closed");
        assert!(*play_state.borrow_and_update());

        player.stop().await;
        assert!(player.engine_kind().await.is_none());
        assert!(!*play_state.borrow_and_update());
        assert!(factory.probes()[0].destroy_count() == 1);
    }

    #[tokio::test]
    async fn play_state_is_normalized_across_engines() {
        let player = default_player(crate::SinkCapabilities {
            media_source: true,
            ..Default::default()
        });
        let mut play_state = player.play_state();

        player
            .select("http://example.com/live.m3u8")
            .await
            .expect("select failed");
        player
            .sink()
            .emit_play_state(true)
            .expect("listener should be wired");
        play_state.changed().await.expect("play state closed");
        assert!(*play_state.borrow_and_update());

        // Switch to a different engine variant; the signal stays wired.
        player
            .select("http://example.com/live.mpd")
            .await
            .expect("select failed");
        player
            .sink()
            .emit_play_state(true)
            .expect("listener should be wired");
        player
            .sink()
            .emit_play_state(false)
            .expect("listener should be wired");
        assert!(!*play_state.borrow_and_update());
    }

    #[tokio::test]
    async fn attach_failure_releases_the_engine() {
        // The handshake reported media source support, but the sink
        // rescinded it before attach.
        let (player, factory) = player_with_probes(crate::SinkCapabilities::default());

        let result = player.select("http://example.com/live.mpd").await;
        // The probe engine insists on media source support at attach time.
        assert!(result.is_err());
        assert!(player.engine_kind().await.is_none());
        assert!(factory.probes()[0].destroy_count() == 1);
    }
}
