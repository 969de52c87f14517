//! Adaptive playback engine selection and lifecycle management.
//!
//! A live stream URL is classified by container format ([`classify`]),
//! then a [`Player`] resolves one playback engine against the runtime
//! capabilities of its [`MediaSink`] and attaches it.
//! Engines are loaded through an asynchronous [`EngineFactory`];
//! the previous engine is always destroyed before the replacement
//! attaches,
//! and a selection overtaken by a newer one is discarded instead of
//! attached stale.

mod engine;
mod player;
mod sink;
#[cfg(test)]
pub(crate) mod test_util;

pub use self::engine::AttachError;
pub use self::engine::BoxEngineFuture;
pub use self::engine::DashEngine;
pub use self::engine::DefaultEngineFactory;
pub use self::engine::Engine;
pub use self::engine::EngineFactory;
pub use self::engine::EngineKind;
pub use self::engine::FlvEngine;
pub use self::engine::HlsEngine;
pub use self::engine::LoadEngineError;
pub use self::engine::MpegtsEngine;
pub use self::engine::NativeEngine;
pub use self::player::Player;
pub use self::player::SelectError;
pub use self::player::Selection;
pub use self::sink::MediaSink;
pub use self::sink::PlayRequestError;
pub use self::sink::PlayStateListener;
pub use self::sink::SinkCapabilities;
use url::Url;

/// The stream container families a URL can classify as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamKind {
    /// An HLS playlist (`.m3u8`)
    Hls,

    /// A DASH manifest (`.mpd`)
    Dash,

    /// An FLV stream (`.flv`)
    Flv,

    /// A plain MP4 file (`.mp4`)
    Mp4,

    /// A raw MPEG-TS stream (`.ts`)
    Ts,

    /// Anything else, malformed URLs included
    Unknown,
}

impl StreamKind {
    /// The name of this stream kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hls => "hls",
            Self::Dash => "dash",
            Self::Flv => "flv",
            Self::Mp4 => "mp4",
            Self::Ts => "ts",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a stream URL by the file extension of its path.
///
/// The extension match is case-insensitive and ignores query strings and
/// fragments.
/// This is total:
/// a URL that cannot be parsed classifies as [`StreamKind::Unknown`].
pub fn classify(url: &str) -> StreamKind {
    let url = match Url::parse(url) {
        Ok(url) => url,
        Err(_) => return StreamKind::Unknown,
    };

    let path = url.path().to_lowercase();
    if path.ends_with(".m3u8") {
        StreamKind::Hls
    } else if path.ends_with(".mpd") {
        StreamKind::Dash
    } else if path.ends_with(".flv") {
        StreamKind::Flv
    } else if path.ends_with(".mp4") {
        StreamKind::Mp4
    } else if path.ends_with(".ts") {
        StreamKind::Ts
    } else {
        StreamKind::Unknown
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classify_by_extension() {
        assert!(classify("http://example.com/live/index.m3u8") == StreamKind::Hls);
        assert!(classify("http://example.com/live/manifest.mpd") == StreamKind::Dash);
        assert!(classify("http://example.com/live/stream.flv") == StreamKind::Flv);
        assert!(classify("http://example.com/vod/movie.mp4") == StreamKind::Mp4);
        assert!(classify("http://example.com/live/channel.ts") == StreamKind::Ts);
    }

    #[test]
    fn classify_is_case_insensitive() {
        assert!(classify("http://example.com/LIVE/INDEX.M3U8") == StreamKind::Hls);
        assert!(classify("http://example.com/Movie.Mp4") == StreamKind::Mp4);
    }

    #[test]
    fn classify_ignores_query_and_fragment() {
        assert!(classify("http://example.com/live.m3u8?token=abc&expires=1") == StreamKind::Hls);
        assert!(classify("http://example.com/live.ts#segment") == StreamKind::Ts);
        // An extension hiding in the query string does not count.
        assert!(classify("http://example.com/play?file=live.m3u8") == StreamKind::Unknown);
    }

    #[test]
    fn classify_unknown_inputs() {
        assert!(classify("") == StreamKind::Unknown);
        assert!(classify("not a url") == StreamKind::Unknown);
        assert!(classify("/relative/path.m3u8") == StreamKind::Unknown);
        assert!(classify("http://example.com/live") == StreamKind::Unknown);
        assert!(classify("http://example.com/archive.tar.gz") == StreamKind::Unknown);
        assert!(classify("rtmp://example.com/live/stream") == StreamKind::Unknown);
    }
}
