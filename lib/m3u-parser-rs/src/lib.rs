//! A tolerant parser for M3U/EXTM3U channel playlists.
//!
//! IPTV playlists pair a `#EXTINF` directive line,
//! carrying the display title and optional `key="value"` attributes,
//! with the channel URL on the following line.
//! Real-world lists are messy,
//! so anything malformed is dropped instead of failing the parse:
//! a directive with no URL and a URL with no directive both yield nothing.

mod directive;

pub(crate) use self::directive::Directive;

/// The channel directive prefix
const EXTINF_DIRECTIVE: &str = "#EXTINF";

/// The logo url attribute
const TVG_LOGO_ATTRIBUTE: &str = "tvg-logo";

/// The group label attribute
const GROUP_TITLE_ATTRIBUTE: &str = "group-title";

/// The explicit identifier attribute
const TVG_ID_ATTRIBUTE: &str = "tvg-id";

/// Title used when a directive carries none
const DEFAULT_TITLE: &str = "Untitled";

/// Group label used when a directive carries none
const DEFAULT_GROUP: &str = "Other";

/// A channel entry parsed from a playlist.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Channel {
    /// An identifier for list rendering.
    ///
    /// This is the `tvg-id` attribute when present,
    /// else it is synthesized from the title and the entry's position.
    /// It is only unique within a single parsed playlist.
    pub id: String,

    /// The display name
    pub title: String,

    /// The playback URL
    pub url: String,

    /// The `tvg-logo` attribute, or an empty string
    pub logo: String,

    /// The `group-title` attribute, or a default label
    pub group: String,

    /// The raw directive line, retained for debugging and display
    pub meta: String,
}

/// A parsed channel playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    /// The channels, in source order
    pub channels: Vec<Channel>,
}

impl Playlist {
    /// Parse a playlist from raw text.
    ///
    /// This is a pure function of its input and cannot fail.
    /// Lines are trimmed;
    /// blank lines are ignored everywhere,
    /// as are comment lines that are not channel directives,
    /// `#EXTM3U` included.
    /// Any non-blank, non-comment line following a directive is accepted
    /// as that directive's URL without further validation.
    pub fn parse(input: &str) -> Self {
        let mut channels = Vec::new();
        let mut pending: Option<Directive> = None;

        for line in input.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with(EXTINF_DIRECTIVE) {
                // A new directive replaces an unconsumed one.
                pending = Some(Directive::parse(line));
            } else if line.starts_with('#') {
                continue;
            } else if let Some(directive) = pending.take() {
                let index = channels.len();
                channels.push(directive.into_channel(line, index));
            }
        }

        Self { channels }
    }

    /// Returns true if this playlist has no channels.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// The number of channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

impl std::str::FromStr for Playlist {
    type Err = std::convert::Infallible;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(input))
    }
}
