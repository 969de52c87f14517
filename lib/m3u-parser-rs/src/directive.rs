use crate::Channel;
use crate::DEFAULT_GROUP;
use crate::DEFAULT_TITLE;
use crate::GROUP_TITLE_ATTRIBUTE;
use crate::TVG_ID_ATTRIBUTE;
use crate::TVG_LOGO_ATTRIBUTE;

/// A parsed `#EXTINF` directive line.
///
/// Attribute lookups are independent of each other;
/// a missing or malformed attribute never invalidates the directive.
#[derive(Debug)]
pub(crate) struct Directive {
    /// The display title
    title: String,

    /// The `tvg-logo` attribute, or an empty string
    logo: String,

    /// The `group-title` attribute, or the default group label
    group: String,

    /// The `tvg-id` attribute, or an empty string
    tvg_id: String,

    /// The raw directive line
    raw: String,
}

impl Directive {
    /// Parse a directive from its raw line.
    ///
    /// The display title is the substring after the last comma.
    /// A directive with no comma, or nothing after it, gets a placeholder title.
    pub(crate) fn parse(line: &str) -> Self {
        let title = line
            .rfind(',')
            .map(|index| line[index + 1..].trim())
            .filter(|title| !title.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string();

        let logo = extract_attribute(line, TVG_LOGO_ATTRIBUTE)
            .unwrap_or("")
            .to_string();
        let group = extract_attribute(line, GROUP_TITLE_ATTRIBUTE)
            .filter(|group| !group.is_empty())
            .unwrap_or(DEFAULT_GROUP)
            .to_string();
        let tvg_id = extract_attribute(line, TVG_ID_ATTRIBUTE)
            .unwrap_or("")
            .to_string();

        Self {
            title,
            logo,
            group,
            tvg_id,
            raw: line.to_string(),
        }
    }

    /// Combine this directive with its URL line into a channel.
    ///
    /// `index` is the position of the new channel within the playlist,
    /// used to synthesize an identifier when the directive carries none.
    pub(crate) fn into_channel(self, url: &str, index: usize) -> Channel {
        let Self {
            title,
            logo,
            group,
            tvg_id,
            raw,
        } = self;

        let id = if tvg_id.is_empty() {
            format!("{title}-{index}")
        } else {
            tvg_id
        };

        Channel {
            id,
            title,
            url: url.to_string(),
            logo,
            group,
            meta: raw,
        }
    }
}

/// Look up a `name="value"` attribute on a directive line.
fn extract_attribute<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!("{name}=\"");
    let start = line.find(&pattern)? + pattern.len();
    let end = line[start..].find('"')?;
    Some(&line[start..start + end])
}
