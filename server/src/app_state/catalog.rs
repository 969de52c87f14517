use m3u_parser::Channel;
use std::sync::Arc;

/// The in-memory channel catalog for the currently loaded playlist.
#[derive(Debug, Default)]
pub struct Catalog {
    state: std::sync::Mutex<CatalogState>,
}

#[derive(Debug, Default)]
struct CatalogState {
    playlist_name: Option<String>,
    channels: Arc<[Channel]>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the catalog contents with a freshly parsed playlist.
    pub fn replace(&self, playlist_name: &str, channels: Vec<Channel>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.playlist_name = Some(playlist_name.to_string());
        state.channels = channels.into();
    }

    /// The name of the loaded playlist, if any.
    pub fn playlist_name(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .playlist_name
            .clone()
    }

    /// All channels, in playlist order.
    pub fn channels(&self) -> Arc<[Channel]> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .channels
            .clone()
    }

    /// Channels whose title or URL contains the query, case-insensitively.
    ///
    /// A blank query matches everything.
    pub fn search(&self, query: &str) -> Vec<Channel> {
        let channels = self.channels();

        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return channels.to_vec();
        }

        channels
            .iter()
            .filter(|channel| {
                channel.title.to_lowercase().contains(&query)
                    || channel.url.to_lowercase().contains(&query)
            })
            .cloned()
            .collect()
    }

    /// The sorted, deduplicated group labels of the loaded channels.
    pub fn groups(&self) -> Vec<String> {
        let channels = self.channels();

        let mut groups: Vec<String> = channels
            .iter()
            .map(|channel| channel.group.clone())
            .collect();
        groups.sort();
        groups.dedup();
        groups
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn channel(title: &str, url: &str, group: &str) -> Channel {
        Channel {
            id: format!("{title}-0"),
            title: title.to_string(),
            url: url.to_string(),
            logo: String::new(),
            group: group.to_string(),
            meta: String::new(),
        }
    }

    fn catalog() -> Catalog {
        let catalog = Catalog::new();
        catalog.replace(
            "Test",
            vec![
                channel("BBC One", "http://example.com/bbc1.m3u8", "News"),
                channel("Rock FM", "http://example.com/rock.ts", "Music"),
                channel("BBC Two", "http://example.com/bbc2.m3u8", "News"),
            ],
        );
        catalog
    }

    #[test]
    fn search_matches_title_case_insensitively() {
        let catalog = catalog();
        let results = catalog.search("bbc");
        assert!(results.len() == 2);
        assert!(results[0].title == "BBC One");
        assert!(results[1].title == "BBC Two");
    }

    #[test]
    fn search_matches_url() {
        let catalog = catalog();
        let results = catalog.search("rock.ts");
        assert!(results.len() == 1);
        assert!(results[0].title == "Rock FM");
    }

    #[test]
    fn blank_search_matches_everything() {
        let catalog = catalog();
        assert!(catalog.search("").len() == 3);
        assert!(catalog.search("   ").len() == 3);
    }

    #[test]
    fn groups_are_sorted_and_deduplicated() {
        let catalog = catalog();
        assert!(catalog.groups() == ["Music", "News"]);
    }

    #[test]
    fn replace_swaps_the_playlist() {
        let catalog = catalog();
        catalog.replace("Empty", Vec::new());
        assert!(catalog.playlist_name().as_deref() == Some("Empty"));
        assert!(catalog.channels().is_empty());
    }
}
