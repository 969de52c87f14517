use anyhow::Context;
use m3u_parser::Channel;
use std::path::Path;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::warn;

const FAVORITES_FILE_NAME: &str = "favorites.json";

/// The persisted favorites set, keyed by channel URL.
///
/// Favorites survive playlist reloads because the key is the URL,
/// not the parse-local channel id.
/// Every mutation is persisted immediately.
#[derive(Debug)]
pub struct FavoritesStore {
    path: PathBuf,
    channels: Mutex<Vec<Channel>>,
}

impl FavoritesStore {
    /// Open the store inside a data directory.
    ///
    /// A missing favorites file yields an empty set,
    /// as does a corrupt or unreadable one.
    pub async fn load<P>(data_directory: P) -> Self
    where
        P: AsRef<Path>,
    {
        let path = data_directory.as_ref().join(FAVORITES_FILE_NAME);
        let channels = match tokio::fs::read_to_string(&path).await {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(channels) => channels,
                Err(error) => {
                    warn!(
                        "ignoring corrupt favorites file \"{}\": {error}",
                        path.display()
                    );
                    Vec::new()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(error) => {
                warn!("failed to read favorites file \"{}\": {error}", path.display());
                Vec::new()
            }
        };

        Self {
            path,
            channels: Mutex::new(channels),
        }
    }

    /// All favorites, in insertion order.
    pub async fn all(&self) -> Vec<Channel> {
        self.channels.lock().await.clone()
    }

    /// Toggle a channel and persist the result.
    ///
    /// Returns the updated favorites list.
    pub async fn toggle(&self, channel: Channel) -> anyhow::Result<Vec<Channel>> {
        let mut channels = self.channels.lock().await;
        toggle_channel(&mut channels, channel);

        let data =
            serde_json::to_string_pretty(&*channels).context("failed to serialize favorites")?;
        tokio::fs::write(&self.path, data).await.with_context(|| {
            format!("failed to write favorites file \"{}\"", self.path.display())
        })?;

        Ok(channels.clone())
    }
}

/// Symmetric toggle keyed by URL: present is removed, absent is appended.
fn toggle_channel(channels: &mut Vec<Channel>, channel: Channel) {
    let len_before = channels.len();
    channels.retain(|existing| existing.url != channel.url);
    if channels.len() == len_before {
        channels.push(channel);
    }
}
