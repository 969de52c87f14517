mod catalog;
mod favorites;
mod player;

pub use self::catalog::Catalog;
pub use self::favorites::FavoritesStore;
pub use self::player::PlayerSession;
pub use self::player::PlayerView;
pub use self::player::RemoteSink;
pub use self::player::SinkDirective;
use crate::config::ConfigPlaylist;
use crate::util::LockFile;
use crate::Config;
use anyhow::Context;
use tracing::error;
use tracing::info;

pub struct AppState {
    lock_file: LockFile,
    client: reqwest::Client,
    playlists: Vec<ConfigPlaylist>,

    pub catalog: Catalog,
    pub favorites: FavoritesStore,
    pub player: PlayerSession,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let data_directory = config.data_directory.as_path();
        match tokio::fs::create_dir(data_directory).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "failed to create data directory \"{}\"",
                        data_directory.display()
                    )
                });
            }
        }

        let lock_file_path = data_directory.join("telly.lock");
        let lock_file = LockFile::acquire(lock_file_path)
            .await
            .context("another process is using the data directory")?;

        let favorites = FavoritesStore::load(data_directory).await;

        Ok(Self {
            lock_file,
            client: reqwest::Client::new(),
            playlists: config.playlists.clone(),
            catalog: Catalog::new(),
            favorites,
            player: PlayerSession::new(config.autoplay),
        })
    }

    /// The configured preset playlists.
    pub fn playlists(&self) -> &[ConfigPlaylist] {
        &self.playlists
    }

    /// Load a preset playlist into the catalog.
    ///
    /// Returns the number of channels,
    /// or `None` when no preset has that name.
    /// Fetch and read failures degrade to an empty playlist;
    /// they never surface past this point.
    pub async fn load_playlist(&self, name: &str) -> Option<usize> {
        let preset = self
            .playlists
            .iter()
            .find(|playlist| playlist.name == name)?;

        let text = match self.playlist_text(preset).await {
            Ok(text) => text,
            Err(error) => {
                error!("failed to load playlist \"{name}\": {error:?}");
                String::new()
            }
        };

        let playlist = m3u_parser::Playlist::parse(&text);
        info!("loaded playlist \"{name}\" with {} channels", playlist.len());

        let len = playlist.len();
        self.catalog.replace(name, playlist.channels);
        Some(len)
    }

    async fn playlist_text(&self, preset: &ConfigPlaylist) -> anyhow::Result<String> {
        if let Some(url) = preset.url.as_ref() {
            let response = self
                .client
                .get(url.as_str())
                .send()
                .await
                .with_context(|| format!("failed to fetch playlist from \"{url}\""))?
                .error_for_status()
                .with_context(|| format!("bad response for playlist at \"{url}\""))?;
            response
                .text()
                .await
                .with_context(|| format!("failed to read playlist body from \"{url}\""))
        } else if let Some(path) = preset.path.as_ref() {
            tokio::fs::read_to_string(path).await.with_context(|| {
                format!("failed to read playlist file \"{}\"", path.display())
            })
        } else {
            // Rejected at config load.
            anyhow::bail!("playlist \"{}\" has no source", preset.name);
        }
    }

    /// Shutdown the app state.
    ///
    /// This should only be called once.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.player.stop().await;

        self.lock_file
            .shutdown()
            .await
            .context("failed to shutdown the lock file thread")
    }
}
