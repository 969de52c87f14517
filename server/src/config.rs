use anyhow::ensure;
use anyhow::Context;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, serde::Deserialize)]
pub struct Config {
    #[serde(rename = "bind-address")]
    pub bind_address: SocketAddr,

    #[serde(rename = "public-directory")]
    pub public_directory: PathBuf,

    #[serde(rename = "data-directory")]
    pub data_directory: PathBuf,

    /// Attempt to start playback when a channel is selected.
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,

    /// The preset playlist loaded at startup.
    #[serde(rename = "default-playlist", default)]
    pub default_playlist: Option<String>,

    /// Preset playlists offered to the UI.
    #[serde(rename = "playlist", default)]
    pub playlists: Vec<ConfigPlaylist>,

    #[serde(default)]
    pub logging: ConfigLogging,
}

impl Config {
    /// Load and validate a config.
    pub fn load_path<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to load config file at \"{}\"", path.display()))?;
        let config: Self = toml::from_str(&data)
            .with_context(|| format!("failed to parse config file at \"{}\"", path.display()))?;

        let public_directory_exists = config.public_directory.try_exists().with_context(|| {
            format!(
                "failed to check if the public directory path \"{}\" exists",
                config.public_directory.display()
            )
        })?;
        ensure!(
            public_directory_exists,
            "the public directory path \"{}\" does not exist",
            config.public_directory.display()
        );

        for playlist in config.playlists.iter() {
            ensure!(
                playlist.url.is_some() != playlist.path.is_some(),
                "playlist \"{}\" must set exactly one of `url` or `path`",
                playlist.name
            );
        }

        if let Some(default_playlist) = config.default_playlist.as_deref() {
            ensure!(
                config
                    .playlists
                    .iter()
                    .any(|playlist| playlist.name == default_playlist),
                "the default playlist \"{default_playlist}\" is not a configured playlist",
            );
        }

        Ok(config)
    }
}

fn default_autoplay() -> bool {
    true
}

/// A preset playlist, sourced from a URL or a local file.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ConfigPlaylist {
    pub name: String,

    #[serde(default)]
    pub url: Option<Url>,

    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct ConfigLogging {
    #[serde(rename = "include-headers", default)]
    pub include_headers: bool,

    #[serde(default)]
    pub directives: Vec<String>,
}
