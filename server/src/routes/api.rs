use crate::AppState;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse;
use axum::response::IntoResponse;
use axum::response::Sse;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use m3u_parser::Channel;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tracing::error;
use universal_player::SinkCapabilities;

#[derive(Debug, serde::Serialize)]
struct ApiError {
    messages: Vec<String>,
}

impl ApiError {
    fn from_anyhow(error: anyhow::Error) -> Self {
        Self {
            messages: error.chain().map(|e| e.to_string()).collect(),
        }
    }
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/playlists", get(api_playlists_get))
        .route("/playlists/:name/load", post(api_playlists_load))
        .route("/channels", get(api_channels_get))
        .route("/groups", get(api_groups_get))
        .route("/favorites", get(api_favorites_get))
        .route("/favorites/toggle", post(api_favorites_toggle))
        .route("/player", get(api_player_get))
        .route("/player/capabilities", post(api_player_capabilities))
        .route("/player/select", post(api_player_select))
        .route("/player/stop", post(api_player_stop))
        .route("/player/events", get(api_player_events))
        .route("/player/sink-event", post(api_player_sink_event))
}

#[derive(Debug, serde::Serialize)]
struct ApiPlaylists {
    playlists: Vec<ApiPlaylist>,
    current: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct ApiPlaylist {
    name: String,
}

async fn api_playlists_get(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let playlists = app_state
        .playlists()
        .iter()
        .map(|playlist| ApiPlaylist {
            name: playlist.name.clone(),
        })
        .collect();

    Json(ApiPlaylists {
        playlists,
        current: app_state.catalog.playlist_name(),
    })
}

#[derive(Debug, serde::Serialize)]
struct ApiPlaylistLoaded {
    channels: usize,
}

async fn api_playlists_load(
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match app_state.load_playlist(&name).await {
        Some(channels) => (StatusCode::OK, Json(ApiPlaylistLoaded { channels })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiError::from_anyhow(anyhow::anyhow!(
                "unknown playlist \"{name}\""
            ))),
        )
            .into_response(),
    }
}

#[derive(Debug, serde::Deserialize)]
struct ChannelsParams {
    search: Option<String>,
    group: Option<String>,
}

async fn api_channels_get(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ChannelsParams>,
) -> impl IntoResponse {
    let mut channels = app_state
        .catalog
        .search(params.search.as_deref().unwrap_or(""));
    if let Some(group) = params.group.as_deref() {
        channels.retain(|channel| channel.group == group);
    }

    Json(channels)
}

async fn api_groups_get(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(app_state.catalog.groups())
}

async fn api_favorites_get(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(app_state.favorites.all().await)
}

async fn api_favorites_toggle(
    State(app_state): State<Arc<AppState>>,
    Json(channel): Json<Channel>,
) -> impl IntoResponse {
    let result = app_state.favorites.toggle(channel).await.map_err(|error| {
        error!("{error:?}");
        ApiError::from_anyhow(error)
    });

    match result {
        Ok(favorites) => (StatusCode::OK, Json(favorites)).into_response(),
        Err(error) => (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response(),
    }
}

async fn api_player_get(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(app_state.player.view().await)
}

async fn api_player_capabilities(
    State(app_state): State<Arc<AppState>>,
    Json(capabilities): Json<SinkCapabilities>,
) -> impl IntoResponse {
    app_state.player.sink().set_capabilities(capabilities);
    StatusCode::NO_CONTENT
}

async fn api_player_select(
    State(app_state): State<Arc<AppState>>,
    Json(channel): Json<Channel>,
) -> impl IntoResponse {
    let result = app_state.player.select(channel).await.map_err(|error| {
        // Attach failures leave the UI usable; the client keeps its
        // manual controls either way.
        error!("{error:?}");
        ApiError::from_anyhow(error.into())
    });

    match result {
        Ok(selection) => (StatusCode::OK, Json(selection)).into_response(),
        Err(error) => (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response(),
    }
}

async fn api_player_stop(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    app_state.player.stop().await;
    StatusCode::NO_CONTENT
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
enum NativeSinkEvent {
    Play,
    Pause,
}

#[derive(Debug, serde::Deserialize)]
struct SinkEventBody {
    event: NativeSinkEvent,
}

async fn api_player_sink_event(
    State(app_state): State<Arc<AppState>>,
    Json(body): Json<SinkEventBody>,
) -> impl IntoResponse {
    let playing = matches!(body.event, NativeSinkEvent::Play);
    app_state.player.sink().native_event(playing);
    StatusCode::NO_CONTENT
}

#[derive(Debug, serde::Serialize)]
struct ApiPlayState {
    playing: bool,
}

async fn api_player_events(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let directives = BroadcastStream::new(app_state.player.sink().subscribe())
        .filter_map(|result| result.ok())
        .map(|directive| sse::Event::default().event("directive").json_data(directive));

    let play_state = WatchStream::new(app_state.player.play_state()).map(|playing| {
        sse::Event::default()
            .event("play-state")
            .json_data(ApiPlayState { playing })
    });

    Sse::new(directives.merge(play_state)).keep_alive(sse::KeepAlive::default())
}
