use crate::cities::{self, CITIES};
use crate::config::AppConfig;
use crate::dashboard::{Change, Dashboard, DashboardError, DashboardSummary};
use crate::fetch::{OverpassClient, PointSource};
use crate::heat::{to_feature_collection, HEAT_SOURCE_ID};
use crate::query::build_query;
use crate::render::{RefreshOutcome, RefreshTicket};
use crate::scene::{MapCommand, SceneHandle, SceneWidget};
use crate::styles::{self, StyleView};
use crate::types::{FilterSet, Location, PointCollection};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

/// Dashboard and the scene its widget records into. Both live behind one
/// lock, so a drain only returns commands recorded by the lock holder.
pub struct Session {
    dashboard: Dashboard<SceneWidget>,
    scene: SceneHandle,
}

pub struct AppState<S> {
    session: Mutex<Session>,
    // flips to true once the first refresh after mount has completed
    mounted: watch::Sender<bool>,
    pub source: S,
    pub style_key: String,
}

impl<S: PointSource> AppState<S> {
    pub fn new(config: &AppConfig, source: S) -> Self {
        let (mounted, _) = watch::channel(false);
        Self {
            session: Mutex::new(Session {
                dashboard: Dashboard::new(&config.map),
                scene: SceneHandle::new(),
            }),
            mounted,
            source,
            style_key: config.map.style_key.clone(),
        }
    }
}

#[derive(Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    accidents: bool,
    #[serde(default)]
    road_closures: bool,
    #[serde(default)]
    vehicles: bool,
    city: Option<String>,
}

/// Commands for the page to replay plus the sidebar state after a change.
#[derive(Serialize)]
pub struct SceneUpdate {
    pub outcome: Option<RefreshOutcome>,
    pub commands: Vec<MapCommand>,
    pub summary: DashboardSummary,
}

pub struct ApiError(DashboardError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            DashboardError::UnknownStyle(_) => StatusCode::BAD_REQUEST,
            DashboardError::Render(_) => StatusCode::CONFLICT,
        };
        (status, self.0.to_string()).into_response()
    }
}

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        Self(e)
    }
}

pub fn router<S>(state: Arc<AppState<S>>) -> Router
where
    S: PointSource + Send + Sync + 'static,
{
    Router::new()
        .route("/api/cities", get(cities_handler))
        .route("/api/styles", get(styles_handler::<S>))
        .route("/api/query", get(query_handler))
        .route("/api/state", get(state_handler::<S>))
        .route("/api/points", get(points_handler::<S>))
        .route("/api/mount", post(mount_handler::<S>))
        .route("/api/change", post(change_handler::<S>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    if config.map.style_key.is_empty() {
        warn!("no map style key configured, basemap tiles will not load");
    }
    let source = OverpassClient::new(&config.overpass.endpoint);
    let state = Arc::new(AppState::new(&config, source));

    let app = router(state).fallback_service(ServeDir::new(&config.server.static_dir));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!(%addr, endpoint = %config.overpass.endpoint, "starting dashboard server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn cities_handler() -> Json<&'static [Location]> {
    Json(CITIES)
}

async fn styles_handler<S>(State(state): State<Arc<AppState<S>>>) -> Json<Vec<StyleView>>
where
    S: PointSource + Send + Sync + 'static,
{
    Json(styles::list(&state.style_key))
}

/// Returns the query text that a filter set and city would send.
async fn query_handler(Query(params): Query<QueryParams>) -> String {
    let filters = FilterSet {
        accidents: params.accidents,
        road_closures: params.road_closures,
        vehicles: params.vehicles,
    };
    let city = cities::find_or_default(params.city.as_deref().unwrap_or(cities::DEFAULT_CITY_ID));
    build_query(&filters, city).to_string()
}

async fn state_handler<S>(State(state): State<Arc<AppState<S>>>) -> Json<DashboardSummary>
where
    S: PointSource + Send + Sync + 'static,
{
    Json(state.session.lock().await.dashboard.summary())
}

async fn points_handler<S>(State(state): State<Arc<AppState<S>>>) -> Json<FeatureCollection>
where
    S: PointSource + Send + Sync + 'static,
{
    let data = state
        .session
        .lock()
        .await
        .scene
        .source_data(HEAT_SOURCE_ID)
        .unwrap_or_else(|| to_feature_collection(&PointCollection::default()));
    Json(data)
}

async fn mount_handler<S>(State(state): State<Arc<AppState<S>>>) -> Result<Json<SceneUpdate>, ApiError>
where
    S: PointSource + Send + Sync + 'static,
{
    let mounting = {
        let mut session = state.session.lock().await;
        if session.dashboard.is_mounted() {
            None
        } else {
            let scene = session.scene.clone();
            let ticket = session.dashboard.mount(move |init| SceneWidget::new(init, scene));
            Some(ticket.map(|ticket| (ticket, session.scene.drain())))
        }
    };

    match mounting {
        Some(mounted) => {
            let update = match mounted {
                Ok((ticket, commands)) => refresh(&state, ticket, commands).await,
                Err(e) => Err(e.into()),
            };
            state.mounted.send_replace(true);
            update
        }
        None => {
            // A reloaded page or second tab gets the whole scene instead of a
            // second map, once the first refresh has drawn the heat layer.
            let mut ready = state.mounted.subscribe();
            let _ = ready.wait_for(|done| *done).await;

            let session = state.session.lock().await;
            Ok(Json(SceneUpdate {
                outcome: None,
                commands: session.scene.replay(),
                summary: session.dashboard.summary(),
            }))
        }
    }
}

async fn change_handler<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(change): Json<Change>,
) -> Result<Json<SceneUpdate>, ApiError>
where
    S: PointSource + Send + Sync + 'static,
{
    let (ticket, commands, summary) = {
        let mut session = state.session.lock().await;
        let ticket = session.dashboard.apply(change)?;
        (ticket, session.scene.drain(), session.dashboard.summary())
    };

    match ticket {
        Some(ticket) => refresh(&state, ticket, commands).await,
        None => Ok(Json(SceneUpdate {
            outcome: None,
            commands,
            summary,
        })),
    }
}

/// Fetches without holding the session lock, so newer changes can be issued
/// meanwhile; the renderer drops whichever response is outdated. `commands`
/// are the ones the caller already drained when issuing the ticket.
async fn refresh<S>(
    state: &AppState<S>,
    ticket: RefreshTicket,
    mut commands: Vec<MapCommand>,
) -> Result<Json<SceneUpdate>, ApiError>
where
    S: PointSource + Send + Sync + 'static,
{
    let result = state.source.fetch(&ticket.query).await;

    let mut session = state.session.lock().await;
    let outcome = session.dashboard.complete(ticket, result)?;
    commands.extend(session.scene.drain());
    Ok(Json(SceneUpdate {
        outcome: Some(outcome),
        commands,
        summary: session.dashboard.summary(),
    }))
}
