use crate::{
    config::AppConfig,
    error::{Result, ServiceError},
    models::{NewScene, Scene, SceneView},
    pagination::{fetch_page, PageOptions, PageRequest, RecordStore},
    state::AppState,
    store::{MemorySceneStore, PgSceneStore, SceneStore},
};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use std::{future::Future, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

pub struct Server {
    config: Arc<AppConfig>,
    state: AppState,
}

impl Server {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let scenes: Arc<dyn SceneStore> = match config.database_url.as_deref() {
            Some(url) => {
                if config.seed_demo {
                    warn!("demo seeding only applies to the in-memory store; skipping");
                }
                let store = PgSceneStore::connect(url, config.max_pool_size, &config.pg_tls).await?;
                info!("using PostgreSQL scene store");
                Arc::new(store)
            }
            None => {
                let store = if config.seed_demo {
                    MemorySceneStore::with_demo_scenes(Utc::now())
                } else {
                    MemorySceneStore::new()
                };
                let count = store.total_count().await?;
                info!(scenes = count, "using in-memory scene store");
                Arc::new(store)
            }
        };

        Ok(Self::with_store(config, scenes))
    }

    pub fn with_store(config: AppConfig, scenes: Arc<dyn SceneStore>) -> Self {
        let config = Arc::new(config);
        let state = AppState::new(Arc::clone(&config), scenes);
        Self { config, state }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(Self::health))
            .route("/api/scenes", get(Self::list_scenes).post(Self::create_scene))
            .route(
                "/api/scenes/:id",
                get(Self::get_scene).delete(Self::delete_scene),
            )
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.listen_addr;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, public_url = %self.config.public_url, "scenes service listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    async fn health() -> Json<serde_json::Value> {
        Json(json!({ "status": "ok" }))
    }

    async fn list_scenes(
        State(state): State<AppState>,
        Query(params): Query<Vec<(String, String)>>,
    ) -> Result<Response> {
        let options = page_options(&params, state.config.max_page_size)?;
        let request = PageRequest::resolve(&options, state.config.default_page_size);

        let page = within(&state, fetch_page(state.scenes.as_ref(), &request))
            .await?
            .ok_or_else(|| ServiceError::NotFound("scene collection".into()))?;

        let scenes_url = state.links.base();
        let connection = state.links.assemble(page, &request, |scene| {
            SceneView::from_scene(scene, scenes_url)
        });
        let link = connection.page_info.link_header();

        let mut response = Json(connection).into_response();
        match HeaderValue::from_str(&link) {
            Ok(value) => {
                response.headers_mut().insert(header::LINK, value);
            }
            Err(err) => warn!(error = %err, "skipping unrepresentable Link header"),
        }
        Ok(response)
    }

    async fn get_scene(
        State(state): State<AppState>,
        Path(id): Path<String>,
    ) -> Result<Json<SceneView>> {
        let id = parse_id(&id)?;
        let scene = within(&state, state.scenes.get_scene(id))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("scene {id}")))?;
        Ok(Json(SceneView::from_scene(scene, state.links.base())))
    }

    async fn create_scene(
        State(state): State<AppState>,
        Json(body): Json<NewScene>,
    ) -> Result<Response> {
        let title = body.title.trim();
        if title.is_empty() {
            return Err(ServiceError::InvalidRequest("title must not be blank".into()));
        }

        let scene = within(
            &state,
            state.scenes.insert_scene(Scene::new(title, body.description)),
        )
        .await?;
        info!(id = %scene.id, "scene created");

        let view = SceneView::from_scene(scene, state.links.base());
        let mut response = (StatusCode::CREATED, Json(&view)).into_response();
        if let Ok(location) = HeaderValue::from_str(&view.url) {
            response.headers_mut().insert(header::LOCATION, location);
        }
        Ok(response)
    }

    async fn delete_scene(
        State(state): State<AppState>,
        Path(id): Path<String>,
    ) -> Result<StatusCode> {
        let id = parse_id(&id)?;
        if within(&state, state.scenes.delete_scene(id)).await? {
            info!(%id, "scene deleted");
            Ok(StatusCode::NO_CONTENT)
        } else {
            Err(ServiceError::NotFound(format!("scene {id}")))
        }
    }
}

/// Bounds a store call by the configured request timeout. Expiry drops the
/// call, cancelling any work still in flight.
async fn within<T, F>(state: &AppState, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(state.config.request_timeout, operation)
        .await
        .map_err(|_| ServiceError::Timeout)?
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| ServiceError::InvalidRequest(format!("invalid scene id '{raw}'")))
}

/// Reads `first`, `last`, `after` and `before` with case-insensitive names.
///
/// Sizes must be positive integers and are clamped to `max_page_size`.
/// Unknown parameters are ignored.
fn page_options(params: &[(String, String)], max_page_size: u32) -> Result<PageOptions> {
    let mut options = PageOptions::default();
    for (name, value) in params {
        match name.to_ascii_lowercase().as_str() {
            "first" => options.first = Some(page_size("first", value, max_page_size)?),
            "last" => options.last = Some(page_size("last", value, max_page_size)?),
            "after" => options.after = Some(value.clone()),
            "before" => options.before = Some(value.clone()),
            _ => {}
        }
    }
    Ok(options)
}

fn page_size(name: &str, value: &str, max_page_size: u32) -> Result<u32> {
    match value.trim().parse::<u32>() {
        Ok(size) if size > 0 => Ok(size.min(max_page_size)),
        _ => Err(ServiceError::InvalidRequest(format!(
            "{name} must be a positive integer"
        ))),
    }
}
