use axum::{
    body::{self, Body},
    http::{self, Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use scenes::{
    config::AppConfig,
    db::PgTlsFiles,
    models::Scene,
    pagination::{encode_cursor, Record},
    server::Server,
    store::{MemorySceneStore, PgSceneStore, SceneStore},
};
use serde_json::Value;
use std::{env, future::Future, net::SocketAddr, sync::Arc, sync::Once, time::Duration};
use tokio_postgres::NoTls;
use tower::ServiceExt;
use uuid::Uuid;

pub const PUBLIC_URL: &str = "http://scenes.test";
pub const SCENES_URL: &str = "http://scenes.test/api/scenes";

const TEST_DATABASE_URL: &str = "SCENES_TEST_DATABASE_URL";

static TRACING_INIT: Once = Once::new();

/// Router over a scene store, driven without a socket.
pub struct ScenesTestHarness {
    router: Router,
    store: Arc<dyn SceneStore>,
}

/// Creation times of the seeded fixture: one scene per day, Jan 1–4 2024.
pub fn day(n: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, n, 8, 30, 0).unwrap()
}

/// Fixture scene `n`, titled `scene n`, with id `n` so ordering is predictable.
pub fn scene(n: u32, created: DateTime<Utc>) -> Scene {
    let mut scene = Scene::with_created(format!("scene {n}"), None, created);
    scene.id = Uuid::from_u128(n.into());
    scene
}

/// Four scenes created on consecutive days.
pub fn daily_scenes() -> Vec<Scene> {
    (1..=4).map(|n| scene(n, day(n))).collect()
}

/// Three scenes sharing the first day's timestamp, then one on day two.
pub fn tied_scenes() -> Vec<Scene> {
    vec![
        scene(1, day(1)),
        scene(2, day(1)),
        scene(3, day(1)),
        scene(4, day(2)),
    ]
}

/// Cursor pointing at the daily fixture scene created on day `n`.
pub fn cursor(n: u32) -> String {
    encode_cursor(scene(n, day(n)).position())
}

pub fn test_config() -> AppConfig {
    AppConfig {
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        public_url: PUBLIC_URL.to_string(),
        database_url: None,
        max_pool_size: 2,
        pg_tls: PgTlsFiles::default(),
        default_page_size: 3,
        max_page_size: 50,
        request_timeout: Duration::from_secs(5),
        seed_demo: false,
    }
}

/// Runs `test` against a PostgreSQL-backed harness seeded with `seed`.
///
/// The `scenes` table is truncated first. Skipped unless
/// `SCENES_TEST_DATABASE_URL` is set; callers should be `#[serial]`.
pub async fn with_pg_harness<F, Fut>(seed: Vec<Scene>, test: F)
where
    F: FnOnce(ScenesTestHarness) -> Fut,
    Fut: Future<Output = ()>,
{
    init_tracing();

    let Some(database_url) = env::var(TEST_DATABASE_URL)
        .ok()
        .filter(|value| !value.trim().is_empty())
    else {
        eprintln!("[scenes-test] skipping PostgreSQL harness: {TEST_DATABASE_URL} is not set");
        return;
    };

    let store = PgSceneStore::connect(&database_url, 2, &PgTlsFiles::default())
        .await
        .expect("failed to connect scenes store to test database");
    reset_scenes_table(&database_url).await;
    for scene in seed {
        store
            .insert_scene(scene)
            .await
            .expect("failed to seed test scene");
    }

    test(ScenesTestHarness::with_store(Arc::new(store))).await;
}

async fn reset_scenes_table(database_url: &str) {
    let (client, connection) = tokio_postgres::connect(database_url, NoTls)
        .await
        .expect("failed to open admin connection to test database");
    let task = tokio::spawn(async move {
        if let Err(err) = connection.await {
            eprintln!("[scenes-test] admin connection error: {err}");
        }
    });
    client
        .batch_execute("TRUNCATE scenes")
        .await
        .expect("failed to truncate scenes table");
    drop(client);
    let _ = task.await;
}

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt::try_init();
    });
}

impl ScenesTestHarness {
    /// In-memory store holding [`daily_scenes`].
    pub fn seeded() -> Self {
        Self::in_memory(daily_scenes())
    }

    pub fn empty() -> Self {
        Self::in_memory(Vec::new())
    }

    pub fn in_memory(seed: Vec<Scene>) -> Self {
        let store = MemorySceneStore::new();
        for scene in seed {
            store.insert(scene);
        }
        Self::with_store(Arc::new(store))
    }

    pub fn with_store(store: Arc<dyn SceneStore>) -> Self {
        init_tracing();

        let server = Server::with_store(test_config(), Arc::clone(&store));
        Self {
            router: server.router(),
            store,
        }
    }

    pub fn store(&self) -> &dyn SceneStore {
        self.store.as_ref()
    }

    pub async fn get(&self, uri: &str) -> http::Response<Body> {
        self.send(Request::builder().method("GET").uri(uri), Body::empty())
            .await
    }

    pub async fn delete(&self, uri: &str) -> http::Response<Body> {
        self.send(Request::builder().method("DELETE").uri(uri), Body::empty())
            .await
    }

    pub async fn post_json(&self, uri: &str, payload: &Value) -> http::Response<Body> {
        let body = serde_json::to_vec(payload).expect("request payload should serialize");
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(http::header::CONTENT_TYPE, "application/json"),
            Body::from(body),
        )
        .await
    }

    async fn send(&self, builder: http::request::Builder, body: Body) -> http::Response<Body> {
        let request = builder.body(body).expect("failed to build harness request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should handle harness request")
    }
}

pub async fn read_json(response: http::Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("response body should be readable");
    let value =
        serde_json::from_slice::<Value>(&bytes).expect("response body should be valid JSON");
    (status, value)
}

pub fn link_header(response: &http::Response<Body>) -> Option<String> {
    response
        .headers()
        .get(http::header::LINK)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Strips the public origin so a generated URL can be replayed on the router.
pub fn local_path(url: &str) -> &str {
    url.strip_prefix(PUBLIC_URL)
        .unwrap_or_else(|| panic!("url {url} should start with {PUBLIC_URL}"))
}

/// Item titles of a connection body.
pub fn titles(body: &Value) -> Vec<String> {
    body["items"]
        .as_array()
        .unwrap_or_else(|| panic!("items missing or not array: {body}"))
        .iter()
        .map(|item| item["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// A `pageInfo` URL field, `None` when absent.
pub fn page_url(body: &Value, field: &str) -> Option<String> {
    body["pageInfo"][field].as_str().map(str::to_string)
}

/// Follows `nextPageUrl` from `start` until `hasNextPage` is false,
/// collecting every title on the way.
pub async fn walk_forward(harness: &ScenesTestHarness, start: &str) -> Vec<String> {
    let mut seen = Vec::new();
    let mut uri = start.to_string();
    loop {
        let (status, body) = read_json(harness.get(&uri).await).await;
        assert_eq!(status, StatusCode::OK, "walking {uri}: {body}");
        let page = titles(&body);
        assert!(!page.is_empty(), "page at {uri} should not be empty: {body}");
        seen.extend(page);
        match page_url(&body, "nextPageUrl") {
            Some(next) => uri = local_path(&next).to_string(),
            None => return seen,
        }
    }
}
