use crate::{config::AppConfig, pagination::PageLinks, store::SceneStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub scenes: Arc<dyn SceneStore>,
    pub links: PageLinks,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, scenes: Arc<dyn SceneStore>) -> Self {
        let links = PageLinks::new(config.scenes_url());
        Self {
            config,
            scenes,
            links,
        }
    }
}
