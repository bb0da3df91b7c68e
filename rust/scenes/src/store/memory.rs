use super::SceneStore;
use crate::{
    error::Result,
    models::Scene,
    pagination::{Position, Record, RecordStore, Window},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

/// Process-local scene store, kept sorted by `(created, id)`.
#[derive(Debug, Default)]
pub struct MemorySceneStore {
    scenes: RwLock<Vec<Scene>>,
}

impl MemorySceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with a handful of scenes a day apart, oldest first.
    pub fn with_demo_scenes(now: DateTime<Utc>) -> Self {
        let store = Self::new();
        let titles = ["Cold open", "Inciting incident", "Midpoint", "Climax", "Denouement"];
        let oldest = now - Duration::days(titles.len() as i64);
        for (offset, title) in titles.into_iter().enumerate() {
            store.insert(Scene::with_created(
                title,
                None,
                oldest + Duration::days(offset as i64),
            ));
        }
        store
    }

    pub fn insert(&self, scene: Scene) {
        let mut scenes = self.scenes.write();
        let position = scene.position();
        let at = scenes.partition_point(|existing| existing.position() <= position);
        scenes.insert(at, scene);
    }

    /// Whether more than `limit` scenes fall inside `window`.
    fn exceeds(&self, window: Window, limit: u32) -> bool {
        self.scenes
            .read()
            .iter()
            .filter(|scene| window.admits(scene.position()))
            .nth(limit as usize)
            .is_some()
    }
}

#[async_trait]
impl RecordStore for MemorySceneStore {
    type Record = Scene;

    async fn fetch_forward(&self, limit: u32, window: Window) -> Result<Option<Vec<Scene>>> {
        let scenes = self.scenes.read();
        Ok(Some(
            scenes
                .iter()
                .filter(|scene| window.admits(scene.position()))
                .take(limit as usize)
                .cloned()
                .collect(),
        ))
    }

    async fn fetch_backward(&self, limit: u32, window: Window) -> Result<Option<Vec<Scene>>> {
        let scenes = self.scenes.read();
        let matching: Vec<&Scene> = scenes
            .iter()
            .filter(|scene| window.admits(scene.position()))
            .collect();
        let skip = matching.len().saturating_sub(limit as usize);
        Ok(Some(matching.into_iter().skip(skip).cloned().collect()))
    }

    async fn has_more_after(&self, limit: u32, after: Option<Position>) -> Result<bool> {
        Ok(self.exceeds(
            Window {
                after,
                before: None,
            },
            limit,
        ))
    }

    async fn has_more_before(&self, limit: u32, before: Option<Position>) -> Result<bool> {
        Ok(self.exceeds(
            Window {
                after: None,
                before,
            },
            limit,
        ))
    }

    async fn total_count(&self) -> Result<u64> {
        Ok(self.scenes.read().len() as u64)
    }
}

#[async_trait]
impl SceneStore for MemorySceneStore {
    async fn get_scene(&self, id: Uuid) -> Result<Option<Scene>> {
        Ok(self
            .scenes
            .read()
            .iter()
            .find(|scene| scene.id == id)
            .cloned())
    }

    async fn insert_scene(&self, scene: Scene) -> Result<Scene> {
        self.insert(scene.clone());
        Ok(scene)
    }

    async fn delete_scene(&self, id: Uuid) -> Result<bool> {
        let mut scenes = self.scenes.write();
        let before = scenes.len();
        scenes.retain(|scene| scene.id != id);
        Ok(scenes.len() != before)
    }
}
