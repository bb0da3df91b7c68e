//! Scene storage backends.

mod memory;
mod postgres;

pub use memory::MemorySceneStore;
pub use postgres::PgSceneStore;

use crate::{error::Result, models::Scene, pagination::RecordStore};
use async_trait::async_trait;
use uuid::Uuid;

/// Scene collection with single-record access on top of paging.
#[async_trait]
pub trait SceneStore: RecordStore<Record = Scene> {
    async fn get_scene(&self, id: Uuid) -> Result<Option<Scene>>;

    async fn insert_scene(&self, scene: Scene) -> Result<Scene>;

    /// Returns whether a scene was removed.
    async fn delete_scene(&self, id: Uuid) -> Result<bool>;
}
