//! Scene records and their HTTP representations.

use crate::pagination::Record;
use chrono::{DateTime, SubsecRound, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored scene row.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::scenes)]
pub struct Scene {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
}

impl Scene {
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self::with_created(title, description, Utc::now())
    }

    /// Builds a scene with an explicit creation time, truncated to the
    /// microsecond precision cursors carry.
    pub fn with_created(
        title: impl Into<String>,
        description: Option<String>,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description,
            created: created.trunc_subsecs(6),
        }
    }
}

impl Record for Scene {
    fn created_at(&self) -> DateTime<Utc> {
        self.created
    }

    fn record_id(&self) -> Uuid {
        self.id
    }
}

/// Body accepted when creating a scene.
#[derive(Debug, Clone, Deserialize)]
pub struct NewScene {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Scene as returned to clients, with a link back to itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
    pub url: String,
}

impl SceneView {
    /// `collection_url` is the scenes endpoint, e.g. `http://host/api/scenes`.
    pub fn from_scene(scene: Scene, collection_url: &str) -> Self {
        Self {
            url: format!("{collection_url}/{}", scene.id),
            id: scene.id,
            title: scene.title,
            description: scene.description,
            created: scene.created,
        }
    }
}
