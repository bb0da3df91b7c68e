use super::SceneStore;
use crate::{
    db::{self, PgPool, PgTlsFiles},
    error::{Result, ServiceError},
    models::Scene,
    pagination::{Bound, Position, RecordStore, Window},
    schema::{
        self,
        scenes::dsl::{created as col_created, id as col_id, scenes},
    },
};
use async_trait::async_trait;
use bb8::PooledConnection;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_builder::{AsQuery, BoxedSelectStatement, FromClause};
use diesel_async::RunQueryDsl;
use tracing::error;
use uuid::Uuid;

type ScenesTable = schema::scenes::table;
type ScenesFromClause = FromClause<ScenesTable>;
type ScenesQuery<'a> =
    BoxedSelectStatement<'a, <ScenesTable as AsQuery>::SqlType, ScenesFromClause, Pg>;

/// Scene store backed by the `scenes` table.
#[derive(Clone)]
pub struct PgSceneStore {
    pool: PgPool,
}

impl PgSceneStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects, then creates the table if it does not exist yet.
    pub async fn connect(
        database_url: &str,
        max_pool_size: u32,
        tls: &PgTlsFiles,
    ) -> anyhow::Result<Self> {
        let pool = db::connect_pool(database_url, max_pool_size, tls).await?;
        db::ensure_schema(&pool, schema::CREATE_SCENES).await?;
        Ok(Self::new(pool))
    }

    async fn conn(&self) -> Result<PooledConnection<'_, db::PgConnectionManager>> {
        self.pool.get().await.map_err(|err| {
            error!(error = ?err, "failed to acquire database connection");
            ServiceError::Internal(anyhow::anyhow!("{err:?}"))
        })
    }
}

/// Base query with every present bound folded in as a filter.
///
/// Bounds compare `(created, id)` lexicographically:
/// `created > ts OR (created = ts AND id > id0)`, mirrored for `before`.
fn windowed(window: Window) -> ScenesQuery<'static> {
    window
        .bounds()
        .fold(scenes.into_boxed::<Pg>(), |query, bound| match bound {
            Bound::After(Position { created, id }) => query.filter(
                col_created
                    .gt(created)
                    .or(col_created.eq(created).and(col_id.gt(id))),
            ),
            Bound::Before(Position { created, id }) => query.filter(
                col_created
                    .lt(created)
                    .or(col_created.eq(created).and(col_id.lt(id))),
            ),
        })
}

async fn exists_past(
    conn: &mut diesel_async::AsyncPgConnection,
    query: ScenesQuery<'static>,
    limit: u32,
) -> Result<bool> {
    let ids: Vec<Uuid> = query
        .order((col_created.asc(), col_id.asc()))
        .offset(i64::from(limit))
        .limit(1)
        .select(col_id)
        .load(conn)
        .await
        .map_err(ServiceError::storage)?;
    Ok(!ids.is_empty())
}

#[async_trait]
impl RecordStore for PgSceneStore {
    type Record = Scene;

    async fn fetch_forward(&self, limit: u32, window: Window) -> Result<Option<Vec<Scene>>> {
        let mut conn = self.conn().await?;
        let rows = windowed(window)
            .order((col_created.asc(), col_id.asc()))
            .limit(i64::from(limit))
            .load::<Scene>(&mut *conn)
            .await
            .map_err(ServiceError::storage)?;
        Ok(Some(rows))
    }

    async fn fetch_backward(&self, limit: u32, window: Window) -> Result<Option<Vec<Scene>>> {
        let mut conn = self.conn().await?;
        let mut rows = windowed(window)
            .order((col_created.desc(), col_id.desc()))
            .limit(i64::from(limit))
            .load::<Scene>(&mut *conn)
            .await
            .map_err(ServiceError::storage)?;
        rows.reverse();
        Ok(Some(rows))
    }

    async fn has_more_after(&self, limit: u32, after: Option<Position>) -> Result<bool> {
        let mut conn = self.conn().await?;
        let window = Window {
            after,
            before: None,
        };
        exists_past(&mut conn, windowed(window), limit).await
    }

    async fn has_more_before(&self, limit: u32, before: Option<Position>) -> Result<bool> {
        let mut conn = self.conn().await?;
        let window = Window {
            after: None,
            before,
        };
        exists_past(&mut conn, windowed(window), limit).await
    }

    async fn total_count(&self) -> Result<u64> {
        let mut conn = self.conn().await?;
        let count: i64 = scenes
            .count()
            .get_result(&mut *conn)
            .await
            .map_err(ServiceError::storage)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl SceneStore for PgSceneStore {
    async fn get_scene(&self, id: Uuid) -> Result<Option<Scene>> {
        let mut conn = self.conn().await?;
        scenes
            .find(id)
            .first::<Scene>(&mut *conn)
            .await
            .optional()
            .map_err(ServiceError::storage)
    }

    async fn insert_scene(&self, scene: Scene) -> Result<Scene> {
        let mut conn = self.conn().await?;
        diesel::insert_into(scenes)
            .values(&scene)
            .get_result::<Scene>(&mut *conn)
            .await
            .map_err(ServiceError::storage)
    }

    async fn delete_scene(&self, id: Uuid) -> Result<bool> {
        let mut conn = self.conn().await?;
        let removed = diesel::delete(scenes.find(id))
            .execute(&mut *conn)
            .await
            .map_err(ServiceError::storage)?;
        Ok(removed > 0)
    }
}
