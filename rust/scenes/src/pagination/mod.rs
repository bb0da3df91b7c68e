//! Relay-style cursor pagination over records ordered by creation time.
//!
//! The engine is split in three parts:
//!
//! - [`cursor`] turns record positions into opaque tokens and back.
//! - [`planner`] resolves [`PageOptions`] into a [`PageRequest`] and runs the
//!   page fetch, both existence probes and the total count concurrently
//!   against a [`RecordStore`].
//! - [`connection`] packages the fetched [`Page`] into a [`Connection`] with
//!   navigation URLs and a `Link` header value.

pub mod connection;
pub mod cursor;
pub mod planner;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use connection::{Connection, PageInfo, PageLinks};
pub use cursor::{decode_cursor, encode_cursor};
pub use planner::{fetch_page, Direction, Page, PageRequest};

/// Page size used when a request names neither `first` nor `last`.
pub const DEFAULT_PAGE_SIZE: u32 = 3;

/// Raw pagination options as supplied by a caller.
///
/// `first`/`after` describe a forward window, `last`/`before` a backward one.
/// Cursors are kept in their encoded form; decoding happens when the options
/// are resolved into a [`PageRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOptions {
    pub first: Option<u32>,
    pub last: Option<u32>,
    pub after: Option<String>,
    pub before: Option<String>,
}

/// Where a record sits in the paging order.
///
/// Records sort by creation time, then by id, so two records created in the
/// same microsecond still have distinct positions. Field order matters: the
/// derived `Ord` is the paging order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub created: DateTime<Utc>,
    pub id: Uuid,
}

impl Position {
    pub fn new(created: DateTime<Utc>, id: Uuid) -> Self {
        Self { created, id }
    }
}

/// A record that can be paged by creation time.
pub trait Record {
    fn created_at(&self) -> DateTime<Utc>;

    /// Stable identifier breaking ties between equal creation times.
    fn record_id(&self) -> Uuid;

    fn position(&self) -> Position {
        Position::new(self.created_at(), self.record_id())
    }
}

/// A single optional predicate on the record position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// `(created, id) > position`
    After(Position),
    /// `(created, id) < position`
    Before(Position),
}

impl Bound {
    pub fn admits(&self, position: Position) -> bool {
        match self {
            Bound::After(bound) => position > *bound,
            Bound::Before(bound) => position < *bound,
        }
    }
}

/// Exclusive window over record positions bounding a page fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub after: Option<Position>,
    pub before: Option<Position>,
}

impl Window {
    /// The bounds that are present, in application order.
    ///
    /// Stores fold these over their base query instead of branching on each
    /// option.
    pub fn bounds(&self) -> impl Iterator<Item = Bound> {
        [self.after.map(Bound::After), self.before.map(Bound::Before)]
            .into_iter()
            .flatten()
    }

    pub fn admits(&self, position: Position) -> bool {
        self.bounds().all(|bound| bound.admits(position))
    }
}

/// Read-only access to an ordered record collection.
///
/// Records are ordered by [`Position`] ascending. Every sequence returned is
/// in that order.
#[async_trait]
pub trait RecordStore: Send + Sync {
    type Record: Record + Send;

    /// The first `limit` records inside `window`.
    ///
    /// `Ok(None)` means the collection itself does not exist, which is
    /// distinct from an existing collection with no matching rows.
    async fn fetch_forward(&self, limit: u32, window: Window) -> Result<Option<Vec<Self::Record>>>;

    /// The last `limit` records inside `window`, still in ascending order.
    async fn fetch_backward(&self, limit: u32, window: Window) -> Result<Option<Vec<Self::Record>>>;

    /// Whether more than `limit` records sit after `after`.
    async fn has_more_after(&self, limit: u32, after: Option<Position>) -> Result<bool>;

    /// Whether more than `limit` records sit before `before`.
    async fn has_more_before(&self, limit: u32, before: Option<Position>) -> Result<bool>;

    /// Count of every record, ignoring any window.
    async fn total_count(&self) -> Result<u64>;
}
