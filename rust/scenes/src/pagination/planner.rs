//! Turns page options into concurrent store operations.

use super::{decode_cursor, PageOptions, RecordStore, Window};
use crate::error::Result;
use tracing::debug;

/// Which directional fetch a request issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// First `n` records after the window start.
    Forward(u32),
    /// Last `n` records before the window end.
    Backward(u32),
}

/// Page options after default sizing and cursor decoding.
///
/// Only [`PageRequest::resolve`] builds one, so a request always has a
/// direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    direction: Direction,
    last: Option<u32>,
    window: Window,
}

impl PageRequest {
    /// Resolves raw options.
    ///
    /// When neither `first` nor `last` is given, `first` becomes
    /// `default_page_size`. `first` wins when both sizes are present.
    /// Cursors that fail to decode are dropped.
    pub fn resolve(options: &PageOptions, default_page_size: u32) -> Self {
        let direction = match (options.first, options.last) {
            (Some(first), _) => Direction::Forward(first),
            (None, Some(last)) => Direction::Backward(last),
            (None, None) => Direction::Forward(default_page_size.max(1)),
        };

        Self {
            direction,
            last: options.last,
            window: Window {
                after: options.after.as_deref().and_then(decode_cursor),
                before: options.before.as_deref().and_then(decode_cursor),
            },
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Forward size, including a defaulted one.
    pub fn first(&self) -> Option<u32> {
        match self.direction {
            Direction::Forward(size) => Some(size),
            Direction::Backward(_) => None,
        }
    }

    /// Backward size as supplied, even when `first` drives the fetch.
    pub fn last(&self) -> Option<u32> {
        self.last
    }

    pub fn window(&self) -> Window {
        self.window
    }

    /// Size carried into navigation links (`first ?? last`).
    pub fn page_size(&self) -> u32 {
        match self.direction {
            Direction::Forward(size) | Direction::Backward(size) => size,
        }
    }
}

/// Records of one page plus the flags needed to navigate from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<R> {
    pub items: Vec<R>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub total_count: u64,
}

/// Fetches one page.
///
/// The item fetch, both existence probes and the total count are issued
/// together and joined; the first failure aborts the rest. Dropping the
/// returned future cancels all four.
///
/// Returns `Ok(None)` when the store reports the collection as missing.
pub async fn fetch_page<S>(store: &S, request: &PageRequest) -> Result<Option<Page<S::Record>>>
where
    S: RecordStore + ?Sized,
{
    let window = request.window();
    let direction = request.direction();

    let items = async {
        match direction {
            Direction::Forward(limit) => store.fetch_forward(limit, window).await,
            Direction::Backward(limit) => store.fetch_backward(limit, window).await,
        }
    };

    // Without a forward size, a `before` boundary alone implies more data
    // follows. Same for `after` on the previous side.
    let has_next_page = async {
        match request.first() {
            Some(first) => store.has_more_after(first, window.after).await,
            None => Ok(window.before.is_some()),
        }
    };
    let has_previous_page = async {
        match request.last() {
            Some(last) => store.has_more_before(last, window.before).await,
            None => Ok(window.after.is_some()),
        }
    };

    let (items, has_next_page, has_previous_page, total_count) = tokio::try_join!(
        items,
        has_next_page,
        has_previous_page,
        store.total_count()
    )?;

    let Some(items) = items else {
        debug!(?direction, "record collection not found");
        return Ok(None);
    };

    debug!(
        ?direction,
        count = items.len(),
        has_next_page,
        has_previous_page,
        total_count,
        "page fetched"
    );

    Ok(Some(Page {
        items,
        has_next_page,
        has_previous_page,
        total_count,
    }))
}
