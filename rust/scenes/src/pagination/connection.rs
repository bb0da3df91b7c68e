//! Connection envelope, navigation URLs and the `Link` header.

use super::{encode_cursor, Page, PageRequest, Position, Record};
use serde::Serialize;

/// Navigation metadata for one page.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub count: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub first_page_url: String,
    pub last_page_url: String,
    pub next_page_url: Option<String>,
    pub previous_page_url: Option<String>,
}

impl PageInfo {
    /// RFC 8288 `Link` header value for the URLs on this page.
    ///
    /// Order is `previous`, `next`, `first`, `last`, skipping absent ones.
    pub fn link_header(&self) -> String {
        let mut links = vec![
            link(&self.first_page_url, "first"),
            link(&self.last_page_url, "last"),
        ];
        if let Some(next) = &self.next_page_url {
            links.insert(0, link(next, "next"));
        }
        if let Some(previous) = &self.previous_page_url {
            links.insert(0, link(previous, "previous"));
        }
        links.join(", ")
    }
}

fn link(url: &str, rel: &str) -> String {
    format!("<{url}>; rel=\"{rel}\"")
}

/// A page of items with its navigation metadata and the unwindowed total.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub items: Vec<T>,
    pub page_info: PageInfo,
    pub total_count: u64,
}

/// Builds page URLs against a collection endpoint such as
/// `http://host/api/scenes`.
#[derive(Debug, Clone)]
pub struct PageLinks {
    base: String,
}

impl PageLinks {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn first_page(&self, size: u32) -> String {
        format!("{}?first={size}", self.base)
    }

    pub fn last_page(&self, size: u32) -> String {
        format!("{}?last={size}", self.base)
    }

    pub fn next_page(&self, size: u32, after: Position) -> String {
        format!("{}?first={size}&after={}", self.base, encode_cursor(after))
    }

    pub fn previous_page(&self, size: u32, before: Position) -> String {
        format!("{}?last={size}&before={}", self.base, encode_cursor(before))
    }

    /// Wraps a fetched page, mapping every record through `view`.
    ///
    /// Cursors come from the first and last record of the page. An empty page
    /// that still has a neighbour links to the first (next) or last
    /// (previous) page: nothing lies on the far side of its boundary.
    pub fn assemble<R, T, F>(&self, page: Page<R>, request: &PageRequest, view: F) -> Connection<T>
    where
        R: Record,
        F: FnMut(R) -> T,
    {
        let size = request.page_size();
        let first_position = page.items.first().map(Record::position);
        let last_position = page.items.last().map(Record::position);

        let next_page_url = page.has_next_page.then(|| match last_position {
            Some(position) => self.next_page(size, position),
            None => self.first_page(size),
        });
        let previous_page_url = page.has_previous_page.then(|| match first_position {
            Some(position) => self.previous_page(size, position),
            None => self.last_page(size),
        });

        let page_info = PageInfo {
            count: page.items.len(),
            has_next_page: page.has_next_page,
            has_previous_page: page.has_previous_page,
            first_page_url: self.first_page(size),
            last_page_url: self.last_page(size),
            next_page_url,
            previous_page_url,
        };

        Connection {
            items: page.items.into_iter().map(view).collect(),
            page_info,
            total_count: page.total_count,
        }
    }
}
