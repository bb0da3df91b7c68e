//! Opaque cursor tokens backed by record positions.
//!
//! A token is the URL-safe base64 of `<rfc3339 created>|<uuid id>`.

use super::Position;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;
use uuid::Uuid;

const SEPARATOR: char = '|';

/// Encodes a record position as a URL-safe token.
///
/// Timestamps are rendered at microsecond precision, which is also the
/// precision the stores keep, so every stored record round-trips.
pub fn encode_cursor(position: Position) -> String {
    let created = position.created.to_rfc3339_opts(SecondsFormat::Micros, true);
    URL_SAFE_NO_PAD.encode(format!("{created}{SEPARATOR}{}", position.id))
}

/// Decodes a token produced by [`encode_cursor`].
///
/// Anything malformed yields `None`, which callers treat exactly like a
/// missing boundary.
pub fn decode_cursor(cursor: &str) -> Option<Position> {
    let bytes = match URL_SAFE_NO_PAD.decode(cursor.trim()) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!(error = %err, "ignoring cursor with invalid encoding");
            return None;
        }
    };

    let text = std::str::from_utf8(&bytes).ok()?;
    let Some((created, id)) = text.split_once(SEPARATOR) else {
        debug!("ignoring cursor without a record id");
        return None;
    };

    let created = match DateTime::parse_from_rfc3339(created) {
        Ok(created) => created.with_timezone(&Utc),
        Err(err) => {
            debug!(error = %err, "ignoring cursor with invalid timestamp");
            return None;
        }
    };
    match Uuid::parse_str(id) {
        Ok(id) => Some(Position::new(created, id)),
        Err(err) => {
            debug!(error = %err, "ignoring cursor with invalid record id");
            None
        }
    }
}
