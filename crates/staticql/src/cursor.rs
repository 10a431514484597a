//! Cursor codec & pager.
//!
//! A cursor is `{slug, order: {orderByField: value}}`, opaque to callers,
//! serialized as UTF-8 JSON and then Base64-encoded. Both the standard and
//! URL-safe alphabets are accepted on decode (callers may have passed the
//! cursor through a URL query string or a plain JSON body).

use std::collections::BTreeMap;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{QueryEngineError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub slug: String,
    pub order: BTreeMap<String, String>,
}

impl Cursor {
    pub fn new(slug: impl Into<String>, order_field: &str, order_value: impl Into<String>) -> Self {
        let mut order = BTreeMap::new();
        order.insert(order_field.to_string(), order_value.into());
        Cursor {
            slug: slug.into(),
            order,
        }
    }

    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE.encode(json))
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = [URL_SAFE, STANDARD, URL_SAFE_NO_PAD, STANDARD_NO_PAD]
            .iter()
            .find_map(|engine| engine.decode(encoded).ok())
            .ok_or_else(|| QueryEngineError::InvalidCursor(format!("not valid base64: {encoded}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|err| QueryEngineError::InvalidCursor(format!("malformed cursor payload: {err}")))
    }
}

/// A row of the matched sequence a page is sliced from. Implemented by the
/// planner's internal `Row` type; kept as a trait here so the pager has no
/// dependency on the query module.
pub trait Ordered {
    fn slug(&self) -> &str;
    fn order_value(&self, order_field: &str) -> Option<&str>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    After,
    Before,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// Locates the index of the matched row the cursor anchors to. Returns 0
/// when no cursor was supplied; a cursor that cannot be located is an
/// error, never a silent fallback to the start of the sequence.
pub fn get_start_idx<T: Ordered>(rows: &[T], order_field: &str, cursor: Option<&Cursor>) -> Result<usize> {
    let Some(cursor) = cursor else {
        return Ok(0);
    };
    let wanted = cursor.order.get(order_field).ok_or_else(|| {
        QueryEngineError::InvalidCursor(format!("cursor has no value for order field {order_field}"))
    })?;
    rows.iter()
        .position(|row| row.slug() == cursor.slug && row.order_value(order_field) == Some(wanted.as_str()))
        .ok_or_else(|| {
            QueryEngineError::InvalidCursor(format!("cursor slug {} not found in matched rows", cursor.slug))
        })
}

/// Exclusive-of-anchor slice in the requested direction. `start` is the
/// value returned by [`get_start_idx`]; `has_cursor` distinguishes "anchored
/// at row 0" from "no cursor was supplied" (both locate at index 0 but slice
/// differently - see module docs).
pub fn get_page_slice<T: Clone>(rows: &[T], start: usize, size: usize, has_cursor: bool, direction: Direction) -> Vec<T> {
    let total = rows.len();
    match direction {
        Direction::After => {
            let begin = if has_cursor { (start + 1).min(total) } else { 0 };
            let end = (begin + size).min(total);
            rows[begin..end].to_vec()
        }
        Direction::Before => {
            let end = if has_cursor { start } else { total };
            let begin = end.saturating_sub(size);
            rows[begin..end].to_vec()
        }
    }
}

pub fn create_page_info<T: Ordered + Clone>(
    rows: &[T],
    start: usize,
    size: usize,
    has_cursor: bool,
    direction: Direction,
    order_field: &str,
) -> Result<PageInfo> {
    let total = rows.len();
    let (has_next, has_prev) = match direction {
        Direction::After => {
            let begin = if has_cursor { start + 1 } else { 0 };
            (begin + size < total, begin > 0)
        }
        Direction::Before => {
            let end = if has_cursor { start } else { total };
            (end < total, end.saturating_sub(size) > 0)
        }
    };

    let page = get_page_slice(rows, start, size, has_cursor, direction);
    let start_cursor = page
        .first()
        .map(|row| cursor_for(row, order_field))
        .transpose()?
        .map(|c| c.encode())
        .transpose()?;
    let end_cursor = page
        .last()
        .map(|row| cursor_for(row, order_field))
        .transpose()?
        .map(|c| c.encode())
        .transpose()?;

    Ok(PageInfo {
        has_next_page: has_next,
        has_previous_page: has_prev,
        start_cursor,
        end_cursor,
    })
}

fn cursor_for<T: Ordered>(row: &T, order_field: &str) -> Result<Cursor> {
    let value = row.order_value(order_field).ok_or_else(|| {
        QueryEngineError::OrderByNeedsIndex {
            field: order_field.to_string(),
        }
    })?;
    Ok(Cursor::new(row.slug().to_string(), order_field, value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Row {
        slug: String,
        value: String,
    }

    impl Ordered for Row {
        fn slug(&self) -> &str {
            &self.slug
        }
        fn order_value(&self, _order_field: &str) -> Option<&str> {
            Some(&self.value)
        }
    }

    fn rows(slugs: &[&str]) -> Vec<Row> {
        slugs
            .iter()
            .map(|s| Row {
                slug: s.to_string(),
                value: s.to_string(),
            })
            .collect()
    }

    #[test]
    fn cursor_round_trips() {
        let cursor = Cursor::new("arctium-lappa", "slug", "arctium-lappa");
        let encoded = cursor.encode().unwrap();
        assert_eq!(Cursor::decode(&encoded).unwrap(), cursor);
    }

    #[test]
    fn decodes_standard_and_url_safe() {
        let cursor = Cursor::new("a/b", "slug", "a/b");
        let json = serde_json::to_vec(&cursor).unwrap();
        let std_encoded = STANDARD.encode(&json);
        assert_eq!(Cursor::decode(&std_encoded).unwrap(), cursor);
    }

    #[test]
    fn no_cursor_starts_at_zero_with_no_previous_page() {
        let rows = rows(&["a", "b", "c"]);
        let start = get_start_idx(&rows, "slug", None).unwrap();
        assert_eq!(start, 0);
        let page = get_page_slice(&rows, start, 2, false, Direction::After);
        assert_eq!(page.len(), 2);
        let info = create_page_info(&rows, start, 2, false, Direction::After, "slug").unwrap();
        assert!(!info.has_previous_page);
        assert!(info.has_next_page);
    }

    #[test]
    fn cursor_excludes_anchor_forward() {
        let rows = rows(&["a", "b", "c"]);
        let cursor = Cursor::new("a", "slug", "a");
        let start = get_start_idx(&rows, "slug", Some(&cursor)).unwrap();
        let page = get_page_slice(&rows, start, 20, true, Direction::After);
        assert_eq!(page.iter().map(|r| r.slug.as_str()).collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn invalid_cursor_slug_is_an_error() {
        let rows = rows(&["a", "b"]);
        let cursor = Cursor::new("missing", "slug", "missing");
        assert!(get_start_idx(&rows, "slug", Some(&cursor)).is_err());
    }
}
