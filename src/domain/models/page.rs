//! One page of a listing call and the cursor types used to request the next.
//!
//! Cursors are opaque: they are only ever produced by the store and handed
//! back to it unchanged.

/// Largest page any listing call asks for
pub const MAX_PAGE_SIZE: usize = 1000;

/// `NextMarker` of a marker-based object listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMarker(pub String);

/// `NextContinuationToken` of a V2 object listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationToken(pub String);

/// `NextKeyMarker` / `NextUploadIdMarker` pair of a multipart upload listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCursor {
    pub key_marker: String,
    pub upload_id_marker: Option<String>,
}

/// A single page returned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T, C> {
    pub items: Vec<T>,
    pub next_cursor: Option<C>,
    pub truncated: bool,
}

/// What to do after consuming a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation<C> {
    /// Request the next page with this cursor
    Next(C),
    /// The store reported no truncation; the listing is complete
    Exhausted,
    /// The store reported truncation but gave no cursor to continue with
    Stalled,
}

impl<T, C> Page<T, C> {
    /// A final (non-truncated) page
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
            truncated: false,
        }
    }

    /// A truncated page that continues at `cursor`
    pub fn truncated(items: Vec<T>, cursor: C) -> Self {
        Self {
            items,
            next_cursor: Some(cursor),
            truncated: true,
        }
    }

    pub fn split(self) -> (Vec<T>, Continuation<C>) {
        let continuation = match (self.truncated, self.next_cursor) {
            (false, _) => Continuation::Exhausted,
            (true, Some(cursor)) => Continuation::Next(cursor),
            (true, None) => Continuation::Stalled,
        };
        (self.items, continuation)
    }
}
