//! Storage access module
//!
//! A scan talks to the remote table through a single capability: reading one
//! page of one segment. Anything that can do that implements
//! [`SegmentReader`] and can be driven by the [`Scanner`](crate::Scanner).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │               SegmentReader (shared)                │
//! │  - One handle for all segment workers               │
//! │  - Must tolerate concurrent read_page calls         │
//! │  - Stateless per call: position lives in the cursor │
//! └─────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                 Remote table service                │
//! │  - Segment i of N, starting after a cursor          │
//! │  - Returns items + next cursor (None = exhausted)   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Two local backends are provided: [`MemoryTable`] and [`JsonLinesTable`].
//!
//! # Example
//!
//! ```
//! use table_scanner::storage::{MemoryTable, PageRequest, SegmentReader};
//!
//! let table = MemoryTable::new("users", (0..25).collect::<Vec<u32>>());
//!
//! let page = table
//!     .read_page(PageRequest {
//!         table: "users",
//!         segment: 0,
//!         total_segments: 1,
//!         start: None,
//!         limit: Some(10),
//!     })
//!     .unwrap();
//!
//! assert_eq!(page.items.len(), 10);
//! assert!(page.next.is_some());
//! ```

mod jsonl;
mod memory;

pub use jsonl::JsonLinesTable;
pub use memory::{MemoryTable, DEFAULT_PAGE_SIZE};

use crate::error::StorageResult;
use std::fmt;

/// A request for one page of one segment
#[derive(Debug)]
pub struct PageRequest<'a, K> {
    /// Table to read from
    pub table: &'a str,

    /// Global segment index, in `0..total_segments`
    pub segment: u32,

    /// Number of segments the table is divided into across all processes
    pub total_segments: u32,

    /// Resume after this cursor (`None` for the first page)
    pub start: Option<&'a K>,

    /// Maximum number of items to return (`None` lets the service decide)
    pub limit: Option<u32>,
}

/// One page of items returned by a [`SegmentReader`]
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T, K> {
    /// Items in this page (may be empty)
    pub items: Vec<T>,

    /// Where the next page starts; `None` means the segment is exhausted
    pub next: Option<K>,
}

impl<T, K> Page<T, K> {
    /// Create a page that has more pages after it
    pub fn more(items: Vec<T>, next: K) -> Self {
        Self {
            items,
            next: Some(next),
        }
    }

    /// Create the final page of a segment
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }

    /// Returns true if this is the final page of the segment
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

/// Paginated, segmented read access to a table
///
/// Implementations are shared by every segment worker of a scan and are
/// called from several threads at once.
pub trait SegmentReader: Send + Sync {
    /// Record type returned by the table
    type Item: Send + 'static;

    /// Opaque continuation token
    type Cursor: Clone + Send + fmt::Debug + 'static;

    /// Read one page
    fn read_page(
        &self,
        request: PageRequest<'_, Self::Cursor>,
    ) -> StorageResult<Page<Self::Item, Self::Cursor>>;
}
