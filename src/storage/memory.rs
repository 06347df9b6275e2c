//! In-memory segmented table
//!
//! Items are assigned to segments by position: item `p` belongs to segment
//! `p % total_segments`. The cursor is the position of the last item
//! returned, so a page resumes strictly after it.

use super::{Page, PageRequest, SegmentReader};
use crate::error::{StorageError, StorageResult};

/// Page size used when a request carries no limit
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// A named table held entirely in memory
#[derive(Debug, Clone)]
pub struct MemoryTable<T> {
    name: String,
    items: Vec<T>,
}

impl<T> MemoryTable<T> {
    /// Create a table from a list of items
    pub fn new(name: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of items across all segments
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the table has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items that fall into `segment` of `total_segments`
    pub fn segment_len(&self, segment: u32, total_segments: u32) -> usize {
        if total_segments == 0 || segment >= total_segments {
            return 0;
        }
        let (segment, total) = (segment as usize, total_segments as usize);
        if segment >= self.items.len() {
            0
        } else {
            (self.items.len() - segment - 1) / total + 1
        }
    }
}

impl<T: Clone + Send + Sync + 'static> SegmentReader for MemoryTable<T> {
    type Item = T;
    type Cursor = usize;

    fn read_page(&self, request: PageRequest<'_, usize>) -> StorageResult<Page<T, usize>> {
        if request.table != self.name {
            return Err(StorageError::TableNotFound {
                table: request.table.to_string(),
            });
        }

        if request.total_segments == 0 || request.segment >= request.total_segments {
            return Err(StorageError::InvalidRequest(format!(
                "segment {} is outside 0..{}",
                request.segment, request.total_segments
            )));
        }

        let limit = match request.limit {
            Some(0) => {
                return Err(StorageError::InvalidRequest("limit must be at least 1".into()));
            }
            Some(limit) => limit as usize,
            None => DEFAULT_PAGE_SIZE,
        };

        let step = request.total_segments as usize;
        let first = match request.start {
            None => request.segment as usize,
            Some(&last) => {
                if last % step != request.segment as usize {
                    return Err(StorageError::InvalidRequest(format!(
                        "cursor {} does not belong to segment {}",
                        last, request.segment
                    )));
                }
                last + step
            }
        };

        let positions: Vec<usize> = (first..self.items.len()).step_by(step).take(limit).collect();
        let items = positions.iter().map(|&p| self.items[p].clone()).collect();

        let next = match positions.last() {
            Some(&last) if last + step < self.items.len() => Some(last),
            _ => None,
        };

        Ok(Page { items, next })
    }
}
