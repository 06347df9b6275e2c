//! Page handler capability
//!
//! The handler is called synchronously by a segment worker with every page
//! it reads. The worker does not request the next page of its segment until
//! the handler returns, so a slow handler directly throttles the read rate of
//! that segment. Handlers of different segments run concurrently.

/// Receives the items of every page read by a scan
pub trait ItemHandler<T>: Send + Sync {
    /// Process one page of items (may be empty)
    fn handle_items(&self, items: Vec<T>);
}

impl<T, F> ItemHandler<T> for F
where
    F: Fn(Vec<T>) + Send + Sync,
{
    fn handle_items(&self, items: Vec<T>) {
        self(items)
    }
}
