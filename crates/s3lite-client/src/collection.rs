//! Append-only ordered record collection.

use std::ops::Range;

use tokio::sync::mpsc;

/// Describes one successful [`PaginatedCollection::append_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionChange {
    /// Indices of the newly appended records.
    pub range: Range<usize>,
    /// Total record count after the append.
    pub count: usize,
}

/// An ordered sequence of records that only ever grows.
///
/// Indices are stable: a record keeps its index for the lifetime of the
/// collection. Observers registered with [`subscribe`](Self::subscribe)
/// receive a [`CollectionChange`] for every non-empty append.
///
/// # Examples
///
/// ```
/// use s3lite_client::PaginatedCollection;
///
/// let mut collection = PaginatedCollection::new();
/// assert!(collection.append_batch(Vec::<u32>::new()).is_none());
///
/// collection.append_batch(vec![1, 2]);
/// let change = collection.append_batch(vec![3]).unwrap();
/// assert_eq!(change.range, 2..3);
/// assert_eq!(collection.count(), 3);
/// assert_eq!(collection.at(2), Some(&3));
/// assert_eq!(collection.at(3), None);
/// ```
#[derive(Debug)]
pub struct PaginatedCollection<T> {
    records: Vec<T>,
    subscribers: Vec<mpsc::UnboundedSender<CollectionChange>>,
}

impl<T> Default for PaginatedCollection<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            subscribers: Vec::new(),
        }
    }
}

impl<T> PaginatedCollection<T> {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    #[must_use]
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Whether the collection holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The record at `index`, or `None` when out of range.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&T> {
        self.records.get(index)
    }

    /// Iterate over the records in order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    /// Register an observer for future appends.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<CollectionChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Append `batch` to the end of the collection.
    ///
    /// An empty batch is a no-op and notifies nobody. Otherwise all records
    /// are appended before any observer is notified.
    pub fn append_batch(&mut self, batch: Vec<T>) -> Option<CollectionChange> {
        if batch.is_empty() {
            return None;
        }

        let start = self.records.len();
        self.records.extend(batch);
        let change = CollectionChange {
            range: start..self.records.len(),
            count: self.records.len(),
        };

        // Receivers that were dropped are forgotten.
        self.subscribers
            .retain(|tx| tx.send(change.clone()).is_ok());

        Some(change)
    }
}

impl<'a, T> IntoIterator for &'a PaginatedCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
