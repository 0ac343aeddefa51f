//! Observable collection contract and a watch-channel backed implementation.

use std::sync::Arc;

use tokio::sync::watch;

/// Mutable observable container the coordinator writes to.
///
/// Every successful write produces a new version; versions only grow.
pub trait ObservableCollection<T>: Send + Sync {
    /// Copy of the current contents.
    fn read(&self) -> Vec<T>;

    /// Replace the contents and return the new version.
    fn replace(&self, items: Vec<T>) -> u64;

    /// Replace the contents in one step, returning the revision that was
    /// replaced and the new version. No other write can land between the
    /// two.
    fn swap(&self, items: Vec<T>) -> (Revision<T>, u64);

    /// Current version.
    fn version(&self) -> u64;

    /// Replace the contents only if the version still equals `expected`.
    ///
    /// # Errors
    ///
    /// Returns the current version when it no longer matches `expected`.
    fn replace_if_version(&self, expected: u64, items: Vec<T>) -> Result<u64, u64>;
}

/// Contents of a [`SharedCollection`] together with their version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision<T> {
    /// Incremented on every write.
    pub version: u64,
    /// Current items.
    pub items: Vec<T>,
}

/// Cloneable handle to a collection observed through a `tokio::sync::watch`
/// channel. All clones read and write the same contents.
#[derive(Debug)]
pub struct SharedCollection<T> {
    sender: Arc<watch::Sender<Revision<T>>>,
}

impl<T> Clone for SharedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T> SharedCollection<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a collection at version 0.
    pub fn new(items: Vec<T>) -> Self {
        let (sender, _) = watch::channel(Revision { version: 0, items });
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Subscribe to every subsequent write.
    pub fn subscribe(&self) -> watch::Receiver<Revision<T>> {
        self.sender.subscribe()
    }

    /// Current contents and version.
    pub fn revision(&self) -> Revision<T> {
        self.sender.borrow().clone()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.sender.borrow().items.len()
    }

    /// True when the collection holds no items.
    pub fn is_empty(&self) -> bool {
        self.sender.borrow().items.is_empty()
    }
}

impl<T> Default for SharedCollection<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> ObservableCollection<T> for SharedCollection<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn read(&self) -> Vec<T> {
        self.sender.borrow().items.clone()
    }

    fn replace(&self, items: Vec<T>) -> u64 {
        let mut version = 0;
        self.sender.send_modify(|revision| {
            revision.version += 1;
            revision.items = items;
            version = revision.version;
        });
        version
    }

    fn swap(&self, items: Vec<T>) -> (Revision<T>, u64) {
        let mut previous = Revision {
            version: 0,
            items: Vec::new(),
        };
        self.sender.send_modify(|revision| {
            previous.version = revision.version;
            previous.items = std::mem::replace(&mut revision.items, items);
            revision.version += 1;
        });
        let version = previous.version + 1;
        (previous, version)
    }

    fn version(&self) -> u64 {
        self.sender.borrow().version
    }

    fn replace_if_version(&self, expected: u64, items: Vec<T>) -> Result<u64, u64> {
        let mut outcome = Err(expected);
        let mut items = Some(items);
        self.sender.send_if_modified(|revision| {
            if revision.version != expected {
                outcome = Err(revision.version);
                return false;
            }
            revision.version += 1;
            revision.items = items.take().unwrap_or_default();
            outcome = Ok(revision.version);
            true
        });
        outcome
    }
}
