//! Session-scoped set of filenames kept out of the rotation.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::watch;

/// Shared, immutable view of the excluded names at one point in time.
pub type ExclusionSnapshot = Arc<HashSet<String>>;

/// Writer side of the exclusion set.
///
/// Owned by the control context. Names can only be added; a session starts
/// empty and nothing is persisted.
#[derive(Debug)]
pub struct ExclusionSet {
    tx: watch::Sender<ExclusionSnapshot>,
}

/// Reader side handed to the cadence loop.
#[derive(Debug, Clone)]
pub struct ExclusionReader {
    rx: watch::Receiver<ExclusionSnapshot>,
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ExclusionSet {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(HashSet::new()));
        Self { tx }
    }

    /// Insert `name`. Returns `false` if it was already excluded.
    pub fn exclude(&self, name: impl Into<String>) -> bool {
        let name = name.into();
        self.tx
            .send_if_modified(|set| !set.contains(&name) && Arc::make_mut(set).insert(name))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tx.borrow().contains(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    #[must_use]
    pub fn snapshot(&self) -> ExclusionSnapshot {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn reader(&self) -> ExclusionReader {
        ExclusionReader {
            rx: self.tx.subscribe(),
        }
    }
}

impl ExclusionReader {
    /// Latest published set. Cheap: clones an `Arc`, never the set.
    #[must_use]
    pub fn snapshot(&self) -> ExclusionSnapshot {
        self.rx.borrow().clone()
    }
}
