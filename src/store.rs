use std::future::Future;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::models::{ClassificationStatus, Review};

/// Current dataset plus how it got there. Replaced as a whole, never edited.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source_name: String,
    pub loaded_at: DateTime<Utc>,
    pub status: ClassificationStatus,
    pub reviews: Arc<[Review]>,
}

/// Durable home of the current dataset. Replacing it must be all or nothing.
pub trait DatasetSink {
    fn replace(&self, dataset: &Dataset) -> impl Future<Output = anyhow::Result<usize>> + Send;
}

/// Sole owner of the current review set. Readers get cheap snapshots;
/// writers must hold an `UploadGuard`, and only one can exist at a time.
pub struct DatasetStore {
    current: RwLock<Option<Arc<Dataset>>>,
    upload: Mutex<()>,
}

/// Proof that the caller is the single in-flight upload. Dropping it, on any
/// path, reopens the store for the next upload.
pub struct UploadGuard<'a> {
    store: &'a DatasetStore,
    _permit: MutexGuard<'a, ()>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            upload: Mutex::new(()),
        }
    }

    /// Store that starts out serving a dataset loaded from elsewhere.
    pub fn with_dataset(dataset: Dataset) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(dataset))),
            upload: Mutex::new(()),
        }
    }

    /// `None` until the first upload commits.
    pub fn snapshot(&self) -> Option<Arc<Dataset>> {
        match self.current.read() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn begin_upload(&self) -> Result<UploadGuard<'_>, StoreError> {
        let permit = self
            .upload
            .try_lock()
            .map_err(|_| StoreError::UploadInProgress)?;
        Ok(UploadGuard {
            store: self,
            _permit: permit,
        })
    }
}

impl Default for DatasetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadGuard<'_> {
    /// Swaps in the new dataset in one step and returns the published snapshot.
    pub fn commit(self, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        let mut current = match self.store.current.write() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = Some(Arc::clone(&dataset));
        dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Platform, Sentiment, Theme};

    fn dataset(ids: &[&str]) -> Dataset {
        let reviews: Vec<Review> = ids
            .iter()
            .map(|id| Review {
                id: id.to_string(),
                platform: Platform::Ios,
                author: "Anonymous".to_string(),
                rating: 5,
                text: String::new(),
                date: "2024-01-01T00:00:00.000Z".to_string(),
                sentiment: Sentiment::Neutral,
                theme: Theme::General,
            })
            .collect();
        Dataset {
            source_name: "reviews.csv".to_string(),
            loaded_at: Utc::now(),
            status: ClassificationStatus::Classified,
            reviews: reviews.into(),
        }
    }

    #[test]
    fn second_upload_is_rejected_while_first_is_in_flight() {
        let store = DatasetStore::new();
        let first = store.begin_upload().unwrap();
        assert_eq!(store.begin_upload().err(), Some(StoreError::UploadInProgress));

        drop(first);
        assert!(store.begin_upload().is_ok());
    }

    #[test]
    fn commit_replaces_dataset_wholesale() {
        let store = DatasetStore::with_dataset(dataset(&["a", "b"]));
        let before = store.snapshot().unwrap();

        store.begin_upload().unwrap().commit(dataset(&["c"]));
        let after = store.snapshot().unwrap();

        assert_eq!(before.reviews.len(), 2);
        assert_eq!(after.reviews.len(), 1);
        assert_eq!(after.reviews[0].id, "c");
    }

    #[test]
    fn new_store_has_no_dataset() {
        let store = DatasetStore::default();
        assert!(store.snapshot().is_none());
    }
}
