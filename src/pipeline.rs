use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::classify::{self, ClassificationOutcome, ReviewClassifier};
use crate::error::ClassificationError;
use crate::ingest::{self, SourceLayout};
use crate::models::ClassificationStatus;
use crate::store::{Dataset, DatasetSink, DatasetStore};

#[derive(Debug)]
pub struct UploadSummary {
    pub dataset: Arc<Dataset>,
    pub layout: SourceLayout,
    /// Rows written by the sink.
    pub stored: usize,
    /// Set when classification was attempted and fell back to defaults.
    pub classification_error: Option<ClassificationError>,
}

/// One upload, end to end: header check, normalization, one classification
/// batch, persistence, then an atomic swap of the current dataset.
///
/// The upload gate stays closed until the sink has committed, so a second
/// upload cannot start while classification or persistence is in flight.
/// Validation and sink errors abort before the store is touched.
/// Classification errors do not; the dataset is published with status
/// `loaded` instead of `classified`. Files in the explorer layout already
/// carry labels and skip classification.
pub async fn upload<R: Read, C: ReviewClassifier, S: DatasetSink>(
    store: &DatasetStore,
    sink: &S,
    source_name: &str,
    reader: R,
    classifier: Option<&C>,
    timeout: Duration,
) -> anyhow::Result<UploadSummary> {
    let guard = store.begin_upload()?;
    let normalized = ingest::load_reviews(reader)?;
    tracing::info!(
        source = source_name,
        reviews = normalized.reviews.len(),
        "reviews loaded"
    );

    let (reviews, status, classification_error) = match (normalized.layout, classifier) {
        (SourceLayout::ReviewExplorer, _) => {
            (normalized.reviews, ClassificationStatus::Classified, None)
        }
        (SourceLayout::StoreExport, None) => {
            (normalized.reviews, ClassificationStatus::Loaded, None)
        }
        (SourceLayout::StoreExport, Some(classifier)) => {
            match classify::classify_or_fallback(classifier, normalized.reviews, timeout).await {
                ClassificationOutcome::Classified(batch) => {
                    (batch.reviews, ClassificationStatus::Classified, None)
                }
                ClassificationOutcome::Unavailable { reviews, error } => {
                    (reviews, ClassificationStatus::Loaded, Some(error))
                }
            }
        }
    };

    let dataset = Dataset {
        source_name: source_name.to_string(),
        loaded_at: Utc::now(),
        status,
        reviews: reviews.into(),
    };
    let stored = sink.replace(&dataset).await?;
    let dataset = guard.commit(dataset);

    Ok(UploadSummary {
        dataset,
        layout: normalized.layout,
        stored,
        classification_error,
    })
}
