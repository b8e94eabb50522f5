use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ClassificationError;
use crate::models::{Review, Sentiment, Theme};

/// The only review fields that ever leave the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationRequest {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification<'a> {
    pub id: &'a str,
    pub sentiment: Sentiment,
    pub theme: Theme,
}

/// Item of the `classifications` array as the capability returns it.
/// Enum values are checked after decoding so one bad item cannot sink the batch.
#[derive(Debug, Clone, Deserialize)]
pub struct RawClassification {
    pub id: String,
    pub sentiment: String,
    pub theme: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationResponse {
    pub classifications: Option<Vec<RawClassification>>,
}

/// External text-classification capability.
pub trait ReviewClassifier {
    fn classify(
        &self,
        requests: &[ClassificationRequest],
    ) -> impl Future<Output = Result<ClassificationResponse, ClassificationError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedBatch {
    pub reviews: Vec<Review>,
    pub sent: usize,
    pub classified: usize,
    pub missing: Vec<String>,
}

#[derive(Debug)]
pub enum ClassificationOutcome {
    Classified(ClassifiedBatch),
    Unavailable {
        reviews: Vec<Review>,
        error: ClassificationError,
    },
}

/// Sends every review with text in one request and merges the answers back by id.
///
/// Reviews without text are never sent and keep their defaults. The result
/// lists the reviews that were sent first, then the ones without text, each
/// group in its original order.
pub async fn classify_reviews<C: ReviewClassifier>(
    classifier: &C,
    reviews: &[Review],
) -> Result<ClassifiedBatch, ClassificationError> {
    let (with_text, without_text): (Vec<&Review>, Vec<&Review>) =
        reviews.iter().partition(|review| review.has_text());

    if with_text.is_empty() {
        return Ok(ClassifiedBatch {
            reviews: reviews.to_vec(),
            sent: 0,
            classified: 0,
            missing: Vec::new(),
        });
    }

    let requests: Vec<ClassificationRequest> = with_text
        .iter()
        .map(|review| ClassificationRequest {
            id: review.id.clone(),
            text: review.text.clone(),
        })
        .collect();

    let response = classifier.classify(&requests).await?;
    let raw = response.classifications.ok_or_else(|| {
        ClassificationError::MalformedResponse("missing `classifications` field".to_string())
    })?;

    let by_id: HashMap<&str, Classification<'_>> = raw
        .iter()
        .filter_map(|item| match validate_item(item) {
            Ok(classification) => Some((classification.id, classification)),
            Err(reason) => {
                tracing::warn!(id = %item.id, %reason, "ignoring classification");
                None
            }
        })
        .collect();

    let mut merged = Vec::with_capacity(reviews.len());
    let mut classified = 0usize;
    let mut missing = Vec::new();

    for review in &with_text {
        let mut review = (*review).clone();
        match by_id.get(review.id.as_str()) {
            Some(classification) => {
                review.sentiment = classification.sentiment;
                review.theme = classification.theme;
                classified += 1;
            }
            None => missing.push(review.id.clone()),
        }
        merged.push(review);
    }
    merged.extend(without_text.into_iter().cloned());

    if !missing.is_empty() {
        tracing::warn!(
            missing = missing.len(),
            "classifier omitted some reviews; defaults kept"
        );
    }

    Ok(ClassifiedBatch {
        reviews: merged,
        sent: requests.len(),
        classified,
        missing,
    })
}

fn validate_item(item: &RawClassification) -> Result<Classification<'_>, String> {
    Ok(Classification {
        id: item.id.as_str(),
        sentiment: item.sentiment.parse()?,
        theme: item.theme.parse()?,
    })
}

/// Upload policy: any classification failure, including the timeout, hands
/// back the unmodified input so the data can still be browsed.
pub async fn classify_or_fallback<C: ReviewClassifier>(
    classifier: &C,
    reviews: Vec<Review>,
    timeout: Duration,
) -> ClassificationOutcome {
    let attempt = tokio::time::timeout(timeout, classify_reviews(classifier, &reviews)).await;
    let result = match attempt {
        Ok(result) => result,
        Err(_) => Err(ClassificationError::Timeout(timeout.as_secs())),
    };

    match result {
        Ok(batch) => {
            tracing::info!(
                sent = batch.sent,
                classified = batch.classified,
                "classification complete"
            );
            ClassificationOutcome::Classified(batch)
        }
        Err(error) => {
            tracing::warn!(%error, "classification unavailable, keeping default labels");
            ClassificationOutcome::Unavailable { reviews, error }
        }
    }
}
