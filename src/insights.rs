use serde::{Deserialize, Serialize};

use crate::config::MarketContext;
use crate::models::{Review, Sentiment, Theme};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwotItem {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SwotAnalysis {
    #[serde(default)]
    pub strengths: Vec<SwotItem>,
    #[serde(default)]
    pub weaknesses: Vec<SwotItem>,
    #[serde(default)]
    pub opportunities: Vec<SwotItem>,
    #[serde(default)]
    pub threats: Vec<SwotItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Recommendations {
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwotRequest {
    pub positive_reviews: String,
    pub negative_reviews: String,
    pub market_trends: String,
    pub competitor_analysis: String,
    pub review_count: usize,
    pub crash_count: usize,
}

impl SwotRequest {
    pub fn from_reviews(reviews: &[Review], context: &MarketContext) -> Self {
        Self {
            positive_reviews: join_texts(reviews, Sentiment::Positive),
            negative_reviews: join_texts(reviews, Sentiment::Negative),
            market_trends: context.market_trends.clone(),
            competitor_analysis: context.competitor_analysis.clone(),
            review_count: reviews.len(),
            crash_count: reviews
                .iter()
                .filter(|review| review.theme == Theme::Crash)
                .count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub identified_weaknesses: String,
    pub negative_reviews: String,
}

impl RecommendationRequest {
    /// Recommendations are derived from SWOT weaknesses; without any there is
    /// nothing to ask for.
    pub fn from_swot(swot: &SwotAnalysis, reviews: &[Review]) -> Option<Self> {
        if swot.weaknesses.is_empty() {
            return None;
        }

        let identified_weaknesses = swot
            .weaknesses
            .iter()
            .map(|item| format!("{}: {}", item.title, item.description))
            .collect::<Vec<_>>()
            .join("\n");

        Some(Self {
            identified_weaknesses,
            negative_reviews: join_texts(reviews, Sentiment::Negative),
        })
    }
}

fn join_texts(reviews: &[Review], sentiment: Sentiment) -> String {
    reviews
        .iter()
        .filter(|review| review.sentiment == sentiment)
        .map(|review| review.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;

    fn review(id: &str, sentiment: Sentiment, theme: Theme, text: &str) -> Review {
        Review {
            id: id.to_string(),
            platform: Platform::Ios,
            author: "Anonymous".to_string(),
            rating: 3,
            text: text.to_string(),
            date: "2024-01-10T00:00:00.000Z".to_string(),
            sentiment,
            theme,
        }
    }

    fn context() -> MarketContext {
        MarketContext {
            market_trends: "trends".to_string(),
            competitor_analysis: "competitors".to_string(),
        }
    }

    #[test]
    fn swot_request_splits_by_sentiment_and_counts_crashes() {
        let reviews = vec![
            review("1", Sentiment::Positive, Theme::InterfaceUi, "Clean design"),
            review("2", Sentiment::Negative, Theme::Crash, "Crashes on login"),
            review("3", Sentiment::Negative, Theme::Crash, "Freezes"),
            review("4", Sentiment::Neutral, Theme::General, "Okay"),
        ];
        let request = SwotRequest::from_reviews(&reviews, &context());

        assert_eq!(request.positive_reviews, "Clean design");
        assert_eq!(request.negative_reviews, "Crashes on login\nFreezes");
        assert_eq!(request.review_count, 4);
        assert_eq!(request.crash_count, 2);
    }

    #[test]
    fn recommendations_need_weaknesses() {
        let reviews = vec![review("1", Sentiment::Negative, Theme::Upi, "UPI broken")];
        assert!(RecommendationRequest::from_swot(&SwotAnalysis::default(), &reviews).is_none());

        let swot = SwotAnalysis {
            weaknesses: vec![SwotItem {
                title: "UPI failures".to_string(),
                description: "Payments churn to competitors".to_string(),
            }],
            ..SwotAnalysis::default()
        };
        let request = RecommendationRequest::from_swot(&swot, &reviews).unwrap();
        assert_eq!(
            request.identified_weaknesses,
            "UPI failures: Payments churn to competitors"
        );
        assert_eq!(request.negative_reviews, "UPI broken");
    }

    #[test]
    fn request_serializes_with_camel_case_keys() {
        let request = SwotRequest::from_reviews(&[], &context());
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["reviewCount"], 0);
        assert_eq!(value["marketTrends"], "trends");
    }
}
