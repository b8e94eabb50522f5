use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::models::{AggregateStats, DailySentiment, Review, Sentiment, ThemeMention, WorstDay};

const NOT_AVAILABLE: &str = "N/A";

/// Statistics shared by every view. Works on any subset of a dataset, and on
/// an empty one without dividing by zero.
pub fn aggregate(reviews: &[Review]) -> AggregateStats {
    let total = reviews.len();
    let count = |sentiment: Sentiment| {
        reviews
            .iter()
            .filter(|review| review.sentiment == sentiment)
            .count()
    };
    let positive = count(Sentiment::Positive);
    let negative = count(Sentiment::Negative);
    let neutral = count(Sentiment::Neutral);

    AggregateStats {
        total,
        average_rating: average_rating(reviews),
        positive,
        negative,
        neutral,
        positive_percent: percent(positive, total),
        negative_percent: percent(negative, total),
        neutral_percent: percent(neutral, total),
        star_counts: star_counts(reviews),
        worst_day: worst_day(reviews),
        themes: theme_mentions(reviews),
        review_duration: review_duration(reviews),
    }
}

fn average_rating(reviews: &[Review]) -> String {
    if reviews.is_empty() {
        return "0".to_string();
    }
    let sum: u64 = reviews.iter().map(|review| u64::from(review.rating)).sum();
    format!("{:.2}", sum as f64 / reviews.len() as f64)
}

fn percent(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (count as f64 / total as f64 * 100.0).round() as u32
}

/// Buckets 1 through 5 are always present. Rating 0 marks a missing rating and
/// has no bucket.
pub fn star_counts(reviews: &[Review]) -> BTreeMap<u8, usize> {
    let mut counts: BTreeMap<u8, usize> = (1..=5).map(|stars| (stars, 0)).collect();
    for review in reviews {
        if let Some(count) = counts.get_mut(&review.rating) {
            *count += 1;
        }
    }
    counts
}

fn ratings_by_day(reviews: &[Review]) -> BTreeMap<NaiveDate, (u64, u64)> {
    let mut days: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
    for review in reviews {
        let Some(timestamp) = review.timestamp() else {
            continue;
        };
        let entry = days.entry(timestamp.date_naive()).or_insert((0, 0));
        entry.0 += u64::from(review.rating);
        entry.1 += 1;
    }
    days
}

/// Day with the strictly lowest mean rating. Days are visited in calendar
/// order, so ties resolve to the earliest day.
pub fn worst_day(reviews: &[Review]) -> WorstDay {
    let mut worst: Option<(NaiveDate, f64)> = None;
    for (day, (total, count)) in ratings_by_day(reviews) {
        let avg = total as f64 / count as f64;
        if worst.map_or(true, |(_, lowest)| avg < lowest) {
            worst = Some((day, avg));
        }
    }

    match worst {
        Some((day, avg)) => WorstDay {
            date: day.format("%B %-d, %Y").to_string(),
            rating: format!("{avg:.2}"),
        },
        None => WorstDay {
            date: NOT_AVAILABLE.to_string(),
            rating: NOT_AVAILABLE.to_string(),
        },
    }
}

/// Mentions per theme, most frequent first; equal counts follow theme
/// declaration order.
pub fn theme_mentions(reviews: &[Review]) -> Vec<ThemeMention> {
    let mut counts: HashMap<_, usize> = HashMap::new();
    for review in reviews {
        *counts.entry(review.theme).or_insert(0) += 1;
    }

    let mut mentions: Vec<ThemeMention> = counts
        .into_iter()
        .map(|(theme, mentions)| ThemeMention {
            theme,
            mentions,
            insight: theme.insight(),
        })
        .collect();

    mentions.sort_by(|a, b| b.mentions.cmp(&a.mentions).then(a.theme.cmp(&b.theme)));
    mentions
}

pub fn review_duration(reviews: &[Review]) -> String {
    let dates: Vec<_> = reviews.iter().filter_map(Review::timestamp).collect();
    match (dates.iter().min(), dates.iter().max()) {
        (Some(first), Some(last)) => format!(
            "{} - {}",
            first.format("%b %-d, %Y"),
            last.format("%b %-d, %Y")
        ),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Sentiment counts per calendar day, oldest first.
pub fn sentiment_trend(reviews: &[Review]) -> Vec<DailySentiment> {
    let mut days: BTreeMap<NaiveDate, DailySentiment> = BTreeMap::new();
    for review in reviews {
        let Some(timestamp) = review.timestamp() else {
            continue;
        };
        let day = timestamp.date_naive();
        let entry = days.entry(day).or_insert_with(|| DailySentiment {
            day,
            positive: 0,
            negative: 0,
            neutral: 0,
        });
        match review.sentiment {
            Sentiment::Positive => entry.positive += 1,
            Sentiment::Negative => entry.negative += 1,
            Sentiment::Neutral => entry.neutral += 1,
        }
    }
    days.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Platform, Theme};

    fn review(id: &str, rating: u8, date: &str, sentiment: Sentiment, theme: Theme) -> Review {
        Review {
            id: id.to_string(),
            platform: Platform::Android,
            author: "Anonymous".to_string(),
            rating,
            text: "text".to_string(),
            date: date.to_string(),
            sentiment,
            theme,
        }
    }

    fn rated(id: &str, rating: u8, date: &str) -> Review {
        review(id, rating, date, Sentiment::Neutral, Theme::General)
    }

    #[test]
    fn empty_input_yields_zeroes_and_placeholders() {
        let stats = aggregate(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_rating, "0");
        assert_eq!(stats.positive_percent, 0);
        assert_eq!(stats.negative_percent, 0);
        assert_eq!(
            stats.worst_day,
            WorstDay {
                date: "N/A".to_string(),
                rating: "N/A".to_string(),
            }
        );
        assert_eq!(stats.review_duration, "N/A");
        assert!(stats.themes.is_empty());
        assert_eq!(stats.star_counts.values().sum::<usize>(), 0);
        assert_eq!(stats.star_counts.len(), 5);
    }

    #[test]
    fn average_is_formatted_to_two_decimals() {
        let reviews = vec![
            rated("a", 5, "2024-01-01T00:00:00.000Z"),
            rated("b", 5, "2024-01-02T00:00:00.000Z"),
            rated("c", 1, "2024-01-03T00:00:00.000Z"),
        ];
        assert_eq!(aggregate(&reviews).average_rating, "3.67");
    }

    #[test]
    fn zero_ratings_count_in_total_but_not_in_stars() {
        let reviews = vec![
            rated("a", 0, "2024-01-01T00:00:00.000Z"),
            rated("b", 4, "2024-01-01T00:00:00.000Z"),
        ];
        let stats = aggregate(&reviews);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.average_rating, "2.00");
        assert_eq!(stats.star_counts[&4], 1);
        assert_eq!(stats.star_counts.values().sum::<usize>(), 1);
    }

    #[test]
    fn sentiment_percentages_are_rounded() {
        let reviews = vec![
            review("a", 5, "2024-01-01T00:00:00.000Z", Sentiment::Positive, Theme::General),
            review("b", 1, "2024-01-01T00:00:00.000Z", Sentiment::Negative, Theme::Login),
            review("c", 1, "2024-01-01T00:00:00.000Z", Sentiment::Negative, Theme::Login),
        ];
        let stats = aggregate(&reviews);
        assert_eq!(stats.positive, 1);
        assert_eq!(stats.negative, 2);
        assert_eq!(stats.positive_percent, 33);
        assert_eq!(stats.negative_percent, 67);
        assert_eq!(stats.neutral_percent, 0);
    }

    #[test]
    fn worst_day_uses_daily_mean_and_earliest_tie() {
        let reviews = vec![
            rated("a", 2, "2024-01-05T09:00:00.000Z"),
            rated("b", 4, "2024-01-05T18:00:00.000Z"),
            rated("c", 3, "2024-01-02T10:00:00.000Z"),
            rated("d", 5, "2024-01-07T10:00:00.000Z"),
            rated("e", 3, "2024-01-01T10:00:00.000Z"),
        ];
        let worst = worst_day(&reviews);
        assert_eq!(worst.date, "January 1, 2024");
        assert_eq!(worst.rating, "3.00");
    }

    #[test]
    fn themes_rank_by_count_then_declaration_order() {
        let reviews = vec![
            review("a", 1, "2024-01-01T00:00:00.000Z", Sentiment::Negative, Theme::Upi),
            review("b", 1, "2024-01-01T00:00:00.000Z", Sentiment::Negative, Theme::Crash),
            review("c", 1, "2024-01-01T00:00:00.000Z", Sentiment::Negative, Theme::Upi),
            review("d", 1, "2024-01-01T00:00:00.000Z", Sentiment::Negative, Theme::Login),
        ];
        let themes = theme_mentions(&reviews);
        let ranked: Vec<(Theme, usize)> = themes.iter().map(|t| (t.theme, t.mentions)).collect();
        assert_eq!(
            ranked,
            vec![(Theme::Upi, 2), (Theme::Login, 1), (Theme::Crash, 1)]
        );
        assert_eq!(themes[0].insight, Theme::Upi.insight());
    }

    #[test]
    fn duration_spans_first_to_last_review() {
        let reviews = vec![
            rated("a", 3, "2024-03-15T00:00:00.000Z"),
            rated("b", 3, "not a date"),
            rated("c", 3, "2024-01-02T00:00:00.000Z"),
        ];
        assert_eq!(review_duration(&reviews), "Jan 2, 2024 - Mar 15, 2024");
    }

    #[test]
    fn undated_reviews_still_count_toward_totals() {
        let reviews = vec![rated("a", 1, "garbage"), rated("b", 5, "2024-01-01T00:00:00.000Z")];
        let stats = aggregate(&reviews);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.average_rating, "3.00");
        assert_eq!(stats.worst_day.rating, "5.00");
    }

    #[test]
    fn trend_groups_sentiment_by_day() {
        let reviews = vec![
            review("a", 5, "2024-01-02T08:00:00.000Z", Sentiment::Positive, Theme::General),
            review("b", 1, "2024-01-01T08:00:00.000Z", Sentiment::Negative, Theme::Crash),
            review("c", 4, "2024-01-02T20:00:00.000Z", Sentiment::Positive, Theme::General),
        ];
        let trend = sentiment_trend(&reviews);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].day, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(trend[0].negative, 1);
        assert_eq!(trend[1].positive, 2);
    }
}
