use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use clap::{Args, ValueEnum};

use crate::models::{Platform, Review, Sentiment, Theme};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DateRange {
    #[value(name = "7d")]
    Last7Days,
    #[value(name = "30d")]
    Last30Days,
    #[value(name = "90d")]
    Last90Days,
    #[value(name = "180d")]
    Last180Days,
    #[value(name = "1y")]
    LastYear,
    #[default]
    All,
}

impl DateRange {
    pub fn window(&self) -> Option<Duration> {
        let days = match self {
            DateRange::Last7Days => 7,
            DateRange::Last30Days => 30,
            DateRange::Last90Days => 90,
            DateRange::Last180Days => 180,
            DateRange::LastYear => 365,
            DateRange::All => return None,
        };
        Some(Duration::days(days))
    }

    pub fn label(&self) -> &'static str {
        match self {
            DateRange::Last7Days => "Last 7 Days",
            DateRange::Last30Days => "Last 30 Days",
            DateRange::Last90Days => "Last 90 Days",
            DateRange::Last180Days => "Last 180 Days",
            DateRange::LastYear => "Last Year",
            DateRange::All => "All Time",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DateRange::Last7Days => "7d",
            DateRange::Last30Days => "30d",
            DateRange::Last90Days => "90d",
            DateRange::Last180Days => "180d",
            DateRange::LastYear => "1y",
            DateRange::All => "all",
        }
    }
}

impl FromStr for DateRange {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        <DateRange as ValueEnum>::from_str(value, false)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest parseable review date. Windows are measured back from here rather
/// than from the wall clock, so historical exports filter the same way forever.
pub fn anchor_date(reviews: &[Review]) -> Option<DateTime<Utc>> {
    reviews.iter().filter_map(Review::timestamp).max()
}

pub fn filter_by_range(reviews: &[Review], range: DateRange) -> Vec<Review> {
    let Some(window) = range.window() else {
        return reviews.to_vec();
    };
    let Some(anchor) = anchor_date(reviews) else {
        return reviews.to_vec();
    };

    let from = anchor - window;
    reviews
        .iter()
        .filter(|review| review.timestamp().is_some_and(|date| date > from))
        .cloned()
        .collect()
}

/// Explorer filters. Every criterion must hold; an empty selection matches
/// everything.
#[derive(Debug, Clone, Default, Args)]
pub struct ReviewQuery {
    /// Case-insensitive substring matched against review text or author
    #[arg(long)]
    pub search: Option<String>,
    /// Keep only these platforms (repeatable)
    #[arg(long = "platform", value_enum)]
    pub platforms: Vec<Platform>,
    /// Keep only these sentiments (repeatable)
    #[arg(long = "sentiment", value_enum)]
    pub sentiments: Vec<Sentiment>,
    /// Keep only these themes (repeatable)
    #[arg(long = "theme", value_enum)]
    pub themes: Vec<Theme>,
}

impl ReviewQuery {
    pub fn matches(&self, review: &Review) -> bool {
        let search_hit = match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                review.text.to_lowercase().contains(&term)
                    || review.author.to_lowercase().contains(&term)
            }
            None => true,
        };

        search_hit
            && (self.platforms.is_empty() || self.platforms.contains(&review.platform))
            && (self.sentiments.is_empty() || self.sentiments.contains(&review.sentiment))
            && (self.themes.is_empty() || self.themes.contains(&review.theme))
    }

    pub fn apply(&self, reviews: &[Review]) -> Vec<Review> {
        reviews
            .iter()
            .filter(|review| self.matches(review))
            .cloned()
            .collect()
    }
}
